//! Request and response types of every service, and the [`Message`] enum
//! they travel in.

pub mod blog;
pub mod calculator;
pub mod greet;
pub mod message;

pub use blog::*;
pub use calculator::*;
pub use greet::*;
pub use message::Message;
