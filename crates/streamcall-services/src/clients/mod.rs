//! # Clients
//!
//! Typed handles over a shared [`Dispatcher`](streamcall::Dispatcher). Each
//! client is cheap to clone and applies its own per-call timeout.

pub mod blog_client;
pub mod calculator_client;
pub mod greet_client;
pub mod service_client;

pub use blog_client::BlogClient;
pub use calculator_client::CalculatorClient;
pub use greet_client::GreetClient;
pub use service_client::{ResponseStream, ServiceClient};
