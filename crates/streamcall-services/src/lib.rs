//! # Streamcall Services
//!
//! Three services hosted on one [`streamcall`] dispatcher:
//!
//! - **[blog_service]**: resource CRUD plus a streamed listing, backed by the
//!   document store actor.
//! - **[calculator_service]**: one arithmetic method per call mode.
//! - **[greet_service]**: greetings, including a paced call that honours
//!   deadlines.
//!
//! [`lifecycle::ServiceSystem`] starts everything and exposes the typed
//! [`clients`]. Every payload travels as a [`model::Message`].

pub mod blog_service;
pub mod calculator_service;
pub mod clients;
pub mod greet_service;
pub mod lifecycle;
pub mod model;
