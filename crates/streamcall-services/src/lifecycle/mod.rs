//! # System Lifecycle
//!
//! [`ServiceSystem`] wires the whole process together: it starts the
//! document store actor, registers the blog, calculator and greet services
//! with one [`Dispatcher`](streamcall::Dispatcher), and hands out a typed
//! client per service.
//!
//! Shutdown mirrors startup in reverse. Dropping the clients and the
//! dispatcher releases the last store handle, the store actor sees its
//! channel close, and [`ServiceSystem::shutdown`] awaits its task.
//!
//! Configuration is a plain [`SystemConfig`]; every field has a default so a
//! partial document deserializes.
//!
//! ```rust,ignore
//! let system = ServiceSystem::new(SystemConfig::default())?;
//! let sum = system.calculator_client.sum(3, 10).await?;
//! system.shutdown().await?;
//! ```

pub mod service_system;

pub use service_system::*;
