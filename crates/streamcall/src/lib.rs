//! # Streamcall
//!
//! An in-process RPC runtime. Services register methods with a
//! [`Dispatcher`]; callers dispatch calls in one of four modes and talk to
//! the handler through bounded streaming channels.
//!
//! ## Call Modes
//!
//! | Mode | Requests | Responses |
//! |------|----------|-----------|
//! | [`CallMode::Unary`] | one | one |
//! | [`CallMode::ServerStreaming`] | one | stream |
//! | [`CallMode::ClientStreaming`] | stream | one |
//! | [`CallMode::BidiStreaming`] | stream | stream |
//!
//! ## Architecture Overview
//!
//! 1. **Channel layer** ([`channel`]) - bounded FIFO queues with explicit
//!    close, fail and abort.
//! 2. **Call layer** ([`CallContext`]) - identity, deadline and the
//!    cancellation state machine of one call.
//! 3. **Dispatch layer** ([`Dispatcher`]) - method lookup, mode checks, one
//!    task per call, and settling the terminal [`Status`].
//!
//! The [`store`] module adds the document-store interface services persist
//! through, with an in-memory actor implementation and a [`mock`] for tests.
//!
//! ## Deadlines and Cancellation
//!
//! A call may carry an absolute deadline. When it elapses, or the caller
//! cancels, every channel of the call is aborted: a blocked `send` or
//! `recv` on either side wakes with the cancellation status, and the call
//! settles as `DeadlineExceeded` or `Cancelled` even if the handler
//! produced a result.
//!
//! ```rust
//! use async_trait::async_trait;
//! use streamcall::{
//!     CallContext, CallMode, CallSpec, DispatchConfig, Dispatcher, MethodDescriptor,
//!     Receiver, Sender, Service, Status, unimplemented_method,
//! };
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl Service<String> for Echo {
//!     fn name(&self) -> &'static str { "echo" }
//!     fn methods(&self) -> Vec<MethodDescriptor> {
//!         vec![MethodDescriptor::new("Echo", CallMode::Unary)]
//!     }
//!     async fn unary(&self, _: &CallContext, request: String) -> Result<String, Status> {
//!         Ok(request)
//!     }
//!     async fn server_streaming(&self, ctx: &CallContext, _: String, _: &mut Sender<String>) -> Result<(), Status> {
//!         Err(unimplemented_method(ctx.method()))
//!     }
//!     async fn client_streaming(&self, ctx: &CallContext, _: &mut Receiver<String>) -> Result<String, Status> {
//!         Err(unimplemented_method(ctx.method()))
//!     }
//!     async fn bidi_streaming(&self, ctx: &CallContext, _: &mut Receiver<String>, _: &mut Sender<String>) -> Result<(), Status> {
//!         Err(unimplemented_method(ctx.method()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::<String>::builder(DispatchConfig::default())
//!         .add_service(Echo)
//!         .unwrap()
//!         .build();
//!
//!     let call = dispatcher.dispatch(CallSpec::unary("Echo", "ping"));
//!     assert_eq!(call.outcome().await.unwrap(), Some("ping".to_string()));
//! }
//! ```

pub mod call;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod mock;
pub mod service;
pub mod store;
pub mod tracing;

// Re-export core types for convenience
pub use call::{CallContext, CallMode, CallState, CancelReason};
pub use channel::{channel, ChannelError, ChannelHandle, ChannelState, Receiver, Sender};
pub use config::DispatchConfig;
pub use dispatcher::{CallHandle, CallSpec, DispatchError, Dispatcher, DispatcherBuilder};
pub use error::{Code, Status};
pub use service::{unimplemented_method, MethodDescriptor, Service};
