//! # Service Interface
//!
//! A [`Service`] is what gets registered with the
//! [`Dispatcher`](crate::Dispatcher). It advertises its methods (name and
//! mode) and exposes one entry point per call mode. Concrete services are
//! usually a typed trait plus a small server adapter that implements
//! `Service` by matching on the method name and decoding the request.

use crate::call::{CallContext, CallMode};
use crate::channel::{Receiver, Sender};
use crate::error::Status;
use async_trait::async_trait;

/// A method a service exposes, and the mode it must be called in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub name: &'static str,
    pub mode: CallMode,
}

impl MethodDescriptor {
    pub const fn new(name: &'static str, mode: CallMode) -> Self {
        Self { name, mode }
    }
}

/// The error a service returns for a method it does not serve in that mode.
pub fn unimplemented_method(method: &str) -> Status {
    Status::unimplemented(format!("method {} is not implemented", method))
}

/// A set of remote procedures over messages of type `M`.
///
/// The dispatcher only calls an entry point for a method the service listed
/// in [`Service::methods`] with the matching mode. Entry points own their
/// request; channels are borrowed, and the dispatcher closes or fails them
/// once the entry point returns.
#[async_trait]
pub trait Service<M: Send + 'static>: Send + Sync + 'static {
    /// A short name for logs.
    fn name(&self) -> &'static str;

    fn methods(&self) -> Vec<MethodDescriptor>;

    async fn unary(&self, ctx: &CallContext, request: M) -> Result<M, Status>;

    async fn server_streaming(
        &self,
        ctx: &CallContext,
        request: M,
        responses: &mut Sender<M>,
    ) -> Result<(), Status>;

    async fn client_streaming(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<M>,
    ) -> Result<M, Status>;

    async fn bidi_streaming(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<M>,
        responses: &mut Sender<M>,
    ) -> Result<(), Status>;
}
