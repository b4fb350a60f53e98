//! # Greet Service
//!
//! | Method | Mode | Reply |
//! |--------|------|-------|
//! | `Greet` | unary | `Hello {first} {last}` |
//! | `GreetManyTimes` | server-stream | `Hello {first} {last}. You are number {i}.`, paced |
//! | `LongGreet` | client-stream | `Hi {first} {last}! ` per greeting, concatenated |
//! | `GreetEveryone` | bidi-stream | `Hello {first} {last}! ` per greeting |
//! | `GreetWithDeadline` | unary | `Hello {first} {last}` after three pacing steps |
//!
//! Pacing uses [`CallContext::sleep`], so a deadline or a cancel cuts the
//! wait short.

pub mod handler;
pub mod server;

pub use handler::Greeter;
pub use server::GreetServer;

use crate::model::*;
use async_trait::async_trait;
use streamcall::{unimplemented_method, CallContext, Receiver, Sender, Status};

pub const GREET: &str = "Greet";
pub const GREET_MANY_TIMES: &str = "GreetManyTimes";
pub const LONG_GREET: &str = "LongGreet";
pub const GREET_EVERYONE: &str = "GreetEveryone";
pub const GREET_WITH_DEADLINE: &str = "GreetWithDeadline";

#[async_trait]
pub trait GreetService: Send + Sync + 'static {
    async fn greet(&self, ctx: &CallContext, request: GreetRequest)
        -> Result<GreetResponse, Status>;

    async fn greet_many_times(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status>;

    async fn long_greet(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
    ) -> Result<GreetResponse, Status>;

    async fn greet_everyone(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status>;

    async fn greet_with_deadline(
        &self,
        ctx: &CallContext,
        request: GreetRequest,
    ) -> Result<GreetResponse, Status>;
}

/// A `GreetService` that implements nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedGreetService;

#[async_trait]
impl GreetService for UnimplementedGreetService {
    async fn greet(
        &self,
        _ctx: &CallContext,
        _request: GreetRequest,
    ) -> Result<GreetResponse, Status> {
        Err(unimplemented_method(GREET))
    }

    async fn greet_many_times(
        &self,
        _ctx: &CallContext,
        _request: GreetRequest,
        _responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(GREET_MANY_TIMES))
    }

    async fn long_greet(
        &self,
        _ctx: &CallContext,
        _requests: &mut Receiver<Message>,
    ) -> Result<GreetResponse, Status> {
        Err(unimplemented_method(LONG_GREET))
    }

    async fn greet_everyone(
        &self,
        _ctx: &CallContext,
        _requests: &mut Receiver<Message>,
        _responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(GREET_EVERYONE))
    }

    async fn greet_with_deadline(
        &self,
        _ctx: &CallContext,
        _request: GreetRequest,
    ) -> Result<GreetResponse, Status> {
        Err(unimplemented_method(GREET_WITH_DEADLINE))
    }
}
