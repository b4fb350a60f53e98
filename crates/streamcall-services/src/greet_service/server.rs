use super::*;
use streamcall::{CallMode, MethodDescriptor, Service};

/// Exposes a [`GreetService`] to the dispatcher.
pub struct GreetServer<S> {
    inner: S,
}

impl<S: GreetService> GreetServer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: GreetService> Service<Message> for GreetServer<S> {
    fn name(&self) -> &'static str {
        "greet"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(GREET, CallMode::Unary),
            MethodDescriptor::new(GREET_MANY_TIMES, CallMode::ServerStreaming),
            MethodDescriptor::new(LONG_GREET, CallMode::ClientStreaming),
            MethodDescriptor::new(GREET_EVERYONE, CallMode::BidiStreaming),
            MethodDescriptor::new(GREET_WITH_DEADLINE, CallMode::Unary),
        ]
    }

    async fn unary(&self, ctx: &CallContext, request: Message) -> Result<Message, Status> {
        match ctx.method() {
            GREET => self
                .inner
                .greet(ctx, request.try_into()?)
                .await
                .map(Message::from),
            GREET_WITH_DEADLINE => self
                .inner
                .greet_with_deadline(ctx, request.try_into()?)
                .await
                .map(Message::from),
            other => Err(unimplemented_method(other)),
        }
    }

    async fn server_streaming(
        &self,
        ctx: &CallContext,
        request: Message,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        match ctx.method() {
            GREET_MANY_TIMES => {
                self.inner
                    .greet_many_times(ctx, request.try_into()?, responses)
                    .await
            }
            other => Err(unimplemented_method(other)),
        }
    }

    async fn client_streaming(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
    ) -> Result<Message, Status> {
        match ctx.method() {
            LONG_GREET => self
                .inner
                .long_greet(ctx, requests)
                .await
                .map(Message::from),
            other => Err(unimplemented_method(other)),
        }
    }

    async fn bidi_streaming(
        &self,
        ctx: &CallContext,
        requests: &mut Receiver<Message>,
        responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        match ctx.method() {
            GREET_EVERYONE => self.inner.greet_everyone(ctx, requests, responses).await,
            other => Err(unimplemented_method(other)),
        }
    }
}
