use super::*;
use streamcall::{CallMode, MethodDescriptor, Service};

/// Exposes a [`CalculatorService`] to the dispatcher.
pub struct CalculatorServer<S> {
    inner: S,
}

impl<S: CalculatorService> CalculatorServer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: CalculatorService> Service<Message> for CalculatorServer<S> {
    fn name(&self) -> &'static str {
        "calculator"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(COMPUTE_SUM, CallMode::Unary),
            MethodDescriptor::new(COMPUTE_SQUARE_ROOT, CallMode::Unary),
            MethodDescriptor::new(DECOMPOSE_INTO_PRIMES, CallMode::ServerStreaming),
            MethodDescriptor::new(COMPUTE_AVERAGE, CallMode::ClientStreaming),
            MethodDescriptor::new(TRACK_RUNNING_MAXIMUM, CallMode::BidiStreaming),
        ]
    }

    async fn unary(&self, ctx: &CallContext, request: Message) -> Result<Message, Status> {
        match ctx.method() {
            COMPUTE_SUM => self
                .inner
                .compute_sum(ctx, request.try_into()?)
                .await
                .map(Message::from),
            COMPUTE_SQUARE_ROOT => self
                .inner
                .compute_square_root(ctx, request.try_into()?)
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
            DECOMPOSE_INTO_PRIMES => {
                self.inner
                    .decompose_into_primes(ctx, request.try_into()?, responses)
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
            COMPUTE_AVERAGE => self
                .inner
                .compute_average(ctx, requests)
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
            TRACK_RUNNING_MAXIMUM => {
                self.inner
                    .track_running_maximum(ctx, requests, responses)
                    .await
            }
            other => Err(unimplemented_method(other)),
        }
    }
}
