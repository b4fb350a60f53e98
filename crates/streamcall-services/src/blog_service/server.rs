use super::*;
use streamcall::{CallMode, MethodDescriptor, Receiver, Service};

/// Exposes a [`BlogService`] to the dispatcher.
pub struct BlogServer<S> {
    inner: S,
}

impl<S: BlogService> BlogServer<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: BlogService> Service<Message> for BlogServer<S> {
    fn name(&self) -> &'static str {
        "blog"
    }

    fn methods(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(CREATE_RESOURCE, CallMode::Unary),
            MethodDescriptor::new(READ_RESOURCE, CallMode::Unary),
            MethodDescriptor::new(UPDATE_RESOURCE, CallMode::Unary),
            MethodDescriptor::new(DELETE_RESOURCE, CallMode::Unary),
            MethodDescriptor::new(LIST_RESOURCES, CallMode::ServerStreaming),
        ]
    }

    async fn unary(&self, ctx: &CallContext, request: Message) -> Result<Message, Status> {
        match ctx.method() {
            CREATE_RESOURCE => self
                .inner
                .create_resource(ctx, request.try_into()?)
                .await
                .map(Message::from),
            READ_RESOURCE => self
                .inner
                .read_resource(ctx, request.try_into()?)
                .await
                .map(Message::from),
            UPDATE_RESOURCE => self
                .inner
                .update_resource(ctx, request.try_into()?)
                .await
                .map(Message::from),
            DELETE_RESOURCE => self
                .inner
                .delete_resource(ctx, request.try_into()?)
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
            LIST_RESOURCES => {
                self.inner
                    .list_resources(ctx, request.try_into()?, responses)
                    .await
            }
            other => Err(unimplemented_method(other)),
        }
    }

    async fn client_streaming(
        &self,
        ctx: &CallContext,
        _requests: &mut Receiver<Message>,
    ) -> Result<Message, Status> {
        Err(unimplemented_method(ctx.method()))
    }

    async fn bidi_streaming(
        &self,
        ctx: &CallContext,
        _requests: &mut Receiver<Message>,
        _responses: &mut Sender<Message>,
    ) -> Result<(), Status> {
        Err(unimplemented_method(ctx.method()))
    }
}
