//! # Service Client Trait
//!
//! Shared plumbing for the typed clients. An implementor only says which
//! dispatcher to call and which timeout to apply; the default methods turn
//! a method name plus typed payloads into a dispatched call and decode the
//! replies.
//!
//! Calls that stream requests send them from a spawned task while the
//! calling task collects the response. The sender task is always awaited
//! before the terminal status is reported.

use crate::model::Message;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;
use streamcall::{CallHandle, CallSpec, Dispatcher, Receiver, Sender, Status};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Responses of a streaming call, then its terminal status if it failed.
pub type ResponseStream<T> = BoxStream<'static, Result<T, Status>>;

type SenderTask = JoinHandle<Result<(), Status>>;

#[async_trait]
pub trait ServiceClient: Send + Sync {
    fn dispatcher(&self) -> &Dispatcher<Message>;

    /// Per-call timeout, `None` for no deadline.
    fn timeout(&self) -> Option<Duration>;

    fn prepare(&self, spec: CallSpec<Message>) -> CallSpec<Message> {
        match self.timeout() {
            Some(timeout) => spec.with_timeout(timeout),
            None => spec,
        }
    }

    #[tracing::instrument(skip(self, request))]
    async fn unary<Req, Resp>(&self, method: &'static str, request: Req) -> Result<Resp, Status>
    where
        Req: Into<Message> + Send + 'static,
        Resp: TryFrom<Message, Error = Status> + Send + 'static,
    {
        debug!("Sending request");
        let call = self
            .dispatcher()
            .dispatch(self.prepare(CallSpec::unary(method, request)));
        single_response(method, call.outcome().await?)
    }

    fn server_streaming<Req, Resp>(
        &self,
        method: &'static str,
        request: Req,
    ) -> ResponseStream<Resp>
    where
        Req: Into<Message> + Send + 'static,
        Resp: TryFrom<Message, Error = Status> + Send + 'static,
    {
        debug!(method, "Opening response stream");
        let call = self
            .dispatcher()
            .dispatch(self.prepare(CallSpec::server_streaming(method, request)));
        response_stream(call, None)
    }

    #[tracing::instrument(skip(self, requests))]
    async fn client_streaming<Req, Resp, I>(
        &self,
        method: &'static str,
        requests: I,
    ) -> Result<Resp, Status>
    where
        Req: Into<Message> + Send + 'static,
        Resp: TryFrom<Message, Error = Status> + Send + 'static,
        I: IntoIterator<Item = Req> + Send + 'static,
        I::IntoIter: Send,
    {
        debug!("Streaming requests");
        let mut call = self
            .dispatcher()
            .dispatch(self.prepare(CallSpec::client_streaming(method)));
        let sender = spawn_sender(call.take_requests(), requests);
        let outcome = call.outcome().await;
        join_sender(sender).await;
        single_response(method, outcome?)
    }

    fn bidi_streaming<Req, Resp, I>(&self, method: &'static str, requests: I) -> ResponseStream<Resp>
    where
        Req: Into<Message> + Send + 'static,
        Resp: TryFrom<Message, Error = Status> + Send + 'static,
        I: IntoIterator<Item = Req> + Send + 'static,
        I::IntoIter: Send,
    {
        debug!(method, "Opening bidi stream");
        let mut call = self
            .dispatcher()
            .dispatch(self.prepare(CallSpec::bidi_streaming(method)));
        let sender = spawn_sender(call.take_requests(), requests);
        response_stream(call, Some(sender))
    }
}

fn single_response<Resp>(method: &str, response: Option<Message>) -> Result<Resp, Status>
where
    Resp: TryFrom<Message, Error = Status>,
{
    match response {
        Some(msg) => Resp::try_from(msg),
        None => Err(Status::internal(format!("{} returned no response", method))),
    }
}

fn spawn_sender<Req, I>(requests: Option<Sender<Message>>, items: I) -> SenderTask
where
    Req: Into<Message> + Send + 'static,
    I: IntoIterator<Item = Req> + Send + 'static,
    I::IntoIter: Send,
{
    tokio::spawn(async move {
        let Some(mut requests) = requests else {
            return Ok(());
        };
        for item in items {
            requests.send(item).await?;
        }
        requests.close();
        Ok(())
    })
}

async fn join_sender(sender: SenderTask) {
    match sender.await {
        Ok(Ok(())) => {}
        // The call's own status says why; the sender only saw the effect.
        Ok(Err(status)) => debug!(error = %status, "Request stream stopped early"),
        Err(e) => warn!(error = %e, "Request sender task failed"),
    }
}

struct Pump {
    responses: Option<Receiver<Message>>,
    call: CallHandle<Message>,
    sender: Option<SenderTask>,
}

impl Pump {
    async fn finish(self) -> Result<(), Status> {
        let Pump {
            responses,
            call,
            sender,
        } = self;
        drop(responses);
        if let Some(sender) = sender {
            join_sender(sender).await;
        }
        call.outcome().await.map(|_| ())
    }
}

fn response_stream<Resp>(mut call: CallHandle<Message>, sender: Option<SenderTask>) -> ResponseStream<Resp>
where
    Resp: TryFrom<Message, Error = Status> + Send + 'static,
{
    let pump = Pump {
        responses: call.take_responses(),
        call,
        sender,
    };
    futures::stream::unfold(Some(pump), |state| async move {
        let mut pump = state?;
        let next = match pump.responses.as_mut() {
            Some(responses) => responses.recv().await,
            None => Ok(None),
        };
        match next {
            Ok(Some(msg)) => match Resp::try_from(msg) {
                Ok(item) => Some((Ok(item), Some(pump))),
                Err(status) => {
                    pump.call.cancel();
                    let _ = pump.finish().await;
                    Some((Err(status), None))
                }
            },
            Ok(None) => match pump.finish().await {
                Ok(()) => None,
                Err(status) => Some((Err(status), None)),
            },
            Err(e) => {
                let _ = pump.finish().await;
                Some((Err(e.into()), None))
            }
        }
    })
    .boxed()
}
