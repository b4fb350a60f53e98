//! # RPC Dispatcher
//!
//! The dispatcher turns a [`CallSpec`] into a running call:
//!
//! 1. Resolves the method against the registered services and checks the
//!    declared mode.
//! 2. Creates the streaming channels the mode needs and hands the caller's
//!    ends back in a [`CallHandle`].
//! 3. Spawns one task that runs the handler next to a watchdog. When the
//!    deadline elapses, or the caller cancels, the watchdog aborts every
//!    channel of the call. The handler is never dropped mid-flight: it sees
//!    its channel operations fail (or [`CallContext::check`] fail) and
//!    returns on its own.
//! 4. Settles the call. Cancellation overrides whatever the handler
//!    returned. Only then does the response stream end, with the same
//!    status the outcome reports. A handler that panics settles as
//!    `Unknown`.
//!
//! Request channels carry the call deadline themselves. Response channels
//! do not: a response stream that was complete when the call settled is
//! still drained in full, however late the caller reads it. A handler that
//! closes its response sender itself ends the stream at that point.
//!
//! Rejected calls (unknown method, wrong mode, missing request) still get a
//! `CallHandle`; its channels are already terminated with the rejection
//! status and its outcome is that status.

use crate::call::{CallContext, CallMode};
use crate::channel::{channel, channel_with_deadline, ChannelHandle, Receiver, Sender};
use crate::config::DispatchConfig;
use crate::error::Status;
use crate::service::{MethodDescriptor, Service};
use std::collections::HashMap;
use futures::FutureExt;
use std::any::Any;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Errors raised while assembling a dispatcher.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("method {method} is registered by both {first} and {second}")]
    DuplicateMethod {
        method: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

struct Route<M> {
    service: Arc<dyn Service<M>>,
    mode: CallMode,
}

/// Collects services into a [`Dispatcher`].
pub struct DispatcherBuilder<M> {
    routes: HashMap<&'static str, Route<M>>,
    config: DispatchConfig,
}

impl<M: Send + 'static> DispatcherBuilder<M> {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            routes: HashMap::new(),
            config,
        }
    }

    pub fn add_service(self, service: impl Service<M>) -> Result<Self, DispatchError> {
        self.add_shared(Arc::new(service))
    }

    /// Registers every method `service` lists. Method names are global
    /// across services.
    pub fn add_shared(mut self, service: Arc<dyn Service<M>>) -> Result<Self, DispatchError> {
        for MethodDescriptor { name, mode } in service.methods() {
            if let Some(existing) = self.routes.get(name) {
                return Err(DispatchError::DuplicateMethod {
                    method: name,
                    first: existing.service.name(),
                    second: service.name(),
                });
            }
            debug!(service = service.name(), method = name, %mode, "Registered method");
            self.routes.insert(
                name,
                Route {
                    service: service.clone(),
                    mode,
                },
            );
        }
        Ok(self)
    }

    pub fn build(self) -> Dispatcher<M> {
        info!(methods = self.routes.len(), "Dispatcher ready");
        Dispatcher {
            routes: self.routes,
            config: self.config,
        }
    }
}

/// What a caller asks the dispatcher to run.
#[derive(Debug)]
pub struct CallSpec<M> {
    pub method: String,
    pub mode: CallMode,
    pub deadline: Option<Instant>,
    /// The single request of a unary or server-streaming call.
    pub request: Option<M>,
}

impl<M> CallSpec<M> {
    pub fn unary(method: impl Into<String>, request: impl Into<M>) -> Self {
        Self::new(method, CallMode::Unary, Some(request.into()))
    }

    pub fn server_streaming(method: impl Into<String>, request: impl Into<M>) -> Self {
        Self::new(method, CallMode::ServerStreaming, Some(request.into()))
    }

    pub fn client_streaming(method: impl Into<String>) -> Self {
        Self::new(method, CallMode::ClientStreaming, None)
    }

    pub fn bidi_streaming(method: impl Into<String>) -> Self {
        Self::new(method, CallMode::BidiStreaming, None)
    }

    fn new(method: impl Into<String>, mode: CallMode, request: Option<M>) -> Self {
        Self {
            method: method.into(),
            mode,
            deadline: None,
            request,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

enum Outcome<M> {
    Rejected(Status),
    Running(JoinHandle<Result<Option<M>, Status>>),
}

/// The caller's side of a dispatched call.
///
/// `requests` exists for client- and bidi-streaming calls, `responses` for
/// server- and bidi-streaming calls. Either can be taken out and moved to
/// another task.
pub struct CallHandle<M> {
    ctx: CallContext,
    requests: Option<Sender<M>>,
    responses: Option<Receiver<M>>,
    outcome: Outcome<M>,
}

impl<M: Send + 'static> CallHandle<M> {
    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Cancels the call on behalf of the caller.
    pub fn cancel(&self) -> bool {
        self.ctx.cancel()
    }

    pub fn take_requests(&mut self) -> Option<Sender<M>> {
        self.requests.take()
    }

    pub fn take_responses(&mut self) -> Option<Receiver<M>> {
        self.responses.take()
    }

    /// Sends one request on the request stream.
    pub async fn send(&mut self, msg: impl Into<M>) -> Result<(), Status> {
        let requests = self
            .requests
            .as_mut()
            .ok_or_else(|| Status::internal("call has no request stream"))?;
        requests.send(msg).await.map_err(Status::from)
    }

    /// Ends the request stream.
    pub fn close_requests(&mut self) {
        if let Some(requests) = self.requests.as_mut() {
            requests.close();
        }
    }

    /// Receives the next response; `Ok(None)` is end-of-sequence.
    pub async fn recv(&mut self) -> Result<Option<M>, Status> {
        let responses = self
            .responses
            .as_mut()
            .ok_or_else(|| Status::internal("call has no response stream"))?;
        responses.recv().await.map_err(Status::from)
    }

    /// Waits for the terminal status.
    ///
    /// Unary and client-streaming calls yield `Some(response)`. A request
    /// stream still held by the handle is closed first; a response stream
    /// still held is abandoned.
    pub async fn outcome(self) -> Result<Option<M>, Status> {
        let Self {
            ctx,
            requests,
            responses,
            outcome,
        } = self;
        drop(requests);
        drop(responses);

        match outcome {
            Outcome::Rejected(status) => Err(status),
            Outcome::Running(handle) => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(call_id = ctx.call_id(), method = %ctx.method(), error = %e, "Handler task failed");
                    ctx.settle(Err(Status::unknown(format!("handler task failed: {}", e))))
                }
            },
        }
    }
}

enum HandlerIo<M> {
    Unary(M),
    ServerStreaming(M, Sender<M>),
    ClientStreaming(Receiver<M>),
    BidiStreaming(Receiver<M>, Sender<M>),
}

impl<M> HandlerIo<M> {
    fn channels(&self) -> Vec<ChannelHandle> {
        match self {
            HandlerIo::Unary(_) => Vec::new(),
            HandlerIo::ServerStreaming(_, responses) => vec![responses.handle()],
            HandlerIo::ClientStreaming(requests) => vec![requests.handle()],
            HandlerIo::BidiStreaming(requests, responses) => {
                vec![requests.handle(), responses.handle()]
            }
        }
    }
}

/// Routes calls to registered services.
pub struct Dispatcher<M> {
    routes: HashMap<&'static str, Route<M>>,
    config: DispatchConfig,
}

impl<M: Send + 'static> Dispatcher<M> {
    pub fn builder(config: DispatchConfig) -> DispatcherBuilder<M> {
        DispatcherBuilder::new(config)
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Every registered method, sorted by name.
    pub fn methods(&self) -> Vec<MethodDescriptor> {
        let mut methods: Vec<_> = self
            .routes
            .iter()
            .map(|(name, route)| MethodDescriptor::new(*name, route.mode))
            .collect();
        methods.sort_by_key(|m| m.name);
        methods
    }

    /// Starts a call. Must be called from within a tokio runtime.
    pub fn dispatch(&self, spec: CallSpec<M>) -> CallHandle<M> {
        let CallSpec {
            method,
            mode,
            deadline,
            request,
        } = spec;
        let deadline = deadline.or_else(|| {
            self.config
                .default_timeout()
                .map(|timeout| Instant::now() + timeout)
        });
        let ctx = CallContext::new(method, mode, deadline);
        debug!(call_id = ctx.call_id(), method = %ctx.method(), %mode, "Dispatch");

        let capacity = self.config.channel_capacity;
        let (caller_requests, handler_requests) = if mode.streams_requests() {
            let (tx, rx) = channel_with_deadline(capacity, deadline);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };
        let (handler_responses, caller_responses) = if mode.streams_responses() {
            let (tx, rx) = channel(capacity);
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        let mut handle = CallHandle {
            ctx: ctx.clone(),
            requests: caller_requests,
            responses: caller_responses,
            outcome: Outcome::Rejected(Status::unknown("call not started")),
        };

        let service = match self.routes.get(ctx.method()) {
            None => {
                let status = Status::unimplemented(format!("unknown method {}", ctx.method()));
                return reject(handle, status, handler_requests, handler_responses);
            }
            Some(route) if route.mode != mode => {
                let status = Status::unimplemented(format!(
                    "method {} is {}, called as {}",
                    ctx.method(),
                    route.mode,
                    mode
                ));
                return reject(handle, status, handler_requests, handler_responses);
            }
            Some(route) => route.service.clone(),
        };

        let io = match (request, handler_requests, handler_responses) {
            (Some(request), None, None) => HandlerIo::Unary(request),
            (Some(request), None, Some(responses)) => HandlerIo::ServerStreaming(request, responses),
            (None, Some(requests), None) => HandlerIo::ClientStreaming(requests),
            (None, Some(requests), Some(responses)) => HandlerIo::BidiStreaming(requests, responses),
            (request, requests, responses) => {
                let status = if request.is_some() {
                    Status::invalid_argument(format!(
                        "{} call {} takes its requests from the request stream",
                        mode,
                        ctx.method()
                    ))
                } else {
                    Status::invalid_argument(format!(
                        "{} call {} needs a request",
                        mode,
                        ctx.method()
                    ))
                };
                return reject(handle, status, requests, responses);
            }
        };

        let span = tracing::info_span!(
            "call",
            call_id = ctx.call_id(),
            method = %ctx.method(),
            %mode
        );
        let task = tokio::spawn(run_call(service, ctx, io).instrument(span));
        handle.outcome = Outcome::Running(task);
        handle
    }
}

fn reject<M: Send + 'static>(
    mut handle: CallHandle<M>,
    status: Status,
    requests: Option<Receiver<M>>,
    responses: Option<Sender<M>>,
) -> CallHandle<M> {
    warn!(call_id = handle.ctx.call_id(), method = %handle.ctx.method(), error = %status, "Call rejected");
    if let Some(mut requests) = requests {
        requests.abort(status.clone());
    }
    if let Some(mut responses) = responses {
        responses.fail(status.clone());
    }
    let status = match handle.ctx.settle::<()>(Err(status)) {
        Err(status) => status,
        Ok(()) => Status::unknown("rejected call settled successfully"),
    };
    handle.outcome = Outcome::Rejected(status);
    handle
}

async fn run_call<M: Send + 'static>(
    service: Arc<dyn Service<M>>,
    ctx: CallContext,
    io: HandlerIo<M>,
) -> Result<Option<M>, Status> {
    debug!(service = service.name(), "Call started");
    let channels = io.channels();

    let handler = AssertUnwindSafe(invoke(service.as_ref(), &ctx, io)).catch_unwind();
    let (result, responses) = tokio::select! {
        finished = handler => match finished {
            Ok(finished) => finished,
            Err(panic) => {
                let message = format!("handler panicked: {}", panic_message(&*panic));
                (Err(Status::unknown(message)), None)
            }
        },
        never = watchdog(&ctx, &channels) => match never {},
    };

    let outcome = ctx.settle(result);
    match &outcome {
        Ok(_) => {
            if let Some(mut responses) = responses {
                responses.close();
            }
            debug!("Call completed");
        }
        Err(status) => {
            if let Some(mut responses) = responses {
                responses.fail(status.clone());
            }
            for channel in &channels {
                channel.abort(status.clone());
            }
            warn!(code = %status.code(), error = %status, "Call failed");
        }
    }
    outcome
}

/// Aborts the call's channels once it is cancelled, then idles until the
/// handler returns.
async fn watchdog(ctx: &CallContext, channels: &[ChannelHandle]) -> Infallible {
    ctx.cancelled().await;
    if let Some(status) = ctx.cancel_status() {
        info!(reason = ?ctx.cancel_reason(), "Call cancelled");
        for channel in channels {
            channel.abort(status.clone());
        }
    }
    std::future::pending().await
}

/// Runs the handler. The response sender is handed back still open so the
/// stream ends only once the call has settled.
async fn invoke<M: Send + 'static>(
    service: &dyn Service<M>,
    ctx: &CallContext,
    io: HandlerIo<M>,
) -> (Result<Option<M>, Status>, Option<Sender<M>>) {
    if let Err(status) = ctx.check() {
        for channel in io.channels() {
            channel.abort(status.clone());
        }
        return (Err(status), None);
    }

    match io {
        HandlerIo::Unary(request) => (service.unary(ctx, request).await.map(Some), None),
        HandlerIo::ServerStreaming(request, mut responses) => {
            let result = service.server_streaming(ctx, request, &mut responses).await;
            (result.map(|()| None), Some(responses))
        }
        HandlerIo::ClientStreaming(mut requests) => {
            let result = service.client_streaming(ctx, &mut requests).await;
            finish_requests(&mut requests, &result);
            (result.map(Some), None)
        }
        HandlerIo::BidiStreaming(mut requests, mut responses) => {
            let result = service
                .bidi_streaming(ctx, &mut requests, &mut responses)
                .await;
            finish_requests(&mut requests, &result);
            (result.map(|()| None), Some(responses))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Stops a caller that is still sending after the handler returned.
fn finish_requests<M, T>(requests: &mut Receiver<M>, result: &Result<T, Status>) {
    if requests.state().is_terminal() {
        return;
    }
    let status = match result {
        Ok(_) => Status::cancelled("call already completed"),
        Err(status) => status.clone(),
    };
    requests.abort(status);
}
