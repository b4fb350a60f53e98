//! # Streaming Channel
//!
//! A bounded, directional, FIFO message queue with explicit termination.
//! Every streaming call mode is built from one or two of these.
//!
//! ## Terminal states
//!
//! | State | Set by | Consumer observes |
//! |-------|--------|-------------------|
//! | `Closed` | [`Sender::close`], or dropping the sender | `Ok(None)` |
//! | `Failed` | [`Sender::fail`] | `Err(Terminated(status))` |
//! | `Aborted` | `abort` on either end or a [`ChannelHandle`] | `Err(Terminated(status))` |
//!
//! Whatever the terminal state, messages already buffered are delivered
//! first, in order, and the terminal marker is observed after them.
//! `abort` also wakes a receiver waiting for a message and a sender waiting
//! for buffer capacity.
//!
//! A channel may carry a deadline. Both ends check it before every
//! operation and while suspended, aborting a still-open channel with
//! `DeadlineExceeded` once it has passed. A sequence the producer already
//! ended is left as it is.

use crate::error::Status;
use futures::Stream;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a channel. Everything but `Open` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Open,
    Closed,
    Failed(Status),
    Aborted(Status),
}

impl ChannelState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelState::Open)
    }

    fn error(&self) -> Option<Status> {
        match self {
            ChannelState::Failed(status) | ChannelState::Aborted(status) => Some(status.clone()),
            ChannelState::Open | ChannelState::Closed => None,
        }
    }
}

/// Errors returned by channel operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// `send` after the producer closed its side.
    #[error("send on a closed stream")]
    Closed,
    /// The channel failed or was aborted.
    #[error("stream terminated: {0}")]
    Terminated(Status),
}

impl From<ChannelError> for Status {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::Closed => Status::internal("send on a closed stream"),
            ChannelError::Terminated(status) => status,
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ChannelState>,
    aborted: CancellationToken,
    deadline: Option<Instant>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> ChannelState {
        self.lock().clone()
    }

    fn terminal_error(&self) -> Option<Status> {
        self.lock().error()
    }

    /// Moves an open channel to `next`.
    fn settle(&self, next: ChannelState) -> bool {
        let mut state = self.lock();
        if state.is_terminal() {
            return false;
        }
        let wake = matches!(next, ChannelState::Aborted(_));
        *state = next;
        drop(state);
        if wake {
            self.aborted.cancel();
        }
        true
    }

    /// Aborts an open channel, or a closed one whose buffer may still be draining.
    fn abort(&self, status: Status) -> bool {
        let mut state = self.lock();
        if !matches!(*state, ChannelState::Open | ChannelState::Closed) {
            return false;
        }
        *state = ChannelState::Aborted(status);
        drop(state);
        self.aborted.cancel();
        true
    }

    /// Aborts the channel once its deadline has passed, unless the producer
    /// already ended the sequence.
    fn check_deadline(&self) {
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.expire();
            }
        }
    }

    fn expire(&self) {
        self.settle(ChannelState::Aborted(deadline_status()));
    }

    fn terminated(&self) -> ChannelError {
        ChannelError::Terminated(
            self.terminal_error()
                .unwrap_or_else(|| Status::internal("stream terminated")),
        )
    }
}

fn deadline_status() -> Status {
    Status::deadline_exceeded("deadline exceeded")
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Creates a channel with room for `capacity` buffered messages.
pub fn channel<T>(capacity: usize) -> (Sender<T>, Receiver<T>) {
    channel_with_deadline(capacity, None)
}

/// Creates a channel that aborts itself with `DeadlineExceeded` at `deadline`.
pub fn channel_with_deadline<T>(
    capacity: usize,
    deadline: Option<Instant>,
) -> (Sender<T>, Receiver<T>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared {
        state: Mutex::new(ChannelState::Open),
        aborted: CancellationToken::new(),
        deadline,
    });
    let sender = Sender {
        tx: Some(tx),
        shared: shared.clone(),
    };
    let receiver = Receiver {
        rx,
        shared,
        terminal: None,
    };
    (sender, receiver)
}

/// A third-party view of a channel, used to abort it from outside.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    shared: Arc<Shared>,
}

impl ChannelHandle {
    /// Aborts the channel. Returns `false` if it had already failed or been aborted.
    pub fn abort(&self, status: Status) -> bool {
        self.shared.abort(status)
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }
}

/// The producing end of a channel.
pub struct Sender<T> {
    tx: Option<mpsc::Sender<T>>,
    shared: Arc<Shared>,
}

impl<T> Sender<T> {
    /// Enqueues a message, suspending while the buffer is full.
    pub async fn send(&mut self, msg: impl Into<T>) -> Result<(), ChannelError> {
        self.shared.check_deadline();
        if let Some(status) = self.shared.terminal_error() {
            return Err(ChannelError::Terminated(status));
        }
        let Some(tx) = self.tx.as_ref() else {
            return Err(ChannelError::Closed);
        };
        let msg = msg.into();

        tokio::select! {
            biased;
            _ = self.shared.aborted.cancelled() => Err(self.shared.terminated()),
            _ = deadline_elapsed(self.shared.deadline) => {
                self.shared.expire();
                Err(self.shared.terminated())
            }
            sent = tx.send(msg) => match sent {
                Ok(()) => Ok(()),
                Err(_) => {
                    self.shared.abort(Status::cancelled("stream receiver dropped"));
                    Err(self.shared.terminated())
                }
            },
        }
    }

    /// Marks the end of the sequence. Idempotent.
    pub fn close(&mut self) {
        self.shared.settle(ChannelState::Closed);
        self.tx = None;
    }

    /// Ends the sequence with an error the consumer observes after the buffered messages.
    pub fn fail(&mut self, status: Status) {
        self.shared.settle(ChannelState::Failed(status));
        self.tx = None;
    }

    pub fn abort(&self, status: Status) -> bool {
        self.shared.abort(status)
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        // A producer unwinding out of a panic did not finish its sequence.
        let end = if std::thread::panicking() {
            ChannelState::Failed(Status::unknown("stream producer panicked"))
        } else {
            ChannelState::Closed
        };
        self.shared.settle(end);
    }
}

/// The consuming end of a channel.
pub struct Receiver<T> {
    rx: mpsc::Receiver<T>,
    shared: Arc<Shared>,
    terminal: Option<Result<(), Status>>,
}

enum Wake<T> {
    Message(Option<T>),
    Aborted,
    Expired,
}

impl<T> Receiver<T> {
    /// Receives the next message.
    ///
    /// `Ok(None)` is end-of-sequence. Once the terminal marker has been
    /// returned, later calls return it again.
    pub async fn recv(&mut self) -> Result<Option<T>, ChannelError> {
        if let Some(terminal) = &self.terminal {
            return terminal
                .clone()
                .map(|()| None)
                .map_err(ChannelError::Terminated);
        }
        self.shared.check_deadline();

        let deadline = self.shared.deadline;
        let wake = tokio::select! {
            biased;
            msg = self.rx.recv() => Wake::Message(msg),
            _ = self.shared.aborted.cancelled() => Wake::Aborted,
            _ = deadline_elapsed(deadline) => Wake::Expired,
        };

        match wake {
            Wake::Message(Some(msg)) => Ok(Some(msg)),
            Wake::Message(None) => self.finish(),
            Wake::Expired => {
                self.shared.expire();
                self.drain_one()
            }
            Wake::Aborted => self.drain_one(),
        }
    }

    /// Receives the next message and converts it to `U`.
    pub async fn recv_as<U>(&mut self) -> Result<Option<U>, Status>
    where
        U: TryFrom<T, Error = Status>,
    {
        match self.recv().await? {
            Some(msg) => U::try_from(msg).map(Some),
            None => Ok(None),
        }
    }

    /// Stops the stream from the consuming side and wakes a blocked sender.
    pub fn abort(&mut self, status: Status) -> bool {
        let aborted = self.shared.abort(status);
        self.rx.close();
        aborted
    }

    pub fn state(&self) -> ChannelState {
        self.shared.state()
    }

    pub fn handle(&self) -> ChannelHandle {
        ChannelHandle {
            shared: self.shared.clone(),
        }
    }

    /// Exposes the receiver as a lazy stream. The stream ends after
    /// end-of-sequence, or after yielding the terminal error once.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, ChannelError>> + Send
    where
        T: Send + 'static,
    {
        futures::stream::unfold((self, false), |(mut rx, done)| async move {
            if done {
                return None;
            }
            match rx.recv().await {
                Ok(Some(msg)) => Some((Ok(msg), (rx, false))),
                Ok(None) => None,
                Err(e) => Some((Err(e), (rx, true))),
            }
        })
    }

    fn drain_one(&mut self) -> Result<Option<T>, ChannelError> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(_) => self.finish(),
        }
    }

    fn finish(&mut self) -> Result<Option<T>, ChannelError> {
        let terminal = match self.shared.terminal_error() {
            Some(status) => Err(status),
            None => Ok(()),
        };
        self.terminal = Some(terminal.clone());
        terminal.map(|()| None).map_err(ChannelError::Terminated)
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        if self.terminal.is_none() {
            let status = if std::thread::panicking() {
                Status::unknown("stream consumer panicked")
            } else {
                Status::cancelled("stream receiver dropped")
            };
            self.shared.settle(ChannelState::Aborted(status));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Code;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn test_close_delivers_buffered_messages_then_end_once() {
        let (mut tx, mut rx) = channel::<u32>(8);
        for i in 1u32..=3 {
            tx.send(i).await.unwrap();
        }
        tx.close();
        tx.close();

        assert_eq!(rx.recv().await, Ok(Some(1)));
        assert_eq!(rx.recv().await, Ok(Some(2)));
        assert_eq!(rx.recv().await, Ok(Some(3)));
        assert_eq!(rx.recv().await, Ok(None));
        assert_eq!(rx.recv().await, Ok(None));
        assert_eq!(rx.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (mut tx, _rx) = channel::<u32>(8);
        tx.close();
        assert_eq!(tx.send(1u32).await, Err(ChannelError::Closed));
    }

    #[tokio::test]
    async fn test_fail_reports_error_after_buffered_messages() {
        let (mut tx, mut rx) = channel::<&str>(8);
        tx.send("a").await.unwrap();
        tx.send("b").await.unwrap();
        tx.fail(Status::internal("cursor broke"));

        assert_eq!(rx.recv().await, Ok(Some("a")));
        assert_eq!(rx.recv().await, Ok(Some("b")));
        let err = rx.recv().await.unwrap_err();
        assert_eq!(Status::from(err).code(), Code::Internal);
    }

    #[tokio::test]
    async fn test_abort_wakes_blocked_receiver() {
        let (_tx, mut rx) = channel::<u32>(8);
        let handle = rx.handle();

        let waiter = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        assert!(handle.abort(Status::cancelled("caller went away")));

        let result = waiter.await.unwrap();
        match result {
            Err(ChannelError::Terminated(status)) => assert_eq!(status.code(), Code::Cancelled),
            other => panic!("expected termination, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_abort_wakes_sender_blocked_on_full_buffer() {
        let (mut tx, mut rx) = channel::<u32>(1);
        tx.send(1u32).await.unwrap();
        let handle = tx.handle();

        let blocked = tokio::spawn(async move { tx.send(2u32).await });
        tokio::task::yield_now().await;
        handle.abort(Status::deadline_exceeded("too slow"));

        assert!(matches!(blocked.await.unwrap(), Err(ChannelError::Terminated(_))));
        // The message buffered before the abort is still delivered.
        assert_eq!(rx.recv().await, Ok(Some(1)));
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_waiting_receiver() {
        let deadline = Instant::now() + Duration::from_millis(100);
        let (_tx, mut rx) = channel_with_deadline::<u32>(4, Some(deadline));

        let err = rx.recv().await.unwrap_err();
        assert_eq!(Status::from(err).code(), Code::DeadlineExceeded);
        assert!(matches!(rx.state(), ChannelState::Aborted(_)));
    }

    #[tokio::test]
    async fn test_dropping_sender_ends_sequence() {
        let (mut tx, rx) = channel::<u32>(4);
        tx.send(7u32).await.unwrap();
        drop(tx);

        let items: Vec<_> = rx.into_stream().collect().await;
        assert_eq!(items, vec![Ok(7)]);
    }

    #[tokio::test]
    async fn test_dropping_receiver_fails_sender() {
        let (mut tx, rx) = channel::<u32>(4);
        drop(rx);
        assert!(matches!(tx.send(1u32).await, Err(ChannelError::Terminated(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_leaves_finished_sequence_intact() {
        let deadline = Instant::now() + Duration::from_millis(50);
        let (mut tx, mut rx) = channel_with_deadline::<u32>(4, Some(deadline));
        tx.send(1u32).await.unwrap();
        tx.close();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(rx.recv().await, Ok(Some(1)));
        assert_eq!(rx.recv().await, Ok(None));
        assert_eq!(rx.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_panicking_producer_fails_sequence() {
        let (mut tx, mut rx) = channel::<u32>(4);
        tx.send(1u32).await.unwrap();

        let producer = tokio::spawn(async move {
            let _tx = tx;
            panic!("producer bug");
        });
        assert!(producer.await.is_err());

        assert_eq!(rx.recv().await, Ok(Some(1)));
        let err = rx.recv().await.unwrap_err();
        assert_eq!(Status::from(err).code(), Code::Unknown);
    }
}
