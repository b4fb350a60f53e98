//! # Call Context
//!
//! One [`CallContext`] exists per dispatched call. It carries the call's
//! identity (id, method, mode), its deadline, and the cancellation state
//! machine:
//!
//! ```text
//! Active ──► Completed
//!    │
//!    ├─────► Failed
//!    │
//!    └─────► Cancelled   (deadline elapsed, or the originator cancelled)
//! ```
//!
//! The cancellation reason is recorded exactly once; whichever of
//! "deadline elapsed" and "originator cancelled" happens first wins. A
//! cancelled call settles as cancelled even if its handler went on to
//! produce a result.

use crate::error::Status;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// The four call shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallMode {
    Unary,
    ServerStreaming,
    ClientStreaming,
    BidiStreaming,
}

impl CallMode {
    /// Whether the caller sends a stream of requests.
    pub fn streams_requests(&self) -> bool {
        matches!(self, CallMode::ClientStreaming | CallMode::BidiStreaming)
    }

    /// Whether the handler sends a stream of responses.
    pub fn streams_responses(&self) -> bool {
        matches!(self, CallMode::ServerStreaming | CallMode::BidiStreaming)
    }
}

impl fmt::Display for CallMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallMode::Unary => "unary",
            CallMode::ServerStreaming => "server-stream",
            CallMode::ClientStreaming => "client-stream",
            CallMode::BidiStreaming => "bidi-stream",
        };
        f.write_str(name)
    }
}

/// Why a call was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    DeadlineExceeded,
    Cancelled,
}

/// Where a call is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Active,
    Completed,
    Cancelled,
    Failed,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallState::Active)
    }
}

#[derive(Debug)]
struct CallInner {
    call_id: u64,
    method: String,
    mode: CallMode,
    deadline: Option<Instant>,
    token: CancellationToken,
    reason: OnceLock<CancelReason>,
    state: Mutex<CallState>,
}

/// Shared, cheaply cloneable state of one call.
#[derive(Debug, Clone)]
pub struct CallContext {
    inner: Arc<CallInner>,
}

impl CallContext {
    pub fn new(method: impl Into<String>, mode: CallMode, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(CallInner {
                call_id: NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed),
                method: method.into(),
                mode,
                deadline,
                token: CancellationToken::new(),
                reason: OnceLock::new(),
                state: Mutex::new(CallState::Active),
            }),
        }
    }

    pub fn call_id(&self) -> u64 {
        self.inner.call_id
    }

    pub fn method(&self) -> &str {
        &self.inner.method
    }

    pub fn mode(&self) -> CallMode {
        self.inner.mode
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` if the call has no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn state(&self) -> CallState {
        *self.lock_state()
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        self.inner.reason.get().copied()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    /// Cancels the call on behalf of its originator.
    ///
    /// Returns `false` if the call was already cancelled (for any reason) or
    /// has settled. A call whose deadline has already passed is expired
    /// instead, so it still ends with `DeadlineExceeded`.
    pub fn cancel(&self) -> bool {
        self.mark_cancelled(CancelReason::Cancelled)
    }

    /// Records that the deadline elapsed.
    pub fn expire(&self) -> bool {
        self.mark_cancelled(CancelReason::DeadlineExceeded)
    }

    fn lock_state(&self) -> MutexGuard<'_, CallState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_cancelled(&self, reason: CancelReason) -> bool {
        let state = self.lock_state();
        if state.is_terminal() {
            return false;
        }
        let reason = if self.deadline_passed() {
            CancelReason::DeadlineExceeded
        } else {
            reason
        };
        let recorded = self.inner.reason.set(reason).is_ok();
        drop(state);
        if recorded {
            self.inner.token.cancel();
        }
        recorded
    }

    pub fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// The status a cancelled call terminates with.
    pub fn cancel_status(&self) -> Option<Status> {
        self.cancel_reason().map(|reason| match reason {
            CancelReason::DeadlineExceeded => Status::deadline_exceeded(format!(
                "deadline exceeded while running {}",
                self.method()
            )),
            CancelReason::Cancelled => {
                Status::cancelled(format!("{} cancelled by caller", self.method()))
            }
        })
    }

    /// Fails with the cancellation status once the call is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), Status> {
        if self.deadline_passed() {
            self.expire();
        }
        match self.cancel_status() {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }

    /// Resolves once the call is cancelled, expiring it when the deadline elapses.
    pub async fn cancelled(&self) {
        match self.inner.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.inner.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {
                        self.expire();
                    }
                }
            }
            None => self.inner.token.cancelled().await,
        }
    }

    /// Sleeps for `duration`, returning early with the cancellation status.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Status> {
        self.check()?;
        tokio::select! {
            _ = self.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
        self.check()
    }

    /// Settles the call with the handler's result.
    ///
    /// A deadline that passed before settling, or an earlier cancellation,
    /// overrides the handler's result.
    pub fn settle<T>(&self, result: Result<T, Status>) -> Result<T, Status> {
        let mut state = self.lock_state();
        let expired = !state.is_terminal()
            && self.deadline_passed()
            && self.inner.reason.set(CancelReason::DeadlineExceeded).is_ok();
        let (next, result) = match self.cancel_status() {
            Some(status) => (CallState::Cancelled, Err(status)),
            None => match result {
                Ok(value) => (CallState::Completed, Ok(value)),
                Err(status) => (CallState::Failed, Err(status)),
            },
        };
        if !state.is_terminal() {
            *state = next;
        }
        drop(state);
        if expired {
            self.inner.token.cancel();
        }
        result
    }
}
