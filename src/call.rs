//! Cold calls and the asynchronous result channel.
//!
//! A [`PendingCall`] performs no I/O until someone subscribes. Every
//! subscription — `subscribe()`, `subscribe_on()`, `.await`, `block()` — is
//! an independent attempt (cold replay); terminal outcomes are never cached
//! on the handle. Each attempt delivers exactly one terminal signal, either
//! the [`Response`] or a [`ClientError`].

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tokio_util::sync::CancellationToken;

use crate::client::core::ClientInner;
use crate::client::execution;
use crate::error::ClientError;
use crate::request::RequestSpec;
use crate::response::Response;

/// Lifecycle of one attempt. Transitions are strictly ordered
/// (`Cold → Connecting → AwaitingResponse → terminal`) and a terminal state
/// is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Cold,
    Connecting,
    AwaitingResponse,
    Completed,
    Failed,
    Cancelled,
}

impl CallState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Completed | CallState::Failed | CallState::Cancelled
        )
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallState::Cold => "cold",
            CallState::Connecting => "connecting",
            CallState::AwaitingResponse => "awaiting_response",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
            CallState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// State publisher that refuses to leave a terminal state.
pub(crate) struct StateTracker {
    tx: watch::Sender<CallState>,
}

impl StateTracker {
    pub(crate) fn new() -> (Self, watch::Receiver<CallState>) {
        let (tx, rx) = watch::channel(CallState::Cold);
        (Self { tx }, rx)
    }

    pub(crate) fn advance(&self, next: CallState) {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Idempotent cancellation handle for one in-flight attempt.
///
/// Cancelling an attempt that already reached a terminal state is a no-op;
/// cancelling twice is a no-op. Cancellation propagates down through the
/// timeout governor to the transport within one scheduling tick.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// One spawned attempt: a single-value channel plus state/cancel handles.
pub struct InFlightCall {
    rx: oneshot::Receiver<crate::Result<Response>>,
    state: watch::Receiver<CallState>,
    cancel: CancelHandle,
}

impl InFlightCall {
    /// Await the single terminal signal.
    pub async fn join(self) -> crate::Result<Response> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(ClientError::cancelled("attempt task was dropped")))
    }

    pub fn state(&self) -> CallState {
        *self.state.borrow()
    }

    /// A watch receiver over the attempt's state transitions.
    pub fn watch_state(&self) -> watch::Receiver<CallState> {
        self.state.clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }
}

/// A not-yet-started request: the handle returned by
/// [`HttpClient::dispatch`](crate::HttpClient::dispatch).
///
/// Construction is side-effect free. The handle owns its immutable
/// [`RequestSpec`] and a shared reference to the client configuration;
/// nothing network-visible happens until a subscription.
pub struct PendingCall {
    inner: Arc<ClientInner>,
    spec: RequestSpec,
}

impl std::fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingCall")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

type AttemptFuture = BoxFuture<'static, crate::Result<Response>>;

impl PendingCall {
    pub(crate) fn new(inner: Arc<ClientInner>, spec: RequestSpec) -> Self {
        Self { inner, spec }
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    fn attempt(&self) -> (AttemptFuture, watch::Receiver<CallState>, CancellationToken) {
        let (tracker, state_rx) = StateTracker::new();
        let token = CancellationToken::new();
        let fut = execution::run_attempt(
            self.inner.clone(),
            self.spec.clone(),
            tracker,
            token.clone(),
        );
        (Box::pin(fut), state_rx, token)
    }

    /// Start a fresh attempt on the current runtime.
    ///
    /// Panics outside a tokio runtime; use [`subscribe_on`](Self::subscribe_on)
    /// or [`block`](Self::block) there.
    pub fn subscribe(&self) -> InFlightCall {
        self.subscribe_on(&Handle::current())
    }

    /// Start a fresh attempt with its I/O driven on the given runtime
    /// handle. Where the result is *observed* is up to the caller — awaiting
    /// [`InFlightCall::join`] on any context receives the terminal signal
    /// there.
    pub fn subscribe_on(&self, handle: &Handle) -> InFlightCall {
        let (fut, state, token) = self.attempt();
        let (tx, rx) = oneshot::channel();
        handle.spawn(async move {
            // Receiver may be gone; the attempt outcome is then discarded.
            let _ = tx.send(fut.await);
        });
        InFlightCall {
            rx,
            state,
            cancel: CancelHandle::new(token),
        }
    }

    /// Synchronous bridge: drive a fresh attempt to its terminal state on a
    /// private current-thread runtime and return the outcome on the calling
    /// thread. Failures surface as [`ClientError`], never the raw transport
    /// cause.
    pub fn block(&self) -> crate::Result<Response> {
        self.block_inner(None)
    }

    /// [`block`](Self::block) with an upper bound on the wait. On expiry the
    /// in-flight attempt is cancelled and the call fails as `Cancelled`.
    pub fn block_with_timeout(&self, limit: Duration) -> crate::Result<Response> {
        self.block_inner(Some(limit))
    }

    fn block_inner(&self, limit: Option<Duration>) -> crate::Result<Response> {
        if Handle::try_current().is_ok() {
            return Err(ClientError::internal(
                "block() called from within an async runtime; await the call instead",
            ));
        }
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClientError::internal(format!("failed to build bridge runtime: {e}")))?;

        let (fut, _state, token) = self.attempt();
        match limit {
            None => rt.block_on(fut),
            Some(limit) => rt.block_on(async move {
                tokio::select! {
                    result = fut => result,
                    _ = tokio::time::sleep(limit) => {
                        token.cancel();
                        Err(ClientError::cancelled(format!(
                            "blocking wait of {limit:?} elapsed before the call completed"
                        )))
                    }
                }
            }),
        }
    }
}

impl IntoFuture for &PendingCall {
    type Output = crate::Result<Response>;
    type IntoFuture = AttemptFuture;

    /// `.await`ing a pending call runs one fresh attempt inline on the
    /// awaiting task (cold replay applies: each `.await` is a new attempt).
    fn into_future(self) -> Self::IntoFuture {
        let (fut, _state, _token) = self.attempt();
        fut
    }
}
