//! Timeout governor: independent wall-clock deadlines for the connect and
//! response-await phases of one call.
//!
//! Each phase deadline is measured from phase entry. On expiry the governed
//! future is dropped, which cancels the in-flight transport operation and
//! closes any nascent socket (tokio I/O futures release their resources on
//! drop); the read phase additionally aborts the connection at the call
//! site. Caller cancellation is polled at both suspension points.
//!
//! Race tie-break: the `select!` arms are `biased` with the transport future
//! polled first, so a transport result that becomes ready in the same tick
//! as the deadline keeps its own (more specific) classification. A deadline
//! that fires strictly first wins as a timeout.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Origin};
use crate::request::TimeoutPolicy;
use crate::transport::{Phase, TransportError};

/// Governor error used as the cause when a phase deadline expires.
#[derive(Debug, thiserror::Error)]
#[error("{phase} deadline of {limit:?} expired")]
pub struct DeadlineExpired {
    pub phase: Phase,
    pub limit: Duration,
}

/// Wraps the in-flight phases of one call with the effective
/// [`TimeoutPolicy`] and the call's cancellation token.
pub struct TimeoutGovernor {
    policy: TimeoutPolicy,
    cancel: CancellationToken,
}

impl TimeoutGovernor {
    pub fn new(policy: TimeoutPolicy, cancel: CancellationToken) -> Self {
        Self { policy, cancel }
    }

    /// Drive the transport connect under the connect deadline.
    pub async fn connect_phase<T, F>(&self, fut: F) -> crate::Result<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        self.run_phase(Phase::Connect, self.policy.connect_timeout, fut)
            .await
    }

    /// Drive send/response-await under the read deadline.
    pub async fn read_phase<T, F>(&self, fut: F) -> crate::Result<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        self.run_phase(Phase::Read, self.policy.read_timeout, fut)
            .await
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.policy.connect_timeout
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.policy.read_timeout
    }

    async fn run_phase<T, F>(&self, phase: Phase, limit: Option<Duration>, fut: F) -> crate::Result<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        tokio::pin!(fut);

        let expiry_origin = match phase {
            Phase::Connect => Origin::ConnectExpiry,
            Phase::Read => Origin::ReadExpiry,
        };

        match limit {
            Some(limit) => {
                let deadline = tokio::time::sleep(limit);
                tokio::pin!(deadline);
                tokio::select! {
                    biased;
                    result = &mut fut => {
                        result.map_err(|e| ClientError::normalize(Origin::Transport, Box::new(e)))
                    }
                    _ = self.cancel.cancelled() => {
                        Err(ClientError::cancelled(format!("call cancelled during {phase} phase")))
                    }
                    _ = &mut deadline => {
                        Err(ClientError::normalize(
                            expiry_origin,
                            Box::new(DeadlineExpired { phase, limit }),
                        ))
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    result = &mut fut => {
                        result.map_err(|e| ClientError::normalize(Origin::Transport, Box::new(e)))
                    }
                    _ = self.cancel.cancelled() => {
                        Err(ClientError::cancelled(format!("call cancelled during {phase} phase")))
                    }
                }
            }
        }
    }
}
