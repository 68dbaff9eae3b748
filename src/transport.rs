//! Transport adapter seam.
//!
//! The dispatch core treats the transport as an opaque collaborator: it asks
//! for a connection to a [`Target`], then drives request/response over the
//! returned handle. Failures come back as a structured [`TransportError`]
//! which the error normalizer turns into the caller-facing taxonomy.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::request::{RequestSpec, Target};
use crate::response::Response;

pub mod tcp;

pub use tcp::TcpTransport;

/// Which deadline a transport-reported timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Connect => f.write_str("connect"),
            Phase::Read => f.write_str("read"),
        }
    }
}

/// Structured low-level failure reported by a transport implementation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection refused by {addr}")]
    ConnectionRefused { addr: String },

    #[error("host unreachable: {addr}")]
    HostUnreachable { addr: String },

    #[error("dns resolution failed for {host:?}")]
    DnsFailure {
        host: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("{phase} phase timed out after {limit:?}")]
    TimedOut { phase: Phase, limit: Duration },

    #[error("connection closed before a complete response")]
    ConnectionClosed,

    #[error("malformed response: {0}")]
    InvalidResponse(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Other(String),
}

/// One established connection. Exclusively owned by the call that opened it.
#[async_trait]
pub trait Connection: Send {
    /// Send the request and await a complete response.
    ///
    /// `timeout` is a hint mirroring the governor's read deadline; transports
    /// may apply it natively (reporting [`TransportError::TimedOut`]) or
    /// ignore it — the timeout governor enforces the deadline regardless.
    async fn send(
        &mut self,
        request: &RequestSpec,
        url: &url::Url,
        timeout: Option<Duration>,
    ) -> Result<Response, TransportError>;

    /// Actively close the underlying socket. Idempotent: aborting an already
    /// closed or completed connection is a no-op.
    async fn abort(&mut self);
}

/// Connection factory. Shared read-only across concurrently dispatched calls.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Attempt a connection to `target`, optionally bounded by `timeout`.
    ///
    /// As with [`Connection::send`], the timeout is the transport's own
    /// primitive (connect-with-timeout); the governor holds an independent
    /// deadline around this call.
    async fn connect(
        &self,
        target: &Target,
        timeout: Option<Duration>,
    ) -> Result<Box<dyn Connection>, TransportError>;
}
