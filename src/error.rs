//! Failure taxonomy and the error normalizer.
//!
//! Every failure a call can hit — transport-reported, deadline expiry,
//! caller cancellation, response decode — converges on one [`ClientError`]
//! envelope. Callers branch on [`Category`]; the originating lower-level
//! error stays reachable through `std::error::Error::source()` for
//! diagnostics, never for control flow.

use std::error::Error as StdError;
use std::fmt;

use crate::transport::{Phase, TransportError};

/// Boxed lower-level cause carried inside a [`ClientError`].
pub type BoxCause = Box<dyn StdError + Send + Sync + 'static>;

/// Closed set of caller-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// The transport could not establish the connection (refused,
    /// unreachable, DNS failure).
    ConnectFailure,
    /// The connect phase exceeded its deadline.
    ConnectTimeout,
    /// The response-await phase exceeded its deadline.
    ReadTimeout,
    /// The caller cancelled the call before it completed.
    Cancelled,
    /// The response (or request) could not be encoded/decoded, or the client
    /// was misconfigured.
    ProtocolError,
    /// Any other transport-layer failure.
    TransportError,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::ConnectFailure => "connect_failure",
            Category::ConnectTimeout => "connect_timeout",
            Category::ReadTimeout => "read_timeout",
            Category::Cancelled => "cancelled",
            Category::ProtocolError => "protocol_error",
            Category::TransportError => "transport_error",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Category::ConnectTimeout | Category::ReadTimeout)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which layer produced the raw cause being normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The transport adapter reported a structured failure.
    Transport,
    /// The timeout governor's connect-phase deadline expired.
    ConnectExpiry,
    /// The timeout governor's read-phase deadline expired.
    ReadExpiry,
    /// The caller cancelled through a [`CancelHandle`](crate::CancelHandle).
    Cancellation,
    /// A serialization collaborator failed to encode/decode.
    Decode,
}

/// The single error envelope surfaced to callers.
///
/// Created once per failed call by [`ClientError::normalize`]; immutable
/// thereafter. The cause chain is linear: `source()` walks from this
/// envelope down to the most specific transport-level error.
#[derive(Debug)]
pub struct ClientError {
    category: Category,
    message: String,
    cause: Option<BoxCause>,
}

impl ClientError {
    /// Classify a raw cause from `origin` into the caller-facing taxonomy.
    ///
    /// | origin | category |
    /// |---|---|
    /// | transport: refused / unreachable / DNS | `ConnectFailure` |
    /// | transport: connect-phase timeout | `ConnectTimeout` |
    /// | transport: read-phase timeout | `ReadTimeout` |
    /// | transport: anything else | `TransportError` |
    /// | governor connect expiry | `ConnectTimeout` |
    /// | governor read expiry | `ReadTimeout` |
    /// | caller cancellation | `Cancelled` |
    /// | decode failure | `ProtocolError` |
    ///
    /// The cause is stored whole — normalization never discards it.
    pub fn normalize(origin: Origin, cause: BoxCause) -> Self {
        let category = match origin {
            Origin::Transport => classify_transport(cause.as_ref()),
            Origin::ConnectExpiry => Category::ConnectTimeout,
            Origin::ReadExpiry => Category::ReadTimeout,
            Origin::Cancellation => Category::Cancelled,
            Origin::Decode => Category::ProtocolError,
        };
        Self {
            category,
            message: cause.to_string(),
            cause: Some(cause),
        }
    }

    /// Configuration / protocol-shape error with no lower-level cause.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            category: Category::ProtocolError,
            message: message.into(),
            cause: None,
        }
    }

    /// Caller cancellation observed with no transport error in hand.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self {
            category: Category::Cancelled,
            message: message.into(),
            cause: None,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self {
            category: Category::TransportError,
            message: message.into(),
            cause: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The immediate lower-level cause, if any. Equivalent to `source()`.
    pub fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|c| c as &(dyn StdError + 'static))
    }

    /// Walks the cause chain to its most specific (deepest) error.
    pub fn root_cause(&self) -> Option<&(dyn StdError + 'static)> {
        let mut current = self.cause()?;
        while let Some(next) = current.source() {
            current = next;
        }
        Some(current)
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl StdError for ClientError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause()
    }
}

fn classify_transport(cause: &(dyn StdError + Send + Sync + 'static)) -> Category {
    match cause.downcast_ref::<TransportError>() {
        Some(TransportError::ConnectionRefused { .. })
        | Some(TransportError::HostUnreachable { .. })
        | Some(TransportError::DnsFailure { .. }) => Category::ConnectFailure,
        Some(TransportError::TimedOut {
            phase: Phase::Connect,
            ..
        }) => Category::ConnectTimeout,
        Some(TransportError::TimedOut {
            phase: Phase::Read, ..
        }) => Category::ReadTimeout,
        _ => Category::TransportError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn transport(cause: TransportError) -> ClientError {
        ClientError::normalize(Origin::Transport, Box::new(cause))
    }

    #[test]
    fn refused_unreachable_and_dns_map_to_connect_failure() {
        for cause in [
            TransportError::ConnectionRefused {
                addr: "127.0.0.1:80".into(),
            },
            TransportError::HostUnreachable {
                addr: "10.0.0.1:80".into(),
            },
            TransportError::DnsFailure {
                host: "nosuch.invalid".into(),
                source: None,
            },
        ] {
            assert_eq!(transport(cause).category(), Category::ConnectFailure);
        }
    }

    #[test]
    fn transport_timeouts_converge_with_governor_expiries() {
        let connect = transport(TransportError::TimedOut {
            phase: Phase::Connect,
            limit: Duration::from_millis(300),
        });
        assert_eq!(connect.category(), Category::ConnectTimeout);

        let read = transport(TransportError::TimedOut {
            phase: Phase::Read,
            limit: Duration::from_millis(200),
        });
        assert_eq!(read.category(), Category::ReadTimeout);
    }

    #[test]
    fn unclassified_transport_errors_hit_the_catch_all() {
        let err = transport(TransportError::Other("tls handshake".into()));
        assert_eq!(err.category(), Category::TransportError);
    }

    #[test]
    fn non_transport_origins_classify_by_origin() {
        let err = ClientError::normalize(
            Origin::Cancellation,
            Box::new(std::io::Error::new(std::io::ErrorKind::Other, "dropped")),
        );
        assert_eq!(err.category(), Category::Cancelled);
    }

    #[test]
    fn cause_chain_reaches_the_original_error_unchanged() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "ECONNREFUSED");
        let err = transport(TransportError::Io(io));

        // envelope -> TransportError -> io::Error
        let mid = err.cause().expect("envelope keeps its cause");
        assert!(mid.downcast_ref::<TransportError>().is_some());
        let root = err.root_cause().expect("chain has a bottom");
        let root = root.downcast_ref::<std::io::Error>().expect("io at bottom");
        assert_eq!(root.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn display_leads_with_the_category() {
        let err = transport(TransportError::ConnectionRefused {
            addr: "127.0.0.1:80".into(),
        });
        assert!(err.to_string().starts_with("connect_failure:"));
    }
}
