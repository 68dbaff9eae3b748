//! Request model: per-call immutable values and timeout configuration.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::error::ClientError;

/// Client- or call-level timeout bounds.
///
/// `None` means unbounded for that phase. Shared read-only across all calls
/// built from the same client configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Bounds the transport connect phase, measured from phase entry.
    pub connect_timeout: Option<Duration>,
    /// Bounds the response-await phase, measured from phase entry.
    pub read_timeout: Option<Duration>,
}

impl TimeoutPolicy {
    /// No bound on either phase.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn connect(timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(timeout),
            ..Self::default()
        }
    }

    pub fn read(timeout: Duration) -> Self {
        Self {
            read_timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// Effective policy for one call: call-level overrides take precedence
    /// over the client default, field by field.
    pub fn merge(&self, overrides: &TimeoutPolicy) -> TimeoutPolicy {
        TimeoutPolicy {
            connect_timeout: overrides.connect_timeout.or(self.connect_timeout),
            read_timeout: overrides.read_timeout.or(self.read_timeout),
        }
    }
}

/// Immutable description of one request: what to send and under which
/// per-call timeout overrides. Owned by the dispatcher for the lifetime of
/// the call; building one performs no I/O.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    overrides: TimeoutPolicy,
}

impl RequestSpec {
    /// A request for `path`, resolved against the client's base URL at
    /// subscription time. `path` may also be an absolute URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            overrides: TimeoutPolicy::unbounded(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON body with the matching content-type header.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> crate::Result<Self> {
        let encoded = serde_json::to_vec(value)
            .map_err(|e| ClientError::protocol(format!("failed to encode request body: {e}")))?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = Some(Bytes::from(encoded));
        Ok(self)
    }

    /// Per-call connect-timeout override.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.overrides.connect_timeout = Some(timeout);
        self
    }

    /// Per-call read-timeout override.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.overrides.read_timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout_overrides(&self) -> &TimeoutPolicy {
        &self.overrides
    }

    /// Resolve this spec against a base URL. Relative paths join the base;
    /// absolute URLs are taken as-is.
    pub fn resolve_url(&self, base: &Url) -> crate::Result<Url> {
        base.join(&self.path)
            .map_err(|e| ClientError::protocol(format!("invalid request path {:?}: {e}", self.path)))
    }
}

/// The transport-level destination of one call: host and port, before DNS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn from_url(url: &Url) -> crate::Result<Self> {
        if url.scheme() != "http" {
            return Err(ClientError::protocol(format!(
                "unsupported scheme {:?} (only http is handled by the default transport)",
                url.scheme()
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ClientError::protocol(format!("url {url} has no host")))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        Ok(Self { host, port })
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
