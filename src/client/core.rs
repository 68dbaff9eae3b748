use std::sync::Arc;

use http::Method;
use url::Url;

use crate::binding::Routes;
use crate::call::PendingCall;
use crate::client::builder::HttpClientBuilder;
use crate::error::ClientError;
use crate::interceptors::InterceptorPipeline;
use crate::request::{RequestSpec, TimeoutPolicy};
use crate::transport::Transport;
use crate::Result;

/// Shared, immutable per-client configuration. One `Arc<ClientInner>` is
/// read-only shared by every call dispatched from the same client.
pub(crate) struct ClientInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) base_url: Url,
    pub(crate) timeouts: TimeoutPolicy,
    pub(crate) routes: Routes,
    pub(crate) interceptors: InterceptorPipeline,
}

/// Declarative async HTTP client.
///
/// Cheap to clone; all configuration is shared and immutable. Dispatching
/// performs no I/O — work starts when the returned [`PendingCall`] is
/// subscribed.
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) inner: Arc<ClientInner>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.inner.base_url)
            .field("timeouts", &self.inner.timeouts)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    pub fn builder(base_url: impl Into<String>) -> HttpClientBuilder {
        HttpClientBuilder::new(base_url)
    }

    /// Turn a request spec into a cold call. Side-effect free.
    pub fn dispatch(&self, spec: RequestSpec) -> PendingCall {
        PendingCall::new(self.inner.clone(), spec)
    }

    /// Dispatch a registered named operation.
    pub fn invoke(&self, operation: &str) -> Result<PendingCall> {
        let spec = self
            .inner
            .routes
            .build_spec(operation)
            .ok_or_else(|| ClientError::protocol(format!("unknown operation {operation:?}")))?;
        Ok(self.dispatch(spec))
    }

    pub fn get(&self, path: impl Into<String>) -> PendingCall {
        self.dispatch(RequestSpec::get(path))
    }

    pub fn post(&self, path: impl Into<String>) -> PendingCall {
        self.dispatch(RequestSpec::new(Method::POST, path))
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn timeouts(&self) -> TimeoutPolicy {
        self.inner.timeouts
    }
}
