use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::binding::Routes;
use crate::client::core::{ClientInner, HttpClient};
use crate::error::ClientError;
use crate::interceptors::{Interceptor, InterceptorPipeline};
use crate::request::TimeoutPolicy;
use crate::transport::{TcpTransport, Transport};
use crate::Result;

/// Builder for [`HttpClient`].
///
/// Keep this surface area small and predictable: base URL, the two phase
/// timeouts, an optional transport override, routes, interceptors.
pub struct HttpClientBuilder {
    base_url: String,
    timeouts: TimeoutPolicy,
    transport: Option<Arc<dyn Transport>>,
    routes: Routes,
    interceptors: InterceptorPipeline,
}

impl HttpClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeouts: TimeoutPolicy::unbounded(),
            transport: None,
            routes: Routes::new(),
            interceptors: InterceptorPipeline::new(),
        }
    }

    /// Bound the connect phase. Default: unbounded.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect_timeout = Some(timeout);
        self
    }

    /// Bound the response-await phase. Default: unbounded.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read_timeout = Some(timeout);
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Swap the transport adapter. Default is the plain-TCP HTTP/1.1
    /// transport; tests inject scripted transports here.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Register the declarative operation table.
    pub fn routes(mut self, routes: Routes) -> Self {
        self.routes = routes;
        self
    }

    pub fn interceptor<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors = self.interceptors.with(interceptor);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::protocol(format!("invalid base url {:?}: {e}", self.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::protocol(format!(
                "base url {base_url} cannot serve as a base"
            )));
        }

        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(TcpTransport::new()));

        Ok(HttpClient {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                timeouts: self.timeouts,
                routes: self.routes,
                interceptors: self.interceptors,
            }),
        })
    }
}
