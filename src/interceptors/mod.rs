//! Interceptor hooks for application-layer cross-cutting concerns.
//!
//! The dispatch core stays policy-free (no retries, no metrics); interceptors
//! are the seam for logging, auditing, and custom business hooks around each
//! attempt. Hooks observe; they cannot rewrite the request or the outcome.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::request::RequestSpec;
use crate::response::Response;

/// Minimal per-attempt context passed to interceptors.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Per-attempt correlation id (uuid v4).
    pub call_id: String,
    /// Request path as given, before base-URL resolution.
    pub path: String,
}

/// Hooks around one attempt. All methods default to no-ops.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn on_request(&self, _ctx: &CallContext, _req: &RequestSpec) {}

    async fn on_response(&self, _ctx: &CallContext, _req: &RequestSpec, _resp: &Response) {}

    async fn on_error(&self, _ctx: &CallContext, _req: &RequestSpec, _err: &ClientError) {}
}

/// Runs registered hooks in order.
#[derive(Default)]
pub struct InterceptorPipeline {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub(crate) async fn notify_request(&self, ctx: &CallContext, req: &RequestSpec) {
        for ic in &self.interceptors {
            ic.on_request(ctx, req).await;
        }
    }

    pub(crate) async fn notify_response(
        &self,
        ctx: &CallContext,
        req: &RequestSpec,
        resp: &Response,
    ) {
        for ic in &self.interceptors {
            ic.on_response(ctx, req, resp).await;
        }
    }

    pub(crate) async fn notify_error(&self, ctx: &CallContext, req: &RequestSpec, err: &ClientError) {
        for ic in &self.interceptors {
            ic.on_error(ctx, req, err).await;
        }
    }
}
