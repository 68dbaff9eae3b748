//! Request execution logic (single-attempt).
//!
//! One call of [`run_attempt`] drives one subscription of a
//! [`PendingCall`](crate::PendingCall) from `Cold` to a terminal state:
//! resolve target → connect under the governor's connect deadline → await
//! the response under the read deadline → normalize any failure.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::call::{CallState, StateTracker};
use crate::client::core::ClientInner;
use crate::error::ClientError;
use crate::interceptors::CallContext;
use crate::request::{RequestSpec, Target};
use crate::response::Response;
use crate::timeout::TimeoutGovernor;

pub(crate) async fn run_attempt(
    inner: Arc<ClientInner>,
    spec: RequestSpec,
    state: StateTracker,
    cancel: CancellationToken,
) -> crate::Result<Response> {
    let call_id = Uuid::new_v4().to_string();
    let started = Instant::now();
    let ctx = CallContext {
        call_id: call_id.clone(),
        path: spec.path().to_string(),
    };

    debug!(
        call_id = call_id.as_str(),
        method = %spec.method(),
        path = spec.path(),
        "dispatching request"
    );
    inner.interceptors.notify_request(&ctx, &spec).await;

    let result = drive(&inner, &spec, &state, &cancel).await;

    match &result {
        Ok(response) => {
            state.advance(CallState::Completed);
            inner.interceptors.notify_response(&ctx, &spec, response).await;
            info!(
                call_id = call_id.as_str(),
                http_status = response.status().as_u16(),
                duration_ms = started.elapsed().as_millis() as u64,
                "request completed"
            );
        }
        Err(err) => {
            let terminal = if err.category() == crate::Category::Cancelled {
                CallState::Cancelled
            } else {
                CallState::Failed
            };
            state.advance(terminal);
            inner.interceptors.notify_error(&ctx, &spec, err).await;
            info!(
                call_id = call_id.as_str(),
                category = err.category().as_str(),
                duration_ms = started.elapsed().as_millis() as u64,
                "request failed"
            );
        }
    }

    result
}

async fn drive(
    inner: &ClientInner,
    spec: &RequestSpec,
    state: &StateTracker,
    cancel: &CancellationToken,
) -> crate::Result<Response> {
    let url = spec.resolve_url(&inner.base_url)?;
    let target = Target::from_url(&url)?;
    let effective = inner.timeouts.merge(spec.timeout_overrides());
    let governor = TimeoutGovernor::new(effective, cancel.clone());

    if cancel.is_cancelled() {
        return Err(ClientError::cancelled("call cancelled before connect"));
    }

    state.advance(CallState::Connecting);
    let mut conn = governor
        .connect_phase(inner.transport.connect(&target, governor.connect_timeout()))
        .await?;

    state.advance(CallState::AwaitingResponse);
    let outcome = governor
        .read_phase(conn.send(spec, &url, governor.read_timeout()))
        .await;

    // Active close either way: one request per connection, and an expired or
    // failed send must not leave a dangling socket behind.
    conn.abort().await;
    outcome
}
