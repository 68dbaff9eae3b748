//! # courier
//!
//! Declarative async HTTP client core: request dispatch, independent
//! connect/read timeouts, and a normalized failure taxonomy.
//!
//! ## Overview
//!
//! A [`HttpClient`] turns named operations (or ad-hoc [`RequestSpec`]s) into
//! cold [`PendingCall`]s. Nothing touches the network until a subscription;
//! each subscription is an independent attempt. In flight, the connect and
//! response-await phases run under separate wall-clock deadlines, and every
//! failure — socket refusal, DNS, deadline expiry, cancellation, decode —
//! surfaces as one [`ClientError`] with an inspectable [`Category`] and the
//! full lower-level cause chain.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use courier::{HttpClient, RequestSpec, Routes};
//!
//! #[tokio::main]
//! async fn main() -> courier::Result<()> {
//!     let client = HttpClient::builder("http://localhost:8080")
//!         .connect_timeout(Duration::from_millis(300))
//!         .read_timeout(Duration::from_secs(2))
//!         .routes(Routes::new().route("find_order", || RequestSpec::get("/icecream/orders/1")))
//!         .build()?;
//!
//!     let order = client.invoke("find_order")?.subscribe().join().await?;
//!     println!("status = {}", order.status());
//!     Ok(())
//! }
//! ```
//!
//! Non-reactive callers can bridge synchronously with
//! [`PendingCall::block`] / [`PendingCall::block_with_timeout`]; the
//! [`ClientError`] is re-raised on the calling thread.
//!
//! ## Module organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Dispatcher, builder, attempt driver |
//! | [`call`] | Cold calls, state machine, async result channel |
//! | [`timeout`] | Per-phase deadline governor |
//! | [`error`] | Failure taxonomy and normalizer |
//! | [`transport`] | Transport adapter seam + default TCP transport |
//! | [`binding`] | Named-operation registration |
//! | [`request`] / [`response`] | Request/response values |
//! | [`interceptors`] | Cross-cutting hooks around each attempt |

pub mod binding;
pub mod call;
pub mod client;
pub mod error;
pub mod interceptors;
pub mod request;
pub mod response;
pub mod timeout;
pub mod transport;

pub use binding::Routes;
pub use call::{CallState, CancelHandle, InFlightCall, PendingCall};
pub use client::{HttpClient, HttpClientBuilder};
pub use error::{Category, ClientError, Origin};
pub use request::{RequestSpec, Target, TimeoutPolicy};
pub use response::Response;
pub use timeout::TimeoutGovernor;
pub use transport::{Connection, Phase, TcpTransport, Transport, TransportError};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, ClientError>;
