//! Request dispatcher: the caller-facing client.
//!
//! Keep the public surface small and predictable. Implementation details
//! are split into submodules under `src/client/`.

pub mod builder;
pub(crate) mod core;
pub(crate) mod execution;

pub use builder::HttpClientBuilder;
pub use core::HttpClient;
