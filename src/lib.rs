//! # Steadycall - resilient request execution for UI actions
//!
//! Steadycall sits between user-triggered actions (form submits, data fetches,
//! file uploads) and a remote HTTP API. It runs an async operation, retries it
//! when the failure is transient, classifies failures into a fixed taxonomy,
//! turns validation failures into per-field messages, and exposes a uniform
//! loading / data / error state.
//!
//! ## Quick Start
//!
//! ```no_run
//! use steadycall::{ApiCall, ApiClient, CallOptions, TracingNotifier};
//! use serde::Deserialize;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Deserialize)]
//! struct Org {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), steadycall::Error> {
//!     let client = ApiClient::builder()
//!         .base_url("https://api.example.com")?
//!         .build()?;
//!
//!     let load_org = ApiCall::with_options(
//!         move |id: u64| {
//!             let client = client.clone();
//!             async move { client.get::<Org>(format!("/orgs/{id}")).await }
//!         },
//!         Arc::new(TracingNotifier),
//!         CallOptions::builder()
//!             .retry(true)
//!             .max_retries(3)
//!             .error_message("Could not load organization")
//!             .build(),
//!     );
//!
//!     if let Some(org) = load_org.execute(7).await {
//!         println!("{} ({})", org.name, org.id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Failure handling
//!
//! | Classification | Status | Retried |
//! |----------------|--------|---------|
//! | `Network` | none | yes |
//! | `Validation` | 400, 422 | no |
//! | `Unauthorized` | 401 | no |
//! | `Forbidden` | 403 | no |
//! | `NotFound` | 404 | no |
//! | `RateLimited` | 429 | yes |
//! | `ServerError` | 5xx | yes |
//! | `Unknown` | anything else | no |
//!
//! Retries are silent to the user; each one is logged with `tracing` and
//! reported to the policy's `on_retry` hook. Exactly one notification is
//! shown per terminal outcome.

mod call;
mod classify;
mod client;
mod error;
mod form;
mod notify;
pub mod rate_limit;
pub mod response;
pub mod retry;
mod state;

pub use call::{ApiCall, CallOptions, CallOptionsBuilder, SettleOrder};
pub use classify::{classify, ErrorClassification};
pub use client::{ApiClient, ApiClientBuilder, UploadFile};
pub use error::{Error, FieldErrorList, Result, TransportError};
pub use form::{FieldErrors, FormSubmit};
pub use notify::{NotificationKind, Notifier, TracingNotifier};
pub use response::Response;
pub use retry::{retry, retry_upload, Backoff, RetryPolicy, RetryPredicate};
pub use state::{CallPhase, CallState};
