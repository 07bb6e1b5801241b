//! # cloudsync-http
//!
//! Non-blocking HTTP transport for the cloudsync client.
//!
//! Requests are handed to a [`Transport`], which starts them elsewhere and
//! returns a [`RequestHandle`] immediately. The owner polls the handle from
//! its own update loop:
//!
//! ```ignore
//! use cloudsync_http::{HttpBroker, HttpRequest, RequestState, Transport};
//!
//! let broker = HttpBroker::with_default_timeout()?;
//! let handle = broker.run(HttpRequest::get("http://localhost:3000/api/settings"));
//!
//! // Every frame
//! match handle.state() {
//!     RequestState::Queued | RequestState::Running => {}
//!     RequestState::Done => { /* handle.response() */ }
//!     RequestState::Error | RequestState::Aborted => { /* handle.error() */ }
//! }
//! ```
//!
//! ## Features
//!
//! - `test-utils`: exposes [`executor::mock::MockExecutor`] and
//!   [`broker::manual::ManualTransport`] for downstream tests.

pub mod broker;
pub mod error;
pub mod executor;
pub mod handle;
pub mod types;

// Re-export main types
pub use broker::{HttpBroker, Transport};
pub use error::Error;
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use handle::{RequestHandle, RequestId, RequestState, RequestStatus};
pub use types::{HttpRequest, HttpResponse, Method, Payload, RequestBody};
