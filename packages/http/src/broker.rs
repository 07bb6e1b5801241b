//! HTTP broker that executes requests in background threads.
//!
//! Running a request returns immediately with a [`RequestHandle`]. A worker
//! thread executes the request and resolves the handle; the caller polls
//! the handle whenever it likes and never blocks on the network.
//!
//! ## Example
//!
//! ```ignore
//! use cloudsync_http::{HttpBroker, HttpRequest, Transport};
//!
//! let broker = HttpBroker::with_default_timeout()?;
//!
//! // Starts executing immediately in the background
//! let handle = broker.run(HttpRequest::get("https://api.example.com/a"));
//!
//! // Later, from the update loop
//! if handle.is_terminal() {
//!     let response = handle.response();
//! }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::executor::{HttpExecutor, ReqwestExecutor};
use crate::handle::{RequestHandle, RequestId};
use crate::types::HttpRequest;
use crate::Error;

/// Anything that can start a request and hand back a pollable handle.
///
/// Implementations must not block: the request runs elsewhere and the
/// handle is resolved exactly once.
pub trait Transport {
    fn run(&self, request: HttpRequest) -> RequestHandle;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn run(&self, request: HttpRequest) -> RequestHandle {
        (**self).run(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn run(&self, request: HttpRequest) -> RequestHandle {
        (**self).run(request)
    }
}

/// Runs each request on its own named worker thread.
pub struct HttpBroker {
    executor: Arc<dyn HttpExecutor>,
    next_request_id: AtomicU64,
}

impl HttpBroker {
    pub fn new(executor: impl HttpExecutor + 'static) -> Self {
        Self {
            executor: Arc::new(executor),
            next_request_id: AtomicU64::new(0),
        }
    }

    /// A reqwest-backed broker.
    pub fn with_timeout(timeout: Duration) -> Result<Self, Error> {
        Ok(Self::new(ReqwestExecutor::new(timeout)?))
    }

    pub fn with_default_timeout() -> Result<Self, Error> {
        Self::with_timeout(Duration::from_secs(30))
    }

    fn execute_into(executor: &dyn HttpExecutor, request: &HttpRequest, handle: &RequestHandle) {
        handle.start();

        match executor.execute(request) {
            Ok(response) if response.is_success() => handle.complete(response),
            Ok(response) => {
                let error = Error::Status {
                    status: response.status,
                    text: response.status_text.clone(),
                };
                log::debug!("request {} failed: {}", handle.id(), error);
                handle.fail(error.to_string(), Some(response));
            }
            Err(error) => {
                log::debug!("request {} failed: {}", handle.id(), error);
                handle.fail(error.to_string(), None);
            }
        }
    }
}

impl Transport for HttpBroker {
    fn run(&self, request: HttpRequest) -> RequestHandle {
        let request_id: RequestId = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let handle = RequestHandle::new(request_id);

        let worker = handle.clone();
        let executor = Arc::clone(&self.executor);
        let spawned = thread::Builder::new()
            .name(format!("cloudsync-http-{}", request_id))
            .spawn(move || Self::execute_into(executor.as_ref(), &request, &worker));

        if let Err(e) = spawned {
            let error = Error::Worker {
                message: e.to_string(),
            };
            handle.fail(error.to_string(), None);
        }

        handle
    }
}

/// A transport whose requests never leave the process.
///
/// Every request is recorded together with its handle; the test decides
/// when and how each one resolves.
#[cfg(any(test, feature = "test-utils"))]
pub mod manual {
    use std::sync::Mutex;

    use super::*;
    use crate::types::HttpResponse;

    #[derive(Default)]
    pub struct ManualTransport {
        issued: Mutex<Vec<(HttpRequest, RequestHandle)>>,
        next_request_id: AtomicU64,
    }

    impl ManualTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every request issued so far, oldest first.
        pub fn requests(&self) -> Vec<HttpRequest> {
            self.issued
                .lock()
                .unwrap()
                .iter()
                .map(|(request, _)| request.clone())
                .collect()
        }

        pub fn request_count(&self) -> usize {
            self.issued.lock().unwrap().len()
        }

        /// Requests whose URL path ends with `suffix`.
        pub fn requests_to(&self, suffix: &str) -> Vec<HttpRequest> {
            self.requests()
                .into_iter()
                .filter(|r| {
                    url::Url::parse(&r.url)
                        .map(|u| u.path().ends_with(suffix))
                        .unwrap_or(false)
                })
                .collect()
        }

        pub fn handle(&self, index: usize) -> RequestHandle {
            self.issued.lock().unwrap()[index].1.clone()
        }

        pub fn last_handle(&self) -> RequestHandle {
            let issued = self.issued.lock().unwrap();
            issued.last().expect("no request issued").1.clone()
        }

        /// Resolve request `index` with a response, the way the broker would:
        /// 2xx completes, anything else fails with the response attached.
        pub fn respond(&self, index: usize, response: HttpResponse) {
            let handle = self.handle(index);
            handle.start();
            if response.is_success() {
                handle.complete(response);
            } else {
                let message = format!("HTTP {} {}", response.status, response.status_text);
                handle.fail(message, Some(response));
            }
        }

        pub fn respond_json(&self, index: usize, body: serde_json::Value) {
            self.respond(index, HttpResponse::json(200, &body));
        }

        pub fn fail(&self, index: usize, message: &str) {
            let handle = self.handle(index);
            handle.start();
            handle.fail(message, None);
        }

        pub fn abort(&self, index: usize) {
            self.handle(index).abort();
        }
    }

    impl Transport for ManualTransport {
        fn run(&self, request: HttpRequest) -> RequestHandle {
            let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
            let handle = RequestHandle::new(id);
            self.issued
                .lock()
                .unwrap()
                .push((request, handle.clone()));
            handle
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::manual::ManualTransport;
    use super::*;
    use crate::executor::mock::MockExecutor;
    use crate::handle::RequestState;
    use crate::types::{HttpResponse, Method};

    fn wait_for(handle: &RequestHandle) -> RequestState {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !handle.is_terminal() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        handle.state()
    }

    #[test]
    fn broker_completes_success_responses() {
        let executor = MockExecutor::new().route(
            Method::GET,
            "/ok",
            HttpResponse::json(200, &serde_json::json!({"a": 1})),
        );
        let broker = HttpBroker::new(executor);

        let handle = broker.run(HttpRequest::get("http://localhost/ok"));

        assert_eq!(wait_for(&handle), RequestState::Done);
        assert_eq!(handle.response().unwrap().status, 200);
    }

    #[test]
    fn broker_fails_non_success_status() {
        let broker = HttpBroker::new(MockExecutor::new());

        let handle = broker.run(HttpRequest::get("http://localhost/missing"));

        assert_eq!(wait_for(&handle), RequestState::Error);
        assert_eq!(handle.response().unwrap().status, 404);
        assert_eq!(handle.error().as_deref(), Some("HTTP 404 Not Found"));
    }

    #[test]
    fn broker_fails_transport_errors() {
        let broker = HttpBroker::new(MockExecutor::new().unreachable("connection refused"));

        let handle = broker.run(HttpRequest::get("http://localhost/any"));

        assert_eq!(wait_for(&handle), RequestState::Error);
        assert!(handle.response().is_none());
        assert!(handle.error().unwrap().contains("connection refused"));
    }

    #[test]
    fn broker_assigns_increasing_ids() {
        let broker = HttpBroker::new(MockExecutor::new());
        let first = broker.run(HttpRequest::get("http://localhost/a"));
        let second = broker.run(HttpRequest::get("http://localhost/b"));
        assert_eq!(first.id(), 0);
        assert_eq!(second.id(), 1);
    }

    #[test]
    fn manual_transport_leaves_requests_queued() {
        let transport = ManualTransport::new();
        let handle = transport.run(HttpRequest::get("http://localhost/api/settings"));

        assert_eq!(handle.state(), RequestState::Queued);
        assert_eq!(transport.requests_to("/settings").len(), 1);

        transport.respond(0, HttpResponse::new(500, ""));
        assert_eq!(handle.state(), RequestState::Error);
    }
}
