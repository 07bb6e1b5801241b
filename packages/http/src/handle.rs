use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::types::HttpResponse;

pub type RequestId = u64;

/// Lifecycle of a single HTTP request.
///
/// `Queued → Running → {Done | Error | Aborted}`. The three right-hand
/// states are terminal; a handle never leaves them once reached.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    /// Created but not yet picked up by a worker
    Queued,
    /// A worker is executing the request
    Running,
    /// Completed with a successful response
    Done,
    /// Failed, either in transport or with a non-success status
    Error,
    /// Abandoned before completion
    Aborted,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Done | RequestState::Error | RequestState::Aborted
        )
    }

    pub fn is_pending(&self) -> bool {
        !self.is_terminal()
    }
}

/// Snapshot of a request handle, suitable for display or logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestStatus {
    /// Unique identifier for this request
    pub id: RequestId,

    /// Current state of the request
    pub state: RequestState,

    /// Error message if state is Error or Aborted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// HTTP status of the response, once one arrived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
}

impl RequestStatus {
    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    pub fn is_done(&self) -> bool {
        self.state == RequestState::Done
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, RequestState::Error | RequestState::Aborted)
    }
}

struct HandleState {
    state: RequestState,
    response: Option<HttpResponse>,
    error: Option<String>,
}

/// Shared handle to an in-flight request.
///
/// Cloning is cheap; every clone observes the same request. The transport
/// side drives the transitions, the owner polls [`RequestHandle::state`].
#[derive(Clone)]
pub struct RequestHandle {
    id: RequestId,
    inner: Arc<Mutex<HandleState>>,
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl RequestHandle {
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            inner: Arc::new(Mutex::new(HandleState {
                state: RequestState::Queued,
                response: None,
                error: None,
            })),
        }
    }

    // A worker that panicked mid-update leaves the state intact enough to read.
    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn state(&self) -> RequestState {
        self.lock().state
    }

    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// The response, if one arrived. Present for `Done`, and for `Error`
    /// when the server answered with a non-success status.
    pub fn response(&self) -> Option<HttpResponse> {
        self.lock().response.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn status(&self) -> RequestStatus {
        let state = self.lock();
        RequestStatus {
            id: self.id,
            state: state.state,
            error: state.error.clone(),
            http_status: state.response.as_ref().map(|r| r.status),
        }
    }

    /// Mark the request as picked up by a worker.
    pub fn start(&self) {
        let mut state = self.lock();
        if state.state == RequestState::Queued {
            state.state = RequestState::Running;
        }
    }

    /// Resolve the request successfully.
    pub fn complete(&self, response: HttpResponse) {
        let mut state = self.lock();
        if state.state.is_terminal() {
            return;
        }
        state.state = RequestState::Done;
        state.response = Some(response);
    }

    /// Resolve the request as failed, optionally keeping the response that
    /// caused the failure.
    pub fn fail(&self, error: impl Into<String>, response: Option<HttpResponse>) {
        let mut state = self.lock();
        if state.state.is_terminal() {
            return;
        }
        state.state = RequestState::Error;
        state.error = Some(error.into());
        state.response = response;
    }

    /// Abandon the request. A worker finishing later cannot revive it.
    pub fn abort(&self) {
        let mut state = self.lock();
        if state.state.is_terminal() {
            return;
        }
        state.state = RequestState::Aborted;
        state.error = Some("aborted".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_handle_is_queued() {
        let handle = RequestHandle::new(7);
        assert_eq!(handle.id(), 7);
        assert_eq!(handle.state(), RequestState::Queued);
        assert!(!handle.is_terminal());
        assert!(handle.response().is_none());
    }

    #[test]
    fn start_then_complete() {
        let handle = RequestHandle::new(1);
        handle.start();
        assert_eq!(handle.state(), RequestState::Running);

        handle.complete(HttpResponse::new(200, "ok"));
        assert_eq!(handle.state(), RequestState::Done);
        assert_eq!(handle.response().unwrap().body(), b"ok");

        let status = handle.status();
        assert!(status.is_done());
        assert_eq!(status.http_status, Some(200));
    }

    #[test]
    fn fail_keeps_response() {
        let handle = RequestHandle::new(2);
        handle.fail("HTTP 401 Unauthorized", Some(HttpResponse::new(401, "")));

        let status = handle.status();
        assert!(status.is_failed());
        assert_eq!(status.error.as_deref(), Some("HTTP 401 Unauthorized"));
        assert_eq!(status.http_status, Some(401));
    }

    #[test]
    fn terminal_states_are_final() {
        let handle = RequestHandle::new(3);
        handle.abort();
        handle.complete(HttpResponse::new(200, "late"));
        handle.fail("late", None);
        handle.start();

        assert_eq!(handle.state(), RequestState::Aborted);
        assert!(handle.response().is_none());
    }

    #[test]
    fn clones_share_state() {
        let handle = RequestHandle::new(4);
        let worker = handle.clone();
        worker.complete(HttpResponse::new(200, ""));
        assert_eq!(handle.state(), RequestState::Done);
    }

    #[test]
    fn request_state_terminality() {
        assert!(RequestState::Queued.is_pending());
        assert!(RequestState::Running.is_pending());
        assert!(RequestState::Done.is_terminal());
        assert!(RequestState::Error.is_terminal());
        assert!(RequestState::Aborted.is_terminal());
    }
}
