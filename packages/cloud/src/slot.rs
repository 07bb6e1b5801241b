//! Single-flight request tracking.

use cloudsync_http::RequestHandle;

use crate::error::{CloudError, CloudResult};
use crate::event::Operation;

/// At most one tracked request for an operation kind.
///
/// A slot never silently replaces its handle: while a request is
/// pending, [`ensure_idle`](Slot::ensure_idle) refuses new work and the
/// pending request keeps being observed until it resolves.
#[derive(Debug)]
pub enum Slot<T> {
    Idle,
    Pending {
        handle: RequestHandle,
        context: T,
    },
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Idle
    }
}

impl<T> Slot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending { .. })
    }

    /// Context captured when the pending request was issued.
    pub fn context(&self) -> Option<&T> {
        match self {
            Slot::Idle => None,
            Slot::Pending { context, .. } => Some(context),
        }
    }

    pub fn ensure_idle(&self, operation: Operation) -> CloudResult<()> {
        match self {
            Slot::Idle => Ok(()),
            Slot::Pending { .. } => Err(CloudError::Busy { operation }),
        }
    }

    /// Start tracking `handle`. Callers check [`ensure_idle`](Slot::ensure_idle) first.
    pub fn fill(&mut self, handle: RequestHandle, context: T) {
        debug_assert!(!self.is_pending(), "slot already holds a pending request");
        *self = Slot::Pending { handle, context };
    }

    /// If the tracked request reached a terminal state, empty the slot and
    /// hand back the handle with its context. Pending requests stay put.
    pub fn take_finished(&mut self) -> Option<(RequestHandle, T)> {
        let finished = matches!(self, Slot::Pending { handle, .. } if handle.is_terminal());
        if !finished {
            return None;
        }
        match std::mem::replace(self, Slot::Idle) {
            Slot::Pending { handle, context } => Some((handle, context)),
            Slot::Idle => None,
        }
    }

    /// Stop tracking the pending request, aborting its handle so a late
    /// response is never applied. Returns the context it was issued with.
    pub fn discard(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Idle) {
            Slot::Pending { handle, context } => {
                handle.abort();
                Some(context)
            }
            Slot::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudsync_http::{HttpResponse, RequestState};

    #[test]
    fn pending_slot_rejects_new_work() {
        let mut slot: Slot<&str> = Slot::Idle;
        assert!(slot.ensure_idle(Operation::Login).is_ok());

        slot.fill(RequestHandle::new(1), "alice");
        assert!(matches!(
            slot.ensure_idle(Operation::Login),
            Err(CloudError::Busy {
                operation: Operation::Login
            })
        ));
        assert_eq!(slot.context(), Some(&"alice"));
    }

    #[test]
    fn unfinished_request_is_kept() {
        let mut slot = Slot::Idle;
        let handle = RequestHandle::new(1);
        slot.fill(handle.clone(), ());

        assert!(slot.take_finished().is_none());
        handle.start();
        assert!(slot.take_finished().is_none());
        assert!(slot.is_pending());
    }

    #[test]
    fn finished_request_empties_slot() {
        let mut slot = Slot::Idle;
        let handle = RequestHandle::new(7);
        slot.fill(handle.clone(), 42);

        handle.complete(HttpResponse::new(200, "{}"));

        let (finished, context) = slot.take_finished().unwrap();
        assert_eq!(finished.id(), 7);
        assert_eq!(finished.state(), RequestState::Done);
        assert_eq!(context, 42);
        assert!(!slot.is_pending());
        assert!(slot.take_finished().is_none());
    }

    #[test]
    fn aborted_request_counts_as_finished() {
        let mut slot = Slot::Idle;
        let handle = RequestHandle::new(3);
        slot.fill(handle.clone(), ());
        handle.abort();
        assert!(slot.take_finished().is_some());
    }

    #[test]
    fn discarded_request_is_aborted_and_forgotten() {
        let mut slot = Slot::Idle;
        let handle = RequestHandle::new(5);
        slot.fill(handle.clone(), "download");

        assert_eq!(slot.discard(), Some("download"));
        assert!(!slot.is_pending());
        assert_eq!(handle.state(), RequestState::Aborted);

        handle.complete(HttpResponse::new(200, "{}"));
        assert!(slot.take_finished().is_none());
        assert_eq!(slot.discard(), None);
    }
}
