//! Outcome events emitted by the coordinator.
//!
//! Every issued operation and every reconciliation produces one
//! [`CloudEvent`]. Presentation layers render the latest one (or drain the
//! buffer) instead of reading a shared status string.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;

/// The kinds of work the coordinator tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Login,
    Register,
    Logout,
    SettingsUpload,
    SettingsDownload,
    AssetUpload,
    FolderUpload,
    AssetDownload,
    Inventory,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Login => "Login",
            Operation::Register => "Registration",
            Operation::Logout => "Logout",
            Operation::SettingsUpload => "Settings upload",
            Operation::SettingsDownload => "Settings download",
            Operation::AssetUpload => "Asset upload",
            Operation::FolderUpload => "Folder upload",
            Operation::AssetDownload => "Asset download",
            Operation::Inventory => "Inventory refresh",
        };
        f.write_str(name)
    }
}

/// Why an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Attempted without a session token; nothing was sent.
    NotAuthenticated,
    /// A request of the same kind is still in flight; nothing was sent.
    Busy,
    /// The request ended in `Error` or `Aborted`.
    Transport,
    /// The request finished but the body was not what was expected.
    MalformedPayload,
    /// Reading or writing a local file failed.
    LocalIo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The request was issued.
    Started,
    Succeeded,
    /// Finished without error but had nothing to act on.
    NothingToDo,
    Failed(FailureKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloudEvent {
    pub operation: Operation,
    pub outcome: Outcome,
    pub detail: String,
}

impl CloudEvent {
    pub fn new(operation: Operation, outcome: Outcome, detail: impl Into<String>) -> Self {
        Self {
            operation,
            outcome,
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match self.outcome {
            Outcome::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for CloudEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.outcome {
            Outcome::Started => "in progress",
            Outcome::Succeeded => "succeeded",
            Outcome::NothingToDo => "finished",
            Outcome::Failed(_) => "failed",
        };
        if self.detail.is_empty() {
            write!(f, "{} {}", self.operation, verb)
        } else {
            write!(f, "{} {}: {}", self.operation, verb, self.detail)
        }
    }
}

const MAX_BUFFERED_EVENTS: usize = 256;

/// Bounded buffer of undrained events plus the most recent one.
#[derive(Debug, Default)]
pub struct EventLog {
    pending: VecDeque<CloudEvent>,
    last: Option<CloudEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: CloudEvent) {
        if self.pending.len() == MAX_BUFFERED_EVENTS {
            self.pending.pop_front();
        }
        self.pending.push_back(event.clone());
        self.last = Some(event);
    }

    /// Take every event not yet drained, oldest first.
    pub fn drain(&mut self) -> Vec<CloudEvent> {
        self.pending.drain(..).collect()
    }

    pub fn last(&self) -> Option<&CloudEvent> {
        self.last.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let event = CloudEvent::new(
            Operation::Login,
            Outcome::Failed(FailureKind::MalformedPayload),
            "response has no string token",
        );
        assert_eq!(
            event.to_string(),
            "Login failed: response has no string token"
        );
        assert!(event.is_failure());
        assert_eq!(event.failure(), Some(FailureKind::MalformedPayload));
    }

    #[test]
    fn display_without_detail() {
        let event = CloudEvent::new(Operation::Inventory, Outcome::Started, "");
        assert_eq!(event.to_string(), "Inventory refresh in progress");
        assert!(!event.is_failure());
    }

    #[test]
    fn log_drains_in_order_and_keeps_last() {
        let mut log = EventLog::new();
        log.push(CloudEvent::new(Operation::Login, Outcome::Started, "a"));
        log.push(CloudEvent::new(Operation::Login, Outcome::Succeeded, "b"));

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].detail, "a");
        assert!(log.drain().is_empty());
        assert_eq!(log.last().unwrap().detail, "b");
    }

    #[test]
    fn log_is_bounded() {
        let mut log = EventLog::new();
        for i in 0..(MAX_BUFFERED_EVENTS + 10) {
            log.push(CloudEvent::new(Operation::Inventory, Outcome::Started, i.to_string()));
        }
        let drained = log.drain();
        assert_eq!(drained.len(), MAX_BUFFERED_EVENTS);
        assert_eq!(drained[0].detail, "10");
    }

    #[test]
    fn serializes_failure_reason() {
        let event = CloudEvent::new(
            Operation::AssetDownload,
            Outcome::Failed(FailureKind::Transport),
            "HTTP 404 Not Found",
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["operation"], "asset_download");
        assert_eq!(json["outcome"]["failed"], "transport");
        assert_eq!(json["detail"], "HTTP 404 Not Found");
    }
}
