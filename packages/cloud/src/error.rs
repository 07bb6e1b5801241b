use std::io;

use crate::event::{FailureKind, Operation};
use crate::path::PathError;

#[derive(thiserror::Error, Debug)]
pub enum CloudError {
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("{operation} already in progress")]
    Busy { operation: Operation },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] cloudsync_http::Error),

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CloudError {
    pub fn io(path: impl ToString, source: io::Error) -> Self {
        CloudError::Io {
            path: path.to_string(),
            source,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        CloudError::MalformedPayload {
            message: message.into(),
        }
    }

    pub fn request_failed(message: impl Into<String>) -> Self {
        CloudError::RequestFailed {
            message: message.into(),
        }
    }

    /// The event classification for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            CloudError::NotAuthenticated => FailureKind::NotAuthenticated,
            CloudError::Busy { .. } => FailureKind::Busy,
            CloudError::Io { .. } | CloudError::InvalidPath(_) => FailureKind::LocalIo,
            CloudError::Json(_) | CloudError::MalformedPayload { .. } => {
                FailureKind::MalformedPayload
            }
            CloudError::Transport(_)
            | CloudError::RequestFailed { .. }
            | CloudError::Url(_)
            | CloudError::Config { .. } => FailureKind::Transport,
        }
    }
}

pub type CloudResult<T> = Result<T, CloudError>;
