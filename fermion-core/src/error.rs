//! Error taxonomy shared by the controlling context and the execution unit.

use crate::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected render input. Detected before anything crosses the channel.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid JSON input: {0}")]
    Malformed(String),

    #[error("width and height must be at least 1 (got {width}x{height})")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("width and height must not exceed {max} (got {width}x{height})")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("concurrency must be between 1 and {max} (got {value})")]
    Concurrency { value: u32, max: u32 },
}

/// Category of a failure reported by the execution unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// `render` arrived before `initialize` completed.
    NotInitialized,
    /// Arguments did not decode or describe an impossible scene.
    InvalidArguments,
    /// Method is not in the target's method table.
    UnknownMethod,
    /// Target object id is not (or no longer) registered.
    UnknownObject,
    /// The object was released while the call was waiting.
    Released,
    /// The render module itself failed.
    Render,
}

/// Failure payload carried by `ChannelMessage::Error`.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} ({kind:?})")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidArguments, message)
    }
}

/// Everything a render session can fail with.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RenderError {
    #[error(transparent)]
    InputValidation(#[from] ValidationError),

    #[error("render requested before the execution unit was initialized")]
    NotInitialized,

    #[error("execution unit channel closed")]
    ChannelClosed,

    #[error("remote operation failed: {0}")]
    Remote(RemoteError),

    #[error("a render session is already active")]
    Busy,

    #[error("remote object {0} has been released")]
    Released(ObjectId),

    #[error("remote object does not expose method `{0}`")]
    UnknownMethod(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no completed image to export")]
    NothingToExport,

    #[error("failed to export image: {0}")]
    Export(String),
}

impl From<RemoteError> for RenderError {
    fn from(error: RemoteError) -> Self {
        match error.kind {
            RemoteErrorKind::NotInitialized => RenderError::NotInitialized,
            _ => RenderError::Remote(error),
        }
    }
}
