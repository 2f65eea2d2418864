//! Errors returned by session commands

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Redundant join or leave request
    #[error("Request ignored: {0}")]
    AlreadyActive(String),

    #[error("Engine rejected the request with code {code}: {description}")]
    EngineRejected { code: i32, description: String },

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Mute and speaker routing can only change while joined
    #[error("Not joined to a channel")]
    NotJoined,

    #[error("Session controller has been shut down")]
    ControllerDisposed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
