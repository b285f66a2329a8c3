use thiserror::Error;

/// Errors raised by the message-board subsystem.
#[derive(Debug, Error)]
pub enum MbError {
    #[error("unknown message {0:?}")]
    UnknownMessage(String),

    #[error("message {0:?} is already registered")]
    AlreadyExists(String),

    #[error("mismatched type: board holds {expected}, access used {found}")]
    MismatchedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("writer is no longer connected to its board")]
    Disconnected,

    #[error("access denied: {op} on message {message:?} not granted to this task")]
    AccessDenied { message: String, op: &'static str },

    #[error("out of range: {0}")]
    OutOfRange(String),
}

/// Shorthand result type for the message-board subsystem.
pub type MbResult<T> = Result<T, MbError>;
