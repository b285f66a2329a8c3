use flame2_core::VarType;
use thiserror::Error;

/// Errors raised by the memory subsystem.
#[derive(Debug, Error)]
pub enum MemError {
    #[error("unknown agent {0:?}")]
    UnknownAgent(String),

    #[error("unknown variable {var:?} for agent {agent:?}")]
    UnknownVariable { agent: String, var: String },

    #[error("{what} {name:?} is already registered")]
    AlreadyExists { what: &'static str, name: String },

    #[error("registration is closed: {0}")]
    RegistrationClosed(String),

    #[error("mismatched type: column holds {expected}, access used {requested}")]
    MismatchedType {
        expected: VarType,
        requested: VarType,
    },

    #[error("access denied: {op} on variable {var:?} not granted to this task")]
    AccessDenied { var: String, op: &'static str },

    #[error("out of range: {0}")]
    OutOfRange(String),
}

/// Shorthand result type for the memory subsystem.
pub type MemResult<T> = Result<T, MemError>;
