use flame2_mem::MemError;
use thiserror::Error;

/// Errors raised by population I/O.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown I/O plugin {0:?}")]
    UnknownPlugin(String),

    #[error("I/O plugin {0:?} is already registered")]
    DuplicatePlugin(String),

    #[error("no registered plugin handles {0:?}")]
    UnsupportedFormat(String),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error(transparent)]
    Mem(#[from] MemError),
}

/// Shorthand result type for population I/O.
pub type IoResult<T> = Result<T, IoError>;
