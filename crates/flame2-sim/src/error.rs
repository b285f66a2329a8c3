use flame2_exe::ExeError;
use flame2_io::IoError;
use flame2_mb::MbError;
use flame2_mem::MemError;
use thiserror::Error;

/// Errors surfaced to the simulation driver.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("{} task failure(s) in iteration {iteration}", failures.len())]
    IterationFailed {
        iteration: u64,
        failures: Vec<ExeError>,
    },

    #[error(transparent)]
    Exe(#[from] ExeError),

    #[error(transparent)]
    Mem(#[from] MemError),

    #[error(transparent)]
    Board(#[from] MbError),

    #[error(transparent)]
    Io(#[from] IoError),
}

/// Shorthand result type for the simulation driver.
pub type SimResult<T> = Result<T, SimError>;
