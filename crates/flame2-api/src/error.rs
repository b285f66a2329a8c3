use flame2_mb::MbError;
use flame2_mem::MemError;
use thiserror::Error;

/// Any failure an agent transition function can hit through the proxy.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Memory(#[from] MemError),

    #[error(transparent)]
    Board(#[from] MbError),
}
