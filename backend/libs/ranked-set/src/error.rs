//! Ranked set error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankedSetError {
    #[error("Snapshot encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RankedSetResult<T> = Result<T, RankedSetError>;
