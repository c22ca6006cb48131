use thiserror::Error;

#[derive(Error, Debug)]
pub enum RlError {
    #[error("tensor error: {0}")]
    Tch(#[from] tch::TchError),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: i64, actual: i64 },

    #[error("invalid action {index} for action space of size {n}")]
    InvalidAction { index: i64, n: i64 },

    #[error("observation {observation} outside discrete space of size {n}")]
    ObservationOutOfRange { observation: i64, n: i64 },

    #[error("replay buffer holds {available} transitions, {requested} requested")]
    InsufficientSamples { requested: usize, available: usize },

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("plot error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, RlError>;
