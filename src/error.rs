use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("registry is full ({capacity} participants)")]
    CapacityExceeded { capacity: usize },

    #[error("nickname already taken: {0}")]
    NicknameTaken(String),
}
