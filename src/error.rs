use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid customer id: {0:?}")]
    InvalidCustomerId(String),

    #[error("Invalid context update: {0}")]
    InvalidUpdate(String),
}

pub type MemoryResult<T> = Result<T, MemoryError>;

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Text too long for synthesis: {chars} chars (max {max})")]
    TooLong { chars: usize, max: usize },
}
