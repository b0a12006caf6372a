use thiserror::Error;

#[derive(Debug, Error)]
pub enum TutorError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("text normalizer unavailable: {0}")]
    NormalizationUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("console error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TutorResult<T> = Result<T, TutorError>;
