#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid section map: {0}")]
    SectionMap(String),
    #[error("failed to normalize submission: {0}")]
    Normalization(String),
    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type IntakeResult<T> = std::result::Result<T, IntakeError>;
