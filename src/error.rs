use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("malformed server payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("invalid board: {0}")]
    InvalidBoard(String),
    #[error("invalid cell {0:?}, expected a letter A-F followed by 1-6")]
    InvalidCell(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("dom: {0}")]
    Dom(String),
}
