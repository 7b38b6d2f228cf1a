use thiserror::Error;

#[derive(Error, Debug)]
pub enum SwitchboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("resource scan error: {0}")]
    Scan(#[from] walkdir::Error),
    #[error("resource error: {0}")]
    Resource(String),
    #[error("plugin error: {0}")]
    Plugin(String),
    #[error("registry is sealed, cannot register {0}")]
    Sealed(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for SwitchboardError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        SwitchboardError::Plugin(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SwitchboardError>;
