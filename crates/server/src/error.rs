use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls error: {0}")]
    Tls(String),
    #[error(transparent)]
    Engine(#[from] switchboard_core::SwitchboardError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
