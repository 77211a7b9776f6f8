use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown conversation status: {0}")]
    UnknownStatus(String),

    #[error("Unknown event window: {0}")]
    UnknownWindow(String),

    #[error("Unknown capacity policy: {0}")]
    UnknownCapacityPolicy(String),
}
