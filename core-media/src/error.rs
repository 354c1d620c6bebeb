use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Unknown codec: {0}")]
    UnknownCodec(String),

    #[error("Unknown container: {0}")]
    UnknownContainer(String),
}

pub type Result<T> = std::result::Result<T, MediaError>;
