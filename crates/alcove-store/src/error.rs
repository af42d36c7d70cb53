use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Room or file identifier rejected by the sanitizer.
    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("not found")]
    NotFound,

    /// Upload target room has no directory.
    #[error("room {0} does not exist")]
    RoomMissing(String),

    #[error("upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// The incoming byte stream failed mid-upload.
    #[error("upload stream failed: {0}")]
    Body(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
