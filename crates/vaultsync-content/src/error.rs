//! Error types for vaultsync-content

/// Result type for vaultsync-content operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting content
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Export is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Failed to convert {format} content: {message}")]
    Conversion { format: String, message: String },
}

impl Error {
    pub fn conversion(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            format: format.into(),
            message: message.into(),
        }
    }
}
