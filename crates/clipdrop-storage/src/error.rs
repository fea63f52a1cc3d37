//! Storage error types.

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0} is not set")]
    MissingEnv(String),

    #[error("Invalid storage configuration: {0}")]
    ConfigError(String),

    #[error("Refusing to upload an empty object to {0}")]
    EmptyPayload(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Invalid public URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to read upload source: {0}")]
    Io(#[from] std::io::Error),

    #[error("R2 request failed: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Missing or malformed settings, as opposed to a failed request.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::MissingEnv(_) | Self::ConfigError(_) | Self::InvalidUrl(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_classified() {
        assert!(StorageError::MissingEnv("R2_BUCKET_NAME".into()).is_config());
        assert!(StorageError::config_error("bad scheme").is_config());
        assert!(!StorageError::upload_failed("503").is_config());
        assert_eq!(
            StorageError::MissingEnv("R2_BUCKET_NAME".into()).to_string(),
            "R2_BUCKET_NAME is not set"
        );
    }
}
