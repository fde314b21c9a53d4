use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error reported by the marketplace backend, unwrapped to a
    /// human-readable message (server-supplied when available).
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Invalid file type: {content_type}. Allowed types are {allowed}.")]
    InvalidFileType {
        content_type: String,
        allowed: String,
    },

    #[error("File too large: {size} bytes. Maximum size is {max_mb} MB.")]
    FileTooLarge { size: u64, max_mb: u64 },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    /// Terminal authentication failure: the stored credentials were purged
    /// and the user has to sign in again.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_file_type(content_type: &str, allowed: &[String]) -> Self {
        Self::InvalidFileType {
            content_type: content_type.to_string(),
            allowed: allowed.join(", "),
        }
    }

    pub fn file_too_large(size: u64, max_bytes: u64) -> Self {
        Self::FileTooLarge {
            size,
            max_mb: max_bytes / (1024 * 1024),
        }
    }

    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Transient failures worth another attempt. Auth errors are excluded so
    /// the backoff helper never loops on a rejected token.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Network(_) | AppError::Io(_) | AppError::UploadFailed { .. } => true,
            AppError::Api { status, .. } => matches!(*status, 429 | 500..=599),
            _ => false,
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidFileType { .. }
                | AppError::FileTooLarge { .. }
                | AppError::Config(_)
        )
    }

    pub fn is_auth_error(&self) -> bool {
        match self {
            AppError::SessionExpired => true,
            AppError::Api { status, .. } => *status == 401,
            _ => false,
        }
    }
}
