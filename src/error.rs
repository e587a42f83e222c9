//! Error types and handling.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Request parameters rejected before any lookup
    #[error("Validation error: {0}")]
    Validation(String),

    /// Holiday source unreachable or returned a failure status
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Excel rendering failed
    #[error("Render error: {0}")]
    Render(#[from] rust_xlsxwriter::XlsxError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Envelope status codes shared with API clients.
pub mod code {
    pub const OK: i32 = 0;
    pub const FAILED: i32 = 1000;
    pub const PARAMS_ERROR: i32 = 1002;
    pub const SERVICE_UNAVAILABLE: i32 = 2001;
    pub const SERVICE_ERROR: i32 = 5001;

    /// Get human-readable message for an envelope code.
    pub fn message(code: i32) -> &'static str {
        match code {
            OK => "Success",
            FAILED => "Failed",
            PARAMS_ERROR => "Params Error",
            SERVICE_UNAVAILABLE => "Service Unavailable",
            SERVICE_ERROR => "Service Error",
            _ => "Unknown Error",
        }
    }
}

impl AppError {
    /// Create a validation error with message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an upstream error with message
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a config error with message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Envelope code reported to API clients.
    pub fn code(&self) -> i32 {
        match self {
            Self::Validation(_) => code::PARAMS_ERROR,
            Self::Upstream(_) => code::SERVICE_UNAVAILABLE,
            Self::Database(_) | Self::Render(_) | Self::Io(_) => code::FAILED,
            Self::Config(_) => code::SERVICE_ERROR,
        }
    }
}
