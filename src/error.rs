use thiserror::Error;

/// Main error type for easylog
#[derive(Debug, Error)]
pub enum EasylogError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    // Directory errors
    #[error("Log directory {0} is not writable: {1}")]
    DirectoryNotWritable(String, String),

    #[error("No writable log directory found (tried: {0})")]
    NoWritableDirectory(String),

    // Log file errors
    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    #[error("Log write failed: {0}")]
    LogWriteError(String),

    #[error("Log rotation failed: {0}")]
    LogRotationError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for easylog operations
pub type Result<T> = std::result::Result<T, EasylogError>;
