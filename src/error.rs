use thiserror::Error;

/// Main error type for the procmon supervisor
#[derive(Debug, Error)]
pub enum ProcmonError {
    // Process-related errors
    #[error("Failed to spawn process: {0}")]
    SpawnError(String),

    #[error("Signal error: {0}")]
    SignalError(String),

    // Statistics source errors
    #[error("Failed to read statistics for pid {pid}: {source}")]
    StatRead {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed statistics record: {0}")]
    StatParse(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for procmon operations
pub type Result<T> = std::result::Result<T, ProcmonError>;
