//! Error handling for the voting service

/// Result type alias for the voting service
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the voting service
///
/// These are infrastructure failures (missing files, bad configuration,
/// face model trouble). Per-request refusals in the voting flow are modelled by
/// [`crate::verification::Rejection`] instead.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Voter registry could not be loaded
    #[error("Registry error: {message}")]
    Registry { message: String },

    /// Face encoding or image handling errors
    #[error("Face error: {message}")]
    Face { message: String },

    /// Voting-specific errors
    #[error("Voting error: {message}")]
    Voting { message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation failed: {field}")]
    Validation { field: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new registry error
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    /// Create a new face error
    pub fn face(message: impl Into<String>) -> Self {
        Self::Face {
            message: message.into(),
        }
    }

    /// Create a new voting error
    pub fn voting(message: impl Into<String>) -> Self {
        Self::Voting {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenience macros for creating specific error types
#[macro_export]
macro_rules! face_error {
    ($msg:expr) => {
        $crate::Error::face($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::face(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! voting_error {
    ($msg:expr) => {
        $crate::Error::voting($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::voting(format!($fmt, $($arg)*))
    };
}
