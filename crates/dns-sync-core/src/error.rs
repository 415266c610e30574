//! Error types for the DNS sync system
//!
//! Load-time failures ([`Error::Io`], [`Error::Parse`], [`Error::Validation`],
//! [`Error::MissingCredential`]) are fatal to startup. Run-time failures ([`Error::Resolution`],
//! [`Error::Provider`]) abort the current reconciliation cycle only.

use thiserror::Error;

/// Result type alias for DNS sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DNS sync system
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration or credential file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A declarative document is malformed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required field is missing or invalid after defaulting
    #[error("Validation error: entry #{index}: {field} cannot be empty")]
    Validation {
        /// Zero-based position of the offending item in its document
        index: usize,
        /// Name of the field as written in the document
        field: &'static str,
    },

    /// A key of the credential file is missing or empty
    #[error("Credential error: {key} cannot be empty")]
    MissingCredential {
        /// Name of the key as written in the file
        key: &'static str,
    },

    /// Name resolution failed
    #[error("Resolution error for {hostname}: {message}")]
    Resolution {
        /// Hostname that was being resolved
        hostname: String,
        /// Underlying resolver message
        message: String,
    },

    /// The DNS zone client rejected or failed an upsert
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Acquiring provider credentials failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid runtime settings (schedule strings and the like)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a validation error for a missing field
    pub fn validation(index: usize, field: &'static str) -> Self {
        Self::Validation { index, field }
    }

    /// Create an error for a missing credential key
    pub fn missing_credential(key: &'static str) -> Self {
        Self::MissingCredential { key }
    }

    /// Create a resolution error
    pub fn resolution(hostname: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Resolution {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error can only occur while loading configuration
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Parse(_) | Self::Validation { .. } | Self::MissingCredential { .. }
        )
    }

    /// The offending field name, for validation and credential errors
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(*field),
            Self::MissingCredential { key } => Some(*key),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
