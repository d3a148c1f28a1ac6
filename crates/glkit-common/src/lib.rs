//! # GLKit Common
//!
//! Common error types, configuration, and logging setup shared by the GLKit crates.
//!
//! ## Features
//!
//! - Unified error type with backtrace support for internal failures
//! - Serde-backed context and info-log configuration
//! - Logging configuration and setup

use thiserror::Error;

pub mod config;
pub mod logging;

pub use config::{ContextConfig, InfoLogConfig};
pub use logging::{init_logging, LogConfig, LogFormat};

/// Driver capabilities that may be missing on older driver versions or profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverFeature {
    /// Uniform buffer objects (`glGetUniformBlockIndex`, `glUniformBlockBinding`).
    UniformBlocks,
    /// Shader storage blocks (`glGetProgramResourceIndex`, `glShaderStorageBlockBinding`).
    StorageBlocks,
    /// Fragment output binding (`glBindFragDataLocation`).
    FragDataLocation,
}

impl DriverFeature {
    /// Human-readable name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverFeature::UniformBlocks => "uniform blocks",
            DriverFeature::StorageBlocks => "shader storage blocks",
            DriverFeature::FragDataLocation => "fragment data locations",
        }
    }
}

impl std::fmt::Display for DriverFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for GLKit.
#[derive(Error, Debug)]
pub enum GlKitError {
    /// The resource was already disposed.
    #[error("{resource} has been disposed")]
    Disposed { resource: &'static str },

    /// The owning graphics context could not be made current.
    #[error("Graphics context unavailable: {reason}")]
    ContextUnavailable { reason: String },

    /// The driver lacks the entry point required for the operation.
    #[error("Unsupported driver feature: {feature}")]
    Unsupported { feature: DriverFeature },

    /// The driver rejected the operation in the resource's current state.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Configuration errors.
    #[error("Config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal error (unexpected).
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        backtrace: Option<backtrace::Backtrace>,
    },
}

impl GlKitError {
    /// Create a disposed-resource error.
    pub fn disposed(resource: &'static str) -> Self {
        Self::Disposed { resource }
    }

    /// Create a context-unavailable error.
    pub fn context_unavailable(reason: impl Into<String>) -> Self {
        Self::ContextUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an unsupported-feature error.
    pub fn unsupported(feature: DriverFeature) -> Self {
        Self::Unsupported { feature }
    }

    /// Create an invalid-operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a config error with source.
    pub fn config_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error with backtrace.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            backtrace: Some(backtrace::Backtrace::new()),
        }
    }

    /// Check if this error indicates a bug in the caller rather than the environment.
    pub fn is_programmer_error(&self) -> bool {
        matches!(self, GlKitError::Disposed { .. })
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            GlKitError::Disposed { .. } => "disposed",
            GlKitError::ContextUnavailable { .. } => "context_unavailable",
            GlKitError::Unsupported { .. } => "unsupported",
            GlKitError::InvalidOperation { .. } => "invalid_operation",
            GlKitError::Config { .. } => "config",
            GlKitError::Internal { .. } => "internal",
        }
    }
}

/// Result type alias for GLKit operations.
pub type Result<T> = std::result::Result<T, GlKitError>;
