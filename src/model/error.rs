//! Error types for chronotrack.
//!
//! This module defines the error taxonomy for the impure shell using `thiserror`. The pure
//! core (index, cache, layout, viewport) never fails: absent keys degrade to empty results and
//! unusable documents degrade to a [`crate::model::Rejection`].
//!
//! # Error Hierarchy
//!
//! - [`AppError`] - Top-level error returned from the binary
//!   - [`InputError`] - Vault access failures (missing root, watcher setup, IO)
//!   - [`crate::config::ConfigError`] - Config file read/parse failures
//!   - [`crate::logging::LoggingError`] - Tracing initialization failures
//!
//! # Error Recovery Strategy
//!
//! Per-document problems are **non-fatal**: they are logged and the document is left out of the
//! index. Only failures that make the whole vault unreadable propagate.

use crate::config::ConfigError;
use crate::logging::LoggingError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error encompassing all fatal failure modes.
///
/// All domain-specific error types convert to `AppError` via `From`, enabling clean
/// propagation with the `?` operator from `main`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to read the vault.
    #[error("Failed to read input: {0}")]
    Input(#[from] InputError),

    /// Failed to load configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to initialize logging.
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    /// Failed to write output.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize JSON output.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors encountered when reading documents from a vault directory.
///
/// # Recovery Patterns
///
/// - **RootNotFound / NotADirectory**: Display error and exit (user provided invalid path)
/// - **Watch**: Live mode unavailable; the one-shot scan result is still valid
/// - **Io**: Whole-directory failures; per-file failures never reach this type
#[derive(Debug, Error)]
pub enum InputError {
    /// The vault root does not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use chronotrack::model::error::InputError;
    ///
    /// let err = InputError::RootNotFound {
    ///     path: PathBuf::from("/tmp/missing-vault")
    /// };
    /// assert!(err.to_string().contains("/tmp/missing-vault"));
    /// ```
    #[error("Vault not found: {path}")]
    RootNotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The vault root exists but is a file.
    #[error("Vault path is not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// The file watcher could not be set up.
    #[error("Failed to watch {path}: {reason}")]
    Watch {
        /// Directory that could not be watched.
        path: PathBuf,
        /// Watcher error message.
        reason: String,
    },

    /// Generic I/O error reading the vault.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
