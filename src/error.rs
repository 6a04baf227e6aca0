//! Error types for settings storage and context operations
//!
//! This module defines the error types used throughout the reddsimp library.
//! All public functions return [`Result<T, Error>`] for consistent error handling.

use std::path::PathBuf;

use crate::storage::BackendKind;

/// Errors that can occur during settings storage and context operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Storage backend reported an availability error
    #[error("{backend} storage backend is unavailable: {reason}")]
    BackendUnavailable {
        backend: BackendKind,
        reason: String,
    },

    /// Persisted settings document could not be read or written as JSON
    #[error("Malformed settings document at {path}: {source}")]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Setting key is not part of the canonical schema
    #[error("Unknown setting key '{0}'")]
    UnknownKey(String),

    /// Value has the wrong shape for a known setting key
    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    /// Message target is not currently open
    #[error("No receiving context: {0}")]
    NoReceiver(&'static str),
}

/// Result type alias for convenience
///
/// All public functions in the reddsimp library return this type alias for
/// consistent error handling.
///
/// # Example
///
/// ```rust
/// use reddsimp::{Result, SettingsStore};
///
/// fn read_master_switch(store: &mut SettingsStore) -> Result<bool> {
///     let settings = store.get(&["redd_on"])?;
///     Ok(settings.get("redd_on").and_then(|v| v.as_bool()).unwrap_or(false))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
