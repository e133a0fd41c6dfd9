//! Navigation script error types.

use std::path::PathBuf;

/// Errors that can occur while loading or replaying a navigation script.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Failed to read the script file
    #[error("Failed to read script {path}: {source}")]
    LoadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the script
    #[error("Failed to parse script: {0}")]
    ParseFailed(String),

    /// A step cannot be replayed
    #[error("Invalid step {index}: {message}")]
    InvalidStep { index: usize, message: String },
}
