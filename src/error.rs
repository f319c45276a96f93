use crate::navigation::NavigationMode;
use std::path::PathBuf;
use thiserror::Error;

/// Failures the viewer reports through its status line instead of propagating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Failed to load model {}: {reason}", .path.display())]
    AssetLoadFailure { path: PathBuf, reason: String },
    #[error("Pointer capture denied: {0}")]
    PointerCaptureDenied(String),
    #[error("'{operation}' requires {expected:?} mode but {actual:?} is active")]
    InvalidModeTransition { operation: &'static str, expected: NavigationMode, actual: NavigationMode },
}

impl ViewerError {
    pub fn asset_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ViewerError::AssetLoadFailure { path: path.into(), reason: reason.into() }
    }
}
