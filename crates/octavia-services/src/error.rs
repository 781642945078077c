//! Error types for the session layer

use octavia_core::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("Track not found: {0}")]
    TrackNotFound(u64),
    #[error("Scale not found: {0}")]
    ScaleNotFound(u64),
    #[error("Pattern not found: {0}")]
    PatternNotFound(u64),
    #[error("Clip not found: {0}")]
    ClipNotFound(u64),
    #[error("Transposition not found: {0}")]
    TranspositionNotFound(u64),
    #[error("Scale {0} is not attached to any track")]
    DetachedScale(u64),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
