//! Error types for octavia

use std::fmt;

use thiserror::Error;

use crate::clip::ClipId;
use crate::pattern::PatternId;
use crate::scale::ScaleId;
use crate::track::TrackId;
use crate::transposition::TranspositionId;

/// An id that was looked up in a snapshot and not found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Track(TrackId),
    Scale(ScaleId),
    Pattern(PatternId),
    Clip(ClipId),
    Transposition(TranspositionId),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Track(id) => write!(f, "track {}", id.0),
            Self::Scale(id) => write!(f, "scale {}", id.0),
            Self::Pattern(id) => write!(f, "pattern {}", id.0),
            Self::Clip(id) => write!(f, "clip {}", id.0),
            Self::Transposition(id) => write!(f, "transposition {}", id.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A relative note ran out of scales before reaching an absolute pitch
    #[error("Broken scale chain: relative note unresolved after {depth} scale(s)")]
    BrokenChain { depth: usize },
    #[error("Cyclic chain through {0}")]
    CyclicChain(Reference),
    #[error("Scale {0:?} has no notes")]
    EmptyScale(Option<u64>),
    #[error("Dangling reference: {0}")]
    DanglingReference(Reference),
    #[error("Pattern {0} has no chords")]
    EmptyPattern(u64),
    #[error("Duplicate id: {0} already exists")]
    DuplicateId(Reference),
}

impl ResolveError {
    /// Structural errors mean corrupted project state and must reach the caller.
    /// Everything else is a soft failure the materializer absorbs.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::BrokenChain { .. } | Self::CyclicChain(_) | Self::EmptyScale(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
