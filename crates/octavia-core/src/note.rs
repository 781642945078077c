//! Absolute and relative note references

use serde::{Deserialize, Serialize};

use crate::scale::ScaleId;
use crate::vector::Vector;

/// A note expressed as a degree of its parent scale
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeNote {
    /// Index into the parent scale's note list (wraps with octave correction)
    pub degree: i32,
    /// Chromatic, octave and per-scale adjustments
    #[serde(default, skip_serializing_if = "Vector::is_zero")]
    pub offset: Vector,
    /// Scale this degree refers to; `None` means the immediate parent
    #[serde(default, rename = "scale", skip_serializing_if = "Option::is_none")]
    pub scale_id: Option<ScaleId>,
}

impl RelativeNote {
    pub fn new(degree: i32) -> Self {
        Self {
            degree,
            ..Default::default()
        }
    }

    pub fn with_offset(mut self, offset: Vector) -> Self {
        self.offset = offset;
        self
    }

    pub fn in_scale(mut self, scale: ScaleId) -> Self {
        self.scale_id = Some(scale);
        self
    }
}

/// Either a terminal MIDI pitch or a scale-relative reference.
///
/// Absolute pitches are kept as `i32` so intermediate arithmetic may leave
/// the MIDI range; clamping happens when events are emitted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Note {
    Absolute(i32),
    Relative(RelativeNote),
}

impl Note {
    pub fn degree(degree: i32) -> Self {
        Self::Relative(RelativeNote::new(degree))
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Absolute(_))
    }

    /// Fold an offset vector into this note.
    ///
    /// Absolute pitches only take the chromatic and octave components;
    /// relative notes take the whole vector so scale-keyed steps are
    /// honoured further down the chain.
    pub fn with_offset(&self, offset: &Vector) -> Note {
        if offset.is_zero() {
            return self.clone();
        }
        match self {
            Self::Absolute(pitch) => Self::Absolute(pitch + offset.semitones()),
            Self::Relative(rel) => Self::Relative(RelativeNote {
                degree: rel.degree,
                offset: rel.offset.clone() + offset,
                scale_id: rel.scale_id,
            }),
        }
    }

    /// Shift by semitones: raw value for absolute notes, chromatic offset otherwise
    pub fn transposed(&self, semitones: i32) -> Note {
        self.with_offset(&Vector::chromatic(semitones))
    }

    /// Shift by whole octaves, keeping the representation
    pub fn octave_shifted(&self, octaves: i32) -> Note {
        self.with_offset(&Vector::octave(octaves))
    }
}

impl From<i32> for Note {
    fn from(pitch: i32) -> Self {
        Self::Absolute(pitch)
    }
}

impl From<RelativeNote> for Note {
    fn from(rel: RelativeNote) -> Self {
        Self::Relative(rel)
    }
}
