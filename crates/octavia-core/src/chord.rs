//! Chords: simultaneous notes with their own length and velocity

use serde::{Deserialize, Deserializer, Serialize};

use crate::note::Note;

/// Note lengths from a 64th up to a double whole note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteLength {
    SixtyFourth,
    ThirtySecond,
    Sixteenth,
    Eighth,
    #[default]
    Quarter,
    Half,
    Whole,
    DoubleWhole,
}

impl NoteLength {
    pub const SHORTEST: NoteLength = NoteLength::SixtyFourth;
    pub const LONGEST: NoteLength = NoteLength::DoubleWhole;

    const ORDER: [NoteLength; 8] = [
        Self::SixtyFourth,
        Self::ThirtySecond,
        Self::Sixteenth,
        Self::Eighth,
        Self::Quarter,
        Self::Half,
        Self::Whole,
        Self::DoubleWhole,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Half as long, clamped at the shortest length
    pub fn halved(self) -> NoteLength {
        Self::ORDER[self.index().saturating_sub(1)]
    }

    /// Twice as long, clamped at the longest length
    pub fn doubled(self) -> NoteLength {
        Self::ORDER[(self.index() + 1).min(Self::ORDER.len() - 1)]
    }

    /// Length in ticks for a given quarter-note resolution
    pub fn ticks(self, ppq: u32) -> u64 {
        let ppq = ppq as u64;
        match self {
            Self::SixtyFourth => ppq / 16,
            Self::ThirtySecond => ppq / 8,
            Self::Sixteenth => ppq / 4,
            Self::Eighth => ppq / 2,
            Self::Quarter => ppq,
            Self::Half => ppq * 2,
            Self::Whole => ppq * 4,
            Self::DoubleWhole => ppq * 8,
        }
    }
}

/// What a chord slot plays
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Reserved marker: silence, never resolved
    Rest,
    Note(Note),
}

/// One voice of a chord
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordNote {
    pub tone: Tone,
    #[serde(default)]
    pub length: NoteLength,
    #[serde(default = "default_velocity", deserialize_with = "clamped_velocity")]
    pub velocity: u8,
}

pub const MAX_VELOCITY: u8 = 127;

fn default_velocity() -> u8 {
    100
}

fn clamped_velocity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(u64::deserialize(deserializer)?.min(MAX_VELOCITY as u64) as u8)
}

impl ChordNote {
    pub fn new(note: impl Into<Note>) -> Self {
        Self {
            tone: Tone::Note(note.into()),
            length: NoteLength::default(),
            velocity: default_velocity(),
        }
    }

    pub fn rest() -> Self {
        Self {
            tone: Tone::Rest,
            length: NoteLength::default(),
            velocity: 0,
        }
    }

    pub fn with_length(mut self, length: NoteLength) -> Self {
        self.length = length;
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity.min(MAX_VELOCITY);
        self
    }

    pub fn is_rest(&self) -> bool {
        matches!(self.tone, Tone::Rest)
    }

    pub fn note(&self) -> Option<&Note> {
        match &self.tone {
            Tone::Rest => None,
            Tone::Note(note) => Some(note),
        }
    }
}

/// Notes sounding together for one pattern step
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chord {
    pub notes: Vec<ChordNote>,
}

impl Chord {
    pub fn new(notes: Vec<ChordNote>) -> Self {
        Self { notes }
    }

    /// A silent step
    pub fn rest() -> Self {
        Self::new(vec![ChordNote::rest()])
    }

    /// Chord of plain notes with default length and velocity
    pub fn of(notes: impl IntoIterator<Item = Note>) -> Self {
        Self::new(notes.into_iter().map(ChordNote::new).collect())
    }

    /// Empty, or nothing but rests
    pub fn is_silent(&self) -> bool {
        self.notes.iter().all(ChordNote::is_rest)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
