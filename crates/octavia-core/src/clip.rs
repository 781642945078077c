//! Clips: timeline placements of a pattern on a track

use serde::{Deserialize, Serialize};

use crate::chord::NoteLength;
use crate::pattern::PatternId;
use crate::track::TrackId;
use crate::Tick;

/// Unique identifier for clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClipId(pub u64);

/// A view into a pattern: `duration` steps starting at step `offset`,
/// placed at `tick` on one track. Patterns loop when the clip outlasts them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clip {
    pub id: ClipId,
    pub track_id: TrackId,
    pub pattern_id: PatternId,
    /// Placement start
    pub tick: Tick,
    /// First pattern step played
    #[serde(default)]
    pub offset: u64,
    /// Number of steps played
    pub duration: u64,
}

impl Clip {
    pub fn new(id: ClipId, track_id: TrackId, pattern_id: PatternId, tick: Tick, duration: u64) -> Self {
        Self {
            id,
            track_id,
            pattern_id,
            tick,
            offset: 0,
            duration,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Exclusive end tick, saturating at the last tick
    pub fn end_tick(&self) -> Tick {
        self.tick.saturating_add(self.duration)
    }

    /// Pattern step played at clip step `step`; `None` for an empty pattern
    pub fn pattern_index(&self, step: u64, pattern_len: usize) -> Option<usize> {
        if pattern_len == 0 {
            return None;
        }
        let len = pattern_len as u64;
        Some(((self.offset % len + step % len) % len) as usize)
    }

    /// Every pattern step in play order
    pub fn pattern_indices(&self, pattern_len: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.duration).map_while(move |step| self.pattern_index(step, pattern_len))
    }
}

/// One resolved voice; `pitch` is `None` for a rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedNote {
    /// Absolute pitch before clamping to the MIDI range
    pub pitch: Option<i32>,
    pub length: NoteLength,
    pub velocity: u8,
}

impl ResolvedNote {
    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

/// The absolute chord sounding at one tick of a clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChord {
    pub tick: Tick,
    pub pattern_index: usize,
    pub notes: Vec<ResolvedNote>,
}

impl ResolvedChord {
    /// Sounding pitches, rests skipped
    pub fn pitches(&self) -> Vec<i32> {
        self.notes.iter().filter_map(|n| n.pitch).collect()
    }
}
