//! Note-on/note-off events from materialized chords

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::chord::{NoteLength, MAX_VELOCITY};
use crate::clip::ResolvedChord;

/// Maps pattern steps and note lengths onto an event tick grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTiming {
    /// Event ticks per quarter note
    pub ppq: u32,
    /// Musical length of one pattern step
    pub step: NoteLength,
}

impl Default for EventTiming {
    fn default() -> Self {
        Self {
            ppq: 480,
            step: NoteLength::Sixteenth,
        }
    }
}

impl EventTiming {
    pub fn step_ticks(&self) -> u64 {
        self.step.ticks(self.ppq)
    }
}

/// A single MIDI note event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub tick: u64,
    /// MIDI note number (0-127, 60 = middle C)
    pub pitch: u8,
    pub velocity: u8,
    pub is_note_on: bool,
}

/// Flatten resolved chords into tick-ordered note events.
///
/// Rests emit nothing. Pitches outside 0-127 are clamped. At equal ticks
/// note-offs sort before note-ons so retriggered pitches are not cut.
pub fn to_note_events(chords: &[ResolvedChord], timing: EventTiming) -> Vec<NoteEvent> {
    let step_ticks = timing.step_ticks();
    let mut events = Vec::new();

    for chord in chords {
        let start = chord.tick.saturating_mul(step_ticks);
        for note in &chord.notes {
            let Some(pitch) = note.pitch else { continue };
            let clamped = pitch.clamp(0, 127) as u8;
            if clamped as i32 != pitch {
                trace!("Clamped pitch {} to {} at tick {}", pitch, clamped, chord.tick);
            }
            let length = note.length.ticks(timing.ppq).max(1);
            events.push(NoteEvent {
                tick: start,
                pitch: clamped,
                velocity: note.velocity.min(MAX_VELOCITY),
                is_note_on: true,
            });
            events.push(NoteEvent {
                tick: start.saturating_add(length),
                pitch: clamped,
                velocity: 0,
                is_note_on: false,
            });
        }
    }

    events.sort_by_key(|e| (e.tick, e.is_note_on, e.pitch));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ResolvedNote;

    fn chord(tick: u64, pitches: &[Option<i32>], length: NoteLength) -> ResolvedChord {
        ResolvedChord {
            tick,
            pattern_index: 0,
            notes: pitches
                .iter()
                .map(|&pitch| ResolvedNote {
                    pitch,
                    length,
                    velocity: 100,
                })
                .collect(),
        }
    }

    #[test]
    fn test_events_on_grid() {
        let timing = EventTiming::default();
        let chords = vec![
            chord(0, &[Some(60), None], NoteLength::Sixteenth),
            chord(1, &[Some(64)], NoteLength::Eighth),
        ];
        let events = to_note_events(&chords, timing);
        let summary: Vec<(u64, u8, bool)> = events.iter().map(|e| (e.tick, e.pitch, e.is_note_on)).collect();
        assert_eq!(
            summary,
            vec![(0, 60, true), (120, 60, false), (120, 64, true), (360, 64, false)]
        );
    }

    #[test]
    fn test_out_of_range_pitch_is_clamped() {
        let events = to_note_events(&[chord(0, &[Some(140), Some(-3)], NoteLength::Quarter)], EventTiming::default());
        let pitches: Vec<u8> = events.iter().filter(|e| e.is_note_on).map(|e| e.pitch).collect();
        assert_eq!(pitches, vec![0, 127]);
    }
}
