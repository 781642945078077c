//! octavia-core: Scale-chain resolution and clip materialization

pub mod chord;
pub mod clip;
mod error;
pub mod events;
pub mod hierarchy;
pub mod materialize;
pub mod note;
pub mod pattern;
pub mod resolver;
pub mod scale;
mod track;
pub mod transposition;
pub mod vector;

/// Timeline position, one tick per pattern step
pub type Tick = u64;

pub use chord::{Chord, ChordNote, NoteLength, Tone, MAX_VELOCITY};
pub use clip::{Clip, ClipId, ResolvedChord, ResolvedNote};
pub use error::{Reference, ResolveError, Result};
pub use events::{to_note_events, EventTiming, NoteEvent};
pub use hierarchy::{Hierarchy, TrackHierarchy};
pub use materialize::materialize;
pub use note::{Note, RelativeNote};
pub use pattern::{ChordStream, Pattern, PatternId};
pub use resolver::{nearest_relative_note, resolve_note, resolve_scale_to_midi, ScaleChain};
pub use scale::{Scale, ScaleId, ScaleMode};
pub use track::{TrackId, TrackNode};
pub use transposition::{
    active_offset, offsets_for_chain_at_tick, Transposition, TranspositionId, TranspositionLookup,
};
pub use vector::{OffsetKey, Vector};
