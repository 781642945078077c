//! Time-scoped transpositions and their overlay at a tick

use serde::{Deserialize, Serialize};

use crate::hierarchy::TrackHierarchy;
use crate::track::TrackId;
use crate::vector::Vector;
use crate::Tick;

/// Unique identifier for transpositions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TranspositionId(pub u64);

/// An additive pitch adjustment on one track, active from `tick` for
/// `duration` ticks, or forever when `duration` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transposition {
    pub id: TranspositionId,
    pub track_id: TrackId,
    pub tick: Tick,
    #[serde(default)]
    pub duration: Option<Tick>,
    pub offsets: Vector,
}

impl Transposition {
    pub fn new(id: TranspositionId, track_id: TrackId, tick: Tick, offsets: Vector) -> Self {
        Self {
            id,
            track_id,
            tick,
            duration: None,
            offsets,
        }
    }

    pub fn with_duration(mut self, duration: Tick) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Exclusive end tick, `None` when open-ended or past the last tick
    pub fn end_tick(&self) -> Option<Tick> {
        self.duration.and_then(|d| self.tick.checked_add(d))
    }

    pub fn is_active_at(&self, tick: Tick) -> bool {
        tick >= self.tick && self.end_tick().is_none_or(|end| tick < end)
    }

    /// Whether any tick of `[start, end)` is covered
    pub fn overlaps(&self, start: Tick, end: Tick) -> bool {
        start < end && self.tick < end && self.end_tick().is_none_or(|e| e > start)
    }
}

/// Source of the transpositions living on each track
pub trait TranspositionLookup {
    fn transpositions_for(&self, track: TrackId) -> &[Transposition];
}

impl TranspositionLookup for std::collections::HashMap<TrackId, Vec<Transposition>> {
    fn transpositions_for(&self, track: TrackId) -> &[Transposition] {
        self.get(&track).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Offsets of the latest-starting transposition active at `tick`.
///
/// Later starts override earlier ones that are still running; on equal
/// starts the one listed last wins. Zero vector when none is active.
pub fn active_offset(transpositions: &[Transposition], tick: Tick) -> Vector {
    transpositions
        .iter()
        .filter(|t| t.is_active_at(tick))
        .max_by_key(|t| t.tick)
        .map(|t| t.offsets.clone())
        .unwrap_or_default()
}

/// Sum of the active offsets of `track` and every ancestor at `tick`
pub fn offsets_for_chain_at_tick(
    track: TrackId,
    tick: Tick,
    hierarchy: &impl TrackHierarchy,
    transpositions: &impl TranspositionLookup,
) -> Vector {
    hierarchy
        .lineage(track)
        .iter()
        .map(|&id| active_offset(transpositions.transpositions_for(id), tick))
        .sum()
}
