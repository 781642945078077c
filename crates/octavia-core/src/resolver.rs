//! Scale chain resolution
//!
//! A relative note is resolved by walking its chain of ancestor scales,
//! nearest first, until an absolute pitch is reached. Octave wraps and
//! offsets picked up on the way are summed into the final pitch.

use crate::error::{Reference, ResolveError, Result};
use crate::note::{Note, RelativeNote};
use crate::scale::Scale;
use crate::vector::{OffsetKey, Vector};

/// Ancestor scales of a note, immediate parent first
#[derive(Debug, Clone, Default)]
pub struct ScaleChain<'a> {
    scales: Vec<&'a Scale>,
}

impl<'a> ScaleChain<'a> {
    /// Build a chain, rejecting any scale id that appears twice
    pub fn new(scales: Vec<&'a Scale>) -> Result<Self> {
        for (i, scale) in scales.iter().enumerate() {
            let Some(id) = scale.id else { continue };
            if scales[..i].iter().any(|s| s.id == Some(id)) {
                return Err(ResolveError::CyclicChain(Reference::Scale(id)));
            }
        }
        Ok(Self { scales })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn scales(&self) -> &[&'a Scale] {
        &self.scales
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// The immediate parent scale
    pub fn parent(&self) -> Option<&'a Scale> {
        self.scales.first().copied()
    }

    /// Everything above the immediate parent
    pub fn above(&self) -> ScaleChain<'a> {
        Self {
            scales: self.scales.iter().skip(1).copied().collect(),
        }
    }
}

/// Resolve a note to an absolute pitch.
///
/// Takes at most one step per scale in the chain. The result is not
/// clamped to the MIDI range.
pub fn resolve_note(note: &Note, chain: &ScaleChain<'_>) -> Result<i32> {
    let scales = chain.scales();
    let mut current = note;
    let mut level = 0;
    let mut shift = 0;
    // Scale-keyed offsets waiting for their scale further up the chain
    let mut carried = Vector::new();

    loop {
        let rel = match current {
            Note::Absolute(pitch) => return Ok(pitch + shift),
            Note::Relative(rel) => rel,
        };

        if let Some(target) = rel.scale_id {
            let skip = scales[level.min(scales.len())..]
                .iter()
                .position(|s| s.id == Some(target))
                .ok_or(ResolveError::BrokenChain { depth: level })?;
            level += skip;
        }

        let scale = scales.get(level).ok_or(ResolveError::BrokenChain { depth: level })?;
        let len = scale.notes.len() as i32;
        if len == 0 {
            return Err(ResolveError::EmptyScale(scale.id.map(|id| id.0)));
        }

        carried += &rel.offset.scale_components();
        let mut effective = rel.degree;
        if let Some(id) = scale.id {
            effective += carried.take(OffsetKey::Scale(id));
        }

        shift += effective.div_euclid(len) * 12 + rel.offset.semitones();
        current = &scale.notes[effective.rem_euclid(len) as usize];
        level += 1;
    }
}

/// Resolve every note of `scale` through the chain above it
pub fn resolve_scale_to_midi(scale: &Scale, chain_above: &ScaleChain<'_>) -> Result<Vec<i32>> {
    scale.notes.iter().map(|n| resolve_note(n, chain_above)).collect()
}

/// Inverse of [`resolve_note`]: the relative reference into the parent
/// scale that resolves exactly to `pitch`.
///
/// The parent degree with the nearest pitch class is chosen, the remaining
/// distance becomes an octave offset plus (when the parent has no exact
/// pitch class match) a chromatic residue. Among equally near degrees the
/// one that keeps the new note within an octave of `target`'s current span
/// wins, then the smaller octave jump, then the lower degree.
pub fn nearest_relative_note(pitch: i32, target: &Scale, parent_chain: &ScaleChain<'_>) -> Result<RelativeNote> {
    let parent = parent_chain.parent().ok_or(ResolveError::BrokenChain { depth: 0 })?;
    let above = parent_chain.above();
    let len = parent.notes.len() as i32;
    if len == 0 {
        return Err(ResolveError::EmptyScale(parent.id.map(|id| id.0)));
    }

    let span = degree_span(target, len);

    let mut best: Option<((i32, i32, i32, i32), RelativeNote)> = None;
    for (degree, note) in parent.notes.iter().enumerate() {
        let degree = degree as i32;
        let resolved = resolve_note(note, &above)?;
        let diff = pitch - resolved;
        let class = diff.rem_euclid(12);
        let chromatic = if class > 6 { class - 12 } else { class };
        let octave = (diff - chromatic) / 12;

        let position = degree + octave * len;
        let overshoot = span.map_or(0, |(lo, hi)| (lo - len - position).max(position - hi - len).max(0));

        let key = (chromatic.abs(), overshoot, octave.abs(), degree);
        if best.as_ref().is_some_and(|(k, _)| *k <= key) {
            continue;
        }
        let offset = Vector::octave(octave).with(OffsetKey::Chromatic, chromatic);
        best = Some((key, RelativeNote::new(degree).with_offset(offset)));
    }

    best.map(|(_, note)| note).ok_or(ResolveError::EmptyScale(parent.id.map(|id| id.0)))
}

/// Lowest and highest parent-degree positions used by `scale`'s relative notes
fn degree_span(scale: &Scale, parent_len: i32) -> Option<(i32, i32)> {
    scale
        .notes
        .iter()
        .filter_map(|n| match n {
            Note::Relative(rel) => Some(rel.degree + rel.offset.get(OffsetKey::Octave) * parent_len),
            Note::Absolute(_) => None,
        })
        .fold(None, |span, pos| match span {
            None => Some((pos, pos)),
            Some((lo, hi)) => Some((lo.min(pos), hi.max(pos))),
        })
}
