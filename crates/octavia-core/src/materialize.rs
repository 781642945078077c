//! Clip materialization
//!
//! Turns a clip's relative pattern content into the absolute chord played
//! at each of its ticks. Playback and export both consume this output;
//! nothing else resolves pitches.

use tracing::{trace, warn};

use crate::chord::{ChordNote, Tone};
use crate::clip::{Clip, ResolvedChord, ResolvedNote};
use crate::error::{Reference, ResolveError, Result};
use crate::hierarchy::TrackHierarchy;
use crate::pattern::Pattern;
use crate::resolver::{resolve_note, ScaleChain};
use crate::transposition::{offsets_for_chain_at_tick, TranspositionLookup};
use crate::vector::Vector;

/// Resolve every step of `clip`.
///
/// Missing or empty patterns and unknown tracks are logged and produce an
/// empty stream. Broken or cyclic scale chains are returned as errors.
pub fn materialize(
    clip: &Clip,
    pattern: Option<&Pattern>,
    hierarchy: &impl TrackHierarchy,
    transpositions: &impl TranspositionLookup,
) -> Result<Vec<ResolvedChord>> {
    let pattern = match check_pattern(clip, pattern) {
        Ok(pattern) => pattern,
        Err(e) => return soft_failure(clip, e),
    };

    let chain = match hierarchy.scale_chain_for(clip.track_id) {
        Ok(chain) => chain,
        Err(e) if e.is_structural() => return Err(e),
        Err(e) => return soft_failure(clip, e),
    };

    let mut steps = Vec::with_capacity(clip.duration as usize);
    for (step, index) in clip.pattern_indices(pattern.len()).enumerate() {
        let Some(chord) = pattern.stream.chord_at(index) else {
            break;
        };
        let Some(tick) = clip.tick.checked_add(step as u64) else {
            break;
        };
        let offset = offsets_for_chain_at_tick(clip.track_id, tick, hierarchy, transpositions);
        let notes = chord
            .notes
            .iter()
            .map(|voice| resolve_voice(voice, &offset, &chain))
            .collect::<Result<Vec<_>>>()?;
        steps.push(ResolvedChord {
            tick,
            pattern_index: index,
            notes,
        });
    }

    trace!(
        "Materialized clip {} ({} steps from pattern {}, chain depth {})",
        clip.id.0,
        steps.len(),
        pattern.id.0,
        chain.len()
    );
    Ok(steps)
}

fn check_pattern<'a>(clip: &Clip, pattern: Option<&'a Pattern>) -> Result<&'a Pattern> {
    let pattern = pattern
        .filter(|p| p.id == clip.pattern_id)
        .ok_or(ResolveError::DanglingReference(Reference::Pattern(clip.pattern_id)))?;
    if pattern.is_empty() {
        return Err(ResolveError::EmptyPattern(pattern.id.0));
    }
    Ok(pattern)
}

fn soft_failure(clip: &Clip, e: ResolveError) -> Result<Vec<ResolvedChord>> {
    warn!("Clip {} on track {} produces no notes: {}", clip.id.0, clip.track_id.0, e);
    Ok(Vec::new())
}

/// Fold the transposition into the note, then resolve; rests pass through
fn resolve_voice(voice: &ChordNote, offset: &Vector, chain: &ScaleChain<'_>) -> Result<ResolvedNote> {
    let pitch = match &voice.tone {
        Tone::Rest => None,
        Tone::Note(note) => Some(resolve_note(&note.with_offset(offset), chain)?),
    };
    Ok(ResolvedNote {
        pitch,
        length: voice.length,
        velocity: voice.velocity,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::chord::{Chord, ChordNote};
    use crate::clip::ClipId;
    use crate::hierarchy::Hierarchy;
    use crate::note::Note;
    use crate::pattern::{ChordStream, PatternId};
    use crate::scale::{Scale, ScaleId, ScaleMode};
    use crate::track::TrackId;
    use crate::transposition::{Transposition, TranspositionId};
    use crate::vector::OffsetKey;

    struct Fixture {
        hierarchy: Hierarchy,
        triad_track: TrackId,
        key_track: TrackId,
        transpositions: HashMap<TrackId, Vec<Transposition>>,
    }

    fn fixture() -> Fixture {
        let mut hierarchy = Hierarchy::new();
        let chromatic = hierarchy.add_scale(Scale::chromatic(ScaleId(1), 60)).unwrap();
        let major = hierarchy.add_scale(Scale::from_mode(ScaleId(2), ScaleMode::Major)).unwrap();
        let triad = hierarchy.add_scale(Scale::from_degrees(ScaleId(3), "S1", &[0, 4, 7])).unwrap();
        let root = hierarchy.add_track("root", None, Some(chromatic)).unwrap();
        let key_track = hierarchy.add_track("key", Some(root), Some(major)).unwrap();
        let triad_track = hierarchy.add_track("triad", Some(root), Some(triad)).unwrap();
        Fixture {
            hierarchy,
            triad_track,
            key_track,
            transpositions: HashMap::new(),
        }
    }

    fn single_notes(id: u64, degrees: &[i32]) -> Pattern {
        Pattern::new(
            PatternId(id),
            ChordStream::new(degrees.iter().map(|&d| Chord::of([Note::degree(d)])).collect()),
        )
    }

    #[test]
    fn test_end_to_end_triad_with_transposition() {
        let mut f = fixture();
        let pattern = single_notes(1, &[1]);
        let clip = Clip::new(ClipId(1), f.triad_track, PatternId(1), 100, 1);

        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        assert_eq!(out[0].pitches(), vec![64]);

        f.transpositions.insert(
            f.triad_track,
            vec![Transposition::new(TranspositionId(1), f.triad_track, 90, Vector::chromatic(12))],
        );
        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        assert_eq!(out[0].tick, 100);
        assert_eq!(out[0].pitches(), vec![76]);
    }

    #[test]
    fn test_wraparound_and_ticks() {
        let f = fixture();
        let pattern = single_notes(1, &[0, 1, 2]);
        let clip = Clip::new(ClipId(1), f.triad_track, PatternId(1), 8, 7).with_offset(1);
        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        let indices: Vec<usize> = out.iter().map(|c| c.pattern_index).collect();
        assert_eq!(indices, vec![1, 2, 0, 1, 2, 0, 1]);
        let ticks: Vec<u64> = out.iter().map(|c| c.tick).collect();
        assert_eq!(ticks, (8..15).collect::<Vec<_>>());
        assert_eq!(out[2].pitches(), vec![60]);
        assert_eq!(out[1].pitches(), vec![67]);
    }

    #[test]
    fn test_transpositions_switch_mid_clip() {
        let mut f = fixture();
        let root = f.hierarchy.lineage(f.key_track)[0];
        f.transpositions.insert(
            f.key_track,
            vec![
                Transposition::new(TranspositionId(1), f.key_track, 0, Vector::chromatic(2)).with_duration(10),
                Transposition::new(TranspositionId(2), f.key_track, 4, Vector::chromatic(5)).with_duration(10),
            ],
        );
        f.transpositions.insert(
            root,
            vec![Transposition::new(TranspositionId(3), root, 6, Vector::octave(1))],
        );
        let pattern = single_notes(1, &[0]);
        let clip = Clip::new(ClipId(1), f.key_track, PatternId(1), 0, 8);
        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        let pitches: Vec<i32> = out.iter().map(|c| c.pitches()[0]).collect();
        assert_eq!(pitches, vec![62, 62, 62, 62, 65, 65, 77, 77]);
    }

    #[test]
    fn test_diatonic_transposition_through_scale_key() {
        let mut f = fixture();
        f.transpositions.insert(
            f.key_track,
            vec![Transposition::new(TranspositionId(1), f.key_track, 0, Vector::degree(ScaleId(2), 1))],
        );
        let pattern = single_notes(1, &[0, 2, 6]);
        let clip = Clip::new(ClipId(1), f.key_track, PatternId(1), 0, 3);
        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        let pitches: Vec<i32> = out.iter().map(|c| c.pitches()[0]).collect();
        // C E B moved one step up C major: D F C'
        assert_eq!(pitches, vec![62, 65, 72]);
    }

    #[test]
    fn test_rests_and_absolute_notes() {
        let mut f = fixture();
        f.transpositions.insert(
            f.triad_track,
            vec![Transposition::new(TranspositionId(1), f.triad_track, 0, Vector::chromatic(1).with(OffsetKey::Scale(ScaleId(3)), 1))],
        );
        let pattern = Pattern::new(
            PatternId(1),
            ChordStream::new(vec![Chord::new(vec![
                ChordNote::rest(),
                ChordNote::new(40).with_velocity(90),
                ChordNote::new(Note::degree(0)),
            ])]),
        );
        let clip = Clip::new(ClipId(1), f.triad_track, PatternId(1), 0, 1);
        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        let notes = &out[0].notes;
        assert!(notes[0].is_rest());
        assert_eq!(notes[1].pitch, Some(41));
        assert_eq!(notes[1].velocity, 90);
        assert_eq!(notes[2].pitch, Some(65));
    }

    #[test]
    fn test_soft_failures_yield_empty() {
        let f = fixture();
        let clip = Clip::new(ClipId(1), f.triad_track, PatternId(1), 0, 4);
        assert!(materialize(&clip, None, &f.hierarchy, &f.transpositions).unwrap().is_empty());

        let empty = Pattern::new(PatternId(1), ChordStream::default());
        assert!(materialize(&clip, Some(&empty), &f.hierarchy, &f.transpositions).unwrap().is_empty());

        let other = single_notes(2, &[0]);
        assert!(materialize(&clip, Some(&other), &f.hierarchy, &f.transpositions).unwrap().is_empty());

        let lost = Clip::new(ClipId(2), TrackId(99), PatternId(1), 0, 4);
        let pattern = single_notes(1, &[0]);
        assert!(materialize(&lost, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap().is_empty());

        let zero = Clip::new(ClipId(3), f.triad_track, PatternId(1), 0, 0);
        assert!(materialize(&zero, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap().is_empty());
    }

    #[test]
    fn test_unbounded_transposition_duration() {
        let mut f = fixture();
        f.transpositions.insert(
            f.triad_track,
            vec![Transposition::new(TranspositionId(1), f.triad_track, 2, Vector::chromatic(1)).with_duration(u64::MAX)],
        );
        let pattern = single_notes(1, &[0]);
        let clip = Clip::new(ClipId(1), f.triad_track, PatternId(1), 0, 4);
        let out = materialize(&clip, Some(&pattern), &f.hierarchy, &f.transpositions).unwrap();
        let pitches: Vec<i32> = out.iter().map(|c| c.pitches()[0]).collect();
        assert_eq!(pitches, vec![60, 60, 61, 61]);
    }

    #[test]
    fn test_broken_chain_is_surfaced() {
        let mut hierarchy = Hierarchy::new();
        let floating = hierarchy.add_scale(Scale::from_degrees(ScaleId(1), "floating", &[0, 2])).unwrap();
        let track = hierarchy.add_track("t", None, Some(floating)).unwrap();
        let pattern = single_notes(1, &[0]);
        let clip = Clip::new(ClipId(1), track, PatternId(1), 0, 2);
        let transpositions: HashMap<TrackId, Vec<Transposition>> = HashMap::new();
        assert_eq!(
            materialize(&clip, Some(&pattern), &hierarchy, &transpositions).unwrap_err(),
            ResolveError::BrokenChain { depth: 1 }
        );
    }
}
