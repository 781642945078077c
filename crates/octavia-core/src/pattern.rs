//! Patterns: reusable, looping chord streams

use serde::{Deserialize, Serialize};

use crate::chord::{Chord, ChordNote, NoteLength, Tone};
use crate::note::Note;
use crate::vector::Vector;

/// Unique identifier for patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatternId(pub u64);

/// Ordered, restartable sequence of chords; index `i` is step `i`.
///
/// Transforms consume the stream and return the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChordStream {
    pub chords: Vec<Chord>,
}

impl ChordStream {
    pub fn new(chords: Vec<Chord>) -> Self {
        Self { chords }
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Chord at a step; callers wrap the index themselves
    pub fn chord_at(&self, index: usize) -> Option<&Chord> {
        self.chords.get(index)
    }

    /// Cyclic shift: positive `n` moves the last chords to the front
    pub fn rotate(mut self, n: i32) -> Self {
        if self.chords.is_empty() {
            return self;
        }
        let n = n.rem_euclid(self.chords.len() as i32) as usize;
        self.chords.rotate_right(n);
        self
    }

    /// The whole stream `times` times over
    pub fn repeat(self, times: usize) -> Self {
        Self::new((0..times).flat_map(|_| self.chords.iter().cloned()).collect())
    }

    /// Loop (or cut) the stream to exactly `len` chords
    pub fn continue_to(self, len: usize) -> Self {
        if self.chords.is_empty() {
            return self;
        }
        Self::new(self.chords.iter().cycle().take(len).cloned().collect())
    }

    /// Progressive voice offset: voice `v` of every chord is taken from the
    /// chord `v * k` steps later, so upper voices drift against the bass.
    pub fn phase(self, k: i32) -> Self {
        let len = self.chords.len() as i32;
        if k == 0 || len == 0 {
            return self;
        }
        let chords = (0..len)
            .map(|i| {
                let voices = self.chords[i as usize].notes.len();
                let notes = (0..voices)
                    .filter_map(|v| {
                        let source = (i + v as i32 * k).rem_euclid(len) as usize;
                        self.chords[source].notes.get(v).cloned()
                    })
                    .collect();
                Chord::new(notes)
            })
            .collect();
        Self::new(chords)
    }

    pub fn reverse(mut self) -> Self {
        self.chords.reverse();
        self
    }

    /// Deterministic shuffle of chord order
    pub fn shuffle(mut self, seed: u64) -> Self {
        fastrand::Rng::with_seed(seed).shuffle(&mut self.chords);
        self
    }

    /// Add a voice `interval` above every sounding note: scale degrees for
    /// relative notes, semitones for absolute ones.
    pub fn harmonize(self, interval: i32) -> Self {
        if interval == 0 {
            return self;
        }
        let chords = self
            .chords
            .into_iter()
            .map(|chord| {
                let mut notes = chord.notes.clone();
                for voice in &chord.notes {
                    let Tone::Note(note) = &voice.tone else { continue };
                    let harmony = match note {
                        Note::Absolute(pitch) => Note::Absolute(pitch + interval),
                        Note::Relative(rel) => {
                            let mut rel = rel.clone();
                            rel.degree += interval;
                            Note::Relative(rel)
                        }
                    };
                    notes.push(ChordNote {
                        tone: Tone::Note(harmony),
                        ..voice.clone()
                    });
                }
                Chord::new(notes)
            })
            .collect();
        Self::new(chords)
    }

    /// Double every length and follow each chord with a silent step
    pub fn lengthen(self) -> Self {
        let chords = self
            .chords
            .into_iter()
            .flat_map(|chord| {
                let longer = map_lengths(chord, |l| l.doubled());
                [longer, Chord::default()]
            })
            .collect();
        Self::new(chords)
    }

    /// Halve every length and drop the silent steps on odd indices.
    ///
    /// Undoes [`ChordStream::lengthen`] while lengths stay in range.
    pub fn halve(self) -> Self {
        let chords = self
            .chords
            .into_iter()
            .enumerate()
            .filter(|(i, chord)| i % 2 == 0 || !chord.is_empty())
            .map(|(_, chord)| map_lengths(chord, |l| l.halved()))
            .collect();
        Self::new(chords)
    }

    /// Apply an offset to every sounding note
    pub fn transpose(self, offset: &Vector) -> Self {
        if offset.is_zero() {
            return self;
        }
        let chords = self
            .chords
            .into_iter()
            .map(|chord| {
                Chord::new(
                    chord
                        .notes
                        .into_iter()
                        .map(|voice| match voice.tone {
                            Tone::Note(note) => ChordNote {
                                tone: Tone::Note(note.with_offset(offset)),
                                ..voice
                            },
                            Tone::Rest => voice,
                        })
                        .collect(),
                )
            })
            .collect();
        Self::new(chords)
    }
}

fn map_lengths(chord: Chord, f: impl Fn(NoteLength) -> NoteLength) -> Chord {
    Chord::new(
        chord
            .notes
            .into_iter()
            .map(|voice| ChordNote {
                length: f(voice.length),
                ..voice
            })
            .collect(),
    )
}

/// A named chord stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pattern {
    pub id: PatternId,
    #[serde(default)]
    pub name: String,
    pub stream: ChordStream,
}

impl Pattern {
    pub fn new(id: PatternId, stream: ChordStream) -> Self {
        Self {
            id,
            name: String::new(),
            stream,
        }
    }

    pub fn len(&self) -> usize {
        self.stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(degrees: &[i32]) -> ChordStream {
        ChordStream::new(degrees.iter().map(|&d| Chord::of([Note::degree(d)])).collect())
    }

    fn degrees(stream: &ChordStream) -> Vec<Vec<i32>> {
        stream
            .chords
            .iter()
            .map(|c| {
                c.notes
                    .iter()
                    .filter_map(|n| match n.note() {
                        Some(Note::Relative(rel)) => Some(rel.degree),
                        Some(Note::Absolute(p)) => Some(*p),
                        None => None,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_chord_at_bounds() {
        let s = stream(&[0, 1, 2]);
        assert_eq!(s.chord_at(2), Some(&Chord::of([Note::degree(2)])));
        assert_eq!(s.chord_at(3), None);
    }

    #[test]
    fn test_identity_parameters() {
        let s = stream(&[0, 1, 2, 3]);
        assert_eq!(s.clone().rotate(0), s);
        assert_eq!(s.clone().rotate(4), s);
        assert_eq!(s.clone().repeat(1), s);
        assert_eq!(s.clone().continue_to(4), s);
        assert_eq!(s.clone().phase(0), s);
        assert_eq!(s.clone().harmonize(0), s);
        assert_eq!(s.clone().transpose(&Vector::new()), s);
        assert_eq!(s.clone().reverse().reverse(), s);
    }

    #[test]
    fn test_rotate_and_reverse() {
        let s = stream(&[0, 1, 2, 3]);
        assert_eq!(degrees(&s.clone().rotate(1)), vec![vec![3], vec![0], vec![1], vec![2]]);
        assert_eq!(degrees(&s.clone().rotate(-1)), vec![vec![1], vec![2], vec![3], vec![0]]);
        assert_eq!(degrees(&s.reverse()), vec![vec![3], vec![2], vec![1], vec![0]]);
    }

    #[test]
    fn test_resizing_transforms() {
        let s = stream(&[0, 1, 2]);
        assert_eq!(s.clone().repeat(2).len(), 6);
        assert_eq!(degrees(&s.clone().repeat(2))[3..], [vec![0], vec![1], vec![2]]);
        assert!(s.clone().repeat(0).is_empty());
        assert_eq!(degrees(&s.clone().continue_to(5)), vec![vec![0], vec![1], vec![2], vec![0], vec![1]]);
        assert_eq!(s.clone().continue_to(2).len(), 2);
        assert!(ChordStream::default().continue_to(4).is_empty());
    }

    #[test]
    fn test_phase_drifts_upper_voices() {
        let s = ChordStream::new(
            (0..3)
                .map(|i| Chord::of([Note::Absolute(i), Note::Absolute(10 + i)]))
                .collect(),
        );
        let phased = s.phase(1);
        assert_eq!(phased.len(), 3);
        assert_eq!(degrees(&phased), vec![vec![0, 11], vec![1, 12], vec![2, 10]]);
    }

    #[test]
    fn test_shuffle_is_deterministic_permutation() {
        let s = stream(&[0, 1, 2, 3, 4, 5, 6, 7]);
        let a = s.clone().shuffle(42);
        let b = s.clone().shuffle(42);
        assert_eq!(a, b);
        assert_eq!(a.len(), s.len());
        let mut sorted = degrees(&a);
        sorted.sort();
        assert_eq!(sorted, degrees(&s));
    }

    #[test]
    fn test_harmonize_adds_voice() {
        let s = ChordStream::new(vec![
            Chord::of([Note::degree(0), Note::Absolute(60)]),
            Chord::rest(),
        ]);
        let h = s.harmonize(2);
        assert_eq!(h.len(), 2);
        assert_eq!(degrees(&h)[0], vec![0, 60, 2, 62]);
        assert!(h.chords[1].is_silent());
        assert_eq!(h.chords[1].len(), 1);
    }

    #[test]
    fn test_lengthen_then_halve() {
        let s = ChordStream::new(vec![
            Chord::new(vec![ChordNote::new(Note::degree(0)).with_length(NoteLength::Eighth)]),
            Chord::new(vec![ChordNote::new(Note::degree(2)).with_length(NoteLength::Half)]),
        ]);
        let long = s.clone().lengthen();
        assert_eq!(long.len(), 4);
        assert_eq!(long.chords[0].notes[0].length, NoteLength::Quarter);
        assert!(long.chords[1].is_empty());
        assert_eq!(long.halve(), s);

        let shortest = ChordStream::new(vec![Chord::new(vec![
            ChordNote::new(60).with_length(NoteLength::SHORTEST),
        ])]);
        assert_eq!(shortest.halve().chords[0].notes[0].length, NoteLength::SHORTEST);
    }

    #[test]
    fn test_transpose_skips_rests() {
        let s = ChordStream::new(vec![Chord::new(vec![ChordNote::new(60), ChordNote::rest()])]);
        let t = s.transpose(&Vector::chromatic(5));
        assert_eq!(t.chords[0].notes[0].tone, Tone::Note(Note::Absolute(65)));
        assert!(t.chords[0].notes[1].is_rest());
    }
}
