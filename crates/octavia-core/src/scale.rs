//! Scales and whole-scale transforms

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::note::Note;
use crate::resolver::{self, ScaleChain};

/// Unique identifier for scales
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScaleId(pub u64);

/// Preset modes, expressed as chromatic degrees from the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleMode {
    Major,
    Minor,
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,
    HarmonicMinor,
    MelodicMinor,
    Pentatonic,
    Blues,
    Chromatic,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 12] = [
        Self::Major,
        Self::Minor,
        Self::Dorian,
        Self::Phrygian,
        Self::Lydian,
        Self::Mixolydian,
        Self::Locrian,
        Self::HarmonicMinor,
        Self::MelodicMinor,
        Self::Pentatonic,
        Self::Blues,
        Self::Chromatic,
    ];

    /// Semitones from the root
    pub fn intervals(&self) -> &'static [i32] {
        match self {
            Self::Major => &[0, 2, 4, 5, 7, 9, 11],
            Self::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Self::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            Self::Phrygian => &[0, 1, 3, 5, 7, 8, 10],
            Self::Lydian => &[0, 2, 4, 6, 7, 9, 11],
            Self::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            Self::Locrian => &[0, 1, 3, 5, 6, 8, 10],
            Self::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11],
            Self::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11],
            Self::Pentatonic => &[0, 2, 4, 7, 9],
            Self::Blues => &[0, 3, 5, 6, 7, 10],
            Self::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Major => "Major",
            Self::Minor => "Minor",
            Self::Dorian => "Dorian",
            Self::Phrygian => "Phrygian",
            Self::Lydian => "Lydian",
            Self::Mixolydian => "Mixolydian",
            Self::Locrian => "Locrian",
            Self::HarmonicMinor => "Harmonic Minor",
            Self::MelodicMinor => "Melodic Minor",
            Self::Pentatonic => "Pentatonic",
            Self::Blues => "Blues",
            Self::Chromatic => "Chromatic",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Major => &["Ionian"],
            Self::Minor => &["Aeolian", "Natural Minor"],
            _ => &[],
        }
    }

    /// Case-insensitive lookup by name or alias; `-` and `_` match spaces
    pub fn from_name(name: &str) -> Option<ScaleMode> {
        let name = name.replace(['-', '_'], " ");
        Self::ALL.into_iter().find(|mode| {
            mode.name().eq_ignore_ascii_case(&name) || mode.aliases().iter().any(|a| a.eq_ignore_ascii_case(&name))
        })
    }
}

/// An ordered list of notes, each absolute or relative to the next scale up
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scale {
    /// Anonymous scales cannot be targeted by scale-keyed offsets
    #[serde(default)]
    pub id: Option<ScaleId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub notes: Vec<Note>,
}

impl Scale {
    pub fn new(id: ScaleId, name: impl Into<String>, notes: Vec<Note>) -> Self {
        Self {
            id: Some(id),
            name: name.into(),
            aliases: Vec::new(),
            notes,
        }
    }

    /// Twelve absolute semitones starting at `root`
    pub fn chromatic(id: ScaleId, root: i32) -> Self {
        Self::new(id, "Chromatic", (root..root + 12).map(Note::Absolute).collect())
    }

    /// Relative scale picking the given degrees out of its parent
    pub fn from_degrees(id: ScaleId, name: impl Into<String>, degrees: &[i32]) -> Self {
        Self::new(id, name, degrees.iter().map(|&d| Note::degree(d)).collect())
    }

    /// Preset mode, relative to a chromatic parent
    pub fn from_mode(id: ScaleId, mode: ScaleMode) -> Self {
        let mut scale = Self::from_degrees(id, mode.name(), mode.intervals());
        scale.aliases = mode.aliases().iter().map(|a| a.to_string()).collect();
        scale
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Case-insensitive match against the name and aliases
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Every note shifted by `steps` semitones
    pub fn transposed(&self, steps: i32) -> Scale {
        if steps == 0 {
            return self.clone();
        }
        Scale {
            notes: self.notes.iter().map(|n| n.transposed(steps)).collect(),
            ..self.clone()
        }
    }

    /// Cyclic degree shift preserving pitch content.
    ///
    /// Each note pulled across the end of the list is moved up an octave
    /// (down for negative steps), so degree `i` of the result sounds like
    /// degree `i + steps` of the original.
    pub fn rotated(&self, steps: i32) -> Scale {
        let len = self.notes.len() as i32;
        if steps == 0 || len == 0 {
            return self.clone();
        }
        let notes = (0..len)
            .map(|i| {
                let source = i + steps;
                self.notes[source.rem_euclid(len) as usize].octave_shifted(source.div_euclid(len))
            })
            .collect();
        Scale { notes, ..self.clone() }
    }

    /// Insert the nearest relative note for `pitch`, keeping resolved order.
    ///
    /// Returns `false` if a note already resolves to `pitch`.
    pub fn insert_pitch(&mut self, pitch: i32, parent_chain: &ScaleChain<'_>) -> Result<bool> {
        let resolved = resolver::resolve_scale_to_midi(self, parent_chain)?;
        if resolved.contains(&pitch) {
            return Ok(false);
        }
        let note = resolver::nearest_relative_note(pitch, self, parent_chain)?;
        let idx = resolved.iter().position(|&p| p > pitch).unwrap_or(self.notes.len());
        self.notes.insert(idx, Note::Relative(note));
        Ok(true)
    }

    /// Remove the first note resolving to `pitch`
    pub fn remove_pitch(&mut self, pitch: i32, parent_chain: &ScaleChain<'_>) -> Result<Option<Note>> {
        let resolved = resolver::resolve_scale_to_midi(self, parent_chain)?;
        let Some(idx) = resolved.iter().position(|&p| p == pitch) else {
            return Ok(None);
        };
        Ok(Some(self.notes.remove(idx)))
    }
}

impl From<Vec<Note>> for Scale {
    fn from(notes: Vec<Note>) -> Self {
        Self {
            notes,
            ..Default::default()
        }
    }
}
