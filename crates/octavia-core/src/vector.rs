//! Sparse named-offset vectors
//!
//! A [`Vector`] is a bag of integer adjustments keyed by [`OffsetKey`]:
//! raw semitones, octaves, or degree steps inside one specific scale.
//! Missing keys read as zero and zero entries are never stored.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::scale::ScaleId;

/// Key of one vector component
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum OffsetKey {
    /// Raw semitone shift
    Chromatic,
    /// Octave shift (12 semitones each)
    Octave,
    /// Degree shift applied only while resolving through this scale
    Scale(ScaleId),
}

impl fmt::Display for OffsetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chromatic => f.write_str("chromatic"),
            Self::Octave => f.write_str("octave"),
            Self::Scale(id) => write!(f, "scale:{}", id.0),
        }
    }
}

impl FromStr for OffsetKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromatic" => Ok(Self::Chromatic),
            "octave" => Ok(Self::Octave),
            other => other
                .strip_prefix("scale:")
                .and_then(|id| id.parse().ok())
                .map(|id| Self::Scale(ScaleId(id)))
                .ok_or_else(|| format!("unknown offset key '{other}'")),
        }
    }
}

impl From<OffsetKey> for String {
    fn from(key: OffsetKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for OffsetKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Sparse offset vector
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vector(BTreeMap<OffsetKey, i32>);

impl Vector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chromatic(semitones: i32) -> Self {
        Self::new().with(OffsetKey::Chromatic, semitones)
    }

    pub fn octave(octaves: i32) -> Self {
        Self::new().with(OffsetKey::Octave, octaves)
    }

    pub fn degree(scale: ScaleId, steps: i32) -> Self {
        Self::new().with(OffsetKey::Scale(scale), steps)
    }

    /// Builder-style set; a zero value removes the key
    pub fn with(mut self, key: OffsetKey, value: i32) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: OffsetKey, value: i32) {
        if value == 0 {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Component value, zero when absent
    pub fn get(&self, key: OffsetKey) -> i32 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OffsetKey, i32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    /// Combined semitone shift of the chromatic and octave components
    pub fn semitones(&self) -> i32 {
        self.get(OffsetKey::Chromatic) + self.get(OffsetKey::Octave) * 12
    }

    /// Only the scale-keyed components
    pub fn scale_components(&self) -> Vector {
        Vector(
            self.0
                .iter()
                .filter(|(k, _)| matches!(k, OffsetKey::Scale(_)))
                .map(|(k, v)| (*k, *v))
                .collect(),
        )
    }

    /// Drop one key, returning its value
    pub fn take(&mut self, key: OffsetKey) -> i32 {
        self.0.remove(&key).unwrap_or(0)
    }
}

impl AddAssign<&Vector> for Vector {
    fn add_assign(&mut self, rhs: &Vector) {
        for (key, value) in rhs.iter() {
            let sum = self.get(key) + value;
            self.set(key, sum);
        }
    }
}

impl Add<&Vector> for Vector {
    type Output = Vector;

    fn add(mut self, rhs: &Vector) -> Vector {
        self += rhs;
        self
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        self + &rhs
    }
}

impl<'a> Sum<&'a Vector> for Vector {
    fn sum<I: Iterator<Item = &'a Vector>>(iter: I) -> Vector {
        iter.fold(Vector::new(), |acc, v| acc + v)
    }
}

impl Sum for Vector {
    fn sum<I: Iterator<Item = Vector>>(iter: I) -> Vector {
        iter.fold(Vector::new(), |acc, v| acc + &v)
    }
}

impl FromIterator<(OffsetKey, i32)> for Vector {
    fn from_iter<I: IntoIterator<Item = (OffsetKey, i32)>>(iter: I) -> Self {
        let mut v = Vector::new();
        for (key, value) in iter {
            let sum = v.get(key) + value;
            v.set(key, sum);
        }
        v
    }
}

/// Key-wise sum of any number of vectors
pub fn sum<'a>(vectors: impl IntoIterator<Item = &'a Vector>) -> Vector {
    vectors.into_iter().sum()
}
