//! Track nodes of the hierarchy

use serde::{Deserialize, Serialize};

use crate::scale::ScaleId;

/// Unique identifier for tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(pub u64);

/// A track in the hierarchy.
///
/// Scale-bearing tracks contribute their scale to the chain of every
/// descendant; the others only group children and carry transpositions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackNode {
    pub id: TrackId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent: Option<TrackId>,
    #[serde(default)]
    pub scale: Option<ScaleId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TrackId>,
}

impl TrackNode {
    pub fn new(id: TrackId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            scale: None,
            children: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: TrackId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_scale(mut self, scale: ScaleId) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn is_scale_track(&self) -> bool {
        self.scale.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}
