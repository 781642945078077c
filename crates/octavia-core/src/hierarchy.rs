//! Track hierarchy arena
//!
//! Tracks and scales live in id-indexed maps. The root-to-track path of
//! every track is cached and rebuilt after each structural change, so
//! chain queries never walk parent links.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::error::{Reference, ResolveError, Result};
use crate::resolver::ScaleChain;
use crate::scale::{Scale, ScaleId};
use crate::track::{TrackId, TrackNode};

/// What the resolution engine needs to know about track structure
pub trait TrackHierarchy {
    /// Root-most track first, ending with `track` itself; empty if unknown
    fn lineage(&self, track: TrackId) -> &[TrackId];

    /// Scales governing notes on `track`, nearest first
    fn scale_chain_for(&self, track: TrackId) -> Result<ScaleChain<'_>>;

    /// Ancestors of `track`, root-most first
    fn ancestors_of(&self, track: TrackId) -> &[TrackId] {
        let lineage = self.lineage(track);
        &lineage[..lineage.len().saturating_sub(1)]
    }

    /// Number of ancestors, `None` for unknown tracks
    fn depth(&self, track: TrackId) -> Option<usize> {
        self.lineage(track).len().checked_sub(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    tracks: BTreeMap<TrackId, TrackNode>,
    scales: HashMap<ScaleId, Scale>,
    lineages: HashMap<TrackId, Vec<TrackId>>,
    next_track_id: u64,
    next_scale_id: u64,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self {
            next_track_id: 1,
            next_scale_id: 1,
            ..Default::default()
        }
    }

    /// Build from snapshot collections, validating every parent link
    pub fn from_parts(scales: Vec<Scale>, tracks: Vec<TrackNode>) -> Result<Self> {
        let mut hierarchy = Self::new();
        for scale in scales {
            hierarchy.add_scale(scale)?;
        }
        for track in tracks {
            if hierarchy.tracks.contains_key(&track.id) {
                return Err(ResolveError::DuplicateId(Reference::Track(track.id)));
            }
            hierarchy.next_track_id = hierarchy.next_track_id.max(track.id.0 + 1);
            hierarchy.tracks.insert(track.id, track);
        }
        hierarchy.rebuild()?;
        Ok(hierarchy)
    }

    /// Add a scale, assigning an id if it has none; an id already in use is rejected
    pub fn add_scale(&mut self, mut scale: Scale) -> Result<ScaleId> {
        let id = match scale.id {
            Some(id) => id,
            None => ScaleId(self.next_scale_id),
        };
        if self.scales.contains_key(&id) {
            return Err(ResolveError::DuplicateId(Reference::Scale(id)));
        }
        self.next_scale_id = self.next_scale_id.max(id.0 + 1);
        scale.id = Some(id);
        self.scales.insert(id, scale);
        Ok(id)
    }

    pub fn scale(&self, id: ScaleId) -> Option<&Scale> {
        self.scales.get(&id)
    }

    /// Scale contents may change freely; structure is unaffected
    pub fn scale_mut(&mut self, id: ScaleId) -> Option<&mut Scale> {
        self.scales.get_mut(&id)
    }

    pub fn scales(&self) -> impl Iterator<Item = &Scale> {
        self.scales.values()
    }

    pub fn add_track(
        &mut self,
        name: impl Into<String>,
        parent: Option<TrackId>,
        scale: Option<ScaleId>,
    ) -> Result<TrackId> {
        if let Some(parent) = parent {
            self.require_track(parent)?;
        }
        if let Some(scale) = scale {
            self.require_scale(scale)?;
        }
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        let mut node = TrackNode::new(id, name);
        node.parent = parent;
        node.scale = scale;
        self.tracks.insert(id, node);
        self.rebuild()?;
        debug!("Added track {} under {:?}", id.0, parent.map(|p| p.0));
        Ok(id)
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackNode> {
        self.tracks.get(&id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &TrackNode> {
        self.tracks.values()
    }

    /// Move a track under a new parent; refuses to create a cycle
    pub fn set_parent(&mut self, track: TrackId, parent: Option<TrackId>) -> Result<()> {
        self.require_track(track)?;
        if let Some(parent) = parent {
            self.require_track(parent)?;
            if self.lineage(parent).contains(&track) {
                return Err(ResolveError::CyclicChain(Reference::Track(track)));
            }
        }
        if let Some(node) = self.tracks.get_mut(&track) {
            node.parent = parent;
        }
        self.rebuild()
    }

    pub fn set_track_scale(&mut self, track: TrackId, scale: Option<ScaleId>) -> Result<()> {
        if let Some(scale) = scale {
            self.require_scale(scale)?;
        }
        let node = self
            .tracks
            .get_mut(&track)
            .ok_or(ResolveError::DanglingReference(Reference::Track(track)))?;
        node.scale = scale;
        Ok(())
    }

    /// Remove a track and its whole subtree, returning every removed id
    pub fn remove_track(&mut self, track: TrackId) -> Vec<TrackId> {
        let removed: Vec<TrackId> = self
            .lineages
            .iter()
            .filter(|(_, lineage)| lineage.contains(&track))
            .map(|(id, _)| *id)
            .collect();
        for id in &removed {
            self.tracks.remove(id);
        }
        // Remaining links were valid before and none point into the subtree
        if let Err(e) = self.rebuild() {
            warn!("Hierarchy inconsistent after removing track {}: {}", track.0, e);
        }
        removed
    }

    fn require_track(&self, id: TrackId) -> Result<()> {
        if self.tracks.contains_key(&id) {
            Ok(())
        } else {
            Err(ResolveError::DanglingReference(Reference::Track(id)))
        }
    }

    fn require_scale(&self, id: ScaleId) -> Result<()> {
        if self.scales.contains_key(&id) {
            Ok(())
        } else {
            Err(ResolveError::DanglingReference(Reference::Scale(id)))
        }
    }

    /// Recompute children lists and cached lineages from parent links
    fn rebuild(&mut self) -> Result<()> {
        let mut lineages = HashMap::with_capacity(self.tracks.len());
        for &id in self.tracks.keys() {
            let mut path = vec![id];
            let mut current = id;
            while let Some(parent) = self.tracks.get(&current).and_then(|t| t.parent) {
                if !self.tracks.contains_key(&parent) {
                    return Err(ResolveError::DanglingReference(Reference::Track(parent)));
                }
                if path.contains(&parent) {
                    return Err(ResolveError::CyclicChain(Reference::Track(parent)));
                }
                path.push(parent);
                current = parent;
            }
            path.reverse();
            lineages.insert(id, path);
        }

        let mut children: BTreeMap<TrackId, Vec<TrackId>> = BTreeMap::new();
        for node in self.tracks.values() {
            if let Some(parent) = node.parent {
                children.entry(parent).or_default().push(node.id);
            }
        }
        for node in self.tracks.values_mut() {
            node.children = children.remove(&node.id).unwrap_or_default();
        }

        self.lineages = lineages;
        Ok(())
    }
}

impl TrackHierarchy for Hierarchy {
    fn lineage(&self, track: TrackId) -> &[TrackId] {
        self.lineages.get(&track).map(Vec::as_slice).unwrap_or(&[])
    }

    fn scale_chain_for(&self, track: TrackId) -> Result<ScaleChain<'_>> {
        let lineage = self.lineage(track);
        if lineage.is_empty() {
            return Err(ResolveError::DanglingReference(Reference::Track(track)));
        }
        let scales = lineage
            .iter()
            .rev()
            .filter_map(|id| self.tracks.get(id).and_then(|t| t.scale))
            .map(|scale| {
                self.scales
                    .get(&scale)
                    .ok_or(ResolveError::DanglingReference(Reference::Scale(scale)))
            })
            .collect::<Result<Vec<_>>>()?;
        ScaleChain::new(scales)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::Note;
    use crate::resolver::resolve_note;
    use crate::scale::ScaleMode;

    /// chromatic root -> C major -> triad, plus an unscaled drum group
    fn sample() -> (Hierarchy, [TrackId; 4]) {
        let mut h = Hierarchy::new();
        let chromatic = h.add_scale(Scale::chromatic(ScaleId(1), 60)).unwrap();
        let major = h.add_scale(Scale::from_mode(ScaleId(2), ScaleMode::Major)).unwrap();
        let triad = h.add_scale(Scale::from_degrees(ScaleId(3), "I", &[0, 2, 4])).unwrap();
        let root = h.add_track("root", None, Some(chromatic)).unwrap();
        let key = h.add_track("key", Some(root), Some(major)).unwrap();
        let chords = h.add_track("chords", Some(key), Some(triad)).unwrap();
        let group = h.add_track("group", Some(chords), None).unwrap();
        (h, [root, key, chords, group])
    }

    #[test]
    fn test_lineage_and_depth() {
        let (h, [root, key, chords, group]) = sample();
        assert_eq!(h.lineage(group), &[root, key, chords, group]);
        assert_eq!(h.ancestors_of(group), &[root, key, chords]);
        assert_eq!(h.depth(root), Some(0));
        assert_eq!(h.depth(group), Some(3));
        assert_eq!(h.depth(TrackId(99)), None);
        assert!(h.lineage(TrackId(99)).is_empty());
        assert_eq!(h.track(key).unwrap().children, vec![chords]);
    }

    #[test]
    fn test_scale_chain_for_skips_unscaled_tracks() {
        let (h, [_, _, chords, group]) = sample();
        let chain = h.scale_chain_for(group).unwrap();
        let ids: Vec<_> = chain.scales().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![Some(ScaleId(3)), Some(ScaleId(2)), Some(ScaleId(1))]);
        assert_eq!(resolve_note(&Note::degree(1), &chain).unwrap(), 64);
        assert_eq!(h.scale_chain_for(chords).unwrap().len(), 3);
        assert_eq!(
            h.scale_chain_for(TrackId(42)).unwrap_err(),
            ResolveError::DanglingReference(Reference::Track(TrackId(42)))
        );
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let (mut h, [root, key, _, group]) = sample();
        assert_eq!(
            h.set_parent(key, Some(group)).unwrap_err(),
            ResolveError::CyclicChain(Reference::Track(key))
        );
        assert_eq!(h.set_parent(key, Some(key)).unwrap_err(), ResolveError::CyclicChain(Reference::Track(key)));

        h.set_parent(group, Some(root)).unwrap();
        assert_eq!(h.lineage(group), &[root, group]);
        assert_eq!(h.scale_chain_for(group).unwrap().len(), 1);
    }

    #[test]
    fn test_shared_scale_is_cyclic_chain() {
        let (mut h, [_, key, chords, _]) = sample();
        h.set_track_scale(chords, Some(ScaleId(2))).unwrap();
        assert_eq!(
            h.scale_chain_for(chords).unwrap_err(),
            ResolveError::CyclicChain(Reference::Scale(ScaleId(2)))
        );
        assert!(h.scale_chain_for(key).is_ok());
    }

    #[test]
    fn test_remove_track_takes_subtree() {
        let (mut h, [root, key, chords, group]) = sample();
        let mut removed = h.remove_track(key);
        removed.sort();
        assert_eq!(removed, vec![key, chords, group]);
        assert!(h.track(group).is_none());
        assert!(h.track(root).unwrap().children.is_empty());
    }

    #[test]
    fn test_from_parts_validates_links() {
        let tracks = vec![
            TrackNode::new(TrackId(1), "a").with_parent(TrackId(2)),
            TrackNode::new(TrackId(2), "b").with_parent(TrackId(1)),
        ];
        assert!(matches!(
            Hierarchy::from_parts(vec![], tracks).unwrap_err(),
            ResolveError::CyclicChain(Reference::Track(_))
        ));

        let dangling = vec![TrackNode::new(TrackId(1), "a").with_parent(TrackId(7))];
        assert_eq!(
            Hierarchy::from_parts(vec![], dangling).unwrap_err(),
            ResolveError::DanglingReference(Reference::Track(TrackId(7)))
        );

        let ok = vec![
            TrackNode::new(TrackId(5), "root").with_scale(ScaleId(1)),
            TrackNode::new(TrackId(6), "child").with_parent(TrackId(5)),
        ];
        let mut h = Hierarchy::from_parts(vec![Scale::chromatic(ScaleId(1), 48)], ok).unwrap();
        assert_eq!(h.lineage(TrackId(6)), &[TrackId(5), TrackId(6)]);
        assert_eq!(h.add_track("next", None, None).unwrap(), TrackId(7));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let (mut h, [_, key, ..]) = sample();
        assert_eq!(
            h.add_scale(Scale::chromatic(ScaleId(2), 48)).unwrap_err(),
            ResolveError::DuplicateId(Reference::Scale(ScaleId(2)))
        );
        // The existing scale is untouched and a fresh scale still gets a new id
        assert_eq!(h.scale(ScaleId(2)).unwrap().name, "Major");
        assert_eq!(h.scale_chain_for(key).unwrap().parent().unwrap().id, Some(ScaleId(2)));
        assert_eq!(h.add_scale(Scale::from(vec![Note::Absolute(40)])).unwrap(), ScaleId(4));

        let scales = vec![Scale::chromatic(ScaleId(1), 60), Scale::chromatic(ScaleId(1), 48)];
        assert_eq!(
            Hierarchy::from_parts(scales, vec![]).unwrap_err(),
            ResolveError::DuplicateId(Reference::Scale(ScaleId(1)))
        );

        let tracks = vec![TrackNode::new(TrackId(1), "a"), TrackNode::new(TrackId(1), "b")];
        assert_eq!(
            Hierarchy::from_parts(vec![], tracks).unwrap_err(),
            ResolveError::DuplicateId(Reference::Track(TrackId(1)))
        );
    }
}
