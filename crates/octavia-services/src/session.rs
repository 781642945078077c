//! Session store: normalized collections behind the resolution engine

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use octavia_core::{
    materialize, resolve_scale_to_midi, ChordStream, Clip, ClipId, Hierarchy, Pattern, PatternId, Reference,
    ResolveError, ResolvedChord, Scale, ScaleChain, ScaleId, Tick, TrackHierarchy, TrackId, TrackNode, Transposition,
    TranspositionId, TranspositionLookup, Vector,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SessionError};

/// Serialized form of a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub scales: Vec<Scale>,
    #[serde(default)]
    pub tracks: Vec<TrackNode>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub transpositions: Vec<Transposition>,
}

/// All scales, tracks, patterns, clips and transpositions of one project
#[derive(Debug, Clone)]
pub struct Session {
    hierarchy: Hierarchy,
    patterns: HashMap<PatternId, Pattern>,
    clips: BTreeMap<ClipId, Clip>,
    transpositions: HashMap<TrackId, Vec<Transposition>>,
    next_pattern_id: u64,
    next_clip_id: u64,
    next_transposition_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            hierarchy: Hierarchy::new(),
            patterns: HashMap::new(),
            clips: BTreeMap::new(),
            transpositions: HashMap::new(),
            next_pattern_id: 1,
            next_clip_id: 1,
            next_transposition_id: 1,
        }
    }

    pub fn from_project(project: Project) -> Result<Self> {
        let mut session = Self::new();
        session.hierarchy = Hierarchy::from_parts(project.scales, project.tracks)?;

        for pattern in project.patterns {
            if session.patterns.contains_key(&pattern.id) {
                return Err(ResolveError::DuplicateId(Reference::Pattern(pattern.id)).into());
            }
            session.next_pattern_id = session.next_pattern_id.max(pattern.id.0 + 1);
            session.patterns.insert(pattern.id, pattern);
        }
        for clip in project.clips {
            session.require_track(clip.track_id)?;
            if session.clips.contains_key(&clip.id) {
                return Err(ResolveError::DuplicateId(Reference::Clip(clip.id)).into());
            }
            session.next_clip_id = session.next_clip_id.max(clip.id.0 + 1);
            session.clips.insert(clip.id, clip);
        }
        for transposition in project.transpositions {
            session.require_track(transposition.track_id)?;
            if session.transposition(transposition.id).is_some() {
                return Err(ResolveError::DuplicateId(Reference::Transposition(transposition.id)).into());
            }
            session.next_transposition_id = session.next_transposition_id.max(transposition.id.0 + 1);
            session
                .transpositions
                .entry(transposition.track_id)
                .or_default()
                .push(transposition);
        }
        Ok(session)
    }

    pub fn to_project(&self) -> Project {
        let mut scales: Vec<Scale> = self.hierarchy.scales().cloned().collect();
        scales.sort_by_key(|s| s.id);
        let mut patterns: Vec<Pattern> = self.patterns.values().cloned().collect();
        patterns.sort_by_key(|p| p.id.0);
        let mut transpositions: Vec<Transposition> = self.transpositions.values().flatten().cloned().collect();
        transpositions.sort_by_key(|t| t.id);
        Project {
            scales,
            tracks: self.hierarchy.tracks().cloned().collect(),
            patterns,
            clips: self.clips.values().cloned().collect(),
            transpositions,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let session = Self::from_project(serde_json::from_str(&json)?)?;
        info!("Loaded project {}", path.display());
        Ok(session)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_project())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Scales and tracks
    // ------------------------------------------------------------------

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Add a scale; an id already in use is rejected
    pub fn add_scale(&mut self, scale: Scale) -> Result<ScaleId> {
        Ok(self.hierarchy.add_scale(scale)?)
    }

    pub fn scale(&self, id: ScaleId) -> Option<&Scale> {
        self.hierarchy.scale(id)
    }

    /// Find a scale by case-insensitive name or alias
    pub fn scale_named(&self, name: &str) -> Option<&Scale> {
        self.hierarchy.scales().find(|s| s.is_named(name))
    }

    pub fn add_track(&mut self, name: impl Into<String>, parent: Option<TrackId>, scale: Option<ScaleId>) -> Result<TrackId> {
        Ok(self.hierarchy.add_track(name, parent, scale)?)
    }

    pub fn move_track(&mut self, track: TrackId, parent: Option<TrackId>) -> Result<()> {
        self.require_track(track)?;
        Ok(self.hierarchy.set_parent(track, parent)?)
    }

    pub fn set_track_scale(&mut self, track: TrackId, scale: Option<ScaleId>) -> Result<()> {
        self.require_track(track)?;
        Ok(self.hierarchy.set_track_scale(track, scale)?)
    }

    /// Delete a track subtree with every clip and transposition on it
    pub fn remove_track(&mut self, track: TrackId) -> Result<Vec<TrackId>> {
        self.require_track(track)?;
        let removed = self.hierarchy.remove_track(track);
        for id in &removed {
            self.transpositions.remove(id);
        }
        self.clips.retain(|_, clip| !removed.contains(&clip.track_id));
        debug!("Removed tracks {:?}", removed.iter().map(|t| t.0).collect::<Vec<_>>());
        Ok(removed)
    }

    /// Chain a scale's own notes resolve through
    pub fn parent_chain_of(&self, scale: ScaleId) -> Result<ScaleChain<'_>> {
        self.hierarchy.scale(scale).ok_or(SessionError::ScaleNotFound(scale.0))?;
        let track = self
            .hierarchy
            .tracks()
            .find(|t| t.scale == Some(scale))
            .ok_or(SessionError::DetachedScale(scale.0))?;
        Ok(self.hierarchy.scale_chain_for(track.id)?.above())
    }

    /// Absolute pitches of a scale, for previewing
    pub fn preview_scale(&self, scale: ScaleId) -> Result<Vec<i32>> {
        let chain = self.parent_chain_of(scale)?;
        let scale = self.hierarchy.scale(scale).ok_or(SessionError::ScaleNotFound(scale.0))?;
        Ok(resolve_scale_to_midi(scale, &chain)?)
    }

    /// Add an absolute pitch to a scale as the nearest relative note
    pub fn insert_scale_pitch(&mut self, scale: ScaleId, pitch: i32) -> Result<bool> {
        let chain = self.parent_chain_of(scale)?;
        let mut updated = self.hierarchy.scale(scale).ok_or(SessionError::ScaleNotFound(scale.0))?.clone();
        let inserted = updated.insert_pitch(pitch, &chain)?;
        if inserted {
            self.replace_scale(scale, updated)?;
        }
        Ok(inserted)
    }

    pub fn remove_scale_pitch(&mut self, scale: ScaleId, pitch: i32) -> Result<bool> {
        let chain = self.parent_chain_of(scale)?;
        let mut updated = self.hierarchy.scale(scale).ok_or(SessionError::ScaleNotFound(scale.0))?.clone();
        let removed = updated.remove_pitch(pitch, &chain)?.is_some();
        if removed {
            self.replace_scale(scale, updated)?;
        }
        Ok(removed)
    }

    /// Transpose or rotate a scale in place
    pub fn transform_scale(&mut self, scale: ScaleId, f: impl FnOnce(&Scale) -> Scale) -> Result<()> {
        let current = self.hierarchy.scale(scale).ok_or(SessionError::ScaleNotFound(scale.0))?;
        let updated = f(current);
        self.replace_scale(scale, updated)
    }

    fn replace_scale(&mut self, id: ScaleId, mut scale: Scale) -> Result<()> {
        let slot = self.hierarchy.scale_mut(id).ok_or(SessionError::ScaleNotFound(id.0))?;
        scale.id = Some(id);
        *slot = scale;
        Ok(())
    }

    fn require_track(&self, track: TrackId) -> Result<()> {
        self.hierarchy
            .track(track)
            .map(|_| ())
            .ok_or(SessionError::TrackNotFound(track.0))
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    pub fn add_pattern(&mut self, name: impl Into<String>, stream: ChordStream) -> PatternId {
        let id = PatternId(self.next_pattern_id);
        self.next_pattern_id += 1;
        let mut pattern = Pattern::new(id, stream);
        pattern.name = name.into();
        self.patterns.insert(id, pattern);
        id
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Pattern> {
        self.patterns.get(&id)
    }

    /// Replace a pattern's stream with a transform of it
    pub fn transform_pattern(&mut self, id: PatternId, f: impl FnOnce(ChordStream) -> ChordStream) -> Result<()> {
        let pattern = self.patterns.get_mut(&id).ok_or(SessionError::PatternNotFound(id.0))?;
        pattern.stream = f(std::mem::take(&mut pattern.stream));
        Ok(())
    }

    /// Clips still pointing at a removed pattern materialize to nothing
    pub fn remove_pattern(&mut self, id: PatternId) -> Option<Pattern> {
        self.patterns.remove(&id)
    }

    // ------------------------------------------------------------------
    // Clips
    // ------------------------------------------------------------------

    pub fn add_clip(&mut self, track: TrackId, pattern: PatternId, tick: Tick, offset: u64, duration: u64) -> Result<ClipId> {
        self.require_track(track)?;
        if !self.patterns.contains_key(&pattern) {
            return Err(SessionError::PatternNotFound(pattern.0));
        }
        let id = ClipId(self.next_clip_id);
        self.next_clip_id += 1;
        self.clips
            .insert(id, Clip::new(id, track, pattern, tick, duration).with_offset(offset));
        Ok(id)
    }

    pub fn clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.clips.values()
    }

    /// Clips on one track ordered by start tick
    pub fn clips_on_track(&self, track: TrackId) -> Vec<&Clip> {
        let mut clips: Vec<&Clip> = self.clips.values().filter(|c| c.track_id == track).collect();
        clips.sort_by_key(|c| (c.tick, c.id));
        clips
    }

    pub fn move_clip(&mut self, id: ClipId, track: TrackId, tick: Tick) -> Result<()> {
        self.require_track(track)?;
        let clip = self.clips.get_mut(&id).ok_or(SessionError::ClipNotFound(id.0))?;
        clip.track_id = track;
        clip.tick = tick;
        Ok(())
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<Clip> {
        self.clips.remove(&id)
    }

    // ------------------------------------------------------------------
    // Transpositions
    // ------------------------------------------------------------------

    pub fn add_transposition(&mut self, track: TrackId, tick: Tick, duration: Option<Tick>, offsets: Vector) -> Result<TranspositionId> {
        self.require_track(track)?;
        let id = TranspositionId(self.next_transposition_id);
        self.next_transposition_id += 1;
        let mut transposition = Transposition::new(id, track, tick, offsets);
        transposition.duration = duration;
        self.transpositions.entry(track).or_default().push(transposition);
        debug!("Added transposition {} on track {} at tick {}", id.0, track.0, tick);
        Ok(id)
    }

    pub fn transposition(&self, id: TranspositionId) -> Option<&Transposition> {
        self.transpositions.values().flatten().find(|t| t.id == id)
    }

    fn transposition_mut(&mut self, id: TranspositionId) -> Result<&mut Transposition> {
        self.transpositions
            .values_mut()
            .flatten()
            .find(|t| t.id == id)
            .ok_or(SessionError::TranspositionNotFound(id.0))
    }

    pub fn update_transposition_offsets(&mut self, id: TranspositionId, offsets: Vector) -> Result<()> {
        self.transposition_mut(id)?.offsets = offsets;
        Ok(())
    }

    pub fn move_transposition(&mut self, id: TranspositionId, tick: Tick, duration: Option<Tick>) -> Result<()> {
        let transposition = self.transposition_mut(id)?;
        transposition.tick = tick;
        transposition.duration = duration;
        Ok(())
    }

    pub fn remove_transposition(&mut self, id: TranspositionId) -> Option<Transposition> {
        for list in self.transpositions.values_mut() {
            if let Some(pos) = list.iter().position(|t| t.id == id) {
                return Some(list.remove(pos));
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    /// Absolute chord stream of one clip
    pub fn materialize(&self, id: ClipId) -> Result<Vec<ResolvedChord>> {
        let clip = self.clips.get(&id).ok_or(SessionError::ClipNotFound(id.0))?;
        self.materialize_clip(clip)
    }

    pub(crate) fn materialize_clip(&self, clip: &Clip) -> Result<Vec<ResolvedChord>> {
        Ok(materialize(clip, self.patterns.get(&clip.pattern_id), &self.hierarchy, self)?)
    }
}

impl TranspositionLookup for Session {
    fn transpositions_for(&self, track: TrackId) -> &[Transposition] {
        self.transpositions.get(&track).map(Vec::as_slice).unwrap_or(&[])
    }
}
