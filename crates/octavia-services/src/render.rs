//! Render service: every clip of a session through the materializer

use std::sync::Arc;

use octavia_core::{
    to_note_events, ClipId, EventTiming, NoteEvent, ResolvedChord, TrackHierarchy, TrackId, MAX_VELOCITY,
};
use serde::Serialize;
use tracing::debug;

use crate::cache::MaterializeCache;
use crate::error::Result;
use crate::session::Session;

/// One resolved step tagged with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackChord {
    pub track_id: TrackId,
    pub clip_id: ClipId,
    #[serde(flatten)]
    pub chord: ResolvedChord,
}

/// Produces resolved streams and note events for playback and export
pub struct Renderer {
    cache: MaterializeCache,
    timing: EventTiming,
    use_cache: bool,
    velocity_scale: f32,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(EventTiming::default())
    }
}

impl Renderer {
    pub fn new(timing: EventTiming) -> Self {
        Self {
            cache: MaterializeCache::new(),
            timing,
            use_cache: true,
            velocity_scale: 1.0,
        }
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn with_velocity_scale(mut self, scale: f32) -> Self {
        self.velocity_scale = scale.max(0.0);
        self
    }

    pub fn timing(&self) -> EventTiming {
        self.timing
    }

    pub fn cache(&self) -> &MaterializeCache {
        &self.cache
    }

    pub fn render_clip(&self, session: &Session, clip: ClipId) -> Result<Arc<Vec<ResolvedChord>>> {
        if self.use_cache {
            self.cache.get_or_materialize(session, clip)
        } else {
            Ok(Arc::new(session.materialize(clip)?))
        }
    }

    /// All clips on `track`, merged and ordered by tick
    pub fn render_track(&self, session: &Session, track: TrackId) -> Result<Vec<TrackChord>> {
        let mut merged = Vec::new();
        for clip in session.clips_on_track(track) {
            let chords = self.render_clip(session, clip.id)?;
            merged.extend(chords.iter().cloned().map(|chord| TrackChord {
                track_id: track,
                clip_id: clip.id,
                chord,
            }));
        }
        merged.sort_by_key(|c| (c.chord.tick, c.clip_id));
        debug!("Rendered track {}: {} steps", track.0, merged.len());
        Ok(merged)
    }

    /// Every track of the session, in hierarchy order then by tick
    pub fn render_all(&self, session: &Session) -> Result<Vec<TrackChord>> {
        if self.use_cache {
            self.cache.prune(session);
        }
        let hierarchy = session.hierarchy();
        let mut tracks: Vec<TrackId> = hierarchy.tracks().map(|t| t.id).collect();
        tracks.sort_by_key(|&t| (hierarchy.depth(t), t));

        let mut all = Vec::new();
        for track in tracks {
            all.extend(self.render_track(session, track)?);
        }
        all.sort_by_key(|c| c.chord.tick);
        Ok(all)
    }

    /// Note events for one track, velocities scaled.
    ///
    /// A silent (zero velocity) note stays silent; any other note is kept
    /// within 1-127 whatever the scale.
    pub fn events_for_track(&self, session: &Session, track: TrackId) -> Result<Vec<NoteEvent>> {
        let chords: Vec<ResolvedChord> = self.render_track(session, track)?.into_iter().map(|c| c.chord).collect();
        let mut events = to_note_events(&chords, self.timing);
        for event in events.iter_mut().filter(|e| e.is_note_on) {
            event.velocity = scale_velocity(event.velocity, self.velocity_scale);
        }
        Ok(events)
    }
}

fn scale_velocity(velocity: u8, scale: f32) -> u8 {
    if velocity == 0 {
        return 0;
    }
    (velocity as f32 * scale).round().clamp(1.0, MAX_VELOCITY as f32) as u8
}
