//! Materialization cache keyed by clip, invalidated by content fingerprint

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use octavia_core::{Clip, ClipId, ResolvedChord, TrackHierarchy, TranspositionLookup};
use tracing::debug;

use crate::error::{Result, SessionError};
use crate::session::Session;

struct CacheEntry {
    fingerprint: u64,
    chords: Arc<Vec<ResolvedChord>>,
}

/// Shared cache of materialized clips.
///
/// An entry is reused only while the clip, its pattern, every scale on its
/// chain and every lineage transposition overlapping it are unchanged.
#[derive(Default)]
pub struct MaterializeCache {
    entries: Mutex<HashMap<ClipId, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MaterializeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_materialize(&self, session: &Session, id: ClipId) -> Result<Arc<Vec<ResolvedChord>>> {
        let clip = session.clip(id).ok_or(SessionError::ClipNotFound(id.0))?;
        let fingerprint = fingerprint(session, clip);

        if let Some(fingerprint) = fingerprint {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&id).filter(|e| e.fingerprint == fingerprint) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for clip {}", id.0);
                return Ok(Arc::clone(&entry.chords));
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss for clip {}", id.0);
        let chords = Arc::new(session.materialize_clip(clip)?);

        // Unfingerprintable clips (broken chain, unknown track) are never stored
        if let Some(fingerprint) = fingerprint {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.insert(
                id,
                CacheEntry {
                    fingerprint,
                    chords: Arc::clone(&chords),
                },
            );
        }
        Ok(chords)
    }

    pub fn invalidate(&self, id: ClipId) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(&id);
    }

    /// Drop entries whose clip no longer exists in `session`
    pub fn prune(&self, session: &Session) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|&id, _| session.clip(id).is_some());
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!("Pruned {} stale cache entries", pruned);
        }
        pruned
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

fn fingerprint(session: &Session, clip: &Clip) -> Option<u64> {
    let hierarchy = session.hierarchy();
    let chain = hierarchy.scale_chain_for(clip.track_id).ok()?;

    let mut hasher = DefaultHasher::new();
    clip.hash(&mut hasher);
    session.pattern(clip.pattern_id).hash(&mut hasher);
    for scale in chain.scales() {
        scale.hash(&mut hasher);
    }
    for &track in hierarchy.lineage(clip.track_id) {
        track.hash(&mut hasher);
        session
            .transpositions_for(track)
            .iter()
            .filter(|t| t.overlaps(clip.tick, clip.end_tick()))
            .for_each(|t| t.hash(&mut hasher));
    }
    Some(hasher.finish())
}

#[cfg(test)]
mod tests {
    use octavia_core::{Chord, ChordStream, Note, Scale, ScaleId, ScaleMode, Vector};

    use super::*;

    fn session() -> (Session, ClipId) {
        let mut s = Session::new();
        let chromatic = s.add_scale(Scale::chromatic(ScaleId(1), 60)).unwrap();
        let major = s.add_scale(Scale::from_mode(ScaleId(2), ScaleMode::Major)).unwrap();
        let root = s.add_track("root", None, Some(chromatic)).unwrap();
        let key = s.add_track("key", Some(root), Some(major)).unwrap();
        let pattern = s.add_pattern("p", ChordStream::new(vec![Chord::of([Note::degree(0)]), Chord::of([Note::degree(4)])]));
        let clip = s.add_clip(key, pattern, 0, 0, 4).unwrap();
        (s, clip)
    }

    #[test]
    fn test_hit_until_content_changes() {
        let (mut s, clip) = session();
        let cache = MaterializeCache::new();

        let first = cache.get_or_materialize(&s, clip).unwrap();
        let second = cache.get_or_materialize(&s, clip).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        s.transform_scale(ScaleId(2), |scale| scale.transposed(1)).unwrap();
        let third = cache.get_or_materialize(&s, clip).unwrap();
        assert_eq!(third[0].pitches(), vec![61]);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_distant_transposition_keeps_entry() {
        let (mut s, clip) = session();
        let track = s.clip(clip).unwrap().track_id;
        let cache = MaterializeCache::new();
        cache.get_or_materialize(&s, clip).unwrap();

        s.add_transposition(track, 100, None, Vector::chromatic(5)).unwrap();
        cache.get_or_materialize(&s, clip).unwrap();
        assert_eq!(cache.hits(), 1);

        s.add_transposition(track, 2, Some(1), Vector::chromatic(5)).unwrap();
        let chords = cache.get_or_materialize(&s, clip).unwrap();
        assert_eq!(chords[2].pitches(), vec![65]);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_invalidate_and_missing_clip() {
        let (s, clip) = session();
        let cache = MaterializeCache::new();
        cache.get_or_materialize(&s, clip).unwrap();
        assert_eq!(cache.len(), 1);
        cache.invalidate(clip);
        assert!(cache.is_empty());
        assert!(matches!(
            cache.get_or_materialize(&s, ClipId(42)),
            Err(SessionError::ClipNotFound(42))
        ));
    }

    #[test]
    fn test_prune_drops_removed_clips() {
        let (mut s, clip) = session();
        let track = s.clip(clip).unwrap().track_id;
        let pattern = s.clip(clip).unwrap().pattern_id;
        let other = s.add_clip(track, pattern, 8, 0, 2).unwrap();
        let cache = MaterializeCache::new();
        cache.get_or_materialize(&s, clip).unwrap();
        cache.get_or_materialize(&s, other).unwrap();

        assert!(s.remove_clip(other).is_some());
        assert_eq!(cache.prune(&s), 1);
        assert_eq!(cache.len(), 1);

        s.remove_track(track).unwrap();
        assert_eq!(cache.prune(&s), 1);
        assert!(cache.is_empty());
    }
}
