//! Watch progress persistence
//!
//! Three kinds of keys live in the durable store:
//! - `progress:<media_id>` - the [`ProgressRecord`] of a movie or series
//! - `episode:<episode_id>` - per-episode watched marker
//! - `resume:<item_id>` - last checkpointed position of a playable file
//!
//! Classification uses the fraction of the *file* watched: more than 95% is
//! completed, 2%–95% is in progress, anything below 2% is not recorded.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{ProgressRecord, SnapshotMetadata};
use crate::store::{KeyValueStore, PersistenceError};

/// Below this fraction nothing is written
pub const MIN_PROGRESS: f64 = 0.02;

/// Above this fraction the file counts as watched
pub const COMPLETED_PROGRESS: f64 = 0.95;

const PROGRESS_PREFIX: &str = "progress:";
const EPISODE_PREFIX: &str = "episode:";
const RESUME_PREFIX: &str = "resume:";

/// Bucket a playback position falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Ignored,
    InProgress,
    Completed,
}

/// Classify `position` against `duration` (seconds)
pub fn classify(position: f64, duration: f64) -> Classification {
    if !(duration > 0.0) || !position.is_finite() {
        return Classification::Ignored;
    }
    let fraction = position / duration;
    if fraction > COMPLETED_PROGRESS {
        Classification::Completed
    } else if fraction >= MIN_PROGRESS {
        Classification::InProgress
    } else {
        Classification::Ignored
    }
}

/// Entry of the "continue watching" row
#[derive(Debug, Clone, PartialEq)]
pub struct ContinueEntry {
    pub position: f64,
    pub duration: f64,
    pub updated_at: u64,
    pub snapshot: SnapshotMetadata,
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Progress records on top of a durable key-value store
pub struct ProgressStore {
    store: Box<dyn KeyValueStore + Send>,
}

impl std::fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore").finish_non_exhaustive()
    }
}

impl ProgressStore {
    pub fn new(store: impl KeyValueStore + Send + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Record for `media_id`; unreadable entries count as none
    pub fn load(&self, media_id: &str) -> ProgressRecord {
        let key = format!("{PROGRESS_PREFIX}{media_id}");
        match self.store.get(&key) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(%key, error = %e, "discarding unreadable progress record");
                ProgressRecord::None
            }),
            Ok(None) => ProgressRecord::None,
            Err(e) => {
                tracing::warn!(%key, error = %e, "progress read failed");
                ProgressRecord::None
            }
        }
    }

    /// Classify the position of the playing file and update the records.
    ///
    /// For an episode (`snapshot.episode_id` set) completion of the file also
    /// marks the episode itself watched, independently of the series record.
    pub fn record(
        &mut self,
        snapshot: &SnapshotMetadata,
        position: f64,
        duration: f64,
    ) -> Result<Classification, PersistenceError> {
        let class = classify(position, duration);
        let key = format!("{PROGRESS_PREFIX}{}", snapshot.media_id);
        match class {
            Classification::Ignored => {}
            Classification::InProgress => {
                let record = ProgressRecord::InProgress {
                    position,
                    duration,
                    updated_at: unix_now(),
                    snapshot: snapshot.clone(),
                };
                self.store.set(&key, &serde_json::to_string(&record)?)?;
            }
            Classification::Completed => {
                let record = ProgressRecord::Completed {
                    updated_at: unix_now(),
                    snapshot: snapshot.clone(),
                };
                self.store.set(&key, &serde_json::to_string(&record)?)?;
                if let Some(episode_id) = &snapshot.episode_id {
                    self.store.set(&format!("{EPISODE_PREFIX}{episode_id}"), "1")?;
                }
            }
        }
        Ok(class)
    }

    /// Persist the resume position of a playable file
    pub fn checkpoint(&mut self, item_id: &str, position: f64) -> Result<(), PersistenceError> {
        self.store
            .set(&format!("{RESUME_PREFIX}{item_id}"), &format!("{position:.1}"))
    }

    /// Forget the resume position (file finished)
    pub fn clear_checkpoint(&mut self, item_id: &str) -> Result<(), PersistenceError> {
        self.store.remove(&format!("{RESUME_PREFIX}{item_id}"))
    }

    /// Last checkpointed position of a playable file
    pub fn resume_position(&self, item_id: &str) -> Option<f64> {
        self.store
            .get(&format!("{RESUME_PREFIX}{item_id}"))
            .ok()
            .flatten()
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|p| *p > 0.0)
    }

    pub fn is_episode_completed(&self, episode_id: &str) -> bool {
        matches!(
            self.store.get(&format!("{EPISODE_PREFIX}{episode_id}")),
            Ok(Some(_))
        )
    }

    /// In-progress records, most recently watched first
    pub fn continue_watching(&self) -> Result<Vec<ContinueEntry>, PersistenceError> {
        let mut entries: Vec<ContinueEntry> = self
            .store
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(PROGRESS_PREFIX).map(str::to_string))
            .filter_map(|media_id| match self.load(&media_id) {
                ProgressRecord::InProgress {
                    position,
                    duration,
                    updated_at,
                    snapshot,
                } => Some(ContinueEntry {
                    position,
                    duration,
                    updated_at,
                    snapshot,
                }),
                _ => None,
            })
            .collect();
        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    /// Remove the record of `media_id` and the resume position stored under
    /// the same id
    pub fn forget(&mut self, media_id: &str) -> Result<(), PersistenceError> {
        self.store.remove(&format!("{PROGRESS_PREFIX}{media_id}"))?;
        self.store.remove(&format!("{RESUME_PREFIX}{media_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContentType;
    use crate::store::MemoryStore;

    fn movie_snapshot(id: &str) -> SnapshotMetadata {
        SnapshotMetadata {
            media_id: id.into(),
            title: format!("Movie {id}"),
            thumbnail: None,
            is_series: false,
            content_type: ContentType::Movie,
            command: Some(format!("ffrt http://cdn/{id}.mkv")),
            episode_id: None,
            episode_title: None,
        }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(10.0, 1000.0), Classification::Ignored);
        assert_eq!(classify(20.0, 1000.0), Classification::InProgress);
        assert_eq!(classify(950.0, 1000.0), Classification::InProgress);
        assert_eq!(classify(951.0, 1000.0), Classification::Completed);
        assert_eq!(classify(10.0, 0.0), Classification::Ignored);
        assert_eq!(classify(f64::NAN, 100.0), Classification::Ignored);
    }

    #[test]
    fn test_completed_replaces_in_progress() {
        let mut store = ProgressStore::new(MemoryStore::new());
        let snap = movie_snapshot("m1");

        store.record(&snap, 600.0, 3000.0).unwrap();
        assert!(store.load("m1").is_in_progress());

        // 96% of a 3000 s file
        let class = store.record(&snap, 2880.0, 3000.0).unwrap();
        assert_eq!(class, Classification::Completed);
        assert!(store.load("m1").is_completed());
        assert!(store.continue_watching().unwrap().is_empty());
    }

    #[test]
    fn test_low_progress_writes_nothing() {
        let mut store = ProgressStore::new(MemoryStore::new());
        store.record(&movie_snapshot("m1"), 30.0, 3000.0).unwrap();
        assert_eq!(store.load("m1"), ProgressRecord::None);
    }

    #[test]
    fn test_episode_completion_marks_episode() {
        let mut store = ProgressStore::new(MemoryStore::new());
        let snap = SnapshotMetadata {
            media_id: "series-9".into(),
            is_series: true,
            content_type: ContentType::Series,
            episode_id: Some("ep-3".into()),
            episode_title: Some("Episode 3".into()),
            ..movie_snapshot("series-9")
        };

        store.record(&snap, 1000.0, 2000.0).unwrap();
        assert!(!store.is_episode_completed("ep-3"));

        store.record(&snap, 1990.0, 2000.0).unwrap();
        assert!(store.is_episode_completed("ep-3"));
        assert!(store.load("series-9").is_completed());
        assert!(!store.is_episode_completed("ep-4"));
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut store = ProgressStore::new(MemoryStore::new());
        store.checkpoint("file-1", 1234.56).unwrap();
        let pos = store.resume_position("file-1").unwrap();
        assert!((pos - 1234.56).abs() < 5.0);

        store.clear_checkpoint("file-1").unwrap();
        assert_eq!(store.resume_position("file-1"), None);
    }

    #[test]
    fn test_in_progress_round_trip() {
        let mut store = ProgressStore::new(MemoryStore::new());
        store.record(&movie_snapshot("m2"), 1500.0, 3000.0).unwrap();
        match store.load("m2") {
            ProgressRecord::InProgress {
                position, snapshot, ..
            } => {
                assert!((position - 1500.0).abs() < 5.0);
                assert_eq!(snapshot.title, "Movie m2");
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn test_continue_watching_lists_in_progress_only() {
        let mut store = ProgressStore::new(MemoryStore::new());
        store.record(&movie_snapshot("a"), 500.0, 1000.0).unwrap();
        store.record(&movie_snapshot("b"), 990.0, 1000.0).unwrap();
        store.checkpoint("a", 500.0).unwrap();

        let entries = store.continue_watching().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].snapshot.media_id, "a");

        store.forget("a").unwrap();
        assert!(store.continue_watching().unwrap().is_empty());
        assert_eq!(store.resume_position("a"), None);
    }

    #[test]
    fn test_corrupt_record_reads_as_none() {
        let mut kv = MemoryStore::new();
        kv.set("progress:x", "garbage").unwrap();
        let store = ProgressStore::new(kv);
        assert_eq!(store.load("x"), ProgressRecord::None);
    }
}
