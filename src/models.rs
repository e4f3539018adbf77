//! Data structures and types for zapcast
//!
//! Contains the shared models used across the application organized by domain:
//! - **Catalog**: content types, media items and catalog pages
//! - **Progress**: watch-progress records and their snapshot metadata
//! - **Playback**: player state as reported to the UI
//! - **Cast**: payloads handed to the cast transport

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Catalog Models
// =============================================================================

/// Top-level content switch (movies, series, live TV)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Movie,
    Series,
    Tv,
}

impl ContentType {
    /// Live content has no meaningful position/duration and is not paginated
    pub fn is_live(&self) -> bool {
        matches!(self, ContentType::Tv)
    }

    /// Wire name used in catalog requests
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Series => "series",
            ContentType::Tv => "tv",
        }
    }

    /// Parse loosely from user input ("movies", "TV", "shows")
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" | "vod" => Some(ContentType::Movie),
            "series" | "show" | "shows" => Some(ContentType::Series),
            "tv" | "live" | "channels" | "itv" => Some(ContentType::Tv),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentType::Movie => write!(f, "Movies"),
            ContentType::Series => write!(f, "Series"),
            ContentType::Tv => write!(f, "Live TV"),
        }
    }
}

/// What selecting an item does: drill into it or play it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Category,
    #[default]
    Movie,
    Series,
    Season,
    Episode,
    Channel,
    File,
}

impl ItemKind {
    /// Leaf items start playback when selected
    pub fn is_playable(&self) -> bool {
        matches!(self, ItemKind::Movie | ItemKind::Episode | ItemKind::Channel)
    }
}

/// One entry of a catalog listing, channel list or file set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Inline stream command (channels usually carry one)
    #[serde(default)]
    pub cmd: Option<String>,
    /// Channel number for live TV
    #[serde(default)]
    pub number: Option<u32>,
    /// Current programme title (EPG) for live TV
    #[serde(default)]
    pub now_playing: Option<String>,
    /// Owning series id for seasons and episodes
    #[serde(default)]
    pub series_id: Option<String>,
    /// Owning season id for episodes
    #[serde(default)]
    pub season_id: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            ..Self::default()
        }
    }

    /// Build a live channel entry
    pub fn channel(id: impl Into<String>, title: impl Into<String>, number: u32) -> Self {
        Self {
            number: Some(number),
            ..Self::new(id, title, ItemKind::Channel)
        }
    }
}

impl fmt::Display for MediaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.number, self.year) {
            (Some(n), _) => write!(f, "{:>3} {}", n, self.title),
            (None, Some(y)) => write!(f, "{} ({})", self.title, y),
            (None, None) => write!(f, "{}", self.title),
        }
    }
}

/// Filters for a catalog request
///
/// The same shape serves listing pages and file-set lookups; which one the
/// server returns depends on which identifiers are populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CatalogParams {
    pub content_type: ContentType,
    pub page: usize,
    pub search: Option<String>,
    pub category: Option<String>,
    pub movie_id: Option<String>,
    pub season_id: Option<String>,
    pub episode_id: Option<String>,
}

impl CatalogParams {
    /// Query-string pairs, skipping unset filters
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("type", self.content_type.as_str().to_string()),
            ("page", self.page.max(1).to_string()),
        ];
        let optional = [
            ("search", &self.search),
            ("category", &self.category),
            ("movie_id", &self.movie_id),
            ("season_id", &self.season_id),
            ("episode_id", &self.episode_id),
        ];
        for (key, value) in optional {
            if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
                pairs.push((key, v.clone()));
            }
        }
        pairs
    }
}

/// One page (or complete file set) returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CatalogPage {
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

// =============================================================================
// Progress Models
// =============================================================================

/// Denormalized item data, enough to render a "continue watching" entry
/// without another catalog fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub media_id: String,
    pub title: String,
    pub thumbnail: Option<String>,
    pub is_series: bool,
    pub content_type: ContentType,
    /// Resolved raw stream command for the file that was playing
    pub command: Option<String>,
    /// Episode being watched, for series
    pub episode_id: Option<String>,
    pub episode_title: Option<String>,
}

/// Durable watch state of one media id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressRecord {
    #[default]
    None,
    InProgress {
        position: f64,
        duration: f64,
        updated_at: u64,
        snapshot: SnapshotMetadata,
    },
    Completed {
        updated_at: u64,
        snapshot: SnapshotMetadata,
    },
}

impl ProgressRecord {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, ProgressRecord::InProgress { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ProgressRecord::Completed { .. })
    }

    pub fn snapshot(&self) -> Option<&SnapshotMetadata> {
        match self {
            ProgressRecord::None => None,
            ProgressRecord::InProgress { snapshot, .. } => Some(snapshot),
            ProgressRecord::Completed { snapshot, .. } => Some(snapshot),
        }
    }

    /// Fraction watched (0.0 - 1.0), completed counts as 1.0
    pub fn fraction(&self) -> f64 {
        match self {
            ProgressRecord::None => 0.0,
            ProgressRecord::InProgress {
                position, duration, ..
            } if *duration > 0.0 => (position / duration).clamp(0.0, 1.0),
            ProgressRecord::InProgress { .. } => 0.0,
            ProgressRecord::Completed { .. } => 1.0,
        }
    }
}

// =============================================================================
// Playback Models
// =============================================================================

/// Player state as surfaced to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlayState {
    #[default]
    Loading,
    Buffering,
    Playing,
    Paused,
    Ended,
    Recovering,
    Error(String),
}

impl fmt::Display for PlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayState::Loading => write!(f, "Loading..."),
            PlayState::Buffering => write!(f, "Buffering..."),
            PlayState::Playing => write!(f, "▶ Playing"),
            PlayState::Paused => write!(f, "⏸ Paused"),
            PlayState::Ended => write!(f, "⏹ Ended"),
            PlayState::Recovering => write!(f, "⟳ Reconnecting..."),
            PlayState::Error(e) => write!(f, "Error: {}", e),
        }
    }
}

/// Snapshot of the playing session for rendering
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlaybackStatus {
    pub state: PlayState,
    pub position: Duration,
    pub duration: Duration,
    pub volume: f32,
    pub muted: bool,
    pub live: bool,
    pub title: Option<String>,
}

impl PlaybackStatus {
    /// Format position as HH:MM:SS
    pub fn format_position(&self) -> String {
        format_duration(self.position)
    }

    /// Format duration as HH:MM:SS
    pub fn format_duration(&self) -> String {
        format_duration(self.duration)
    }

    /// Get progress as percentage (0.0-1.0)
    pub fn progress(&self) -> f32 {
        if self.duration.as_secs() == 0 {
            0.0
        } else {
            self.position.as_secs_f32() / self.duration.as_secs_f32()
        }
    }

    /// Format volume as percentage
    pub fn format_volume(&self) -> String {
        if self.muted {
            "muted".to_string()
        } else {
            format!("{}%", (self.volume * 100.0).round() as u8)
        }
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.live {
            write!(f, "{} LIVE ({})", self.state, self.format_volume())
        } else {
            write!(
                f,
                "{} {} / {} ({})",
                self.state,
                self.format_position(),
                self.format_duration(),
                self.format_volume()
            )
        }
    }
}

// =============================================================================
// Cast Models
// =============================================================================

/// Both forms of a resolved stream reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRefs {
    /// Opaque command as returned by the resolver
    pub raw: String,
    /// Same-origin proxy URL handed to the media element
    pub proxied: String,
}

/// Message sent to a cast receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastPayload {
    pub media: MediaItem,
    pub stream_refs: StreamRefs,
    pub playback_position: f64,
}

// =============================================================================
// Utility Functions
// =============================================================================

/// Format a Duration as HH:MM:SS or MM:SS
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}", mins, secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_serde() {
        let json = serde_json::to_string(&ContentType::Tv).unwrap();
        assert_eq!(json, "\"tv\"");

        let parsed: ContentType = serde_json::from_str("\"series\"").unwrap();
        assert_eq!(parsed, ContentType::Series);
    }

    #[test]
    fn test_content_type_loose_parse() {
        assert_eq!(ContentType::from_str_loose("Live"), Some(ContentType::Tv));
        assert_eq!(ContentType::from_str_loose("movies"), Some(ContentType::Movie));
        assert_eq!(ContentType::from_str_loose("shows"), Some(ContentType::Series));
        assert_eq!(ContentType::from_str_loose("radio"), None);
        assert!(ContentType::Tv.is_live());
        assert!(!ContentType::Series.is_live());
    }

    #[test]
    fn test_media_item_defaults_from_sparse_json() {
        let item: MediaItem = serde_json::from_str(r#"{"id": "7", "title": "Heat"}"#).unwrap();
        assert_eq!(item.kind, ItemKind::Movie);
        assert!(item.cmd.is_none());
        assert!(item.kind.is_playable());
    }

    #[test]
    fn test_media_item_display() {
        assert_eq!(MediaItem::channel("c1", "News", 5).to_string(), "  5 News");
        let mut movie = MediaItem::new("m1", "Heat", ItemKind::Movie);
        movie.year = Some(1995);
        assert_eq!(movie.to_string(), "Heat (1995)");
    }

    #[test]
    fn test_query_pairs_skip_empty_filters() {
        let params = CatalogParams {
            content_type: ContentType::Series,
            page: 2,
            search: Some(String::new()),
            movie_id: Some("s9".into()),
            ..Default::default()
        };
        let pairs = params.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("type", "series".to_string()),
                ("page", "2".to_string()),
                ("movie_id", "s9".to_string()),
            ]
        );
    }

    #[test]
    fn test_progress_record_fraction() {
        let snapshot = SnapshotMetadata {
            media_id: "m1".into(),
            title: "Heat".into(),
            thumbnail: None,
            is_series: false,
            content_type: ContentType::Movie,
            command: None,
            episode_id: None,
            episode_title: None,
        };
        let record = ProgressRecord::InProgress {
            position: 300.0,
            duration: 1200.0,
            updated_at: 0,
            snapshot: snapshot.clone(),
        };
        assert!((record.fraction() - 0.25).abs() < f64::EPSILON);
        assert_eq!(
            ProgressRecord::Completed {
                updated_at: 0,
                snapshot
            }
            .fraction(),
            1.0
        );
        assert_eq!(ProgressRecord::None.fraction(), 0.0);
    }

    #[test]
    fn test_playback_status_display() {
        let status = PlaybackStatus {
            state: PlayState::Playing,
            position: Duration::from_secs(65),
            duration: Duration::from_secs(3725),
            volume: 0.5,
            muted: false,
            live: false,
            title: None,
        };
        assert_eq!(status.to_string(), "▶ Playing 01:05 / 01:02:05 (50%)");

        let live = PlaybackStatus {
            live: true,
            muted: true,
            ..status
        };
        assert_eq!(live.to_string(), "▶ Playing LIVE (muted)");
    }
}
