//! Playback session and activation resolution
//!
//! Selecting a playable leaf item starts an [`Activation`]: movie → file,
//! series episode → file, or channel directly, then file → stream command.
//! A successful activation yields the [`PlaybackSession`] that tracks the
//! player for its whole lifetime. Exactly one session exists at a time.

use std::time::{Duration, Instant};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CatalogParams, ContentType, ItemKind, MediaItem, PlayState, PlaybackStatus, SnapshotMetadata,
    StreamRefs,
};
use crate::retry::{FailureDetail, PlaybackError};

/// Minimum interval between two resume checkpoints
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(5);

/// Saved positions this close to the end are not resumed
const RESUME_TAIL: f64 = 0.95;

// =============================================================================
// Player Configuration
// =============================================================================

/// Player behaviour derived from the content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerConfig {
    pub live: bool,
    pub seekable: bool,
    pub resume: bool,
    pub track_progress: bool,
}

impl PlayerConfig {
    pub fn for_content(content_type: ContentType) -> Self {
        let live = content_type.is_live();
        Self {
            live,
            seekable: !live,
            resume: !live,
            track_progress: !live,
        }
    }
}

/// Same-origin proxy URL for a raw stream command
pub fn proxy_url(base: &str, raw: &str) -> String {
    format!(
        "{}/proxy/{}",
        base.trim_end_matches('/'),
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    )
}

/// Inverse of [`proxy_url`]'s encoding, for the path segment alone
pub fn decode_proxy_segment(segment: &str) -> Option<String> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

// =============================================================================
// Media Element Boundary
// =============================================================================

/// Lifecycle events emitted by the media element
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Ready,
    TimeUpdate(f64),
    DurationChange(f64),
    Play,
    Pause,
    VolumeChange { volume: f32, muted: bool },
    Waiting,
    Playing,
    Error(FailureDetail),
    Ended,
    /// The user closed the player window
    Closed,
}

/// Commands accepted by the media element
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Play,
    Pause,
    /// Absolute position in seconds
    Seek(f64),
    /// 0.0 - 1.0
    SetVolume(f32),
    SetMute(bool),
}

// =============================================================================
// Activation
// =============================================================================

/// Activation attempt failed; the attempt is abandoned
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No playable files for '{0}'")]
    MissingFiles(String),

    #[error("'{0}' has no identifier to resolve")]
    MissingId(String),

    #[error("No stream command for '{0}'")]
    MissingCommand(String),

    #[error("Stream lookup failed: {0}")]
    Failed(String),

    #[error("'{0}' is not playable")]
    NotPlayable(String),
}

/// Next request an activation needs answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStep {
    /// Look up the file set of a movie or episode
    Files(CatalogParams),
    /// Resolve a file (or channel) reference into a stream command
    Command(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Stage {
    AwaitingFiles,
    AwaitingCommand { file: Option<MediaItem> },
}

/// One attempt to turn a catalog item into a stream
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub item: MediaItem,
    /// Parent series for an episode
    pub series_item: Option<MediaItem>,
    pub content_type: ContentType,
    stage: Stage,
}

/// Outcome of a completed activation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub refs: StreamRefs,
    /// The file that was resolved (absent for channels)
    pub file: Option<MediaItem>,
}

fn reference_of(item: &MediaItem) -> Option<String> {
    item.cmd
        .clone()
        .filter(|c| !c.trim().is_empty())
        .or_else(|| Some(item.id.clone()).filter(|id| !id.trim().is_empty()))
}

impl Activation {
    /// Begin resolving `item`. Returns the first request to issue.
    pub fn start(
        item: MediaItem,
        series_item: Option<MediaItem>,
        content_type: ContentType,
    ) -> Result<(Self, ResolveStep), ResolutionError> {
        let (stage, step) = match item.kind {
            ItemKind::Channel => {
                let reference =
                    reference_of(&item).ok_or_else(|| ResolutionError::MissingId(item.title.clone()))?;
                (Stage::AwaitingCommand { file: None }, ResolveStep::Command(reference))
            }
            ItemKind::Movie => {
                if item.id.trim().is_empty() {
                    return Err(ResolutionError::MissingId(item.title.clone()));
                }
                let params = CatalogParams {
                    content_type,
                    page: 1,
                    movie_id: Some(item.id.clone()),
                    ..Default::default()
                };
                (Stage::AwaitingFiles, ResolveStep::Files(params))
            }
            ItemKind::Episode => {
                let series_id = item
                    .series_id
                    .clone()
                    .or_else(|| series_item.as_ref().map(|s| s.id.clone()))
                    .filter(|id| !id.trim().is_empty())
                    .ok_or_else(|| ResolutionError::MissingId(item.title.clone()))?;
                if item.id.trim().is_empty() {
                    return Err(ResolutionError::MissingId(item.title.clone()));
                }
                let params = CatalogParams {
                    content_type,
                    page: 1,
                    movie_id: Some(series_id),
                    season_id: item.season_id.clone(),
                    episode_id: Some(item.id.clone()),
                    ..Default::default()
                };
                (Stage::AwaitingFiles, ResolveStep::Files(params))
            }
            _ => return Err(ResolutionError::NotPlayable(item.title.clone())),
        };

        tracing::debug!(item = %item.title, ?step, "activation started");
        Ok((
            Self {
                item,
                series_item,
                content_type,
                stage,
            },
            step,
        ))
    }

    /// File set arrived; pick the first file and ask for its command
    pub fn on_files(&mut self, files: Vec<MediaItem>) -> Result<ResolveStep, ResolutionError> {
        if self.stage != Stage::AwaitingFiles {
            return Err(ResolutionError::Failed("unexpected file set".into()));
        }
        let file = files
            .into_iter()
            .next()
            .ok_or_else(|| ResolutionError::MissingFiles(self.item.title.clone()))?;
        let reference =
            reference_of(&file).ok_or_else(|| ResolutionError::MissingId(self.item.title.clone()))?;
        self.stage = Stage::AwaitingCommand { file: Some(file) };
        Ok(ResolveStep::Command(reference))
    }

    /// Command arrived; build both stream references
    pub fn on_command(
        self,
        command: Option<String>,
        proxy_base: &str,
    ) -> Result<ResolvedStream, ResolutionError> {
        let file = match self.stage {
            Stage::AwaitingCommand { file } => file,
            Stage::AwaitingFiles => {
                return Err(ResolutionError::Failed("command before file set".into()))
            }
        };
        let raw = command
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ResolutionError::MissingCommand(self.item.title.clone()))?;
        let proxied = proxy_url(proxy_base, &raw);
        Ok(ResolvedStream {
            refs: StreamRefs { raw, proxied },
            file,
        })
    }
}

// =============================================================================
// Playback Session
// =============================================================================

/// State of the one playing item
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    /// Tags every player event so stale events from a torn-down player are
    /// recognised
    pub id: Uuid,
    pub item: MediaItem,
    pub series_item: Option<MediaItem>,
    /// Key of the resume checkpoint
    pub item_id: String,
    /// Key of the progress record (series id for episodes)
    pub media_id: String,
    pub refs: StreamRefs,
    pub content_type: ContentType,
    pub config: PlayerConfig,
    pub state: PlayState,
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub volume: f32,
    pub muted: bool,
    pub retry_count: u32,
    /// Retry cycle in flight: set on a handled error, cleared when the
    /// remount fires or playback resumes
    pub is_recovering: bool,
    pub terminal: Option<PlaybackError>,
    resume_applied: bool,
    last_checkpoint: Option<Instant>,
}

impl PlaybackSession {
    pub fn new(activation: &Activation, resolved: ResolvedStream) -> Self {
        let item = activation.item.clone();
        let media_id = match (&activation.series_item, item.kind) {
            (Some(series), ItemKind::Episode) => series.id.clone(),
            (None, ItemKind::Episode) => item.series_id.clone().unwrap_or_else(|| item.id.clone()),
            _ => item.id.clone(),
        };
        Self {
            id: Uuid::new_v4(),
            item_id: item.id.clone(),
            media_id,
            series_item: activation.series_item.clone(),
            refs: resolved.refs,
            content_type: activation.content_type,
            config: PlayerConfig::for_content(activation.content_type),
            state: PlayState::Loading,
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            volume: 1.0,
            muted: false,
            retry_count: 0,
            is_recovering: false,
            terminal: None,
            resume_applied: false,
            last_checkpoint: None,
            item,
        }
    }

    pub fn is_live(&self) -> bool {
        self.config.live
    }

    /// Position update from the player. Returns the position to checkpoint
    /// when one is due.
    pub fn on_time_update(
        &mut self,
        position: f64,
        now: Instant,
        interval: Duration,
    ) -> Option<f64> {
        if self.config.live || !position.is_finite() {
            return None;
        }
        self.current_time = position.max(0.0);
        if self.current_time <= 0.0 {
            return None;
        }
        let due = self
            .last_checkpoint
            .map(|last| now.duration_since(last) >= interval)
            .unwrap_or(true);
        if due {
            self.last_checkpoint = Some(now);
            Some(self.current_time)
        } else {
            None
        }
    }

    pub fn on_duration(&mut self, duration: f64) {
        if !self.config.live && duration.is_finite() && duration > 0.0 {
            self.duration = duration;
        }
    }

    /// Player became ready. Hands out the saved position to seek to, once
    /// per session lifetime.
    pub fn take_resume(&mut self, saved: Option<f64>) -> Option<f64> {
        if self.resume_applied {
            return None;
        }
        self.resume_applied = true;
        if !self.config.resume {
            return None;
        }
        saved.filter(|&pos| {
            pos > 0.0 && (self.duration <= 0.0 || pos < self.duration * RESUME_TAIL)
        })
    }

    pub fn resume_applied(&self) -> bool {
        self.resume_applied
    }

    /// Successful "playing" transition: the retry budget is restored
    pub fn on_playing(&mut self) {
        if self.retry_count > 0 || self.is_recovering {
            tracing::info!(item = %self.item.title, retries = self.retry_count, "playback recovered");
        }
        self.is_playing = true;
        self.retry_count = 0;
        self.is_recovering = false;
        self.terminal = None;
        self.state = PlayState::Playing;
    }

    pub fn on_paused(&mut self) {
        self.is_playing = false;
        self.state = PlayState::Paused;
    }

    pub fn on_waiting(&mut self) {
        self.state = PlayState::Buffering;
    }

    pub fn on_ended(&mut self) {
        self.is_playing = false;
        self.state = PlayState::Ended;
    }

    pub fn on_volume(&mut self, volume: f32, muted: bool) {
        self.volume = volume.clamp(0.0, 1.0);
        self.muted = muted;
    }

    /// Enter the retry cycle. False if one is already in flight.
    pub fn begin_recovery(&mut self) -> bool {
        if self.is_recovering || self.terminal.is_some() {
            return false;
        }
        self.is_recovering = true;
        self.is_playing = false;
        self.state = PlayState::Recovering;
        true
    }

    pub fn give_up(&mut self) {
        let error = PlaybackError::StreamUnavailable {
            attempts: self.retry_count,
        };
        tracing::warn!(item = %self.item.title, %error, "giving up on stream");
        self.state = PlayState::Error(error.to_string());
        self.terminal = Some(error);
        self.is_recovering = false;
        self.is_playing = false;
    }

    /// Fresh player instance for the same stream. On-demand content starts
    /// where the failed player stopped.
    pub fn remount(&mut self) -> Option<f64> {
        self.id = Uuid::new_v4();
        self.state = PlayState::Loading;
        self.is_playing = false;
        if self.config.seekable && self.current_time > 0.0 {
            Some(self.current_time)
        } else {
            None
        }
    }

    /// User asked to restart after a terminal error
    pub fn restart(&mut self) -> Option<f64> {
        self.terminal = None;
        self.retry_count = 0;
        self.is_recovering = false;
        self.remount()
    }

    /// Denormalized metadata for the progress record
    pub fn snapshot(&self) -> SnapshotMetadata {
        let (title, thumbnail, is_series, episode_id, episode_title) = match &self.series_item {
            Some(series) if self.item.kind == ItemKind::Episode => (
                series.title.clone(),
                series.thumbnail.clone().or_else(|| self.item.thumbnail.clone()),
                true,
                Some(self.item.id.clone()),
                Some(self.item.title.clone()),
            ),
            _ => (
                self.item.title.clone(),
                self.item.thumbnail.clone(),
                self.item.kind == ItemKind::Episode,
                (self.item.kind == ItemKind::Episode).then(|| self.item.id.clone()),
                None,
            ),
        };
        SnapshotMetadata {
            media_id: self.media_id.clone(),
            title,
            thumbnail,
            is_series,
            content_type: self.content_type,
            command: Some(self.refs.raw.clone()),
            episode_id,
            episode_title,
        }
    }

    /// Render-ready status; live content reports no position or duration
    pub fn status(&self) -> PlaybackStatus {
        let (position, duration) = if self.config.live {
            (Duration::ZERO, Duration::ZERO)
        } else {
            (
                Duration::from_secs_f64(self.current_time.max(0.0)),
                Duration::from_secs_f64(self.duration.max(0.0)),
            )
        };
        PlaybackStatus {
            state: self.state.clone(),
            position,
            duration,
            volume: self.volume,
            muted: self.muted,
            live: self.config.live,
            title: Some(self.item.title.clone()),
        }
    }
}
