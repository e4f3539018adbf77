//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the appropriate backend services.
//! Each handler takes CLI args and Output, returns ExitCode.

use serde::Serialize;

use crate::api::{CatalogClient, CatalogError};
use crate::cli::{
    effective_device, BrowseCmd, CastCmd, CastResponse, ChannelsCmd, ContinueCmd, ExitCode,
    ForgetCmd, Output, ResolveCmd, ResolveResponse, StatusOk,
};
use crate::config::Config;
use crate::models::{CastPayload, CatalogParams, ItemKind, MediaItem, StreamRefs};
use crate::progress::ProgressStore;
use crate::session::proxy_url;
use crate::store::{JsonFileStore, MemoryStore, PersistenceError};
use crate::stream::{CastError, CattCaster};

/// Settings shared by every command
pub struct CommandContext {
    pub config: Config,
    /// Effective server base URL
    pub server: String,
    pub device: Option<String>,
    pub no_save: bool,
}

impl CommandContext {
    /// `--server` wins over the environment and the config file
    pub fn new(config: Config, server: Option<&str>, device: Option<String>, no_save: bool) -> Self {
        let server = server
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| config.server_url());
        Self {
            config,
            server,
            device,
            no_save,
        }
    }

    pub fn client(&self) -> CatalogClient {
        CatalogClient::with_base_url(&self.server)
    }

    pub fn progress(&self) -> Result<ProgressStore, PersistenceError> {
        open_progress_store(&self.config, self.no_save)
    }
}

/// Progress store at the configured path (or the data dir); memory only
/// when `no_save` is set or no location can be determined
pub fn open_progress_store(config: &Config, no_save: bool) -> Result<ProgressStore, PersistenceError> {
    if no_save {
        return Ok(ProgressStore::new(MemoryStore::new()));
    }
    match config.progress_path.clone().or_else(JsonFileStore::default_path) {
        Some(path) => Ok(ProgressStore::new(JsonFileStore::open(path)?)),
        None => {
            tracing::warn!("no data directory, progress kept in memory");
            Ok(ProgressStore::new(MemoryStore::new()))
        }
    }
}

fn network_error(output: &Output, what: &str, e: CatalogError) -> ExitCode {
    output.error(format!("{} failed: {}", what, e), ExitCode::NetworkError)
}

// =============================================================================
// Channels Command
// =============================================================================

pub async fn channels_cmd(cmd: ChannelsCmd, ctx: &CommandContext, output: &Output) -> ExitCode {
    output.info(format!("Fetching channels from {}...", ctx.server));

    match ctx.client().channels().await {
        Ok(mut channels) => {
            if let Some(filter) = cmd.filter.as_deref().map(str::to_lowercase) {
                channels.retain(|c| c.title.to_lowercase().contains(&filter));
            }
            if let Some(limit) = cmd.limit {
                channels.truncate(limit);
            }

            let lines: Vec<String> = channels
                .iter()
                .map(|c| match &c.now_playing {
                    Some(now) => format!("{}  [{}]  {}", c, c.id, now),
                    None => format!("{}  [{}]", c, c.id),
                })
                .collect();
            if let Err(e) = output.print_lines(&channels, &lines) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => network_error(output, "Channel list", e),
    }
}

// =============================================================================
// Browse Command
// =============================================================================

pub async fn browse_cmd(cmd: BrowseCmd, ctx: &CommandContext, output: &Output) -> ExitCode {
    if cmd.page == 0 {
        return output.error("Pages start at 1", ExitCode::InvalidArgs);
    }
    let params = CatalogParams {
        content_type: cmd.content,
        page: cmd.page,
        search: cmd.search,
        category: cmd.category,
        movie_id: cmd.series,
        season_id: cmd.season,
        episode_id: None,
    };
    output.info(format!("Fetching {} page {}...", params.content_type, params.page));

    match ctx.client().fetch(&params).await {
        Ok(page) => {
            let mut lines: Vec<String> = page
                .items
                .iter()
                .map(|item| format!("{:<10} {}  [{}]", format!("{:?}", item.kind), item, item.id))
                .collect();
            if let Some(total) = page.total_count {
                lines.push(format!("({} of {} loaded)", page.items.len(), total));
            }
            if let Err(e) = output.print_lines(&page, &lines) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(e) => network_error(output, "Catalog request", e),
    }
}

// =============================================================================
// Resolve Command
// =============================================================================

async fn resolve(
    reference: &str,
    ctx: &CommandContext,
    output: &Output,
) -> Result<StreamRefs, ExitCode> {
    match ctx.client().resolve(reference).await {
        Ok(Some(raw)) => Ok(StreamRefs {
            proxied: proxy_url(&ctx.server, &raw),
            raw,
        }),
        Ok(None) => Err(output.error(
            format!("No stream command for '{}'", reference),
            ExitCode::NoStream,
        )),
        Err(e) => Err(network_error(output, "Stream lookup", e)),
    }
}

pub async fn resolve_cmd(cmd: ResolveCmd, ctx: &CommandContext, output: &Output) -> ExitCode {
    let refs = match resolve(&cmd.reference, ctx, output).await {
        Ok(refs) => refs,
        Err(code) => return code,
    };
    let response = ResolveResponse {
        reference: cmd.reference,
        command: refs.raw,
        proxied: refs.proxied,
    };
    let lines = vec![
        format!("command: {}", response.command),
        format!("proxied: {}", response.proxied),
    ];
    if let Err(e) = output.print_lines(&response, &lines) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

// =============================================================================
// Progress Commands
// =============================================================================

#[derive(Serialize)]
struct ContinueRow {
    media_id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    episode: Option<String>,
    position: f64,
    duration: f64,
    percent: u8,
    updated_at: u64,
}

pub fn continue_cmd(cmd: ContinueCmd, ctx: &CommandContext, output: &Output) -> ExitCode {
    let store = match ctx.progress() {
        Ok(store) => store,
        Err(e) => return output.error(e.to_string(), ExitCode::StorageError),
    };
    let entries = match store.continue_watching() {
        Ok(entries) => entries,
        Err(e) => return output.error(e.to_string(), ExitCode::StorageError),
    };

    let rows: Vec<ContinueRow> = entries
        .into_iter()
        .take(cmd.limit)
        .map(|e| ContinueRow {
            percent: if e.duration > 0.0 {
                ((e.position / e.duration) * 100.0).round().clamp(0.0, 100.0) as u8
            } else {
                0
            },
            media_id: e.snapshot.media_id,
            title: e.snapshot.title,
            episode: e.snapshot.episode_title,
            position: e.position,
            duration: e.duration,
            updated_at: e.updated_at,
        })
        .collect();

    if rows.is_empty() {
        output.info("Nothing in progress");
    }
    let lines: Vec<String> = rows
        .iter()
        .map(|r| match &r.episode {
            Some(ep) => format!("{:>3}%  {} - {}  [{}]", r.percent, r.title, ep, r.media_id),
            None => format!("{:>3}%  {}  [{}]", r.percent, r.title, r.media_id),
        })
        .collect();
    if let Err(e) = output.print_lines(&rows, &lines) {
        return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
    }
    ExitCode::Success
}

pub fn forget_cmd(cmd: ForgetCmd, ctx: &CommandContext, output: &Output) -> ExitCode {
    let mut store = match ctx.progress() {
        Ok(store) => store,
        Err(e) => return output.error(e.to_string(), ExitCode::StorageError),
    };
    if let Err(e) = store.forget(&cmd.media_id) {
        return output.error(e.to_string(), ExitCode::StorageError);
    }
    output.info(format!("Forgot progress for {}", cmd.media_id));
    if output.json && output.print(StatusOk::default()).is_err() {
        return ExitCode::Error;
    }
    ExitCode::Success
}

// =============================================================================
// Cast Command
// =============================================================================

pub async fn cast_cmd(cmd: CastCmd, ctx: &CommandContext, output: &Output) -> ExitCode {
    let Some(device) = effective_device(&ctx.device, &ctx.config.cast_device).map(str::to_string)
    else {
        return output.error(
            "No device given. Use --device or set cast_device in the config.",
            ExitCode::DeviceNotFound,
        );
    };

    let refs = match resolve(&cmd.reference, ctx, output).await {
        Ok(refs) => refs,
        Err(code) => return code,
    };

    output.info(format!("Casting to {}...", device));
    let payload = CastPayload {
        media: MediaItem::new(cmd.reference.clone(), cmd.reference.clone(), ItemKind::File),
        stream_refs: refs,
        playback_position: cmd.start.unwrap_or(0) as f64,
    };

    match CattCaster::new().send(&device, &payload).await {
        Ok(()) => {
            let response = CastResponse {
                status: "casting",
                device,
                stream_url: payload.stream_refs.proxied,
                start: cmd.start,
            };
            if let Err(e) = output.print(&response) {
                return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
            }
            ExitCode::Success
        }
        Err(CastError::NotInstalled) => output.error(CastError::NotInstalled.to_string(), ExitCode::Error),
        Err(e) => output.error(e.to_string(), ExitCode::CastFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_flag_overrides_config() {
        let config = Config {
            server: Some("http://from-config:8080".into()),
            ..Config::default()
        };
        let ctx = CommandContext::new(config, Some("http://flag:9000/"), None, true);
        assert_eq!(ctx.server, "http://flag:9000");
    }

    #[test]
    fn test_no_save_keeps_progress_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            progress_path: Some(dir.path().join("progress.json")),
            ..Config::default()
        };
        let mut store = open_progress_store(&config, true).unwrap();
        store.checkpoint("f1", 42.0).unwrap();
        assert!(!dir.path().join("progress.json").exists());
    }

    #[test]
    fn test_progress_store_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            progress_path: Some(dir.path().join("progress.json")),
            ..Config::default()
        };
        {
            let mut store = open_progress_store(&config, false).unwrap();
            store.checkpoint("f1", 42.0).unwrap();
        }
        let store = open_progress_store(&config, false).unwrap();
        assert_eq!(store.resume_position("f1"), Some(42.0));
    }
}
