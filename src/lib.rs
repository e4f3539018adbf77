//! zapcast - remote-driven TUI for an IPTV catalog server
//!
//! Grid browsing with directional focus, incremental pagination, live
//! channel zapping, playback with automatic recovery, and durable watch
//! progress.
//!
//! # Modules
//!
//! - `focus`, `navigator`, `pagination` - listing focus and paging
//! - `zap` - debounced channel switching
//! - `session`, `retry` - stream resolution, player lifecycle, recovery
//! - `progress`, `store` - resume points and continue-watching
//! - `api` - catalog server client
//! - `stream` - mpv, catt and the effect runtime
//! - `ui` - TUI components
//! - `app` - application state and event handling

pub mod api;
pub mod app;
pub mod browse;
pub mod cli;
pub mod commands;
pub mod config;
pub mod focus;
pub mod models;
pub mod navigator;
pub mod pagination;
pub mod progress;
pub mod retry;
pub mod session;
pub mod store;
pub mod stream;
pub mod timer;
pub mod ui;
pub mod zap;

// Re-export commonly used types
pub use models::{
    CastPayload, CatalogPage, CatalogParams, ContentType, ItemKind, MediaItem, PlayState,
    PlaybackStatus, ProgressRecord, SnapshotMetadata, StreamRefs,
};

pub use api::CatalogClient;
pub use app::{App, AppEvent, Effect, Screen};
pub use config::Config;
pub use focus::{FocusRegistry, LayoutDescriptor};
pub use navigator::{Direction, NavigationState};
pub use pagination::PaginationTrigger;
pub use progress::ProgressStore;
pub use retry::RetryPolicy;
pub use session::PlaybackSession;
pub use zap::ChannelZapController;
