//! App state and core application logic
//!
//! [`App`] owns every piece of browse and playback state and is driven by
//! discrete events: remote keys, fetch results, player events and timers.
//! It performs no I/O itself. Each handler returns the [`Effect`]s the
//! runtime must carry out; their results come back as [`AppEvent`]s.
//!
//! Results are tagged with a generation (listing fetches), an activation
//! generation (stream resolution) or a session id (player and probe), so
//! anything arriving after the user has moved on is dropped.

use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use uuid::Uuid;

use crate::browse::{BrowseContext, HistoryStack};
use crate::config::Config;
use crate::focus::{FocusAction, FocusRegistry, FocusableElement, LayoutDescriptor};
use crate::models::*;
use crate::navigator::{Direction, ListChange, NavStep, NavigationState};
use crate::pagination::{self, FetchError, PaginationTrigger};
use crate::progress::{Classification, ContinueEntry, ProgressStore};
use crate::retry::{FailureDetail, ProbeOutcome, RetryAction, RetryPolicy, Triage};
use crate::session::{
    Activation, PlaybackSession, PlayerCommand, PlayerEvent, ResolutionError, ResolveStep,
    ResolvedStream,
};
use crate::timer::{TimerQueue, TimerSlot};
use crate::zap::{ChannelZapController, ZapDirection, ZapOutcome};

/// Seek step of the left/right keys in the player (seconds)
pub const SEEK_STEP: f64 = 10.0;

/// Volume step of the volume keys
pub const VOLUME_STEP: f32 = 0.05;

// =============================================================================
// Screens and Modes
// =============================================================================

/// Screen currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    /// Catalog / channel listing
    #[default]
    Browse,
    /// Player with overlay controls
    Player,
}

/// Current input mode for keyboard handling
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InputMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Text input mode (search box focused)
    Editing,
}

/// Loading state of the first page of a listing
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadingState {
    /// Idle - no loading in progress
    #[default]
    Idle,
    /// Loading with optional message
    Loading(Option<String>),
    /// Blocking error with message; the view offers a reload
    Error(String),
}

impl LoadingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, LoadingState::Error(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            LoadingState::Loading(Some(msg)) => Some(msg.as_str()),
            LoadingState::Error(msg) => Some(msg.as_str()),
            _ => None,
        }
    }
}

/// Search box contents
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    /// Search query
    pub query: String,
    /// Cursor position in query (chars)
    pub cursor: usize,
}

impl SearchState {
    fn byte_index(&self, cursor: usize) -> usize {
        self.query
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.query.len())
    }

    /// Insert character at cursor
    pub fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.query.insert(at, c);
        self.cursor += 1;
    }

    /// Delete character before cursor
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.query.remove(at);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.query.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.cursor = 0;
    }
}

// =============================================================================
// Events and Effects
// =============================================================================

/// Work the runtime must perform on behalf of the app
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Catalog page request
    FetchPage {
        generation: u64,
        params: CatalogParams,
    },
    /// Complete live channel list; `refresh` only updates now-playing titles
    FetchChannels { generation: u64, refresh: bool },
    /// File set of a movie or episode
    FetchFiles {
        activation: u64,
        params: CatalogParams,
    },
    /// Resolve a file or channel reference into a stream command
    ResolveCommand { activation: u64, reference: String },
    /// Reachability check of a failing stream
    Probe { session: Uuid, url: String },
    /// Start a player for the session
    Mount {
        session: Uuid,
        url: String,
        start_at: Option<f64>,
        live: bool,
        title: String,
    },
    /// Stop the current player
    Unmount,
    /// Control the current player
    Player(PlayerCommand),
    /// Hand the stream to a cast receiver
    Cast { target: String, payload: CastPayload },
}

/// Input to the app
#[derive(Debug, Clone)]
pub enum AppEvent {
    Key(KeyEvent),
    PageLoaded {
        generation: u64,
        page: usize,
        result: Result<CatalogPage, FetchError>,
    },
    ChannelsLoaded {
        generation: u64,
        refresh: bool,
        result: Result<Vec<MediaItem>, FetchError>,
    },
    FilesLoaded {
        activation: u64,
        result: Result<Vec<MediaItem>, ResolutionError>,
    },
    CommandResolved {
        activation: u64,
        result: Result<Option<String>, ResolutionError>,
    },
    ProbeFinished {
        session: Uuid,
        outcome: ProbeOutcome,
    },
    Player {
        session: Uuid,
        event: PlayerEvent,
    },
    /// The player process could not be started
    MountFailed { session: Uuid, message: String },
    /// Continuous-scroll input (mouse wheel)
    Scrolled {
        offset: usize,
        viewport: usize,
        content: usize,
    },
    /// Informational message from the runtime (cast result and the like)
    Notice(String),
}

/// Payload of the app's timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    ZapCommit,
    RetryReload { session: Uuid },
    HideControls,
    NowPlayingRefresh,
}

// =============================================================================
// Main Application State
// =============================================================================

/// Main application state
#[derive(Debug)]
pub struct App {
    /// Whether the app is running
    pub running: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub search: SearchState,

    // Browse state
    pub context: BrowseContext,
    pub history: HistoryStack,
    pub items: Vec<MediaItem>,
    pub registry: FocusRegistry,
    pub nav: NavigationState,
    pub pagination: PaginationTrigger,
    pub loading: LoadingState,
    /// Non-blocking append failure
    pub banner: Option<FetchError>,
    /// Transient message (resolution errors, notices)
    pub toast: Option<String>,

    // Live TV
    pub channels: Vec<MediaItem>,
    pub zap: ChannelZapController,

    // Playback
    pub session: Option<PlaybackSession>,
    /// Title of the item being resolved
    pub opening: Option<String>,
    pub controls_visible: bool,
    pub progress: ProgressStore,

    // Settings
    server: String,
    retry: RetryPolicy,
    checkpoint_interval: Duration,
    controls_hide: Duration,
    refresh_interval: Duration,
    cast_device: Option<String>,

    // Bookkeeping
    generation: u64,
    activation_generation: u64,
    activation: Option<Activation>,
    pending_restore: Option<usize>,
    /// History mark of the optimistic push for the pending activation
    pending_push: Option<usize>,
    /// History mark of the entry pushed when the player screen opened
    player_mark: Option<usize>,
    timers: TimerQueue<TimerKind>,
    retry_timer: TimerSlot,
    controls_timer: TimerSlot,
    refresh_timer: TimerSlot,
}

impl App {
    pub fn new(config: &Config, progress: ProgressStore) -> Self {
        Self {
            running: true,
            screen: Screen::Browse,
            input_mode: InputMode::Normal,
            search: SearchState::default(),

            context: BrowseContext::root(config.content_type),
            history: HistoryStack::new(),
            items: Vec::new(),
            registry: FocusRegistry::new(),
            nav: NavigationState::default(),
            pagination: PaginationTrigger::new(config.content_type.is_live()),
            loading: LoadingState::Idle,
            banner: None,
            toast: None,

            channels: Vec::new(),
            zap: ChannelZapController::new(config.zap_quiet_period()),

            session: None,
            opening: None,
            controls_visible: false,
            progress,

            server: config.server_url(),
            retry: config.retry_policy(),
            checkpoint_interval: config.checkpoint_interval(),
            controls_hide: config.controls_hide_delay(),
            refresh_interval: config.now_playing_refresh(),
            cast_device: config.cast_device.clone(),

            generation: 0,
            activation_generation: 0,
            activation: None,
            pending_restore: None,
            pending_push: None,
            player_mark: None,
            timers: TimerQueue::new(),
            retry_timer: TimerSlot::new(),
            controls_timer: TimerSlot::new(),
            refresh_timer: TimerSlot::new(),
        }
    }

    /// Server used for proxied stream URLs, when it differs from the config
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Initial fetch for the configured content type
    pub fn start(&mut self, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();
        self.load_first_page(None, &mut fx);
        if self.context.content_type.is_live() {
            self.arm_refresh(now);
        }
        fx
    }

    /// Column count of the active layout, supplied by the presentation layer
    pub fn set_layout(&mut self, layout: LayoutDescriptor) {
        self.nav.set_columns(layout.columns());
    }

    /// Earliest pending timer, for the runtime's sleep
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn activation_generation(&self) -> u64 {
        self.activation_generation
    }

    /// Process one event
    pub fn handle(&mut self, event: AppEvent, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();
        match event {
            AppEvent::Key(key) => self.handle_key(key, now, &mut fx),
            AppEvent::PageLoaded {
                generation,
                page,
                result,
            } => self.on_page_loaded(generation, page, result),
            AppEvent::ChannelsLoaded {
                generation,
                refresh,
                result,
            } => self.on_channels_loaded(generation, refresh, result),
            AppEvent::FilesLoaded { activation, result } => {
                self.on_files_loaded(activation, result, &mut fx)
            }
            AppEvent::CommandResolved { activation, result } => {
                self.on_command_resolved(activation, result, now, &mut fx)
            }
            AppEvent::ProbeFinished { session, outcome } => {
                self.on_probe_finished(session, outcome, now, &mut fx)
            }
            AppEvent::Player { session, event } => {
                self.on_player_event(session, event, now, &mut fx)
            }
            AppEvent::MountFailed { session, message } => {
                if let Some(s) = self.session.as_mut().filter(|s| s.id == session) {
                    tracing::error!(%message, "player failed to start");
                    s.give_up();
                    self.toast = Some(message);
                }
            }
            AppEvent::Scrolled {
                offset,
                viewport,
                content,
            } => {
                if self.screen == Screen::Browse
                    && pagination::near_bottom(offset, viewport, content)
                {
                    self.fetch_more(&mut fx);
                }
            }
            AppEvent::Notice(message) => self.toast = Some(message),
        }
        fx
    }

    /// Fire every timer that is due
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut fx = Vec::new();
        for (handle, kind) in self.timers.take_due(now) {
            match kind {
                TimerKind::ZapCommit => {
                    if let Some(channel) = self.zap.commit(handle) {
                        self.commit_zap(channel, &mut fx);
                    }
                }
                TimerKind::RetryReload { session } => {
                    if self.retry_timer.claim(handle) {
                        self.reload_session(session, &mut fx);
                    }
                }
                TimerKind::HideControls => {
                    if self.controls_timer.claim(handle) {
                        self.controls_visible = false;
                    }
                }
                TimerKind::NowPlayingRefresh => {
                    if self.refresh_timer.claim(handle) {
                        self.refresh_now_playing(now, &mut fx);
                    }
                }
            }
        }
        fx
    }

    // -------------------------------------------------------------------------
    // Queries for the UI
    // -------------------------------------------------------------------------

    pub fn focused_item(&self) -> Option<&MediaItem> {
        match self.nav.focused.and_then(|i| self.registry.activate(i)) {
            Some(FocusAction::OpenItem(i)) => self.items.get(*i),
            _ => None,
        }
    }

    pub fn playback_status(&self) -> Option<PlaybackStatus> {
        self.session.as_ref().map(PlaybackSession::status)
    }

    /// Channel shown as zap preview
    pub fn zap_preview(&self) -> Option<&MediaItem> {
        self.zap.preview()
    }

    pub fn continue_watching(&self) -> Vec<ContinueEntry> {
        self.progress.continue_watching().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "continue-watching unavailable");
            Vec::new()
        })
    }

    /// Watched marker for listings
    pub fn is_watched(&self, item: &MediaItem) -> bool {
        match item.kind {
            ItemKind::Episode => self.progress.is_episode_completed(&item.id),
            ItemKind::Movie | ItemKind::Series => self.progress.load(&item.id).is_completed(),
            _ => false,
        }
    }

    /// Raw stream command of the playing session, for copy-link
    pub fn stream_link(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.refs.raw.as_str())
    }

    // -------------------------------------------------------------------------
    // Keyboard Event Handling
    // -------------------------------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent, now: Instant, fx: &mut Vec<Effect>) {
        // Clear toast on any keypress
        self.toast = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.quit(fx);
            return;
        }

        if self.input_mode == InputMode::Editing {
            self.handle_editing_key(key, fx);
            return;
        }

        match self.screen {
            Screen::Browse => self.handle_browse_key(key, now, fx),
            Screen::Player => self.handle_player_key(key, now, fx),
        }
    }

    fn handle_editing_key(&mut self, key: KeyEvent, fx: &mut Vec<Effect>) {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                self.submit_search(fx);
            }
            KeyCode::Char(c) => self.search.insert(c),
            KeyCode::Backspace => self.search.backspace(),
            KeyCode::Left => self.search.cursor_left(),
            KeyCode::Right => self.search.cursor_right(),
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent, now: Instant, fx: &mut Vec<Effect>) {
        match key.code {
            KeyCode::Char('q') => self.quit(fx),
            KeyCode::Char('/') | KeyCode::Char('s') => self.focus_search(),
            KeyCode::Esc | KeyCode::Backspace => self.back(fx),
            KeyCode::Up | KeyCode::Char('k') => self.navigate(Direction::Up, fx),
            KeyCode::Down | KeyCode::Char('j') => self.navigate(Direction::Down, fx),
            KeyCode::Left | KeyCode::Char('h') => self.navigate(Direction::Left, fx),
            KeyCode::Right | KeyCode::Char('l') => self.navigate(Direction::Right, fx),
            KeyCode::Enter => self.activate_focused(fx),
            KeyCode::Char('r') => {
                if self.loading.is_error() {
                    self.load_first_page(None, fx);
                } else if self.banner.is_some() {
                    self.retry_page(fx);
                }
            }
            KeyCode::Char('1') => self.switch_content(ContentType::Movie, now, fx),
            KeyCode::Char('2') => self.switch_content(ContentType::Series, now, fx),
            KeyCode::Char('3') => self.switch_content(ContentType::Tv, now, fx),
            _ => {}
        }
    }

    fn handle_player_key(&mut self, key: KeyEvent, now: Instant, fx: &mut Vec<Effect>) {
        self.show_controls(now);
        let live = self.context.content_type.is_live();

        match key.code {
            KeyCode::Char('q') => self.quit(fx),
            KeyCode::Esc | KeyCode::Backspace => self.leave_player(fx),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_pause(fx),
            KeyCode::Char('r') => self.restart(fx),
            KeyCode::Left => self.seek_by(-SEEK_STEP, fx),
            KeyCode::Right => self.seek_by(SEEK_STEP, fx),
            KeyCode::Up | KeyCode::PageUp if live => self.on_zap(ZapDirection::Prev, now),
            KeyCode::Down | KeyCode::PageDown if live => self.on_zap(ZapDirection::Next, now),
            KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_volume(VOLUME_STEP, fx),
            KeyCode::Down | KeyCode::Char('-') => self.adjust_volume(-VOLUME_STEP, fx),
            KeyCode::Char('m') => self.toggle_mute(fx),
            KeyCode::Char('c') => self.cast(fx),
            KeyCode::Char('y') => {
                if let Some(link) = self.stream_link() {
                    self.toast = Some(format!("Link: {}", link));
                }
            }
            _ => {}
        }
    }

    fn focus_search(&mut self) {
        if self.context.content_type.is_live() {
            self.toast = Some("Search is not available for live TV".into());
            return;
        }
        self.input_mode = InputMode::Editing;
    }

    fn quit(&mut self, fx: &mut Vec<Effect>) {
        self.teardown_session(fx);
        self.running = false;
    }

    // -------------------------------------------------------------------------
    // Browsing
    // -------------------------------------------------------------------------

    /// Context to push before leaving the current listing
    fn snapshot_context(&self) -> BrowseContext {
        BrowseContext {
            focused_index: self.nav.focused,
            ..self.context.clone()
        }
    }

    fn load_first_page(&mut self, restore: Option<usize>, fx: &mut Vec<Effect>) {
        self.generation += 1;
        let live = self.context.content_type.is_live();
        self.pagination = PaginationTrigger::new(live);
        let page = self.pagination.begin_first_page();
        self.pending_restore = restore;
        self.loading = LoadingState::Loading(Some(format!("Loading {}...", self.context.title())));
        self.banner = None;
        self.items.clear();
        self.rebuild_registry(ListChange::FirstPage { restore: None });

        tracing::debug!(generation = self.generation, context = %self.context.title(), "loading first page");
        if live {
            fx.push(Effect::FetchChannels {
                generation: self.generation,
                refresh: false,
            });
        } else {
            fx.push(Effect::FetchPage {
                generation: self.generation,
                params: self.context.params(page),
            });
        }
    }

    fn fetch_more(&mut self, fx: &mut Vec<Effect>) {
        if let Some(page) = self.pagination.begin_next_page() {
            tracing::debug!(page, "fetching next page");
            fx.push(Effect::FetchPage {
                generation: self.generation,
                params: self.context.params(page),
            });
        }
    }

    fn retry_page(&mut self, fx: &mut Vec<Effect>) {
        if let Some(page) = self.pagination.begin_retry() {
            self.banner = None;
            self.rebuild_registry(ListChange::Append);
            fx.push(Effect::FetchPage {
                generation: self.generation,
                params: self.context.params(page),
            });
        }
    }

    /// Re-enumerate focusable elements after the listing changed
    fn rebuild_registry(&mut self, change: ListChange) {
        let elements: Vec<FocusableElement> = if self.loading.is_error() {
            vec![FocusableElement::button("reload", FocusAction::ReloadView)]
        } else {
            let mut elements: Vec<FocusableElement> = self
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| FocusableElement::link(item.id.clone(), FocusAction::OpenItem(i)))
                .collect();
            if self.banner.is_some() {
                elements.push(FocusableElement::button("retry-page", FocusAction::RetryPage));
            }
            elements
        };
        self.registry.enumerate(elements);
        self.nav.on_list_changed(change, self.registry.len());
    }

    fn navigate(&mut self, direction: Direction, fx: &mut Vec<Effect>) {
        match self.nav.navigate(direction, self.registry.len()) {
            NavStep::Moved(index) => {
                if pagination::should_fetch_more(index, self.items.len(), self.nav.columns) {
                    self.fetch_more(fx);
                }
            }
            NavStep::EdgeBelow => self.fetch_more(fx),
            NavStep::Unchanged => {}
        }
    }

    fn activate_focused(&mut self, fx: &mut Vec<Effect>) {
        let Some(index) = self.nav.focused else {
            return;
        };
        let Some(action) = self.registry.activate(index).cloned() else {
            return;
        };
        match action {
            FocusAction::OpenItem(i) => self.open_item(i, fx),
            FocusAction::ReloadView => self.load_first_page(None, fx),
            FocusAction::RetryPage => self.retry_page(fx),
        }
    }

    fn open_item(&mut self, index: usize, fx: &mut Vec<Effect>) {
        let Some(item) = self.items.get(index).cloned() else {
            return;
        };
        if let Some(next) = self.context.drill(&item) {
            self.cancel_activation();
            let current = self.snapshot_context();
            self.history.push(current);
            self.context = next;
            self.load_first_page(None, fx);
            return;
        }
        if !item.kind.is_playable() {
            tracing::debug!(item = %item.title, "nothing to open");
            return;
        }
        let series = self.context.series.clone();
        self.activate(item, series, true, fx);
    }

    fn submit_search(&mut self, fx: &mut Vec<Effect>) {
        let query = self.search.query.trim().to_string();
        if query.is_empty() {
            return;
        }
        self.cancel_activation();
        let current = self.snapshot_context();
        self.history.push(current);
        self.context = self.context.with_search(&query);
        self.load_first_page(None, fx);
    }

    /// Back out of an opening item, or pop one listing
    fn back(&mut self, fx: &mut Vec<Effect>) {
        if self.activation.is_some() {
            tracing::debug!("activation cancelled by back");
            self.cancel_activation();
            return;
        }
        let Some(previous) = self.history.pop() else {
            return;
        };
        self.zap.cancel(&mut self.timers);
        self.retry_timer.cancel(&mut self.timers);
        let restore = previous.focused_index;
        self.context = BrowseContext {
            focused_index: None,
            ..previous
        };
        self.load_first_page(restore, fx);
    }

    fn switch_content(&mut self, content_type: ContentType, now: Instant, fx: &mut Vec<Effect>) {
        tracing::info!(%content_type, "switching content");
        self.zap.cancel(&mut self.timers);
        self.retry_timer.cancel(&mut self.timers);
        self.refresh_timer.cancel(&mut self.timers);
        self.cancel_activation();
        self.teardown_session(fx);
        self.screen = Screen::Browse;
        self.player_mark = None;
        self.history.clear();
        self.channels.clear();
        self.search.clear();
        self.context = BrowseContext::root(content_type);
        self.load_first_page(None, fx);
        if content_type.is_live() {
            self.arm_refresh(now);
        }
    }

    fn on_page_loaded(&mut self, generation: u64, page: usize, result: Result<CatalogPage, FetchError>) {
        if generation != self.generation {
            tracing::debug!(generation, current = self.generation, "dropping stale page");
            return;
        }
        match result {
            Ok(CatalogPage { items, total_count }) => {
                if !self.pagination.complete(page, items.len(), total_count) {
                    return;
                }
                if page <= 1 {
                    self.items = items;
                    if self.context.content_type.is_live() {
                        self.channels = self.items.clone();
                    }
                    self.loading = LoadingState::Idle;
                    let restore = self.pending_restore.take();
                    self.rebuild_registry(ListChange::FirstPage { restore });
                } else {
                    self.items.extend(items);
                    self.rebuild_registry(ListChange::Append);
                }
                tracing::debug!(page, loaded = self.items.len(), "page loaded");
            }
            Err(error) => {
                if !self.pagination.fail(page) {
                    return;
                }
                tracing::warn!(%error, "catalog fetch failed");
                if error.is_blocking() {
                    self.items.clear();
                    self.loading = LoadingState::Error(error.to_string());
                    self.pending_restore = None;
                    self.rebuild_registry(ListChange::FirstPage { restore: None });
                } else {
                    self.banner = Some(error);
                    self.rebuild_registry(ListChange::Append);
                }
            }
        }
    }

    fn on_channels_loaded(
        &mut self,
        generation: u64,
        refresh: bool,
        result: Result<Vec<MediaItem>, FetchError>,
    ) {
        if !refresh {
            let page = result.map(|items| CatalogPage {
                total_count: Some(items.len()),
                items,
            });
            self.on_page_loaded(generation, 1, page);
            return;
        }
        if generation != self.generation {
            return;
        }
        match result {
            Ok(fresh) => {
                for list in [&mut self.items, &mut self.channels] {
                    for item in list.iter_mut() {
                        if let Some(update) = fresh.iter().find(|f| f.id == item.id) {
                            item.now_playing = update.now_playing.clone();
                        }
                    }
                }
            }
            Err(error) => tracing::debug!(%error, "now-playing refresh failed"),
        }
    }

    // -------------------------------------------------------------------------
    // Activation
    // -------------------------------------------------------------------------

    fn activate(
        &mut self,
        item: MediaItem,
        series: Option<MediaItem>,
        push_history: bool,
        fx: &mut Vec<Effect>,
    ) {
        self.cancel_activation();
        self.teardown_session(fx);
        self.activation_generation += 1;

        match Activation::start(item, series, self.context.content_type) {
            Ok((activation, step)) => {
                if push_history {
                    let current = self.snapshot_context();
                    self.pending_push = Some(self.history.push(current));
                }
                self.opening = Some(activation.item.title.clone());
                self.activation = Some(activation);
                self.issue_step(step, fx);
            }
            Err(error) => self.fail_activation(error, fx),
        }
    }

    fn issue_step(&mut self, step: ResolveStep, fx: &mut Vec<Effect>) {
        let activation = self.activation_generation;
        fx.push(match step {
            ResolveStep::Files(params) => Effect::FetchFiles { activation, params },
            ResolveStep::Command(reference) => Effect::ResolveCommand {
                activation,
                reference,
            },
        });
    }

    /// Drop the pending activation and undo its history push
    fn cancel_activation(&mut self) {
        if self.activation.take().is_some() {
            self.activation_generation += 1;
        }
        self.opening = None;
        if let Some(mark) = self.pending_push.take() {
            self.history.rollback(mark);
        }
    }

    fn fail_activation(&mut self, error: ResolutionError, fx: &mut Vec<Effect>) {
        tracing::warn!(%error, "activation failed");
        self.cancel_activation();
        self.toast = Some(error.to_string());
        if self.screen == Screen::Player && self.session.is_none() {
            self.leave_player(fx);
        }
    }

    fn on_files_loaded(
        &mut self,
        activation: u64,
        result: Result<Vec<MediaItem>, ResolutionError>,
        fx: &mut Vec<Effect>,
    ) {
        if activation != self.activation_generation {
            tracing::debug!(activation, "dropping stale file set");
            return;
        }
        let Some(pending) = self.activation.as_mut() else {
            return;
        };
        match result.and_then(|files| pending.on_files(files)) {
            Ok(step) => self.issue_step(step, fx),
            Err(error) => self.fail_activation(error, fx),
        }
    }

    fn on_command_resolved(
        &mut self,
        activation: u64,
        result: Result<Option<String>, ResolutionError>,
        now: Instant,
        fx: &mut Vec<Effect>,
    ) {
        if activation != self.activation_generation {
            tracing::debug!(activation, "dropping stale stream command");
            return;
        }
        let Some(pending) = self.activation.take() else {
            return;
        };
        match result.and_then(|command| pending.clone().on_command(command, &self.server)) {
            Ok(resolved) => self.mount_session(&pending, resolved, now, fx),
            Err(error) => self.fail_activation(error, fx),
        }
    }

    fn mount_session(
        &mut self,
        activation: &Activation,
        resolved: ResolvedStream,
        now: Instant,
        fx: &mut Vec<Effect>,
    ) {
        self.teardown_session(fx);
        let session = PlaybackSession::new(activation, resolved);
        tracing::info!(item = %session.item.title, live = session.is_live(), "session started");

        fx.push(Effect::Mount {
            session: session.id,
            url: session.refs.proxied.clone(),
            start_at: None,
            live: session.is_live(),
            title: session.item.title.clone(),
        });

        if self.screen == Screen::Browse {
            self.player_mark = self.pending_push.take();
            self.screen = Screen::Player;
        } else {
            self.pending_push = None;
        }
        self.opening = None;
        let live = session.is_live();
        self.session = Some(session);
        self.show_controls(now);
        if live && !self.refresh_timer.is_armed(&self.timers) {
            self.arm_refresh(now);
        }
    }

    /// Stop the current session, persisting its final position
    fn teardown_session(&mut self, fx: &mut Vec<Effect>) {
        self.retry_timer.cancel(&mut self.timers);
        if let Some(session) = self.session.take() {
            tracing::debug!(item = %session.item.title, "session torn down");
            if session.current_time > 0.0 && session.terminal.is_none() {
                Self::write_progress(&mut self.progress, &session, session.current_time);
            }
            fx.push(Effect::Unmount);
        }
    }

    fn leave_player(&mut self, fx: &mut Vec<Effect>) {
        self.zap.cancel(&mut self.timers);
        self.controls_timer.cancel(&mut self.timers);
        self.cancel_activation();
        self.teardown_session(fx);
        self.screen = Screen::Browse;
        self.controls_visible = false;

        if let Some(mark) = self.player_mark.take() {
            self.history.rollback(mark + 1);
            if let Some(previous) = self.history.pop() {
                if let Some(index) = previous.focused_index {
                    self.nav.focus(index, self.registry.len());
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Live TV
    // -------------------------------------------------------------------------

    fn on_zap(&mut self, direction: ZapDirection, now: Instant) {
        // Between a commit and the mount, the channel being resolved is the
        // reference.
        let playing = self
            .session
            .as_ref()
            .map(|s| &s.item)
            .or_else(|| self.activation.as_ref().map(|a| &a.item));
        let outcome = self.zap.on_zap(
            direction,
            &self.channels,
            playing,
            &mut self.timers,
            now,
            TimerKind::ZapCommit,
        );
        if let ZapOutcome::Previewing(channel) = outcome {
            tracing::debug!(channel = %channel.title, "previewing");
        }
    }

    fn commit_zap(&mut self, channel: MediaItem, fx: &mut Vec<Effect>) {
        if let Some(pos) = self.items.iter().position(|c| c.id == channel.id) {
            self.nav.focus(pos, self.registry.len());
            if self.player_mark.is_some() {
                if let Some(entry) = self.history.peek_mut() {
                    entry.focused_index = Some(pos);
                }
            }
        }
        self.activate(channel, None, false, fx);
    }

    fn arm_refresh(&mut self, now: Instant) {
        self.refresh_timer.arm(
            &mut self.timers,
            now,
            self.refresh_interval,
            TimerKind::NowPlayingRefresh,
        );
    }

    fn refresh_now_playing(&mut self, now: Instant, fx: &mut Vec<Effect>) {
        if !self.context.content_type.is_live() {
            return;
        }
        if !self.loading.is_loading() {
            fx.push(Effect::FetchChannels {
                generation: self.generation,
                refresh: true,
            });
        }
        self.arm_refresh(now);
    }

    // -------------------------------------------------------------------------
    // Playback
    // -------------------------------------------------------------------------

    fn show_controls(&mut self, now: Instant) {
        self.controls_visible = true;
        self.controls_timer
            .arm(&mut self.timers, now, self.controls_hide, TimerKind::HideControls);
    }

    fn toggle_pause(&mut self, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.terminal.is_some() {
            self.restart(fx);
        } else if session.is_playing {
            fx.push(Effect::Player(PlayerCommand::Pause));
        } else {
            fx.push(Effect::Player(PlayerCommand::Play));
        }
    }

    /// Manual restart after a terminal error
    fn restart(&mut self, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.terminal.is_none() {
            return;
        }
        let start_at = session.restart();
        tracing::info!(item = %session.item.title, "manual restart");
        fx.push(Effect::Mount {
            session: session.id,
            url: session.refs.proxied.clone(),
            start_at,
            live: session.is_live(),
            title: session.item.title.clone(),
        });
    }

    fn seek_by(&mut self, delta: f64, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.config.seekable || session.terminal.is_some() {
            return;
        }
        let mut target = (session.current_time + delta).max(0.0);
        if session.duration > 0.0 {
            target = target.min(session.duration);
        }
        session.current_time = target;
        fx.push(Effect::Player(PlayerCommand::Seek(target)));
    }

    fn adjust_volume(&mut self, delta: f32, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.volume = (session.volume + delta).clamp(0.0, 1.0);
        fx.push(Effect::Player(PlayerCommand::SetVolume(session.volume)));
    }

    fn toggle_mute(&mut self, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.muted = !session.muted;
        fx.push(Effect::Player(PlayerCommand::SetMute(session.muted)));
    }

    fn cast(&mut self, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let Some(target) = self.cast_device.clone() else {
            self.toast = Some("No cast device configured".into());
            return;
        };
        let playback_position = if session.is_live() {
            0.0
        } else {
            session.current_time
        };
        self.toast = Some(format!("Casting to {}...", target));
        fx.push(Effect::Cast {
            target,
            payload: CastPayload {
                media: session.item.clone(),
                stream_refs: session.refs.clone(),
                playback_position,
            },
        });
    }

    fn on_player_event(
        &mut self,
        session_id: Uuid,
        event: PlayerEvent,
        now: Instant,
        fx: &mut Vec<Effect>,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.id != session_id {
            tracing::debug!(?event, "dropping event from a previous player");
            return;
        }

        match event {
            PlayerEvent::Ready => {
                let saved = if session.config.resume {
                    self.progress.resume_position(&session.item_id)
                } else {
                    None
                };
                if let Some(position) = session.take_resume(saved) {
                    tracing::info!(position, item = %session.item.title, "resuming");
                    session.current_time = position;
                    fx.push(Effect::Player(PlayerCommand::Seek(position)));
                }
            }
            PlayerEvent::TimeUpdate(position) => {
                if let Some(position) =
                    session.on_time_update(position, now, self.checkpoint_interval)
                {
                    Self::write_progress(&mut self.progress, session, position);
                }
            }
            PlayerEvent::DurationChange(duration) => session.on_duration(duration),
            PlayerEvent::Play => session.is_playing = true,
            PlayerEvent::Playing => session.on_playing(),
            PlayerEvent::Pause => session.on_paused(),
            PlayerEvent::VolumeChange { volume, muted } => session.on_volume(volume, muted),
            PlayerEvent::Waiting => session.on_waiting(),
            PlayerEvent::Ended => {
                session.on_ended();
                if session.duration > 0.0 {
                    let end = session.duration;
                    Self::write_progress(&mut self.progress, session, end);
                }
            }
            PlayerEvent::Error(detail) => self.on_player_error(detail, fx),
            PlayerEvent::Closed => {
                tracing::info!(item = %session.item.title, "player closed");
                if self.screen == Screen::Player {
                    self.leave_player(fx);
                } else {
                    self.teardown_session(fx);
                }
            }
        }
    }

    fn on_player_error(&mut self, detail: FailureDetail, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.terminal.is_some() {
            return;
        }
        if session.is_recovering {
            tracing::debug!(message = %detail.message, "recovery in flight, error ignored");
            return;
        }
        match self.retry.classify(&detail) {
            Triage::ForcePlay => {
                tracing::info!(message = %detail.message, "transient player error");
                if !session.is_playing {
                    fx.push(Effect::Player(PlayerCommand::Play));
                }
            }
            Triage::Probe => {
                if session.begin_recovery() {
                    tracing::warn!(message = %detail.message, item = %session.item.title, "player error, probing stream");
                    fx.push(Effect::Probe {
                        session: session.id,
                        url: session.refs.proxied.clone(),
                    });
                }
            }
        }
    }

    fn on_probe_finished(
        &mut self,
        session_id: Uuid,
        outcome: ProbeOutcome,
        now: Instant,
        fx: &mut Vec<Effect>,
    ) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.id != session_id || !session.is_recovering {
            return;
        }
        let class = self.retry.classify_probe(&outcome);
        let (action, next) = self.retry.handle(class, session.retry_count);
        session.retry_count = next;

        match action {
            RetryAction::Resume => {
                session.is_recovering = false;
                fx.push(Effect::Player(PlayerCommand::Play));
            }
            RetryAction::Reload { delay } => {
                tracing::info!(?outcome, ?class, retry = next, "reload scheduled");
                let id = session.id;
                self.retry_timer.arm(
                    &mut self.timers,
                    now,
                    delay,
                    TimerKind::RetryReload { session: id },
                );
            }
            RetryAction::GiveUp => {
                session.give_up();
                self.toast = session.terminal.as_ref().map(|e| e.to_string());
                fx.push(Effect::Unmount);
            }
        }
    }

    fn reload_session(&mut self, session_id: Uuid, fx: &mut Vec<Effect>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.id != session_id {
            return;
        }
        session.is_recovering = false;
        let start_at = session.remount();
        tracing::info!(item = %session.item.title, ?start_at, "remounting player");
        fx.push(Effect::Unmount);
        fx.push(Effect::Mount {
            session: session.id,
            url: session.refs.proxied.clone(),
            start_at,
            live: session.is_live(),
            title: session.item.title.clone(),
        });
    }

    /// Classify and persist the position of an on-demand session. Failures
    /// are logged and never interrupt playback.
    fn write_progress(progress: &mut ProgressStore, session: &PlaybackSession, position: f64) {
        if !session.config.track_progress {
            return;
        }
        let snapshot = session.snapshot();
        let outcome = match progress.record(&snapshot, position, session.duration) {
            Ok(Classification::Completed) => progress.clear_checkpoint(&session.item_id),
            Ok(_) => progress.checkpoint(&session.item_id, position),
            Err(e) => Err(e),
        };
        if let Err(error) = outcome {
            tracing::warn!(%error, item = %session.item_id, "progress write failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
