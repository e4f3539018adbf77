//! UI rendering tests
//!
//! Draws the listing and player views into a `TestBackend` and checks what
//! lands in the buffer.

use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};
use zapcast::app::{App, AppEvent};
use zapcast::config::Config;
use zapcast::models::{CatalogPage, ContentType, ItemKind, MediaItem};
use zapcast::pagination::FetchError;
use zapcast::progress::ProgressStore;
use zapcast::store::MemoryStore;
use zapcast::ui::{layout_for, render_listing, render_player, ListingViewport};

// =============================================================================
// Helpers
// =============================================================================

fn test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
    Terminal::new(TestBackend::new(width, height)).unwrap()
}

fn buffer_text(buffer: &Buffer) -> String {
    let area = buffer.area;
    let mut text = String::new();
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            text.push_str(buffer[(x, y)].symbol());
        }
        text.push('\n');
    }
    text
}

fn app_for(content_type: ContentType) -> App {
    let config = Config {
        content_type,
        ..Config::default()
    };
    let mut app = App::new(&config, ProgressStore::new(MemoryStore::new()));
    app.start(Instant::now());
    app
}

fn load(app: &mut App, items: Vec<MediaItem>, total: Option<usize>) {
    let generation = app.generation();
    app.handle(
        AppEvent::PageLoaded {
            generation,
            page: 1,
            result: Ok(CatalogPage {
                items,
                total_count: total,
            }),
        },
        Instant::now(),
    );
}

fn draw_listing(app: &mut App, width: u16, height: u16) -> (ListingViewport, String) {
    let layout = layout_for(app.context.content_type, width, 24);
    app.set_layout(layout);

    let mut terminal = test_terminal(width, height);
    let mut viewport = ListingViewport::default();
    terminal
        .draw(|frame| viewport = render_listing(frame, frame.area(), app))
        .unwrap();
    (viewport, buffer_text(terminal.backend().buffer()))
}

// =============================================================================
// Listing
// =============================================================================

#[test]
fn test_grid_shows_items_and_counter() {
    let mut app = app_for(ContentType::Movie);
    let items = (0..12)
        .map(|i| MediaItem::new(format!("m{i}"), format!("Movie {i}"), ItemKind::Movie))
        .collect();
    load(&mut app, items, Some(120));

    let (viewport, text) = draw_listing(&mut app, 98, 24);

    assert!(text.contains("Movie 0"));
    assert!(text.contains("Movie 3"));
    assert!(text.contains("MOVIE"));
    assert!(text.contains("12/120"));
    // 96 inner columns / 24 per cell
    assert_eq!(app.nav.columns, 4);
    assert_eq!(viewport.total_rows, 3);
    assert_eq!(viewport.first_row, 0);
}

#[test]
fn test_grid_scrolls_with_focus() {
    let mut app = app_for(ContentType::Movie);
    let items = (0..40)
        .map(|i| MediaItem::new(format!("m{i}"), format!("Movie {i}"), ItemKind::Movie))
        .collect();
    load(&mut app, items, Some(40));
    app.set_layout(layout_for(ContentType::Movie, 98, 24));
    app.nav.focus(39, app.registry.len());

    let (viewport, text) = draw_listing(&mut app, 98, 14);

    assert!(viewport.first_row > 0);
    assert!(text.contains("Movie 39"));
    assert!(!text.contains("Movie 0"));
}

#[test]
fn test_channel_list_shows_numbers_and_now_playing() {
    let mut app = app_for(ContentType::Tv);
    let channels = [("1", "News 24", Some("Headlines")), ("2", "Sports", None)]
        .into_iter()
        .map(|(id, title, now)| {
            let mut ch = MediaItem::new(id, title, ItemKind::Channel);
            ch.number = id.parse().ok();
            ch.now_playing = now.map(String::from);
            ch
        })
        .collect();
    let generation = app.generation();
    app.handle(
        AppEvent::ChannelsLoaded {
            generation,
            refresh: false,
            result: Ok(channels),
        },
        Instant::now(),
    );

    let (viewport, text) = draw_listing(&mut app, 80, 24);

    assert!(text.contains("News 24"));
    assert!(text.contains("Headlines"));
    assert!(text.contains("   2 Sports"));
    assert_eq!(viewport.total_rows, 2);
}

#[test]
fn test_first_page_failure_shows_reload() {
    let mut app = app_for(ContentType::Movie);
    let generation = app.generation();
    app.handle(
        AppEvent::PageLoaded {
            generation,
            page: 1,
            result: Err(FetchError::new(1, "connection refused")),
        },
        Instant::now(),
    );

    let (viewport, text) = draw_listing(&mut app, 80, 24);

    assert!(text.contains("connection refused"));
    assert!(text.contains("Reload"));
    assert_eq!(viewport, ListingViewport::default());
}

#[test]
fn test_empty_listing_while_loading() {
    let mut app = app_for(ContentType::Series);
    let (_, text) = draw_listing(&mut app, 80, 24);
    assert!(text.contains("Loading..."));
}

// =============================================================================
// Player
// =============================================================================

#[test]
fn test_player_connecting_before_mount() {
    let app = app_for(ContentType::Movie);
    let mut terminal = test_terminal(80, 24);
    terminal
        .draw(|frame| render_player(frame, frame.area(), &app))
        .unwrap();

    let text = buffer_text(terminal.backend().buffer());
    assert!(text.contains("NOW PLAYING"));
    assert!(text.contains("Connecting..."));
}

#[test]
fn test_player_shows_opening_title() {
    let mut app = app_for(ContentType::Movie);
    load(
        &mut app,
        vec![MediaItem::new("m1", "Alien", ItemKind::Movie)],
        Some(1),
    );
    app.handle(
        AppEvent::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
        Instant::now(),
    );

    let mut terminal = test_terminal(80, 24);
    terminal
        .draw(|frame| render_player(frame, frame.area(), &app))
        .unwrap();

    let text = buffer_text(terminal.backend().buffer());
    assert!(text.contains("Opening Alien..."));
}
