//! Catalog browser view
//!
//! Renders the active listing as a poster grid (movies, series) or a
//! numbered channel list (live TV). Focus comes from the app's navigation
//! state; this module only draws and reports the visible window back so the
//! event loop can feed wheel scrolling into pagination.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::app::App;
use crate::focus::LayoutDescriptor;
use crate::models::{ContentType, ItemKind, MediaItem};
use crate::ui::Theme;

/// Height of one grid cell including its border
pub const CELL_HEIGHT: u16 = 4;

/// Rows of the listing window after the last draw, in layout rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingViewport {
    pub first_row: usize,
    pub visible_rows: usize,
    pub total_rows: usize,
}

/// Layout the listing uses at the given width
pub fn layout_for(content_type: ContentType, width: u16, cell_width: u16) -> LayoutDescriptor {
    if content_type.is_live() {
        LayoutDescriptor::linear()
    } else {
        LayoutDescriptor::fit(width.saturating_sub(2), cell_width)
    }
}

/// First layout row to draw so the focused row stays on screen
pub fn first_visible_row(focused: Option<usize>, columns: usize, visible_rows: usize) -> usize {
    let row = focused.unwrap_or(0) / columns.max(1);
    let visible_rows = visible_rows.max(1);
    if row < visible_rows {
        0
    } else {
        row + 1 - visible_rows
    }
}

/// Render the listing area
pub fn render_listing(frame: &mut Frame, area: Rect, app: &App) -> ListingViewport {
    let live = app.context.content_type.is_live();
    let title = format!(" {} ", app.context.title());
    let counter = match app.pagination.total_count() {
        Some(total) => format!(" {}/{} ", app.items.len(), total),
        None => format!(" {} ", app.items.len()),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_focused())
        .title(Span::styled(title, Theme::title()))
        .title_bottom(Line::from(Span::styled(counter, Theme::dimmed())).right_aligned());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.loading.is_error() {
        render_blocking_error(frame, inner, app.loading.message().unwrap_or_default());
        return ListingViewport::default();
    }
    if app.items.is_empty() {
        let text = if app.loading.is_loading() {
            Span::styled("Loading...", Theme::loading())
        } else {
            Span::styled("Nothing here", Theme::dimmed())
        };
        let para = Paragraph::new(vec![Line::from(""), Line::from(text)]).alignment(Alignment::Center);
        frame.render_widget(para, inner);
        return ListingViewport::default();
    }

    let (list_area, banner_area) = if app.banner.is_some() || app.pagination.is_in_flight() {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);
        (chunks[0], Some(chunks[1]))
    } else {
        (inner, None)
    };

    let viewport = if live {
        render_channels(frame, list_area, app)
    } else {
        render_grid(frame, list_area, app)
    };

    if let Some(area) = banner_area {
        render_footer(frame, area, app);
    }
    viewport
}

fn render_blocking_error(frame: &mut Frame, area: Rect, message: &str) {
    let para = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(format!("✗ {}", message), Theme::error())),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Enter ", Theme::highlighted()),
            Span::styled(" Reload", Theme::keybind_desc()),
        ]),
    ])
    .alignment(Alignment::Center);
    frame.render_widget(para, area);
}

/// Append status line: spinner while loading, banner with retry after a failure
fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = match &app.banner {
        Some(error) => {
            let retry_focused =
                app.nav.focused.is_some() && app.nav.focused == Some(app.items.len());
            Line::from(vec![
                Span::styled(format!("⚠ {} ", error), Theme::warning()),
                Span::styled(
                    " Retry ",
                    if retry_focused {
                        Theme::highlighted()
                    } else {
                        Theme::keybind()
                    },
                ),
                Span::styled(" [r]", Theme::keybind_desc()),
            ])
        }
        None => Line::from(Span::styled("Loading more...", Theme::loading())),
    };
    frame.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn render_grid(frame: &mut Frame, area: Rect, app: &App) -> ListingViewport {
    let columns = app.nav.columns.max(1);
    let visible_rows = (area.height / CELL_HEIGHT).max(1) as usize;
    let total_rows = app.items.len().div_ceil(columns);
    let first_row = first_visible_row(app.nav.focused, columns, visible_rows);
    let cell_width = area.width / columns as u16;

    for (row, chunk) in app
        .items
        .chunks(columns)
        .enumerate()
        .skip(first_row)
        .take(visible_rows)
    {
        let y = area.y + (row - first_row) as u16 * CELL_HEIGHT;
        for (col, item) in chunk.iter().enumerate() {
            let index = row * columns + col;
            let cell = Rect {
                x: area.x + col as u16 * cell_width,
                y,
                width: cell_width,
                height: CELL_HEIGHT.min(area.bottom().saturating_sub(y)),
            };
            render_cell(frame, cell, item, app.nav.focused == Some(index), app.is_watched(item));
        }
    }

    ListingViewport {
        first_row,
        visible_rows,
        total_rows,
    }
}

fn kind_label(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Category => "▤ CATEGORY",
        ItemKind::Series => "▤ SERIES",
        ItemKind::Season => "▤ SEASON",
        ItemKind::Episode => "EPISODE",
        ItemKind::Movie => "MOVIE",
        ItemKind::Channel => "CHANNEL",
        ItemKind::File => "FILE",
    }
}

fn render_cell(frame: &mut Frame, area: Rect, item: &MediaItem, focused: bool, watched: bool) {
    let container = matches!(
        item.kind,
        ItemKind::Category | ItemKind::Series | ItemKind::Season
    );
    let title_style = if focused {
        Theme::highlighted()
    } else if container {
        Theme::container()
    } else {
        Theme::text()
    };

    let mut meta = vec![Span::styled(kind_label(item.kind), Theme::dimmed())];
    if let Some(year) = item.year {
        meta.push(Span::styled(format!(" {}", year), Theme::secondary()));
    }
    if watched {
        meta.push(Span::styled(" ✓", Theme::watched()));
    }

    let para = Paragraph::new(vec![
        Line::from(Span::styled(item.title.clone(), title_style)),
        Line::from(meta),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if focused {
                Theme::border_focused()
            } else {
                Theme::border()
            }),
    );
    frame.render_widget(para, area);
}

fn render_channels(frame: &mut Frame, area: Rect, app: &App) -> ListingViewport {
    let visible_rows = area.height.max(1) as usize;
    let first_row = first_visible_row(app.nav.focused, 1, visible_rows);

    let lines: Vec<Line> = app
        .items
        .iter()
        .enumerate()
        .skip(first_row)
        .take(visible_rows)
        .map(|(i, channel)| {
            let focused = app.nav.focused == Some(i);
            let mut spans = vec![
                Span::styled(
                    if focused { "▸ " } else { "  " },
                    if focused {
                        Theme::accent()
                    } else {
                        Theme::dimmed()
                    },
                ),
                Span::styled(
                    channel
                        .number
                        .map(|n| format!("{:>4} ", n))
                        .unwrap_or_else(|| "     ".to_string()),
                    Theme::dimmed(),
                ),
                Span::styled(
                    channel.title.clone(),
                    if focused {
                        Theme::highlighted()
                    } else {
                        Theme::text()
                    },
                ),
            ];
            if let Some(now) = &channel.now_playing {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(now.clone(), Theme::now_playing()));
            }
            Line::from(spans)
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), area);

    ListingViewport {
        first_row,
        visible_rows,
        total_rows: app.items.len(),
    }
}

/// Continue-watching strip shown above root listings
pub fn continue_line(app: &App, limit: usize) -> Option<Line<'static>> {
    let entries = app.continue_watching();
    if entries.is_empty() {
        return None;
    }
    let mut spans = vec![Span::styled("Continue: ", Theme::accent())];
    for (i, entry) in entries.iter().take(limit).enumerate() {
        if i > 0 {
            spans.push(Span::styled(" · ", Theme::dimmed()));
        }
        let percent = if entry.duration > 0.0 {
            (entry.position / entry.duration * 100.0).round() as u32
        } else {
            0
        };
        let title = match &entry.snapshot.episode_title {
            Some(ep) => format!("{} - {}", entry.snapshot.title, ep),
            None => entry.snapshot.title.clone(),
        };
        spans.push(Span::styled(title, Theme::text()));
        spans.push(Span::styled(format!(" {}%", percent), Theme::secondary()));
    }
    Some(Line::from(spans))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_listing_is_linear() {
        assert_eq!(layout_for(ContentType::Tv, 200, 24).columns(), 1);
        assert_eq!(layout_for(ContentType::Movie, 98, 24).columns(), 4);
        assert_eq!(layout_for(ContentType::Series, 10, 24).columns(), 1);
    }

    #[test]
    fn test_first_visible_row_follows_focus() {
        assert_eq!(first_visible_row(None, 4, 3), 0);
        assert_eq!(first_visible_row(Some(11), 4, 3), 0);
        // index 12 is on row 3, the window shifts by one
        assert_eq!(first_visible_row(Some(12), 4, 3), 1);
        assert_eq!(first_visible_row(Some(39), 1, 10), 30);
    }

    #[test]
    fn test_first_visible_row_tolerates_zero_sizes() {
        assert_eq!(first_visible_row(Some(5), 0, 0), 5);
    }

    #[test]
    fn test_container_labels() {
        assert!(kind_label(ItemKind::Series).starts_with('▤'));
        assert_eq!(kind_label(ItemKind::Movie), "MOVIE");
    }
}
