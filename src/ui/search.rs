//! Search box
//!
//! Header input that filters the current catalog listing.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::app::{InputMode, SearchState};
use crate::ui::Theme;

/// Text shown in the box, with a bar at the cursor while editing
pub fn search_text(search: &SearchState, editing: bool, enabled: bool) -> String {
    if editing {
        let (before, after): (String, String) = {
            let cursor = search.cursor.min(search.query.chars().count());
            (
                search.query.chars().take(cursor).collect(),
                search.query.chars().skip(cursor).collect(),
            )
        };
        format!("⌕ {}│{}", before, after)
    } else if !enabled {
        "⌕ Search is not available for live TV".to_string()
    } else if search.query.is_empty() {
        "⌕ Type / to search...".to_string()
    } else {
        format!("⌕ {}", search.query)
    }
}

pub fn render_search_box(
    frame: &mut Frame,
    area: Rect,
    search: &SearchState,
    mode: &InputMode,
    enabled: bool,
) {
    let editing = *mode == InputMode::Editing;
    let border_style = if editing {
        Theme::border_focused()
    } else {
        Theme::border()
    };
    let style = if editing {
        Theme::input().fg(Theme::PRIMARY)
    } else if enabled {
        Theme::input()
    } else {
        Theme::input().fg(Theme::DIM)
    };

    let search_box = Paragraph::new(search_text(search, editing, enabled))
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(border_style)
                .title(Span::styled(" SEARCH ", Theme::title())),
        );
    frame.render_widget(search_box, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_bar_is_char_aware() {
        let search = SearchState {
            query: "café".to_string(),
            cursor: 3,
        };
        assert_eq!(search_text(&search, true, true), "⌕ caf│é");
    }

    #[test]
    fn test_placeholder_and_disabled() {
        let search = SearchState::default();
        assert!(search_text(&search, false, true).contains("Type /"));
        assert!(search_text(&search, false, false).contains("live TV"));
    }
}
