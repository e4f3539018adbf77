//! Player overlay
//!
//! Playback status for the mounted stream: title, progress bar or LIVE
//! badge, the pending zap target and the control hints. Controls hide after
//! a period without input; the status line stays.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::app::App;
use crate::models::{PlayState, PlaybackStatus};
use crate::ui::Theme;

const BAR_WIDTH: usize = 40;

/// Filled/empty halves of the progress bar
pub fn progress_bar(status: &PlaybackStatus, width: usize) -> (usize, usize) {
    let filled = ((status.progress().clamp(0.0, 1.0)) * width as f32) as usize;
    (filled, width - filled)
}

fn state_style(state: &PlayState) -> Style {
    match state {
        PlayState::Playing => Theme::watched(),
        PlayState::Error(_) => Theme::error(),
        PlayState::Recovering | PlayState::Buffering => Theme::warning(),
        _ => Theme::loading(),
    }
}

pub fn render_player(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_focused())
        .title(Span::styled(" ▶ NOW PLAYING ", Theme::watched()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut content: Vec<Line> = vec![Line::from("")];

    match app.playback_status() {
        Some(status) => {
            let title = status.title.clone().unwrap_or_default();
            let mut heading = vec![Span::styled(title, Theme::title())];
            if status.live {
                heading.push(Span::raw("  "));
                heading.push(Span::styled(" LIVE ", Theme::live_badge()));
            }
            content.push(Line::from(heading));
            content.push(Line::from(""));

            if status.live {
                if let Some(now) = app
                    .channels
                    .iter()
                    .find(|c| Some(&c.title) == status.title.as_ref())
                    .and_then(|c| c.now_playing.clone())
                {
                    content.push(Line::from(Span::styled(now, Theme::now_playing())));
                }
            } else {
                let (filled, empty) = progress_bar(&status, BAR_WIDTH);
                content.push(Line::from(vec![
                    Span::styled("█".repeat(filled), Theme::progress_bar()),
                    Span::styled("░".repeat(empty), Theme::dimmed()),
                ]));
                content.push(Line::from(Span::styled(
                    format!("{} / {}", status.format_position(), status.format_duration()),
                    Theme::dimmed(),
                )));
            }
            content.push(Line::from(""));
            content.push(Line::from(vec![
                Span::styled(status.state.to_string(), state_style(&status.state)),
                Span::styled(format!("  Volume: {}", status.format_volume()), Theme::text()),
            ]));
        }
        None => {
            let text = match &app.opening {
                Some(title) => format!("Opening {}...", title),
                None => "Connecting...".to_string(),
            };
            content.push(Line::from(Span::styled(text, Theme::loading())));
        }
    }

    if let Some(preview) = app.zap_preview() {
        content.push(Line::from(""));
        content.push(Line::from(vec![
            Span::styled("→ ", Theme::dimmed()),
            Span::styled(preview.to_string(), Theme::zap_preview()),
        ]));
    }

    if app.controls_visible {
        content.push(Line::from(""));
        content.push(controls_line(app.context.content_type.is_live()));
    }

    frame.render_widget(Paragraph::new(content).alignment(Alignment::Center), inner);
}

fn controls_line(live: bool) -> Line<'static> {
    let mut spans = vec![
        Span::styled(" SPACE ", Theme::keybind()),
        Span::styled("Play/Pause  ", Theme::keybind_desc()),
    ];
    if live {
        spans.push(Span::styled(" ↑↓ ", Theme::keybind()));
        spans.push(Span::styled("Channel  ", Theme::keybind_desc()));
    } else {
        spans.push(Span::styled(" ←→ ", Theme::keybind()));
        spans.push(Span::styled("Seek  ", Theme::keybind_desc()));
        spans.push(Span::styled(" +- ", Theme::keybind()));
        spans.push(Span::styled("Volume  ", Theme::keybind_desc()));
    }
    spans.extend([
        Span::styled(" m ", Theme::keybind()),
        Span::styled("Mute  ", Theme::keybind_desc()),
        Span::styled(" c ", Theme::keybind()),
        Span::styled("Cast  ", Theme::keybind_desc()),
        Span::styled(" ESC ", Theme::keybind()),
        Span::styled("Back", Theme::keybind_desc()),
    ]);
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_progress_bar_split() {
        let status = PlaybackStatus {
            position: Duration::from_secs(30),
            duration: Duration::from_secs(120),
            ..Default::default()
        };
        assert_eq!(progress_bar(&status, 40), (10, 30));
    }

    #[test]
    fn test_progress_bar_unknown_duration() {
        assert_eq!(progress_bar(&PlaybackStatus::default(), 40), (0, 40));
    }

    #[test]
    fn test_live_controls_offer_zapping() {
        let text: String = controls_line(true)
            .spans
            .iter()
            .map(|s| s.content.to_string())
            .collect();
        assert!(text.contains("Channel"));
        assert!(!text.contains("Seek"));
    }
}
