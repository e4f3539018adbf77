//! zapcast color scheme
//!
//! A dark "broadcast" palette plus the style helpers every view draws with.

use ratatui::style::{Color, Modifier, Style};

pub struct Theme;

impl Theme {
    // ═══════════════════════════════════════════════════════════════════════
    // PALETTE
    // ═══════════════════════════════════════════════════════════════════════

    /// Studio black #0b0d12
    pub const BACKGROUND: Color = Color::Rgb(0x0b, 0x0d, 0x12);
    /// Card and input fill #171a24
    pub const BACKGROUND_LIGHT: Color = Color::Rgb(0x17, 0x1a, 0x24);
    /// On-air teal #2ee6c8
    pub const PRIMARY: Color = Color::Rgb(0x2e, 0xe6, 0xc8);
    /// Programme violet #b48cff
    pub const SECONDARY: Color = Color::Rgb(0xb4, 0x8c, 0xff);
    /// Tally amber #ffc83d
    pub const ACCENT: Color = Color::Rgb(0xff, 0xc8, 0x3d);
    /// Zap coral #ff6b5e
    pub const HIGHLIGHT: Color = Color::Rgb(0xff, 0x6b, 0x5e);
    pub const TEXT: Color = Color::Rgb(0xdc, 0xde, 0xe6);
    pub const DIM: Color = Color::Rgb(0x5a, 0x5f, 0x70);
    pub const SUCCESS: Color = Color::Rgb(0x5c, 0xd6, 0x6e);
    pub const WARNING: Color = Color::Rgb(0xff, 0x9f, 0x1c);
    /// Also the LIVE badge
    pub const ERROR: Color = Color::Rgb(0xf0, 0x3a, 0x47);
    pub const BORDER: Color = Color::Rgb(0x2a, 0x6f, 0x68);

    // ═══════════════════════════════════════════════════════════════════════
    // STYLES
    // ═══════════════════════════════════════════════════════════════════════

    pub fn text() -> Style {
        Style::default().fg(Self::TEXT)
    }

    /// Focused cell (inverted with primary color)
    pub fn highlighted() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn dimmed() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn error() -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    pub fn warning() -> Style {
        Style::default()
            .fg(Self::WARNING)
            .add_modifier(Modifier::BOLD)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn secondary() -> Style {
        Style::default().fg(Self::SECONDARY)
    }

    pub fn accent() -> Style {
        Style::default()
            .fg(Self::ACCENT)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    pub fn border_focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    pub fn progress_bar() -> Style {
        Style::default()
            .fg(Self::SUCCESS)
            .bg(Self::BACKGROUND_LIGHT)
    }

    /// Style for input fields
    pub fn input() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND_LIGHT)
    }

    /// Keybinding hint style
    pub fn keybind() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    /// Keybinding description style
    pub fn keybind_desc() -> Style {
        Style::default().fg(Self::DIM)
    }

    pub fn status_bar() -> Style {
        Style::default().fg(Self::TEXT).bg(Self::BACKGROUND_LIGHT)
    }

    pub fn loading() -> Style {
        Style::default()
            .fg(Self::PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CATALOG STYLES
    // ═══════════════════════════════════════════════════════════════════════

    /// "LIVE" badge
    pub fn live_badge() -> Style {
        Style::default()
            .fg(Self::BACKGROUND)
            .bg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    /// Watched marker on a cell
    pub fn watched() -> Style {
        Style::default().fg(Self::SUCCESS)
    }

    /// Current programme of a channel
    pub fn now_playing() -> Style {
        Style::default()
            .fg(Self::SECONDARY)
            .add_modifier(Modifier::ITALIC)
    }

    /// Channel shown while a zap is pending
    pub fn zap_preview() -> Style {
        Style::default()
            .fg(Self::HIGHLIGHT)
            .add_modifier(Modifier::BOLD)
    }

    /// Folder-like entries (categories, series, seasons)
    pub fn container() -> Style {
        Style::default().fg(Self::ACCENT)
    }
}
