//! Terminal UI components
//!
//! Built with ratatui. Views are stateless: they draw
//! from [`crate::app::App`] and never mutate it.

pub mod browser;
pub mod player;
pub mod search;
pub mod theme;

pub use browser::{layout_for, render_listing, ListingViewport};
pub use player::render_player;
pub use search::render_search_box;
pub use theme::Theme;
