//! Playback infrastructure
//!
//! - Player: mpv spawned with a JSON IPC socket
//! - Cast: Chromecast handoff via catt
//! - Runtime: executes app effects and feeds results back

pub mod cast;
pub mod player;
pub mod runtime;

pub use cast::{CastError, CattCaster};
pub use player::{MountRequest, MpvPlayer, PlayerError};
pub use runtime::Runtime;
