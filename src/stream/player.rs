//! Local Player - mpv playback over its JSON IPC socket
//!
//! mpv is started with `--input-ipc-server` and observed through property
//! changes. Every line mpv writes is decoded into a [`PlayerEvent`]; every
//! [`PlayerCommand`] is encoded into one JSON line.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::process::{Child, Command};

use crate::retry::FailureDetail;
use crate::session::{PlayerCommand, PlayerEvent};

/// Properties observed right after connecting, with their observer ids
const OBSERVED: [(u64, &str); 6] = [
    (1, "time-pos"),
    (2, "duration"),
    (3, "pause"),
    (4, "volume"),
    (5, "mute"),
    (6, "paused-for-cache"),
];

/// Errors from local player operations
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Player '{0}' not found. Install it first.")]
    NotFound(String),
    #[error("Failed to start player: {0}")]
    StartFailed(#[from] std::io::Error),
    #[error("Player IPC socket did not come up: {0}")]
    IpcUnavailable(String),
}

/// What to play
#[derive(Debug, Clone, PartialEq)]
pub struct MountRequest {
    pub url: String,
    pub start_at: Option<f64>,
    pub live: bool,
    pub title: String,
}

/// mpv launcher
#[derive(Debug, Clone)]
pub struct MpvPlayer {
    executable: String,
}

impl MpvPlayer {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Command line for `request`, minus the executable
    pub fn args(&self, request: &MountRequest, socket: &Path) -> Vec<String> {
        let mut args = vec![
            format!("--input-ipc-server={}", socket.display()),
            "--force-window=immediate".to_string(),
            "--idle=no".to_string(),
            "--keep-open=no".to_string(),
            format!("--title={}", request.title),
        ];
        if let Some(start) = request.start_at.filter(|s| *s > 0.0 && !request.live) {
            args.push(format!("--start={:.1}", start));
        }
        if request.live {
            args.push("--cache=yes".to_string());
        }
        args.push(request.url.clone());
        args
    }

    /// Spawn mpv detached from the terminal session
    pub fn spawn(&self, request: &MountRequest, socket: &Path) -> Result<Child, PlayerError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(self.args(request, socket))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // New session so mpv never grabs the TUI's controlling terminal
        #[cfg(unix)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }

        tracing::info!(url = %request.url, start_at = ?request.start_at, "starting mpv");
        cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PlayerError::NotFound(self.executable.clone())
            } else {
                PlayerError::StartFailed(e)
            }
        })
    }
}

impl Default for MpvPlayer {
    fn default() -> Self {
        Self::new("mpv")
    }
}

/// Event to report once the mpv process is gone, when the event stream
/// did not already end the session. A clean exit is the user closing the
/// window; anything else is a crash the retry policy has to see.
pub fn exit_event(finished: bool, success: bool) -> Option<PlayerEvent> {
    match (finished, success) {
        (true, _) => None,
        (false, true) => Some(PlayerEvent::Closed),
        (false, false) => Some(PlayerEvent::Error(FailureDetail::fatal("player exited"))),
    }
}

/// Per-process IPC socket path
pub fn socket_path(session: &uuid::Uuid) -> PathBuf {
    std::env::temp_dir().join(format!("zapcast-{}.sock", session.simple()))
}

/// Commands sent once the socket is connected
pub fn observe_commands() -> Vec<String> {
    OBSERVED
        .iter()
        .map(|(id, name)| json!({ "command": ["observe_property", id, name] }).to_string())
        .collect()
}

/// One JSON line for `command`
pub fn encode_command(command: &PlayerCommand) -> String {
    let args = match command {
        PlayerCommand::Play => json!(["set_property", "pause", false]),
        PlayerCommand::Pause => json!(["set_property", "pause", true]),
        PlayerCommand::Seek(position) => json!(["seek", position, "absolute"]),
        PlayerCommand::SetVolume(volume) => {
            json!(["set_property", "volume", (volume * 100.0).round()])
        }
        PlayerCommand::SetMute(muted) => json!(["set_property", "mute", muted]),
    };
    json!({ "command": args }).to_string()
}

/// Stateful decoder for mpv's event stream. Volume and mute arrive as
/// separate properties but are reported together. `Playing` is first derived
/// from `playback-restart`; cache stalls only toggle it after that.
#[derive(Debug, Clone)]
pub struct IpcDecoder {
    volume: f32,
    muted: bool,
    started: bool,
    finished: bool,
}

impl Default for IpcDecoder {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            started: false,
            finished: false,
        }
    }
}

impl IpcDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An end, error or close event has been reported
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode one line. Command replies and unobserved events yield `None`.
    pub fn decode(&mut self, line: &str) -> Option<PlayerEvent> {
        let value: Value = serde_json::from_str(line.trim()).ok()?;
        let event = value.get("event")?.as_str()?;
        let decoded = match event {
            "file-loaded" => {
                self.started = false;
                Some(PlayerEvent::Ready)
            }
            "playback-restart" => {
                self.started = true;
                Some(PlayerEvent::Playing)
            }
            "end-file" => match value.get("reason").and_then(Value::as_str) {
                Some("eof") => Some(PlayerEvent::Ended),
                Some("error") => {
                    let message = value
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("playback error");
                    Some(PlayerEvent::Error(FailureDetail::fatal(message)))
                }
                Some("quit") | Some("stop") => Some(PlayerEvent::Closed),
                _ => None,
            },
            "property-change" => self.property(&value),
            _ => None,
        };
        if matches!(
            decoded,
            Some(PlayerEvent::Ended | PlayerEvent::Error(_) | PlayerEvent::Closed)
        ) {
            self.finished = true;
        }
        decoded
    }

    fn property(&mut self, value: &Value) -> Option<PlayerEvent> {
        let name = value.get("name")?.as_str()?;
        let data = value.get("data")?;
        match name {
            "time-pos" => data.as_f64().map(PlayerEvent::TimeUpdate),
            "duration" => data.as_f64().map(PlayerEvent::DurationChange),
            "pause" => data
                .as_bool()
                .map(|paused| if paused { PlayerEvent::Pause } else { PlayerEvent::Play }),
            "paused-for-cache" => match data.as_bool()? {
                true => Some(PlayerEvent::Waiting),
                false if self.started => Some(PlayerEvent::Playing),
                false => None,
            },
            "volume" => {
                self.volume = (data.as_f64()? / 100.0).clamp(0.0, 1.0) as f32;
                Some(self.volume_event())
            }
            "mute" => {
                self.muted = data.as_bool()?;
                Some(self.volume_event())
            }
            _ => None,
        }
    }

    fn volume_event(&self) -> PlayerEvent {
        PlayerEvent::VolumeChange {
            volume: self.volume,
            muted: self.muted,
        }
    }
}
