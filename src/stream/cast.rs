//! Chromecast handoff via catt CLI
//!
//! The receiver gets the proxied stream URL plus the position to start at.
//! Sending is fire-and-forget: the local session is not affected by the
//! outcome.

use thiserror::Error;

use crate::models::CastPayload;

/// Errors from the cast transport
#[derive(Debug, Error)]
pub enum CastError {
    #[error("catt not found. Install with: pip install catt")]
    NotInstalled,
    #[error("Cast failed: {0}")]
    Failed(String),
    #[error("Cast failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Cast transport using catt CLI
#[derive(Debug, Clone)]
pub struct CattCaster {
    /// Path to catt binary
    catt_path: String,
}

impl CattCaster {
    pub fn new() -> Self {
        Self::with_path("catt")
    }

    /// Create with custom catt path
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            catt_path: path.into(),
        }
    }

    /// catt arguments for handing `payload` to `target`
    pub fn args(target: &str, payload: &CastPayload) -> Vec<String> {
        let mut args = vec![
            "-d".to_string(),
            target.to_string(),
            "cast".to_string(),
        ];
        if payload.playback_position > 0.0 {
            args.push("-t".to_string());
            args.push(format!("{}", payload.playback_position.floor() as u64));
        }
        args.push(payload.stream_refs.proxied.clone());
        args
    }

    /// Send the stream to `target`
    pub async fn send(&self, target: &str, payload: &CastPayload) -> Result<(), CastError> {
        tracing::info!(%target, media = %payload.media.title, "casting");
        let result = tokio::process::Command::new(&self.catt_path)
            .args(Self::args(target, payload))
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CastError::NotInstalled
                } else {
                    CastError::Io(e)
                }
            })?;

        if result.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&result.stderr);
            Err(CastError::Failed(stderr.trim().to_string()))
        }
    }
}

impl Default for CattCaster {
    fn default() -> Self {
        Self::new()
    }
}
