//! Playback failure classification and retry decisions
//!
//! A player error is first triaged on its own: non-fatal or transient
//! (buffering, fragment, stall) errors are answered by simply resuming
//! playback. Anything else triggers a reachability probe of the stream, whose
//! status picks a bounded retry budget (the stream is gone) or an unbounded
//! one (the server or network is having a moment).

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// Delay before a torn-down player is remounted
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Automatic retries allowed for a stream that reports not-found
pub const DEFAULT_MAX_BOUNDED_RETRIES: u32 = 2;

/// Error as reported by the media element
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FailureDetail {
    /// Player flagged the error as recoverable
    pub non_fatal: bool,
    pub message: String,
}

impl FailureDetail {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            non_fatal: false,
            message: message.into(),
        }
    }

    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self {
            non_fatal: true,
            message: message.into(),
        }
    }
}

/// Terminal playback failure surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Stream unavailable after {attempts} retries")]
    StreamUnavailable { attempts: u32 },
}

/// First-stage triage of a player error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Triage {
    /// Resume in place; no teardown, no retry budget spent
    ForcePlay,
    /// Probe the stream endpoint before deciding
    Probe,
}

/// Result of probing the stream endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Status(u16),
    Unreachable(String),
}

/// Final classification of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    ForcePlay,
    BoundedRetry,
    UnboundedRetry,
}

/// What to do about a classified failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    /// Resume the element if it is paused
    Resume,
    /// Tear down and remount after `delay`
    Reload { delay: Duration },
    /// Stop retrying; surface a terminal error
    GiveUp,
}

/// Buffering / fragment / stall wording from the player
fn is_transient(message: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)buffer|frag|stall|underrun|waiting for data").ok())
        .as_ref()
        .map(|re| re.is_match(message))
        .unwrap_or(false)
}

/// Request Timeout, Too Early, Too Many Requests
fn is_retryable_client_status(code: u16) -> bool {
    matches!(code, 408 | 425 | 429)
}

/// Retry policy parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_bounded_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_bounded_retries: DEFAULT_MAX_BOUNDED_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_bounded_retries: u32, delay: Duration) -> Self {
        Self {
            max_bounded_retries,
            delay,
        }
    }

    /// Triage a raw player error
    pub fn classify(&self, detail: &FailureDetail) -> Triage {
        if detail.non_fatal || is_transient(&detail.message) {
            Triage::ForcePlay
        } else {
            Triage::Probe
        }
    }

    /// Classify from the probe result. A client error means the stream
    /// itself is gone, except for timeout and rate-limit statuses. Those, 5xx,
    /// an unreachable endpoint, or a probe that succeeds despite the player
    /// failing are all treated as transient.
    pub fn classify_probe(&self, outcome: &ProbeOutcome) -> FailureClass {
        match outcome {
            ProbeOutcome::Status(code) if is_retryable_client_status(*code) => {
                FailureClass::UnboundedRetry
            }
            ProbeOutcome::Status(code) if (400..500).contains(code) => FailureClass::BoundedRetry,
            ProbeOutcome::Status(_) => FailureClass::UnboundedRetry,
            ProbeOutcome::Unreachable(_) => FailureClass::UnboundedRetry,
        }
    }

    /// Decide the action and the retry count that follows it
    pub fn handle(&self, class: FailureClass, retry_count: u32) -> (RetryAction, u32) {
        match class {
            FailureClass::ForcePlay => (RetryAction::Resume, retry_count),
            FailureClass::BoundedRetry if retry_count >= self.max_bounded_retries => {
                (RetryAction::GiveUp, retry_count)
            }
            FailureClass::BoundedRetry => (
                RetryAction::Reload { delay: self.delay },
                retry_count + 1,
            ),
            FailureClass::UnboundedRetry => {
                (RetryAction::Reload { delay: self.delay }, retry_count)
            }
        }
    }
}
