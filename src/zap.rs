//! Channel zapping with preview and debounced commit
//!
//! Each zap moves a *preview* one channel up or down and restarts a quiet
//! period. Only when the remote has been still for the whole quiet period is
//! the previewed channel committed (torn down and re-opened by the caller).
//! Intermediate channels never reach the network or the player.

use std::time::{Duration, Instant};

use crate::models::MediaItem;
use crate::timer::{TimerHandle, TimerQueue, TimerSlot};

/// Default quiet period before a zap is committed
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2000);

/// Channel up / channel down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZapDirection {
    Next,
    Prev,
}

/// Result of one zap input
#[derive(Debug, Clone, PartialEq)]
pub enum ZapOutcome {
    /// Preview moved to this channel; commit pending
    Previewing(MediaItem),
    /// Already at the end of the list (or reference unknown); nothing moved
    NoOp,
}

/// Preview state plus the single pending commit timer
#[derive(Debug, Clone)]
pub struct ChannelZapController {
    preview: Option<MediaItem>,
    commit_timer: TimerSlot,
    quiet_period: Duration,
}

impl Default for ChannelZapController {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl ChannelZapController {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            preview: None,
            commit_timer: TimerSlot::new(),
            quiet_period,
        }
    }

    /// Channel currently shown as preview, if a zap is pending
    pub fn preview(&self) -> Option<&MediaItem> {
        self.preview.as_ref()
    }

    pub fn is_pending<T>(&self, timers: &TimerQueue<T>) -> bool {
        self.commit_timer.is_armed(timers)
    }

    /// Handle one zap input.
    ///
    /// The reference channel is the preview if one exists, else `playing`.
    /// `payload` is what the timer queue will hand back when the quiet period
    /// ends; pass it to [`ChannelZapController::commit`].
    pub fn on_zap<T>(
        &mut self,
        direction: ZapDirection,
        channels: &[MediaItem],
        playing: Option<&MediaItem>,
        timers: &mut TimerQueue<T>,
        now: Instant,
        payload: T,
    ) -> ZapOutcome {
        self.commit_timer.cancel(timers);

        let reference = self.preview.as_ref().or(playing);
        let position = reference.and_then(|r| channels.iter().position(|c| c.id == r.id));

        let target = position.and_then(|pos| match direction {
            ZapDirection::Next => Some(pos + 1).filter(|&t| t < channels.len()),
            ZapDirection::Prev => pos.checked_sub(1),
        });

        match target {
            Some(t) => {
                let channel = channels[t].clone();
                tracing::debug!(channel = %channel.title, "zap preview");
                self.preview = Some(channel.clone());
                self.commit_timer
                    .arm(timers, now, self.quiet_period, payload);
                ZapOutcome::Previewing(channel)
            }
            None => {
                // Still restart the quiet period for a pending preview so the
                // window always counts from the last input.
                if self.preview.is_some() {
                    self.commit_timer
                        .arm(timers, now, self.quiet_period, payload);
                }
                ZapOutcome::NoOp
            }
        }
    }

    /// Quiet period elapsed: hand out the channel to activate and clear the
    /// preview. Returns `None` for a stale or foreign timer.
    pub fn commit(&mut self, handle: TimerHandle) -> Option<MediaItem> {
        if !self.commit_timer.claim(handle) {
            return None;
        }
        let channel = self.preview.take();
        if let Some(ch) = &channel {
            tracing::info!(channel = %ch.title, "zap committed");
        }
        channel
    }

    /// Drop the preview and any pending commit (back, content switch)
    pub fn cancel<T>(&mut self, timers: &mut TimerQueue<T>) {
        self.commit_timer.cancel(timers);
        self.preview = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(n: usize) -> Vec<MediaItem> {
        (0..n)
            .map(|i| MediaItem::channel(format!("ch{i}"), format!("Channel {i}"), i as u32 + 1))
            .collect()
    }

    #[test]
    fn test_zap_previews_next_channel() {
        let list = channels(5);
        let mut timers = TimerQueue::new();
        let mut zap = ChannelZapController::default();
        let t0 = Instant::now();

        let outcome = zap.on_zap(ZapDirection::Next, &list, Some(&list[1]), &mut timers, t0, ());
        assert_eq!(outcome, ZapOutcome::Previewing(list[2].clone()));
        assert_eq!(zap.preview().map(|c| c.id.as_str()), Some("ch2"));
        assert!(zap.is_pending(&timers));
    }

    #[test]
    fn test_rapid_zaps_commit_once_to_last_channel() {
        let list = channels(10);
        let mut timers = TimerQueue::new();
        let mut zap = ChannelZapController::default();
        let t0 = Instant::now();

        // 4 x Next, 1 x Prev within the quiet window, starting from ch3
        let inputs = [
            ZapDirection::Next,
            ZapDirection::Next,
            ZapDirection::Prev,
            ZapDirection::Next,
            ZapDirection::Next,
        ];
        for (i, dir) in inputs.iter().enumerate() {
            let now = t0 + Duration::from_millis(300 * i as u64);
            zap.on_zap(*dir, &list, Some(&list[3]), &mut timers, now, ());
        }
        assert_eq!(timers.len(), 1);

        // Quiet period counts from the last input
        let last = t0 + Duration::from_millis(1200);
        assert!(timers.take_due(last + Duration::from_millis(1999)).is_empty());

        let due = timers.take_due(last + DEFAULT_QUIET_PERIOD);
        assert_eq!(due.len(), 1);
        let committed = zap.commit(due[0].0).expect("commit");
        assert_eq!(committed.id, "ch6");
        assert!(zap.preview().is_none());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_zap_clamps_at_ends() {
        let list = channels(3);
        let mut timers = TimerQueue::new();
        let mut zap = ChannelZapController::default();
        let t0 = Instant::now();

        assert_eq!(
            zap.on_zap(ZapDirection::Prev, &list, Some(&list[0]), &mut timers, t0, ()),
            ZapOutcome::NoOp
        );
        assert!(timers.is_empty());

        zap.on_zap(ZapDirection::Next, &list, Some(&list[1]), &mut timers, t0, ());
        assert_eq!(
            zap.on_zap(ZapDirection::Next, &list, Some(&list[1]), &mut timers, t0, ()),
            ZapOutcome::NoOp
        );
        // The pending preview survives the clamped input
        assert_eq!(zap.preview().map(|c| c.id.as_str()), Some("ch2"));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_unknown_reference_is_noop() {
        let list = channels(3);
        let stranger = MediaItem::channel("other", "Other", 99);
        let mut timers = TimerQueue::new();
        let mut zap = ChannelZapController::default();

        let outcome = zap.on_zap(
            ZapDirection::Next,
            &list,
            Some(&stranger),
            &mut timers,
            Instant::now(),
            (),
        );
        assert_eq!(outcome, ZapOutcome::NoOp);
        assert!(zap.preview().is_none());
    }

    #[test]
    fn test_cancel_drops_pending_commit() {
        let list = channels(3);
        let mut timers = TimerQueue::new();
        let mut zap = ChannelZapController::default();
        let t0 = Instant::now();

        zap.on_zap(ZapDirection::Next, &list, Some(&list[0]), &mut timers, t0, ());
        zap.cancel(&mut timers);

        assert!(zap.preview().is_none());
        assert!(timers.take_due(t0 + Duration::from_secs(5)).is_empty());
    }
}
