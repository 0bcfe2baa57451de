//! Seek resolution over timestamp-ordered packets
//!
//! The UI thread files requests with [`SeekController::request_seek`]; the
//! playback loop services them with [`SeekController::resolve`] at its own
//! pace. Only the latest request matters, requests that wait too long are
//! dropped, and seeks landing a few packets from the current index are
//! ignored to avoid jitter while scrubbing.

use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::duration_ms;

/// Anything carrying a timestamp on the recording clock.
pub trait TimedPacket {
    fn timestamp(&self) -> Duration;
}

impl TimedPacket for Duration {
    fn timestamp(&self) -> Duration {
        *self
    }
}

/// Seek debouncing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    /// Requests serviced later than this after being issued are discarded.
    #[serde(rename = "stale_after_ms", with = "duration_ms")]
    pub stale_after: Duration,
    /// Pending requests older than this are cleared when scrubbing ends.
    #[serde(rename = "abandon_after_ms", with = "duration_ms")]
    pub abandon_after: Duration,
    /// Seeks resolving closer than this many packets are ignored.
    pub hysteresis_packets: usize,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(2),
            abandon_after: Duration::from_secs(1),
            hysteresis_packets: 5,
        }
    }
}

/// A pending seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRequest {
    /// Offset from the start of the recording, already clamped.
    pub offset: Duration,
    pub issued_at: Instant,
}

/// Where to continue after an accepted seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekResolution {
    pub index: usize,
    /// Synthetic start instant that keeps elapsed-time pacing seamless from `index`.
    pub start_time: Instant,
}

/// What servicing the pending request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// Nothing was pending.
    Idle,
    /// The request was consumed but dropped as stale or within the hysteresis window.
    Rejected(SeekRequest),
    Accepted(SeekResolution),
}

#[derive(Debug, Default)]
struct SeekState {
    pending: Option<SeekRequest>,
    user_seeking: bool,
}

#[derive(Debug, Default)]
pub struct SeekController {
    state: Mutex<SeekState>,
    config: SeekConfig,
    requested: Notify,
}

impl SeekController {
    pub fn new(config: SeekConfig) -> Self {
        Self { state: Mutex::default(), config, requested: Notify::new() }
    }

    pub fn config(&self) -> &SeekConfig {
        &self.config
    }

    /// File a seek to `offset`, replacing any pending one. Returns the clamped offset.
    pub fn request_seek(&self, offset: Duration, total_duration: Duration) -> Duration {
        let offset = offset.min(total_duration);
        self.state.lock().pending = Some(SeekRequest { offset, issued_at: Instant::now() });
        self.requested.notify_one();
        debug!("Seek requested to {:?} of {:?}", offset, total_duration);
        offset
    }

    /// Track whether the user is scrubbing. Ending a scrub abandons an old request.
    pub fn set_user_seeking(&self, seeking: bool) {
        let mut state = self.state.lock();
        state.user_seeking = seeking;

        if seeking {
            return;
        }
        if let Some(request) = state.pending {
            if request.issued_at.elapsed() > self.config.abandon_after {
                debug!("Abandoning seek to {:?} left over from scrubbing", request.offset);
                state.pending = None;
            }
        }
    }

    pub fn is_user_seeking(&self) -> bool {
        self.state.lock().user_seeking
    }

    pub fn pending(&self) -> Option<SeekRequest> {
        self.state.lock().pending
    }

    /// Completes after a request is filed; a request filed with nobody waiting
    /// wakes the next caller.
    pub async fn changed(&self) {
        self.requested.notified().await
    }

    /// Service the pending request against `packets`, consuming it.
    ///
    /// `packets` must be ordered by non-decreasing timestamp. Returns `None`
    /// when nothing is pending, the request went stale, or the target lands
    /// within the hysteresis window of `current_index`.
    pub fn resolve<P: TimedPacket>(
        &self,
        packets: &[P],
        current_index: usize,
        current_start_time: Instant,
    ) -> Option<SeekResolution> {
        match self.service(packets, current_index, current_start_time) {
            SeekOutcome::Accepted(resolution) => Some(resolution),
            SeekOutcome::Idle | SeekOutcome::Rejected(_) => None,
        }
    }

    /// Like [`resolve`](Self::resolve), but tells a dropped request apart from
    /// an empty queue.
    pub fn service<P: TimedPacket>(
        &self,
        packets: &[P],
        current_index: usize,
        current_start_time: Instant,
    ) -> SeekOutcome {
        let Some(request) = self.state.lock().pending.take() else {
            return SeekOutcome::Idle;
        };

        let waited = request.issued_at.elapsed();
        if waited > self.config.stale_after {
            warn!("Dropping stale seek to {:?}, issued {:?} ago", request.offset, waited);
            return SeekOutcome::Rejected(request);
        }

        let Some(origin) = packets.first().map(TimedPacket::timestamp) else {
            return SeekOutcome::Rejected(request);
        };
        let index = predecessor_index(packets, origin + request.offset);

        if index.abs_diff(current_index) < self.config.hysteresis_packets {
            trace!(index, current_index, "Seek within hysteresis window, ignoring");
            return SeekOutcome::Rejected(request);
        }

        let now = Instant::now();
        let offset = packets[index].timestamp().saturating_sub(origin);
        let start_time = now.checked_sub(offset).unwrap_or(now);
        debug!(
            index,
            current_index,
            "Seek to {:?} resolved, pacing shifted by {:?}",
            request.offset,
            shift(current_start_time, start_time)
        );

        SeekOutcome::Accepted(SeekResolution { index, start_time })
    }
}

/// Rightmost index whose timestamp is <= `target`, clamped into the slice.
fn predecessor_index<P: TimedPacket>(packets: &[P], target: Duration) -> usize {
    let upper = packets.partition_point(|packet| packet.timestamp() <= target);
    upper.saturating_sub(1).min(packets.len().saturating_sub(1))
}

fn shift(from: Instant, to: Instant) -> Duration {
    if to >= from { to - from } else { from - to }
}
