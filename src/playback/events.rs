//! Playback notifications

use std::time::Duration;

/// Position and completion of the current playback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProgressSnapshot {
    pub position: Duration,
    pub duration: Duration,
    /// Completion in [0, 100]; 0 when the duration is unknown.
    pub percent: f64,
}

impl ProgressSnapshot {
    pub fn new(position: Duration, duration: Duration) -> Self {
        let percent = if duration.is_zero() {
            0.0
        } else {
            (position.as_secs_f64() / duration.as_secs_f64() * 100.0).clamp(0.0, 100.0)
        };
        Self { position, duration, percent }
    }
}

/// Notification emitted by [`PlaybackController`](super::PlaybackController).
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started,
    Paused,
    Resumed,
    /// Emitted exactly once per run, whatever way the run ended.
    Stopped,
    /// The playback loop failed or panicked.
    Error(String),
    /// Position jumped, typically because of a seek.
    TimeChanged(Duration),
    Progress(ProgressSnapshot),
}

impl PlaybackEvent {
    /// Started, Paused, Resumed, Stopped or Error.
    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, PlaybackEvent::TimeChanged(_) | PlaybackEvent::Progress(_))
    }
}
