//! Playback lifecycle state machine
//!
//! ```text
//! Idle -> Playing <-> Paused
//!            \         /
//!             Stopping -> Idle
//! ```
//!
//! The controller owns the lifecycle of a caller-supplied playback loop, never
//! its content. The loop runs on its own task and cooperates through the
//! [`CancellationToken`] it is handed and [`PlaybackController::wait_if_paused`].
//!
//! The session lock only guards bookkeeping. It is never held across an await,
//! so a caller blocked in [`stop_and_wait`](PlaybackController::stop_and_wait)
//! cannot deadlock with the loop it is waiting for.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::events::{PlaybackEvent, ProgressSnapshot};
use super::gate::ResumeGate;
use crate::config::duration_ms;
use crate::stream::{Throttle, ThrottleExt};
use crate::{RadioError, Result};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopping,
}

/// Playback tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// How long a stop waits for the loop before giving up on it.
    #[serde(rename = "stop_timeout_ms", with = "duration_ms")]
    pub stop_timeout: Duration,
    /// Period of the progress tick; zero disables the ticker.
    #[serde(rename = "progress_interval_ms", with = "duration_ms")]
    pub progress_interval: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(10),
            progress_interval: Duration::from_millis(250),
            event_capacity: 64,
        }
    }
}

struct Session {
    state: PlaybackState,
    position: Duration,
    duration: Duration,
    /// Wall-clock instant at which position zero would have played.
    anchor: Option<Instant>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
    gate: Option<ResumeGate>,
    run: u64,
    /// Latest run whose Stopped went out.
    announced_stop: u64,
    milestone: u32,
}

impl Session {
    /// Emit Stopped for the current run unless that already happened.
    fn announce_stop(&mut self, shared: &Shared) {
        if self.announced_stop < self.run {
            self.announced_stop = self.run;
            shared.emit(PlaybackEvent::Stopped);
            info!(run = self.run, "Playback stopped");
        }
    }

    fn live_position(&self) -> Duration {
        let position = match (self.state, self.anchor) {
            (PlaybackState::Playing, Some(anchor)) => anchor.elapsed(),
            _ => self.position,
        };
        if self.duration.is_zero() { position } else { position.min(self.duration) }
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::new(self.live_position(), self.duration)
    }
}

struct Shared {
    session: Mutex<Session>,
    events: broadcast::Sender<PlaybackEvent>,
    progress: watch::Sender<ProgressSnapshot>,
    pause_requested: Notify,
    config: PlaybackConfig,
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        trace!("Playback event: {:?}", event);
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// What a stop needs to finish after the state went to `Stopping`.
struct StopTicket {
    run: u64,
    task: Option<JoinHandle<()>>,
}

/// Runs on drop at the end of every run, however it ended.
struct RunGuard {
    shared: Arc<Shared>,
    run: u64,
    cancel: CancellationToken,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // Stops the progress ticker of this run
        self.cancel.cancel();

        let mut session = self.shared.session.lock();
        if session.run == self.run
            && matches!(session.state, PlaybackState::Playing | PlaybackState::Paused)
        {
            debug!(run = self.run, "Playback loop ended on its own");
            if let Some(gate) = session.gate.take() {
                gate.release();
            }
            session.position = session.live_position();
            session.state = PlaybackState::Idle;
            session.anchor = None;
            session.cancel = None;
            session.task = None;
        }
        // A superseded run was already announced by the start that replaced it
        if session.run == self.run {
            session.announce_stop(&self.shared);
        }
    }
}

/// Drives one playback loop at a time.
///
/// Cloning yields another handle to the same controller. `start` and `stop`
/// spawn tasks and must be called from within a tokio runtime.
#[derive(Clone)]
pub struct PlaybackController {
    shared: Arc<Shared>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

impl PlaybackController {
    pub fn new(config: PlaybackConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (progress, _) = watch::channel(ProgressSnapshot::default());
        let session = Session {
            state: PlaybackState::Idle,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            anchor: None,
            cancel: None,
            task: None,
            gate: None,
            run: 0,
            announced_stop: 0,
            milestone: 0,
        };

        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(session),
                events,
                progress,
                pause_requested: Notify::new(),
                config,
            }),
        }
    }

    /// Start `loop_fn` on a new task, stopping any current run first.
    ///
    /// `Started` is emitted before the loop body runs. Errors other than
    /// [`RadioError::Cancelled`] and panics are reported as `Error`; `Stopped`
    /// follows exactly once when the run ends. A run replaced by a restart
    /// gets its `Stopped` before the new run's `Started`.
    pub fn start<F, Fut>(&self, loop_fn: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if let Some(ticket) = self.begin_stop() {
            let this = self.clone();
            tokio::spawn(async move { this.finish_stop(ticket).await });
        }

        let cancel = CancellationToken::new();
        let run = {
            let mut session = self.shared.session.lock();
            session.announce_stop(&self.shared);
            session.run += 1;

            session.state = PlaybackState::Playing;
            session.position = Duration::ZERO;
            session.anchor = Some(Instant::now());
            session.gate = None;
            session.milestone = 0;
            session.cancel = Some(cancel.clone());
            session.task = None;
            self.shared.emit(PlaybackEvent::Started);
            info!(run = session.run, "Playback started");
            session.run
        };

        let guard = RunGuard { shared: Arc::clone(&self.shared), run, cancel: cancel.clone() };
        let loop_cancel = cancel.clone();
        // Spawned without the session lock: a runtime that is shutting down
        // drops the task, and with it the guard, right here.
        let task = tokio::spawn(async move {
            let body = async move { loop_fn(loop_cancel).await };

            match AssertUnwindSafe(body).catch_unwind().await {
                Ok(Ok(())) => debug!(run, "Playback loop finished"),
                Ok(Err(e)) if e.is_cancellation() => debug!(run, "Playback loop cancelled"),
                Ok(Err(e)) => {
                    error!(run, "Playback loop failed: {}", e);
                    guard.shared.emit(PlaybackEvent::Error(e.to_string()));
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(run, "Playback loop panicked: {}", message);
                    guard.shared.emit(PlaybackEvent::Error(message));
                }
            }
            // Resets the session and emits Stopped
            drop(guard);
        });

        {
            let mut session = self.shared.session.lock();
            if session.run == run
                && matches!(session.state, PlaybackState::Playing | PlaybackState::Paused)
            {
                session.task = Some(task);
            }
        }

        let interval = self.shared.config.progress_interval;
        if !interval.is_zero() {
            let this = self.clone();
            tokio::spawn(async move { this.tick_progress(cancel, interval).await });
        }
    }

    /// Pause a playing loop. Returns false (and does nothing) unless playing.
    pub fn pause(&self) -> bool {
        let mut session = self.shared.session.lock();
        if session.state != PlaybackState::Playing {
            debug!("Pause ignored in state {:?}", session.state);
            return false;
        }

        session.position = session.live_position();
        session.anchor = None;
        session.gate = Some(ResumeGate::new());
        session.state = PlaybackState::Paused;
        self.shared.emit(PlaybackEvent::Paused);
        self.shared.pause_requested.notify_one();
        debug!(position = ?session.position, "Playback paused");
        true
    }

    /// Resume a paused loop. Returns false (and does nothing) unless paused.
    pub fn resume(&self) -> bool {
        let mut session = self.shared.session.lock();
        if session.state != PlaybackState::Paused {
            debug!("Resume ignored in state {:?}", session.state);
            return false;
        }
        self.resume_locked(&mut session);
        true
    }

    fn resume_locked(&self, session: &mut Session) {
        if let Some(gate) = session.gate.take() {
            gate.release();
        }
        session.state = PlaybackState::Playing;
        session.anchor = Some(anchor_for(session.position));
        self.shared.emit(PlaybackEvent::Resumed);
        debug!(position = ?session.position, "Playback resumed");
    }

    /// Suspension point for the loop body.
    ///
    /// Returns immediately unless paused. Otherwise waits for resume, or for
    /// `cancel`, in which case the gate is released for everyone and
    /// [`RadioError::Cancelled`] is returned.
    pub async fn wait_if_paused(&self, cancel: &CancellationToken) -> Result<()> {
        let gate = {
            let session = self.shared.session.lock();
            if session.state != PlaybackState::Paused {
                return Ok(());
            }
            session.gate.clone()
        };
        let Some(gate) = gate else {
            return Ok(());
        };

        tokio::select! {
            _ = gate.released() => Ok(()),
            _ = cancel.cancelled() => {
                gate.release();
                Err(RadioError::Cancelled)
            }
        }
    }

    /// Completes when `pause` is called; lets a loop cut a long wait short.
    ///
    /// May complete spuriously for a pause that was already observed.
    pub async fn pause_requested(&self) {
        self.shared.pause_requested.notified().await
    }

    /// Stop without waiting for the loop to finish.
    pub fn stop(&self) {
        if let Some(ticket) = self.begin_stop() {
            let this = self.clone();
            tokio::spawn(async move { this.finish_stop(ticket).await });
        }
    }

    /// Stop and wait (bounded by the configured timeout) for the loop to finish.
    pub async fn stop_and_wait(&self) {
        if let Some(ticket) = self.begin_stop() {
            self.finish_stop(ticket).await;
        }
    }

    fn begin_stop(&self) -> Option<StopTicket> {
        let mut session = self.shared.session.lock();
        match session.state {
            PlaybackState::Idle | PlaybackState::Stopping => {
                debug!("Stop ignored in state {:?}", session.state);
                return None;
            }
            PlaybackState::Paused => self.resume_locked(&mut session),
            PlaybackState::Playing => {}
        }

        session.position = session.live_position();
        session.anchor = None;
        session.state = PlaybackState::Stopping;
        if let Some(cancel) = &session.cancel {
            cancel.cancel();
        }
        debug!(run = session.run, "Stopping playback");

        Some(StopTicket { run: session.run, task: session.task.take() })
    }

    async fn finish_stop(&self, ticket: StopTicket) {
        if let Some(task) = ticket.task {
            let timeout = self.shared.config.stop_timeout;
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(())) => trace!(run = ticket.run, "Playback task joined"),
                Ok(Err(e)) => warn!(run = ticket.run, "Playback task ended abnormally: {}", e),
                Err(_) => warn!(
                    run = ticket.run,
                    "Playback loop did not finish within {:?}, releasing it anyway", timeout
                ),
            }
        }

        let mut session = self.shared.session.lock();
        if session.run == ticket.run {
            session.state = PlaybackState::Idle;
            session.cancel = None;
            session.task = None;
            session.gate = None;
            // Only still pending when the loop outlived the timeout
            session.announce_stop(&self.shared);
        }
    }

    /// Jump to `position` and notify immediately, outside the periodic tick.
    pub fn set_position(&self, position: Duration) {
        let mut session = self.shared.session.lock();
        let position =
            if session.duration.is_zero() { position } else { position.min(session.duration) };

        session.position = position;
        if session.state == PlaybackState::Playing {
            session.anchor = Some(anchor_for(position));
        }

        let snapshot = session.snapshot();
        self.shared.emit(PlaybackEvent::TimeChanged(position));
        self.shared.emit(PlaybackEvent::Progress(snapshot));
        self.shared.progress.send_replace(snapshot);
    }

    /// Periodic tick: recompute progress and notify.
    pub fn update_progress(&self) {
        let mut session = self.shared.session.lock();
        let snapshot = session.snapshot();

        let milestone = (snapshot.percent / 10.0) as u32;
        if milestone > session.milestone {
            info!(
                "Playback {}% ({:.1}s of {:.1}s)",
                milestone * 10,
                snapshot.position.as_secs_f64(),
                snapshot.duration.as_secs_f64()
            );
        }
        session.milestone = milestone;

        self.shared.emit(PlaybackEvent::Progress(snapshot));
        self.shared.progress.send_replace(snapshot);
    }

    async fn tick_progress(self, cancel: CancellationToken, period: Duration) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.update_progress(),
            }
        }
    }

    pub fn set_duration(&self, duration: Duration) {
        self.shared.session.lock().duration = duration;
    }

    pub fn duration(&self) -> Duration {
        self.shared.session.lock().duration
    }

    pub fn position(&self) -> Duration {
        self.shared.session.lock().live_position()
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.session.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlaybackState::Paused
    }

    /// Subscribe to notifications emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.events.subscribe()
    }

    /// Latest progress, at most once per `interval`.
    pub fn progress_stream(&self, interval: Duration) -> Throttle<WatchStream<ProgressSnapshot>> {
        WatchStream::new(self.shared.progress.subscribe()).throttle(interval)
    }
}

fn anchor_for(position: Duration) -> Instant {
    let now = Instant::now();
    now.checked_sub(position).unwrap_or(now)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "playback loop panicked".to_string()
    }
}
