//! Paced replay of recorded voice frames
//!
//! A [`Replayer`] drives a [`PlaybackController`] with a loop that walks a
//! [`Recording`] in timestamp order, sleeping until each packet is due and
//! handing admitted packets to a [`PacketSink`]. Pauses shift the pacing
//! anchor by the time spent paused; seeks are serviced through the shared
//! [`SeekController`] between packets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use super::controller::PlaybackController;
use super::seek::{SeekController, SeekOutcome, TimedPacket};
use crate::config::SkywaveConfig;
use crate::filter::FrequencyFilter;
use crate::types::VoiceFrame;
use crate::{RadioError, Result};

/// A frame and when it was captured, relative to the recording clock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPacket {
    pub timestamp: Duration,
    pub frame: VoiceFrame,
}

impl TimedPacket for RecordedPacket {
    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// Immutable, timestamp-ordered list of packets. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Recording {
    packets: Arc<[RecordedPacket]>,
}

impl Recording {
    /// Packets are sorted by timestamp; equal timestamps keep their order.
    pub fn new(mut packets: Vec<RecordedPacket>) -> Self {
        packets.sort_by_key(|packet| packet.timestamp);
        Self { packets: packets.into() }
    }

    pub fn packets(&self) -> &[RecordedPacket] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Timestamp of the first packet.
    pub fn start(&self) -> Option<Duration> {
        self.packets.first().map(|packet| packet.timestamp)
    }

    /// Span between the first and last packet.
    pub fn duration(&self) -> Duration {
        match (self.packets.first(), self.packets.last()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp),
            _ => Duration::ZERO,
        }
    }
}

impl FromIterator<RecordedPacket> for Recording {
    fn from_iter<T: IntoIterator<Item = RecordedPacket>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Destination of replayed packets.
#[async_trait::async_trait]
pub trait PacketSink: Send + 'static {
    async fn deliver(&mut self, packet: &RecordedPacket) -> Result<()>;
}

#[async_trait::async_trait]
impl PacketSink for mpsc::Sender<RecordedPacket> {
    async fn deliver(&mut self, packet: &RecordedPacket) -> Result<()> {
        self.send(packet.clone()).await.map_err(|_| RadioError::loop_fault("packet sink closed"))
    }
}

/// Plays a [`Recording`] through a [`PlaybackController`].
pub struct Replayer {
    controller: PlaybackController,
    seek: Arc<SeekController>,
    filter: Arc<FrequencyFilter>,
    recording: Recording,
}

impl Replayer {
    pub fn new(
        recording: Recording,
        controller: PlaybackController,
        seek: Arc<SeekController>,
        filter: Arc<FrequencyFilter>,
    ) -> Self {
        Self { controller, seek, filter, recording }
    }

    /// Replayer with its own controller, seek state and an open filter.
    pub fn from_config(recording: Recording, config: &SkywaveConfig) -> Self {
        Self::new(
            recording,
            PlaybackController::new(config.playback),
            Arc::new(SeekController::new(config.seek)),
            Arc::new(FrequencyFilter::new()),
        )
    }

    /// Start playback from the beginning, or from a seek requested beforehand.
    pub fn play<S: PacketSink>(&self, sink: S) {
        self.controller.set_duration(self.recording.duration());
        info!("Replaying {} packets over {:?}", self.recording.len(), self.recording.duration());

        let pacing = PacedLoop {
            controller: self.controller.clone(),
            seek: Arc::clone(&self.seek),
            filter: Arc::clone(&self.filter),
            recording: self.recording.clone(),
        };
        self.controller.start(move |cancel| pacing.run(sink, cancel));
    }

    /// Jump to `offset` from the start of the recording.
    pub fn seek(&self, offset: Duration) {
        let offset = self.seek.request_seek(offset, self.recording.duration());
        self.controller.set_position(offset);
    }

    pub fn set_user_seeking(&self, seeking: bool) {
        self.seek.set_user_seeking(seeking);
    }

    pub fn pause(&self) -> bool {
        self.controller.pause()
    }

    pub fn resume(&self) -> bool {
        self.controller.resume()
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub async fn stop_and_wait(&self) {
        self.controller.stop_and_wait().await;
    }

    pub fn controller(&self) -> &PlaybackController {
        &self.controller
    }

    pub fn filter(&self) -> &Arc<FrequencyFilter> {
        &self.filter
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }
}

struct PacedLoop {
    controller: PlaybackController,
    seek: Arc<SeekController>,
    filter: Arc<FrequencyFilter>,
    recording: Recording,
}

impl PacedLoop {
    async fn run<S: PacketSink>(self, mut sink: S, cancel: CancellationToken) -> Result<()> {
        let packets = self.recording.packets();
        let Some(origin) = self.recording.start() else {
            debug!("Nothing to replay");
            return Ok(());
        };

        let mut index = 0;
        let mut start = Instant::now();

        while index < packets.len() {
            if self.controller.is_paused() {
                let mut paused_at = Instant::now();
                // Seeks filed while paused land now, pacing picks up from there on resume
                loop {
                    if self.apply_seek(origin, &mut index, &mut start, paused_at) {
                        paused_at = Instant::now();
                    }
                    tokio::select! {
                        resumed = self.controller.wait_if_paused(&cancel) => {
                            resumed?;
                            break;
                        }
                        _ = self.seek.changed() => {}
                    }
                }
                start += paused_at.elapsed();
            }

            self.apply_seek(origin, &mut index, &mut start, Instant::now());

            let packet = &packets[index];
            let due = start + (packet.timestamp - origin);

            tokio::select! {
                _ = cancel.cancelled() => return Err(RadioError::Cancelled),
                _ = self.seek.changed() => continue,
                _ = self.controller.pause_requested() => continue,
                _ = tokio::time::sleep_until(due) => {}
            }

            if self.filter.admits(&packet.frame) {
                trace!(index, packet_number = packet.frame.packet_number, "Delivering packet");
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RadioError::Cancelled),
                    delivered = sink.deliver(packet) => delivered?,
                }
            } else {
                trace!(index, "Packet filtered out");
            }
            index += 1;
        }

        debug!("Replay reached the end of the recording");
        Ok(())
    }

    /// Service a pending seek, keeping the controller's position in step with
    /// pacing. `now` is the instant pacing stands at. Returns true on a jump.
    fn apply_seek(&self, origin: Duration, index: &mut usize, start: &mut Instant, now: Instant) -> bool {
        let packets = self.recording.packets();
        match self.seek.service(packets, *index, *start) {
            SeekOutcome::Idle => false,
            SeekOutcome::Accepted(resolution) => {
                debug!(from = *index, to = resolution.index, "Replay jumped");
                *index = resolution.index;
                *start = resolution.start_time;
                self.controller.set_position(packets[*index].timestamp - origin);
                true
            }
            SeekOutcome::Rejected(request) => {
                let position = now.saturating_duration_since(*start);
                debug!("Seek to {:?} dropped, position back at {:?}", request.offset, position);
                self.controller.set_position(position);
                false
            }
        }
    }
}
