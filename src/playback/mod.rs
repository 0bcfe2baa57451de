//! Playback lifecycle, seeking and recording replay.
//!
//! [`PlaybackController`] owns the Idle/Playing/Paused/Stopping state machine
//! around a caller-supplied loop; [`SeekController`] maps time offsets onto
//! packet indices for that loop; [`Replayer`] combines both with a
//! [`FrequencyFilter`](crate::FrequencyFilter) to replay a [`Recording`].

mod controller;
mod events;
mod gate;
mod replay;
mod seek;

pub use controller::{PlaybackConfig, PlaybackController, PlaybackState};
pub use events::{PlaybackEvent, ProgressSnapshot};
pub use gate::ResumeGate;
pub use replay::{PacketSink, RecordedPacket, Recording, Replayer};
pub use seek::{
    SeekConfig, SeekController, SeekOutcome, SeekRequest, SeekResolution, TimedPacket,
};
