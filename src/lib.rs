//! Voice transport and playback core for radio simulation.
//!
//! Skywave carries short audio frames tagged with frequency, modulation and
//! encryption metadata, and plays them back the way a cockpit radio would.
//!
//! # Features
//!
//! - **Wire format**: byte-exact [`VoiceFrame`] encoding plus a
//!   [`VoiceFrameCodec`](wire::VoiceFrameCodec) for framed streams
//! - **Loudness**: cheap per-packet level estimates via [`AmplitudeEstimator`]
//! - **Filtering**: thread-safe [`FrequencyFilter`] over (frequency, modulation) pairs
//! - **Mixing**: capture effect, wet/dry radio effects and clipping in [`MixingEngine`]
//! - **Playback**: pause/resume/stop lifecycle with [`PlaybackController`],
//!   debounced seeking with [`SeekController`], paced replay with [`Replayer`]
//!
//! # Quick Start
//!
//! ## Example (replay a recording)
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use skywave::{Recording, Replayer, SkywaveConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> skywave::Result<()> {
//!     let config = SkywaveConfig::from_path("skywave.yaml")?;
//!     let replayer = Replayer::from_config(Recording::new(Vec::new()), &config);
//!
//!     let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//!     replayer.play(tx);
//!     replayer.seek(Duration::from_secs(30));
//!
//!     while let Some(packet) = rx.recv().await {
//!         println!("#{} at {:?}", packet.frame.packet_number, packet.timestamp);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Example (wire round trip)
//!
//! ```rust
//! use skywave::{Guid, Modulation, RadioTuning, VoiceFrame, wire};
//!
//! let guid: Guid = "ufYS_WlLVkmFPjqCgxz6GA".parse()?;
//! let frame = VoiceFrame {
//!     audio: vec![0, 1, 2, 3, 4, 5],
//!     tunings: vec![RadioTuning::new(251e6, Modulation::Am, 0)],
//!     unit_id: 1,
//!     packet_number: 1,
//!     retransmission_count: 0,
//!     transmission_guid: guid,
//!     client_guid: guid,
//! };
//!
//! let bytes = wire::encode(&frame)?;
//! assert_eq!(bytes.len(), 79);
//! assert_eq!(wire::decode(&bytes)?, frame);
//! # Ok::<(), skywave::RadioError>(())
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Transport
pub mod wire;

// Signal processing
pub mod amplitude;
pub mod filter;
pub mod mixing;

// Playback
pub mod playback;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

pub use amplitude::{AmplitudeEstimator, FrameDecoder};
pub use config::{ModelCacheConfig, SkywaveConfig};
pub use filter::FrequencyFilter;
pub use mixing::{MixerSettings, MixingEngine, SettingsSource};
pub use playback::{
    PacketSink, PlaybackConfig, PlaybackController, PlaybackEvent, PlaybackState, ProgressSnapshot,
    RecordedPacket, Recording, Replayer, SeekConfig, SeekController,
};
