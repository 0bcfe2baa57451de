//! Cheap per-packet loudness estimation
//!
//! Used to draw loudness bars for recorded or live packets without running them
//! through the full decode and mix path. Short payloads are assumed to be one
//! compressed 20 ms codec frame and go through a pluggable [`FrameDecoder`];
//! longer payloads are read directly as little-endian 16-bit PCM.
//!
//! The result is `mean(|sample|) / 32768`, clamped to [0, 1]. It is a coarse
//! proxy good for ordering packets by loudness, not a calibrated level.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, trace};

use crate::Result;

/// Sample rate of the short-frame codec.
pub const SAMPLE_RATE: u32 = 48_000;

/// Duration of one compressed frame in milliseconds.
pub const FRAME_DURATION_MS: u32 = 20;

/// Samples in one compressed frame (20 ms at 48 kHz).
pub const FRAME_SAMPLES: usize = (SAMPLE_RATE / 1000 * FRAME_DURATION_MS) as usize;

/// Payloads shorter than this are treated as compressed frames.
pub const COMPRESSED_THRESHOLD: usize = 400;

const FULL_SCALE: f64 = 32768.0;

/// Decoder for one compressed short-frame codec unit.
pub trait FrameDecoder: Send {
    /// Decode `frame` into 16-bit PCM samples.
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<i16>>;
}

impl<F> FrameDecoder for F
where
    F: FnMut(&[u8]) -> Result<Vec<i16>> + Send,
{
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<i16>> {
        self(frame)
    }
}

/// Estimates loudness of raw packet payloads.
pub struct AmplitudeEstimator<D> {
    decoder: D,
}

impl<D: FrameDecoder> AmplitudeEstimator<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    /// Loudness of `payload` in [0, 1].
    ///
    /// Never fails: an empty payload, a decode error or a panicking decoder all
    /// yield 0.
    pub fn estimate(&mut self, payload: &[u8]) -> f32 {
        if payload.is_empty() {
            return 0.0;
        }

        if payload.len() < COMPRESSED_THRESHOLD {
            return self.estimate_compressed(payload);
        }

        // Odd trailing byte is dropped by chunks_exact.
        let samples = payload.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]]));
        mean_abs_level(samples)
    }

    fn estimate_compressed(&mut self, payload: &[u8]) -> f32 {
        let decoder = &mut self.decoder;
        let decoded = catch_unwind(AssertUnwindSafe(|| decoder.decode(payload)));

        match decoded {
            Ok(Ok(samples)) => {
                trace!("Decoded {} samples from {} byte frame", samples.len(), payload.len());
                mean_abs_level(samples)
            }
            Ok(Err(e)) => {
                debug!("Treating undecodable {} byte frame as silence: {}", payload.len(), e);
                0.0
            }
            Err(_) => {
                debug!("Decoder panicked on {} byte frame, treating as silence", payload.len());
                0.0
            }
        }
    }

    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }
}

/// `mean(|s|) / 32768` over `samples`, clamped to [0, 1]; 0 for no samples.
pub fn mean_abs_level<I>(samples: I) -> f32
where
    I: IntoIterator<Item = i16>,
{
    let (sum, count) = samples
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), s| (sum + u64::from(s.unsigned_abs()), count + 1));

    if count == 0 {
        return 0.0;
    }

    ((sum as f64 / count as f64) / FULL_SCALE).clamp(0.0, 1.0) as f32
}
