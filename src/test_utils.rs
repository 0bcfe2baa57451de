//! Test fixtures and signal generators
//!
//! Shared by unit tests and the criterion benches: the reference voice frame
//! and its exact wire bytes, tone generators, a scripted short-frame decoder
//! and recording builders.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::time::Duration;

use crate::amplitude::{FRAME_SAMPLES, FrameDecoder};
use crate::playback::{RecordedPacket, Recording};
use crate::types::{GUID_LEN, Guid, Modulation, RadioTuning, VoiceFrame};
use crate::{RadioError, Result};

/// GUID used by the reference frame for both identifiers.
pub const REFERENCE_GUID: &str = "ufYS_WlLVkmFPjqCgxz6GA";

fn reference_guid() -> Guid {
    let mut bytes = [0u8; GUID_LEN];
    bytes.copy_from_slice(REFERENCE_GUID.as_bytes());
    Guid::from_wire(bytes)
}

/// 6 bytes of audio on 100 Hz, modulation 4, unit 1, packet 1, four hops.
pub fn reference_frame() -> VoiceFrame {
    VoiceFrame {
        audio: vec![0, 1, 2, 3, 4, 5],
        tunings: vec![RadioTuning { frequency: 100.0, modulation: 4, encryption: 0 }],
        unit_id: 1,
        packet_number: 1,
        retransmission_count: 4,
        transmission_guid: reference_guid(),
        client_guid: reference_guid(),
    }
}

/// The 79 bytes [`reference_frame`] encodes to, written out field by field.
pub fn reference_frame_bytes() -> Vec<u8> {
    let mut bytes = vec![
        79, 0, // total_length
        6, 0, // audio_length
        10, 0, // freq_block_length
        0, 1, 2, 3, 4, 5, // audio
        0, 0, 0, 0, 0, 0, 0x59, 0x40, // 100.0f64
        4,    // modulation
        0,    // encryption
        1, 0, 0, 0, // unit_id
        1, 0, 0, 0, 0, 0, 0, 0, // packet_number
        4, // retransmission_count
    ];
    bytes.extend_from_slice(REFERENCE_GUID.as_bytes());
    bytes.extend_from_slice(REFERENCE_GUID.as_bytes());
    bytes
}

/// Reference frame transmitted on `count` distinct channels.
pub fn multi_frequency_frame(count: usize) -> VoiceFrame {
    let mut frame = reference_frame();
    frame.tunings = (0..count)
        .map(|i| {
            let modulation = Modulation::ALL[i % Modulation::ALL.len()];
            RadioTuning::new(118e6 + i as f64 * 25e3, modulation, (i % 3) as u8)
        })
        .collect();
    frame.packet_number = 42;
    frame
}

/// Arbitrary frames with finite frequencies.
#[cfg(test)]
pub fn arb_voice_frame() -> impl proptest::strategy::Strategy<Value = VoiceFrame> {
    use proptest::prelude::*;

    let tuning = (-1e12f64..1e12, any::<u8>(), any::<u8>())
        .prop_map(|(frequency, modulation, encryption)| RadioTuning { frequency, modulation, encryption });
    let guid = prop::array::uniform22(any::<u8>()).prop_map(Guid::from_wire);

    (
        prop::collection::vec(any::<u8>(), 0..512),
        prop::collection::vec(tuning, 0..8),
        any::<u32>(),
        any::<u64>(),
        any::<u8>(),
        guid.clone(),
        guid,
    )
        .prop_map(
            |(audio, tunings, unit_id, packet_number, retransmission_count, transmission_guid, client_guid)| {
                VoiceFrame {
                    audio,
                    tunings,
                    unit_id,
                    packet_number,
                    retransmission_count,
                    transmission_guid,
                    client_guid,
                }
            },
        )
}

/// Little-endian PCM bytes for `samples`.
pub fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// `len` samples of a sine with `cycles` periods and the given peak.
pub fn sine_i16(peak: f64, len: usize, cycles: f64) -> Vec<i16> {
    sine(peak, len, cycles).map(|s| s.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16).collect()
}

/// Float variant of [`sine_i16`].
pub fn sine_f32(amplitude: f32, len: usize, cycles: f64) -> Vec<f32> {
    sine(f64::from(amplitude), len, cycles).map(|s| s as f32).collect()
}

fn sine(peak: f64, len: usize, cycles: f64) -> impl Iterator<Item = f64> {
    (0..len).map(move |i| peak * (TAU * cycles * i as f64 / len.max(1) as f64).sin())
}

/// Decoder returning queued results, then a deterministic frame derived from the input.
#[derive(Debug, Default)]
pub struct ScriptedDecoder {
    script: VecDeque<Result<Vec<i16>, String>>,
    calls: usize,
}

impl ScriptedDecoder {
    pub fn push_samples(&mut self, samples: Vec<i16>) -> &mut Self {
        self.script.push_back(Ok(samples));
        self
    }

    pub fn push_error(&mut self, details: impl Into<String>) -> &mut Self {
        self.script.push_back(Err(details.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn decode(&mut self, frame: &[u8]) -> Result<Vec<i16>> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Ok(samples)) => Ok(samples),
            Some(Err(details)) => Err(RadioError::decode_failed(details)),
            None => Ok((0..FRAME_SAMPLES)
                .map(|i| {
                    let byte = frame.get(i % frame.len().max(1)).copied().unwrap_or(0);
                    i16::from(byte as i8) * 256
                })
                .collect()),
        }
    }
}

/// One packet carrying `packet_number`, captured at `timestamp`.
///
/// Even numbers go out on 251 MHz AM, odd ones on 30 MHz FM.
pub fn recorded_packet(timestamp: Duration, packet_number: u64) -> RecordedPacket {
    let mut frame = reference_frame();
    frame.packet_number = packet_number;
    frame.tunings = if packet_number % 2 == 0 {
        vec![RadioTuning::new(251e6, Modulation::Am, 0)]
    } else {
        vec![RadioTuning::new(30e6, Modulation::Fm, 0)]
    };
    RecordedPacket { timestamp, frame }
}

/// `count` packets numbered from 0, `spacing` apart, starting at 10 s.
pub fn recording(count: usize, spacing: Duration) -> Recording {
    let origin = Duration::from_secs(10);
    (0..count as u64).map(|n| recorded_packet(origin + spacing * n as u32, n)).collect()
}
