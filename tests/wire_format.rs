//! End-to-end tests for the voice frame wire path
//!
//! Frames go through the stream codec in arbitrary fragments, get filtered by
//! channel and measured for loudness, the way a receiving client handles them.

use bytes::BytesMut;
use skywave::amplitude::FRAME_SAMPLES;
use skywave::wire::{self, VoiceFrameCodec};
use skywave::{
    AmplitudeEstimator, FrequencyFilter, Guid, Modulation, RadioError, RadioTuning, VoiceFrame,
};
use tokio_util::codec::{Decoder, Encoder};

fn frame(packet_number: u64, tunings: Vec<RadioTuning>, audio: Vec<u8>) -> VoiceFrame {
    let transmission_guid: Guid = "ufYS_WlLVkmFPjqCgxz6GA".parse().expect("valid guid");
    let client_guid: Guid = "AAAAAAAAAAAAAAAAAAAAAA".parse().expect("valid guid");
    VoiceFrame {
        audio,
        tunings,
        unit_id: 100_000_001,
        packet_number,
        retransmission_count: 0,
        transmission_guid,
        client_guid,
    }
}

fn pcm(level: i16, samples: usize) -> Vec<u8> {
    (0..samples)
        .flat_map(|i| {
            let sample = if i % 2 == 0 { level } else { -level };
            sample.to_le_bytes()
        })
        .collect()
}

#[test]
fn reference_scenario_is_79_bytes() {
    let _ = tracing_subscriber::fmt::try_init();

    let reference = frame(1, vec![RadioTuning::new(100.0, Modulation::HaveQuick, 0)], vec![0, 1, 2, 3, 4, 5]);
    let reference = VoiceFrame { retransmission_count: 4, client_guid: reference.transmission_guid, ..reference };

    let bytes = wire::encode(&reference).expect("encode");
    assert_eq!(bytes.len(), 79);
    assert_eq!(&bytes[..6], &[79, 0, 6, 0, 10, 0]);
    assert_eq!(&bytes[6..12], &[0, 1, 2, 3, 4, 5]);
    assert_eq!(&bytes[12..20], &100.0f64.to_le_bytes());
    assert_eq!(&bytes[20..22], &[4, 0]);
    assert_eq!(&bytes[35..57], b"ufYS_WlLVkmFPjqCgxz6GA");

    assert_eq!(wire::decode(&bytes).expect("decode"), reference);
}

#[test]
fn fragmented_stream_reassembles_every_frame() {
    let _ = tracing_subscriber::fmt::try_init();

    let frames: Vec<VoiceFrame> = (0..12)
        .map(|n| {
            let tunings = (0..(n % 4))
                .map(|i| RadioTuning::new(251e6 + f64::from(i as u32) * 1e6, Modulation::Am, 0))
                .collect();
            frame(n, tunings, vec![n as u8; 40 + n as usize * 13])
        })
        .collect();

    let mut codec = VoiceFrameCodec::new();
    let mut wire_bytes = BytesMut::new();
    for frame in &frames {
        codec.encode(frame, &mut wire_bytes).expect("encode");
    }

    // Feed the stream back in uneven slices
    let mut received = Vec::new();
    let mut buffer = BytesMut::new();
    for chunk in wire_bytes.chunks(37) {
        buffer.extend_from_slice(chunk);
        while let Some(frame) = codec.decode(&mut buffer).expect("well-formed stream") {
            received.push(frame);
        }
    }

    assert!(buffer.is_empty());
    assert_eq!(received, frames);
}

#[test]
fn corrupt_length_prefix_poisons_the_stream() {
    let mut codec = VoiceFrameCodec::new();
    let mut buffer = BytesMut::from(&[10u8, 0, 0, 0, 0, 0][..]);

    let err = codec.decode(&mut buffer).expect_err("declared length below minimum");
    assert!(matches!(err, RadioError::Format { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn receiver_pipeline_filters_and_measures() {
    let _ = tracing_subscriber::fmt::try_init();

    let guard = RadioTuning::new(243e6, Modulation::Am, 0);
    let fm = RadioTuning::new(30e6, Modulation::Fm, 0);
    let loud = frame(1, vec![guard], pcm(16384, FRAME_SAMPLES));
    let quiet = frame(2, vec![fm], pcm(1024, FRAME_SAMPLES));
    let both = frame(3, vec![fm, guard], pcm(8192, FRAME_SAMPLES));

    let filter = FrequencyFilter::new();
    filter.set_selection([(243e6, Modulation::Am)]);

    // Long payloads are PCM, the decoder is never consulted
    let mut estimator = AmplitudeEstimator::new(|_: &[u8]| -> skywave::Result<Vec<i16>> {
        Err(RadioError::decode_failed("not a compressed frame"))
    });

    let levels: Vec<(u64, f32)> = [loud, quiet, both]
        .iter()
        .map(|sent| wire::decode(&wire::encode(sent).expect("encode")).expect("decode"))
        .filter(|frame| filter.admits(frame))
        .map(|frame| (frame.packet_number, estimator.estimate(&frame.audio)))
        .collect();

    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].0, 1);
    assert!((levels[0].1 - 0.5).abs() < 1e-6);
    assert_eq!(levels[1].0, 3);
    assert!((levels[1].1 - 0.25).abs() < 1e-6);
}

#[test]
fn compressed_payloads_go_through_the_decoder() {
    let mut calls = 0;
    let mut estimator = AmplitudeEstimator::new(move |frame: &[u8]| -> skywave::Result<Vec<i16>> {
        calls += 1;
        assert!(frame.len() < 400, "call {}", calls);
        Ok(vec![3277; FRAME_SAMPLES])
    });

    let compressed = frame(1, vec![RadioTuning::new(251e6, Modulation::Am, 0)], vec![0xFC; 60]);
    let decoded = wire::decode(&wire::encode(&compressed).expect("encode")).expect("decode");
    let level = estimator.estimate(&decoded.audio);
    assert!((level - 0.1).abs() < 1e-3, "level {}", level);
}

#[test]
fn retransmitted_frames_keep_their_identity() {
    let original = frame(9, vec![RadioTuning::new(251e6, Modulation::Am, 2)], vec![1; 32]);
    let relayed = original.retransmitted().retransmitted();

    let decoded = wire::decode(&wire::encode(&relayed).expect("encode")).expect("decode");
    assert_eq!(decoded.retransmission_count, 2);
    assert_eq!(decoded.transmission_guid, original.transmission_guid);
    assert!(decoded.is_encrypted());
    assert_eq!(decoded.encoded_len(), original.encoded_len());
}
