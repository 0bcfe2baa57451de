//! Voice frame binary layout
//!
//! All integers are little-endian:
//!
//! ```text
//! offset  size            field
//! 0       2               total_length (whole frame, including this field)
//! 2       2               audio_length
//! 4       2               freq_block_length (multiple of 10)
//! 6       audio_length    audio payload
//! ..      10 * n          { frequency: f64, modulation: u8, encryption: u8 } x n
//! ..      4               unit_id
//! ..      8               packet_number
//! ..      1               retransmission_count
//! ..      22              transmission_guid
//! ..      22              client_guid
//! ```
//!
//! Decoding only checks that the declared lengths fit in the buffer and that the
//! frequency block is a whole number of triples. Field values, including the
//! modulation byte, are passed through as-is.

use bytes::BufMut;
use tracing::trace;

use crate::types::{GUID_LEN, Guid, RadioTuning, VoiceFrame};
use crate::{RadioError, Result};

/// Size of the three length fields.
pub const HEADER_LEN: usize = 6;

/// Size of one (frequency, modulation, encryption) triple.
pub const TUNING_LEN: usize = 10;

/// Size of everything after the frequency block.
pub const TRAILER_LEN: usize = 4 + 8 + 1 + GUID_LEN + GUID_LEN;

/// Smallest possible frame: no audio, no frequencies.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + TRAILER_LEN;

/// Wire size of `frame`.
pub fn encoded_len(frame: &VoiceFrame) -> usize {
    HEADER_LEN + frame.audio.len() + frame.tunings.len() * TUNING_LEN + TRAILER_LEN
}

/// Encode a frame into a fresh buffer.
pub fn encode(frame: &VoiceFrame) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded_len(frame));
    encode_into(frame, &mut out)?;
    Ok(out)
}

/// Encode a frame, appending to `buf`.
///
/// Fails if any length field would not fit in 16 bits; nothing is written in that case.
pub fn encode_into<B: BufMut>(frame: &VoiceFrame, buf: &mut B) -> Result<()> {
    let total_length = length_field("total_length", encoded_len(frame))?;
    let audio_length = length_field("audio_length", frame.audio.len())?;
    let freq_length = length_field("freq_block_length", frame.tunings.len() * TUNING_LEN)?;

    buf.put_u16_le(total_length);
    buf.put_u16_le(audio_length);
    buf.put_u16_le(freq_length);
    buf.put_slice(&frame.audio);

    for tuning in &frame.tunings {
        buf.put_f64_le(tuning.frequency);
        buf.put_u8(tuning.modulation);
        buf.put_u8(tuning.encryption);
    }

    buf.put_u32_le(frame.unit_id);
    buf.put_u64_le(frame.packet_number);
    buf.put_u8(frame.retransmission_count);
    buf.put_slice(frame.transmission_guid.as_bytes());
    buf.put_slice(frame.client_guid.as_bytes());

    trace!(
        "Encoded frame #{} ({} bytes, {} tunings)",
        frame.packet_number,
        total_length,
        frame.tunings.len()
    );
    Ok(())
}

/// Peek the declared `total_length` of a frame at the start of `data`.
pub fn declared_len(data: &[u8]) -> Option<usize> {
    read_u16_le(data, 0).ok().map(usize::from)
}

/// Decode one frame from the start of `data`.
///
/// Bytes past the frame's declared end are ignored.
pub fn decode(data: &[u8]) -> Result<VoiceFrame> {
    if data.len() < HEADER_LEN {
        return Err(RadioError::format(
            "frame header",
            format!("need {} bytes, have {}", HEADER_LEN, data.len()),
        ));
    }

    let total_length = read_u16_le(data, 0)? as usize;
    let audio_length = read_u16_le(data, 2)? as usize;
    let freq_length = read_u16_le(data, 4)? as usize;

    if freq_length % TUNING_LEN != 0 {
        return Err(RadioError::format(
            "frequency block",
            format!("length {} is not a multiple of {}", freq_length, TUNING_LEN),
        ));
    }

    let required = HEADER_LEN + audio_length + freq_length + TRAILER_LEN;
    if data.len() < required || data.len() < total_length {
        return Err(RadioError::format(
            "frame body",
            format!(
                "buffer has {} bytes, declared lengths need {} (total_length={})",
                data.len(),
                required.max(total_length),
                total_length
            ),
        ));
    }

    let mut offset = HEADER_LEN;
    let audio = data[offset..offset + audio_length].to_vec();
    offset += audio_length;

    let tunings = data[offset..offset + freq_length]
        .chunks_exact(TUNING_LEN)
        .map(|chunk| {
            Ok(RadioTuning {
                frequency: read_f64_le(chunk, 0)?,
                modulation: chunk[8],
                encryption: chunk[9],
            })
        })
        .collect::<Result<Vec<_>>>()?;
    offset += freq_length;

    let unit_id = read_u32_le(data, offset)?;
    offset += 4;
    let packet_number = read_u64_le(data, offset)?;
    offset += 8;
    let retransmission_count = data[offset];
    offset += 1;
    let transmission_guid = read_guid(data, offset)?;
    offset += GUID_LEN;
    let client_guid = read_guid(data, offset)?;

    trace!("Decoded frame #{} ({} bytes, {} tunings)", packet_number, required, tunings.len());

    Ok(VoiceFrame {
        audio,
        tunings,
        unit_id,
        packet_number,
        retransmission_count,
        transmission_guid,
        client_guid,
    })
}

fn length_field(field: &str, value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| {
        RadioError::format("frame encoding", format!("{} {} exceeds {}", field, value, u16::MAX))
    })
}

/// Bounds-checked byte slice of fixed width
fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    data.get(offset..offset + N).and_then(|bytes| bytes.try_into().ok()).ok_or_else(|| {
        RadioError::format(
            "field parsing",
            format!(
                "need {} bytes at offset {}, have {}",
                N,
                offset,
                data.len().saturating_sub(offset)
            ),
        )
    })
}

fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    read_array(data, offset).map(u16::from_le_bytes)
}

fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    read_array(data, offset).map(u32::from_le_bytes)
}

fn read_u64_le(data: &[u8], offset: usize) -> Result<u64> {
    read_array(data, offset).map(u64::from_le_bytes)
}

fn read_f64_le(data: &[u8], offset: usize) -> Result<f64> {
    read_array(data, offset).map(f64::from_le_bytes)
}

fn read_guid(data: &[u8], offset: usize) -> Result<Guid> {
    read_array(data, offset).map(Guid::from_wire)
}
