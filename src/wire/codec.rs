//! tokio-util codec for streams of voice frames
//!
//! Frames are self-delimiting through their leading `total_length`, so a stream of
//! them can be split without any extra framing.
//!
//! ```rust,no_run
//! use tokio_util::codec::FramedRead;
//! use skywave::wire::VoiceFrameCodec;
//!
//! # fn run<R: tokio::io::AsyncRead>(stream: R) {
//! let frames = FramedRead::new(stream, VoiceFrameCodec::new());
//! # }
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use super::format::{self, HEADER_LEN, MIN_FRAME_LEN};
use crate::RadioError;
use crate::types::VoiceFrame;

/// Largest frame the wire format can describe.
pub const DEFAULT_MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Length-prefixed voice frame codec.
#[derive(Debug, Clone)]
pub struct VoiceFrameCodec {
    max_frame_len: usize,
}

impl VoiceFrameCodec {
    pub fn new() -> Self {
        Self { max_frame_len: DEFAULT_MAX_FRAME_LEN }
    }

    /// Codec that rejects frames declaring more than `max_frame_len` bytes.
    pub fn with_max_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for VoiceFrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for VoiceFrameCodec {
    type Item = VoiceFrame;
    type Error = RadioError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(declared) = format::declared_len(&src[..]) else {
            return Ok(None);
        };

        if declared < MIN_FRAME_LEN || declared > self.max_frame_len {
            return Err(RadioError::format(
                "frame stream",
                format!(
                    "declared length {} outside [{}, {}]",
                    declared, MIN_FRAME_LEN, self.max_frame_len
                ),
            ));
        }

        if src.len() < declared {
            src.reserve(declared - src.len());
            return Ok(None);
        }

        let frame = format::decode(&src[..declared])?;
        src.advance(declared);
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                debug!("Discarding {} trailing bytes at end of stream", src.len());
                Err(RadioError::format(
                    "frame stream",
                    format!(
                        "stream ended inside a frame ({} bytes buffered, header is {})",
                        src.len(),
                        HEADER_LEN
                    ),
                ))
            }
        }
    }
}

impl Encoder<&VoiceFrame> for VoiceFrameCodec {
    type Error = RadioError;

    fn encode(&mut self, frame: &VoiceFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let len = format::encoded_len(frame);
        if len > self.max_frame_len {
            return Err(RadioError::format(
                "frame stream",
                format!("frame of {} bytes exceeds limit {}", len, self.max_frame_len),
            ));
        }
        dst.reserve(len);
        format::encode_into(frame, dst)
    }
}

impl Encoder<VoiceFrame> for VoiceFrameCodec {
    type Error = RadioError;

    fn encode(&mut self, frame: VoiceFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&VoiceFrame>>::encode(self, &frame, dst)
    }
}
