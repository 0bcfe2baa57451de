//! Voice frame wire format.
//!
//! [`encode`] and [`decode`] are pure transforms over the bit-exact layout documented
//! in [`format`]; [`VoiceFrameCodec`] adapts them to `tokio_util::codec` for byte streams.

pub mod codec;
pub mod format;

pub use codec::VoiceFrameCodec;
pub use format::{MIN_FRAME_LEN, decode, encode, encode_into, encoded_len};
