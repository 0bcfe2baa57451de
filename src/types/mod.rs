//! Core value types for voice transport.
//!
//! - [`VoiceFrame`] is one transmitted unit of audio with its routing metadata
//! - [`RadioTuning`] is a (frequency, modulation, encryption) triple
//! - [`Guid`] is the fixed 22-byte identifier used for transmissions and clients
//! - [`Modulation`] maps raw modulation bytes, coercing unknown values
//! - [`TransmissionSegment`] is a decoded chunk of samples handed to the mixer
//!
//! Frames and segments are plain values: produced and consumed per call, never
//! shared mutably between threads.

mod frame;
mod guid;
mod modulation;
mod segment;

pub use frame::{RadioTuning, VoiceFrame};
pub use guid::{GUID_LEN, Guid};
pub use modulation::Modulation;
pub use segment::TransmissionSegment;
