//! Voice frame types

use super::{Guid, Modulation};

/// One (frequency, modulation, encryption) triple a frame is transmitted on.
///
/// `modulation` is the raw wire byte; use [`RadioTuning::modulation`] for the
/// coerced enum value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioTuning {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Raw modulation byte.
    pub modulation: u8,
    /// Encryption key id, 0 when clear.
    pub encryption: u8,
}

impl RadioTuning {
    pub fn new(frequency: f64, modulation: Modulation, encryption: u8) -> Self {
        Self { frequency, modulation: modulation.as_wire(), encryption }
    }

    /// Modulation with unknown bytes coerced to `Disabled`.
    pub fn modulation(&self) -> Modulation {
        Modulation::from_wire(self.modulation)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption != 0
    }
}

/// One transmitted unit of audio plus its routing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceFrame {
    /// Compressed short-frame codec unit or raw little-endian 16-bit PCM.
    pub audio: Vec<u8>,
    /// Frequencies the audio is transmitted on. Never empty for a well-formed sender.
    pub tunings: Vec<RadioTuning>,
    /// Source unit id.
    pub unit_id: u32,
    /// Monotonically increasing sequence number.
    pub packet_number: u64,
    /// Number of relay hops so far.
    pub retransmission_count: u8,
    /// Identifier of this transmission instance.
    pub transmission_guid: Guid,
    /// Identifier of the originating client.
    pub client_guid: Guid,
}

impl VoiceFrame {
    /// Copy of this frame with the hop count bumped by one.
    pub fn retransmitted(&self) -> Self {
        let mut frame = self.clone();
        frame.retransmission_count = frame.retransmission_count.saturating_add(1);
        frame
    }

    /// Whether any tuning carries an encryption key.
    pub fn is_encrypted(&self) -> bool {
        self.tunings.iter().any(RadioTuning::is_encrypted)
    }

    /// Size of this frame once encoded.
    pub fn encoded_len(&self) -> usize {
        crate::wire::encoded_len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    #[test]
    fn retransmission_saturates() {
        let mut frame = test_utils::reference_frame();
        frame.retransmission_count = u8::MAX;
        assert_eq!(frame.retransmitted().retransmission_count, u8::MAX);

        frame.retransmission_count = 4;
        assert_eq!(frame.retransmitted().retransmission_count, 5);
    }

    #[test]
    fn tuning_coerces_unknown_modulation() {
        let tuning = RadioTuning { frequency: 251e6, modulation: 99, encryption: 0 };
        assert_eq!(tuning.modulation(), Modulation::Disabled);
        assert!(!tuning.is_encrypted());
    }
}
