//! Radio modulation classes carried on the wire

use serde::{Deserialize, Serialize};

/// Modulation of a transmission.
///
/// The wire carries this as a raw byte. Unknown bytes are coerced to
/// [`Modulation::Disabled`] by [`Modulation::from_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Modulation {
    Am = 0,
    Fm = 1,
    Intercom = 2,
    Disabled = 3,
    HaveQuick = 4,
    Satcom = 5,
    Mids = 6,
    Sincgars = 7,
}

impl Modulation {
    /// All known modulations in wire order.
    pub const ALL: [Modulation; 8] = [
        Modulation::Am,
        Modulation::Fm,
        Modulation::Intercom,
        Modulation::Disabled,
        Modulation::HaveQuick,
        Modulation::Satcom,
        Modulation::Mids,
        Modulation::Sincgars,
    ];

    /// Map a raw wire byte to a modulation, coercing unknown values to `Disabled`.
    pub const fn from_wire(raw: u8) -> Self {
        match raw {
            0 => Modulation::Am,
            1 => Modulation::Fm,
            2 => Modulation::Intercom,
            4 => Modulation::HaveQuick,
            5 => Modulation::Satcom,
            6 => Modulation::Mids,
            7 => Modulation::Sincgars,
            _ => Modulation::Disabled,
        }
    }

    /// Raw wire byte.
    pub const fn as_wire(self) -> u8 {
        self as u8
    }

    /// Whether concurrent signals of this class obey the capture effect
    /// (strongest wins instead of summing).
    pub const fn is_capture_class(self) -> bool {
        matches!(self, Modulation::Fm)
    }
}

impl TryFrom<u8> for Modulation {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match Modulation::from_wire(raw) {
            Modulation::Disabled if raw != Modulation::Disabled as u8 => Err(raw),
            modulation => Ok(modulation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_bytes_round_trip_for_known_values() {
        for modulation in Modulation::ALL {
            assert_eq!(Modulation::from_wire(modulation.as_wire()), modulation);
            assert_eq!(Modulation::try_from(modulation.as_wire()), Ok(modulation));
        }
    }

    #[test]
    fn unknown_bytes_coerce_to_disabled() {
        for raw in [8u8, 42, 200, 255] {
            assert_eq!(Modulation::from_wire(raw), Modulation::Disabled);
            assert_eq!(Modulation::try_from(raw), Err(raw));
        }
    }

    #[test]
    fn only_fm_is_capture_class() {
        let capture: Vec<_> = Modulation::ALL.into_iter().filter(|m| m.is_capture_class()).collect();
        assert_eq!(capture, vec![Modulation::Fm]);
    }
}
