//! Fixed-width transmission and client identifiers

use std::fmt;
use std::str::FromStr;

use crate::RadioError;

/// Width in bytes of a wire GUID.
pub const GUID_LEN: usize = 22;

/// A 22-byte ASCII identifier (URL-safe base64 of a 128-bit UUID without padding).
///
/// Identifiers built from strings are checked for length and ASCII content.
/// Identifiers read off the wire are passed through unchecked.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid([u8; GUID_LEN]);

impl Guid {
    /// Wrap raw wire bytes without validation.
    pub const fn from_wire(bytes: [u8; GUID_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw bytes as written on the wire.
    pub const fn as_bytes(&self) -> &[u8; GUID_LEN] {
        &self.0
    }

    /// Whether every byte is printable ASCII.
    pub fn is_ascii(&self) -> bool {
        self.0.iter().all(|b| b.is_ascii_graphic())
    }
}

impl FromStr for Guid {
    type Err = RadioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != GUID_LEN {
            return Err(RadioError::format(
                "GUID",
                format!("expected {} bytes, got {}", GUID_LEN, bytes.len()),
            ));
        }
        if !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return Err(RadioError::format("GUID", format!("'{}' is not printable ASCII", s)));
        }

        let mut raw = [0u8; GUID_LEN];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}
