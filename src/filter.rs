//! Frequency/modulation inclusion filter
//!
//! Shared by replay and live packet routing. An empty selection disables the
//! filter; otherwise a transmission passes only if its exact (frequency,
//! modulation) pair was selected. Raw modulation bytes are coerced with
//! [`Modulation::from_wire`] before comparison, so unknown bytes only match a
//! selected `Disabled` entry.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::types::{Modulation, VoiceFrame};

/// Exact-match key for a selected channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ChannelKey {
    frequency_bits: u64,
    modulation: Modulation,
}

impl ChannelKey {
    fn new(frequency: f64, modulation: Modulation) -> Self {
        // -0.0 == 0.0 for f64, keep that under bitwise hashing
        let frequency = if frequency == 0.0 { 0.0 } else { frequency };
        Self { frequency_bits: frequency.to_bits(), modulation }
    }
}

/// Thread-safe selection of (frequency, modulation) pairs.
///
/// Updates replace the whole set; readers see either the old or the new
/// selection, never a mix.
#[derive(Debug, Default)]
pub struct FrequencyFilter {
    selection: RwLock<Arc<HashSet<ChannelKey>>>,
}

impl FrequencyFilter {
    /// Filter that passes everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection.
    pub fn set_selection<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (f64, Modulation)>,
    {
        let selection: HashSet<_> =
            pairs.into_iter().map(|(frequency, modulation)| ChannelKey::new(frequency, modulation)).collect();
        debug!("Frequency filter set to {} channels", selection.len());
        *self.selection.write() = Arc::new(selection);
    }

    /// Drop the selection, disabling the filter.
    pub fn clear(&self) {
        debug!("Frequency filter cleared");
        *self.selection.write() = Arc::new(HashSet::new());
    }

    /// Whether a filter is active.
    pub fn is_active(&self) -> bool {
        !self.selection.read().is_empty()
    }

    /// Whether a transmission on `frequency` with raw modulation byte `raw_modulation` passes.
    pub fn should_include(&self, frequency: f64, raw_modulation: u8) -> bool {
        let selection = Arc::clone(&self.selection.read());
        if selection.is_empty() {
            return true;
        }
        selection.contains(&ChannelKey::new(frequency, Modulation::from_wire(raw_modulation)))
    }

    /// Whether any of the frame's tunings passes.
    pub fn admits(&self, frame: &VoiceFrame) -> bool {
        let selection = Arc::clone(&self.selection.read());
        if selection.is_empty() {
            return true;
        }
        frame.tunings.iter().any(|tuning| {
            selection.contains(&ChannelKey::new(tuning.frequency, tuning.modulation()))
        })
    }
}
