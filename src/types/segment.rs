//! Decoded transmission segments fed to the mixer

use super::Modulation;

/// A decoded, time-aligned chunk of samples ready for mixing.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionSegment {
    /// Normalized samples in [-1, 1].
    pub samples: Vec<f32>,
    pub modulation: Modulation,
    /// Received signal power; only compared between segments, the unit is up to the caller.
    pub received_power: f64,
    /// Skip radio effects (and therefore capture-effect handling) for this segment.
    pub bypass_effects: bool,
}

impl TransmissionSegment {
    pub fn new(samples: Vec<f32>, modulation: Modulation, received_power: f64) -> Self {
        Self { samples, modulation, received_power, bypass_effects: false }
    }

    /// Builder-style toggle for the effects bypass flag.
    pub fn with_bypass_effects(mut self, bypass: bool) -> Self {
        self.bypass_effects = bypass;
        self
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
