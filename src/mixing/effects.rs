//! Radio effect models
//!
//! A model turns the dry mix into the "wet" radio sound. Built-in models are a
//! high-pass and a low-pass biquad in series followed by soft saturation, with
//! band edges per radio set.

use std::f32::consts::PI;

use tracing::debug;

use crate::amplitude::SAMPLE_RATE;

/// Name of the model used when per-model effects are off or no name is given.
pub const DEFAULT_MODEL: &str = "intercom";

/// Per-model effect transform.
pub trait RadioEffect: Send {
    /// Transform `samples` in place from dry to wet.
    fn process(&mut self, samples: &mut [f32]);

    /// Clear any filter state.
    fn reset(&mut self) {}
}

/// Looks up effect models by name.
pub trait ModelLoader: Send + Sync {
    /// Instantiate the model called `name`, or `None` if it does not exist.
    fn load(&self, name: &str) -> Option<Box<dyn RadioEffect>>;
}

/// Model that leaves the signal untouched; fallback for unknown names.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl RadioEffect for Passthrough {
    fn process(&mut self, _samples: &mut [f32]) {}
}

/// Second-order IIR section (RBJ cookbook), transposed direct form II.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn low_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let (cos, alpha) = Self::prewarp(sample_rate, cutoff, q);
        Self::normalized((1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0, cos, alpha)
    }

    pub fn high_pass(sample_rate: f32, cutoff: f32, q: f32) -> Self {
        let (cos, alpha) = Self::prewarp(sample_rate, cutoff, q);
        Self::normalized((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0, cos, alpha)
    }

    fn prewarp(sample_rate: f32, cutoff: f32, q: f32) -> (f32, f32) {
        let cutoff = cutoff.clamp(1.0, sample_rate * 0.49);
        let w0 = 2.0 * PI * cutoff / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * q))
    }

    fn normalized(b0: f32, b1: f32, b2: f32, cos: f32, alpha: f32) -> Self {
        let a0 = 1.0 + alpha;
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: -2.0 * cos / a0,
            a2: (1.0 - alpha) / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    #[inline]
    pub fn tick(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

/// Band edges and colouring for one radio set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadioProfile {
    pub high_pass_hz: f32,
    pub low_pass_hz: f32,
    /// Saturation amount; 0 disables it.
    pub drive: f32,
    pub gain: f32,
}

/// Band-limited, saturated radio voice.
#[derive(Debug, Clone)]
pub struct BandPassRadio {
    profile: RadioProfile,
    high_pass: Biquad,
    low_pass: Biquad,
}

impl BandPassRadio {
    const Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

    pub fn new(profile: RadioProfile) -> Self {
        let rate = SAMPLE_RATE as f32;
        Self {
            profile,
            high_pass: Biquad::high_pass(rate, profile.high_pass_hz, Self::Q),
            low_pass: Biquad::low_pass(rate, profile.low_pass_hz, Self::Q),
        }
    }

    pub fn profile(&self) -> RadioProfile {
        self.profile
    }
}

impl RadioEffect for BandPassRadio {
    fn process(&mut self, samples: &mut [f32]) {
        let RadioProfile { drive, gain, .. } = self.profile;
        let norm = if drive > 0.0 { drive.tanh() } else { 1.0 };

        for sample in samples.iter_mut() {
            let mut x = self.low_pass.tick(self.high_pass.tick(*sample));
            if drive > 0.0 {
                x = (x * drive).tanh() / norm;
            }
            *sample = x * gain;
        }
    }

    fn reset(&mut self) {
        self.high_pass.reset();
        self.low_pass.reset();
    }
}

/// The radio sets that ship with the crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinModels;

impl BuiltinModels {
    /// Names understood by [`BuiltinModels::load`].
    pub const NAMES: [&'static str; 6] = ["intercom", "arc210", "arc164", "arc186", "r863", "generic-fm"];

    /// Profile for a built-in model; names are case-insensitive.
    pub fn profile(name: &str) -> Option<RadioProfile> {
        let profile = |high_pass_hz, low_pass_hz, drive| RadioProfile {
            high_pass_hz,
            low_pass_hz,
            drive,
            gain: 1.0,
        };

        match name.to_ascii_lowercase().as_str() {
            "intercom" => Some(profile(100.0, 7000.0, 0.0)),
            "arc210" => Some(profile(300.0, 4500.0, 1.5)),
            "arc164" => Some(profile(400.0, 3500.0, 2.0)),
            "arc186" => Some(profile(350.0, 3800.0, 1.8)),
            "r863" => Some(profile(250.0, 3200.0, 2.5)),
            "generic-fm" => Some(profile(200.0, 5000.0, 1.0)),
            _ => None,
        }
    }
}

impl ModelLoader for BuiltinModels {
    fn load(&self, name: &str) -> Option<Box<dyn RadioEffect>> {
        let profile = Self::profile(name)?;
        debug!("Instantiating radio model '{}' ({:?})", name, profile);
        Some(Box::new(BandPassRadio::new(profile)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn passthrough_leaves_signal_alone() {
        let mut samples = test_utils::sine_f32(0.5, 480, 4.0);
        let original = samples.clone();
        Passthrough.process(&mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn band_pass_rejects_dc() {
        let mut radio = BandPassRadio::new(BuiltinModels::profile("arc210").expect("builtin"));
        let mut samples = vec![0.5f32; 9600];
        radio.process(&mut samples);
        assert!(samples[9599].abs() < 0.01, "dc leaked: {}", samples[9599]);
    }

    #[test]
    fn band_pass_keeps_speech_band() {
        let mut radio = BandPassRadio::new(BuiltinModels::profile("intercom").expect("builtin"));
        // 1 kHz at 48 kHz: 48 samples per cycle
        let mut samples = test_utils::sine_f32(0.3, 4800, 100.0);
        let input_rms = rms(&samples[2400..]);
        radio.process(&mut samples);
        let output_rms = rms(&samples[2400..]);
        assert!(output_rms > input_rms * 0.8, "in {} out {}", input_rms, output_rms);
    }

    #[test]
    fn silence_stays_silent() {
        for name in BuiltinModels::NAMES {
            let mut model = BuiltinModels.load(name).expect("builtin model");
            let mut samples = vec![0.0f32; 960];
            model.process(&mut samples);
            assert!(samples.iter().all(|s| *s == 0.0), "{} produced noise", name);
        }
    }

    #[test]
    fn unknown_model_is_not_loaded() {
        assert!(BuiltinModels.load("does-not-exist").is_none());
        assert!(BuiltinModels.load("ARC210").is_some());
    }
}
