//! Real-time mixing of concurrent transmissions
//!
//! One mix pass:
//!
//! 1. refresh cached settings (rate limited)
//! 2. sum every segment that does not take part in the capture effect
//! 3. among capture candidates keep only the strongest and add it last
//! 4. run the dry sum through the resolved radio model to get the wet signal
//! 5. blend `dry * (1 - ratio) + wet * ratio`, optionally hard-clipped
//!
//! A capture candidate is a capture-class segment (FM) with effects enabled while
//! capture interference is switched on. All other segments always sum.

use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use super::cache::{DEFAULT_CAPACITY, ModelCache};
use super::effects::{BuiltinModels, DEFAULT_MODEL, ModelLoader};
use super::settings::{MixerSettings, SettingsCache, SettingsSource};
use crate::types::TransmissionSegment;

/// Minimum time between settings lookups.
pub const SETTINGS_REFRESH_INTERVAL: Duration = Duration::from_secs(3);

/// Samples per accumulation batch.
const LANES: usize = 8;

/// Mixer for decoded transmission segments.
pub struct MixingEngine {
    settings: SettingsCache,
    models: ModelCache,
}

impl MixingEngine {
    /// Engine with the built-in radio models and default cache size.
    pub fn new(settings: Arc<dyn SettingsSource>) -> Self {
        Self::with_loader(settings, Box::new(BuiltinModels), DEFAULT_CAPACITY)
    }

    /// Engine with a custom model loader.
    pub fn with_loader(
        settings: Arc<dyn SettingsSource>,
        loader: Box<dyn ModelLoader>,
        model_capacity: usize,
    ) -> Self {
        Self {
            settings: SettingsCache::new(settings, SETTINGS_REFRESH_INTERVAL),
            models: ModelCache::new(loader, model_capacity),
        }
    }

    /// Mix `segments` into `output[offset..offset + count]`.
    ///
    /// `count` is cut down to what fits in `output`. Returns the number of
    /// samples written.
    pub fn mix(
        &self,
        output: &mut [f32],
        offset: usize,
        count: usize,
        segments: &[TransmissionSegment],
        model_name: Option<&str>,
    ) -> usize {
        let count = count.min(output.len().saturating_sub(offset));
        if count == 0 {
            return 0;
        }

        let settings = self.settings.current();
        let mut dry = vec![0.0f32; count];
        let mut strongest: Option<&TransmissionSegment> = None;

        for segment in segments {
            if is_capture_candidate(segment, &settings) {
                if strongest.is_none_or(|s| segment.received_power > s.received_power) {
                    strongest = Some(segment);
                }
            } else {
                accumulate(&mut dry, &segment.samples);
            }
        }

        if let Some(segment) = strongest {
            trace!("Capture effect kept segment with power {}", segment.received_power);
            accumulate(&mut dry, &segment.samples);
        }

        let name = match model_name {
            Some(name) if settings.per_model_effects => name,
            _ => DEFAULT_MODEL,
        };
        let mut wet = dry.clone();
        self.models.resolve(name).lock().process(&mut wet);

        let ratio = settings.effect_ratio;
        let clip = settings.clipping && ratio > 0.0;
        let target = &mut output[offset..offset + count];

        for ((out, d), w) in target.iter_mut().zip(&dry).zip(&wet) {
            let blended = d * (1.0 - ratio) + w * ratio;
            *out = if clip { blended.clamp(-1.0, 1.0) } else { blended };
        }

        count
    }

    /// Settings snapshot the next pass will use.
    pub fn settings(&self) -> MixerSettings {
        self.settings.current()
    }

    /// The model cache, for inspection.
    pub fn models(&self) -> &ModelCache {
        &self.models
    }
}

fn is_capture_candidate(segment: &TransmissionSegment, settings: &MixerSettings) -> bool {
    settings.capture_interference && segment.modulation.is_capture_class() && !segment.bypass_effects
}

/// `acc[i] += src[i]` over the common length, in fixed-width batches with a scalar tail.
pub fn accumulate(acc: &mut [f32], src: &[f32]) {
    let n = acc.len().min(src.len());
    let (acc, src) = (&mut acc[..n], &src[..n]);

    let mut acc_batches = acc.chunks_exact_mut(LANES);
    let mut src_batches = src.chunks_exact(LANES);
    for (a, s) in (&mut acc_batches).zip(&mut src_batches) {
        for lane in 0..LANES {
            a[lane] += s[lane];
        }
    }

    for (a, s) in acc_batches.into_remainder().iter_mut().zip(src_batches.remainder()) {
        *a += *s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixing::LiveSettings;
    use crate::test_utils;
    use crate::types::Modulation;

    fn dry_only_engine(capture_interference: bool) -> MixingEngine {
        let settings = MixerSettings {
            effect_ratio: 0.0,
            per_model_effects: true,
            clipping: true,
            capture_interference,
        };
        MixingEngine::new(Arc::new(settings))
    }

    fn constant(value: f32, len: usize, modulation: Modulation, power: f64) -> TransmissionSegment {
        TransmissionSegment::new(vec![value; len], modulation, power)
    }

    #[test]
    fn non_capture_segments_sum() {
        let engine = dry_only_engine(true);
        let a = TransmissionSegment::new(test_utils::sine_f32(0.3, 963, 3.0), Modulation::Am, 1.0);
        let b = TransmissionSegment::new(test_utils::sine_f32(0.2, 963, 7.0), Modulation::Am, 2.0);

        let mut output = vec![0.0f32; 963];
        let written = engine.mix(&mut output, 0, 963, &[a.clone(), b.clone()], Some("arc210"));

        assert_eq!(written, 963);
        for i in 0..963 {
            let expected = a.samples[i] + b.samples[i];
            assert!((output[i] - expected).abs() < 1e-6, "sample {}", i);
        }
    }

    #[test]
    fn capture_effect_keeps_only_strongest() {
        let engine = dry_only_engine(true);
        let segments = [
            constant(0.1, 480, Modulation::Fm, 5.0),
            constant(0.2, 480, Modulation::Fm, 9.0),
            constant(0.3, 480, Modulation::Fm, 3.0),
        ];

        let mut output = vec![0.0f32; 480];
        engine.mix(&mut output, 0, 480, &segments, None);

        assert!(output.iter().all(|s| (s - 0.2).abs() < 1e-6), "got {}", output[0]);
    }

    #[test]
    fn capture_effect_off_sums_everything() {
        let engine = dry_only_engine(false);
        let segments = [
            constant(0.1, 64, Modulation::Fm, 5.0),
            constant(0.2, 64, Modulation::Fm, 9.0),
            constant(0.3, 64, Modulation::Fm, 3.0),
        ];

        let mut output = vec![0.0f32; 64];
        engine.mix(&mut output, 0, 64, &segments, None);
        assert!(output.iter().all(|s| (s - 0.6).abs() < 1e-6));
    }

    #[test]
    fn bypassed_and_non_capture_segments_always_sum() {
        let engine = dry_only_engine(true);
        let segments = [
            constant(0.1, 32, Modulation::Fm, 5.0),
            constant(0.2, 32, Modulation::Fm, 9.0),
            constant(0.05, 32, Modulation::Fm, 1.0).with_bypass_effects(true),
            constant(0.25, 32, Modulation::Am, 0.0),
        ];

        let mut output = vec![0.0f32; 32];
        engine.mix(&mut output, 0, 32, &segments, None);
        assert!(output.iter().all(|s| (s - 0.5).abs() < 1e-6), "got {}", output[0]);
    }

    #[test]
    fn writes_at_offset_and_truncates_count() {
        let engine = dry_only_engine(true);
        let mut output = vec![9.0f32; 20];
        let written = engine.mix(&mut output, 15, 10, &[constant(0.5, 10, Modulation::Am, 0.0)], None);

        assert_eq!(written, 5);
        assert!(output[..15].iter().all(|s| *s == 9.0));
        assert!(output[15..].iter().all(|s| *s == 0.5));

        assert_eq!(engine.mix(&mut output, 25, 10, &[], None), 0);
    }

    #[test]
    fn short_segments_leave_silence_after_their_end() {
        let engine = dry_only_engine(true);
        let mut output = vec![1.0f32; 16];
        engine.mix(&mut output, 0, 16, &[constant(0.5, 3, Modulation::Am, 0.0)], None);
        assert_eq!(&output[..3], &[0.5, 0.5, 0.5]);
        assert!(output[3..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn full_wet_signal_is_clipped() {
        let settings = MixerSettings {
            effect_ratio: 1.0,
            per_model_effects: false,
            clipping: true,
            capture_interference: true,
        };
        let engine = MixingEngine::new(Arc::new(settings));
        let loud = [constant(0.9, 960, Modulation::Am, 0.0), constant(0.9, 960, Modulation::Am, 0.0)];

        let mut output = vec![0.0f32; 960];
        engine.mix(&mut output, 0, 960, &loud, Some("r863"));
        assert!(output.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn dry_signal_is_not_clipped_when_ratio_is_zero() {
        let engine = dry_only_engine(true);
        let loud = [constant(0.9, 8, Modulation::Am, 0.0), constant(0.9, 8, Modulation::Am, 0.0)];

        let mut output = vec![0.0f32; 8];
        engine.mix(&mut output, 0, 8, &loud, None);
        assert!(output.iter().all(|s| (s - 1.8).abs() < 1e-6));
    }

    #[test]
    fn model_selection_follows_per_model_toggle() {
        let live = Arc::new(LiveSettings::new(MixerSettings::default()));
        let engine = MixingEngine::new(live.clone());
        let mut output = vec![0.0f32; 16];

        engine.mix(&mut output, 0, 16, &[], Some("arc164"));
        assert!(engine.models().contains("arc164"));

        let engine = MixingEngine::new(Arc::new(MixerSettings {
            per_model_effects: false,
            ..MixerSettings::default()
        }));
        engine.mix(&mut output, 0, 16, &[], Some("arc164"));
        assert!(!engine.models().contains("arc164"));
        assert!(engine.models().contains(DEFAULT_MODEL));
    }

    #[test]
    fn accumulate_handles_tails_and_mismatched_lengths() {
        for len in [0usize, 1, 7, 8, 9, 17, 64] {
            let mut acc = vec![1.0f32; len];
            let src: Vec<f32> = (0..len + 3).map(|i| i as f32).collect();
            accumulate(&mut acc, &src);
            for (i, value) in acc.iter().enumerate() {
                assert_eq!(*value, 1.0 + i as f32);
            }
        }
    }
}
