//! Mixer settings and the rate-limited settings cache

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, trace};

/// Settings the mixer reads from the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    /// Wet/dry ratio in [0, 1].
    EffectRatio,
    /// Use a per-radio effect model instead of the default one.
    PerModelEffects,
    /// Hard-clip the blended output to [-1, 1].
    Clipping,
    /// Apply the capture effect to capture-class transmissions.
    CaptureInterference,
}

/// Key/value settings store owned by the host application.
///
/// Missing keys fall back to [`MixerSettings::default`].
pub trait SettingsSource: Send + Sync {
    fn float(&self, key: SettingKey) -> Option<f32>;
    fn flag(&self, key: SettingKey) -> Option<bool>;
}

/// Snapshot of everything the mixer needs per pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub effect_ratio: f32,
    pub per_model_effects: bool,
    pub clipping: bool,
    pub capture_interference: bool,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self { effect_ratio: 1.0, per_model_effects: true, clipping: true, capture_interference: true }
    }
}

impl MixerSettings {
    /// Read a snapshot from `source`, filling gaps with defaults and clamping the ratio.
    pub fn read_from(source: &dyn SettingsSource) -> Self {
        let defaults = Self::default();
        let ratio = source.float(SettingKey::EffectRatio).unwrap_or(defaults.effect_ratio);

        Self {
            effect_ratio: sanitize_ratio(ratio),
            per_model_effects: source
                .flag(SettingKey::PerModelEffects)
                .unwrap_or(defaults.per_model_effects),
            clipping: source.flag(SettingKey::Clipping).unwrap_or(defaults.clipping),
            capture_interference: source
                .flag(SettingKey::CaptureInterference)
                .unwrap_or(defaults.capture_interference),
        }
    }

    /// Copy with the ratio clamped into [0, 1].
    pub fn sanitized(mut self) -> Self {
        self.effect_ratio = sanitize_ratio(self.effect_ratio);
        self
    }
}

fn sanitize_ratio(ratio: f32) -> f32 {
    if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) }
}

impl SettingsSource for MixerSettings {
    fn float(&self, key: SettingKey) -> Option<f32> {
        match key {
            SettingKey::EffectRatio => Some(self.effect_ratio),
            _ => None,
        }
    }

    fn flag(&self, key: SettingKey) -> Option<bool> {
        match key {
            SettingKey::PerModelEffects => Some(self.per_model_effects),
            SettingKey::Clipping => Some(self.clipping),
            SettingKey::CaptureInterference => Some(self.capture_interference),
            SettingKey::EffectRatio => None,
        }
    }
}

/// Settings the host can change while the mixer is running.
#[derive(Debug, Default)]
pub struct LiveSettings {
    current: RwLock<MixerSettings>,
}

impl LiveSettings {
    pub fn new(initial: MixerSettings) -> Self {
        Self { current: RwLock::new(initial) }
    }

    /// Replace all values.
    pub fn store(&self, settings: MixerSettings) {
        *self.current.write() = settings;
    }

    /// Mutate values in place.
    pub fn update(&self, f: impl FnOnce(&mut MixerSettings)) {
        f(&mut self.current.write());
    }
}

impl SettingsSource for LiveSettings {
    fn float(&self, key: SettingKey) -> Option<f32> {
        self.current.read().float(key)
    }

    fn flag(&self, key: SettingKey) -> Option<bool> {
        self.current.read().flag(key)
    }
}

/// Re-reads a [`SettingsSource`] at most once per interval.
pub struct SettingsCache {
    source: Arc<dyn SettingsSource>,
    refresh_interval: Duration,
    cached: Mutex<Option<(MixerSettings, Instant)>>,
}

impl SettingsCache {
    pub fn new(source: Arc<dyn SettingsSource>, refresh_interval: Duration) -> Self {
        Self { source, refresh_interval, cached: Mutex::new(None) }
    }

    /// Current snapshot, refreshed from the source if the cached one is too old.
    pub fn current(&self) -> MixerSettings {
        let mut cached = self.cached.lock();
        let now = Instant::now();

        if let Some((settings, fetched_at)) = *cached {
            if now.duration_since(fetched_at) < self.refresh_interval {
                trace!("Using cached mixer settings");
                return settings;
            }
        }

        let settings = MixerSettings::read_from(self.source.as_ref());
        debug!(
            ratio = settings.effect_ratio,
            per_model = settings.per_model_effects,
            clipping = settings.clipping,
            capture = settings.capture_interference,
            "Refreshed mixer settings"
        );
        *cached = Some((settings, now));
        settings
    }

    /// Force the next [`current`](Self::current) call to hit the source.
    pub fn invalidate(&self) {
        *self.cached.lock() = None;
    }
}
