//! Crate configuration
//!
//! All sections are optional; missing keys take their defaults. Durations are
//! written in milliseconds under `*_ms` keys:
//!
//! ```yaml
//! mixer:
//!   effect_ratio: 0.8
//!   clipping: false
//! playback:
//!   stop_timeout_ms: 5000
//!   progress_interval_ms: 100
//! seek:
//!   stale_after_ms: 2000
//!   hysteresis_packets: 5
//! models:
//!   capacity: 16
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mixing::{BuiltinModels, MixerSettings, MixingEngine, cache::DEFAULT_CAPACITY};
use crate::playback::{PlaybackConfig, SeekConfig};
use crate::{RadioError, Result};

/// Effect model cache sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCacheConfig {
    /// Maximum number of instantiated models kept alive.
    pub capacity: usize,
}

impl Default for ModelCacheConfig {
    fn default() -> Self {
        Self { capacity: DEFAULT_CAPACITY }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkywaveConfig {
    pub mixer: MixerSettings,
    pub playback: PlaybackConfig,
    pub seek: SeekConfig,
    pub models: ModelCacheConfig,
}

impl SkywaveConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| RadioError::config(format!("invalid YAML: {}", e)))?;
        config.validated()
    }

    /// Read, parse and validate a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Serialize back to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml_ng::to_string(self).map_err(|e| RadioError::config(e.to_string()))
    }

    /// Clamp the effect ratio and reject values nothing can run with.
    pub fn validated(mut self) -> Result<Self> {
        self.mixer = self.mixer.sanitized();

        if self.playback.event_capacity == 0 {
            return Err(RadioError::config("playback.event_capacity must be at least 1"));
        }
        if self.models.capacity == 0 {
            return Err(RadioError::config("models.capacity must be at least 1"));
        }
        if self.seek.hysteresis_packets == 0 {
            return Err(RadioError::config("seek.hysteresis_packets must be at least 1"));
        }
        Ok(self)
    }

    /// Mixer with the built-in models, reading the static `mixer` section.
    pub fn mixing_engine(&self) -> MixingEngine {
        MixingEngine::with_loader(
            Arc::new(self.mixer.sanitized()),
            Box::new(BuiltinModels),
            self.models.capacity,
        )
    }
}

/// Serde adapter for `Duration` fields stored as whole milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
