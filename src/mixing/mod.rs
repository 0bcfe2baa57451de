//! Mixing of concurrent transmissions with radio effects.
//!
//! [`MixingEngine`] combines decoded [`TransmissionSegment`](crate::types::TransmissionSegment)s,
//! applies the capture effect to capture-class signals and blends the radio-processed
//! ("wet") signal with the original ("dry") one. Settings come from a host-owned
//! [`SettingsSource`] and effect models from a [`ModelLoader`], cached by name in a
//! bounded [`ModelCache`].

pub mod cache;
pub mod effects;
pub mod engine;
pub mod settings;

pub use cache::{ModelCache, SharedEffect};
pub use effects::{
    BandPassRadio, Biquad, BuiltinModels, DEFAULT_MODEL, ModelLoader, Passthrough, RadioEffect,
    RadioProfile,
};
pub use engine::{MixingEngine, SETTINGS_REFRESH_INTERVAL, accumulate};
pub use settings::{LiveSettings, MixerSettings, SettingKey, SettingsCache, SettingsSource};
