//! Bounded cache of instantiated effect models
//!
//! Models keep filter state between mix passes, so each name maps to one shared
//! instance. Names can come from remote clients; the cache holds at most
//! `capacity` models and evicts the least recently used one when full.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::effects::{ModelLoader, Passthrough, RadioEffect};

/// An instantiated model shared between mix passes.
pub type SharedEffect = Arc<Mutex<Box<dyn RadioEffect>>>;

/// Default number of cached models.
pub const DEFAULT_CAPACITY: usize = 32;

struct CacheEntry {
    effect: SharedEffect,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    clock: u64,
}

/// Name to model cache with least-recently-used eviction.
pub struct ModelCache {
    loader: Box<dyn ModelLoader>,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl ModelCache {
    pub fn new(loader: Box<dyn ModelLoader>, capacity: usize) -> Self {
        Self { loader, capacity: capacity.max(1), state: Mutex::new(CacheState::default()) }
    }

    /// Model for `name`, instantiating it on first use.
    ///
    /// Names are case-insensitive. Names the loader does not know resolve to
    /// [`Passthrough`].
    pub fn resolve(&self, name: &str) -> SharedEffect {
        let key = name.to_ascii_lowercase();
        let mut state = self.state.lock();
        state.clock += 1;
        let now = state.clock;

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.last_used = now;
            return Arc::clone(&entry.effect);
        }

        let effect: Box<dyn RadioEffect> = match self.loader.load(&key) {
            Some(effect) => effect,
            None => {
                warn!("Radio model '{}' not found, using passthrough", name);
                Box::new(Passthrough)
            }
        };

        if state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(name, _)| name.clone());
            if let Some(oldest) = oldest {
                debug!("Evicting radio model '{}'", oldest);
                state.entries.remove(&oldest);
            }
        }

        let effect = Arc::new(Mutex::new(effect));
        state
            .entries
            .insert(key, CacheEntry { effect: Arc::clone(&effect), last_used: now });
        effect
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
