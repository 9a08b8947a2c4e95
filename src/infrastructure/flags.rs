//! Session-scoped feature flags.
//!
//! Contributors read their enablement from here; the container watches the
//! change counter and reconciles the tree when a flag flips.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::debug;

struct FlagStore {
    values: RwLock<BTreeMap<String, bool>>,
    generation: watch::Sender<u64>,
}

/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct FeatureFlags {
    store: Arc<FlagStore>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::from_map(BTreeMap::new())
    }

    pub fn from_map(values: BTreeMap<String, bool>) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            store: Arc::new(FlagStore {
                values: RwLock::new(values),
                generation,
            }),
        }
    }

    /// A flag that was never set reads as false.
    pub fn get(&self, name: &str) -> bool {
        self.store.values.read().get(name).copied().unwrap_or(false)
    }

    /// Sets a flag. Subscribers are notified only if the value changed;
    /// returns whether it did.
    pub fn set(&self, name: &str, value: bool) -> bool {
        let changed = {
            let mut values = self.store.values.write();
            values.insert(name.to_string(), value) != Some(value)
        };
        if changed {
            debug!("feature flag {} = {}", name, value);
            self.store.generation.send_modify(|g| *g += 1);
        }
        changed
    }

    /// Receiver of the change counter, bumped on every effective `set`.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.store.generation.subscribe()
    }

    pub fn flag(&self, name: impl Into<String>) -> FlagHandle {
        FlagHandle {
            flags: self.clone(),
            name: name.into(),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, bool> {
        self.store.values.read().clone()
    }
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeatureFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.snapshot()).finish()
    }
}

/// One named flag, for a contributor's `is_enabled`.
#[derive(Debug, Clone)]
pub struct FlagHandle {
    flags: FeatureFlags,
    name: String,
}

impl FlagHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.flags.get(&self.name)
    }
}
