use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;

use super::model::PackDescriptor;

#[derive(Default)]
struct PackRegistryInner {
    packs: Vec<Arc<PackDescriptor>>,
    active: Option<usize>,
}

/// Accepted packs in registration order, plus the pack the user selected.
///
/// Registering a pack whose name is already present replaces it in place.
#[derive(Default)]
pub struct PackRegistry {
    inner: RwLock<PackRegistryInner>,
}

impl PackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pack: Arc<PackDescriptor>) {
        let mut inner = self.inner.write();
        if let Some(slot) = inner.packs.iter_mut().find(|p| p.name() == pack.name()) {
            info!("Replacing shader pack: {} v{}", pack.name(), pack.version());
            *slot = pack;
        } else {
            info!("Registered shader pack: {} v{}", pack.name(), pack.version());
            inner.packs.push(pack);
        }
    }

    /// Snapshot of all packs in registration order.
    #[must_use]
    pub fn packs(&self) -> Vec<Arc<PackDescriptor>> {
        self.inner.read().packs.clone()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<PackDescriptor>> {
        self.inner
            .read()
            .packs
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().packs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().packs.is_empty()
    }

    /// Selects the active pack by name, or clears the selection with `None`.
    /// Returns `false` (and leaves the selection unchanged) for unknown names.
    pub fn set_active(&self, name: Option<&str>) -> bool {
        let mut inner = self.inner.write();
        let Some(name) = name else {
            inner.active = None;
            return true;
        };

        match inner.packs.iter().position(|p| p.name() == name) {
            Some(index) => {
                inner.active = Some(index);
                info!("Active shader pack: {name}");
                true
            }
            None => {
                warn!("Cannot activate unknown shader pack: {name}");
                false
            }
        }
    }

    #[must_use]
    pub fn active(&self) -> Option<Arc<PackDescriptor>> {
        let inner = self.inner.read();
        inner.active.and_then(|i| inner.packs.get(i).cloned())
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.packs.clear();
        inner.active = None;
    }
}

impl std::fmt::Debug for PackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("PackRegistry")
            .field(
                "packs",
                &inner.packs.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("active", &inner.active)
            .finish()
    }
}
