//! Keyed bus namespace.
//!
//! The [`BusRegistry`] plays the role of the system-wide queue namespace:
//! components open buses by integer key, either creating them or
//! attaching to one that must already exist. Only the orchestrator calls
//! [`BusRegistry::remove`].

use super::bus::{Bus, BusOptions};
use super::error::BusError;
use super::BusKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// How [`BusRegistry::open`] treats a key with no bus behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the bus if needed, otherwise attach. Idempotent.
    CreateOrAttach,
    /// Attach only; fail with [`BusError::NotFound`] if absent.
    Attach,
}

/// Shared, cloneable map from [`BusKey`] to [`Bus`].
///
/// # Example
///
/// ```
/// use modchat_runtime::bus::{BusKey, BusRegistry, OpenMode};
///
/// let registry = BusRegistry::default();
/// let key = BusKey::new(1234);
///
/// assert!(registry.open(key, OpenMode::Attach).is_err());
/// let a = registry.open(key, OpenMode::CreateOrAttach).unwrap();
/// let b = registry.open(key, OpenMode::Attach).unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Default)]
pub struct BusRegistry {
    buses: Arc<Mutex<HashMap<BusKey, Arc<Bus>>>>,
    options: BusOptions,
}

impl BusRegistry {
    /// Creates an empty registry whose new buses use `options`.
    #[must_use]
    pub fn new(options: BusOptions) -> Self {
        Self {
            buses: Arc::new(Mutex::new(HashMap::new())),
            options,
        }
    }

    /// Opens the bus for `key`.
    ///
    /// # Errors
    ///
    /// [`BusError::NotFound`] in [`OpenMode::Attach`] when no bus exists.
    pub fn open(&self, key: BusKey, mode: OpenMode) -> Result<Arc<Bus>, BusError> {
        let mut buses = self.buses.lock();

        if let Some(bus) = buses.get(&key) {
            return Ok(Arc::clone(bus));
        }

        match mode {
            OpenMode::Attach => Err(BusError::NotFound(key)),
            OpenMode::CreateOrAttach => {
                debug!(bus = %key, capacity = self.options.capacity, "Created bus");
                let bus = Arc::new(Bus::new(key, self.options));
                buses.insert(key, Arc::clone(&bus));
                Ok(bus)
            }
        }
    }

    /// Returns `true` if a bus is registered under `key`.
    #[must_use]
    pub fn contains(&self, key: BusKey) -> bool {
        self.buses.lock().contains_key(&key)
    }

    /// Tears down the bus for `key`.
    ///
    /// Existing handles stay valid but every later send fails with
    /// [`BusError::Removed`]. A later `CreateOrAttach` on the same key
    /// creates a fresh bus.
    ///
    /// # Errors
    ///
    /// [`BusError::NotFound`] if no bus is registered under `key`.
    pub fn remove(&self, key: BusKey) -> Result<(), BusError> {
        let bus = self
            .buses
            .lock()
            .remove(&key)
            .ok_or(BusError::NotFound(key))?;

        bus.remove();
        info!(bus = %key, pending = bus.len(), "Removed bus");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_event::{AdminEvent, TopicFilter};
    use modchat_types::GroupId;

    #[test]
    fn attach_requires_existing_bus() {
        let registry = BusRegistry::default();
        let err = registry.open(BusKey::new(5), OpenMode::Attach).unwrap_err();
        assert_eq!(err, BusError::NotFound(BusKey::new(5)));
    }

    #[test]
    fn create_is_idempotent() {
        let registry = BusRegistry::default();
        let a = registry
            .open(BusKey::new(5), OpenMode::CreateOrAttach)
            .unwrap();
        let b = registry
            .open(BusKey::new(5), OpenMode::CreateOrAttach)
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(registry.contains(BusKey::new(5)));
    }

    #[test]
    fn clones_share_the_namespace() {
        let registry = BusRegistry::default();
        let other = registry.clone();
        registry
            .open(BusKey::new(9), OpenMode::CreateOrAttach)
            .unwrap();
        assert!(other.open(BusKey::new(9), OpenMode::Attach).is_ok());
    }

    #[tokio::test]
    async fn remove_invalidates_existing_handles() {
        let registry = BusRegistry::default();
        let bus = registry
            .open(BusKey::new(3), OpenMode::CreateOrAttach)
            .unwrap();

        registry.remove(BusKey::new(3)).unwrap();

        assert!(!registry.contains(BusKey::new(3)));
        assert!(bus.is_removed());
        assert!(bus.send(AdminEvent::created(GroupId::new(0))).await.is_err());
        assert!(matches!(
            bus.try_receive(TopicFilter::Any),
            Err(BusError::Removed(_))
        ));
    }

    #[test]
    fn remove_unknown_key() {
        let registry = BusRegistry::default();
        assert_eq!(
            registry.remove(BusKey::new(1)),
            Err(BusError::NotFound(BusKey::new(1)))
        );
    }
}
