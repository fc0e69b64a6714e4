//! Vehicle property store abstraction.
//!
//! The ingestion pipeline hands fully-typed updates to a store through the
//! `PropertyStore` trait; persistence, change notification, and subscriber
//! fan-out live behind that boundary and are not this crate's concern.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::value::{PropertyConfig, PropertyUpdate};

/// Errors a store can return when rejecting an update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The update's value kind does not match the registered config.
    #[error("property {property_id}: expected {expected} value, got {got}")]
    KindMismatch {
        property_id: i32,
        expected: crate::value::ValueKind,
        got: crate::value::ValueKind,
    },

    /// The store rejected the update for an implementation-specific reason.
    #[error("store rejected update: {0}")]
    Rejected(String),
}

/// Trait for vehicle property storage implementations.
///
/// Methods take `&self`; implementations use interior mutability so the
/// ingestion pipeline can call them synchronously from the read loop.
pub trait PropertyStore: Send + Sync {
    /// Apply an update, replacing any previous value for the same
    /// (property, area) pair.
    fn set_property(&self, update: PropertyUpdate) -> Result<(), StoreError>;

    /// Get the latest value for a (property, area) pair.
    fn get_property(&self, property_id: i32, area_id: i32) -> Option<PropertyUpdate>;

    /// Get the registered config for a property, if any.
    fn get_config(&self, property_id: i32) -> Option<PropertyConfig>;
}

/// In-memory property store implementation.
///
/// Keeps the latest update per (property, area) pair. Properties with a
/// registered config reject kind-mismatched updates; unregistered
/// properties accept anything.
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    inner: RwLock<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    values: HashMap<(i32, i32), PropertyUpdate>,
    configs: HashMap<i32, PropertyConfig>,
}

impl MemoryPropertyStore {
    /// Create an empty store with no registered configs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a property config; later updates must match its kind.
    pub fn register_config(&self, config: PropertyConfig) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.configs.insert(config.property_id, config);
    }

    /// Number of (property, area) pairs holding a value.
    pub fn property_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").values.len()
    }

    /// Snapshot of all stored updates, for diagnostics.
    pub fn all_properties(&self) -> Vec<PropertyUpdate> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .values
            .values()
            .cloned()
            .collect()
    }
}

impl PropertyStore for MemoryPropertyStore {
    fn set_property(&self, update: PropertyUpdate) -> Result<(), StoreError> {
        let mut inner = self.inner.write().expect("store lock poisoned");

        if let Some(config) = inner.configs.get(&update.property_id) {
            let got = update.value.kind();
            if got != config.kind {
                return Err(StoreError::KindMismatch {
                    property_id: update.property_id,
                    expected: config.kind,
                    got,
                });
            }
        }

        inner
            .values
            .insert((update.property_id, update.area_id), update);
        Ok(())
    }

    fn get_property(&self, property_id: i32, area_id: i32) -> Option<PropertyUpdate> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .values
            .get(&(property_id, area_id))
            .cloned()
    }

    fn get_config(&self, property_id: i32) -> Option<PropertyConfig> {
        self.inner
            .read()
            .expect("store lock poisoned")
            .configs
            .get(&property_id)
            .cloned()
    }
}
