//! Ingestion coordinator.
//!
//! `VssBridge` gates initialization and shutdown of the telemetry
//! listener, owns the liveness flags and counters, and runs the
//! message-to-property pipeline: parse -> resolve mapping -> convert ->
//! emit to the store. Per-message failures are counted and logged; none
//! of them cross the pipeline boundary.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vss_core::{PropertyStore, PropertyUpdate, SignalMap};
use vss_protocol::{parse_signal, FrameError};

use crate::listener::{BindError, ListenerConfig, MessageSink, SignalListener};

/// Errors surfaced to the caller by [`VssBridge::initialize`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The listener could not bind its endpoint.
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Message counters, readable without the lifecycle lock.
///
/// Counters persist for the life of one bridge instance and reset only
/// on reconstruction.
#[derive(Debug, Default)]
pub struct IngestCounters {
    processed: AtomicU64,
    converted: AtomicU64,
    errors: AtomicU64,
}

impl IngestCounters {
    fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_converted(&self) {
        self.converted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Approximate snapshot for diagnostics.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            messages_processed: self.processed.load(Ordering::Relaxed),
            messages_converted: self.converted.load(Ordering::Relaxed),
            conversion_errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the ingest counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    #[serde(rename = "messagesProcessed")]
    pub messages_processed: u64,
    #[serde(rename = "messagesConverted")]
    pub messages_converted: u64,
    #[serde(rename = "conversionErrors")]
    pub conversion_errors: u64,
}

/// The synchronous message pipeline shared with the listener.
///
/// Holds borrowed capability handles (map, store) rather than owning the
/// coordinator; the bridge's owner controls its lifetime.
struct IngestPipeline {
    map: Arc<dyn SignalMap>,
    store: Arc<dyn PropertyStore>,
    counters: Arc<IngestCounters>,
    active: Arc<AtomicBool>,
}

impl MessageSink for IngestPipeline {
    fn on_message(&self, message: &str) {
        if !self.active.load(Ordering::SeqCst) {
            warn!("bridge not active, ignoring message: {}", message);
            return;
        }

        self.counters.record_processed();

        let parsed = match parse_signal(message) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("failed to parse telemetry message: {}", e);
                self.counters.record_error();
                return;
            }
        };

        let mapping = match self.map.resolve(parsed.path()) {
            Some(mapping) => mapping,
            None => {
                // Expected under partial signal coverage, so not a warning
                debug!("unmapped signal path: {}", parsed.path());
                self.counters.record_error();
                return;
            }
        };

        let value = match mapping.convert(parsed.raw_value()) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "failed to convert signal {}={}: {}",
                    parsed.path(),
                    parsed.raw_value(),
                    e
                );
                self.counters.record_error();
                return;
            }
        };

        let update = PropertyUpdate {
            property_id: mapping.property_id,
            area_id: mapping.area_id,
            value,
            timestamp: Some(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ),
        };

        match self.store.set_property(update) {
            Ok(()) => {
                debug!(
                    "signal {} -> property {:#x}",
                    parsed.path(),
                    mapping.property_id
                );
                self.counters.record_converted();
            }
            Err(e) => {
                warn!("store rejected update for {}: {}", parsed.path(), e);
                self.counters.record_error();
            }
        }
    }

    fn on_frame_error(&self, error: &FrameError) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        // The frame never became a message, so only the error counter moves
        warn!("dropping malformed frame: {}", error);
        self.counters.record_error();
    }
}

/// Lifecycle state guarded by one lock.
#[derive(Default)]
struct Lifecycle {
    initialized: bool,
    listener: Option<SignalListener>,
}

/// Coordinates the telemetry feed into the property store.
///
/// `initialize`, `shutdown`, and `is_active` may be called from any task,
/// concurrently with the read loop and with each other; lifecycle
/// transitions are serialized by one mutex.
pub struct VssBridge {
    config: ListenerConfig,
    map: Arc<dyn SignalMap>,
    store: Arc<dyn PropertyStore>,
    counters: Arc<IngestCounters>,
    active: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
}

impl VssBridge {
    /// Create an uninitialized bridge with injected collaborators.
    pub fn new(
        config: ListenerConfig,
        map: Arc<dyn SignalMap>,
        store: Arc<dyn PropertyStore>,
    ) -> Self {
        Self {
            config,
            map,
            store,
            counters: Arc::new(IngestCounters::default()),
            active: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Start the listener and mark the bridge active.
    ///
    /// Idempotent: returns Ok immediately if already initialized. On
    /// failure no resources are retained and the bridge stays
    /// uninitialized.
    pub async fn initialize(&self) -> Result<(), BridgeError> {
        let mut lifecycle = self.lifecycle.lock().await;

        if lifecycle.initialized {
            warn!("bridge already initialized");
            return Ok(());
        }

        info!(
            "initializing telemetry bridge with {} signal mappings",
            self.map.mapping_count()
        );

        let pipeline = Arc::new(IngestPipeline {
            map: self.map.clone(),
            store: self.store.clone(),
            counters: self.counters.clone(),
            active: self.active.clone(),
        });

        let mut listener = SignalListener::new(self.config.clone(), pipeline);
        listener.start().await?;

        lifecycle.listener = Some(listener);
        lifecycle.initialized = true;
        self.active.store(true, Ordering::SeqCst);

        info!("telemetry bridge initialization complete");
        Ok(())
    }

    /// Stop the listener and mark the bridge uninitialized.
    ///
    /// Safe to call repeatedly; a no-op when not initialized. Counters
    /// are left untouched.
    pub async fn shutdown(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        if !lifecycle.initialized {
            return;
        }

        info!("shutting down telemetry bridge");
        self.active.store(false, Ordering::SeqCst);

        if let Some(mut listener) = lifecycle.listener.take() {
            listener.stop().await;
        }

        lifecycle.initialized = false;
        info!(
            "telemetry bridge shutdown complete - {:?}",
            self.counters.snapshot()
        );
    }

    /// Consistent liveness snapshot under the lifecycle lock.
    pub async fn is_active(&self) -> bool {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle.initialized && self.active.load(Ordering::SeqCst)
    }

    /// Shared counter handle for diagnostics.
    pub fn counters(&self) -> Arc<IngestCounters> {
        self.counters.clone()
    }

    /// The bound listener address while initialized (useful with port 0).
    pub async fn local_addr(&self) -> Option<std::net::SocketAddr> {
        let lifecycle = self.lifecycle.lock().await;
        lifecycle.listener.as_ref().and_then(|l| l.local_addr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vss_core::{
        MemoryPropertyStore, SignalMapping, StaticSignalMap, StoreError, TypedValue, ValueKind,
    };

    fn test_map() -> Arc<StaticSignalMap> {
        let entries = vec![
            (
                "Vehicle.Speed".to_string(),
                SignalMapping::new(291504647, 0, ValueKind::Float),
            ),
            (
                "Vehicle.Cabin.IsNightMode".to_string(),
                SignalMapping::new(287310855, 0, ValueKind::Bool),
            ),
        ];
        Arc::new(StaticSignalMap::from_entries(entries).unwrap())
    }

    fn test_pipeline(
        store: Arc<dyn PropertyStore>,
        active: bool,
    ) -> (IngestPipeline, Arc<IngestCounters>) {
        let counters = Arc::new(IngestCounters::default());
        let pipeline = IngestPipeline {
            map: test_map(),
            store,
            counters: counters.clone(),
            active: Arc::new(AtomicBool::new(active)),
        };
        (pipeline, counters)
    }

    #[test]
    fn test_pipeline_happy_path() {
        let store = Arc::new(MemoryPropertyStore::new());
        let (pipeline, counters) = test_pipeline(store.clone(), true);

        pipeline.on_message("Vehicle.Speed=42.5");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 1);
        assert_eq!(snapshot.messages_converted, 1);
        assert_eq!(snapshot.conversion_errors, 0);

        let update = store.get_property(291504647, 0).unwrap();
        assert_eq!(update.value, TypedValue::Float(42.5));
        assert!(update.timestamp.is_some());
    }

    #[test]
    fn test_pipeline_conversion_failure() {
        let store = Arc::new(MemoryPropertyStore::new());
        let (pipeline, counters) = test_pipeline(store.clone(), true);

        pipeline.on_message("Vehicle.Speed=notanumber");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 1);
        assert_eq!(snapshot.messages_converted, 0);
        assert_eq!(snapshot.conversion_errors, 1);
        assert_eq!(store.property_count(), 0);
    }

    #[test]
    fn test_pipeline_parse_failure() {
        let store = Arc::new(MemoryPropertyStore::new());
        let (pipeline, counters) = test_pipeline(store.clone(), true);

        pipeline.on_message("noequals");
        pipeline.on_message("=5");
        pipeline.on_message("X=");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 3);
        assert_eq!(snapshot.conversion_errors, 3);
        assert_eq!(store.property_count(), 0);
    }

    #[test]
    fn test_pipeline_unmapped_path() {
        let store = Arc::new(MemoryPropertyStore::new());
        let (pipeline, counters) = test_pipeline(store, true);

        pipeline.on_message("Vehicle.Unknown=1");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 1);
        assert_eq!(snapshot.conversion_errors, 1);
    }

    #[test]
    fn test_pipeline_frame_error_counted() {
        let store = Arc::new(MemoryPropertyStore::new());
        let (pipeline, counters) = test_pipeline(store, true);

        pipeline.on_frame_error(&FrameError::InvalidUtf8);
        pipeline.on_frame_error(&FrameError::FrameTooLarge {
            limit: 4096,
            dropped: 5000,
        });

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 0);
        assert_eq!(snapshot.conversion_errors, 2);
    }

    #[test]
    fn test_pipeline_inactive_drops_without_counting() {
        let store = Arc::new(MemoryPropertyStore::new());
        let (pipeline, counters) = test_pipeline(store, false);

        pipeline.on_message("Vehicle.Speed=42.5");

        assert_eq!(counters.snapshot().messages_processed, 0);
    }

    #[test]
    fn test_pipeline_store_rejection_counted() {
        /// Store that rejects everything.
        struct RejectingStore;

        impl PropertyStore for RejectingStore {
            fn set_property(&self, _update: PropertyUpdate) -> Result<(), StoreError> {
                Err(StoreError::Rejected("nope".to_string()))
            }
            fn get_property(&self, _p: i32, _a: i32) -> Option<PropertyUpdate> {
                None
            }
            fn get_config(&self, _p: i32) -> Option<vss_core::PropertyConfig> {
                None
            }
        }

        let (pipeline, counters) = test_pipeline(Arc::new(RejectingStore), true);

        pipeline.on_message("Vehicle.Speed=42.5");

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.messages_processed, 1);
        assert_eq!(snapshot.messages_converted, 0);
        assert_eq!(snapshot.conversion_errors, 1);
    }

    #[tokio::test]
    async fn test_initialize_idempotent_and_active() {
        let store = Arc::new(MemoryPropertyStore::new());
        let bridge = VssBridge::new(
            ListenerConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                ..ListenerConfig::default()
            },
            test_map(),
            store,
        );

        assert!(!bridge.is_active().await);
        bridge.initialize().await.unwrap();
        assert!(bridge.is_active().await);
        bridge.initialize().await.unwrap();
        assert!(bridge.is_active().await);

        bridge.shutdown().await;
        assert!(!bridge.is_active().await);
    }

    #[tokio::test]
    async fn test_double_shutdown_keeps_counters() {
        let store = Arc::new(MemoryPropertyStore::new());
        let bridge = VssBridge::new(
            ListenerConfig {
                bind_addr: "127.0.0.1:0".parse().unwrap(),
                ..ListenerConfig::default()
            },
            test_map(),
            store,
        );

        bridge.initialize().await.unwrap();
        bridge.counters().snapshot();
        bridge.shutdown().await;
        let after_first = bridge.counters().snapshot();
        bridge.shutdown().await;
        assert_eq!(bridge.counters().snapshot(), after_first);
    }

    #[tokio::test]
    async fn test_failed_bind_leaves_uninitialized() {
        let store = Arc::new(MemoryPropertyStore::new());
        let blocker = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = blocker.local_addr().unwrap();

        let bridge = VssBridge::new(
            ListenerConfig {
                bind_addr: addr,
                ..ListenerConfig::default()
            },
            test_map(),
            store,
        );

        assert!(bridge.initialize().await.is_err());
        assert!(!bridge.is_active().await);
        // Shutdown after failed init is a no-op
        bridge.shutdown().await;
    }
}
