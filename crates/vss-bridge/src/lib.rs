//! # vss-bridge
//!
//! Bridges the line-delimited VSS telemetry feed into a typed property
//! store: a single-client TCP listener feeding an ingestion pipeline that
//! parses, converts, and emits property updates.

pub mod bridge;
pub mod listener;

pub use bridge::{BridgeError, CounterSnapshot, IngestCounters, VssBridge};
pub use listener::{BindError, ListenerConfig, MessageSink, SignalListener};
