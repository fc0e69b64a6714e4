//! # vss-core
//!
//! Core VSS-to-property data model and conversion logic.
//!
//! This crate provides:
//! - Typed value model (TypedValue, ValueKind, PropertyUpdate)
//! - String-to-value conversion with validation, clamping, and scaling
//! - Signal path to property mapping (trait + static table)
//! - Property store abstraction and in-memory implementation
//!
//! This crate is intentionally runtime-agnostic and contains no async code,
//! so the conversion pipeline can be exercised without a socket in sight.

pub mod convert;
pub mod mapping;
pub mod store;
pub mod value;

pub use convert::ConversionError;
pub use mapping::{LinearScale, MappingError, SignalMap, SignalMapping, StaticSignalMap, ValueRange};
pub use store::{MemoryPropertyStore, PropertyStore, StoreError};
pub use value::{PropertyConfig, PropertyUpdate, TypedValue, ValueKind};
