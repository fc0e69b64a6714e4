//! Typed value model for vehicle properties.
//!
//! These types are the common currency between the conversion layer, the
//! signal mapping, and the property store:
//! - `TypedValue` carries one converted value
//! - `ValueKind` names the target type a mapping expects
//! - `PropertyUpdate` is the unit handed to the store

use serde::{Deserialize, Serialize};

/// The target type a signal's raw value is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Float,
    Int32,
    Int64,
    Bool,
    Bytes,
    String,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Float => "float",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Bool => "bool",
            ValueKind::Bytes => "bytes",
            ValueKind::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// A converted property value, tagged with its type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    Float(f32),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    Bytes(Vec<u8>),
    String(String),
}

impl TypedValue {
    /// The kind discriminant for this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::Float(_) => ValueKind::Float,
            TypedValue::Int32(_) => ValueKind::Int32,
            TypedValue::Int64(_) => ValueKind::Int64,
            TypedValue::Bool(_) => ValueKind::Bool,
            TypedValue::Bytes(_) => ValueKind::Bytes,
            TypedValue::String(_) => ValueKind::String,
        }
    }
}

/// One typed update handed to the property store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    /// Target property ID.
    #[serde(rename = "propertyId")]
    pub property_id: i32,

    /// Area scoping within the property (0 = global).
    #[serde(rename = "areaId", default)]
    pub area_id: i32,

    /// The converted value.
    pub value: TypedValue,

    /// ISO 8601 timestamp (UTC) stamped when the update was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl PropertyUpdate {
    /// Create an update for a global (area 0) property without a timestamp.
    pub fn new(property_id: i32, value: TypedValue) -> Self {
        Self {
            property_id,
            area_id: 0,
            value,
            timestamp: None,
        }
    }
}

/// Static configuration of one property known to a store.
///
/// Stores that register configs can reject updates whose value kind does
/// not match the declared one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConfig {
    #[serde(rename = "propertyId")]
    pub property_id: i32,
    pub kind: ValueKind,
}
