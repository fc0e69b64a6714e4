//! Signal path to property mapping.
//!
//! A mapping table resolves dotted VSS paths like "Vehicle.Speed" to a
//! target property ID, area scoping, and expected value kind, plus any
//! declared linear scaling and clamping. The table itself is external
//! configuration; this module provides the lookup trait, a static
//! HashMap-backed implementation loadable from JSON, and a builtin table
//! covering common signals.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::{self, ConversionError};
use crate::value::{TypedValue, ValueKind};

/// Errors that can occur while building a mapping table.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The JSON mapping document could not be parsed.
    #[error("failed to parse mapping table: {0}")]
    ParseError(#[from] serde_json::Error),

    /// The same signal path appeared twice in the table.
    #[error("duplicate signal path in mapping table: {0}")]
    DuplicatePath(String),
}

/// Linear scaling declared by a mapping: `value * multiplier + offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScale {
    pub multiplier: f32,
    #[serde(default)]
    pub offset: f32,
}

/// Inclusive clamping bounds declared by a mapping, applied after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

/// One resolved signal mapping: where the value goes and how to convert it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMapping {
    /// Target property ID.
    #[serde(rename = "propertyId")]
    pub property_id: i32,

    /// Area scoping within the property (0 = global).
    #[serde(rename = "areaId", default)]
    pub area_id: i32,

    /// Expected value kind of the target property.
    pub kind: ValueKind,

    /// Optional linear scaling, applied in the float domain before clamping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<LinearScale>,

    /// Optional clamping bounds in target units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp: Option<ValueRange>,
}

impl SignalMapping {
    /// Create a plain mapping with no scaling or clamping.
    pub fn new(property_id: i32, area_id: i32, kind: ValueKind) -> Self {
        Self {
            property_id,
            area_id,
            kind,
            scale: None,
            clamp: None,
        }
    }

    /// Convert a raw value string to the mapped kind, applying declared
    /// scaling and clamping.
    ///
    /// Scaling is meaningful for numeric kinds: floats are scaled
    /// directly; int32 values are scaled in the float domain and rounded
    /// to nearest. Bool, bytes, and string kinds ignore scale and clamp.
    pub fn convert(&self, raw: &str) -> Result<TypedValue, ConversionError> {
        match self.kind {
            ValueKind::Float => {
                let mut v = convert::to_float(raw)?;
                if let Some(scale) = self.scale {
                    v = convert::linear_scale(v, scale.multiplier, scale.offset);
                }
                if let Some(range) = self.clamp {
                    v = convert::clamp_float(v, range.min, range.max);
                }
                Ok(TypedValue::Float(v))
            }
            ValueKind::Int32 => {
                let v = if let Some(scale) = self.scale {
                    // Scaled integers go through the float domain
                    let f = convert::to_float(raw)?;
                    convert::linear_scale(f, scale.multiplier, scale.offset).round() as i32
                } else {
                    convert::to_int32(raw)?
                };
                let v = match self.clamp {
                    Some(range) => convert::clamp_int32(v, range.min as i32, range.max as i32),
                    None => v,
                };
                Ok(TypedValue::Int32(v))
            }
            ValueKind::Int64 => Ok(TypedValue::Int64(convert::to_int64(raw)?)),
            ValueKind::Bool => Ok(TypedValue::Bool(convert::to_bool(raw)?)),
            ValueKind::Bytes => Ok(TypedValue::Bytes(convert::hex_to_bytes(raw)?)),
            ValueKind::String => Ok(TypedValue::String(raw.to_string())),
        }
    }
}

/// Lookup from signal path to target property mapping.
pub trait SignalMap: Send + Sync {
    /// Resolve a signal path, or None if the path is unmapped.
    fn resolve(&self, path: &str) -> Option<SignalMapping>;

    /// Number of signal paths in the table.
    fn mapping_count(&self) -> usize;
}

/// A static, HashMap-backed signal mapping table.
#[derive(Debug, Clone, Default)]
pub struct StaticSignalMap {
    entries: HashMap<String, SignalMapping>,
}

impl StaticSignalMap {
    /// Build a table from (path, mapping) pairs, rejecting duplicates.
    pub fn from_entries<I>(entries: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (String, SignalMapping)>,
    {
        let mut map = HashMap::new();
        for (path, mapping) in entries {
            if map.insert(path.clone(), mapping).is_some() {
                return Err(MappingError::DuplicatePath(path));
            }
        }
        Ok(Self { entries: map })
    }

    /// Load a table from a JSON document of the form
    /// `{"Vehicle.Speed": {"propertyId": ..., "kind": "float", ...}, ...}`.
    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        let entries: Vec<(String, SignalMapping)> =
            serde_json::from_str::<HashMap<String, SignalMapping>>(json)?
                .into_iter()
                .collect();
        Self::from_entries(entries)
    }

    /// The builtin mapping table covering common VSS signals.
    ///
    /// Property IDs follow the Android VHAL numbering convention.
    pub fn builtin() -> Self {
        let kmh_to_ms = LinearScale {
            multiplier: 1.0 / 3.6,
            offset: 0.0,
        };

        let entries = vec![
            (
                "Vehicle.Speed".to_string(),
                SignalMapping {
                    // PERF_VEHICLE_SPEED, m/s
                    property_id: 291504647,
                    area_id: 0,
                    kind: ValueKind::Float,
                    scale: Some(kmh_to_ms),
                    clamp: Some(ValueRange { min: 0.0, max: 100.0 }),
                },
            ),
            (
                "Vehicle.Powertrain.CombustionEngine.Speed".to_string(),
                SignalMapping {
                    // ENGINE_RPM
                    property_id: 291504901,
                    area_id: 0,
                    kind: ValueKind::Float,
                    scale: None,
                    clamp: Some(ValueRange { min: 0.0, max: 12000.0 }),
                },
            ),
            (
                "Vehicle.TraveledDistance".to_string(),
                // PERF_ODOMETER, km
                SignalMapping::new(291504644, 0, ValueKind::Float),
            ),
            (
                "Vehicle.Powertrain.FuelSystem.Level".to_string(),
                SignalMapping {
                    // FUEL_LEVEL, milliliters
                    property_id: 291504903,
                    area_id: 0,
                    kind: ValueKind::Float,
                    scale: None,
                    clamp: Some(ValueRange { min: 0.0, max: 200000.0 }),
                },
            ),
            (
                "Vehicle.Cabin.HVAC.Station.Row1.Left.Temperature".to_string(),
                SignalMapping {
                    // HVAC_TEMPERATURE_SET, seat row 1 left
                    property_id: 358614275,
                    area_id: 1,
                    kind: ValueKind::Float,
                    scale: None,
                    clamp: Some(ValueRange { min: 16.0, max: 32.0 }),
                },
            ),
            (
                "Vehicle.Cabin.IsNightMode".to_string(),
                // NIGHT_MODE
                SignalMapping::new(287310855, 0, ValueKind::Bool),
            ),
            (
                "Vehicle.Chassis.ParkingBrake.IsEngaged".to_string(),
                // PARKING_BRAKE_ON
                SignalMapping::new(287310850, 0, ValueKind::Bool),
            ),
            (
                "Vehicle.Powertrain.IgnitionState".to_string(),
                // IGNITION_STATE
                SignalMapping::new(289408009, 0, ValueKind::Int32),
            ),
        ];

        // Builtin entries are distinct by construction
        Self::from_entries(entries).expect("builtin mapping table has no duplicates")
    }

    /// Iterate over all entries, for registering store configs.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &SignalMapping)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl SignalMap for StaticSignalMap {
    fn resolve(&self, path: &str) -> Option<SignalMapping> {
        self.entries.get(path).cloned()
    }

    fn mapping_count(&self) -> usize {
        self.entries.len()
    }
}
