//! Core types for the DI log analyzer library
//!
//! This module defines the records the analyzer consumes (telemetry events and the
//! static device/area/equipment topology) together with the library error type.
//! Wire shapes follow the JSON exports of the connect platform; field renames keep
//! the Rust names readable while still round-tripping the original documents.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Milliseconds since the Unix epoch, as carried by every telemetry document
pub type EpochMillis = i64;

/// Result type for analyzer operations
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors that can occur while loading or preparing analyzer input
///
/// The reduction engine, duplicate detector and formatter never fail: lookup
/// misses and empty time ranges are rendered as sentinels instead.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("Required input file not found: {0:?}")]
    MissingInput(PathBuf),

    #[error("No telemetry files starting with '{prefix}' in {dir:?}")]
    NoTelemetryFiles { dir: PathBuf, prefix: String },

    #[error("Failed to parse JSON file {path:?}: {source}")]
    JsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert an epoch-millisecond value into a UTC datetime
///
/// Values outside chrono's representable range yield `None`.
pub fn to_datetime(millis: EpochMillis) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Convert an epoch-millisecond value into a datetime at a fixed offset
pub fn to_local_datetime(millis: EpochMillis, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    to_datetime(millis).map(|utc| utc.with_timezone(offset))
}

/// Source block of a telemetry document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadSource {
    pub gateway_id: String,
    pub communication_equipment_id: String,
    /// Human-readable "gateway/equipment" label
    #[serde(default)]
    pub channel: String,
}

/// One telemetry document as exported by the platform
///
/// `data` holds the `DI<n>` keys; anything else in it is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    pub source: PayloadSource,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    pub timestamp: EpochMillis,
}

impl TelemetryPayload {
    /// Flatten the document into an event carrying `pin_count` pin states
    ///
    /// See [`pin_state`] for how raw JSON values are read.
    pub fn into_event(self, pin_count: usize) -> TelemetryEvent {
        let pin_states = (0..pin_count)
            .map(|pin| pin_state(self.data.get(&pin_label(pin))))
            .collect();

        TelemetryEvent {
            source_channel: self.source.channel,
            gateway_id: self.source.gateway_id,
            equipment_id: self.source.communication_equipment_id,
            timestamp: self.timestamp,
            pin_states,
        }
    }
}

/// Pin value for a present reading that is neither 0 nor 1
pub const NON_BINARY_STATE: i64 = -1;

/// Read a raw `DI<n>` value as an integer pin state
///
/// Numbers keep their value (`1.0` is 1, `0.0` is 0) and booleans map to 1/0.
/// Any other present value (a string, a fraction) reads as
/// [`NON_BINARY_STATE`]: it counts as activation for the not-working report but
/// never as "active" for last-active-time. An absent key or `null` reads as 0.
pub fn pin_state(value: Option<&serde_json::Value>) -> i64 {
    use serde_json::Value;

    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(flag)) => i64::from(*flag),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(n) => n,
            None => match number.as_f64() {
                Some(f) if f == 0.0 => 0,
                Some(f) if f == 1.0 => 1,
                _ => NON_BINARY_STATE,
            },
        },
        Some(_) => NON_BINARY_STATE,
    }
}

/// Label of a logical digital-input pin (`DI<n>`)
pub fn pin_label(pin: usize) -> String {
    format!("DI{}", pin)
}

/// A single received telemetry message, already flattened for the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryEvent {
    /// Human-readable "gateway/equipment" label
    pub source_channel: String,
    pub gateway_id: String,
    pub equipment_id: String,
    pub timestamp: EpochMillis,
    /// Raw pin values addressed by index, `pin_states[i]` is `DI<i>`
    pub pin_states: Vec<i64>,
}

impl TelemetryEvent {
    /// Build an event from explicit pin values
    pub fn new(
        gateway_id: impl Into<String>,
        equipment_id: impl Into<String>,
        timestamp: EpochMillis,
        pin_states: Vec<i64>,
    ) -> Self {
        let gateway_id = gateway_id.into();
        let equipment_id = equipment_id.into();
        Self {
            source_channel: format!("{}/{}", gateway_id, equipment_id),
            gateway_id,
            equipment_id,
            timestamp,
            pin_states,
        }
    }

    /// Builder method: override the display channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.source_channel = channel.into();
        self
    }

    /// Raw value of a pin, 0 when the event carries fewer pins
    pub fn pin_value(&self, pin: usize) -> i64 {
        self.pin_states.get(pin).copied().unwrap_or(0)
    }
}

/// Display light code attached to a device signal pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LightStatus {
    /// `G`: machine running
    Running,
    /// `R`: machine stopped
    Stopped,
    /// `O`: machine in an abnormal state
    Abnormal,
    /// `B`: no light assigned, also the sentinel for unmatched rows
    #[default]
    Unknown,
}

impl LightStatus {
    /// Single-letter code used in the exports and in reports
    pub fn code(&self) -> &'static str {
        match self {
            LightStatus::Running => "G",
            LightStatus::Stopped => "R",
            LightStatus::Abnormal => "O",
            LightStatus::Unknown => "B",
        }
    }

    /// Parse a light code; anything unrecognised is `Unknown`
    pub fn from_code(code: &str) -> Self {
        match code {
            "G" => LightStatus::Running,
            "R" => LightStatus::Stopped,
            "O" => LightStatus::Abnormal,
            _ => LightStatus::Unknown,
        }
    }
}

impl From<String> for LightStatus {
    fn from(code: String) -> Self {
        LightStatus::from_code(&code)
    }
}

impl From<LightStatus> for String {
    fn from(light: LightStatus) -> Self {
        light.code().to_string()
    }
}

impl fmt::Display for LightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A physical signal wired to a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceSignal {
    /// Physical pin label, usually `R<n>`
    pub pin: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub light: LightStatus,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub uuid: String,
}

impl DeviceSignal {
    pub fn new(pin: impl Into<String>, light: LightStatus) -> Self {
        Self {
            pin: pin.into(),
            state: String::new(),
            light,
            note: String::new(),
            uuid: String::new(),
        }
    }

    /// Telemetry label of this pin: `R<n>` becomes `DI<n>`, other shapes are kept
    pub fn telemetry_pin(&self) -> String {
        match self.pin.strip_prefix('R') {
            Some(rest) => format!("DI{}", rest),
            None => self.pin.clone(),
        }
    }
}

/// A machine from the device catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub area_id: String,
    pub gateway_id: String,
    #[serde(rename = "communicationEquipmentId")]
    pub equipment_id: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "signal", default)]
    pub signals: Vec<DeviceSignal>,
    #[serde(default)]
    pub updated_at: EpochMillis,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        gateway_id: impl Into<String>,
        equipment_id: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            area_id: String::new(),
            gateway_id: gateway_id.into(),
            equipment_id: equipment_id.into(),
            model: String::new(),
            signals: Vec::new(),
            updated_at: 0,
        }
    }

    /// Builder method: set the area
    pub fn with_area(mut self, area_id: impl Into<String>) -> Self {
        self.area_id = area_id.into();
        self
    }

    /// Builder method: append a signal pin
    pub fn with_signal(mut self, pin: impl Into<String>, light: LightStatus) -> Self {
        self.signals.push(DeviceSignal::new(pin, light));
        self
    }

    /// Builder method: set the last catalog update time
    pub fn with_updated_at(mut self, millis: EpochMillis) -> Self {
        self.updated_at = millis;
        self
    }

    /// Key of the communication channel this device hangs off
    pub fn channel_key(&self) -> (&str, &str) {
        (&self.gateway_id, &self.equipment_id)
    }
}

/// Area entry inside a map document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaEntry {
    pub name: String,
}

/// A site map document holding a set of areas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectMap {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "areasMap", default)]
    pub areas_map: BTreeMap<String, AreaEntry>,
}

/// A communication equipment record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationEquipment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}
