//! Topology index builder
//!
//! Combines the three static reference collections (site maps, device catalog,
//! communication equipment) into lookup indices used by the report formatter.
//! The index can be materialized to a JSON file and read back, so the
//! application layer can skip re-reading the raw exports between runs.

use crate::types::{AnalyzerError, CommunicationEquipment, ConnectMap, Device, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Display value used whenever a lookup misses
pub const MISSING: &str = "--";

/// Composite device key: `gateway/equipment/<pins joined with '-'>`
///
/// Two devices on one channel declaring the exact same pin list share a key.
pub fn composite_key(device: &Device) -> String {
    let pins: Vec<&str> = device.signals.iter().map(|s| s.pin.as_str()).collect();
    format!("{}/{}/{}", device.gateway_id, device.equipment_id, pins.join("-"))
}

/// A catalog device stored under its composite key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDevice {
    pub key: String,
    pub device: Device,
}

/// A device that was replaced in the index because a later one had the same key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedDevice {
    pub key: String,
    /// Name of the device that lost its slot
    pub replaced: String,
    /// Name of the device now stored under the key
    pub kept: String,
}

/// Lookup indices over the static topology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyIndex {
    /// Area id -> area name
    #[serde(rename = "areaMap", default)]
    areas: BTreeMap<String, String>,

    /// Devices by composite key, in first-seen catalog order
    #[serde(rename = "devicesMap", default)]
    devices: Vec<IndexedDevice>,

    /// Equipment id -> equipment record
    #[serde(rename = "communicationEquipmentMap", default)]
    equipment: BTreeMap<String, CommunicationEquipment>,

    #[serde(default)]
    collapsed: Vec<CollapsedDevice>,

    /// Reference files the index was built from
    #[serde(default)]
    sources: Vec<PathBuf>,

    #[serde(skip)]
    key_positions: HashMap<String, usize>,
}

impl TopologyIndex {
    /// Build all indices from the raw collections
    pub fn build(
        maps: &[ConnectMap],
        devices: &[Device],
        equipment: &[CommunicationEquipment],
    ) -> Self {
        let mut index = Self::default();

        for map in maps {
            for (area_id, area) in &map.areas_map {
                index.areas.insert(area_id.clone(), area.name.clone());
            }
        }

        for device in devices {
            index.insert_device(device.clone());
        }

        for record in equipment {
            index.equipment.insert(record.id.clone(), record.clone());
        }

        log::debug!(
            "Built topology index: {} areas, {} devices ({} collapsed), {} equipment",
            index.areas.len(),
            index.devices.len(),
            index.collapsed.len(),
            index.equipment.len()
        );

        index
    }

    /// Insert a device; a repeated key keeps its position but takes the new device
    fn insert_device(&mut self, device: Device) {
        let key = composite_key(&device);

        match self.key_positions.get(&key) {
            Some(&idx) => {
                let slot = &mut self.devices[idx];
                log::warn!(
                    "Devices '{}' and '{}' share key {}, keeping the later one",
                    slot.device.name,
                    device.name,
                    key
                );
                self.collapsed.push(CollapsedDevice {
                    key: key.clone(),
                    replaced: slot.device.name.clone(),
                    kept: device.name.clone(),
                });
                slot.device = device;
            }
            None => {
                self.key_positions.insert(key.clone(), self.devices.len());
                self.devices.push(IndexedDevice { key, device });
            }
        }
    }

    fn reindex(&mut self) {
        self.key_positions = self
            .devices
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.key.clone(), idx))
            .collect();
    }

    /// Area name, or [`MISSING`]
    pub fn area_name(&self, area_id: &str) -> &str {
        match self.areas.get(area_id) {
            Some(name) => name.as_str(),
            None => {
                log::trace!("Area not found: {}", area_id);
                MISSING
            }
        }
    }

    /// Equipment display name, or [`MISSING`]
    pub fn equipment_name(&self, equipment_id: &str) -> &str {
        match self.equipment(equipment_id) {
            Some(record) if !record.name.is_empty() => record.name.as_str(),
            _ => {
                log::trace!("Equipment not found: {}", equipment_id);
                MISSING
            }
        }
    }

    /// Record the reference files the index was built from
    pub fn with_sources(mut self, sources: impl IntoIterator<Item = PathBuf>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Equipment record by id
    pub fn equipment(&self, equipment_id: &str) -> Option<&CommunicationEquipment> {
        self.equipment.get(equipment_id)
    }

    /// Device stored under a composite key
    pub fn device(&self, key: &str) -> Option<&Device> {
        self.key_positions.get(key).map(|&idx| &self.devices[idx].device)
    }

    /// Indexed devices in catalog order
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter().map(|entry| &entry.device)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Devices dropped from the index because of a composite-key clash
    pub fn collapsed(&self) -> &[CollapsedDevice] {
        &self.collapsed
    }

    /// Write the index as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| AnalyzerError::JsonParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json)?;
        log::info!("Topology index written to {:?}", path);
        Ok(())
    }

    /// Read an index previously written by [`TopologyIndex::save`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AnalyzerError::MissingInput(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let mut index: Self =
            serde_json::from_str(&content).map_err(|e| AnalyzerError::JsonParse {
                path: path.to_path_buf(),
                source: e,
            })?;
        index.reindex();

        log::info!(
            "Topology index loaded from {:?} ({} devices)",
            path,
            index.devices.len()
        );
        Ok(index)
    }
}
