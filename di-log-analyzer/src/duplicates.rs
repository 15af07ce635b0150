//! Duplicate pin detection
//!
//! Several devices can hang off one gateway/equipment pair. When two of them
//! claim the same physical pin, telemetry for that pin cannot be attributed to
//! a single machine; this module surfaces those conflicts from the device
//! catalog alone.

use crate::types::Device;
use std::collections::HashMap;

/// One pin claimed by more than one device on the same channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicatePinFinding {
    pub gateway_id: String,
    pub equipment_id: String,
    /// Physical pin label as declared in the catalog (e.g. `R3`)
    pub pin: String,
    /// Distinct device names, in catalog order
    pub conflicting_device_names: Vec<String>,
}

impl DuplicatePinFinding {
    /// Device names joined for display
    pub fn joined_names(&self) -> String {
        self.conflicting_device_names.join(", ")
    }
}

/// Find pins assigned to more than one device within a gateway/equipment pair
///
/// Groups, pins and names are all reported in first-seen catalog order, so the
/// output is stable for a given catalog.
pub fn find_duplicates(devices: &[Device]) -> Vec<DuplicatePinFinding> {
    let mut group_positions: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<((&str, &str), Vec<&Device>)> = Vec::new();

    for device in devices {
        let channel = device.channel_key();
        match group_positions.get(&channel) {
            Some(&idx) => groups[idx].1.push(device),
            None => {
                group_positions.insert(channel, groups.len());
                groups.push((channel, vec![device]));
            }
        }
    }

    let mut findings = Vec::new();

    for ((gateway_id, equipment_id), group) in groups {
        // A single device cannot conflict with itself
        if group.len() < 2 {
            continue;
        }

        let mut pin_positions: HashMap<&str, usize> = HashMap::new();
        let mut pins: Vec<(&str, Vec<&str>)> = Vec::new();

        for device in group.iter().copied() {
            for signal in &device.signals {
                let idx = *pin_positions.entry(signal.pin.as_str()).or_insert_with(|| {
                    pins.push((signal.pin.as_str(), Vec::new()));
                    pins.len() - 1
                });

                let names = &mut pins[idx].1;
                if !names.contains(&device.name.as_str()) {
                    names.push(device.name.as_str());
                }
            }
        }

        for (pin, names) in pins {
            if names.len() > 1 {
                log::debug!(
                    "Pin {} on {}/{} claimed by {} devices",
                    pin,
                    gateway_id,
                    equipment_id,
                    names.len()
                );
                findings.push(DuplicatePinFinding {
                    gateway_id: gateway_id.to_string(),
                    equipment_id: equipment_id.to_string(),
                    pin: pin.to_string(),
                    conflicting_device_names: names.into_iter().map(str::to_string).collect(),
                });
            }
        }
    }

    findings
}
