//! Report formatting
//!
//! Joins reduction output against the topology index and renders tab-separated
//! text. Every report starts with its header line(s) and a column title line,
//! followed by one 1-based numbered line per row.
//!
//! Lookup misses never abort a report: unknown areas and equipment render as
//! [`MISSING`], an empty time range renders as [`crate::time::NO_DATA`].

use crate::duplicates::DuplicatePinFinding;
use crate::reducer::{PinKey, Policy, ReductionOutcome, TimeRange};
use crate::time::{format_date_range, format_timestamp};
use crate::topology::{CollapsedDevice, TopologyIndex, MISSING};
use crate::types::{Device, EpochMillis, LightStatus};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The reports this tool can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    NotWorking,
    LastTimeWork,
    RepeatSignal,
    LastUpdate,
}

impl ReportKind {
    /// Name used in output file names
    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::NotWorking => "not-working",
            ReportKind::LastTimeWork => "last-time-work",
            ReportKind::RepeatSignal => "repeat-signal",
            ReportKind::LastUpdate => "last-update",
        }
    }

    /// Reduction policy behind the report, if it reads telemetry
    pub fn policy(&self) -> Option<Policy> {
        match self {
            ReportKind::NotWorking => Some(Policy::NotWorking),
            ReportKind::LastTimeWork => Some(Policy::LastActiveTime),
            ReportKind::RepeatSignal | ReportKind::LastUpdate => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Render device pins without an activity record using sentinels instead
    /// of leaving them out
    pub show_unmatched: bool,
    /// Offset used for every rendered date
    pub utc_offset: FixedOffset,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            show_unmatched: false,
            utc_offset: Utc.fix(),
        }
    }
}

impl ReportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: render unmatched pins with sentinels
    pub fn with_show_unmatched(mut self, enabled: bool) -> Self {
        self.show_unmatched = enabled;
        self
    }

    /// Builder method: set the display offset
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// One line of an activity report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityRow {
    /// 1-based position in the report
    pub index: usize,
    pub gateway: String,
    pub equipment: String,
    /// Telemetry pin label (`DI<n>`)
    pub pin: String,
    pub area: String,
    pub device: String,
    pub light: LightStatus,
    /// `None` for unmatched rows
    pub timestamp: Option<EpochMillis>,
}

/// Split a `gateway/equipment` channel label into its display parts
fn split_channel(channel: &str) -> (String, String) {
    match channel.split_once('/') {
        Some((gateway, rest)) => {
            let equipment = rest.split('/').next().unwrap_or(MISSING);
            (gateway.to_string(), equipment.to_string())
        }
        None if channel.is_empty() => (MISSING.to_string(), MISSING.to_string()),
        None => (channel.to_string(), MISSING.to_string()),
    }
}

/// Join reduction output against the device index, in catalog order
pub fn activity_rows(
    topology: &TopologyIndex,
    outcome: &ReductionOutcome,
    options: &ReportOptions,
) -> Vec<ActivityRow> {
    let mut rows = Vec::new();
    let mut unmatched = 0usize;

    for device in topology.devices() {
        let area = topology.area_name(&device.area_id);

        for signal in &device.signals {
            let pin = signal.telemetry_pin();
            let key = PinKey::new(&device.gateway_id, &device.equipment_id, pin.as_str());

            let row = match outcome.get(&key) {
                Some(record) => {
                    let (gateway, equipment) = split_channel(&record.source_channel);
                    ActivityRow {
                        index: rows.len() + 1,
                        gateway,
                        equipment,
                        pin,
                        area: area.to_string(),
                        device: device.name.clone(),
                        light: signal.light,
                        timestamp: Some(record.timestamp),
                    }
                }
                None if options.show_unmatched => {
                    unmatched += 1;
                    ActivityRow {
                        index: rows.len() + 1,
                        gateway: MISSING.to_string(),
                        equipment: topology.equipment_name(&device.equipment_id).to_string(),
                        pin,
                        area: area.to_string(),
                        device: device.name.clone(),
                        light: LightStatus::Unknown,
                        timestamp: None,
                    }
                }
                None => {
                    unmatched += 1;
                    continue;
                }
            };

            rows.push(row);
        }
    }

    log::debug!(
        "Joined {} rows against {} devices ({} pins without activity record)",
        rows.len(),
        topology.device_count(),
        unmatched
    );

    rows
}

fn time_column(policy: Policy) -> &'static str {
    match policy {
        Policy::NotWorking => "Last Inactive",
        Policy::LastActiveTime => "Last Active",
    }
}

/// Render a not-working or last-time-work report
pub fn render_activity_report(
    topology: &TopologyIndex,
    outcome: &ReductionOutcome,
    options: &ReportOptions,
) -> String {
    let offset = &options.utc_offset;
    let header = format!(
        "\t{}\n#\tGateway\tEquipment\tDI\tArea\tName\tLight\t{}\n",
        format_date_range(&outcome.range, offset),
        time_column(outcome.policy)
    );

    let lines: Vec<String> = activity_rows(topology, outcome, options)
        .into_iter()
        .map(|row| {
            let timestamp = row
                .timestamp
                .map(|t| format_timestamp(t, offset))
                .unwrap_or_else(|| MISSING.to_string());
            format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                row.index,
                row.gateway,
                row.equipment,
                row.pin,
                row.area,
                row.device,
                row.light,
                timestamp
            )
        })
        .collect();

    header + &lines.join("\n")
}

/// Render the duplicate pin findings
///
/// Devices hidden by a composite-key clash are listed in a second section,
/// which is left out when there are none.
pub fn render_repeat_report(findings: &[DuplicatePinFinding], hidden: &[CollapsedDevice]) -> String {
    let header = "#\tGateway\tEquipment\tDI\tDevices\n";

    let lines: Vec<String> = findings
        .iter()
        .enumerate()
        .map(|(idx, finding)| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                idx + 1,
                finding.gateway_id,
                finding.equipment_id,
                finding.pin,
                finding.joined_names()
            )
        })
        .collect();

    let mut report = header.to_string() + &lines.join("\n");
    if !hidden.is_empty() {
        report.push_str("\n\nHidden devices\n#\tKey\tDevice\tHidden by\n");
        let hidden_lines: Vec<String> = hidden
            .iter()
            .enumerate()
            .map(|(idx, clash)| format!("{}\t{}\t{}\t{}", idx + 1, clash.key, clash.replaced, clash.kept))
            .collect();
        report.push_str(&hidden_lines.join("\n"));
    }
    report
}

/// Render every catalog device with its last update time
pub fn render_last_update_report(devices: &[Device], options: &ReportOptions) -> String {
    let offset = &options.utc_offset;
    let range: TimeRange = devices.iter().map(|d| d.updated_at).collect();
    let header = format!(
        "\t{}\n#\tName\tLast Update\n",
        format_date_range(&range, offset)
    );

    let lines: Vec<String> = devices
        .iter()
        .enumerate()
        .map(|(idx, device)| {
            format!(
                "{}\t{}\t{}",
                idx + 1,
                device.name,
                format_timestamp(device.updated_at, offset)
            )
        })
        .collect();

    header + &lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::reduce;
    use crate::types::{AreaEntry, CommunicationEquipment, ConnectMap, TelemetryEvent};
    use std::collections::BTreeMap;

    // 2024-03-05 01:02:03 UTC
    const T: EpochMillis = 1_709_600_523_000;

    fn topology(devices: &[Device]) -> TopologyIndex {
        let mut areas_map = BTreeMap::new();
        areas_map.insert("a1".to_string(), AreaEntry { name: "Hall A".to_string() });
        let maps = vec![ConnectMap {
            id: "m1".to_string(),
            areas_map,
        }];
        let equipment = vec![CommunicationEquipment {
            id: "eq1".to_string(),
            name: "Modbus 1".to_string(),
        }];
        TopologyIndex::build(&maps, devices, &equipment)
    }

    fn single_device() -> Vec<Device> {
        vec![Device::new("Press", "gw1", "eq1")
            .with_area("a1")
            .with_signal("R1", LightStatus::Running)
            .with_signal("R2", LightStatus::Running)]
    }

    #[test]
    fn test_no_telemetry_with_unmatched_rows() {
        let index = topology(&single_device());
        let outcome = reduce(&Vec::<TelemetryEvent>::new(), Policy::NotWorking, 16);
        let options = ReportOptions::new().with_show_unmatched(true);

        let report = render_activity_report(&index, &outcome, &options);

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "\tno data");
        assert_eq!(lines[1], "#\tGateway\tEquipment\tDI\tArea\tName\tLight\tLast Inactive");
        assert_eq!(lines[2], "1\t--\tModbus 1\tDI1\tHall A\tPress\tB\t--");
        assert_eq!(lines[3], "2\t--\tModbus 1\tDI2\tHall A\tPress\tB\t--");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_no_telemetry_without_unmatched_rows() {
        let index = topology(&single_device());
        let outcome = reduce(&Vec::<TelemetryEvent>::new(), Policy::NotWorking, 16);

        let rows = activity_rows(&index, &outcome, &ReportOptions::new());
        let report = render_activity_report(&index, &outcome, &ReportOptions::new());

        assert!(rows.is_empty());
        assert_eq!(report.lines().count(), 2);
    }

    #[test]
    fn test_not_working_rows() {
        let index = topology(&single_device());
        let mut states = vec![0; 16];
        states[2] = 1;
        let events = vec![TelemetryEvent::new("gw1", "eq1", T, states).with_channel("GW-1/Line 3")];
        let outcome = reduce(&events, Policy::NotWorking, 16);

        let report = render_activity_report(&index, &outcome, &ReportOptions::new());

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "\t3/5 - 3/5");
        assert_eq!(lines[2], "1\tGW-1\tLine 3\tDI1\tHall A\tPress\tG\t2024-03-05 01:02:03");
        // DI2 was active and is not reported
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_last_active_rows_and_area_miss() {
        let devices = vec![Device::new("Lathe", "gw1", "eq1")
            .with_area("unknown-area")
            .with_signal("R0", LightStatus::Stopped)];
        let index = topology(&devices);
        let mut states = vec![0; 16];
        states[0] = 1;
        let events = vec![
            TelemetryEvent::new("gw1", "eq1", T, states.clone()),
            TelemetryEvent::new("gw1", "eq1", T - 1000, states),
        ];
        let outcome = reduce(&events, Policy::LastActiveTime, 16);

        let rows = activity_rows(&index, &outcome, &ReportOptions::new());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].area, MISSING);
        assert_eq!(rows[0].light, LightStatus::Stopped);
        assert_eq!(rows[0].timestamp, Some(T));
        assert_eq!(rows[0].gateway, "gw1");
        assert_eq!(rows[0].equipment, "eq1");
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let index = topology(&single_device());
        let events = vec![TelemetryEvent::new("gw1", "eq1", T, vec![0; 16])];
        let options = ReportOptions::new().with_show_unmatched(true);

        let first = render_activity_report(&index, &reduce(&events, Policy::NotWorking, 16), &options);
        let second = render_activity_report(&index, &reduce(&events, Policy::NotWorking, 16), &options);

        assert_eq!(first, second);
    }

    #[test]
    fn test_split_channel() {
        assert_eq!(split_channel("a/b"), ("a".to_string(), "b".to_string()));
        assert_eq!(split_channel("a/b/c"), ("a".to_string(), "b".to_string()));
        assert_eq!(split_channel("solo"), ("solo".to_string(), MISSING.to_string()));
        assert_eq!(split_channel(""), (MISSING.to_string(), MISSING.to_string()));
    }

    #[test]
    fn test_repeat_report() {
        let findings = vec![DuplicatePinFinding {
            gateway_id: "gw1".to_string(),
            equipment_id: "eq1".to_string(),
            pin: "R1".to_string(),
            conflicting_device_names: vec!["Press".to_string(), "Lathe".to_string()],
        }];

        let report = render_repeat_report(&findings, &[]);

        assert_eq!(report, "#\tGateway\tEquipment\tDI\tDevices\n1\tgw1\teq1\tR1\tPress, Lathe");
    }

    #[test]
    fn test_repeat_report_lists_hidden_devices() {
        let devices = vec![
            Device::new("Press", "gw1", "eq1").with_signal("R1", LightStatus::Running),
            Device::new("Lathe", "gw1", "eq1").with_signal("R1", LightStatus::Stopped),
        ];
        let index = TopologyIndex::build(&[], &devices, &[]);

        let report = render_repeat_report(&[], index.collapsed());

        assert_eq!(
            report,
            "#\tGateway\tEquipment\tDI\tDevices\n\n\nHidden devices\n#\tKey\tDevice\tHidden by\n1\tgw1/eq1/R1\tPress\tLathe"
        );
    }

    #[test]
    fn test_last_update_report() {
        let devices = vec![
            Device::new("Press", "gw1", "eq1").with_updated_at(T),
            Device::new("Lathe", "gw1", "eq1").with_updated_at(T + 86_400_000),
        ];

        let report = render_last_update_report(&devices, &ReportOptions::new());

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "\t3/5 - 3/6");
        assert_eq!(lines[1], "#\tName\tLast Update");
        assert_eq!(lines[2], "1\tPress\t2024-03-05 01:02:03");
        assert_eq!(lines[3], "2\tLathe\t2024-03-06 01:02:03");
    }

    #[test]
    fn test_last_update_report_empty_catalog() {
        let report = render_last_update_report(&[], &ReportOptions::new());
        assert_eq!(report, "\tno data\n#\tName\tLast Update\n");
    }

    #[test]
    fn test_report_kind_policy() {
        assert_eq!(ReportKind::NotWorking.policy(), Some(Policy::NotWorking));
        assert_eq!(ReportKind::LastTimeWork.policy(), Some(Policy::LastActiveTime));
        assert_eq!(ReportKind::RepeatSignal.policy(), None);
        assert_eq!(ReportKind::LastTimeWork.slug(), "last-time-work");
    }
}
