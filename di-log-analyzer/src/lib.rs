//! DI Log Analyzer Library
//!
//! Batch analysis of digital-input ("DI") telemetry exported from industrial
//! gateways, cross-referenced against a static device/area/equipment topology.
//!
//! # Architecture
//!
//! The library is split into a pure core and a thin input layer:
//! - [`loader`] reads the JSON exports and validates their shape
//! - [`topology`] builds lookup indices over the reference collections
//! - [`reducer`] folds telemetry into per-pin activity records under a [`Policy`]
//! - [`duplicates`] finds pins claimed by several devices on one channel
//! - [`report`] joins everything and renders tab-separated text
//!
//! The core never fails on lookup misses or empty input: it renders sentinels
//! and carries on. Deciding whether there is enough data to run at all is left
//! to the caller (see `di-log-cli`).
//!
//! # Example Usage
//!
//! ```no_run
//! use di_log_analyzer::{reduce, render_activity_report, AnalyzerConfig, DataSource, Policy, ReportOptions};
//!
//! let source = DataSource::new("data", AnalyzerConfig::new()).unwrap();
//! let topology = source.build_topology().unwrap();
//!
//! let files = source.telemetry_files().unwrap();
//! let events = source.load_events(&files).unwrap();
//!
//! let outcome = reduce(&events, Policy::NotWorking, source.config().pin_count);
//! let text = render_activity_report(&topology, &outcome, &ReportOptions::new());
//! println!("{}", text);
//! ```

// Public modules
pub mod config;
pub mod duplicates;
pub mod loader;
pub mod reducer;
pub mod report;
pub mod time;
pub mod topology;
pub mod types;

// Re-export main types for convenience
pub use config::{AnalyzerConfig, DEFAULT_PIN_COUNT};
pub use duplicates::{find_duplicates, DuplicatePinFinding};
pub use loader::DataSource;
pub use reducer::{reduce, PinActivityRecord, PinKey, Policy, ReductionOutcome, SignalReducer, TimeRange};
pub use report::{
    activity_rows, render_activity_report, render_last_update_report, render_repeat_report,
    ActivityRow, ReportKind, ReportOptions,
};
pub use topology::{composite_key, TopologyIndex, MISSING};
pub use types::{
    AnalyzerError, CommunicationEquipment, ConnectMap, Device, DeviceSignal, EpochMillis,
    LightStatus, Result, TelemetryEvent, TelemetryPayload,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty fold produces an empty outcome
        let outcome = reduce(&Vec::<TelemetryEvent>::new(), Policy::NotWorking, DEFAULT_PIN_COUNT);
        assert!(outcome.is_empty());
        assert!(outcome.range.is_empty());
    }
}
