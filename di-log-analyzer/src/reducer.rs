//! Signal reduction engine
//!
//! Folds an unordered batch of telemetry events into per-pin activity records.
//! Every event contributes one observation for each of its `pin_count` pins; the
//! [`Policy`] decides which pins survive the fold and which timestamp they carry.
//!
//! The engine is pure: it performs no I/O and never fails. The observed time
//! range is returned alongside the records so the formatter can label the report.

use crate::types::{pin_label, EpochMillis, TelemetryEvent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// How pin observations are folded into activity records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Policy {
    /// Keep pins never seen active, stamped with their latest inactive observation.
    ///
    /// Ties on that timestamp go to the last event in input order. The timestamp
    /// is the newest one, not that of the last event processed, so the report
    /// does not depend on how the telemetry files happen to be ordered.
    NotWorking,
    /// Keep pins seen active at least once, stamped with their latest activation.
    ///
    /// Ties on the maximal timestamp keep the first event that reached it.
    LastActiveTime,
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::NotWorking => write!(f, "not-working"),
            Policy::LastActiveTime => write!(f, "last-active-time"),
        }
    }
}

/// Identity of one physical input: `gateway/equipment/DI<n>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinKey {
    pub gateway_id: String,
    pub equipment_id: String,
    /// Telemetry pin label, e.g. `DI3`
    pub pin: String,
}

impl PinKey {
    pub fn new(
        gateway_id: impl Into<String>,
        equipment_id: impl Into<String>,
        pin: impl Into<String>,
    ) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            equipment_id: equipment_id.into(),
            pin: pin.into(),
        }
    }

    fn for_event(event: &TelemetryEvent, pin: usize) -> Self {
        Self::new(&event.gateway_id, &event.equipment_id, pin_label(pin))
    }
}

impl fmt::Display for PinKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.gateway_id, self.equipment_id, self.pin)
    }
}

/// Derived state of one pin after the fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinActivityRecord {
    /// Last inactive observation (NotWorking) or latest activation (LastActiveTime)
    pub timestamp: EpochMillis,
    /// Channel label of the event that produced `timestamp`
    pub source_channel: String,
}

/// Running minimum and maximum over consumed event timestamps
///
/// Starts empty (`start > end`); stays empty when no event is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: EpochMillis,
    end: EpochMillis,
}

impl TimeRange {
    /// A range that has observed nothing
    pub fn empty() -> Self {
        Self {
            start: EpochMillis::MAX,
            end: EpochMillis::MIN,
        }
    }

    /// Widen the range to include a timestamp
    pub fn observe(&mut self, timestamp: EpochMillis) {
        self.start = self.start.min(timestamp);
        self.end = self.end.max(timestamp);
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// `(min, max)` or `None` when nothing was observed
    pub fn bounds(&self) -> Option<(EpochMillis, EpochMillis)> {
        if self.is_empty() {
            None
        } else {
            Some((self.start, self.end))
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<EpochMillis> for TimeRange {
    fn from_iter<I: IntoIterator<Item = EpochMillis>>(iter: I) -> Self {
        let mut range = TimeRange::empty();
        for timestamp in iter {
            range.observe(timestamp);
        }
        range
    }
}

/// Result of a completed fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionOutcome {
    pub policy: Policy,
    /// Surviving pins, ordered by key
    pub records: BTreeMap<PinKey, PinActivityRecord>,
    pub range: TimeRange,
    pub events_seen: usize,
}

impl ReductionOutcome {
    pub fn get(&self, key: &PinKey) -> Option<&PinActivityRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Incremental form of the engine
///
/// Events are applied in the order given to [`SignalReducer::consume`]; use
/// [`reduce`] for the one-shot batch form.
pub struct SignalReducer {
    policy: Policy,
    pin_count: usize,
    /// Pins seen with a non-zero value at least once (NotWorking only)
    ever_activated: HashSet<PinKey>,
    records: BTreeMap<PinKey, PinActivityRecord>,
    range: TimeRange,
    events_seen: usize,
}

impl SignalReducer {
    pub fn new(policy: Policy, pin_count: usize) -> Self {
        Self {
            policy,
            pin_count,
            ever_activated: HashSet::new(),
            records: BTreeMap::new(),
            range: TimeRange::empty(),
            events_seen: 0,
        }
    }

    /// Fold one event into the running state
    pub fn consume(&mut self, event: &TelemetryEvent) {
        match self.policy {
            Policy::NotWorking => self.consume_not_working(event),
            Policy::LastActiveTime => self.consume_last_active(event),
        }

        self.range.observe(event.timestamp);
        self.events_seen += 1;
    }

    fn consume_not_working(&mut self, event: &TelemetryEvent) {
        for pin in 0..self.pin_count {
            let key = PinKey::for_event(event, pin);

            if event.pin_value(pin) != 0 {
                self.ever_activated.insert(key.clone());
            }

            if self.ever_activated.contains(&key) {
                if self.records.remove(&key).is_some() {
                    log::trace!("{} activated at {}, dropped from not-working set", key, event.timestamp);
                }
                continue;
            }

            let is_latest = self
                .records
                .get(&key)
                .map_or(true, |existing| event.timestamp >= existing.timestamp);

            if is_latest {
                self.records.insert(
                    key,
                    PinActivityRecord {
                        timestamp: event.timestamp,
                        source_channel: event.source_channel.clone(),
                    },
                );
            }
        }
    }

    fn consume_last_active(&mut self, event: &TelemetryEvent) {
        for pin in 0..self.pin_count {
            if event.pin_value(pin) != 1 {
                continue;
            }

            let key = PinKey::for_event(event, pin);
            let is_newer = self
                .records
                .get(&key)
                .map_or(true, |existing| event.timestamp > existing.timestamp);

            if is_newer {
                self.records.insert(
                    key,
                    PinActivityRecord {
                        timestamp: event.timestamp,
                        source_channel: event.source_channel.clone(),
                    },
                );
            }
        }
    }

    /// Finish the fold and hand back the derived records
    pub fn finish(self) -> ReductionOutcome {
        log::debug!(
            "Reduced {} events under {} policy into {} pin records",
            self.events_seen,
            self.policy,
            self.records.len()
        );

        ReductionOutcome {
            policy: self.policy,
            records: self.records,
            range: self.range,
            events_seen: self.events_seen,
        }
    }
}

/// Fold a batch of events in input order
pub fn reduce<'a, I>(events: I, policy: Policy, pin_count: usize) -> ReductionOutcome
where
    I: IntoIterator<Item = &'a TelemetryEvent>,
{
    let mut reducer = SignalReducer::new(policy, pin_count);
    for event in events {
        reducer.consume(event);
    }
    reducer.finish()
}
