//! Date rendering for report headers and rows

use crate::reducer::TimeRange;
use crate::topology::MISSING;
use crate::types::{to_local_datetime, EpochMillis};
use chrono::FixedOffset;

/// Header placeholder when no event was observed
pub const NO_DATA: &str = "no data";

/// `YYYY-MM-DD HH:MM:SS` at the given offset, [`MISSING`] if out of range
pub fn format_timestamp(millis: EpochMillis, offset: &FixedOffset) -> String {
    match to_local_datetime(millis, offset) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => MISSING.to_string(),
    }
}

/// `M/D - M/D` covering the range, [`NO_DATA`] if the range is empty
pub fn format_date_range(range: &TimeRange, offset: &FixedOffset) -> String {
    let Some((start, end)) = range.bounds() else {
        return NO_DATA.to_string();
    };

    match (to_local_datetime(start, offset), to_local_datetime(end, offset)) {
        (Some(start), Some(end)) => format!(
            "{} - {}",
            start.format("%-m/%-d"),
            end.format("%-m/%-d")
        ),
        _ => NO_DATA.to_string(),
    }
}
