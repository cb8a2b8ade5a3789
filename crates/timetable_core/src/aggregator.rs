//! crates/timetable_core/src/aggregator.rs
//!
//! Turns a flat attendance record set into per-category statistics.

use std::collections::BTreeMap;

use crate::domain::{AttendanceRecord, AttendanceStatus};

/// Present/absent tallies for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    /// Present share of total, rounded half-up to a whole percent.
    /// Zero when the category has no records.
    pub percentage: u32,
}

/// Groups a record set by category and tallies attendance.
///
/// Records with no category land under the empty-string key rather than
/// being dropped. Pure and deterministic: input order never affects the
/// result.
pub fn aggregate<'a, I>(records: I) -> BTreeMap<String, CategoryStats>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut stats: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for record in records {
        let key = record.category.clone().unwrap_or_default();
        let entry = stats.entry(key).or_default();
        entry.total += 1;
        match record.status {
            AttendanceStatus::Present => entry.present += 1,
            AttendanceStatus::Absent => entry.absent += 1,
        }
    }
    for entry in stats.values_mut() {
        entry.percentage = if entry.total == 0 {
            0
        } else {
            (f64::from(entry.present) / f64::from(entry.total) * 100.0).round() as u32
        };
    }
    stats
}
