//! crates/timetable_core/src/domain.rs
//!
//! Defines the pure, core data structures for the engine.
//! These structs are independent of any database or serialization format.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::position::{Position, TimeSlot};

/// Coarse batch tag for a slot; part of the conflict key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionBand {
    Morning,
    Afternoon,
    Evening,
}

impl SessionBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionBand::Morning => "morning",
            SessionBand::Afternoon => "afternoon",
            SessionBand::Evening => "evening",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(SessionBand::Morning),
            "afternoon" => Some(SessionBand::Afternoon),
            "evening" => Some(SessionBand::Evening),
            _ => None,
        }
    }
}

impl fmt::Display for SessionBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            _ => None,
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring timetable placement owned by a scope.
///
/// Within one `(scope, granularity, position, time)` cell there is at
/// most one slot per session band and at most one per trainer; the
/// resolver enforces this before anything reaches a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSlot {
    pub id: Uuid,
    pub scope_id: String,
    /// Day-position; carries its granularity.
    pub position: Position,
    pub time: TimeSlot,
    /// Free-text sport/activity/program label.
    pub category: String,
    pub session: SessionBand,
    pub trainer_ref: String,
    /// Enrolled subject ids. Creation requires at least one.
    pub participants: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate fields for a slot create or edit; the id and both
/// timestamps are assigned by the store on write.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScheduleSlot {
    pub scope_id: String,
    pub position: Position,
    pub time: TimeSlot,
    pub category: String,
    pub session: SessionBand,
    pub trainer_ref: String,
    pub participants: BTreeSet<String>,
}

/// One persisted attendance row. At most one exists per
/// `(subject, scope, date)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRecord {
    pub subject_id: String,
    pub scope_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    /// Grouping tag copied from the originating slot context.
    pub category: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// An attendance row as proposed by a caller; `recorded_at` is assigned
/// by the store on write. The subject's enrollment date is a validation
/// input supplied separately and is never part of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceEntry {
    pub subject_id: String,
    pub scope_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub category: Option<String>,
}
