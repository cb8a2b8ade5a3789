//! crates/timetable_core/src/validator.rs
//!
//! Date-window and reason checks applied to attendance writes before
//! they reach a store. The two checks are independent; a flow may apply
//! one, the other, both, or neither.

use chrono::NaiveDate;

use crate::domain::AttendanceStatus;

/// Whether a flow collects absence reasons. The institute bulk sheet
/// requires them; the per-row trainer flow never collects one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonPolicy {
    Required,
    Optional,
}

/// A rejected attendance write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceViolation {
    #[error("{date} is outside the allowed window {enrolled_on} to {today}")]
    DateOutOfWindow {
        date: NaiveDate,
        enrolled_on: NaiveDate,
        today: NaiveDate,
    },
    #[error("marking a subject absent requires a reason")]
    MissingReason,
}

/// Accepts any date from the enrollment day through today, inclusive at
/// both ends. The enrollment day itself is a valid attendance date.
pub fn validate_window(
    date: NaiveDate,
    enrolled_on: NaiveDate,
    today: NaiveDate,
) -> Result<(), AttendanceViolation> {
    if date < enrolled_on || date > today {
        return Err(AttendanceViolation::DateOutOfWindow {
            date,
            enrolled_on,
            today,
        });
    }
    Ok(())
}

/// Under `ReasonPolicy::Required`, an `Absent` row must carry a
/// non-blank reason. `ReasonPolicy::Optional` always passes.
pub fn validate_reason(
    policy: ReasonPolicy,
    status: AttendanceStatus,
    reason: Option<&str>,
) -> Result<(), AttendanceViolation> {
    if policy == ReasonPolicy::Required
        && status == AttendanceStatus::Absent
        && reason.is_none_or(|r| r.trim().is_empty())
    {
        return Err(AttendanceViolation::MissingReason);
    }
    Ok(())
}
