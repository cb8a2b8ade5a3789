//! crates/timetable_core/src/reconciler.rs
//!
//! The edit-many/save-once workflow over one day's attendance sheet: a
//! working draft diffed against the last persisted snapshot, committed
//! in a single all-or-nothing validation pass.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{AttendanceEntry, AttendanceStatus};
use crate::ports::{AttendanceStore, StoreError};
use crate::validator::{validate_reason, validate_window, AttendanceViolation, ReasonPolicy};

/// One editable row of a sheet. `enrolled_on` rides along as the
/// validation input for that subject; it is never written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRow {
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub category: Option<String>,
    pub enrolled_on: NaiveDate,
}

/// A validation failure pinned to the subject it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    pub subject_id: String,
    pub violation: AttendanceViolation,
}

/// Why a commit did not go through.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// At least one row failed validation; nothing was written. Every
    /// failing subject is listed so a caller can surface them at once.
    #[error("{} attendance row(s) failed validation", .0.len())]
    Invalid(Vec<RowViolation>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An editing session over the attendance sheet of one scope and date.
///
/// The sheet is clean while the draft deep-equals the persisted
/// snapshot, dirty after any edit, and clean again after a successful
/// `commit_all` or a `revert`. A failed commit stays dirty.
#[derive(Debug, Clone)]
pub struct DraftSheet {
    scope_id: String,
    date: NaiveDate,
    reason_policy: ReasonPolicy,
    persisted: BTreeMap<String, SheetRow>,
    draft: BTreeMap<String, SheetRow>,
}

impl DraftSheet {
    pub fn new(scope_id: impl Into<String>, date: NaiveDate, reason_policy: ReasonPolicy) -> Self {
        Self {
            scope_id: scope_id.into(),
            date,
            reason_policy,
            persisted: BTreeMap::new(),
            draft: BTreeMap::new(),
        }
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The current draft rows, keyed by subject id.
    pub fn rows(&self) -> &BTreeMap<String, SheetRow> {
        &self.draft
    }

    /// Replaces BOTH the persisted snapshot and the draft with `rows`,
    /// retargeting the sheet to `date`. Called on every date change so
    /// unsaved edits from the previous date never leak forward.
    pub fn load_snapshot(&mut self, date: NaiveDate, rows: BTreeMap<String, SheetRow>) {
        self.date = date;
        self.draft = rows.clone();
        self.persisted = rows;
    }

    /// Inserts or replaces a draft row wholesale (a roster addition or
    /// a bulk payload). Only the draft side changes.
    pub fn stage_row(&mut self, subject_id: impl Into<String>, row: SheetRow) {
        self.draft.insert(subject_id.into(), row);
    }

    /// Updates the status (and reason) of an existing draft row.
    /// Returns `false` when the subject is not on the sheet.
    pub fn set_status(
        &mut self,
        subject_id: &str,
        status: AttendanceStatus,
        reason: Option<String>,
    ) -> bool {
        match self.draft.get_mut(subject_id) {
            Some(row) => {
                row.status = status;
                row.reason = reason;
                true
            }
            None => false,
        }
    }

    /// True iff the draft differs from the last persisted snapshot.
    pub fn has_changes(&self) -> bool {
        self.draft != self.persisted
    }

    /// Discards unsaved edits.
    pub fn revert(&mut self) {
        self.draft = self.persisted.clone();
    }

    /// Validates every draft row, then writes every draft row.
    ///
    /// All validations are staged before the first write: any failure
    /// aborts the whole commit with the complete list of offending
    /// subjects, and no store call is made. The writes themselves are
    /// per-entry and not transactional; a store failure mid-loop
    /// surfaces as `CommitError::Store` and leaves the snapshot
    /// untouched, so the sheet remains dirty.
    pub async fn commit_all(
        &mut self,
        store: &dyn AttendanceStore,
        today: NaiveDate,
    ) -> Result<usize, CommitError> {
        let mut violations = Vec::new();
        for (subject_id, row) in &self.draft {
            let checks = [
                validate_window(self.date, row.enrolled_on, today),
                validate_reason(self.reason_policy, row.status, row.reason.as_deref()),
            ];
            for check in checks {
                if let Err(violation) = check {
                    violations.push(RowViolation {
                        subject_id: subject_id.clone(),
                        violation,
                    });
                }
            }
        }
        if !violations.is_empty() {
            return Err(CommitError::Invalid(violations));
        }

        for (subject_id, row) in &self.draft {
            store
                .upsert(AttendanceEntry {
                    subject_id: subject_id.clone(),
                    scope_id: self.scope_id.clone(),
                    date: self.date,
                    status: row.status,
                    reason: row.reason.clone(),
                    category: row.category.clone(),
                })
                .await?;
        }

        self.persisted = self.draft.clone();
        Ok(self.persisted.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAttendanceStore;
    use crate::ports::AttendanceQuery;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(status: AttendanceStatus, reason: Option<&str>) -> SheetRow {
        SheetRow {
            status,
            reason: reason.map(str::to_string),
            category: Some("Karate".to_string()),
            enrolled_on: date(2025, 1, 10),
        }
    }

    fn loaded_sheet(policy: ReasonPolicy) -> DraftSheet {
        let mut sheet = DraftSheet::new("inst-1", date(2025, 6, 1), policy);
        sheet.load_snapshot(
            date(2025, 6, 1),
            [("s1".to_string(), row(AttendanceStatus::Present, None))].into(),
        );
        sheet
    }

    #[test]
    fn edits_then_revert_restore_the_snapshot() {
        let mut sheet = loaded_sheet(ReasonPolicy::Required);
        assert!(!sheet.has_changes());

        assert!(sheet.set_status("s1", AttendanceStatus::Absent, Some("sick".to_string())));
        assert!(sheet.has_changes());

        sheet.revert();
        assert!(!sheet.has_changes());
        assert_eq!(sheet.rows()["s1"].status, AttendanceStatus::Present);
        assert_eq!(sheet.rows()["s1"].reason, None);
    }

    #[test]
    fn set_status_on_an_unknown_subject_is_refused() {
        let mut sheet = loaded_sheet(ReasonPolicy::Required);
        assert!(!sheet.set_status("ghost", AttendanceStatus::Absent, None));
        assert!(!sheet.has_changes());
    }

    #[test]
    fn loading_a_new_date_discards_stale_edits() {
        let mut sheet = loaded_sheet(ReasonPolicy::Required);
        sheet.set_status("s1", AttendanceStatus::Absent, Some("sick".to_string()));

        sheet.load_snapshot(
            date(2025, 6, 2),
            [("s1".to_string(), row(AttendanceStatus::Present, None))].into(),
        );
        assert!(!sheet.has_changes());
        assert_eq!(sheet.date(), date(2025, 6, 2));
        assert_eq!(sheet.rows()["s1"].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn commit_writes_every_row_and_goes_clean() {
        let store = MemoryAttendanceStore::new();
        let mut sheet = loaded_sheet(ReasonPolicy::Required);
        sheet.stage_row("s2", row(AttendanceStatus::Absent, Some("travel")));
        assert!(sheet.has_changes());

        let written = sheet.commit_all(&store, date(2025, 6, 1)).await.unwrap();
        assert_eq!(written, 2);
        assert!(!sheet.has_changes());

        let records = store
            .query_range("inst-1", &AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn a_single_missing_reason_aborts_the_whole_commit() {
        let store = MemoryAttendanceStore::new();
        let mut sheet = loaded_sheet(ReasonPolicy::Required);
        sheet.stage_row("s2", row(AttendanceStatus::Absent, None));
        sheet.stage_row("s3", row(AttendanceStatus::Absent, Some("  ")));

        let err = sheet.commit_all(&store, date(2025, 6, 1)).await.unwrap_err();
        match err {
            CommitError::Invalid(violations) => {
                let subjects: Vec<_> = violations.iter().map(|v| v.subject_id.as_str()).collect();
                assert_eq!(subjects, ["s2", "s3"]);
            }
            other => panic!("unexpected commit error: {other:?}"),
        }

        // All-or-nothing: no partial writes, and the sheet stays dirty.
        let records = store
            .query_range("inst-1", &AttendanceQuery::default())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(sheet.has_changes());
    }

    #[tokio::test]
    async fn an_out_of_window_date_aborts_the_commit() {
        let store = MemoryAttendanceStore::new();
        let mut sheet = DraftSheet::new("inst-1", date(2025, 1, 9), ReasonPolicy::Optional);
        // Sheet date precedes the subject's enrollment.
        sheet.stage_row("s1", row(AttendanceStatus::Present, None));

        let err = sheet.commit_all(&store, date(2025, 6, 1)).await.unwrap_err();
        assert!(matches!(err, CommitError::Invalid(ref v)
            if matches!(v[0].violation, AttendanceViolation::DateOutOfWindow { .. })));
    }

    #[tokio::test]
    async fn optional_policy_commits_reasonless_absences() {
        let store = MemoryAttendanceStore::new();
        let mut sheet = loaded_sheet(ReasonPolicy::Optional);
        sheet.set_status("s1", AttendanceStatus::Absent, None);

        sheet.commit_all(&store, date(2025, 6, 1)).await.unwrap();
        assert!(!sheet.has_changes());
    }
}
