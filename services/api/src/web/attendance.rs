//! services/api/src/web/attendance.rs
//!
//! Contains the Axum handlers for attendance: the per-row trainer flow,
//! the bulk institute sheet, history reads, and per-category statistics.
//!
//! The two write flows deliberately differ on absence reasons: the bulk
//! sheet refuses reasonless absences, the per-row flow never collects a
//! reason. Both inherit the same date-window rule.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use timetable_core::aggregator::aggregate;
use timetable_core::domain::{AttendanceEntry, AttendanceRecord, AttendanceStatus};
use timetable_core::ports::AttendanceQuery;
use timetable_core::reconciler::{CommitError, DraftSheet, SheetRow};
use timetable_core::validator::{validate_reason, validate_window, ReasonPolicy};

use crate::error::store_error_response;
use crate::web::state::AppState;

//=========================================================================================
// API Payload and Response Structs
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct MarkAttendancePayload {
    pub date: NaiveDate,
    /// The subject's join date, resolved by the caller from the profile
    /// record; the engine never looks it up itself.
    pub enrolled_on: NaiveDate,
    pub status: String,
    pub reason: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SheetRowPayload {
    pub subject_id: String,
    pub enrolled_on: NaiveDate,
    pub status: String,
    pub reason: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SheetPayload {
    pub date: NaiveDate,
    pub rows: Vec<SheetRowPayload>,
}

#[derive(Debug, Serialize)]
pub struct SheetCommitResponse {
    pub written: usize,
}

/// An attendance record as returned to clients.
#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub subject_id: String,
    pub scope_id: String,
    pub date: NaiveDate,
    pub status: String,
    pub reason: Option<String>,
    pub category: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl From<AttendanceRecord> for AttendanceResponse {
    fn from(record: AttendanceRecord) -> Self {
        Self {
            subject_id: record.subject_id,
            scope_id: record.scope_id,
            date: record.date,
            status: record.status.to_string(),
            reason: record.reason,
            category: record.category,
            recorded_at: record.recorded_at,
        }
    }
}

/// Optional filters accepted by the history and stats endpoints.
#[derive(Debug, Deserialize)]
pub struct AttendanceFilterParams {
    pub subject_id: Option<String>,
    pub date: Option<NaiveDate>,
}

impl AttendanceFilterParams {
    fn into_query(self) -> AttendanceQuery {
        AttendanceQuery {
            subject_id: self.subject_id,
            date: self.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryStatsResponse {
    pub total: u32,
    pub present: u32,
    pub absent: u32,
    pub percentage: u32,
}

fn parse_status(raw: &str) -> Result<AttendanceStatus, (StatusCode, String)> {
    AttendanceStatus::parse(raw).ok_or_else(|| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("'{raw}' is not a valid attendance status"),
        )
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Per-row trainer flow: marks one subject for one date. No reason is
/// required here, even for an absence.
pub async fn mark_attendance_handler(
    State(app_state): State<Arc<AppState>>,
    Path((scope_id, subject_id)): Path<(String, String)>,
    Json(payload): Json<MarkAttendancePayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let status = parse_status(&payload.status)?;
    let today = Utc::now().date_naive();

    validate_window(payload.date, payload.enrolled_on, today)
        .map_err(|v| (StatusCode::UNPROCESSABLE_ENTITY, v.to_string()))?;
    validate_reason(ReasonPolicy::Optional, status, payload.reason.as_deref())
        .map_err(|v| (StatusCode::UNPROCESSABLE_ENTITY, v.to_string()))?;

    let record = app_state
        .attendance
        .upsert(AttendanceEntry {
            subject_id,
            scope_id,
            date: payload.date,
            status,
            reason: payload.reason,
            category: payload.category,
        })
        .await
        .map_err(store_error_response)?;
    Ok(Json(AttendanceResponse::from(record)))
}

/// Bulk institute flow: validates the whole sheet, then writes it.
/// Absences must carry a reason; any failing row aborts the entire
/// commit, and every offending subject is reported at once.
pub async fn commit_sheet_handler(
    State(app_state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(payload): Json<SheetPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut sheet = DraftSheet::new(scope_id, payload.date, ReasonPolicy::Required);
    for row in payload.rows {
        let status = parse_status(&row.status)?;
        sheet.stage_row(
            row.subject_id,
            SheetRow {
                status,
                reason: row.reason,
                category: row.category,
                enrolled_on: row.enrolled_on,
            },
        );
    }

    let today = Utc::now().date_naive();
    match sheet.commit_all(app_state.attendance.as_ref(), today).await {
        Ok(written) => Ok(Json(SheetCommitResponse { written })),
        Err(CommitError::Invalid(violations)) => {
            let detail = violations
                .iter()
                .map(|v| format!("{}: {}", v.subject_id, v.violation))
                .collect::<Vec<_>>()
                .join("; ");
            Err((StatusCode::UNPROCESSABLE_ENTITY, detail))
        }
        Err(CommitError::Store(err)) => Err(store_error_response(err)),
    }
}

/// Attendance history for a scope, optionally narrowed to one subject
/// or one date.
pub async fn list_attendance_handler(
    State(app_state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Query(params): Query<AttendanceFilterParams>,
) -> Result<Json<Vec<AttendanceResponse>>, (StatusCode, String)> {
    let records = app_state
        .attendance
        .query_range(&scope_id, &params.into_query())
        .await
        .map_err(store_error_response)?;
    Ok(Json(records.into_iter().map(AttendanceResponse::from).collect()))
}

/// Per-category present/absent statistics over the matching records.
pub async fn stats_handler(
    State(app_state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Query(params): Query<AttendanceFilterParams>,
) -> Result<Json<BTreeMap<String, CategoryStatsResponse>>, (StatusCode, String)> {
    let records = app_state
        .attendance
        .query_range(&scope_id, &params.into_query())
        .await
        .map_err(store_error_response)?;

    let stats = aggregate(&records)
        .into_iter()
        .map(|(category, s)| {
            (
                category,
                CategoryStatsResponse {
                    total: s.total,
                    present: s.present,
                    absent: s.absent,
                    percentage: s.percentage,
                },
            )
        })
        .collect();
    Ok(Json(stats))
}
