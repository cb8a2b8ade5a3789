//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the engine's `SlotStore` and `AttendanceStore`
//! ports. It handles all interactions with the PostgreSQL database
//! using `sqlx`.

use async_stream::stream;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::StreamExt;
use sqlx::{FromRow, PgPool};
use timetable_core::domain::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, NewScheduleSlot, ScheduleSlot,
    SessionBand,
};
use timetable_core::ports::{
    AttendanceQuery, AttendanceStore, SlotStore, SlotStream, StoreError, StoreResult,
};
use timetable_core::position::{Granularity, Position, TimeSlot};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter implementing both store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

const SLOT_COLUMNS: &str = "id, scope_id, granularity, day_position, time_slot, category, \
                            session_band, trainer_ref, participants, created_at, updated_at";

#[derive(FromRow)]
struct SlotRecord {
    id: Uuid,
    scope_id: String,
    granularity: String,
    day_position: String,
    time_slot: String,
    category: String,
    session_band: String,
    trainer_ref: String,
    participants: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SlotRecord {
    /// Parses the stored labels back into domain values. A row that no
    /// longer parses is surfaced as a backend error rather than a panic.
    fn to_domain(self) -> StoreResult<ScheduleSlot> {
        let granularity = Granularity::parse(&self.granularity)
            .map_err(|e| StoreError::Backend(format!("corrupt slot row {}: {e}", self.id)))?;
        let position = Position::parse(granularity, &self.day_position)
            .map_err(|e| StoreError::Backend(format!("corrupt slot row {}: {e}", self.id)))?;
        let time = TimeSlot::parse(&self.time_slot)
            .map_err(|e| StoreError::Backend(format!("corrupt slot row {}: {e}", self.id)))?;
        let session = SessionBand::parse(&self.session_band).ok_or_else(|| {
            StoreError::Backend(format!(
                "corrupt slot row {}: bad session '{}'",
                self.id, self.session_band
            ))
        })?;
        Ok(ScheduleSlot {
            id: self.id,
            scope_id: self.scope_id,
            position,
            time,
            category: self.category,
            session,
            trainer_ref: self.trainer_ref,
            participants: self.participants.into_iter().collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct AttendanceRow {
    subject_id: String,
    scope_id: String,
    date: NaiveDate,
    status: String,
    reason: Option<String>,
    category: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl AttendanceRow {
    fn to_domain(self) -> StoreResult<AttendanceRecord> {
        let status = AttendanceStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Backend(format!(
                "corrupt attendance row for {}: bad status '{}'",
                self.subject_id, self.status
            ))
        })?;
        Ok(AttendanceRecord {
            subject_id: self.subject_id,
            scope_id: self.scope_id,
            date: self.date,
            status,
            reason: self.reason,
            category: self.category,
            recorded_at: self.recorded_at,
        })
    }
}

//=========================================================================================
// `SlotStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SlotStore for DbAdapter {
    async fn insert(&self, slot: NewScheduleSlot) -> StoreResult<ScheduleSlot> {
        let participants: Vec<String> = slot.participants.iter().cloned().collect();
        let sql = format!(
            "INSERT INTO schedule_slots ({SLOT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) \
             RETURNING {SLOT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, SlotRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(&slot.scope_id)
            .bind(slot.position.granularity().as_str())
            .bind(slot.position.label())
            .bind(slot.time.to_string())
            .bind(&slot.category)
            .bind(slot.session.as_str())
            .bind(&slot.trainer_ref)
            .bind(&participants)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        record.to_domain()
    }

    async fn update(&self, id: Uuid, slot: NewScheduleSlot) -> StoreResult<ScheduleSlot> {
        let participants: Vec<String> = slot.participants.iter().cloned().collect();
        let sql = format!(
            "UPDATE schedule_slots SET scope_id = $2, granularity = $3, day_position = $4, \
             time_slot = $5, category = $6, session_band = $7, trainer_ref = $8, \
             participants = $9, updated_at = $10 \
             WHERE id = $1 \
             RETURNING {SLOT_COLUMNS}"
        );
        let record = sqlx::query_as::<_, SlotRecord>(&sql)
            .bind(id)
            .bind(&slot.scope_id)
            .bind(slot.position.granularity().as_str())
            .bind(slot.position.label())
            .bind(slot.time.to_string())
            .bind(&slot.category)
            .bind(slot.session.as_str())
            .bind(&slot.trainer_ref)
            .bind(&participants)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?
            .ok_or_else(|| StoreError::NotFound(format!("slot {id}")))?;
        record.to_domain()
    }

    async fn list_by_scope(&self, scope_id: &str) -> StoreResult<SlotStream> {
        let pool = self.pool.clone();
        let scope_id = scope_id.to_string();
        let rows = stream! {
            let sql = format!("SELECT {SLOT_COLUMNS} FROM schedule_slots WHERE scope_id = $1");
            let mut cursor = sqlx::query_as::<_, SlotRecord>(&sql)
                .bind(scope_id)
                .fetch(&pool);
            while let Some(row) = cursor.next().await {
                yield row.map_err(backend).and_then(SlotRecord::to_domain);
            }
        };
        Ok(Box::pin(rows))
    }

    async fn find_conflicts(
        &self,
        scope_id: &str,
        position: Position,
        time: TimeSlot,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<Vec<ScheduleSlot>> {
        let sql = format!(
            "SELECT {SLOT_COLUMNS} FROM schedule_slots \
             WHERE scope_id = $1 AND granularity = $2 AND day_position = $3 AND time_slot = $4 \
             AND ($5::uuid IS NULL OR id <> $5)"
        );
        let records = sqlx::query_as::<_, SlotRecord>(&sql)
            .bind(scope_id)
            .bind(position.granularity().as_str())
            .bind(position.label())
            .bind(time.to_string())
            .bind(exclude_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        records.into_iter().map(SlotRecord::to_domain).collect()
    }
}

//=========================================================================================
// `AttendanceStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AttendanceStore for DbAdapter {
    async fn upsert(&self, entry: AttendanceEntry) -> StoreResult<AttendanceRecord> {
        let record = sqlx::query_as::<_, AttendanceRow>(
            "INSERT INTO attendance_records \
             (subject_id, scope_id, date, status, reason, category, recorded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (subject_id, scope_id, date) DO UPDATE SET \
             status = EXCLUDED.status, reason = EXCLUDED.reason, \
             category = EXCLUDED.category, recorded_at = EXCLUDED.recorded_at \
             RETURNING subject_id, scope_id, date, status, reason, category, recorded_at",
        )
        .bind(&entry.subject_id)
        .bind(&entry.scope_id)
        .bind(entry.date)
        .bind(entry.status.as_str())
        .bind(&entry.reason)
        .bind(&entry.category)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        record.to_domain()
    }

    async fn query_range(
        &self,
        scope_id: &str,
        query: &AttendanceQuery,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            "SELECT subject_id, scope_id, date, status, reason, category, recorded_at \
             FROM attendance_records \
             WHERE scope_id = $1 \
             AND ($2::text IS NULL OR subject_id = $2) \
             AND ($3::date IS NULL OR date = $3) \
             ORDER BY date, subject_id",
        )
        .bind(scope_id)
        .bind(&query.subject_id)
        .bind(query.date)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(AttendanceRow::to_domain).collect()
    }
}
