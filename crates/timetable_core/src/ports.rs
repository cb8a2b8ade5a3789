//! crates/timetable_core/src/ports.rs
//!
//! Defines the persistent-store contracts (traits) for the engine.
//! These traits form the boundary of the hexagonal architecture: any
//! backing store (key-value, relational, or document) that satisfies
//! these signatures can host the engine.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::Stream;
use uuid::Uuid;

use crate::domain::{AttendanceEntry, AttendanceRecord, NewScheduleSlot, ScheduleSlot};
use crate::position::{Position, TimeSlot};

//=========================================================================================
// Store Error and Result Types
//=========================================================================================

/// Failures surfaced by a store implementation.
///
/// `Backend` is deliberately opaque: transient store trouble (network,
/// serialization) is the caller's to retry. The engine never retries
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A convenience type alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// A finite stream of slots. Each `list_by_scope` call produces a
/// fresh sequence, so callers may restart by calling again.
pub type SlotStream = Pin<Box<dyn Stream<Item = StoreResult<ScheduleSlot>> + Send>>;

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Persists a new slot, assigning its id and both timestamps.
    /// A dumb write: occupancy conflicts are the resolver's business.
    async fn insert(&self, slot: NewScheduleSlot) -> StoreResult<ScheduleSlot>;

    /// Replaces the fields of an existing slot in place (same id) and
    /// bumps `updated_at`. `NotFound` when the id is unknown.
    async fn update(&self, id: Uuid, slot: NewScheduleSlot) -> StoreResult<ScheduleSlot>;

    /// All slots owned by a scope, in no particular order.
    async fn list_by_scope(&self, scope_id: &str) -> StoreResult<SlotStream>;

    /// All slots occupying the `(scope, granularity, position, time)`
    /// tuple, minus the slot named by `exclude_id`, so an edit does
    /// not collide with its own prior version.
    async fn find_conflicts(
        &self,
        scope_id: &str,
        position: Position,
        time: TimeSlot,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<Vec<ScheduleSlot>>;
}

/// Filters for an attendance range query. `date` alone reads one day's
/// sheet, `subject_id` alone reads one subject's history, and neither
/// reads the scope's entire history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceQuery {
    pub subject_id: Option<String>,
    pub date: Option<NaiveDate>,
}

#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Writes a record at its `(subject, scope, date)` key, overwriting
    /// any previous value (last write wins, no concurrency token) and
    /// stamping `recorded_at` with the time of the call.
    async fn upsert(&self, entry: AttendanceEntry) -> StoreResult<AttendanceRecord>;

    /// Records in a scope matching the query filters.
    async fn query_range(
        &self,
        scope_id: &str,
        query: &AttendanceQuery,
    ) -> StoreResult<Vec<AttendanceRecord>>;
}
