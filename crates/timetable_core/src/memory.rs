//! crates/timetable_core/src/memory.rs
//!
//! In-memory implementations of the store ports. The test suite runs on
//! these, and embedders can use them to host the engine without a
//! database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::stream;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{AttendanceEntry, AttendanceRecord, NewScheduleSlot, ScheduleSlot};
use crate::ports::{
    AttendanceQuery, AttendanceStore, SlotStore, SlotStream, StoreError, StoreResult,
};
use crate::position::{Position, TimeSlot};

/// A `SlotStore` backed by a locked map.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<Uuid, ScheduleSlot>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn insert(&self, slot: NewScheduleSlot) -> StoreResult<ScheduleSlot> {
        let now = Utc::now();
        let stored = ScheduleSlot {
            id: Uuid::new_v4(),
            scope_id: slot.scope_id,
            position: slot.position,
            time: slot.time,
            category: slot.category,
            session: slot.session,
            trainer_ref: slot.trainer_ref,
            participants: slot.participants,
            created_at: now,
            updated_at: now,
        };
        self.slots.write().await.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: Uuid, slot: NewScheduleSlot) -> StoreResult<ScheduleSlot> {
        let mut slots = self.slots.write().await;
        let existing = slots
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("slot {id}")))?;
        existing.scope_id = slot.scope_id;
        existing.position = slot.position;
        existing.time = slot.time;
        existing.category = slot.category;
        existing.session = slot.session;
        existing.trainer_ref = slot.trainer_ref;
        existing.participants = slot.participants;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn list_by_scope(&self, scope_id: &str) -> StoreResult<SlotStream> {
        let matching: Vec<StoreResult<ScheduleSlot>> = self
            .slots
            .read()
            .await
            .values()
            .filter(|slot| slot.scope_id == scope_id)
            .cloned()
            .map(Ok)
            .collect();
        Ok(Box::pin(stream::iter(matching)))
    }

    async fn find_conflicts(
        &self,
        scope_id: &str,
        position: Position,
        time: TimeSlot,
        exclude_id: Option<Uuid>,
    ) -> StoreResult<Vec<ScheduleSlot>> {
        let slots = self.slots.read().await;
        Ok(slots
            .values()
            .filter(|slot| {
                slot.scope_id == scope_id
                    && slot.position == position
                    && slot.time == time
                    && Some(slot.id) != exclude_id
            })
            .cloned()
            .collect())
    }
}

type AttendanceKey = (String, String, NaiveDate);

/// An `AttendanceStore` backed by a locked map keyed on
/// `(scope, subject, date)`.
#[derive(Debug, Default)]
pub struct MemoryAttendanceStore {
    records: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn upsert(&self, entry: AttendanceEntry) -> StoreResult<AttendanceRecord> {
        let record = AttendanceRecord {
            subject_id: entry.subject_id,
            scope_id: entry.scope_id,
            date: entry.date,
            status: entry.status,
            reason: entry.reason,
            category: entry.category,
            recorded_at: Utc::now(),
        };
        let key = (
            record.scope_id.clone(),
            record.subject_id.clone(),
            record.date,
        );
        self.records.write().await.insert(key, record.clone());
        Ok(record)
    }

    async fn query_range(
        &self,
        scope_id: &str,
        query: &AttendanceQuery,
    ) -> StoreResult<Vec<AttendanceRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<AttendanceRecord> = records
            .values()
            .filter(|record| {
                record.scope_id == scope_id
                    && query
                        .subject_id
                        .as_ref()
                        .is_none_or(|subject| &record.subject_id == subject)
                    && query.date.is_none_or(|date| record.date == date)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| (a.date, &a.subject_id).cmp(&(b.date, &b.subject_id)));
        Ok(matching)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttendanceStatus, SessionBand};
    use crate::position::Granularity;
    use futures::TryStreamExt;

    fn slot(scope: &str, time: &str) -> NewScheduleSlot {
        NewScheduleSlot {
            scope_id: scope.to_string(),
            position: Position::parse(Granularity::Weekly, "Monday").unwrap(),
            time: TimeSlot::parse(time).unwrap(),
            category: "Karate".to_string(),
            session: SessionBand::Morning,
            trainer_ref: "t1".to_string(),
            participants: ["s1".to_string()].into_iter().collect(),
        }
    }

    fn entry(subject: &str, day: u32) -> AttendanceEntry {
        AttendanceEntry {
            subject_id: subject.to_string(),
            scope_id: "inst-1".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            status: AttendanceStatus::Present,
            reason: None,
            category: None,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamps() {
        let store = MemorySlotStore::new();
        let stored = store.insert(slot("inst-1", "09:00")).await.unwrap();
        assert_eq!(stored.created_at, stored.updated_at);

        let listed: Vec<ScheduleSlot> = store
            .list_by_scope("inst-1")
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(listed, vec![stored]);
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let store = MemorySlotStore::new();
        let err = store.update(Uuid::new_v4(), slot("inst-1", "09:00")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_keeps_id_and_creation_time() {
        let store = MemorySlotStore::new();
        let stored = store.insert(slot("inst-1", "09:00")).await.unwrap();
        let updated = store.update(stored.id, slot("inst-1", "10:00")).await.unwrap();
        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.created_at, stored.created_at);
        assert_eq!(updated.time, TimeSlot::parse("10:00").unwrap());
    }

    #[tokio::test]
    async fn list_by_scope_is_restartable_and_scoped() {
        let store = MemorySlotStore::new();
        store.insert(slot("inst-1", "09:00")).await.unwrap();
        store.insert(slot("inst-2", "09:00")).await.unwrap();

        for _ in 0..2 {
            let listed: Vec<ScheduleSlot> = store
                .list_by_scope("inst-1")
                .await
                .unwrap()
                .try_collect()
                .await
                .unwrap();
            assert_eq!(listed.len(), 1);
            assert_eq!(listed[0].scope_id, "inst-1");
        }
    }

    #[tokio::test]
    async fn find_conflicts_matches_the_cell_and_honors_exclusion() {
        let store = MemorySlotStore::new();
        let stored = store.insert(slot("inst-1", "09:00")).await.unwrap();
        store.insert(slot("inst-1", "10:00")).await.unwrap();

        let position = Position::parse(Granularity::Weekly, "Monday").unwrap();
        let time = TimeSlot::parse("09:00").unwrap();

        let hits = store.find_conflicts("inst-1", position, time, None).await.unwrap();
        assert_eq!(hits.len(), 1);

        let excluded = store
            .find_conflicts("inst-1", position, time, Some(stored.id))
            .await
            .unwrap();
        assert!(excluded.is_empty());
    }

    #[tokio::test]
    async fn upsert_is_idempotent_per_key() {
        let store = MemoryAttendanceStore::new();
        store.upsert(entry("s1", 1)).await.unwrap();
        let mut second = entry("s1", 1);
        second.status = AttendanceStatus::Absent;
        store.upsert(second).await.unwrap();

        let records = store
            .query_range("inst-1", &AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        // Last write wins.
        assert_eq!(records[0].status, AttendanceStatus::Absent);
    }

    #[tokio::test]
    async fn query_range_filters_by_subject_and_date() {
        let store = MemoryAttendanceStore::new();
        store.upsert(entry("s1", 1)).await.unwrap();
        store.upsert(entry("s1", 2)).await.unwrap();
        store.upsert(entry("s2", 1)).await.unwrap();

        let all = store
            .query_range("inst-1", &AttendanceQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let by_subject = store
            .query_range(
                "inst-1",
                &AttendanceQuery {
                    subject_id: Some("s1".to_string()),
                    date: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(by_subject.len(), 2);

        let by_date = store
            .query_range(
                "inst-1",
                &AttendanceQuery {
                    subject_id: None,
                    date: NaiveDate::from_ymd_opt(2025, 6, 1),
                },
            )
            .await
            .unwrap();
        assert_eq!(by_date.len(), 2);

        let other_scope = store
            .query_range("inst-2", &AttendanceQuery::default())
            .await
            .unwrap();
        assert!(other_scope.is_empty());
    }
}
