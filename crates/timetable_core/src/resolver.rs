//! crates/timetable_core/src/resolver.rs
//!
//! Gatekeeper for slot creation and edits: decides whether a candidate
//! placement may occupy its day-position/time cell.

use uuid::Uuid;

use crate::domain::{NewScheduleSlot, SessionBand};
use crate::ports::{SlotStore, StoreError};
use crate::position::{Position, TimeSlot};

/// Why a candidate slot was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SlotConflict {
    /// The cell already hosts a slot for the same session band.
    #[error("a {session} session is already scheduled on {position} at {time}")]
    Session {
        position: Position,
        time: TimeSlot,
        session: SessionBand,
    },
    /// The trainer is already booked in this cell under another band.
    #[error("the trainer is already booked on {position} at {time}")]
    Trainer { position: Position, time: TimeSlot },
}

/// The resolver's verdict on a proposed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject(SlotConflict),
}

/// Checks a candidate against every other slot occupying its cell.
///
/// A pure decision over a store snapshot: nothing is written here. On
/// `Accept` the caller performs the `insert` (or, when `exclude_id` was
/// passed for an edit, the `update`). Session occupancy is examined
/// before trainer occupancy, so when both collide the session conflict
/// is the one reported.
///
/// The resolver assumes a well-formed candidate; non-empty participants,
/// category, and trainer are the caller's checks.
pub async fn propose(
    store: &dyn SlotStore,
    candidate: &NewScheduleSlot,
    exclude_id: Option<Uuid>,
) -> Result<Decision, StoreError> {
    let occupants = store
        .find_conflicts(
            &candidate.scope_id,
            candidate.position,
            candidate.time,
            exclude_id,
        )
        .await?;

    if occupants.iter().any(|slot| slot.session == candidate.session) {
        return Ok(Decision::Reject(SlotConflict::Session {
            position: candidate.position,
            time: candidate.time,
            session: candidate.session,
        }));
    }
    if occupants
        .iter()
        .any(|slot| slot.trainer_ref == candidate.trainer_ref)
    {
        return Ok(Decision::Reject(SlotConflict::Trainer {
            position: candidate.position,
            time: candidate.time,
        }));
    }
    Ok(Decision::Accept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySlotStore;
    use crate::position::Granularity;

    fn candidate(session: SessionBand, trainer: &str) -> NewScheduleSlot {
        NewScheduleSlot {
            scope_id: "inst-1".to_string(),
            position: Position::parse(Granularity::Weekly, "Monday").unwrap(),
            time: TimeSlot::parse("09:00").unwrap(),
            category: "Karate".to_string(),
            session,
            trainer_ref: trainer.to_string(),
            participants: ["s1".to_string()].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn rejects_same_session_in_same_cell() {
        let store = MemorySlotStore::new();
        store.insert(candidate(SessionBand::Morning, "t1")).await.unwrap();

        let decision = propose(&store, &candidate(SessionBand::Morning, "t2"), None)
            .await
            .unwrap();
        assert!(matches!(
            decision,
            Decision::Reject(SlotConflict::Session {
                session: SessionBand::Morning,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn rejects_same_trainer_across_bands() {
        let store = MemorySlotStore::new();
        store.insert(candidate(SessionBand::Morning, "t1")).await.unwrap();

        let decision = propose(&store, &candidate(SessionBand::Afternoon, "t1"), None)
            .await
            .unwrap();
        assert!(matches!(
            decision,
            Decision::Reject(SlotConflict::Trainer { .. })
        ));
    }

    #[tokio::test]
    async fn session_conflict_is_reported_before_trainer_conflict() {
        let store = MemorySlotStore::new();
        store.insert(candidate(SessionBand::Morning, "t1")).await.unwrap();

        // Same band AND same trainer: the session conflict wins.
        let decision = propose(&store, &candidate(SessionBand::Morning, "t1"), None)
            .await
            .unwrap();
        assert!(matches!(
            decision,
            Decision::Reject(SlotConflict::Session { .. })
        ));
    }

    #[tokio::test]
    async fn accepts_a_free_cell() {
        let store = MemorySlotStore::new();
        store.insert(candidate(SessionBand::Morning, "t1")).await.unwrap();

        let decision = propose(&store, &candidate(SessionBand::Afternoon, "t2"), None)
            .await
            .unwrap();
        assert_eq!(decision, Decision::Accept);
    }

    #[tokio::test]
    async fn accepts_distinct_cells_for_everything_else() {
        let store = MemorySlotStore::new();
        store.insert(candidate(SessionBand::Morning, "t1")).await.unwrap();

        let mut moved = candidate(SessionBand::Morning, "t1");
        moved.time = TimeSlot::parse("10:00").unwrap();
        assert_eq!(propose(&store, &moved, None).await.unwrap(), Decision::Accept);

        // A monthly position never collides with a weekly one.
        let mut monthly = candidate(SessionBand::Morning, "t1");
        monthly.position = Position::parse(Granularity::Monthly, "1").unwrap();
        assert_eq!(propose(&store, &monthly, None).await.unwrap(), Decision::Accept);
    }

    #[tokio::test]
    async fn editing_a_slot_excludes_its_own_prior_version() {
        let store = MemorySlotStore::new();
        let stored = store.insert(candidate(SessionBand::Morning, "t1")).await.unwrap();

        // Re-proposing the unchanged fields with its own id excluded is
        // always acceptable.
        let decision = propose(&store, &candidate(SessionBand::Morning, "t1"), Some(stored.id))
            .await
            .unwrap();
        assert_eq!(decision, Decision::Accept);
    }
}
