//! services/api/src/web/slots.rs
//!
//! Contains the Axum handlers for the timetable endpoints: placing,
//! editing, and listing schedule slots.

use std::collections::BTreeSet;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use timetable_core::domain::{NewScheduleSlot, ScheduleSlot, SessionBand};
use timetable_core::position::{Granularity, Position, TimeSlot};
use timetable_core::resolver::{propose, Decision};
use uuid::Uuid;

use crate::error::store_error_response;
use crate::web::state::AppState;

//=========================================================================================
// API Payload and Response Structs
//=========================================================================================

/// The client's shape of a slot create/edit request.
#[derive(Debug, Deserialize)]
pub struct SlotPayload {
    pub granularity: String,
    pub position: String,
    pub time: String,
    pub category: String,
    pub session: String,
    pub trainer_ref: String,
    pub participants: Vec<String>,
}

/// A slot as returned to clients.
#[derive(Debug, Serialize)]
pub struct SlotResponse {
    pub id: Uuid,
    pub scope_id: String,
    pub granularity: String,
    pub position: String,
    pub time: String,
    pub category: String,
    pub session: String,
    pub trainer_ref: String,
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ScheduleSlot> for SlotResponse {
    fn from(slot: ScheduleSlot) -> Self {
        Self {
            id: slot.id,
            scope_id: slot.scope_id,
            granularity: slot.position.granularity().to_string(),
            position: slot.position.label(),
            time: slot.time.to_string(),
            category: slot.category,
            session: slot.session.to_string(),
            trainer_ref: slot.trainer_ref,
            participants: slot.participants.into_iter().collect(),
            created_at: slot.created_at,
            updated_at: slot.updated_at,
        }
    }
}

impl SlotPayload {
    /// Parses and checks the payload into a store-ready candidate. The
    /// resolver only judges occupancy, so the field-level checks (a
    /// non-empty roster, category, and trainer) happen here.
    fn into_candidate(self, scope_id: String) -> Result<NewScheduleSlot, (StatusCode, String)> {
        let bad = |msg: String| (StatusCode::UNPROCESSABLE_ENTITY, msg);

        let granularity = Granularity::parse(&self.granularity).map_err(|e| bad(e.to_string()))?;
        let position =
            Position::parse(granularity, &self.position).map_err(|e| bad(e.to_string()))?;
        let time = TimeSlot::parse(&self.time).map_err(|e| bad(e.to_string()))?;
        let session = SessionBand::parse(&self.session)
            .ok_or_else(|| bad(format!("'{}' is not a valid session", self.session)))?;

        if self.category.trim().is_empty() {
            return Err(bad("category must not be empty".to_string()));
        }
        if self.trainer_ref.trim().is_empty() {
            return Err(bad("trainer_ref must not be empty".to_string()));
        }
        let participants: BTreeSet<String> = self
            .participants
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        if participants.is_empty() {
            return Err(bad("at least one participant is required".to_string()));
        }

        Ok(NewScheduleSlot {
            scope_id,
            position,
            time,
            category: self.category,
            session,
            trainer_ref: self.trainer_ref,
            participants,
        })
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Create a slot inside a scope, provided its calendar cell is free.
pub async fn create_slot_handler(
    State(app_state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
    Json(payload): Json<SlotPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let candidate = payload.into_candidate(scope_id)?;

    match propose(app_state.slots.as_ref(), &candidate, None)
        .await
        .map_err(store_error_response)?
    {
        Decision::Reject(conflict) => Err((StatusCode::CONFLICT, conflict.to_string())),
        Decision::Accept => {
            let slot = app_state
                .slots
                .insert(candidate)
                .await
                .map_err(store_error_response)?;
            Ok((StatusCode::CREATED, Json(SlotResponse::from(slot))))
        }
    }
}

/// Edit a slot in place. The slot's own prior version is excluded from
/// the conflict check so an unchanged cell never rejects itself.
pub async fn update_slot_handler(
    State(app_state): State<Arc<AppState>>,
    Path((scope_id, slot_id)): Path<(String, Uuid)>,
    Json(payload): Json<SlotPayload>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let candidate = payload.into_candidate(scope_id)?;

    match propose(app_state.slots.as_ref(), &candidate, Some(slot_id))
        .await
        .map_err(store_error_response)?
    {
        Decision::Reject(conflict) => Err((StatusCode::CONFLICT, conflict.to_string())),
        Decision::Accept => {
            let slot = app_state
                .slots
                .update(slot_id, candidate)
                .await
                .map_err(store_error_response)?;
            Ok(Json(SlotResponse::from(slot)))
        }
    }
}

/// Every slot owned by a scope.
pub async fn list_slots_handler(
    State(app_state): State<Arc<AppState>>,
    Path(scope_id): Path<String>,
) -> Result<Json<Vec<SlotResponse>>, (StatusCode, String)> {
    let stream = app_state
        .slots
        .list_by_scope(&scope_id)
        .await
        .map_err(store_error_response)?;
    let slots: Vec<ScheduleSlot> = stream.try_collect().await.map_err(store_error_response)?;
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}
