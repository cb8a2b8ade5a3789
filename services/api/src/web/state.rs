//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use timetable_core::ports::{AttendanceStore, SlotStore};

use crate::config::Config;

/// The shared application state, created once at startup and passed to
/// all handlers. Both ports are usually the same database adapter, but
/// the handlers only ever see the engine's trait objects.
#[derive(Clone)]
pub struct AppState {
    pub slots: Arc<dyn SlotStore>,
    pub attendance: Arc<dyn AttendanceStore>,
    pub config: Arc<Config>,
}
