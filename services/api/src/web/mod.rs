pub mod attendance;
pub mod slots;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary
// that builds the web server router.
pub use attendance::{
    commit_sheet_handler, list_attendance_handler, mark_attendance_handler, stats_handler,
};
pub use slots::{create_slot_handler, list_slots_handler, update_slot_handler};
