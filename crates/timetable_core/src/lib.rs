pub mod aggregator;
pub mod domain;
pub mod memory;
pub mod ports;
pub mod position;
pub mod reconciler;
pub mod resolver;
pub mod validator;

pub use aggregator::{aggregate, CategoryStats};
pub use domain::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, NewScheduleSlot, ScheduleSlot, SessionBand,
};
pub use ports::{AttendanceQuery, AttendanceStore, SlotStore, SlotStream, StoreError, StoreResult};
pub use position::{Granularity, Position, PositionError, TimeSlot};
pub use reconciler::{CommitError, DraftSheet, RowViolation, SheetRow};
pub use resolver::{propose, Decision, SlotConflict};
pub use validator::{validate_reason, validate_window, AttendanceViolation, ReasonPolicy};
