//! Core domain logic for the study tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Subjects: the registry of topics a user studies
//! - Sessions: recorded study intervals and their write-through store
//! - Timer: the start/pause/reset/stop state machine with a 25 minute cap
//! - Reports: per-subject totals over day/week/month windows

mod clock;
pub mod report;
pub mod session;
pub mod storage;
pub mod subject;
pub mod timer;
mod tracker;
pub mod types;

pub use clock::{Clock, SystemClock};
pub use report::{ReportRow, Window, generate_report, seconds_to_minutes};
pub use session::{SessionDetails, SessionStore, StudySession, split_list};
pub use storage::{MemoryStorage, SESSIONS_KEY, SUBJECTS_KEY, Storage, StoreError};
pub use subject::SubjectRegistry;
pub use timer::{
    Phase, PauseReason, SESSION_CAP_SECS, TickToken, TimerEngine, TimerEvent, TimerObserver,
    TimerState, format_clock,
};
pub use tracker::Tracker;
pub use types::{Subject, ValidationError};
