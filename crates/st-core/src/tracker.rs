//! Wiring between the timer, the subject registry, and the session store.

use chrono::{DateTime, TimeZone};

use crate::report::{ReportRow, Window, generate_report};
use crate::session::{SessionDetails, SessionStore, StudySession};
use crate::storage::{Storage, StoreError};
use crate::subject::SubjectRegistry;
use crate::timer::TimerEngine;

/// The study tracker: durable subjects and sessions plus one live timer.
///
/// Completed timer runs are appended to the session store as part of
/// [`Tracker::stop`]. Timer state itself is never persisted.
#[derive(Debug)]
pub struct Tracker<S: Storage> {
    storage: S,
    subjects: SubjectRegistry,
    sessions: SessionStore,
    timer: TimerEngine,
}

impl<S: Storage> Tracker<S> {
    /// Loads subjects and sessions from `storage`.
    ///
    /// Never fails; unusable stored data starts empty.
    pub fn open(storage: S) -> Self {
        let subjects = SubjectRegistry::load(&storage);
        let sessions = SessionStore::load(&storage);
        tracing::debug!(
            subjects = subjects.len(),
            sessions = sessions.len(),
            "tracker loaded"
        );
        Self {
            storage,
            subjects,
            sessions,
            timer: TimerEngine::new(),
        }
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }

    pub const fn subjects(&self) -> &SubjectRegistry {
        &self.subjects
    }

    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub const fn timer(&self) -> &TimerEngine {
        &self.timer
    }

    /// Mutable access for start/pause/reset/tick and observer registration.
    pub const fn timer_mut(&mut self) -> &mut TimerEngine {
        &mut self.timer
    }

    /// Adds a subject; see [`SubjectRegistry::add`].
    pub fn add_subject(&mut self, name: &str) -> Result<bool, StoreError> {
        self.subjects.add(&self.storage, name)
    }

    /// Stops the timer and records the session, if any time was tracked.
    ///
    /// On a failed write the session stays in memory and the error is
    /// returned.
    pub fn stop(&mut self, details: SessionDetails) -> Result<Option<StudySession>, StoreError> {
        let Some(session) = self.timer.stop(details) else {
            return Ok(None);
        };
        tracing::info!(
            subject = session.subject.as_str(),
            duration = session.duration,
            "recording study session"
        );
        self.sessions.append(&self.storage, session.clone())?;
        Ok(Some(session))
    }

    /// Totals per known subject for `window`, relative to `now`.
    pub fn report<Tz: TimeZone>(&self, window: Window, now: &DateTime<Tz>) -> Vec<ReportRow> {
        generate_report(self.sessions.all(), self.subjects.list(), window, now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::storage::testing::BrokenStorage;
    use crate::storage::{MemoryStorage, SESSIONS_KEY};
    use crate::timer::Phase;

    fn run_for(tracker: &mut Tracker<impl Storage>, subject: &str, secs: i64) {
        let start = Utc::now() - Duration::seconds(secs);
        tracker.timer_mut().start(subject, start);
        for s in 1..=secs {
            if let Some(token) = tracker.timer().scheduled_tick() {
                tracker.timer_mut().tick(token, start + Duration::seconds(s));
            }
        }
    }

    #[test]
    fn stop_appends_exactly_one_session() {
        let mut tracker = Tracker::open(MemoryStorage::new());
        tracker.add_subject("Math").unwrap();
        run_for(&mut tracker, "Math", 130);

        let session = tracker.stop(SessionDetails::default()).unwrap().unwrap();

        assert_eq!(session.duration, 130);
        assert_eq!(tracker.sessions().len(), 1);
        assert_eq!(tracker.timer().phase(), Phase::Idle);

        let rows = tracker.report(Window::Day, &session.started_at);
        assert_eq!(rows[0].total_minutes, 2);
    }

    #[test]
    fn stop_without_elapsed_appends_nothing() {
        let mut tracker = Tracker::open(MemoryStorage::new());
        tracker.timer_mut().start("Math", Utc::now());

        assert!(tracker.stop(SessionDetails::default()).unwrap().is_none());
        assert!(tracker.sessions().is_empty());
        assert_eq!(tracker.storage().get(SESSIONS_KEY), None);
    }

    #[test]
    fn reset_never_records() {
        let mut tracker = Tracker::open(MemoryStorage::new());
        run_for(&mut tracker, "Math", 10);
        tracker.timer_mut().reset();

        assert!(tracker.stop(SessionDetails::default()).unwrap().is_none());
        assert!(tracker.sessions().is_empty());
    }

    #[test]
    fn reopen_restores_subjects_and_sessions() {
        let storage = MemoryStorage::new();
        let mut tracker = Tracker::open(storage);
        tracker.add_subject("Math").unwrap();
        tracker.add_subject("Art").unwrap();
        run_for(&mut tracker, "Art", 45);
        tracker.stop(SessionDetails::default()).unwrap();

        let Tracker {
            storage,
            subjects,
            sessions,
            ..
        } = tracker;
        let reopened = Tracker::open(storage);

        assert_eq!(reopened.subjects(), &subjects);
        assert_eq!(reopened.sessions(), &sessions);
        assert_eq!(reopened.timer().phase(), Phase::Idle);
    }

    #[test]
    fn stop_surfaces_write_failure() {
        let mut tracker = Tracker::open(BrokenStorage);
        run_for(&mut tracker, "Math", 5);

        assert!(tracker.stop(SessionDetails::default()).is_err());
        assert_eq!(tracker.sessions().len(), 1);
        assert_eq!(tracker.timer().phase(), Phase::Idle);
    }
}
