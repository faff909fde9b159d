//! Session timer state machine.
//!
//! The engine is driven from outside: callers invoke [`TimerEngine::tick`]
//! roughly once per second while a tick is scheduled. Elapsed time is always
//! recomputed from the wall-clock delta since the (shifted) start timestamp,
//! so irregular tick delivery never accumulates drift.
//!
//! # Tick cancellation
//!
//! Entering `Running` schedules a tick and hands out a [`TickToken`]. Every
//! transition away from `Running` drops the token, and [`TimerEngine::tick`]
//! ignores any token that is not the currently scheduled one. A tick queued
//! before a pause or reset therefore cannot touch the state afterwards.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::session::{SessionDetails, StudySession};
use crate::types::Subject;

/// Ceiling on a single session: 25 minutes.
pub const SESSION_CAP_SECS: u64 = 25 * 60;

/// Timer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }
}

/// Handle for the currently scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickToken(u64);

/// Snapshot of the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub phase: Phase,
    pub active_subject: Option<Subject>,
    pub elapsed_secs: u64,
    /// Wall-clock start, shifted back by time accumulated before a resume.
    pub session_start: Option<DateTime<Utc>>,
}

impl TimerState {
    const fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            active_subject: None,
            elapsed_secs: 0,
            session_start: None,
        }
    }

    /// Seconds left before the cap.
    pub const fn remaining_secs(&self) -> u64 {
        SESSION_CAP_SECS.saturating_sub(self.elapsed_secs)
    }
}

/// Why the timer stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    User,
    CapReached,
}

/// Notification sent to observers after each transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Started { subject: Subject, elapsed_secs: u64 },
    Ticked { elapsed_secs: u64 },
    Paused { elapsed_secs: u64, reason: PauseReason },
    Reset,
    Stopped { session: Option<StudySession> },
}

/// Receives [`TimerEvent`]s, e.g. to refresh a display.
pub trait TimerObserver {
    fn on_event(&mut self, event: &TimerEvent);
}

impl<F: FnMut(&TimerEvent)> TimerObserver for F {
    fn on_event(&mut self, event: &TimerEvent) {
        self(event);
    }
}

/// Drives one study session at a time.
pub struct TimerEngine {
    state: TimerState,
    scheduled: Option<TickToken>,
    next_token: u64,
    observers: Vec<Box<dyn TimerObserver>>,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("scheduled", &self.scheduled)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for TimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEngine {
    pub const fn new() -> Self {
        Self {
            state: TimerState::idle(),
            scheduled: None,
            next_token: 0,
            observers: Vec::new(),
        }
    }

    pub const fn state(&self) -> &TimerState {
        &self.state
    }

    pub const fn phase(&self) -> Phase {
        self.state.phase
    }

    pub const fn elapsed_secs(&self) -> u64 {
        self.state.elapsed_secs
    }

    /// The tick the driver should deliver next, if the timer is running.
    pub const fn scheduled_tick(&self) -> Option<TickToken> {
        self.scheduled
    }

    /// Registers an observer for all subsequent transitions.
    pub fn subscribe(&mut self, observer: impl TimerObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Starts or resumes timing `subject`.
    ///
    /// Ignored when `subject` is empty, when already running, or when the cap
    /// has been reached. Resuming keeps the elapsed time accumulated so far.
    pub fn start(&mut self, subject: &str, now: DateTime<Utc>) -> bool {
        if self.state.phase == Phase::Running {
            tracing::debug!("start ignored: timer already running");
            return false;
        }
        let Ok(subject) = Subject::new(subject) else {
            tracing::debug!("start ignored: no subject selected");
            return false;
        };
        if self.state.elapsed_secs >= SESSION_CAP_SECS {
            tracing::debug!("start ignored: session cap reached");
            return false;
        }

        let elapsed = i64::try_from(self.state.elapsed_secs).unwrap_or(i64::MAX);
        self.state.session_start = Some(now - Duration::seconds(elapsed));
        self.state.active_subject = Some(subject.clone());
        self.state.phase = Phase::Running;
        self.scheduled = Some(self.schedule_tick());

        self.notify(&TimerEvent::Started {
            subject,
            elapsed_secs: self.state.elapsed_secs,
        });
        true
    }

    /// Recomputes elapsed time for a scheduled tick.
    ///
    /// Stale tokens are ignored. Reaching the cap pauses the timer.
    pub fn tick(&mut self, token: TickToken, now: DateTime<Utc>) -> bool {
        if self.scheduled != Some(token) {
            tracing::trace!(?token, "stale tick ignored");
            return false;
        }
        let Some(start) = self.state.session_start else {
            return false;
        };

        let elapsed = u64::try_from((now - start).num_seconds()).unwrap_or(0);
        self.state.elapsed_secs = elapsed.min(SESSION_CAP_SECS);
        self.notify(&TimerEvent::Ticked {
            elapsed_secs: self.state.elapsed_secs,
        });

        if self.state.elapsed_secs >= SESSION_CAP_SECS {
            self.scheduled = None;
            self.state.phase = Phase::Paused;
            tracing::debug!("session cap reached, pausing");
            self.notify(&TimerEvent::Paused {
                elapsed_secs: self.state.elapsed_secs,
                reason: PauseReason::CapReached,
            });
        }
        true
    }

    /// Pauses a running timer, freezing elapsed time at the last tick.
    pub fn pause(&mut self) -> bool {
        if self.state.phase != Phase::Running {
            tracing::debug!(phase = self.state.phase.as_str(), "pause ignored");
            return false;
        }
        self.scheduled = None;
        self.state.phase = Phase::Paused;
        self.notify(&TimerEvent::Paused {
            elapsed_secs: self.state.elapsed_secs,
            reason: PauseReason::User,
        });
        true
    }

    /// Discards the current run and returns to `Idle`.
    ///
    /// The selected subject is kept.
    pub fn reset(&mut self) {
        self.clear();
        self.notify(&TimerEvent::Reset);
    }

    /// Ends the current run.
    ///
    /// Returns the completed session if any time was recorded, then resets.
    pub fn stop(&mut self, details: SessionDetails) -> Option<StudySession> {
        self.scheduled = None;
        let session = match (&self.state.active_subject, self.state.session_start) {
            (Some(subject), Some(started_at)) if self.state.elapsed_secs > 0 => Some(
                StudySession::new(subject.clone(), self.state.elapsed_secs, started_at, details),
            ),
            _ => None,
        };
        self.clear();
        self.notify(&TimerEvent::Stopped {
            session: session.clone(),
        });
        session
    }

    fn clear(&mut self) {
        self.scheduled = None;
        self.state.phase = Phase::Idle;
        self.state.elapsed_secs = 0;
        self.state.session_start = None;
    }

    fn schedule_tick(&mut self) -> TickToken {
        self.next_token += 1;
        TickToken(self.next_token)
    }

    fn notify(&mut self, event: &TimerEvent) {
        for observer in &mut self.observers {
            observer.on_event(event);
        }
    }
}

/// Formats seconds as zero-padded `MM:SS`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
