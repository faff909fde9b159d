//! Per-subject study totals over a time window.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::session::StudySession;
use crate::types::Subject;

/// Length of the rolling `week` window.
pub const WEEK_SECS: i64 = 7 * 24 * 60 * 60;

/// Time window a report covers, relative to the moment it is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// Same local calendar date as now.
    Day,
    /// The last 7×24 hours (rolling, not calendar-aligned).
    Week,
    /// Same local calendar month and year as now.
    Month,
    /// No filtering.
    All,
}

impl Window {
    /// Parses a selector. Unrecognized selectors mean [`Window::All`].
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "day" => Self::Day,
            "week" => Self::Week,
            "month" => Self::Month,
            _ => Self::All,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::All => "all",
        }
    }

    /// Returns true if a session started at `at` falls in this window.
    ///
    /// Calendar comparisons happen in `now`'s timezone.
    pub fn contains<Tz: TimeZone>(self, at: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        match self {
            Self::Day => at.with_timezone(&now.timezone()).date_naive() == now.date_naive(),
            Self::Week => *at >= now.with_timezone(&Utc) - Duration::seconds(WEEK_SECS),
            Self::Month => {
                let local = at.with_timezone(&now.timezone());
                local.year() == now.year() && local.month() == now.month()
            }
            Self::All => true,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Total study time for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub subject: Subject,
    pub total_minutes: u64,
}

/// Converts seconds to whole minutes, rounding half up.
///
/// 130 s is 2 minutes; 150 s is 3 minutes.
pub const fn seconds_to_minutes(secs: u64) -> u64 {
    secs.saturating_add(30) / 60
}

/// Aggregates sessions per subject.
///
/// Emits one row per known subject in registry order, including subjects
/// with no matching sessions. Sessions for unknown subjects are ignored.
/// Durations are summed in seconds before rounding.
pub fn generate_report<Tz: TimeZone>(
    sessions: &[StudySession],
    subjects: &[Subject],
    window: Window,
    now: &DateTime<Tz>,
) -> Vec<ReportRow> {
    let in_window: Vec<&StudySession> = sessions
        .iter()
        .filter(|s| window.contains(&s.started_at, now))
        .collect();

    subjects
        .iter()
        .map(|subject| {
            let total_secs: u64 = in_window
                .iter()
                .filter(|s| s.subject == *subject)
                .map(|s| s.duration)
                .sum();
            ReportRow {
                subject: subject.clone(),
                total_minutes: seconds_to_minutes(total_secs),
            }
        })
        .collect()
}
