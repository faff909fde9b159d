//! Report command for per-subject study totals.
//!
//! This module implements `st report` with a window selector
//! (day, week, month, all) and output formats (human-readable, JSON).

use std::fmt::Write;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;
use st_core::{ReportRow, Storage, Tracker, Window};

/// Computed report data.
#[derive(Debug)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    pub window: Window,
    pub timezone: String,
    pub rows: Vec<ReportRow>,
}

impl ReportData {
    pub fn total_minutes(&self) -> u64 {
        self.rows.iter().map(|r| r.total_minutes).sum()
    }
}

// ========== Duration Formatting ==========

/// Formats minutes as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let minutes = minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: u64, max: u64) -> String {
    if max == 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

/// Generates report data for `window` relative to `now`.
pub fn generate_report_data<S: Storage, Tz: TimeZone>(
    tracker: &Tracker<S>,
    window: Window,
    now: &DateTime<Tz>,
) -> ReportData {
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());

    ReportData {
        generated_at: now.with_timezone(&Utc),
        window,
        timezone,
        rows: tracker.report(window, now),
    }
}

fn window_description(window: Window) -> &'static str {
    match window {
        Window::Day => "Today",
        Window::Week => "Last 7 days",
        Window::Month => "This month",
        Window::All => "All time",
    }
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> String {
    let mut output = String::new();

    writeln!(output, "STUDY REPORT: {}", window_description(data.window)).unwrap();
    writeln!(output).unwrap();

    if data.rows.is_empty() {
        writeln!(output, "No subjects registered.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: Run 'st subjects add <name>' to create one.").unwrap();
        return output;
    }

    let max = data.rows.iter().map(|r| r.total_minutes).max().unwrap_or(0);
    for row in &data.rows {
        writeln!(
            output,
            "{:<20} {:>7}  {}",
            row.subject.as_str(),
            format_minutes(row.total_minutes),
            progress_bar(row.total_minutes, max)
        )
        .unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "Total studied: {}", format_minutes(data.total_minutes())).unwrap();

    output
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: String,
    pub timezone: &'a str,
    pub window: Window,
    pub rows: &'a [ReportRow],
    pub total_minutes: u64,
}

/// Formats report data as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: &data.timezone,
        window: data.window,
        rows: &data.rows,
        total_minutes: data.total_minutes(),
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: std::io::Write, S: Storage>(
    writer: &mut W,
    tracker: &Tracker<S>,
    selector: &str,
    json: bool,
) -> Result<()> {
    let window = Window::from_selector(selector);
    if window.as_str() != selector {
        tracing::debug!(selector, "unrecognized report window, using all");
    }

    let data = generate_report_data(tracker, window, &Local::now());

    if json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data))?;
    }

    Ok(())
}
