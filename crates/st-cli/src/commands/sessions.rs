//! Sessions command for browsing recorded study sessions.

use std::fmt::{Display, Write as _};
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use st_core::{Storage, StudySession, Tracker};

/// Formats a session as a single list line.
///
/// `<n>. <YYYY-MM-DD HH:MM> - <subject> (<minutes> minutes)`
pub fn format_session_line<Tz>(number: usize, session: &StudySession, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let started = session.started_at.with_timezone(tz).format("%Y-%m-%d %H:%M");
    format!(
        "{number}. {started} - {} ({} minutes)",
        session.subject,
        session.minutes()
    )
}

/// Formats the full detail view of a session.
pub fn format_session_detail<Tz>(session: &StudySession, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut output = String::new();
    let started = session.started_at.with_timezone(tz).format("%Y-%m-%d %H:%M");

    writeln!(output, "{} - {started}", session.subject).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "Duration: {} minutes", session.minutes()).unwrap();
    writeln!(output, "Notes:    {}", or_placeholder(&session.notes, "No notes added")).unwrap();

    if session.links.is_empty() {
        writeln!(output, "Links:    No links added").unwrap();
    } else {
        writeln!(output, "Links:").unwrap();
        for link in &session.links {
            writeln!(output, "  - {link}").unwrap();
        }
    }

    writeln!(
        output,
        "Footnote: {}",
        or_placeholder(&session.footnote, "No footnote added")
    )
    .unwrap();

    if !session.images.is_empty() {
        writeln!(output, "Images:").unwrap();
        for (i, url) in session.images.iter().enumerate() {
            writeln!(output, "  {}. {url}", i + 1).unwrap();
        }
    }

    output
}

const fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

/// Lists all sessions, oldest first.
pub fn list<W: Write, S: Storage>(writer: &mut W, tracker: &Tracker<S>, json: bool) -> Result<()> {
    let sessions = tracker.sessions().all();

    if json {
        let output = serde_json::to_string_pretty(sessions)?;
        writeln!(writer, "{output}")?;
        return Ok(());
    }

    if sessions.is_empty() {
        writeln!(writer, "No study sessions recorded.")?;
        return Ok(());
    }

    for (i, session) in sessions.iter().enumerate() {
        writeln!(writer, "{}", format_session_line(i + 1, session, &Local))?;
    }
    Ok(())
}

/// Shows one session by its 1-based number.
pub fn show<W: Write, S: Storage>(writer: &mut W, tracker: &Tracker<S>, number: usize) -> Result<()> {
    let session = number
        .checked_sub(1)
        .and_then(|index| tracker.sessions().get(index))
        .with_context(|| {
            format!(
                "no session #{number} ({} recorded)",
                tracker.sessions().len()
            )
        })?;

    write!(writer, "{}", format_session_detail(session, &Local))?;
    Ok(())
}
