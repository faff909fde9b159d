//! Status command for summarizing stored data.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Local;
use st_core::{Storage, Tracker, Window};

use super::report::format_minutes;

pub fn run<W: Write, S: Storage>(writer: &mut W, tracker: &Tracker<S>, database_path: &Path) -> Result<()> {
    let today: u64 = tracker
        .report(Window::Day, &Local::now())
        .iter()
        .map(|row| row.total_minutes)
        .sum();

    writeln!(writer, "Study tracker status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "Subjects: {}", tracker.subjects().len())?;
    writeln!(writer, "Sessions: {}", tracker.sessions().len())?;
    writeln!(writer, "Today:    {}", format_minutes(today))?;

    Ok(())
}
