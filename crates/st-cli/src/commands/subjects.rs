//! Subjects command for registering and listing subjects.

use std::io::Write;

use anyhow::{Context, Result};
use st_core::{Storage, Subject, Tracker};

/// Registers `name`, reporting whether anything changed.
pub fn add<W: Write, S: Storage>(writer: &mut W, tracker: &mut Tracker<S>, name: &str) -> Result<()> {
    let added = tracker
        .add_subject(name)
        .with_context(|| format!("failed to save subject {name:?}"))?;

    if added {
        writeln!(writer, "Added subject: {name}")?;
    } else if name.is_empty() {
        writeln!(writer, "Subject name cannot be empty.")?;
    } else {
        writeln!(writer, "Subject already exists: {name}")?;
    }
    Ok(())
}

/// Lists registered subjects in the order they were added.
pub fn list<W: Write, S: Storage>(writer: &mut W, tracker: &Tracker<S>, json: bool) -> Result<()> {
    let subjects = tracker.subjects().list();

    if json {
        let names: Vec<&str> = subjects.iter().map(Subject::as_str).collect();
        writeln!(writer, "{}", serde_json::to_string_pretty(&names)?)?;
        return Ok(());
    }

    if subjects.is_empty() {
        writeln!(writer, "No subjects registered.")?;
        return Ok(());
    }
    for subject in subjects {
        writeln!(writer, "{subject}")?;
    }
    Ok(())
}
