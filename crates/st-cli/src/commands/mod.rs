//! CLI subcommand implementations.

pub mod report;
pub mod sessions;
pub mod status;
pub mod subjects;
pub mod timer;
