//! Study tracker CLI library.
//!
//! This crate provides the CLI interface for the study tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, SessionsAction, SubjectsAction, TimerArgs};
pub use config::Config;
