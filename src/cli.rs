//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Canvas Tasks - pull Canvas assignments into markdown checklists
///
/// Fetches your courses, modules and assignments from the Canvas LMS API
/// and renders them as a task list you can drop into a note.
///
/// Examples:
///   canvas-tasks --url https://school.instructure.com --token $TOKEN
///   canvas-tasks --source upcoming
///   canvas-tasks --note School.md --insert selection
///   canvas-tasks --url https://school.instructure.com --token $TOKEN --save-config
///   canvas-tasks --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Canvas base URL, e.g. https://school.instructure.com
    #[arg(short, long, value_name = "URL", env = "CANVAS_URL")]
    pub url: Option<String>,

    /// Canvas personal access token
    ///
    /// Generated under Account > Settings > Approved Integrations.
    #[arg(short, long, value_name = "TOKEN", env = "CANVAS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// What to fetch: the module tree or upcoming/missing items
    #[arg(short, long, value_name = "SOURCE")]
    pub source: Option<Source>,

    /// Markdown note to insert the checklist into
    ///
    /// If not specified, the checklist is printed to stdout.
    #[arg(short, long, value_name = "FILE")]
    pub note: Option<PathBuf>,

    /// How to insert into the note (cursor, selection)
    #[arg(short, long, value_name = "MODE")]
    pub insert: Option<InsertMode>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .canvas-tasks.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of module/assignment requests in flight per course
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Write the effective URL, token and settings to the config file and exit
    #[arg(long)]
    pub save_config: bool,

    /// Generate a default .canvas-tasks.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Which Canvas data to render.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Courses, modules and assignments (default)
    #[default]
    Modules,
    /// Upcoming events and missing submissions
    Upcoming,
}

/// Where the checklist goes inside the note.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InsertMode {
    /// At the cursor marker, or appended to the end (default)
    #[default]
    Cursor,
    /// Replace the text between the selection markers
    Selection,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.url {
            if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Canvas URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref note) = self.note {
            if note.is_dir() {
                return Err(format!("Note path is a directory: {}", note.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
