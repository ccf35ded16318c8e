//! Host capabilities: settings storage and text insertion.
//!
//! The fetch/render core never touches the filesystem. It is handed a
//! [`Host`] that loads and saves settings and inserts the finished
//! checklist into a document. [`FileHost`] backs that with a TOML file and
//! a markdown note (or stdout).

use crate::cli::InsertMode;
use crate::config::{Config, OutputConfig};
use crate::error::CanvasError;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Marks the insertion point for [`InsertMode::Cursor`].
pub const CURSOR_MARKER: &str = "<!-- canvas-tasks -->";
/// Opens the region replaced by [`InsertMode::Selection`].
pub const SELECTION_START: &str = "<!-- canvas-tasks:start -->";
/// Closes the region replaced by [`InsertMode::Selection`].
pub const SELECTION_END: &str = "<!-- canvas-tasks:end -->";

/// What the environment provides to the core.
pub trait Host {
    /// Load persisted settings.
    fn load_config(&self) -> Result<Config>;

    /// Persist settings.
    fn save_config(&self, config: &Config) -> Result<()>;

    /// Insert the rendered text into the current document.
    fn insert_text(&mut self, text: &str) -> Result<()>;
}

/// Where inserted text goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Stdout,
    Note { path: PathBuf, mode: InsertMode },
}

impl Target {
    /// The note from `[output]` if one is configured, stdout otherwise.
    pub fn from_output(output: &OutputConfig) -> Self {
        match &output.note {
            Some(path) => Target::Note {
                path: path.clone(),
                mode: output.insert,
            },
            None => Target::Stdout,
        }
    }
}

/// Host backed by a config file and an optional markdown note.
#[derive(Debug, Clone)]
pub struct FileHost {
    config_path: PathBuf,
    /// Whether `config_path` was chosen explicitly (parse errors are fatal then).
    explicit_config: bool,
    target: Target,
}

impl FileHost {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        match config_path {
            Some(path) => Self::with_config(path, true),
            None => Self::with_config(PathBuf::from(crate::config::DEFAULT_CONFIG_FILE), false),
        }
    }

    fn with_config(config_path: PathBuf, explicit_config: bool) -> Self {
        Self {
            config_path,
            explicit_config,
            target: Target::Stdout,
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl Host for FileHost {
    fn load_config(&self) -> Result<Config> {
        if self.explicit_config {
            info!("Loading config from: {}", self.config_path.display());
            return Config::load(&self.config_path);
        }

        match Config::load_optional(&self.config_path) {
            Ok(Some(config)) => {
                info!("Loaded config from {}", self.config_path.display());
                Ok(config)
            }
            Ok(None) => Ok(Config::default()),
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                Ok(Config::default())
            }
        }
    }

    fn save_config(&self, config: &Config) -> Result<()> {
        config.save(&self.config_path)?;
        info!("Saved config to {}", self.config_path.display());
        Ok(())
    }

    fn insert_text(&mut self, text: &str) -> Result<()> {
        match &self.target {
            Target::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout
                    .write_all(text.as_bytes())
                    .and_then(|_| stdout.flush())
                    .context("Failed to write checklist to stdout")
            }
            Target::Note { path, mode } => {
                let existing = if path.exists() {
                    std::fs::read_to_string(path)
                        .map_err(|e| CanvasError::document(path, e.to_string()))?
                } else {
                    String::new()
                };

                let updated = match mode {
                    InsertMode::Cursor => insert_at_cursor(&existing, text),
                    InsertMode::Selection => replace_selection(&existing, text)
                        .ok_or_else(|| {
                            CanvasError::document(
                                path,
                                format!(
                                    "selection markers {} ... {} not found",
                                    SELECTION_START, SELECTION_END
                                ),
                            )
                        })?,
                };

                std::fs::write(path, updated)
                    .map_err(|e| CanvasError::document(path, e.to_string()))?;
                info!("Inserted checklist into {}", path.display());
                Ok(())
            }
        }
    }
}

/// Insert `text` at the cursor marker (consuming it), or append it.
pub fn insert_at_cursor(document: &str, text: &str) -> String {
    if let Some(pos) = document.find(CURSOR_MARKER) {
        let mut out = String::with_capacity(document.len() + text.len());
        out.push_str(&document[..pos]);
        out.push_str(text);
        out.push_str(&document[pos + CURSOR_MARKER.len()..]);
        return out;
    }

    let mut out = document.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(text);
    out
}

/// Replace the selection (markers included) with `text`.
///
/// Returns `None` if the markers are missing or out of order.
pub fn replace_selection(document: &str, text: &str) -> Option<String> {
    let start = document.find(SELECTION_START)?;
    let end_rel = document[start..].find(SELECTION_END)?;
    let end = start + end_rel + SELECTION_END.len();

    let mut out = String::with_capacity(document.len() + text.len());
    out.push_str(&document[..start]);
    out.push_str(text);
    out.push_str(&document[end..]);
    Some(out)
}
