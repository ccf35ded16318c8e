//! Configuration file handling.
//!
//! This module handles loading, saving and merging configuration from
//! `.canvas-tasks.toml` files.

use crate::cli::{Args, InsertMode, Source};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = ".canvas-tasks.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Canvas connection settings.
    #[serde(default)]
    pub canvas: CanvasConfig,

    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Canvas connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Base URL of the Canvas instance, without trailing slash.
    #[serde(default)]
    pub base_url: String,

    /// Personal access token.
    #[serde(default)]
    pub token: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Module/assignment requests in flight per course. 1 is fully sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// What to fetch and render.
    #[serde(default)]
    pub source: Source,

    /// How the checklist is inserted into the note.
    #[serde(default)]
    pub insert: InsertMode,

    /// Target note. Stdout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from a path.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Write configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.url {
            self.canvas.base_url = url.clone();
        }
        if let Some(ref token) = args.token {
            self.canvas.token = token.clone();
        }
        if let Some(timeout) = args.timeout {
            self.canvas.timeout_seconds = timeout;
        }

        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(source) = args.source {
            self.output.source = source;
        }
        if let Some(insert) = args.insert {
            self.output.insert = insert;
        }
        if let Some(ref note) = args.note {
            self.output.note = Some(note.clone());
        }

        self.canvas.base_url = self.canvas.base_url.trim().trim_end_matches('/').to_string();
        self.canvas.token = self.canvas.token.trim().to_string();
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
