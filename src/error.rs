//! Error types for talking to Canvas and writing into notes.
//!
//! Every failure carries enough context (stage, redacted URL, status) to be
//! shown to the user as-is.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the fetch/render core.
pub type Result<T> = std::result::Result<T, CanvasError>;

/// Errors produced while fetching and rendering Canvas data.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Base URL or access token is empty or absent.
    #[error("Configuration error: {field} is not set. Set it in .canvas-tasks.toml or pass it on the command line")]
    MissingConfig {
        /// Name of the missing setting.
        field: &'static str,
    },

    /// Connection, DNS, timeout or non-success HTTP status.
    #[error("Error during {resource}: request to {url} failed: {message}")]
    Transport {
        /// Fetch stage that failed (e.g. "module fetch").
        resource: &'static str,
        /// Requested URL with the access token redacted.
        url: String,
        /// HTTP status code, if a response was received.
        status: Option<u16>,
        message: String,
    },

    /// Response body was not JSON or did not have the expected shape.
    #[error("Error during {resource}: unexpected response from {url}: {message}")]
    Parse {
        resource: &'static str,
        url: String,
        message: String,
    },

    /// The target note could not be read, written or did not contain the markers.
    #[error("Document error at {path:?}: {message}")]
    Document { path: PathBuf, message: String },
}

impl CanvasError {
    /// Create a transport error, redacting the token in `url`.
    pub fn transport(
        resource: &'static str,
        url: &str,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transport {
            resource,
            url: redact_token(url),
            status,
            message: message.into(),
        }
    }

    /// Create a parse error, redacting the token in `url`.
    pub fn parse(resource: &'static str, url: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            resource,
            url: redact_token(url),
            message: message.into(),
        }
    }

    pub fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Re-label the fetch stage of a transport or parse error.
    pub fn with_resource(self, resource: &'static str) -> Self {
        match self {
            Self::Transport {
                url,
                status,
                message,
                ..
            } => Self::Transport {
                resource,
                url,
                status,
                message,
            },
            Self::Parse { url, message, .. } => Self::Parse {
                resource,
                url,
                message,
            },
            other => other,
        }
    }

    /// The failing URL (token redacted), if the error came from a request.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. } | Self::Parse { url, .. } => Some(url),
            _ => None,
        }
    }

    /// HTTP status of the failing response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Replace the value of any `access_token` query parameter with `***`.
pub fn redact_token(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let query: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some(("access_token", _)) => "access_token=***".to_string(),
            _ => pair.to_string(),
        })
        .collect();

    format!("{}?{}", base, query.join("&"))
}
