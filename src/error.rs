//! Typed errors for the failures sai recovers from or reports specially.
//!
//! Everything else flows through `anyhow` with context attached.

use std::process::ExitStatus;
use thiserror::Error;

/// Configuration could not be resolved from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("please set the {0} environment variable.")]
    MissingVar(&'static str),
}

/// Writing to the OS clipboard failed.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// None of the known clipboard utilities could be started.
    #[error("no clipboard utility found (tried: {0})")]
    Unavailable(String),
    /// The utility started but could not be fed the text.
    #[error("failed to write to {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The utility exited unsuccessfully.
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// The Markdown renderer could not show an answer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer never started, so nothing reached the terminal.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The renderer started and may already have drawn part of the answer.
    #[error("{program} failed while rendering: {reason}")]
    Interrupted { program: String, reason: String },
}

impl RenderError {
    /// Whether the terminal is still untouched by this attempt.
    pub fn nothing_shown(&self) -> bool {
        matches!(self, Self::Spawn { .. })
    }
}
