//! Mode and query resolution from the command line and piped stdin.
//!
//! Resolution happens in two passes. The first runs at startup and only
//! honors a mode flag when stdin is a terminal. When stdin is piped the
//! arguments are resolved again after the pipe is drained, this time honoring
//! the flag unconditionally.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt};

pub const STRICT_FLAG: &str = "-s";
pub const CODE_FLAG: &str = "-c";

/// Query used when content is piped in without any arguments.
pub const DEFAULT_PIPED_QUERY: &str = "please analyze the following content";

const READ_CHUNK: usize = 8 * 1024;

/// How the answer is requested and presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Bare command only, offered for the clipboard.
    Strict,
    /// Bare code block only.
    Code,
    /// Free-form answer with explanations.
    Default,
}

/// Mode and query text derived from the arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub mode: Mode,
    pub query: String,
}

/// Everything the dispatcher needs to know about this run's input.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub query: String,
    pub piped_content: Option<String>,
    pub piped: bool,
}

impl Invocation {
    /// Invocation for an interactive run (nothing piped).
    pub fn interactive(resolved: Resolved) -> Self {
        Self {
            mode: resolved.mode,
            query: resolved.query,
            piped_content: None,
            piped: false,
        }
    }

    /// Invocation for a piped run; arguments go through the second pass.
    pub fn piped(args: &[String], content: String) -> Self {
        let resolved = resolve_piped(args);
        Self {
            mode: resolved.mode,
            query: resolved.query,
            piped_content: Some(content),
            piped: true,
        }
    }
}

/// First pass: a leading flag only counts when stdin is not piped.
pub fn resolve(args: &[String], piped: bool) -> Resolved {
    if !piped {
        if let Some((mode, rest)) = split_flag(args) {
            return Resolved {
                mode,
                query: rest.join(" "),
            };
        }
    }
    Resolved {
        mode: Mode::Default,
        query: args.join(" "),
    }
}

/// Second pass for piped input: flags are honored regardless of the pipe.
pub fn resolve_piped(args: &[String]) -> Resolved {
    if args.is_empty() {
        return Resolved {
            mode: Mode::Default,
            query: DEFAULT_PIPED_QUERY.to_string(),
        };
    }
    match split_flag(args) {
        Some((mode, rest)) => Resolved {
            mode,
            query: rest.join(" "),
        },
        None => Resolved {
            mode: Mode::Default,
            query: args.join(" "),
        },
    }
}

/// Nothing to ask and nothing piped: the caller should print usage and exit.
pub fn needs_usage(resolved: &Resolved, piped: bool) -> bool {
    resolved.query.is_empty() && !piped
}

fn split_flag(args: &[String]) -> Option<(Mode, &[String])> {
    let (first, rest) = args.split_first()?;
    match first.as_str() {
        STRICT_FLAG => Some((Mode::Strict, rest)),
        CODE_FLAG => Some((Mode::Code, rest)),
        _ => None,
    }
}

/// Usage text printed when there is nothing to ask.
pub fn usage() -> &'static str {
    r#"usage: sai [-s|-c] "<your query>"
   or: cat <file> | sai [-s|-c] "<what to analyze or ask>"
   -s: strict command mode, returns only the command, no explanation, and offers to copy it
   -c: code expert mode, returns only code, no explanation
   (no flag): default mode, answers with commands, code and explanations as needed"#
}

/// Read piped input to end-of-stream, chunk by chunk.
pub async fn read_piped<R>(mut reader: R) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader
            .read(&mut chunk)
            .await
            .context("Failed to read piped input")?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&data).into_owned())
}
