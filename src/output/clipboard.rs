//! Clipboard access through the platform's copy utility.

use crate::error::ClipboardError;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Something that can receive text for the user to paste.
pub trait Clipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Program name and arguments of a copy utility reading stdin.
type Utility = (&'static str, &'static [&'static str]);

const NO_ARGS: &[&str] = &[];

/// Clipboard backed by `pbcopy`, `clip`, `wl-copy`, `xclip` or `xsel`.
pub struct SystemClipboard {
    candidates: Vec<Utility>,
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self {
            candidates: platform_candidates(),
        }
    }
}

#[cfg(target_os = "macos")]
fn platform_candidates() -> Vec<Utility> {
    vec![("pbcopy", NO_ARGS)]
}

#[cfg(target_os = "windows")]
fn platform_candidates() -> Vec<Utility> {
    vec![("clip", NO_ARGS)]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_candidates() -> Vec<Utility> {
    const XCLIP: Utility = ("xclip", &["-selection", "clipboard"]);
    const XSEL: Utility = ("xsel", &["--clipboard", "--input"]);
    const WL_COPY: Utility = ("wl-copy", NO_ARGS);

    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        vec![WL_COPY, XCLIP, XSEL]
    } else {
        vec![XCLIP, XSEL, WL_COPY]
    }
}

impl SystemClipboard {
    fn copy_with(program: &str, args: &[&str], text: &str) -> Result<(), ClipboardError> {
        let io_err = |source| ClipboardError::Io {
            program: program.to_string(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(io_err)?;

        // Reap the child even when it stopped reading early.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait().map_err(io_err)?;
        written.map_err(io_err)?;

        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Failed {
                program: program.to_string(),
                status,
            })
        }
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&self, text: &str) -> Result<(), ClipboardError> {
        for (program, args) in &self.candidates {
            match Self::copy_with(program, args, text) {
                Ok(()) => {
                    debug!("Copied {} bytes with {}", text.len(), program);
                    return Ok(());
                }
                // Not installed: try the next utility.
                Err(ClipboardError::Io { source, .. })
                    if source.kind() == std::io::ErrorKind::NotFound =>
                {
                    debug!("{} not available", program);
                }
                Err(e) => return Err(e),
            }
        }

        let tried: Vec<&str> = self.candidates.iter().map(|(program, _)| *program).collect();
        Err(ClipboardError::Unavailable(tried.join(", ")))
    }
}
