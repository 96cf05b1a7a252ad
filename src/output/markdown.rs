//! Markdown rendering through `glow`.
//!
//! `glow` is optional. Presence is detected by scanning `PATH`, so nothing is
//! spawned until there is an answer to render.

use crate::error::RenderError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Renders an answer straight to the terminal.
pub trait Renderer {
    fn render(&self, markdown: &str) -> Result<(), RenderError>;
}

/// The `glow` renderer, reading Markdown on stdin.
pub struct Glow {
    program: PathBuf,
}

impl Glow {
    /// Locate `glow` on `PATH`.
    pub fn detect() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        find_in(std::env::split_paths(&path), "glow").map(|program| Self { program })
    }

    fn interrupted(&self, reason: impl ToString) -> RenderError {
        RenderError::Interrupted {
            program: self.program.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl Renderer for Glow {
    fn render(&self, markdown: &str) -> Result<(), RenderError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // From here on glow owns the terminal; always reap it.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(markdown.as_bytes()),
            None => Ok(()),
        };
        let status = child.wait().map_err(|e| self.interrupted(e))?;
        written.map_err(|e| self.interrupted(e))?;

        if !status.success() {
            return Err(self.interrupted(status));
        }
        Ok(())
    }
}

/// First directory containing an executable file named `name`.
fn find_in<I>(dirs: I, name: &str) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    dirs.into_iter().find_map(|dir| {
        executable_names(name)
            .into_iter()
            .map(|file| dir.join(file))
            .find(|candidate| is_executable(candidate))
    })
}

#[cfg(windows)]
fn executable_names(name: &str) -> Vec<String> {
    vec![format!("{name}.exe"), name.to_string()]
}

#[cfg(not(windows))]
fn executable_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
