//! System context gathering for better answers.
//!
//! A snapshot of the machine (from `fastfetch`) is embedded in every system
//! instruction so the model can tailor commands to the user's environment.

use anyhow::{anyhow, Context, Result};
use std::process::Command;
use tracing::{debug, warn};

/// Substituted when the probe cannot run.
pub const UNAVAILABLE: &str = "failed to collect system information";

/// Something that can describe the current system.
pub trait SystemProbe {
    fn capture(&self) -> Result<String>;
}

/// Probe backed by `fastfetch --logo none`.
pub struct Fastfetch;

impl SystemProbe for Fastfetch {
    fn capture(&self) -> Result<String> {
        let output = Command::new("fastfetch")
            .args(["--logo", "none"])
            .output()
            .context("Failed to run fastfetch")?;

        if !output.status.success() {
            return Err(anyhow!("fastfetch exited with {}", output.status));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Gather system context, or `None` if the probe failed.
pub fn gather_context(probe: &dyn SystemProbe) -> Option<String> {
    match probe.capture() {
        Ok(info) => {
            debug!("Captured {} bytes of system info", info.len());
            Some(info)
        }
        Err(e) => {
            warn!("System probe failed: {:#}", e);
            None
        }
    }
}
