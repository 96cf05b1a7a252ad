//! Terminal-side collaborators for presenting an answer.
//!
//! - `clipboard`: copy the strict-mode command via the platform utility
//! - `markdown`: stream answers through `glow` when it is installed
//! - `prompt`: the single line-read confirmation question

pub mod clipboard;
pub mod markdown;
pub mod prompt;

pub use clipboard::{Clipboard, SystemClipboard};
pub use markdown::{Glow, Renderer};
pub use prompt::{ConsolePrompt, Prompt};

const FENCE: &str = "```";

/// Strip a Markdown code fence wrapping the whole answer.
///
/// The text is trimmed first. Only a fence at both ends is removed; a
/// language tag on the opening line (e.g. `bash`) goes with it.
pub fn plain_command(response: &str) -> String {
    let trimmed = response.trim();
    if !(trimmed.starts_with(FENCE) && trimmed.ends_with(FENCE)) {
        return trimmed.to_string();
    }

    let inner = &trimmed[FENCE.len()..];
    let inner = strip_language_tag(inner);
    let inner = inner.strip_suffix(FENCE).unwrap_or(inner);
    inner.trim().to_string()
}

fn strip_language_tag(text: &str) -> &str {
    let tag_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+')))
        .unwrap_or(text.len());
    let (tag, rest) = text.split_at(tag_len);

    if let Some(body) = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')) {
        body
    } else if tag == "bash" {
        // `bash` is dropped even without a newline after it.
        rest
    } else {
        text
    }
}
