//! LLM backend abstraction.
//!
//! The dispatcher talks to a [`Generator`]; the Gemini HTTP backend is the
//! only production implementation.

pub mod gemini;

use crate::protocol::GenerateRequest;
use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiBackend;

/// Raw HTTP reply: status code and undecoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one generation request and returns the raw reply.
///
/// Transport errors are `Err`; any HTTP status, successful or not, is `Ok`.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<Reply>;

    /// Model identifier, for logging.
    fn model(&self) -> &str;
}
