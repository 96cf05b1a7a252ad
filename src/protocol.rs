//! Wire types for the Gemini `generateContent` endpoint.
//!
//! Requests are built from the resolved invocation; responses are reduced to
//! the text of the first candidate, keeping the empty cases distinguishable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Request body for `generateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
    pub tools: Vec<Tool>,
}

/// A list of text parts.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

/// A single text part.
#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

/// Sampling parameters. Fixed for every request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 64,
            top_p: 0.95,
            max_output_tokens: 65536,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// Tool declaration; only Google Search grounding is used.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub google_search: GoogleSearch,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GoogleSearch {}

impl GenerateRequest {
    /// Build a request. The query and the piped content become separate
    /// parts, in that order, each only when non-empty.
    pub fn new(instruction: String, query: &str, piped_content: Option<&str>) -> Self {
        let parts = [Some(query), piped_content]
            .into_iter()
            .flatten()
            .filter(|text| !text.is_empty())
            .map(|text| Part {
                text: text.to_string(),
            })
            .collect();

        Self {
            system_instruction: Content {
                parts: vec![Part { text: instruction }],
            },
            contents: vec![Content { parts }],
            generation_config: GenerationConfig::default(),
            tools: vec![Tool {
                google_search: GoogleSearch::default(),
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// What a successful response body contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseText {
    /// No candidates at all.
    NoCandidates,
    /// The first candidate carried no parts.
    NoParts,
    /// Parts were present but their text concatenated to nothing.
    Empty,
    /// Concatenated text of the first candidate.
    Text(String),
}

/// Reduce a successful response body to the first candidate's text.
pub fn extract_text(body: &str) -> Result<ResponseText> {
    let response: GenerateResponse =
        serde_json::from_str(body).context("Failed to parse Gemini response")?;

    let Some(first) = response.candidates.unwrap_or_default().into_iter().next() else {
        return Ok(ResponseText::NoCandidates);
    };

    let parts = first
        .content
        .and_then(|content| content.parts)
        .unwrap_or_default();
    if parts.is_empty() {
        return Ok(ResponseText::NoParts);
    }

    let text: String = parts.into_iter().filter_map(|part| part.text).collect();
    if text.is_empty() {
        Ok(ResponseText::Empty)
    } else {
        Ok(ResponseText::Text(text))
    }
}
