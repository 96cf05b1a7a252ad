//! Configuration management for sai.
//!
//! Configuration comes from the process environment. A `.env` file in the
//! working directory is loaded by `main` before [`Config::load`] runs.

use crate::error::ConfigError;
use crate::input::Mode;
use std::fmt;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL_NAME";
pub const API_BASE_VAR: &str = "GEMINI_API_BASE";
pub const LANGUAGE_VAR: &str = "SAI_RESPONSE_LANGUAGE";

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_LANGUAGE: &str = "Chinese";

/// Immutable runtime configuration, built once at startup.
#[derive(Clone)]
pub struct Config {
    /// Gemini API key.
    pub api_key: String,
    /// Model identifier, e.g. `gemini-2.0-flash`.
    pub model: String,
    /// Endpoint base URL without a trailing slash.
    pub api_base: String,
    /// Language every answer must be written in.
    pub response_language: String,
}

// The key ends up in request URLs; keep it out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("response_language", &self.response_language)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = present(API_KEY_VAR).ok_or(ConfigError::MissingVar(API_KEY_VAR))?;
        let model = present(MODEL_VAR).ok_or(ConfigError::MissingVar(MODEL_VAR))?;

        let api_base = present(API_BASE_VAR)
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let response_language =
            present(LANGUAGE_VAR).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(Self {
            api_key,
            model,
            api_base,
            response_language,
        })
    }

    /// Build the system instruction for a mode, embedding the system snapshot.
    pub fn build_system_instruction(&self, mode: Mode, system_info: &str) -> String {
        let role = match mode {
            Mode::Strict => {
                r#"You are an extremely strict terminal command assistant.
Your goal is to answer the user's question with **only the most precise terminal command and no explanatory text at all**.
Even if you believe the user may not know the command or needs extra explanation, **you must reply with the command itself and nothing else**.
**Do not wrap the command in any Markdown formatting (such as a code block); return the plain-text command directly**.
The user will learn the details on their own (for example with man or --help)."#
            }
            Mode::Code => {
                r#"You are a code expert assistant.
Your goal is to answer the user's question with **only the most precise code block and no explanatory text at all**.
Whatever programming language the question is about, give directly runnable code **without any explanation, notes or extra text**.
The user is an experienced developer who understands what the code does and how it works."#
            }
            Mode::Default => {
                r#"You are an all-round terminal assistant who knows every operating system and terminal command.
Your goal is to give the best terminal command or operating guidance for the user's question.
When the user explicitly asks for a command, you **must reply with the command itself**, followed by a **short explanation**.
If the question is about more than a command, you may give a fuller answer with explanations and code examples."#
            }
        };

        format!(
            "{role}\nRemember: every reply must be written in **{language}**.\nMy system information:\n```\n{system_info}\n```\n",
            language = self.response_language,
        )
    }

    /// Full `generateContent` URL, credential included.
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.api_base, self.model, self.api_key
        )
    }
}
