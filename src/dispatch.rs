//! Query dispatch: one request to the model, one pass through the output
//! state machine.
//!
//! Strict answers are reduced to a plain command and offered for the
//! clipboard. Code and default answers go to the Markdown renderer when one
//! is available, or are printed as-is.

use crate::config::Config;
use crate::input::{Invocation, Mode};
use crate::llm::Generator;
use crate::output::{plain_command, Clipboard, Prompt, Renderer};
use crate::protocol::{extract_text, GenerateRequest, ResponseText};
use anyhow::Result;
use std::io::Write;
use tracing::{debug, error, info, warn};

pub const NO_CANDIDATES: &str = "API returned no candidates.";
pub const NO_PARTS: &str = "API candidate contained no text content.";
pub const EMPTY_TEXT: &str = "API returned no text content.";

pub const COPY_QUESTION: &str =
    "copy command to clipboard and run manually? (e=copy and continue / q=quit): ";
pub const COPIED: &str = "command copied to clipboard, paste it to run.";
pub const COPIED_PIPED: &str = "command copied to clipboard (piped input, copied automatically).";
pub const QUIT: &str = "quit.";
pub const INVALID_ANSWER: &str = "invalid input, exiting.";
pub const RENDERER_HINT: &str =
    "hint: install glow (https://github.com/charmbracelet/glow) for better Markdown rendering";

/// What a dispatch ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The API answered with a non-success status.
    ApiError { status: u16, body: String },
    NoCandidates,
    NoParts,
    EmptyText,
    /// Strict mode: the plain command and what happened to it.
    Command { command: String, action: CommandAction },
    /// Answer streamed through the Markdown renderer.
    Rendered,
    /// Answer printed as plain text.
    Printed,
    /// Unexpected failure, already reported.
    Failed(String),
}

/// Fate of a strict-mode command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    Copied,
    CopyFailed,
    Quit,
    InvalidAnswer,
}

/// Terminal-side collaborators used after the answer arrives.
pub struct Terminal<'a> {
    pub clipboard: &'a dyn Clipboard,
    pub renderer: Option<&'a dyn Renderer>,
    pub prompt: &'a dyn Prompt,
}

/// Sends a resolved invocation to the model and presents the answer.
pub struct QueryDispatcher<'a> {
    config: &'a Config,
    system_info: &'a str,
    generator: &'a dyn Generator,
    terminal: Terminal<'a>,
}

impl<'a> QueryDispatcher<'a> {
    pub fn new(
        config: &'a Config,
        system_info: &'a str,
        generator: &'a dyn Generator,
        terminal: Terminal<'a>,
    ) -> Self {
        Self {
            config,
            system_info,
            generator,
            terminal,
        }
    }

    /// Run one invocation. Never fails: unexpected errors are written to
    /// `err` and returned as [`Outcome::Failed`].
    pub async fn dispatch<O, E>(
        &self,
        invocation: &Invocation,
        out: &mut O,
        err: &mut E,
    ) -> Outcome
    where
        O: Write,
        E: Write,
    {
        match self.try_dispatch(invocation, out, err).await {
            Ok(outcome) => {
                debug!(?outcome, "Dispatch finished");
                outcome
            }
            Err(e) => {
                error!("Dispatch failed: {:#}", e);
                let _ = writeln!(err, "error: {:#}", e);
                Outcome::Failed(format!("{:#}", e))
            }
        }
    }

    async fn try_dispatch<O, E>(
        &self,
        invocation: &Invocation,
        out: &mut O,
        err: &mut E,
    ) -> Result<Outcome>
    where
        O: Write,
        E: Write,
    {
        let instruction = self
            .config
            .build_system_instruction(invocation.mode, self.system_info);
        let request = GenerateRequest::new(
            instruction,
            &invocation.query,
            invocation.piped_content.as_deref(),
        );

        info!(
            mode = ?invocation.mode,
            model = self.generator.model(),
            piped = invocation.piped,
            "Dispatching query"
        );
        let reply = self.generator.generate(&request).await?;

        if !reply.is_success() {
            warn!(status = reply.status, "API request failed");
            writeln!(err, "API request failed with status code: {}", reply.status)?;
            writeln!(err, "error details: {}", reply.body)?;
            return Ok(Outcome::ApiError {
                status: reply.status,
                body: reply.body,
            });
        }

        let text = match extract_text(&reply.body)? {
            ResponseText::NoCandidates => {
                writeln!(out, "{NO_CANDIDATES}")?;
                return Ok(Outcome::NoCandidates);
            }
            ResponseText::NoParts => {
                writeln!(out, "{NO_PARTS}")?;
                return Ok(Outcome::NoParts);
            }
            ResponseText::Empty => {
                writeln!(out, "{EMPTY_TEXT}")?;
                return Ok(Outcome::EmptyText);
            }
            ResponseText::Text(text) => text,
        };

        match invocation.mode {
            Mode::Strict => self.present_command(&text, invocation.piped, out, err),
            Mode::Code | Mode::Default => self.present_answer(&text, out),
        }
    }

    /// Strict path: print the plain command, then offer it for the clipboard.
    fn present_command<O, E>(
        &self,
        text: &str,
        piped: bool,
        out: &mut O,
        err: &mut E,
    ) -> Result<Outcome>
    where
        O: Write,
        E: Write,
    {
        let command = plain_command(text);
        writeln!(out, "{command}")?;

        // With piped input stdin is not the user, so there is no one to ask.
        let action = if piped {
            self.copy_command(&command, COPIED_PIPED, out, err)?
        } else {
            let answer = self.terminal.prompt.ask(COPY_QUESTION)?;
            match answer.to_lowercase().as_str() {
                "e" => self.copy_command(&command, COPIED, out, err)?,
                "q" => {
                    writeln!(out, "{QUIT}")?;
                    CommandAction::Quit
                }
                _ => {
                    writeln!(out, "{INVALID_ANSWER}")?;
                    CommandAction::InvalidAnswer
                }
            }
        };

        Ok(Outcome::Command { command, action })
    }

    fn copy_command<O, E>(
        &self,
        command: &str,
        success: &str,
        out: &mut O,
        err: &mut E,
    ) -> Result<CommandAction>
    where
        O: Write,
        E: Write,
    {
        match self.terminal.clipboard.copy(command) {
            Ok(()) => {
                writeln!(out, "{success}")?;
                Ok(CommandAction::Copied)
            }
            Err(e) => {
                warn!("Clipboard copy failed: {}", e);
                writeln!(err, "failed to copy to clipboard: {}", e)?;
                writeln!(out, "please copy the command manually: {command}")?;
                Ok(CommandAction::CopyFailed)
            }
        }
    }

    /// Code and default path: render as Markdown, or print plainly.
    fn present_answer<O: Write>(&self, text: &str, out: &mut O) -> Result<Outcome> {
        if let Some(renderer) = self.terminal.renderer {
            return match renderer.render(text) {
                Ok(()) => Ok(Outcome::Rendered),
                Err(e) if e.nothing_shown() => {
                    warn!("Renderer unavailable, printing plain text: {}", e);
                    writeln!(out, "{text}")?;
                    Ok(Outcome::Printed)
                }
                // The renderer already had the answer; printing it again would duplicate it.
                Err(e) => {
                    warn!("Renderer failed after taking the answer: {}", e);
                    Ok(Outcome::Rendered)
                }
            };
        }

        writeln!(out, "{text}")?;
        writeln!(out)?;
        writeln!(out, "{RENDERER_HINT}")?;
        Ok(Outcome::Printed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{API_KEY_VAR, MODEL_VAR};
    use crate::error::{ClipboardError, RenderError};
    use crate::input::{resolve, Resolved};
    use crate::llm::Reply;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeGenerator {
        reply: Result<Reply, String>,
        requests: Mutex<Vec<serde_json::Value>>,
    }

    impl FakeGenerator {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(Reply {
                    status,
                    body: body.to_string(),
                }),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn text(text: &str) -> Self {
            let body = serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": text }] } }]
            });
            Self::replying(200, &body.to_string())
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<serde_json::Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for FakeGenerator {
        async fn generate(&self, request: &GenerateRequest) -> Result<Reply> {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            self.reply.clone().map_err(|e| anyhow!(e))
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    #[derive(Default)]
    struct FakeClipboard {
        broken: bool,
        copied: Mutex<Vec<String>>,
    }

    impl Clipboard for FakeClipboard {
        fn copy(&self, text: &str) -> Result<(), ClipboardError> {
            if self.broken {
                return Err(ClipboardError::Unavailable("xclip".to_string()));
            }
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    enum RenderFault {
        #[default]
        Healthy,
        /// Fails before anything is drawn.
        Spawn,
        /// Takes the answer, then fails.
        Crash,
    }

    #[derive(Default)]
    struct FakeRenderer {
        fault: RenderFault,
        rendered: Mutex<Vec<String>>,
    }

    impl Renderer for FakeRenderer {
        fn render(&self, markdown: &str) -> Result<(), RenderError> {
            if let RenderFault::Spawn = self.fault {
                return Err(RenderError::Spawn {
                    program: "glow".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            self.rendered.lock().unwrap().push(markdown.to_string());
            match self.fault {
                RenderFault::Crash => Err(RenderError::Interrupted {
                    program: "glow".to_string(),
                    reason: "exit status: 1".to_string(),
                }),
                _ => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct FakePrompt {
        answer: String,
        asked: Mutex<Vec<String>>,
    }

    impl FakePrompt {
        fn answering(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                asked: Mutex::default(),
            }
        }
    }

    impl Prompt for FakePrompt {
        fn ask(&self, question: &str) -> Result<String> {
            self.asked.lock().unwrap().push(question.to_string());
            Ok(self.answer.clone())
        }
    }

    fn config() -> Config {
        Config::from_lookup(|name| match name {
            n if n == API_KEY_VAR => Some("k".to_string()),
            n if n == MODEL_VAR => Some("m".to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn interactive(mode: Mode, query: &str) -> Invocation {
        Invocation::interactive(Resolved {
            mode,
            query: query.to_string(),
        })
    }

    fn piped(args: &[&str], content: &str) -> Invocation {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        Invocation::piped(&args, content.to_string())
    }

    struct Harness {
        generator: FakeGenerator,
        clipboard: FakeClipboard,
        renderer: Option<FakeRenderer>,
        prompt: FakePrompt,
    }

    struct Run {
        outcome: Outcome,
        out: String,
        err: String,
    }

    impl Harness {
        fn new(generator: FakeGenerator) -> Self {
            Self {
                generator,
                clipboard: FakeClipboard::default(),
                renderer: None,
                prompt: FakePrompt::default(),
            }
        }

        fn answering(mut self, answer: &str) -> Self {
            self.prompt = FakePrompt::answering(answer);
            self
        }

        fn with_renderer(mut self, renderer: FakeRenderer) -> Self {
            self.renderer = Some(renderer);
            self
        }

        fn with_clipboard(mut self, clipboard: FakeClipboard) -> Self {
            self.clipboard = clipboard;
            self
        }

        async fn run(&self, invocation: &Invocation) -> Run {
            let config = config();
            let dispatcher = QueryDispatcher::new(
                &config,
                "OS: TestOS",
                &self.generator,
                Terminal {
                    clipboard: &self.clipboard,
                    renderer: self.renderer.as_ref().map(|r| r as &dyn Renderer),
                    prompt: &self.prompt,
                },
            );
            let mut out = Vec::new();
            let mut err = Vec::new();
            let outcome = dispatcher.dispatch(invocation, &mut out, &mut err).await;
            Run {
                outcome,
                out: String::from_utf8(out).unwrap(),
                err: String::from_utf8(err).unwrap(),
            }
        }

        fn copied(&self) -> Vec<String> {
            self.clipboard.copied.lock().unwrap().clone()
        }

        fn rendered(&self) -> Vec<String> {
            self.renderer
                .as_ref()
                .map(|r| r.rendered.lock().unwrap().clone())
                .unwrap_or_default()
        }

        fn asked(&self) -> Vec<String> {
            self.prompt.asked.lock().unwrap().clone()
        }
    }

    #[tokio::test]
    async fn test_request_carries_mode_instruction_and_parts() {
        let harness = Harness::new(FakeGenerator::text("answer"));
        harness.run(&piped(&["-c", "explain"], "fn x() {}")).await;

        let requests = harness.generator.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        let instruction = request["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("code expert"));
        assert!(instruction.contains("OS: TestOS"));
        assert_eq!(request["contents"][0]["parts"][0]["text"], "explain");
        assert_eq!(request["contents"][0]["parts"][1]["text"], "fn x() {}");
        assert_eq!(request["tools"][0]["googleSearch"], serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_strict_fenced_answer_prompts_and_copies() {
        let harness = Harness::new(FakeGenerator::text("```\nls -la\n```")).answering("E");
        let run = harness.run(&interactive(Mode::Strict, "list")).await;

        assert_eq!(
            run.outcome,
            Outcome::Command {
                command: "ls -la".to_string(),
                action: CommandAction::Copied,
            }
        );
        assert_eq!(run.out, format!("ls -la\n{COPIED}\n"));
        assert_eq!(harness.asked(), vec![COPY_QUESTION.to_string()]);
        assert_eq!(harness.copied(), vec!["ls -la".to_string()]);
    }

    #[tokio::test]
    async fn test_strict_quit_answer() {
        let harness = Harness::new(FakeGenerator::text("df -h")).answering("Q");
        let run = harness.run(&interactive(Mode::Strict, "disk")).await;

        assert_eq!(run.out, format!("df -h\n{QUIT}\n"));
        assert!(matches!(
            run.outcome,
            Outcome::Command {
                action: CommandAction::Quit,
                ..
            }
        ));
        assert!(harness.copied().is_empty());
    }

    #[tokio::test]
    async fn test_strict_invalid_answer() {
        let harness = Harness::new(FakeGenerator::text("df -h")).answering("yes");
        let run = harness.run(&interactive(Mode::Strict, "disk")).await;

        assert_eq!(run.out, format!("df -h\n{INVALID_ANSWER}\n"));
        assert!(matches!(
            run.outcome,
            Outcome::Command {
                action: CommandAction::InvalidAnswer,
                ..
            }
        ));
        assert_eq!(harness.asked().len(), 1);
        assert!(harness.copied().is_empty());
    }

    #[tokio::test]
    async fn test_strict_piped_copies_without_prompt() {
        let harness = Harness::new(FakeGenerator::text("```bash\ngrep -c ERROR\n```"));
        let run = harness.run(&piped(&["-s", "count errors"], "log")).await;

        assert!(harness.asked().is_empty());
        assert_eq!(harness.copied(), vec!["grep -c ERROR".to_string()]);
        assert_eq!(run.out, format!("grep -c ERROR\n{COPIED_PIPED}\n"));
    }

    #[tokio::test]
    async fn test_clipboard_failure_offers_manual_copy() {
        let harness = Harness::new(FakeGenerator::text("uptime"))
            .answering("e")
            .with_clipboard(FakeClipboard {
                broken: true,
                ..Default::default()
            });
        let run = harness.run(&interactive(Mode::Strict, "uptime")).await;

        assert!(matches!(
            run.outcome,
            Outcome::Command {
                action: CommandAction::CopyFailed,
                ..
            }
        ));
        assert!(run.err.contains("failed to copy to clipboard"));
        assert!(run
            .out
            .ends_with("please copy the command manually: uptime\n"));
    }

    #[tokio::test]
    async fn test_default_answer_rendered() {
        let answer = "# Title\n\n```\nls\n```";
        let harness =
            Harness::new(FakeGenerator::text(answer)).with_renderer(FakeRenderer::default());
        let run = harness.run(&interactive(Mode::Default, "how")).await;

        assert_eq!(run.outcome, Outcome::Rendered);
        assert!(run.out.is_empty());
        assert_eq!(harness.rendered(), vec![answer.to_string()]);
        assert!(harness.copied().is_empty());
        assert!(harness.asked().is_empty());
    }

    #[tokio::test]
    async fn test_code_answer_without_renderer_prints_hint() {
        let harness = Harness::new(FakeGenerator::text("```rust\nfn main() {}\n```"));
        let run = harness.run(&interactive(Mode::Code, "hello")).await;

        assert_eq!(run.outcome, Outcome::Printed);
        assert_eq!(
            run.out,
            format!("```rust\nfn main() {{}}\n```\n\n{RENDERER_HINT}\n")
        );
        assert!(harness.asked().is_empty());
        assert!(harness.copied().is_empty());
    }

    #[tokio::test]
    async fn test_renderer_that_never_started_falls_back_to_plain_text() {
        let harness = Harness::new(FakeGenerator::text("answer")).with_renderer(FakeRenderer {
            fault: RenderFault::Spawn,
            ..Default::default()
        });
        let run = harness.run(&interactive(Mode::Default, "q")).await;

        assert_eq!(run.outcome, Outcome::Printed);
        assert_eq!(run.out, "answer\n");
    }

    #[tokio::test]
    async fn test_renderer_crash_after_taking_answer_does_not_print_again() {
        let harness = Harness::new(FakeGenerator::text("# answer")).with_renderer(FakeRenderer {
            fault: RenderFault::Crash,
            ..Default::default()
        });
        let run = harness.run(&interactive(Mode::Code, "q")).await;

        assert_eq!(run.outcome, Outcome::Rendered);
        assert!(run.out.is_empty(), "out: {}", run.out);
        assert_eq!(harness.rendered(), vec!["# answer".to_string()]);
    }

    #[tokio::test]
    async fn test_no_candidates_skips_output_routing() {
        let harness = Harness::new(FakeGenerator::replying(200, r#"{"candidates":[]}"#))
            .with_renderer(FakeRenderer::default());
        let run = harness.run(&interactive(Mode::Strict, "x")).await;

        assert_eq!(run.outcome, Outcome::NoCandidates);
        assert_eq!(run.out, format!("{NO_CANDIDATES}\n"));
        assert!(harness.copied().is_empty());
        assert!(harness.rendered().is_empty());
        assert!(harness.asked().is_empty());
    }

    #[tokio::test]
    async fn test_no_parts_outcome() {
        let body = r#"{"candidates":[{"content":{"parts":[]}}]}"#;
        let harness = Harness::new(FakeGenerator::replying(200, body));
        let run = harness.run(&interactive(Mode::Default, "x")).await;

        assert_eq!(run.outcome, Outcome::NoParts);
        assert_eq!(run.out, format!("{NO_PARTS}\n"));
    }

    #[tokio::test]
    async fn test_empty_text_outcome() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":""}]}}]}"#;
        let harness = Harness::new(FakeGenerator::replying(200, body));
        let run = harness.run(&interactive(Mode::Default, "x")).await;

        assert_eq!(run.outcome, Outcome::EmptyText);
        assert_eq!(run.out, format!("{EMPTY_TEXT}\n"));
    }

    #[tokio::test]
    async fn test_error_status_reports_code_and_body() {
        let body = r#"{"error":{"code":429,"message":"quota"}}"#;
        let harness = Harness::new(FakeGenerator::replying(429, body))
            .with_renderer(FakeRenderer::default());
        let run = harness.run(&interactive(Mode::Strict, "x")).await;

        assert!(matches!(run.outcome, Outcome::ApiError { status: 429, .. }));
        assert!(run.err.contains("status code: 429"));
        assert!(run.err.contains(body));
        assert!(run.out.is_empty());
        assert!(harness.copied().is_empty());
        assert!(harness.rendered().is_empty());
        assert!(harness.asked().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_swallowed() {
        let harness = Harness::new(FakeGenerator::failing("connection refused"));
        let run = harness.run(&interactive(Mode::Default, "x")).await;

        assert!(matches!(run.outcome, Outcome::Failed(_)));
        assert!(run.err.starts_with("error: connection refused"));
        assert!(run.out.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_swallowed() {
        let harness = Harness::new(FakeGenerator::replying(200, "not json"));
        let run = harness.run(&interactive(Mode::Default, "x")).await;

        assert!(matches!(run.outcome, Outcome::Failed(_)));
        assert!(run.err.contains("Failed to parse Gemini response"));
    }

    #[test]
    fn test_first_pass_feeds_interactive_invocation() {
        let args = ["-s".to_string(), "free".to_string(), "memory".to_string()];
        let invocation = Invocation::interactive(resolve(&args, false));
        assert_eq!(invocation.mode, Mode::Strict);
        assert_eq!(invocation.query, "free memory");
        assert!(!invocation.piped);
    }
}
