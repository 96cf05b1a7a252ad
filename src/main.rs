//! sai - a terminal assistant backed by the Gemini API.
//!
//! Sends a question, plus anything piped on stdin, to the model. Strict mode
//! answers with a bare command and offers to copy it; code and default modes
//! render the answer as Markdown.

mod config;
mod context;
mod dispatch;
mod error;
mod input;
mod llm;
mod output;
mod protocol;

use anyhow::Result;
use clap::Parser;
use config::Config;
use dispatch::{QueryDispatcher, Terminal};
use input::Invocation;
use llm::GeminiBackend;
use output::{ConsolePrompt, Glow, Renderer, SystemClipboard};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LOG_VAR: &str = "SAI_LOG";

#[derive(Parser)]
#[command(name = "sai")]
#[command(version, about = "A terminal assistant backed by the Gemini API")]
#[command(long_about = "Answers terminal questions with the Gemini API.\n\n\
    Start the query with -s for a bare command (offered for the clipboard) or -c for bare code.\n\
    Pipe content in to have it analyzed: cat error.log | sai -s \"find the failing unit\"\n\n\
    Requires GEMINI_API_KEY and GEMINI_MODEL_NAME (a .env file in the working directory is read).")]
struct Cli {
    /// Optional mode flag (-s strict command, -c code) followed by the query
    #[arg(value_name = "QUERY", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let raw: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let args = with_separator(cli.args, raw);
    let piped = !atty::is(atty::Stream::Stdin);

    let first_pass = input::resolve(&args, piped);
    if input::needs_usage(&first_pass, piped) {
        println!("{}", input::usage());
        std::process::exit(1);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    debug!(?config, "Configuration loaded");

    let system_info = context::gather_context(&context::Fastfetch).unwrap_or_else(|| {
        eprintln!(
            "failed to collect system information, make sure fastfetch is installed and on PATH."
        );
        context::UNAVAILABLE.to_string()
    });

    let invocation = if piped {
        let content = input::read_piped(tokio::io::stdin()).await?;
        Invocation::piped(&args, content)
    } else {
        Invocation::interactive(first_pass)
    };

    let glow = Glow::detect();
    debug!(renderer = glow.is_some(), "Markdown renderer probed");

    let generator = GeminiBackend::new(&config)?;
    let clipboard = SystemClipboard::default();
    let prompt = ConsolePrompt;
    let dispatcher = QueryDispatcher::new(
        &config,
        &system_info,
        &generator,
        Terminal {
            clipboard: &clipboard,
            renderer: glow.as_ref().map(|g| g as &dyn Renderer),
            prompt: &prompt,
        },
    );

    let outcome = dispatcher
        .dispatch(&invocation, &mut std::io::stdout(), &mut std::io::stderr())
        .await;
    info!(?outcome, "Done");

    Ok(())
}

/// clap swallows a literal `--`, but here it is an ordinary query token.
/// Every other argument reaches `parsed` untouched, so a single missing token
/// can only be the separator.
fn with_separator(parsed: Vec<String>, raw: Vec<String>) -> Vec<String> {
    if raw.len() == parsed.len() + 1 && raw.iter().any(|arg| arg == "--") {
        raw
    } else {
        parsed
    }
}

/// Initialize logging to stderr. Silent unless `SAI_LOG` asks for output.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
