//! Blocking one-line console prompt.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Asks the user a question and returns the answer line.
pub trait Prompt {
    /// Show `question` and read one line, without its line terminator.
    /// End of input yields an empty answer.
    fn ask(&self, question: &str) -> Result<String>;
}

/// Prompt on the process's stdout, answered on stdin.
pub struct ConsolePrompt;

impl Prompt for ConsolePrompt {
    fn ask(&self, question: &str) -> Result<String> {
        let stdin = std::io::stdin();
        ask_with(&mut stdin.lock(), &mut std::io::stdout(), question)
    }
}

fn ask_with<R, W>(input: &mut R, output: &mut W, question: &str) -> Result<String>
where
    R: BufRead,
    W: Write,
{
    write!(output, "{question}").context("Failed to write prompt")?;
    output.flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("Failed to read answer")?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_with_reads_one_line() {
        let mut input: &[u8] = b"E\r\nignored\n";
        let mut output = Vec::new();
        let answer = ask_with(&mut input, &mut output, "copy? ").unwrap();
        assert_eq!(answer, "E");
        assert_eq!(output, b"copy? ");
    }

    #[test]
    fn test_ask_with_eof_is_empty() {
        let mut input: &[u8] = b"";
        let mut output = Vec::new();
        assert_eq!(ask_with(&mut input, &mut output, "q? ").unwrap(), "");
    }
}
