//! Operator prompts over any reader/writer pair.
//!
//! Production code uses [`Console::stdio`]; tests feed scripted answers
//! through `Cursor` and capture output in a `Vec<u8>`.

use std::io::{self, BufRead, StdinLock, Stdout, Write};

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print one line.
    pub fn say(&mut self, message: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.output, "{}", message.as_ref())
    }

    /// Ask a yes/no question.  Only `y` / `Y` counts as yes; anything else,
    /// including end of input, is no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Ok(self
            .ask(question)?
            .is_some_and(|answer| answer.eq_ignore_ascii_case("y")))
    }

    /// Prompt without a newline and read one trimmed line.  `None` at end of
    /// input.
    pub fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Give back the writer (tests inspect what was printed).
    pub fn into_output(self) -> W {
        self.output
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
