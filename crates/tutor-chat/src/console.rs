use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use tutor_core::TutorResult;

/// Line-oriented conversation port.
pub trait Console {
    /// Show `prompt` and read one line without its terminator. `None` once
    /// input is exhausted.
    fn read_line(&mut self, prompt: &str) -> TutorResult<Option<String>>;

    fn write_line(&mut self, line: &str) -> TutorResult<()>;
}

pub struct StdConsole<R, W> {
    input: R,
    output: W,
}

impl StdConsole<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Console for StdConsole<R, W> {
    fn read_line(&mut self, prompt: &str) -> TutorResult<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(&['\n', '\r'][..]).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    fn write_line(&mut self, line: &str) -> TutorResult<()> {
        writeln!(self.output, "{line}")?;
        self.output.flush()?;
        Ok(())
    }
}

/// Console fed from a fixed script. Every prompt (with the answer typed
/// after it) and every printed line is kept in `transcript`.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    inputs: VecDeque<String>,
    pub transcript: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Script lines not consumed yet.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self, prompt: &str) -> TutorResult<Option<String>> {
        let line = self.inputs.pop_front();
        self.transcript
            .push(format!("{prompt}{}", line.as_deref().unwrap_or_default()));
        Ok(line)
    }

    fn write_line(&mut self, line: &str) -> TutorResult<()> {
        self.transcript.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_console_strips_terminators() {
        let input = io::Cursor::new("hello\r\nworld\n");
        let mut out = Vec::new();
        let mut console = StdConsole::new(input, &mut out);

        assert_eq!(console.read_line("> ").unwrap().as_deref(), Some("hello"));
        assert_eq!(console.read_line("> ").unwrap().as_deref(), Some("world"));
        assert_eq!(console.read_line("> ").unwrap(), None);
        console.write_line("bye").unwrap();
        drop(console);

        assert_eq!(String::from_utf8(out).unwrap(), "> > > bye\n");
    }

    #[test]
    fn test_std_console_keeps_empty_line() {
        let mut console = StdConsole::new(io::Cursor::new("\n"), Vec::new());
        assert_eq!(console.read_line("").unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_scripted_console_transcript() {
        let mut console = ScriptedConsole::new(["hi"]);
        assert_eq!(console.read_line("You: ").unwrap().as_deref(), Some("hi"));
        console.write_line("Bot: hello").unwrap();
        assert_eq!(console.read_line("You: ").unwrap(), None);
        assert_eq!(console.transcript, vec!["You: hi", "Bot: hello", "You: "]);
        assert_eq!(console.remaining(), 0);
    }
}
