use std::io::{self, BufRead, Write};

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::application::LedgerError;

/// Source of user input lines.
pub trait Prompt {
    /// Show `prompt` and read one line without its trailing newline.
    /// Returns `Ok(None)` at end of input and
    /// [`LedgerError::InterruptedByUser`] when the user presses Ctrl-C.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, LedgerError>;
}

impl<P: Prompt + ?Sized> Prompt for Box<P> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, LedgerError> {
        (**self).read_line(prompt)
    }
}

/// Interactive terminal input with line editing and history.
pub struct EditorPrompt {
    editor: DefaultEditor,
}

impl EditorPrompt {
    pub fn new() -> Result<Self, LedgerError> {
        let editor = DefaultEditor::new().map_err(readline_error)?;
        Ok(Self { editor })
    }
}

impl Prompt for EditorPrompt {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, LedgerError> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    // History is a convenience; failing to record it is not an error.
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Interrupted) => Err(LedgerError::InterruptedByUser),
            Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(readline_error(e)),
        }
    }
}

fn readline_error(err: ReadlineError) -> LedgerError {
    match err {
        ReadlineError::Io(e) => LedgerError::Io(e),
        other => LedgerError::Io(io::Error::other(other)),
    }
}

/// Plain line input from any reader, echoing prompts to `echo`.
/// Used when stdin is not a terminal and in tests.
pub struct LinePrompt<R, W> {
    input: R,
    echo: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, echo: W) -> Self {
        Self { input, echo }
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>, LedgerError> {
        write!(self.echo, "{}", prompt)?;
        self.echo.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Terminal prompt when stdin is a TTY, plain line reading otherwise.
pub fn stdin_prompt() -> Result<Box<dyn Prompt>, LedgerError> {
    use std::io::IsTerminal;

    if io::stdin().is_terminal() {
        Ok(Box::new(EditorPrompt::new()?))
    } else {
        Ok(Box::new(LinePrompt::new(io::stdin().lock(), io::stdout())))
    }
}

/// Ask a yes/no question; anything but `y`/`yes` (including end of input) is no.
pub fn confirm(prompt: &mut dyn Prompt, question: &str) -> Result<bool, LedgerError> {
    let answer = prompt.read_line(&format!("{} (y/N): ", question))?;
    Ok(answer.is_some_and(|a| matches!(a.trim().to_lowercase().as_str(), "y" | "yes")))
}

/// Read a line, substituting `default` for empty input.
pub fn ask_with_default(
    prompt: &mut dyn Prompt,
    label: &str,
    default: &str,
) -> Result<Option<String>, LedgerError> {
    let text = if default.is_empty() {
        format!("{}: ", label)
    } else {
        format!("{} [{}]: ", label, default)
    };
    Ok(prompt.read_line(&text)?.map(|line| {
        let line = line.trim();
        if line.is_empty() {
            default.to_string()
        } else {
            line.to_string()
        }
    }))
}
