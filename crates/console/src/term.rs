//! Line-oriented stdio console.

use std::io::{self, BufRead, IsTerminal, Write};

use async_trait::async_trait;
use azd_types::UxItem;

use crate::{Console, ConsoleError, PromptOptions, SelectOptions, SpinnerStyle};

/// Console backed by process stdin/stderr.
///
/// Prompts and status go to stderr so command output on stdout stays
/// machine-readable. Reads block on stdin inside `spawn_blocking`; EOF on
/// stdin is reported as cancellation.
#[derive(Debug)]
pub struct StdConsole {
    interactive: bool,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            interactive: io::stderr().is_terminal() && io::stdin().is_terminal(),
        }
    }

    async fn read_line() -> Result<String, ConsoleError> {
        let line = tokio::task::spawn_blocking(|| {
            let mut buffer = String::new();
            let read = io::stdin().lock().read_line(&mut buffer)?;
            Ok::<_, io::Error>((read, buffer))
        })
        .await
        .map_err(|join_error| ConsoleError::Io(io::Error::other(join_error)))?;

        let (read, buffer) = line?;
        if read == 0 {
            return Err(ConsoleError::Canceled);
        }
        Ok(buffer.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Console for StdConsole {
    async fn prompt(&self, options: PromptOptions) -> Result<String, ConsoleError> {
        {
            let mut stderr = io::stderr().lock();
            match (&options.default, options.is_password) {
                (Some(default), false) => write!(stderr, "{} [{}] ", options.message, default)?,
                _ => write!(stderr, "{} ", options.message)?,
            }
            stderr.flush()?;
        }

        let input = Self::read_line().await?;
        if input.is_empty()
            && let Some(default) = options.default
        {
            return Ok(default);
        }
        Ok(input)
    }

    async fn select(&self, options: SelectOptions) -> Result<usize, ConsoleError> {
        {
            let mut stderr = io::stderr().lock();
            writeln!(stderr, "{}", options.message)?;
            for (index, choice) in options.choices.iter().enumerate() {
                let marker = if options.default_index == Some(index) { "*" } else { " " };
                writeln!(stderr, " {marker} {}. {choice}", index + 1)?;
            }
        }

        loop {
            {
                let mut stderr = io::stderr().lock();
                match options.default_index {
                    Some(default) => write!(stderr, "Choice [{}]: ", default + 1)?,
                    None => write!(stderr, "Choice: ")?,
                }
                stderr.flush()?;
            }
            let input = Self::read_line().await?;
            if input.is_empty()
                && let Some(default) = options.default_index
            {
                return Ok(default);
            }
            match input.parse::<usize>() {
                Ok(choice) if choice >= 1 && choice <= options.choices.len() => return Ok(choice - 1),
                _ => self.message("Enter the number of one of the listed choices."),
            }
        }
    }

    fn show_spinner(&self, message: &str, _style: SpinnerStyle) {
        if !self.interactive {
            return;
        }
        let mut stderr = io::stderr().lock();
        // \r + clear-line keeps the spinner on a single transient row
        let _ = write!(stderr, "\r\u{1b}[2K{message}");
        let _ = stderr.flush();
    }

    fn emit(&self, item: UxItem) {
        if self.interactive {
            let mut stderr = io::stderr().lock();
            let _ = write!(stderr, "\r\u{1b}[2K");
            let _ = stderr.flush();
        }
        println!("{item}");
    }

    fn message(&self, text: &str) {
        eprintln!("{text}");
    }

    fn is_spinner_interactive(&self) -> bool {
        self.interactive
    }
}
