//! Interactive yes/no confirmation on the terminal

use std::cell::RefCell;
use std::io::{BufRead, Write};

use bootsys_core::errors::{PlatformError, Result};
use bootsys_core::groups::Confirm;
use tokio::runtime::RuntimeFlavor;

/// Asks on `output` and reads answers from `input` until one of the choices
/// is given. End of input counts as declining.
pub struct TerminalPrompt<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl TerminalPrompt<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    #[cfg(test)]
    fn into_output(self) -> W {
        self.output.into_inner()
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalPrompt<R, W> {
    fn confirm(&self, prompt: &str, choices: &[&str]) -> Result<String> {
        // Reading stdin blocks; hand this worker's other tasks off while it does
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| self.ask(prompt, choices))
            }
            _ => self.ask(prompt, choices),
        }
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    fn ask(&self, prompt: &str, choices: &[&str]) -> Result<String> {
        let mut input = self.input.borrow_mut();
        let mut output = self.output.borrow_mut();

        writeln!(output, "{}", prompt)?;
        loop {
            write!(output, "[{}]: ", choices.join(","))?;
            output.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Err(PlatformError::ConfirmationDeclined);
            }

            let answer = line.trim().to_lowercase();
            if let Some(choice) = choices.iter().find(|c| **c == answer) {
                return Ok(choice.to_string());
            }
            writeln!(
                output,
                "Input must be one of the following: {}.",
                choices.join(", ")
            )?;
        }
    }
}
