//! Blocking line-based user prompts.
use std::cell::RefCell;
use std::io::{BufRead, StdinLock, Stdout, Write};

use crate::error::PromptError;

/// Upper bound on re-asks before a prompt gives up.
pub const MAX_ATTEMPTS: usize = 10;

/// Source of yes/no answers for interactive stages.
#[cfg_attr(test, mockall::automock)]
pub trait Prompt {
    /// Ask a yes/no `question`. An empty answer selects `default` when set.
    ///
    /// End of input is never taken as an answer, whatever the default.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read, ends without an answer, or
    /// stays invalid for [`MAX_ATTEMPTS`] tries.
    fn confirm(&self, question: &str, default: Option<bool>) -> Result<bool, PromptError>;
}

/// [`Prompt`] reading answers line by line from `R` and writing questions to `W`.
#[derive(Debug)]
pub struct LinePrompt<R, W> {
    input: RefCell<R>,
    output: RefCell<W>,
}

impl LinePrompt<StdinLock<'static>, Stdout> {
    /// Prompt on the process's stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    /// Prompt reading from `input` and writing questions to `output`.
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input: RefCell::new(input),
            output: RefCell::new(output),
        }
    }

    /// Consume the prompt and return the output sink.
    pub fn into_output(self) -> W {
        self.output.into_inner()
    }

    fn say(&self, line: &str) -> Result<(), PromptError> {
        let mut out = self.output.borrow_mut();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    /// Show `prompt` and read one line. `None` means end of input.
    fn read_answer(&self, prompt: &str) -> Result<Option<String>, PromptError> {
        {
            let mut out = self.output.borrow_mut();
            write!(out, "{prompt} ")?;
            out.flush()?;
        }
        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask for free text.
    ///
    /// An empty answer selects `default` and is returned without validation
    /// or confirmation; end of input does not. Otherwise the answer must pass `validator` and, when
    /// `confirm_required` is set, be confirmed with a follow-up yes/no.
    ///
    /// # Errors
    ///
    /// Returns an error if input cannot be read, ends without an answer, or
    /// no acceptable answer is given within [`MAX_ATTEMPTS`] tries.
    pub fn ask(
        &self,
        question: &str,
        default: Option<&str>,
        confirm_required: bool,
        validator: Option<fn(&str) -> bool>,
    ) -> Result<String, PromptError> {
        let prompt = default.map_or_else(|| question.to_string(), |d| format!("{question} ({d})"));

        for _ in 0..MAX_ATTEMPTS {
            let Some(answer) = self.read_answer(&prompt)? else {
                return Err(PromptError::EndOfInput);
            };

            if answer.is_empty() {
                if let Some(d) = default {
                    return Ok(d.to_string());
                }
                continue;
            }
            if default == Some(answer.as_str()) {
                return Ok(answer);
            }

            if let Some(valid) = validator
                && !valid(&answer)
            {
                self.say(&format!("Invalid input: {answer}"))?;
                continue;
            }

            if confirm_required && !self.confirm(&format!("Confirm '{answer}'?"), Some(true))? {
                continue;
            }
            return Ok(answer);
        }

        Err(PromptError::TooManyAttempts {
            attempts: MAX_ATTEMPTS,
        })
    }
}

impl<R: BufRead, W: Write> Prompt for LinePrompt<R, W> {
    fn confirm(&self, question: &str, default: Option<bool>) -> Result<bool, PromptError> {
        let options = match default {
            Some(true) => "(Y/n)",
            Some(false) => "(y/N)",
            None => "(y/n)",
        };
        let prompt = format!("{question} {options}");

        for _ in 0..MAX_ATTEMPTS {
            let Some(answer) = self.read_answer(&prompt)? else {
                return Err(PromptError::EndOfInput);
            };
            match answer.to_uppercase().as_str() {
                "Y" => return Ok(true),
                "N" => return Ok(false),
                "" => {
                    if let Some(d) = default {
                        return Ok(d);
                    }
                }
                _ => self.say(&format!("Invalid input: '{answer}'"))?,
            }
        }

        Err(PromptError::TooManyAttempts {
            attempts: MAX_ATTEMPTS,
        })
    }
}
