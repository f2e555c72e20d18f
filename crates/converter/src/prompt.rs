//! Operator prompt abstraction
//!
//! The pipeline asks the operator two kinds of questions: a yes/no gate before any
//! remote call, and a pick-one selection whenever automatic matching or release
//! lookup cannot decide. Implementations read stdin or accept every default; test
//! builds also get a prompter that replays a script.

#[cfg(test)]
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
#[cfg(test)]
use std::sync::Mutex;

use crate::core::{ConvertError, Result};

/// Trait for handling operator decisions during a conversion
pub trait Prompter: Send + Sync {
    /// Ask the operator to confirm an action
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Ask the operator to pick one of `choices`, returning its position
    ///
    /// `default` is the choice taken when the operator just presses Enter and must be
    /// a valid position in `choices`.
    fn select(&self, message: &str, choices: &[String], default: usize) -> Result<usize>;

    /// Display an informational message to the operator
    fn info(&self, message: &str);

    /// Display a warning message to the operator
    fn warn(&self, message: &str);
}

/// Prompt that reads answers from stdin
#[derive(Debug, Default)]
pub struct CliPrompter;

impl CliPrompter {
    pub fn new() -> Self {
        Self
    }

    fn read_line(&self) -> Result<String> {
        io::stdout().flush().map_err(|e| prompt_io_error("Failed to flush stdout", e))?;

        let mut input = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut input)
            .map_err(|e| prompt_io_error("Failed to read user input", e))?;

        if read == 0 {
            return Err(ConvertError::Prompt {
                message: "stdin closed before an answer was given".to_string(),
                source: None,
            });
        }

        Ok(input.trim().to_string())
    }
}

fn prompt_io_error(message: &str, source: io::Error) -> ConvertError {
    ConvertError::Prompt {
        message: message.to_string(),
        source: Some(source),
    }
}

impl Prompter for CliPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let suffix = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            print!("{} {}: ", message, suffix);
            let input = self.read_line()?.to_lowercase();
            match input.as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => eprintln!("Please enter 'y' for yes or 'n' for no."),
            }
        }
    }

    fn select(&self, message: &str, choices: &[String], default: usize) -> Result<usize> {
        println!("{}", message);
        for (position, choice) in choices.iter().enumerate() {
            let marker = if position == default { '>' } else { ' ' };
            println!(" {} [{}] {}", marker, position, choice);
        }

        loop {
            print!("Choice [{}]: ", default);
            let input = self.read_line()?;
            if input.is_empty() {
                return Ok(default);
            }
            match input.parse::<usize>() {
                Ok(position) if position < choices.len() => return Ok(position),
                _ => eprintln!("Please enter a number between 0 and {}.", choices.len().saturating_sub(1)),
            }
        }
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("⚠️  {}", message);
    }
}

/// Prompt that confirms every gate and takes every default selection
///
/// Use this for unattended runs (`--yes`): suggested matches are accepted, references
/// without a suggestion are skipped and escalations end at "none".
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirmPrompter;

impl Prompter for AutoConfirmPrompter {
    fn confirm(&self, _message: &str, _default: bool) -> Result<bool> {
        Ok(true)
    }

    fn select(&self, _message: &str, _choices: &[String], default: usize) -> Result<usize> {
        Ok(default)
    }

    fn info(&self, message: &str) {
        println!("{}", message);
    }

    fn warn(&self, message: &str) {
        eprintln!("⚠️  {}", message);
    }
}

#[cfg(test)]
/// A pre-recorded operator answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedAnswer {
    Confirm(bool),
    Select(usize),
    /// Take whatever default the question offers
    Default,
}

#[cfg(test)]
/// A question that was asked of a [`ScriptedPrompter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskedQuestion {
    pub message: String,
    pub choices: Vec<String>,
    pub default: usize,
}

#[cfg(test)]
/// Prompt that replays a fixed list of answers and records every question
///
/// Running out of answers, or getting an answer of the wrong kind, is an error so
/// an unexpected extra prompt is never silently answered.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<ScriptedAnswer>>,
    asked: Mutex<Vec<AskedQuestion>>,
}

#[cfg(test)]
impl ScriptedPrompter {
    pub fn new<I: IntoIterator<Item = ScriptedAnswer>>(answers: I) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> Vec<AskedQuestion> {
        self.asked.lock().map(|asked| asked.clone()).unwrap_or_default()
    }

    /// Answers that were never consumed
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|answers| answers.len()).unwrap_or(0)
    }

    fn next_answer(&self, question: AskedQuestion) -> Result<ScriptedAnswer> {
        let message = question.message.clone();
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question);
        }

        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .ok_or_else(|| ConvertError::Prompt {
                message: format!("no scripted answer left for '{}'", message),
                source: None,
            })
    }
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let question = AskedQuestion {
            message: message.to_string(),
            choices: Vec::new(),
            default: usize::from(default),
        };
        match self.next_answer(question)? {
            ScriptedAnswer::Confirm(answer) => Ok(answer),
            ScriptedAnswer::Default => Ok(default),
            ScriptedAnswer::Select(_) => Err(ConvertError::Prompt {
                message: format!("expected a yes/no answer for '{}'", message),
                source: None,
            }),
        }
    }

    fn select(&self, message: &str, choices: &[String], default: usize) -> Result<usize> {
        let question = AskedQuestion {
            message: message.to_string(),
            choices: choices.to_vec(),
            default,
        };
        match self.next_answer(question)? {
            ScriptedAnswer::Select(position) if position < choices.len() => Ok(position),
            ScriptedAnswer::Default => Ok(default),
            answer => Err(ConvertError::Prompt {
                message: format!("scripted answer {:?} does not fit '{}'", answer, message),
                source: None,
            }),
        }
    }

    fn info(&self, _message: &str) {}

    fn warn(&self, _message: &str) {}
}
