//! Where the overall goal comes from.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};

/// Prompt shown when no goal was given on the command line.
pub const GOAL_PROMPT: &str = "Please set the overall goal for your crew: ";

/// Source of the overall goal for a crew.
pub trait GoalProvider {
    fn goal(&mut self) -> Result<String>;
}

/// A goal passed as a command-line argument.
#[derive(Debug, Clone)]
pub struct ProvidedGoal(String);

impl ProvidedGoal {
    pub fn new(goal: impl Into<String>) -> Self {
        Self(goal.into())
    }
}

impl GoalProvider for ProvidedGoal {
    fn goal(&mut self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Asks for the goal interactively.
pub struct PromptGoal<R, W> {
    input: R,
    output: W,
}

impl PromptGoal<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on stdout and read from stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptGoal<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
        }
    }
}

impl<R: BufRead, W: Write> GoalProvider for PromptGoal<R, W> {
    fn goal(&mut self) -> Result<String> {
        write!(self.output, "{GOAL_PROMPT}")?;
        self.output.flush()?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).context("Failed to read the overall goal")?;
        if read == 0 {
            anyhow::bail!("No overall goal given (end of input)");
        }
        Ok(line.trim().to_string())
    }
}
