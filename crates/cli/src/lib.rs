//! Library half of the `prosopon` binary: command implementations and
//! artifact writers, split out so integration tests can drive them
//! without spawning a process.

pub mod artifacts;
pub mod exit_codes;
pub mod run;

use exit_codes::{EXIT_INVALID_CONFIG, EXIT_INVARIANT, EXIT_RUNTIME};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVARIANT, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
