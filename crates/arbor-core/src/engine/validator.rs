//! Invocation validation.
//!
//! Decides, from the errors reported by the command-line parser, whether an
//! invocation may proceed to plan building.

use super::error::ValidationError;
use crate::constants::MSG_REQUIRED_COMMAND;

/// One error reported while parsing the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn required_command() -> Self {
        Self::new(MSG_REQUIRED_COMMAND)
    }

    pub fn is_required_command(&self) -> bool {
        self.message == MSG_REQUIRED_COMMAND
    }
}

/// Gatekeeper run before any plan is built.
pub struct InvocationValidator;

impl InvocationValidator {
    /// Validates parse errors against the number of tokens supplied.
    ///
    /// - no errors: ok
    /// - several errors: fails with the last one
    /// - a single error with zero tokens: fails with it
    /// - a single "Required command was not provided." error otherwise: ok,
    ///   so the plan builder can report a more specific failure
    /// - any other single error: fails with it
    pub fn validate(errors: &[ParseError], token_count: usize) -> Result<(), ValidationError> {
        match errors {
            [] => Ok(()),
            [only] => {
                if token_count == 0 || !only.is_required_command() {
                    Err(ValidationError::new(only.message.clone()))
                } else {
                    Ok(())
                }
            }
            [.., last] => Err(ValidationError::new(last.message.clone())),
        }
    }
}
