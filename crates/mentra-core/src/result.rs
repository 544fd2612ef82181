//! Uniform result and output types returned by every handler.

use serde::Serialize;
use std::time::Duration;
use strum::{AsRefStr, Display};

use crate::action::Action;
use crate::error::ShellError;

/// Outcome status of a shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Success,
    Failure,
    Partial,
    RequiresPermission,
    RequiresConfirmation,
    NotFound,
    InvalidCommand,
}

impl ResultStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Extra data attached to a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResultPayload {
    /// The unexecuted action awaiting confirmation.
    Action(Action),
    /// Structured data for hosts that render it themselves.
    Data(serde_json::Value),
}

/// The result of executing one command.
///
/// Handlers never propagate errors past the executor; every failure is
/// folded into one of these with a matching status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellResult {
    pub status: ResultStatus,
    pub message: String,
    pub payload: Option<ResultPayload>,
    pub elapsed: Duration,
    pub error: Option<ShellError>,
}

impl ShellResult {
    pub fn new(status: ResultStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            payload: None,
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(ResultStatus::Success, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ResultStatus::Failure, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ResultStatus::InvalidCommand, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ResultStatus::NotFound, message)
    }

    /// Builds a result from an error, keeping the error attached.
    pub fn from_error(error: ShellError) -> Self {
        Self {
            status: error.status(),
            message: error.to_string(),
            payload: None,
            elapsed: Duration::ZERO,
            error: Some(error),
        }
    }

    pub fn with_payload(mut self, payload: ResultPayload) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// The action carried by a `RequiresConfirmation` result, if any.
    pub fn pending_action(&self) -> Option<&Action> {
        match &self.payload {
            Some(ResultPayload::Action(action)) => Some(action),
            _ => None,
        }
    }

    /// Renders the result as display lines.
    pub fn to_outputs(&self) -> Vec<ShellOutput> {
        let kind = OutputKind::from(self.status);
        if self.message.is_empty() {
            return Vec::new();
        }
        self.message
            .lines()
            .map(|line| ShellOutput::new(line, kind))
            .collect()
    }
}

/// How a line of output should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputKind {
    Success,
    Error,
    Warning,
    Info,
    Prompt,
    Command,
}

impl From<ResultStatus> for OutputKind {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Success => OutputKind::Success,
            ResultStatus::Failure | ResultStatus::NotFound => OutputKind::Error,
            ResultStatus::InvalidCommand => OutputKind::Warning,
            ResultStatus::RequiresConfirmation | ResultStatus::RequiresPermission => {
                OutputKind::Prompt
            }
            ResultStatus::Partial => OutputKind::Info,
        }
    }
}

/// One line of conversational output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellOutput {
    pub text: String,
    pub kind: OutputKind,
}

impl ShellOutput {
    pub fn new(text: impl Into<String>, kind: OutputKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Success)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Error)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Warning)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Info)
    }

    pub fn prompt(text: impl Into<String>) -> Self {
        Self::new(text, OutputKind::Prompt)
    }
}

/// Folds conversational output into a single result.
///
/// The status follows the most severe line: any error line makes the
/// result a failure, a trailing prompt marks it partial.
pub fn outputs_to_result(outputs: &[ShellOutput]) -> ShellResult {
    let message = outputs
        .iter()
        .map(|o| o.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let status = if outputs.iter().any(|o| o.kind == OutputKind::Error) {
        ResultStatus::Failure
    } else if outputs.iter().any(|o| o.kind == OutputKind::Warning) {
        ResultStatus::InvalidCommand
    } else if outputs.last().is_some_and(|o| o.kind == OutputKind::Prompt) {
        ResultStatus::Partial
    } else {
        ResultStatus::Success
    };
    ShellResult::new(status, message)
}

/// Per-call execution policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOptions {
    pub require_confirmation: bool,
    pub timeout: Duration,
    pub dry_run: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            require_confirmation: false,
            timeout: Duration::from_millis(30_000),
            dry_run: false,
        }
    }
}
