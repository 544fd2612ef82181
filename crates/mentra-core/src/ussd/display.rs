use super::state::UssdOutcome;
use crate::error::{Result, ShellError};
use crate::result::ShellOutput;

/// Renders the result of a service-code request as shell output.
pub fn render_outcome(result: &Result<UssdOutcome>) -> Vec<ShellOutput> {
    match result {
        Ok(UssdOutcome::Response(response)) => {
            let mut out = vec![ShellOutput::info(format!("USSD {}:", response.code))];
            let kind = if response.is_interactive {
                ShellOutput::info
            } else {
                ShellOutput::success
            };
            out.extend(response.text.lines().map(kind));
            if response.is_interactive {
                out.push(ShellOutput::prompt("Reply with an option (or 'cancel'):"));
            }
            out
        }
        Ok(UssdOutcome::LegacyDial(code)) => vec![
            ShellOutput::success(format!("Dialing USSD: {}", code)),
            ShellOutput::info("Check your system dialer for the response"),
        ],
        Err(ShellError::Cancelled) => vec![ShellOutput::warning("USSD request cancelled")],
        Err(ShellError::Timeout { .. }) => vec![ShellOutput::error("USSD request timed out")],
        Err(e) => vec![ShellOutput::error(format!("USSD error: {}", e))],
    }
}
