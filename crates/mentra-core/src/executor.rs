//! Runs one line through parse, built-ins, confirmation and routing.

use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::action::{Action, ActionRouter};
use crate::builtin::{self, find_shell_builtin};
use crate::command::{Command, parse, parse_multiple, validate};
use crate::context::{SessionContext, split_assignment};
use crate::error::ShellError;
use crate::result::{ExecutionOptions, ResultPayload, ResultStatus, ShellResult};

/// Payload marking a result that should clear the screen.
pub const CLEAR_SCREEN: &str = "clear_screen";

const DEFAULT_HISTORY_COUNT: usize = 10;

/// True when `result` asks the host to clear its screen.
pub fn is_clear_screen(result: &ShellResult) -> bool {
    matches!(&result.payload, Some(ResultPayload::Data(Value::String(s))) if s == CLEAR_SCREEN)
}

/// Executes commands against a session context.
///
/// Never returns an error: every failure is folded into the result with
/// a matching status, and the elapsed time is stamped on the way out.
pub struct CommandExecutor {
    router: ActionRouter,
    default_timeout: Duration,
}

impl CommandExecutor {
    pub fn new(router: ActionRouter, default_timeout: Duration) -> Self {
        Self {
            router,
            default_timeout,
        }
    }

    /// Options using the configured timeout.
    pub fn default_options(&self) -> ExecutionOptions {
        ExecutionOptions {
            timeout: self.default_timeout,
            ..ExecutionOptions::default()
        }
    }

    /// Executes one line.
    ///
    /// Shell aliases are expanded first and `!!` is replaced by the last
    /// command. Built-ins run before validation.
    pub async fn execute(
        &self,
        ctx: &mut SessionContext,
        line: &str,
        options: &ExecutionOptions,
    ) -> ShellResult {
        let started = Instant::now();
        let result = self.execute_line(ctx, line, options).await;
        ctx.set_last_result(result.clone());
        result.with_elapsed(started.elapsed())
    }

    /// Executes each `;` or `&&` separated command, stopping at the first
    /// one that does not succeed.
    pub async fn execute_chain(
        &self,
        ctx: &mut SessionContext,
        line: &str,
        options: &ExecutionOptions,
    ) -> Vec<ShellResult> {
        let mut results = Vec::new();
        for command in parse_multiple(line) {
            let result = self.execute(ctx, &command.raw, options).await;
            let keep_going = result.is_success();
            results.push(result);
            if !keep_going {
                break;
            }
        }
        results
    }

    /// Runs an action returned earlier with `RequiresConfirmation`,
    /// skipping the confirmation gate.
    pub async fn execute_action(
        &self,
        ctx: &mut SessionContext,
        action: &Action,
        options: &ExecutionOptions,
    ) -> ShellResult {
        let started = Instant::now();
        info!(kind = %action.kind, "Executing confirmed action");
        let result = self.run_action(ctx, action, options).await;
        ctx.set_last_result(result.clone());
        result.with_elapsed(started.elapsed())
    }

    async fn execute_line(
        &self,
        ctx: &mut SessionContext,
        line: &str,
        options: &ExecutionOptions,
    ) -> ShellResult {
        let mut line = ctx.resolve_alias(line);
        if line.trim() == "!!" {
            match ctx.last_command() {
                Some(previous) => {
                    debug!(command = %previous.raw, "Repeating last command");
                    line = previous.raw.clone();
                }
                None => return ShellResult::failure("No previous command"),
            }
        }

        let command = parse(&line);
        if command.is_empty() {
            return ShellResult::success("");
        }
        ctx.add_to_history(command.clone());
        ctx.set_last_command(command.clone());

        if let Some(result) = self.run_builtin(ctx, &command) {
            return result;
        }
        if !validate(&command) {
            return ShellResult::invalid("Invalid command syntax");
        }

        let action = Action::from_command(&command);
        if options.require_confirmation || action.requires_confirmation {
            return ShellResult::new(
                ResultStatus::RequiresConfirmation,
                format!("Command requires confirmation: {}", command.raw),
            )
            .with_payload(ResultPayload::Action(action));
        }
        self.run_action(ctx, &action, options).await
    }

    async fn run_action(
        &self,
        ctx: &SessionContext,
        action: &Action,
        options: &ExecutionOptions,
    ) -> ShellResult {
        if options.dry_run {
            return ShellResult::success(format!("Dry run: Would execute {}", action.kind))
                .with_payload(ResultPayload::Action(action.clone()));
        }

        match tokio::time::timeout(options.timeout, self.router.route(action, ctx)).await {
            Ok(result) => match &result.error {
                Some(e) if !e.is_user_error() && !e.is_not_found() => {
                    warn!(kind = %action.kind, error = %e, "Action failed");
                    ShellResult {
                        message: format!("Execution failed: {}", e),
                        ..result
                    }
                }
                _ => result,
            },
            Err(_) => {
                let after_ms = options.timeout.as_millis() as u64;
                warn!(kind = %action.kind, after_ms, "Action timed out");
                ShellResult {
                    message: format!("Command timed out after {}ms", after_ms),
                    ..ShellResult::from_error(ShellError::timeout(action.kind.to_string(), after_ms))
                }
            }
        }
    }

    fn run_builtin(&self, ctx: &mut SessionContext, command: &Command) -> Option<ShellResult> {
        let builtin = find_shell_builtin(&command.verb)?;
        let result = match builtin.name {
            "cd" => {
                let path = command.target.as_deref().unwrap_or("/");
                let dir = ctx.change_directory(path);
                ShellResult::success(format!("Changed directory to {}", dir))
            }
            "pwd" => ShellResult::success(ctx.working_directory()),
            "history" => {
                let count = command
                    .target
                    .as_deref()
                    .and_then(|t| t.parse::<usize>().ok())
                    .unwrap_or(DEFAULT_HISTORY_COUNT);
                let mut entries = ctx.get_history(count);
                entries.reverse();
                let text = entries
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("{}. {}", i + 1, c.raw))
                    .collect::<Vec<_>>()
                    .join("\n");
                ShellResult::success(text)
            }
            "clear" => ShellResult::success("")
                .with_payload(ResultPayload::Data(Value::String(CLEAR_SCREEN.to_string()))),
            "export" => match command.target.as_deref().and_then(split_assignment) {
                Some((key, value)) => {
                    let message = format!("Set {}={}", key, value);
                    ctx.set_env(key, value);
                    ShellResult::success(message)
                }
                None => ShellResult::invalid("Usage: export VAR=value"),
            },
            "env" => ShellResult::success(
                ctx.get_all_env()
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            "alias" => self.alias_builtin(ctx, command),
            "help" => ShellResult::success(builtin::help_text()),
            "syshelp" => ShellResult::success(builtin::syshelp_text()),
            // `!!` is replaced before parsing; reaching here means it was
            // followed by arguments.
            "!!" => ShellResult::invalid("Usage: !!"),
            _ => return None,
        };
        debug!(builtin = builtin.name, status = %result.status, "Ran built-in");
        Some(result)
    }

    fn alias_builtin(&self, ctx: &mut SessionContext, command: &Command) -> ShellResult {
        if command.target.is_none() {
            let text = ctx
                .get_all_aliases()
                .iter()
                .map(|(k, v)| format!("alias {}='{}'", k, v))
                .collect::<Vec<_>>()
                .join("\n");
            return ShellResult::success(text);
        }
        let rest = command
            .raw
            .trim()
            .get("alias".len()..)
            .unwrap_or_default()
            .trim();
        match split_assignment(rest) {
            Some((name, expansion)) => {
                let message = format!("Set alias {}='{}'", name, expansion);
                ctx.set_alias(name, expansion);
                ShellResult::success(message)
            }
            None => ShellResult::invalid("Usage: alias name=value"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::device::HostAction;
    use crate::testing::{RecordingDevice, StaticInfo};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn executor() -> (CommandExecutor, Arc<RecordingDevice>) {
        let device = Arc::new(RecordingDevice::default());
        let router = ActionRouter::new(device.clone(), Arc::new(StaticInfo));
        (
            CommandExecutor::new(router, Duration::from_secs(30)),
            device,
        )
    }

    #[tokio::test]
    async fn test_builtins_update_context() {
        let (exec, _) = executor();
        let mut ctx = SessionContext::default();
        let opts = exec.default_options();

        let result = exec.execute(&mut ctx, "cd /sdcard/music", &opts).await;
        assert_eq!(result.message, "Changed directory to /sdcard/music");
        assert_eq!(exec.execute(&mut ctx, "pwd", &opts).await.message, "/sdcard/music");

        let result = exec.execute(&mut ctx, "export EDITOR=vim", &opts).await;
        assert_eq!(result.message, "Set EDITOR=vim");
        assert_eq!(ctx.get_env("EDITOR"), Some("vim"));

        let result = exec.execute(&mut ctx, "export EDITOR", &opts).await;
        assert_eq!(result.status, ResultStatus::InvalidCommand);

        let result = exec.execute(&mut ctx, "alias gs='show storage'", &opts).await;
        assert_eq!(result.message, "Set alias gs='show storage'");
        assert_eq!(ctx.get_alias("gs"), Some("show storage"));

        let result = exec.execute(&mut ctx, "history 2", &opts).await;
        assert_eq!(result.message, "1. alias gs='show storage'\n2. history 2");
    }

    #[tokio::test]
    async fn test_alias_expansion_and_repeat() {
        let (exec, _) = executor();
        let mut ctx = SessionContext::default();
        let opts = exec.default_options();

        let result = exec.execute(&mut ctx, "!!", &opts).await;
        assert_eq!(result.message, "No previous command");

        exec.execute(&mut ctx, "alias st=show time", &opts).await;
        let result = exec.execute(&mut ctx, "st", &opts).await;
        assert!(result.message.starts_with("Current time: "));

        let result = exec.execute(&mut ctx, "!!", &opts).await;
        assert!(result.message.starts_with("Current time: "));
        assert_eq!(ctx.last_command().map(|c| c.raw.as_str()), Some("show time"));
    }

    #[tokio::test]
    async fn test_clear_and_validation() {
        let (exec, _) = executor();
        let mut ctx = SessionContext::default();
        let opts = exec.default_options();
        assert!(is_clear_screen(&exec.execute(&mut ctx, "c", &opts).await));

        let result = exec.execute(&mut ctx, "open", &opts).await;
        assert_eq!(result.status, ResultStatus::InvalidCommand);
        assert_eq!(result.message, "Invalid command syntax");

        let result = exec.execute(&mut ctx, "frobnicate now", &opts).await;
        assert_eq!(result.message, "Unknown command: frobnicate");
    }

    #[tokio::test]
    async fn test_confirmation_gate_and_execute_action() {
        let (exec, device) = executor();
        let mut ctx = SessionContext::default();
        let opts = exec.default_options();

        let result = exec.execute(&mut ctx, "rm notes.txt", &opts).await;
        assert_eq!(result.status, ResultStatus::RequiresConfirmation);
        assert!(device.performed().is_empty());

        let action = result.pending_action().cloned().unwrap();
        assert_eq!(action.kind, ActionKind::DeleteFile);
        let result = exec.execute_action(&mut ctx, &action, &opts).await;
        assert!(result.is_success());
        assert_eq!(
            device.performed(),
            vec![HostAction::DeleteFile("/notes.txt".into())]
        );

        let forced = ExecutionOptions {
            require_confirmation: true,
            ..exec.default_options()
        };
        let result = exec.execute(&mut ctx, "wifi on", &forced).await;
        assert_eq!(result.status, ResultStatus::RequiresConfirmation);
    }

    #[tokio::test]
    async fn test_dry_run() {
        let (exec, device) = executor();
        let mut ctx = SessionContext::default();
        let opts = ExecutionOptions {
            dry_run: true,
            ..exec.default_options()
        };
        let result = exec.execute(&mut ctx, "wifi off", &opts).await;
        assert_eq!(result.message, "Dry run: Would execute SystemCommand");
        assert!(device.applied().is_empty());
    }

    struct SlowDevice;

    #[async_trait]
    impl crate::device::DeviceController for SlowDevice {
        async fn apply(&self, _: &crate::action::SystemCommand) -> crate::device::HostResult {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }

        async fn perform(&self, _: &HostAction) -> crate::device::HostResult {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let router = ActionRouter::new(Arc::new(SlowDevice), Arc::new(StaticInfo));
        let exec = CommandExecutor::new(router, Duration::from_millis(500));
        let mut ctx = SessionContext::default();
        let result = exec.execute(&mut ctx, "reboot", &exec.default_options()).await;
        assert_eq!(result.status, ResultStatus::Failure);
        assert_eq!(result.message, "Command timed out after 500ms");
        assert!(result.error.as_ref().is_some_and(|e| e.is_timeout()));
    }

    #[tokio::test]
    async fn test_execute_chain_stops_on_failure() {
        let (exec, _) = executor();
        let mut ctx = SessionContext::default();
        let opts = exec.default_options();
        let results = exec
            .execute_chain(&mut ctx, "cd /tmp; bogus && pwd", &opts)
            .await;
        assert_eq!(results.len(), 2);
        assert_eq!(ctx.working_directory(), "/tmp");
    }
}
