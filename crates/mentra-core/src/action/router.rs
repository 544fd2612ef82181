use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{Action, ActionKind, QueryHandler, SystemCommand};
use crate::context::SessionContext;
use crate::device::{DeviceController, DeviceInfo, HostAction, HostResult, MediaCommand};
use crate::result::{ShellOutput, ShellResult, outputs_to_result};

/// Hands call and message actions to the conversation engines.
#[async_trait]
pub trait ConversationGateway: Send + Sync {
    /// Starts a calling conversation from a line such as `call mom`.
    async fn start_call(&self, line: &str) -> Vec<ShellOutput>;

    /// Starts a messaging conversation from a line such as `text mom hi`.
    async fn start_message(&self, line: &str) -> Vec<ShellOutput>;
}

/// Dispatches actions to their handler group.
pub struct ActionRouter {
    device: Arc<dyn DeviceController>,
    query: QueryHandler,
    gateway: Option<Arc<dyn ConversationGateway>>,
}

impl ActionRouter {
    pub fn new(device: Arc<dyn DeviceController>, info: Arc<dyn DeviceInfo>) -> Self {
        Self {
            device,
            query: QueryHandler::new(info),
            gateway: None,
        }
    }

    pub fn with_gateway(mut self, gateway: Arc<dyn ConversationGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub async fn route(&self, action: &Action, ctx: &SessionContext) -> ShellResult {
        debug!(kind = %action.kind, verb = %action.verb, "Routing action");
        match action.kind {
            ActionKind::SystemCommand => self.handle_system(action).await,
            ActionKind::Query => self.query.handle(action),
            ActionKind::MakeCall | ActionKind::SendSms => self.handle_conversation(action).await,
            ActionKind::Unknown => {
                ShellResult::invalid(format!("Unknown command: {}", action.verb))
            }
            _ => match host_action(action, ctx) {
                Ok(host) => {
                    let default = default_message(&host);
                    wrap(self.device.perform(&host).await, default, "Failed")
                }
                Err(usage) => ShellResult::invalid(usage),
            },
        }
    }

    async fn handle_system(&self, action: &Action) -> ShellResult {
        let command = match SystemCommand::from_action(action) {
            Ok(command) => command,
            Err(e) => return ShellResult::from_error(e),
        };
        let outcome = self.device.apply(&command).await;
        wrap(outcome, command.success_message(), &command.failure_message())
    }

    async fn handle_conversation(&self, action: &Action) -> ShellResult {
        let Some(gateway) = &self.gateway else {
            return ShellResult::failure("Conversations are not available in this shell");
        };
        let line = action.to_line();
        let outputs = if action.kind == ActionKind::MakeCall {
            gateway.start_call(&line).await
        } else {
            gateway.start_message(&line).await
        };
        outputs_to_result(&outputs)
    }
}

fn wrap(outcome: HostResult, success: String, failure_prefix: &str) -> ShellResult {
    match outcome {
        Ok(Some(text)) => ShellResult::success(text),
        Ok(None) => ShellResult::success(success),
        Err(reason) => ShellResult::failure(format!("{}: {}", failure_prefix, reason)),
    }
}

fn host_action(action: &Action, ctx: &SessionContext) -> Result<HostAction, String> {
    let target = action.target.clone();
    let rest = || {
        let args = action.arguments();
        (!args.is_empty()).then(|| args.join(" "))
    };
    Ok(match action.kind {
        ActionKind::OpenApp => HostAction::LaunchApp(rest().ok_or("Usage: open <app>")?),
        ActionKind::OpenSettings => HostAction::OpenSettings(target),
        ActionKind::PlayMedia => HostAction::Media(MediaCommand::Play(rest())),
        ActionKind::PauseMedia => HostAction::Media(MediaCommand::Pause),
        ActionKind::StopMedia => HostAction::Media(MediaCommand::Stop),
        ActionKind::NextTrack => HostAction::Media(MediaCommand::Next),
        ActionKind::PreviousTrack => HostAction::Media(MediaCommand::Previous),
        ActionKind::NavigateTo => HostAction::Navigate(rest().ok_or("Usage: navigate <place>")?),
        ActionKind::ListFiles => {
            HostAction::ListFiles(ctx.resolve_path(target.as_deref().unwrap_or("")))
        }
        ActionKind::ReadFile => HostAction::ReadFile(
            ctx.resolve_path(target.as_deref().ok_or("Usage: cat <file>")?),
        ),
        ActionKind::WriteFile => {
            let path = target.ok_or("Usage: write <file> <content>")?;
            HostAction::WriteFile {
                path: ctx.resolve_path(&path),
                content: action.entity.clone().unwrap_or_default(),
            }
        }
        ActionKind::DeleteFile => HostAction::DeleteFile(
            ctx.resolve_path(target.as_deref().ok_or("Usage: rm <file>")?),
        ),
        other => return Err(format!("Unsupported action: {}", other)),
    })
}

fn default_message(action: &HostAction) -> String {
    match action {
        HostAction::LaunchApp(app) => format!("Opening {}", app),
        HostAction::OpenSettings(Some(section)) => format!("Opening {} settings", section),
        HostAction::OpenSettings(None) => "Opening settings".to_string(),
        HostAction::Media(MediaCommand::Play(Some(what))) => format!("Playing {}", what),
        HostAction::Media(MediaCommand::Play(None)) => "Playing".to_string(),
        HostAction::Media(MediaCommand::Pause) => "Paused".to_string(),
        HostAction::Media(MediaCommand::Stop) => "Stopped".to_string(),
        HostAction::Media(MediaCommand::Next) => "Next track".to_string(),
        HostAction::Media(MediaCommand::Previous) => "Previous track".to_string(),
        HostAction::Navigate(place) => format!("Navigating to {}", place),
        HostAction::ListFiles(path) => format!("{} is empty", path),
        HostAction::ReadFile(path) => format!("{} is empty", path),
        HostAction::WriteFile { path, .. } => format!("Wrote {}", path),
        HostAction::DeleteFile(path) => format!("Deleted {}", path),
    }
}
