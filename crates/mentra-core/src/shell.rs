//! One shell session: routes each line of input to the conversation
//! engine that owns it, or to the command executor.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::action::{Action, ActionRouter, ConversationGateway};
use crate::alias::{AliasStore, ContactAliasRepository};
use crate::calling::{CallEndedInfo, CallingEngine};
use crate::carrier::CarrierAdapter;
use crate::config::ShellConfig;
use crate::contact::{Contact, ContactDirectory};
use crate::context::SessionContext;
use crate::device::{DeviceController, DeviceInfo};
use crate::executor::{CommandExecutor, is_clear_screen};
use crate::messaging::{MessageStore, MessagingEngine};
use crate::phone;
use crate::result::{
    ExecutionOptions, OutputKind, ResultStatus, ShellOutput, ShellResult, outputs_to_result,
};
use crate::ussd::{UssdCanceller, UssdSessionManager, render_outcome};

const CONFIRM_HINT: &str = "Proceed? (yes/no)";

/// Host collaborators a shell session is built from.
pub struct ShellServices {
    pub carrier: Arc<dyn CarrierAdapter>,
    pub contacts: Arc<dyn ContactDirectory>,
    pub aliases: Arc<dyn ContactAliasRepository>,
    pub messages: Arc<dyn MessageStore>,
    pub device: Arc<dyn DeviceController>,
    pub info: Arc<dyn DeviceInfo>,
}

/// What one submitted line produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellReply {
    pub status: ResultStatus,
    pub outputs: Vec<ShellOutput>,
    /// The host should clear its screen before printing `outputs`.
    pub clear_screen: bool,
}

impl ShellReply {
    fn from_outputs(outputs: Vec<ShellOutput>) -> Self {
        Self {
            status: outputs_to_result(&outputs).status,
            outputs,
            clear_screen: false,
        }
    }

    fn from_result(result: &ShellResult) -> Self {
        Self {
            status: result.status,
            outputs: result.to_outputs(),
            clear_screen: is_clear_screen(result),
        }
    }

    /// The output lines joined with newlines.
    pub fn text(&self) -> String {
        self.outputs
            .iter()
            .map(|o| o.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lets routed `call`/`text` actions start engine conversations.
struct EngineGateway {
    calling: Arc<Mutex<CallingEngine>>,
    messaging: Arc<Mutex<MessagingEngine>>,
}

#[async_trait]
impl ConversationGateway for EngineGateway {
    async fn start_call(&self, line: &str) -> Vec<ShellOutput> {
        self.calling.lock().await.handle_command(line).await
    }

    async fn start_message(&self, line: &str) -> Vec<ShellOutput> {
        self.messaging.lock().await.handle_command(line).await
    }
}

/// A single shell session.
///
/// Input is processed one line at a time. Each engine sits behind its own
/// lock, and no engine lock is held while the executor runs, since routed
/// actions reach the engines again through the gateway.
pub struct Shell {
    context: SessionContext,
    executor: CommandExecutor,
    options: ExecutionOptions,
    calling: Arc<Mutex<CallingEngine>>,
    messaging: Arc<Mutex<MessagingEngine>>,
    ussd: Arc<Mutex<UssdSessionManager>>,
    canceller: UssdCanceller,
    pending_action: Option<Action>,
    prompt: String,
}

impl Shell {
    pub fn new(services: ShellServices, config: &ShellConfig) -> Self {
        let aliases = AliasStore::new(services.aliases);
        let ussd = UssdSessionManager::new(services.carrier.clone(), &config.ussd);
        let canceller = ussd.canceller();
        let ussd = Arc::new(Mutex::new(ussd));

        let calling = Arc::new(Mutex::new(CallingEngine::new(
            services.carrier.clone(),
            aliases.clone(),
            services.contacts.clone(),
            ussd.clone(),
            &config.calling,
        )));
        let messaging = Arc::new(Mutex::new(MessagingEngine::new(
            services.carrier,
            aliases,
            services.contacts,
            services.messages,
            &config.messaging,
        )));

        let gateway = Arc::new(EngineGateway {
            calling: calling.clone(),
            messaging: messaging.clone(),
        });
        let router = ActionRouter::new(services.device, services.info).with_gateway(gateway);
        let executor = CommandExecutor::new(router, config.shell.command_timeout());
        let options = executor.default_options();

        Self {
            context: SessionContext::new(config.shell.history_limit),
            executor,
            options,
            calling,
            messaging,
            ussd,
            canceller,
            pending_action: None,
            prompt: config.shell.prompt.clone(),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.context
    }

    /// Replaces the options used for executor commands.
    pub fn set_options(&mut self, options: ExecutionOptions) {
        self.options = options;
    }

    /// A handle that cancels the service-code request in flight, usable
    /// while `submit` is running.
    pub fn canceller(&self) -> UssdCanceller {
        self.canceller.clone()
    }

    /// Processes one line of input.
    pub async fn submit(&mut self, line: &str) -> ShellReply {
        let input = line.trim();
        if input.is_empty() {
            return ShellReply::from_outputs(Vec::new());
        }

        if let Some(action) = self.pending_action.take() {
            match input.to_lowercase().as_str() {
                "yes" | "y" => {
                    let result = self
                        .executor
                        .execute_action(&mut self.context, &action, &self.options)
                        .await;
                    return ShellReply::from_result(&result);
                }
                "no" | "n" | "cancel" => {
                    return ShellReply::from_outputs(vec![ShellOutput::info("Cancelled.")]);
                }
                _ => debug!(kind = %action.kind, "Pending confirmation dropped"),
            }
        }

        // `clear` also abandons a half-built message.
        if matches!(input, "clear" | "c") {
            return self.run_executor(input).await;
        }

        {
            let mut calling = self.calling.lock().await;
            if calling.is_in_conversation() {
                return ShellReply::from_outputs(calling.handle_response(input).await);
            }
            if calling.is_in_call() {
                return ShellReply::from_outputs(calling.handle_call_control(input).await);
            }
        }

        {
            let mut ussd = self.ussd.lock().await;
            if ussd.state().is_interactive() {
                if matches!(input.to_lowercase().as_str(), "cancel" | "exit" | "quit") {
                    ussd.cancel_session();
                    return ShellReply::from_outputs(vec![ShellOutput::info(
                        "USSD session cancelled",
                    )]);
                }
                let result = ussd.send_reply(input).await;
                return ShellReply::from_outputs(render_outcome(&result));
            }
        }

        {
            let mut messaging = self.messaging.lock().await;
            if messaging.handles(input) {
                return ShellReply::from_outputs(messaging.handle_command(input).await);
            }
        }

        {
            let mut calling = self.calling.lock().await;
            if phone::is_service_code(input) {
                let line = format!("call {}", input);
                return ShellReply::from_outputs(calling.handle_command(&line).await);
            }
            if calling.is_calling_command(input) {
                return ShellReply::from_outputs(calling.handle_command(input).await);
            }
        }

        {
            let mut messaging = self.messaging.lock().await;
            if messaging.is_messaging_command(input) {
                if let Some(outputs) = messaging.try_start(input).await {
                    return ShellReply::from_outputs(outputs);
                }
            }
        }

        self.run_executor(input).await
    }

    async fn run_executor(&mut self, input: &str) -> ShellReply {
        if input.contains(';') || input.contains("&&") {
            let results = self
                .executor
                .execute_chain(&mut self.context, input, &self.options)
                .await;
            let status = results
                .last()
                .map(|r| r.status)
                .unwrap_or(ResultStatus::Success);
            let clear_screen = results.iter().any(is_clear_screen);
            return ShellReply {
                status,
                outputs: results.iter().flat_map(ShellResult::to_outputs).collect(),
                clear_screen,
            };
        }

        let result = self
            .executor
            .execute(&mut self.context, input, &self.options)
            .await;
        if is_clear_screen(&result) {
            self.messaging.lock().await.reset();
        }
        let mut reply = ShellReply::from_result(&result);
        if let Some(action) = result.pending_action() {
            if result.status == ResultStatus::RequiresConfirmation {
                reply.outputs.push(ShellOutput::prompt(CONFIRM_HINT));
                self.pending_action = Some(action.clone());
            }
        }
        reply
    }

    /// Abandons every pending question. Active calls and the open
    /// message thread are kept.
    pub async fn reset_conversations(&mut self) {
        self.pending_action = None;
        self.calling.lock().await.reset();
        self.messaging.lock().await.reset();
        self.ussd.lock().await.cancel_session();
    }

    /// True while some engine is waiting for an answer.
    pub async fn is_in_conversation(&self) -> bool {
        self.pending_action.is_some()
            || self.calling.lock().await.is_in_conversation()
            || self.messaging.lock().await.is_in_conversation()
            || self.ussd.lock().await.state().is_interactive()
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    pub async fn on_call_connected(&self) {
        self.calling.lock().await.on_call_connected();
    }

    pub async fn on_remote_hangup(&self) -> Option<CallEndedInfo> {
        self.calling.lock().await.on_remote_hangup()
    }

    /// The host's contact picker returned a contact for the messaging flow.
    pub async fn on_contact_selected(&self, contact: &Contact, number: &str) -> ShellReply {
        let outputs = self
            .messaging
            .lock()
            .await
            .on_contact_selected(contact, number)
            .await;
        ShellReply::from_outputs(outputs)
    }

    /// The host's contact picker returned a number for the calling flow.
    pub async fn on_call_target_picked(&self, number: &str, name: Option<String>) -> ShellReply {
        ShellReply::from_outputs(self.calling.lock().await.set_call_target(number, name))
    }
}

/// Output kinds that end a turn waiting for the user.
pub fn awaits_answer(reply: &ShellReply) -> bool {
    reply
        .outputs
        .last()
        .is_some_and(|o| o.kind == OutputKind::Prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{ContactAlias, InMemoryContactAliasRepository};
    use crate::carrier::{CarrierSessionHandle, ServiceCodeReply};
    use crate::device::HostAction;
    use crate::testing::{
        CarrierCall, FixedContacts, MemoryMessageStore, RecordingCarrier, RecordingDevice,
        ScriptedReply, StaticInfo, incoming,
    };
    use pretty_assertions::assert_eq;

    struct Fixture {
        shell: Shell,
        carrier: Arc<RecordingCarrier>,
        device: Arc<RecordingDevice>,
    }

    fn fixture(sims: usize, aliases: Vec<ContactAlias>) -> Fixture {
        let carrier = Arc::new(RecordingCarrier::new(sims));
        let device = Arc::new(RecordingDevice::default());
        let services = ShellServices {
            carrier: carrier.clone(),
            contacts: Arc::new(FixedContacts::sample()),
            aliases: Arc::new(InMemoryContactAliasRepository::with_aliases(aliases)),
            messages: Arc::new(MemoryMessageStore::with_messages(vec![incoming(
                "m1",
                "+15550002222",
                "lunch?",
                5,
                false,
            )])),
            device: device.clone(),
            info: Arc::new(StaticInfo),
        };
        Fixture {
            shell: Shell::new(services, &ShellConfig::default()),
            carrier,
            device,
        }
    }

    fn mom() -> ContactAlias {
        let jane = Contact::new("c1", "Jane", "+15550001111");
        ContactAlias::for_contact("mom", &jane, "+15550001111")
    }

    #[tokio::test]
    async fn test_text_alias_sends_once_without_prompts() {
        let mut f = fixture(2, vec![mom()]);
        let reply = f.shell.submit("text mom hello").await;
        assert!(!awaits_answer(&reply));
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550001111".to_string(), "hello".to_string(), 0)]
        );
        assert!(!f.shell.is_in_conversation().await);
    }

    #[tokio::test]
    async fn test_call_flow_and_in_call_control() {
        let mut f = fixture(2, Vec::new());
        let reply = f.shell.submit("call +254712345678").await;
        assert!(awaits_answer(&reply));
        assert_eq!(reply.status, ResultStatus::Partial);

        f.shell.submit("2").await;
        assert_eq!(
            f.carrier.placed_calls(),
            vec![("+254712345678".to_string(), 1)]
        );

        // Digits while in a call are tones, not commands.
        f.shell.submit("1").await;
        assert!(f.carrier.calls().contains(&CarrierCall::Dtmf('1')));

        let reply = f.shell.submit("x").await;
        assert!(reply.text().starts_with("Call ended: +254712345678"));
        f.shell.on_call_connected().await;
        assert!(f.shell.on_remote_hangup().await.is_none());
    }

    #[tokio::test]
    async fn test_bare_service_code_and_interactive_reply() {
        let mut f = fixture(1, Vec::new());
        f.carrier.script(ScriptedReply::Now(ServiceCodeReply::Response {
            text: "1. Balance\n2. Data\n0. Exit".into(),
            session: CarrierSessionHandle("s1".into()),
        }));
        f.carrier.script(ScriptedReply::Now(ServiceCodeReply::Response {
            text: "Your balance is KES 100".into(),
            session: CarrierSessionHandle("s1".into()),
        }));

        let reply = f.shell.submit("*144#").await;
        assert_eq!(reply.outputs[0].text, "USSD *144#:");
        assert!(awaits_answer(&reply));

        let reply = f.shell.submit("1").await;
        assert!(reply.text().contains("Your balance is KES 100"));
        let requests = f.carrier.service_requests();
        assert_eq!(requests[1].code, "1");
        assert_eq!(
            requests[1].session,
            Some(CarrierSessionHandle("s1".into()))
        );
        assert!(!f.shell.is_in_conversation().await);
    }

    #[tokio::test]
    async fn test_interactive_session_cancel() {
        let mut f = fixture(1, Vec::new());
        f.carrier.script(ScriptedReply::Now(ServiceCodeReply::Response {
            text: "Select option:\n1. Buy bundle".into(),
            session: CarrierSessionHandle("s2".into()),
        }));
        f.shell.submit("check data").await;
        let reply = f.shell.submit("exit").await;
        assert_eq!(reply.text(), "USSD session cancelled");
        assert!(!f.shell.is_in_conversation().await);
        assert_eq!(f.carrier.service_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let mut f = fixture(1, Vec::new());
        let reply = f.shell.submit("rm notes.txt").await;
        assert_eq!(reply.status, ResultStatus::RequiresConfirmation);
        assert_eq!(
            reply.outputs.last().map(|o| o.text.as_str()),
            Some(CONFIRM_HINT)
        );
        assert!(f.device.performed().is_empty());

        let reply = f.shell.submit("y").await;
        assert_eq!(reply.status, ResultStatus::Success);
        assert_eq!(
            f.device.performed(),
            vec![HostAction::DeleteFile("/notes.txt".into())]
        );

        f.shell.submit("rm other.txt").await;
        let reply = f.shell.submit("no").await;
        assert_eq!(reply.text(), "Cancelled.");
        assert_eq!(f.device.performed().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_message_conversation() {
        let mut f = fixture(2, Vec::new());
        f.shell.submit("send a message").await;
        assert!(f.shell.is_in_conversation().await);

        f.shell.reset_conversations().await;
        assert!(!f.shell.is_in_conversation().await);

        f.shell.submit("text").await;
        let reply = f.shell.submit("4").await;
        assert_eq!(reply.text(), "Cancelled.");

        f.shell.submit("send a message").await;
        let reply = f.shell.submit("clear").await;
        assert!(reply.clear_screen);
        assert!(reply.outputs.is_empty());
        assert!(!f.shell.is_in_conversation().await);
    }

    #[tokio::test]
    async fn test_executor_commands_and_chain() {
        let mut f = fixture(1, Vec::new());
        let reply = f.shell.submit("cd /sdcard && pwd").await;
        assert_eq!(reply.text(), "Changed directory to /sdcard\n/sdcard");
        assert_eq!(f.shell.context().working_directory(), "/sdcard");

        let reply = f.shell.submit("wifi off").await;
        assert_eq!(reply.text(), "WiFi disabled");
        assert_eq!(f.device.applied().len(), 1);
    }

    #[tokio::test]
    async fn test_line_mentioning_messages_reaches_executor() {
        let mut f = fixture(1, Vec::new());
        let reply = f.shell.submit("open messages").await;
        assert_eq!(reply.status, ResultStatus::Success);
        assert_eq!(reply.text(), "Opening messages");
        assert_eq!(
            f.device.performed(),
            vec![HostAction::LaunchApp("messages".into())]
        );
        assert!(!f.shell.is_in_conversation().await);
    }

    #[tokio::test]
    async fn test_inbox_and_quick_reply() {
        let mut f = fixture(1, Vec::new());
        let reply = f.shell.submit("unread").await;
        assert_eq!(reply.text(), "You have 1 unread message");

        f.shell.submit("read john").await;
        assert_eq!(f.shell.submit("unread").await.text(), "No unread messages");
        let reply = f.shell.submit("reply on my way").await;
        assert_eq!(reply.status, ResultStatus::Success);
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550002222".to_string(), "on my way".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_routed_sms_action_reaches_messaging() {
        let mut f = fixture(1, vec![mom()]);
        let action = Action::from_command(&crate::command::parse("sms mom running late"));
        let result = f
            .shell
            .executor
            .execute_action(&mut f.shell.context, &action, &f.shell.options)
            .await;
        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(
            f.carrier.texts(),
            vec![("+15550001111".to_string(), "running late".to_string(), 0)]
        );
    }
}
