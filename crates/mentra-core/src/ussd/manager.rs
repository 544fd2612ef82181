use chrono::Utc;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::rules::{InteractiveRuleSet, prepare_code};
use super::state::{UssdHistoryEntry, UssdOutcome, UssdResponse, UssdState};
use crate::carrier::{
    CarrierAdapter, CarrierSessionHandle, ServiceCodeReply, ServiceCodeRequest,
    describe_failure_code,
};
use crate::config::UssdConfig;
use crate::error::{Result, ShellError};

/// The carrier session kept open between menu replies.
#[derive(Debug, Clone)]
struct OpenSession {
    handle: CarrierSessionHandle,
    code: String,
    sim_slot: usize,
}

enum Race {
    Reply(ServiceCodeReply),
    TimedOut,
    Cancelled,
}

/// Cancels the request a [`UssdSessionManager`] is currently waiting on.
///
/// Usable from another task while the manager itself is borrowed by
/// `execute`.
#[derive(Clone, Default)]
pub struct UssdCanceller {
    inflight: Arc<Mutex<Option<CancellationToken>>>,
}

impl UssdCanceller {
    /// Cancels the in-flight request, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        match self.inflight.lock() {
            Ok(mut guard) => match guard.take() {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut guard) = self.inflight.lock() {
            if let Some(previous) = guard.replace(token.clone()) {
                previous.cancel();
            }
        }
        token
    }

    fn disarm(&self) {
        if let Ok(mut guard) = self.inflight.lock() {
            guard.take();
        }
    }
}

/// Runs service codes against the carrier and tracks menu sessions.
///
/// Every request races the carrier's reply against a session timer and an
/// external cancellation; whichever finishes first decides the outcome and
/// the other two are dropped with it.
pub struct UssdSessionManager {
    carrier: Arc<dyn CarrierAdapter>,
    rules: InteractiveRuleSet,
    timeout: Duration,
    state: UssdState,
    session: Option<OpenSession>,
    canceller: UssdCanceller,
    history: VecDeque<UssdHistoryEntry>,
    history_limit: usize,
}

impl UssdSessionManager {
    pub fn new(carrier: Arc<dyn CarrierAdapter>, config: &UssdConfig) -> Self {
        Self {
            carrier,
            rules: InteractiveRuleSet::default_rules().clone(),
            timeout: config.timeout(),
            state: UssdState::Idle,
            session: None,
            canceller: UssdCanceller::default(),
            history: VecDeque::new(),
            history_limit: config.history_limit.max(1),
        }
    }

    /// Replaces the interactive-menu rule table.
    pub fn with_rules(mut self, rules: InteractiveRuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn state(&self) -> &UssdState {
        &self.state
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_active_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn canceller(&self) -> UssdCanceller {
        self.canceller.clone()
    }

    /// Sends a service code, or a menu reply when `is_reply` is set and a
    /// session is open.
    ///
    /// New codes are validated; replies are passed through as typed.
    ///
    /// # Errors
    ///
    /// - `InvalidCommand` for a malformed code or a reply with no open session
    /// - `Timeout` when the carrier does not answer in time
    /// - `CarrierFailure` when the carrier reports a failure code
    /// - `Cancelled` when the request was cancelled while waiting
    pub async fn execute(
        &mut self,
        code: &str,
        sim_slot: usize,
        is_reply: bool,
    ) -> Result<UssdOutcome> {
        if matches!(self.state, UssdState::LegacyDialing(_)) {
            self.state = UssdState::Idle;
        }

        let (to_send, session_code, sim_slot, handle) = if is_reply {
            let session = self
                .session
                .clone()
                .ok_or_else(|| ShellError::invalid_command("No active USSD session"))?;
            (
                code.trim().to_string(),
                session.code,
                session.sim_slot,
                Some(session.handle),
            )
        } else {
            let prepared = prepare_code(code)?;
            self.end_session();
            (prepared.clone(), prepared, sim_slot, None)
        };

        if !is_reply && !self.carrier.supports_service_sessions() {
            return self.dial_legacy(&to_send, sim_slot).await;
        }

        info!(code = %to_send, sim_slot, is_reply, "Sending service code");
        self.state = UssdState::Executing(to_send.clone());

        let request = ServiceCodeRequest {
            code: to_send.clone(),
            sim_slot,
            session: handle,
        };
        let carrier = Arc::clone(&self.carrier);
        let token = self.canceller.arm();
        let timeout = self.timeout;

        let race = tokio::select! {
            biased;
            _ = token.cancelled() => Race::Cancelled,
            reply = carrier.start_service_code_session(request) => Race::Reply(reply),
            _ = tokio::time::sleep(timeout) => Race::TimedOut,
        };
        self.canceller.disarm();

        match race {
            Race::Cancelled => {
                debug!(code = %to_send, "Service code request cancelled");
                self.end_session();
                self.state = UssdState::Idle;
                Err(ShellError::Cancelled)
            }
            Race::TimedOut => {
                warn!(code = %to_send, timeout_ms = timeout.as_millis() as u64, "Service code request timed out");
                self.end_session();
                self.state = UssdState::Error("Request timed out".to_string());
                self.record(&session_code, "Request timed out", false);
                Err(ShellError::timeout(
                    "USSD request",
                    timeout.as_millis() as u64,
                ))
            }
            Race::Reply(ServiceCodeReply::Failure { code }) => {
                let message = describe_failure_code(code);
                warn!(code, message = %message, "Carrier rejected service code");
                self.end_session();
                self.state = UssdState::Error(message.clone());
                self.record(&session_code, &message, false);
                Err(ShellError::carrier_failure(code, message))
            }
            Race::Reply(ServiceCodeReply::Response { text, session }) => {
                let interactive = self.rules.is_interactive(&text);
                let response = UssdResponse {
                    code: session_code.clone(),
                    text: text.clone(),
                    timestamp: Utc::now(),
                    is_interactive: interactive,
                    session_active: interactive,
                };
                if interactive {
                    debug!(code = %session_code, "Service code session is interactive");
                    self.session = Some(OpenSession {
                        handle: session,
                        code: session_code.clone(),
                        sim_slot,
                    });
                    self.state = UssdState::Interactive(response.clone());
                } else {
                    self.end_session();
                    self.state = UssdState::Success(response.clone());
                }
                self.record(&session_code, &text, true);
                Ok(UssdOutcome::Response(response))
            }
        }
    }

    /// Replies inside the open interactive session.
    pub async fn send_reply(&mut self, reply: &str) -> Result<UssdOutcome> {
        let sim_slot = self.session.as_ref().map(|s| s.sim_slot).unwrap_or(0);
        self.execute(reply, sim_slot, true).await
    }

    async fn dial_legacy(&mut self, code: &str, sim_slot: usize) -> Result<UssdOutcome> {
        match self.carrier.dial_service_code(code, sim_slot).await {
            Ok(()) => {
                info!(code, sim_slot, "Service code handed to system dialer");
                self.state = UssdState::LegacyDialing(code.to_string());
                self.record(
                    code,
                    &format!("Opened in system dialer (SIM {})", sim_slot + 1),
                    true,
                );
                Ok(UssdOutcome::LegacyDial(code.to_string()))
            }
            Err(e) => {
                self.state = UssdState::Error(e.to_string());
                self.record(code, &e.to_string(), false);
                Err(e)
            }
        }
    }

    /// Closes any session and returns to `Idle`. Safe to call at any time.
    pub fn cancel_session(&mut self) {
        self.end_session();
        self.state = UssdState::Idle;
    }

    /// Drops the stored session handle and any pending request.
    /// The visible state is left as is.
    pub fn end_session(&mut self) {
        self.canceller.cancel();
        self.session = None;
    }

    /// Returns a finished session to `Idle` without touching history.
    pub fn reset_state(&mut self) {
        if self.session.is_none() {
            self.state = UssdState::Idle;
        }
    }

    /// Most recent exchanges first.
    pub fn history(&self) -> impl Iterator<Item = &UssdHistoryEntry> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn record(&mut self, code: &str, response: &str, success: bool) {
        self.history.push_front(UssdHistoryEntry {
            code: code.to_string(),
            response: response.to_string(),
            timestamp: Utc::now(),
            success,
        });
        self.history.truncate(self.history_limit);
    }
}
