//! Carrier service-code (USSD) sessions.

mod display;
mod manager;
mod rules;
mod state;

pub use display::render_outcome;
pub use manager::{UssdCanceller, UssdSessionManager};
pub use rules::{
    InteractiveRule, InteractiveRuleSet, DEFAULT_INTERACTIVE_RULES, is_valid_code, normalize_code,
    prepare_code,
};
pub use state::{UssdHistoryEntry, UssdOutcome, UssdResponse, UssdState};
