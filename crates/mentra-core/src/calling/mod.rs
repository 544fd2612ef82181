//! Calling conversations: target resolution, SIM selection and in-call
//! control.

mod engine;
mod shortcuts;
mod state;

pub(crate) use engine::parse_index;
pub use engine::CallingEngine;
pub use shortcuts::{SERVICE_SHORTCUTS, extract_sim, is_calling_command, shortcut_code};
pub use state::{ActiveCallSession, CallAction, CallEndedInfo, CallState, format_duration};
