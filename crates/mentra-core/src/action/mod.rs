//! Typed actions derived from commands, and the router that runs them.

mod model;
mod query;
mod router;
mod system;

pub use model::{Action, ActionKind};
pub use query::QueryHandler;
pub use router::{ActionRouter, ConversationGateway};
pub use system::{
    AudioStream, PerformanceMode, RebootMode, SystemCommand, Toggle, parse_bool_state,
};
