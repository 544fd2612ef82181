//! Durable contact aliases ("wife", "mom", custom short names).

mod memory;
mod model;
mod repository;
mod store;

pub use memory::InMemoryContactAliasRepository;
pub use model::{ContactAlias, SuggestedAlias, suggested_alias, suggested_aliases};
pub use repository::ContactAliasRepository;
pub use store::AliasStore;
