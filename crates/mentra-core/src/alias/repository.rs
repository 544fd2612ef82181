//! Contact alias repository trait.

use async_trait::async_trait;

use crate::alias::ContactAlias;
use crate::error::Result;

/// Durable storage for contact aliases, keyed by lowercase alias.
#[async_trait]
pub trait ContactAliasRepository: Send + Sync {
    /// Lists all aliases, ordered by alias.
    async fn list_aliases(&self) -> Result<Vec<ContactAlias>>;

    /// Gets one alias by its lowercase key.
    async fn get_alias(&self, alias: &str) -> Result<Option<ContactAlias>>;

    /// Adds or replaces an alias.
    async fn save_alias(&self, alias: ContactAlias) -> Result<()>;

    /// Removes an alias. Returns whether it existed.
    async fn remove_alias(&self, alias: &str) -> Result<bool>;
}
