use std::sync::Arc;
use tracing::{debug, info};

use super::model::{normalize_key, suggested_alias};
use crate::alias::{ContactAlias, ContactAliasRepository, SuggestedAlias};
use crate::contact::Contact;
use crate::error::{Result, ShellError};

/// Alias lookups shared by the calling and messaging engines.
///
/// Cheap to clone. Reads go straight to the repository without extra
/// locking; a flow that already resolved a number keeps using it even if
/// the alias changes underneath.
#[derive(Clone)]
pub struct AliasStore {
    repository: Arc<dyn ContactAliasRepository>,
}

impl AliasStore {
    pub fn new(repository: Arc<dyn ContactAliasRepository>) -> Self {
        Self { repository }
    }

    pub async fn all_aliases(&self) -> Result<Vec<ContactAlias>> {
        self.repository.list_aliases().await
    }

    pub async fn get(&self, alias: &str) -> Result<Option<ContactAlias>> {
        let key = normalize_key(alias);
        if key.is_empty() {
            return Ok(None);
        }
        self.repository.get_alias(&key).await
    }

    /// Resolves an alias to the contact it points at.
    pub async fn get_contact_by_alias(&self, alias: &str) -> Result<Option<Contact>> {
        Ok(self.get(alias).await?.map(|a| a.to_contact()))
    }

    pub async fn has_alias(&self, alias: &str) -> Result<bool> {
        Ok(self.get(alias).await?.is_some())
    }

    /// Stores or replaces an alias.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` for an empty or non-word alias name, and
    /// propagates repository failures.
    pub async fn set_alias(&self, alias: ContactAlias) -> Result<ContactAlias> {
        let key = normalize_key(&alias.alias);
        if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(ShellError::invalid_command(format!(
                "Alias names must be a single word, got '{}'",
                alias.alias
            )));
        }
        let alias = ContactAlias { alias: key, ..alias };
        info!(alias = %alias.alias, contact = %alias.contact_name, "Saving contact alias");
        self.repository.save_alias(alias.clone()).await?;
        Ok(alias)
    }

    pub async fn remove_alias(&self, alias: &str) -> Result<bool> {
        let key = normalize_key(alias);
        let removed = self.repository.remove_alias(&key).await?;
        debug!(alias = %key, removed, "Removed contact alias");
        Ok(removed)
    }

    /// All aliases pointing at one contact.
    pub async fn aliases_for_contact(&self, contact_id: &str) -> Result<Vec<ContactAlias>> {
        Ok(self
            .all_aliases()
            .await?
            .into_iter()
            .filter(|a| !contact_id.is_empty() && a.contact_id == contact_id)
            .collect())
    }

    /// Aliases whose name or contact name contains `query`.
    pub async fn search_aliases(&self, query: &str) -> Result<Vec<ContactAlias>> {
        let query = query.trim().to_lowercase();
        Ok(self
            .all_aliases()
            .await?
            .into_iter()
            .filter(|a| a.alias.contains(&query) || a.contact_name.to_lowercase().contains(&query))
            .collect())
    }

    pub fn suggested_alias_info(&self, alias: &str) -> Option<&'static SuggestedAlias> {
        suggested_alias(alias)
    }
}
