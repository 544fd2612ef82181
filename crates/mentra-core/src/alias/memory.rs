use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::alias::{ContactAlias, ContactAliasRepository};
use crate::error::{Result, ShellError};

/// Alias repository that lives only as long as the process.
#[derive(Debug, Default)]
pub struct InMemoryContactAliasRepository {
    aliases: RwLock<BTreeMap<String, ContactAlias>>,
}

impl InMemoryContactAliasRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aliases(aliases: impl IntoIterator<Item = ContactAlias>) -> Self {
        Self {
            aliases: RwLock::new(aliases.into_iter().map(|a| (a.alias.clone(), a)).collect()),
        }
    }
}

fn poisoned() -> ShellError {
    ShellError::internal("alias map lock poisoned")
}

#[async_trait]
impl ContactAliasRepository for InMemoryContactAliasRepository {
    async fn list_aliases(&self) -> Result<Vec<ContactAlias>> {
        let map = self.aliases.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }

    async fn get_alias(&self, alias: &str) -> Result<Option<ContactAlias>> {
        let map = self.aliases.read().map_err(|_| poisoned())?;
        Ok(map.get(alias).cloned())
    }

    async fn save_alias(&self, alias: ContactAlias) -> Result<()> {
        let mut map = self.aliases.write().map_err(|_| poisoned())?;
        map.insert(alias.alias.clone(), alias);
        Ok(())
    }

    async fn remove_alias(&self, alias: &str) -> Result<bool> {
        let mut map = self.aliases.write().map_err(|_| poisoned())?;
        Ok(map.remove(alias).is_some())
    }
}
