//! TOML-backed contact alias repository.

use async_trait::async_trait;
use mentra_core::Result;
use mentra_core::alias::{ContactAlias, ContactAliasRepository};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::storage::AtomicTomlFile;

/// On-disk layout of `aliases.toml`: one `[[alias]]` table per entry.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AliasFile {
    #[serde(default, rename = "alias")]
    aliases: Vec<ContactAlias>,
}

/// Stores contact aliases in a single TOML file.
///
/// Every write is a locked read-modify-write of the whole file, so two
/// shells sharing a config directory do not lose each other's changes.
pub struct TomlContactAliasRepository {
    file: AtomicTomlFile<AliasFile>,
}

impl TomlContactAliasRepository {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    fn read_all(&self) -> Result<Vec<ContactAlias>> {
        let mut aliases = self.file.load()?.unwrap_or_default().aliases;
        aliases.sort_by(|a, b| a.alias.cmp(&b.alias));
        Ok(aliases)
    }
}

#[async_trait]
impl ContactAliasRepository for TomlContactAliasRepository {
    async fn list_aliases(&self) -> Result<Vec<ContactAlias>> {
        self.read_all()
    }

    async fn get_alias(&self, alias: &str) -> Result<Option<ContactAlias>> {
        Ok(self.read_all()?.into_iter().find(|a| a.alias == alias))
    }

    async fn save_alias(&self, alias: ContactAlias) -> Result<()> {
        debug!(alias = %alias.alias, path = %self.file.path().display(), "Saving alias");
        self.file.update(AliasFile::default(), |data| {
            data.aliases.retain(|a| a.alias != alias.alias);
            data.aliases.push(alias);
            Ok(())
        })?;
        Ok(())
    }

    async fn remove_alias(&self, alias: &str) -> Result<bool> {
        let removed = self.file.update(AliasFile::default(), |data| {
            let before = data.aliases.len();
            data.aliases.retain(|a| a.alias != alias);
            Ok(data.aliases.len() != before)
        })?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentra_core::alias::AliasStore;
    use mentra_core::contact::Contact;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_aliases_survive_a_new_repository() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("aliases.toml");
        let jane = Contact::new("c1", "Jane Doe", "+15550001111");

        let repo = TomlContactAliasRepository::new(path.clone());
        repo.save_alias(ContactAlias::for_contact("wife", &jane, "+15550001111"))
            .await
            .unwrap();
        repo.save_alias(ContactAlias::for_number("boss", "0711222333"))
            .await
            .unwrap();

        let reopened = TomlContactAliasRepository::new(path.clone());
        let names: Vec<_> = reopened
            .list_aliases()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.alias)
            .collect();
        assert_eq!(names, vec!["boss".to_string(), "wife".to_string()]);

        let wife = reopened.get_alias("wife").await.unwrap().unwrap();
        assert_eq!(wife.contact_id, "c1");
        assert_eq!(wife.phone_number, "+15550001111");

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[[alias]]"));
    }

    #[tokio::test]
    async fn test_reassign_and_remove() {
        let dir = TempDir::new().unwrap();
        let repo = TomlContactAliasRepository::new(dir.path().join("aliases.toml"));

        repo.save_alias(ContactAlias::for_number("mom", "0700000001"))
            .await
            .unwrap();
        repo.save_alias(ContactAlias::for_number("mom", "0700000002"))
            .await
            .unwrap();
        let all = repo.list_aliases().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].phone_number, "0700000002");

        assert!(repo.remove_alias("mom").await.unwrap());
        assert!(!repo.remove_alias("mom").await.unwrap());
        assert!(repo.get_alias("mom").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_resolves_through_file() {
        let dir = TempDir::new().unwrap();
        let repo = Arc::new(TomlContactAliasRepository::new(dir.path().join("aliases.toml")));
        let store = AliasStore::new(repo);
        store
            .set_alias(ContactAlias::for_number("Bro", "0712345678"))
            .await
            .unwrap();
        let contact = store.get_contact_by_alias("bro").await.unwrap().unwrap();
        assert_eq!(contact.primary_number(), Some("0712345678"));
    }
}
