//! Contacts read from `contacts.toml`.

use async_trait::async_trait;
use mentra_core::Result;
use mentra_core::contact::{Contact, ContactDirectory};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::storage::AtomicTomlFile;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContactFile {
    #[serde(default, rename = "contact")]
    contacts: Vec<Contact>,
}

/// A contact list kept in a TOML file, one `[[contact]]` table per entry.
///
/// Stands in for the phone's address book when the shell runs on a
/// desktop.
pub struct TomlContactDirectory {
    file: AtomicTomlFile<ContactFile>,
}

impl TomlContactDirectory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: AtomicTomlFile::new(path),
        }
    }

    /// Replaces the whole list.
    pub fn save_contacts(&self, contacts: Vec<Contact>) -> Result<()> {
        self.file.save(&ContactFile { contacts })?;
        Ok(())
    }

    /// A few contacts to start from.
    pub fn sample_contacts() -> Vec<Contact> {
        vec![
            Contact::new("1", "Jane Doe", "+15550001111"),
            Contact::new("2", "John Doe", "+15550002222"),
            Contact::new("3", "Mary Wanjiku", "+254712345678"),
        ]
    }
}

#[async_trait]
impl ContactDirectory for TomlContactDirectory {
    async fn all_contacts(&self) -> Result<Vec<Contact>> {
        let mut contacts = self.file.load()?.unwrap_or_default().contacts;
        contacts.sort_by_key(|c| c.name.to_lowercase());
        Ok(contacts)
    }
}
