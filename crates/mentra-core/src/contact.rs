//! Contacts as seen by the shell, and the directory they are searched in.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::phone;

/// A device contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
}

impl Contact {
    pub fn new(id: impl Into<String>, name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone_numbers: vec![number.into()],
            photo_ref: None,
        }
    }

    pub fn primary_number(&self) -> Option<&str> {
        self.phone_numbers.first().map(String::as_str)
    }

    /// Case-insensitive name match or raw number substring match.
    pub fn matches(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.name.to_lowercase().contains(&lowered)
            || self.phone_numbers.iter().any(|n| n.contains(query))
    }
}

/// Read access to the host's contact list.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Returns every contact, sorted by display name.
    async fn all_contacts(&self) -> Result<Vec<Contact>>;

    /// Searches contacts by name or number, returning at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Contact>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .all_contacts()
            .await?
            .into_iter()
            .filter(|c| c.matches(query))
            .take(limit)
            .collect())
    }

    /// Looks up the display name for a number.
    async fn name_for_number(&self, number: &str) -> Result<Option<String>> {
        Ok(self
            .all_contacts()
            .await?
            .into_iter()
            .find(|c| c.phone_numbers.iter().any(|n| phone::same_number(n, number)))
            .map(|c| c.name))
    }
}
