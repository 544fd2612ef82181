use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contact::Contact;

/// A short name bound to one phone number of one contact.
///
/// Keyed by the lowercase `alias`; several aliases may point at the same
/// contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAlias {
    pub alias: String,
    /// Empty when the alias was bound to a bare number.
    #[serde(default)]
    pub contact_id: String,
    pub contact_name: String,
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_ref: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl ContactAlias {
    pub fn new(
        alias: &str,
        contact_id: impl Into<String>,
        contact_name: impl Into<String>,
        phone_number: impl Into<String>,
    ) -> Self {
        Self {
            alias: normalize_key(alias),
            contact_id: contact_id.into(),
            contact_name: contact_name.into(),
            phone_number: phone_number.into(),
            photo_ref: None,
            updated_at: Utc::now(),
        }
    }

    /// Binds an alias straight to a number, naming the contact after it.
    pub fn for_number(alias: &str, number: &str) -> Self {
        Self::new(alias, "", number, number)
    }

    /// Binds an alias to a contact's chosen number.
    pub fn for_contact(alias: &str, contact: &Contact, number: &str) -> Self {
        Self {
            photo_ref: contact.photo_ref.clone(),
            ..Self::new(alias, contact.id.clone(), contact.name.clone(), number)
        }
    }

    /// The contact this alias resolves to.
    pub fn to_contact(&self) -> Contact {
        Contact {
            id: self.contact_id.clone(),
            name: self.contact_name.clone(),
            phone_numbers: vec![self.phone_number.clone()],
            photo_ref: self.photo_ref.clone(),
        }
    }
}

pub(crate) fn normalize_key(alias: &str) -> String {
    alias.trim().to_lowercase()
}

/// A relationship word the shell offers to set up as an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuggestedAlias {
    pub alias: &'static str,
    pub description: &'static str,
}

const SUGGESTED: &[SuggestedAlias] = &[
    SuggestedAlias { alias: "wife", description: "Your spouse" },
    SuggestedAlias { alias: "husband", description: "Your spouse" },
    SuggestedAlias { alias: "mom", description: "Your mother" },
    SuggestedAlias { alias: "mother", description: "Your mother" },
    SuggestedAlias { alias: "dad", description: "Your father" },
    SuggestedAlias { alias: "father", description: "Your father" },
    SuggestedAlias { alias: "son", description: "Your son" },
    SuggestedAlias { alias: "daughter", description: "Your daughter" },
    SuggestedAlias { alias: "brother", description: "Your brother" },
    SuggestedAlias { alias: "bro", description: "Your brother" },
    SuggestedAlias { alias: "sister", description: "Your sister" },
    SuggestedAlias { alias: "sis", description: "Your sister" },
    SuggestedAlias { alias: "boss", description: "Your boss/manager" },
    SuggestedAlias { alias: "bestie", description: "Best friend" },
    SuggestedAlias { alias: "bff", description: "Best friend forever" },
    SuggestedAlias { alias: "girlfriend", description: "Your girlfriend" },
    SuggestedAlias { alias: "gf", description: "Your girlfriend" },
    SuggestedAlias { alias: "boyfriend", description: "Your boyfriend" },
    SuggestedAlias { alias: "bf", description: "Your boyfriend" },
    SuggestedAlias { alias: "babe", description: "Term of endearment" },
    SuggestedAlias { alias: "honey", description: "Term of endearment" },
    SuggestedAlias { alias: "love", description: "Term of endearment" },
    SuggestedAlias { alias: "grandma", description: "Your grandmother" },
    SuggestedAlias { alias: "grandmother", description: "Your grandmother" },
    SuggestedAlias { alias: "grandpa", description: "Your grandfather" },
    SuggestedAlias { alias: "grandfather", description: "Your grandfather" },
    SuggestedAlias { alias: "uncle", description: "Your uncle" },
    SuggestedAlias { alias: "aunt", description: "Your aunt" },
    SuggestedAlias { alias: "cousin", description: "Your cousin" },
    SuggestedAlias { alias: "partner", description: "Your partner" },
    SuggestedAlias { alias: "spouse", description: "Your spouse" },
    SuggestedAlias { alias: "home", description: "Home number" },
    SuggestedAlias { alias: "work", description: "Work contact" },
    SuggestedAlias { alias: "doctor", description: "Your doctor" },
    SuggestedAlias { alias: "emergency", description: "Emergency contact" },
];

pub fn suggested_aliases() -> &'static [SuggestedAlias] {
    SUGGESTED
}

/// Case-insensitive lookup in the suggested alias list.
pub fn suggested_alias(alias: &str) -> Option<&'static SuggestedAlias> {
    SUGGESTED
        .iter()
        .find(|s| s.alias.eq_ignore_ascii_case(alias.trim()))
}
