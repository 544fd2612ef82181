//! Contact-alias commands: `aliases`, `unalias NAME`, `alias NAME` and the
//! alias setup forms.

use once_cell::sync::Lazy;
use regex::Regex;

use super::engine::MessagingEngine;
use super::state::SelectionPurpose;
use crate::alias::ContactAlias;
use crate::contact::Contact;
use crate::phone;
use crate::result::ShellOutput;

static ALIAS_SETUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:set\s+alias|alias|set)\s+(\w+)\s*(?:=|\s+as\s+|\s)\s*(.+)$")
        .expect("valid alias setup regex")
});

static ALIAS_SHOW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^alias\s+(\w+)$").expect("valid alias show regex"));

static UNALIAS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^unalias\s+(\w+)$").expect("valid unalias regex"));

/// `(name, value)` of an alias setup line.
///
/// `alias k=v` with no space before `=` is a shell alias and is left
/// alone. So is a `set` line without `=` or `as`.
fn parse_setup(input: &str) -> Option<(String, String)> {
    let lowered = input.to_lowercase();
    if let Some(rest) = lowered.strip_prefix("alias ") {
        if rest.split_whitespace().next().is_some_and(|t| t.contains('=')) {
            return None;
        }
    }
    if lowered.starts_with("set ")
        && !lowered.starts_with("set alias ")
        && !lowered.contains(" as ")
        && !lowered.contains('=')
    {
        return None;
    }
    let caps = ALIAS_SETUP.captures(input)?;
    Some((caps[1].to_lowercase(), caps[2].trim().to_string()))
}

impl MessagingEngine {
    pub(super) fn is_alias_command(input: &str) -> bool {
        let trimmed = input.trim();
        trimmed.eq_ignore_ascii_case("aliases")
            || UNALIAS.is_match(trimmed)
            || ALIAS_SHOW.is_match(trimmed)
            || parse_setup(trimmed).is_some()
    }

    pub(super) async fn handle_alias_command(&mut self, input: &str) -> Option<Vec<ShellOutput>> {
        if input.eq_ignore_ascii_case("aliases") {
            return Some(self.list_aliases().await);
        }
        if let Some(caps) = UNALIAS.captures(input) {
            return Some(self.remove_alias(&caps[1]).await);
        }
        if let Some(caps) = ALIAS_SHOW.captures(input) {
            return Some(self.show_alias(&caps[1]).await);
        }
        let (name, value) = parse_setup(input)?;
        Some(self.setup_alias(&name, &value).await)
    }

    async fn list_aliases(&self) -> Vec<ShellOutput> {
        let aliases = match self.aliases.all_aliases().await {
            Ok(aliases) => aliases,
            Err(e) => return vec![ShellOutput::error(format!("❌ {}", e))],
        };
        if aliases.is_empty() {
            return vec![
                ShellOutput::info("No aliases set"),
                ShellOutput::info("Try: alias wife = Jane Doe"),
            ];
        }
        let mut out = vec![ShellOutput::info(format!("Aliases ({}):", aliases.len()))];
        out.extend(aliases.iter().map(|a| ShellOutput::info(describe(a))));
        out
    }

    async fn show_alias(&self, name: &str) -> Vec<ShellOutput> {
        match self.aliases.get(name).await {
            Ok(Some(alias)) => vec![ShellOutput::info(describe(&alias))],
            Ok(None) => vec![
                ShellOutput::warning(format!("Alias \"{}\" is not set", name.to_lowercase())),
                ShellOutput::info(format!(
                    "Usage: alias {} = [contact name or number]",
                    name.to_lowercase()
                )),
            ],
            Err(e) => vec![ShellOutput::error(format!("❌ {}", e))],
        }
    }

    async fn remove_alias(&self, name: &str) -> Vec<ShellOutput> {
        match self.aliases.remove_alias(name).await {
            Ok(true) => vec![ShellOutput::success(format!(
                "✓ Alias \"{}\" removed",
                name.to_lowercase()
            ))],
            Ok(false) => vec![ShellOutput::warning(format!(
                "Alias \"{}\" is not set",
                name.to_lowercase()
            ))],
            Err(e) => vec![ShellOutput::error(format!("❌ {}", e))],
        }
    }

    /// Binds `name` to a literal number, or to the contact `value` finds.
    async fn setup_alias(&mut self, name: &str, value: &str) -> Vec<ShellOutput> {
        if value.is_empty() {
            return vec![
                ShellOutput::error("Usage: alias [name] = [contact name or number]"),
                ShellOutput::info("Example: alias wife = Jane Doe"),
            ];
        }
        if phone::is_valid_phone_number(value) {
            let number = phone::normalize_number(value);
            let contact = Contact::new("", number.clone(), number.clone());
            return vec![self.save_alias(name, &contact, &number).await];
        }

        let mut hits = self.search_contacts(value).await;
        if hits.len() > 1 {
            let header = format!("Found {} contacts matching \"{}\":", hits.len(), value);
            return self.offer_contacts(hits, SelectionPurpose::Alias(name.to_string()), header);
        }
        match hits.pop() {
            Some(contact) => match contact.primary_number().map(str::to_string) {
                Some(number) => vec![self.save_alias(name, &contact, &number).await],
                None => vec![ShellOutput::error("❌ Contact has no phone number")],
            },
            None => vec![ShellOutput::error(format!(
                "❌ No contact found for \"{}\"",
                value
            ))],
        }
    }

    pub(super) async fn save_alias(
        &self,
        name: &str,
        contact: &Contact,
        number: &str,
    ) -> ShellOutput {
        match self
            .aliases
            .set_alias(ContactAlias::for_contact(name, contact, number))
            .await
        {
            Ok(saved) if contact.name == number => ShellOutput::success(format!(
                "✓ Alias \"{}\" set to {}",
                saved.alias, number
            )),
            Ok(saved) => ShellOutput::success(format!(
                "✓ Alias \"{}\" set to {} ({})",
                saved.alias, contact.name, number
            )),
            Err(e) => ShellOutput::error(format!("❌ {}", e)),
        }
    }
}

fn describe(alias: &ContactAlias) -> String {
    if alias.contact_name == alias.phone_number {
        format!("  {} → {}", alias.alias, alias.phone_number)
    } else {
        format!(
            "  {} → {} ({})",
            alias.alias, alias.contact_name, alias.phone_number
        )
    }
}
