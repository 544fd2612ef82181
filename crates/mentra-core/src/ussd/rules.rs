//! Service-code validation and the interactive-menu rule table.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ShellError};

static TERMINATED_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[*#][0-9*#]+#$").expect("valid service code regex"));

static OPEN_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*[0-9*#]+$").expect("valid service code regex"));

/// True for `*144#`-style codes and for `*144`-style codes without the
/// trailing `#`.
pub fn is_valid_code(code: &str) -> bool {
    let trimmed = code.trim();
    TERMINATED_CODE.is_match(trimmed) || OPEN_CODE.is_match(trimmed)
}

/// Adds a leading `*` and trailing `#` when missing.
pub fn normalize_code(code: &str) -> String {
    let mut normalized = code.trim().to_string();
    if !normalized.starts_with('*') && !normalized.starts_with('#') {
        normalized.insert(0, '*');
    }
    if !normalized.ends_with('#') {
        normalized.push('#');
    }
    normalized
}

/// Returns the code to send for a new session.
///
/// Valid codes are sent as typed; otherwise the normalized form is tried.
///
/// # Errors
///
/// Returns `InvalidCommand` when neither form is a service code.
pub fn prepare_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if is_valid_code(trimmed) {
        return Ok(trimmed.to_string());
    }
    let normalized = normalize_code(trimmed);
    if TERMINATED_CODE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(ShellError::invalid_command(format!(
            "Invalid USSD code format: {}",
            trimmed
        )))
    }
}

/// One row of the interactive-menu table: a pattern and whether a match
/// means the carrier is waiting for more input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveRule {
    pub name: String,
    pub pattern: String,
    pub interactive: bool,
}

impl InteractiveRule {
    pub fn new(name: &str, pattern: &str, interactive: bool) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            interactive,
        }
    }
}

/// The rules carriers' menu screens are recognised by.
pub const DEFAULT_INTERACTIVE_RULES: &[(&str, &str)] = &[
    // A digit straight after the dot is a decimal, not a menu item.
    ("numbered-dot", r"(?m)^\s*\d+\s*\.(?:\s+[[:alnum:]]|[[:alpha:]])"),
    ("numbered-paren", r"(?m)^\s*\d+\s*\)\s*[[:alnum:]]"),
    ("reply-with", r"(?i)\breply\s+with\b"),
    ("enter-number", r"(?i)\benter\s+\d+"),
    ("press-number", r"(?i)\bpress\s+\d+"),
    ("select-option", r"(?i)\bselect\s+option"),
    ("choose", r"(?i)\bchoose\b"),
    ("exit-option", r"(?i)\b0\s*\.\s*(exit|cancel)\b"),
    ("back-option", r"(?i)\*\s*back\b"),
    ("next-option", r"(?i)#\s*next\b"),
];

static DEFAULT_RULE_SET: Lazy<InteractiveRuleSet> = Lazy::new(|| {
    let rules = DEFAULT_INTERACTIVE_RULES
        .iter()
        .map(|(name, pattern)| InteractiveRule::new(name, pattern, true))
        .collect::<Vec<_>>();
    InteractiveRuleSet::compile(rules).expect("default interactive rules compile")
});

/// Compiled rule table.
///
/// The first matching rule decides; no match means terminal.
#[derive(Debug, Clone)]
pub struct InteractiveRuleSet {
    rules: Vec<(InteractiveRule, Regex)>,
}

impl InteractiveRuleSet {
    /// Compiles a rule table.
    ///
    /// # Errors
    ///
    /// Returns `Config` naming the first rule whose pattern does not compile.
    pub fn compile(rules: Vec<InteractiveRule>) -> Result<Self> {
        let compiled = rules
            .into_iter()
            .map(|rule| match Regex::new(&rule.pattern) {
                Ok(re) => Ok((rule, re)),
                Err(e) => Err(ShellError::config(format!(
                    "interactive rule '{}' is not a valid pattern: {}",
                    rule.name, e
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }

    pub fn default_rules() -> &'static InteractiveRuleSet {
        &DEFAULT_RULE_SET
    }

    /// Name of the first rule matching `response`.
    pub fn matching_rule(&self, response: &str) -> Option<&InteractiveRule> {
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(response))
            .map(|(rule, _)| rule)
    }

    /// Whether the response asks for more input.
    pub fn is_interactive(&self, response: &str) -> bool {
        self.matching_rule(response)
            .is_some_and(|rule| rule.interactive)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> &'static InteractiveRuleSet {
        InteractiveRuleSet::default_rules()
    }

    #[test]
    fn test_menu_is_interactive() {
        assert!(rules().is_interactive("1. Balance\n2. Data\n0. Exit"));
        assert!(rules().is_interactive("Welcome\n1) Buy bundles\n2) Sambaza"));
        assert!(rules().is_interactive("Reply with your PIN"));
        assert!(rules().is_interactive("Press 1 to confirm"));
        assert!(rules().is_interactive("Please choose an amount"));
        assert!(rules().is_interactive("Offers available  * Back  # Next"));
    }

    #[test]
    fn test_menu_items_starting_with_digits() {
        assert!(rules().is_interactive("1. 100MB @ Ksh 10\n2. 250MB @ Ksh 20\n3. 1GB @ Ksh 50"));
        assert!(rules().is_interactive("1) 20 mins @ Ksh 15\n2) 50 mins @ Ksh 30"));
        assert!(rules().is_interactive("1.Balance\n2.Data"));
        assert_eq!(
            rules().matching_rule("1. 100MB @ Ksh 10").map(|r| r.name.as_str()),
            Some("numbered-dot")
        );
    }

    #[test]
    fn test_terminal_responses() {
        assert!(!rules().is_interactive("100.50 KES remaining"));
        assert!(!rules().is_interactive("Your balance is KES 100"));
        assert!(!rules().is_interactive("Balance: KES 100.50 valid till 31/12"));
        assert!(!rules().is_interactive("Your number is 0712345678"));
        assert!(!rules().is_interactive(""));
    }

    #[test]
    fn test_matching_rule_name() {
        let rule = rules().matching_rule("Enter 4 digit PIN").unwrap();
        assert_eq!(rule.name, "enter-number");
    }

    #[test]
    fn test_custom_table_first_match_wins() {
        let set = InteractiveRuleSet::compile(vec![
            InteractiveRule::new("final", r"(?i)thank you", false),
            InteractiveRule::new("menu", r"\d\.", true),
        ])
        .unwrap();
        assert!(!set.is_interactive("Thank you. 1. Rate us"));
        assert!(set.is_interactive("1. Rate us"));
    }

    #[test]
    fn test_invalid_rule_reports_name() {
        let err = InteractiveRuleSet::compile(vec![InteractiveRule::new("broken", "(", true)])
            .unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn test_code_validation() {
        assert!(is_valid_code("*544#"));
        assert!(is_valid_code("#100#"));
        assert!(is_valid_code("*123"));
        assert!(!is_valid_code("544"));
        assert!(!is_valid_code("*12a#"));
    }

    #[test]
    fn test_prepare_code() {
        assert_eq!(prepare_code(" *544*44# ").unwrap(), "*544*44#");
        assert_eq!(prepare_code("*123").unwrap(), "*123");
        assert_eq!(prepare_code("144").unwrap(), "*144#");
        assert!(prepare_code("hello").is_err());
    }
}
