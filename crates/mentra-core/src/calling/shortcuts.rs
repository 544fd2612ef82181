//! Calling grammar and carrier service-code shortcuts.

use once_cell::sync::Lazy;
use regex::Regex;

/// Phrase → service code. Matched as a prefix of the lowercased input.
pub const SERVICE_SHORTCUTS: &[(&str, &str)] = &[
    ("check balance", "*144#"),
    ("balance", "*144#"),
    ("my balance", "*144#"),
    ("airtime balance", "*144#"),
    ("check data", "*544#"),
    ("data balance", "*544*44#"),
    ("my number", "*135#"),
    ("check minutes", "*122#"),
    ("dial bank", "*247#"),
    ("bank ussd", "*247#"),
    ("equity", "*247#"),
    ("kcb", "*522#"),
    ("coop", "*667#"),
    ("family bank", "*642#"),
    ("stanchart", "*722#"),
    ("ollin", "*645#"),
];

const CALL_PREFIXES: &[&str] = &["call ", "dial ", "phone ", "ring "];

const GENERIC_CALL: &[&str] = &[
    "call",
    "dial",
    "phone",
    "ring",
    "make a call",
    "make call",
    "place a call",
    "place call",
];

static SIM_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:on\s+)?sim\s*([1-9])\b").expect("valid sim regex"));

/// The service code a shortcut phrase stands for.
pub fn shortcut_code(input: &str) -> Option<&'static str> {
    let lowered = input.trim().to_lowercase();
    SERVICE_SHORTCUTS
        .iter()
        .find(|(phrase, _)| starts_with_phrase(&lowered, phrase))
        .map(|(_, code)| *code)
}

/// True when `input` starts a calling conversation.
pub fn is_calling_command(input: &str) -> bool {
    let lowered = input.trim().to_lowercase();
    GENERIC_CALL.contains(&lowered.as_str())
        || CALL_PREFIXES.iter().any(|p| lowered.starts_with(p))
        || shortcut_code(&lowered).is_some()
}

/// True for the bare forms that open the method menu.
pub(crate) fn is_generic_call(input: &str) -> bool {
    GENERIC_CALL.contains(&input.trim().to_lowercase().as_str())
}

/// The call target after a `call`/`dial`/`phone`/`ring` prefix.
pub(crate) fn call_target(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    let lowered = trimmed.to_lowercase();
    CALL_PREFIXES
        .iter()
        .find(|p| lowered.starts_with(*p))
        .and_then(|p| trimmed.get(p.len()..))
        .map(str::trim)
}

/// Splits an inline `sim N` (or `on sim N`) off the text.
///
/// Returns the zero-based slot and the remaining text.
pub fn extract_sim(text: &str) -> (Option<usize>, String) {
    match SIM_SUFFIX.captures(text) {
        Some(caps) => {
            let slot = caps[1].parse::<usize>().ok().map(|n| n - 1);
            let cleaned = SIM_SUFFIX.replace(text, "").trim().to_string();
            (slot, cleaned)
        }
        None => (None, text.trim().to_string()),
    }
}

fn starts_with_phrase(input: &str, phrase: &str) -> bool {
    input == phrase
        || input
            .strip_prefix(phrase)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}
