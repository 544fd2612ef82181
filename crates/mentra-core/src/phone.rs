//! Phone-number and service-code recognition shared by the engines.

use once_cell::sync::Lazy;
use regex::Regex;

static BARE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid regex"));

static PHONE_LIKE_INPUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9\s\-]{7,}$").expect("valid regex"));

static SERVICE_CODE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[*#][0-9*#]*#$").expect("valid regex"));

/// Removes spaces, dashes, dots and parentheses.
pub fn strip_separators(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// Keeps only `+` and ASCII digits.
pub fn normalize_number(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c == '+' || c.is_ascii_digit())
        .collect()
}

/// True for a bare dialable number: optional `+`, then 7-15 digits,
/// separators allowed.
pub fn is_bare_number(input: &str) -> bool {
    BARE_NUMBER.is_match(&strip_separators(input.trim()))
}

/// True when `input` starts like a number a user typed at a prompt.
pub fn looks_like_phone_input(input: &str) -> bool {
    PHONE_LIKE_INPUT.is_match(input.trim())
}

/// True for a carrier service code such as `*144#` or `*544*44#`.
pub fn is_service_code(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.len() >= 3 && SERVICE_CODE_SHAPE.is_match(trimmed)
}

/// Lenient validity check used before sending a text.
///
/// Rejects service codes; otherwise needs 7-15 digits once everything
/// except `+` and digits is removed.
pub fn is_valid_phone_number(input: &str) -> bool {
    let trimmed = input.trim();
    if trimmed.starts_with('*') && trimmed.ends_with('#') {
        return false;
    }
    let cleaned = normalize_number(trimmed);
    let digits = cleaned.trim_start_matches('+');
    if digits.contains('+') {
        return false;
    }
    (7..=15).contains(&digits.len())
}

/// Compares two numbers on their trailing digits so that local and
/// international forms of the same number match.
pub fn same_number(a: &str, b: &str) -> bool {
    let a = normalize_number(a);
    let b = normalize_number(b);
    let a = a.trim_start_matches('+');
    let b = b.trim_start_matches('+');
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let tail = a.len().min(b.len()).min(9);
    a[a.len() - tail..] == b[b.len() - tail..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number() {
        assert!(is_bare_number("+254712345678"));
        assert!(is_bare_number("0712 345 678"));
        assert!(is_bare_number("(555) 000-1111"));
        assert!(!is_bare_number("123"));
        assert!(!is_bare_number("*544#"));
        assert!(!is_bare_number("wife"));
    }

    #[test]
    fn test_service_code() {
        assert!(is_service_code("*544#"));
        assert!(is_service_code("*544*44#"));
        assert!(is_service_code("#06#"));
        assert!(!is_service_code("544#"));
        assert!(!is_service_code("*#"));
        assert!(!is_service_code("+254712345678"));
    }

    #[test]
    fn test_valid_phone_number() {
        assert!(is_valid_phone_number("+1 555-000-1111"));
        assert!(!is_valid_phone_number("*144#"));
        assert!(!is_valid_phone_number("12345"));
        assert!(!is_valid_phone_number("1234567890123456"));
    }

    #[test]
    fn test_phone_like_input() {
        assert!(looks_like_phone_input("0712 345-678"));
        assert!(!looks_like_phone_input("jane"));
    }

    #[test]
    fn test_same_number() {
        assert!(same_number("+254712345678", "0712345678"));
        assert!(same_number("0712 345 678", "712345678"));
        assert!(!same_number("0712345678", "0712345679"));
        assert!(!same_number("", "0712345678"));
    }
}
