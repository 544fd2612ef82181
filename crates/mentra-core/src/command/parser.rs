use std::collections::BTreeMap;

use super::model::Command;

/// Splits input on whitespace, honoring single and double quotes.
///
/// Quote characters are stripped and whitespace inside a quoted span is
/// kept. A quote of the other kind inside a span is literal. Empty quoted
/// spans produce no token.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    // An unterminated quote keeps whatever it collected.
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Parses one line into a [`Command`].
///
/// Total: blank input yields a command with an empty verb.
pub fn parse(input: &str) -> Command {
    let tokens = tokenize(input.trim());
    let mut iter = tokens.into_iter().peekable();

    let verb = match iter.next() {
        Some(v) => v.to_lowercase(),
        None => {
            return Command {
                raw: input.to_string(),
                ..Command::default()
            };
        }
    };

    let mut flags = BTreeMap::new();
    let mut positional = Vec::new();

    while let Some(token) = iter.next() {
        if let Some(flag) = token.strip_prefix("--") {
            if flag.is_empty() {
                continue;
            }
            if let Some((key, value)) = flag.split_once('=') {
                flags.insert(key.to_string(), value.to_string());
            } else {
                let value = match iter.peek() {
                    Some(next) if !next.starts_with("--") => iter.next(),
                    _ => None,
                };
                flags.insert(flag.to_string(), value.unwrap_or_else(|| "true".to_string()));
            }
        } else {
            positional.push(token);
        }
    }

    let mut positional = positional.into_iter();
    let target = positional.next();
    let rest: Vec<String> = positional.collect();
    let entity = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    Command {
        raw: input.to_string(),
        verb,
        target,
        entity,
        flags,
    }
}

/// Splits a line on `;` and `&&` and parses each non-empty segment.
pub fn parse_multiple(input: &str) -> Vec<Command> {
    input
        .split(';')
        .flat_map(|segment| segment.split("&&"))
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(parse)
        .collect()
}

/// Checks the minimal argument shape each verb needs.
pub fn validate(command: &Command) -> bool {
    if command.verb.is_empty() {
        return false;
    }
    match command.verb.as_str() {
        "open" | "launch" | "start" | "call" => command.target.is_some(),
        "message" | "sms" => command.target.is_some() && command.entity.is_some(),
        "play" => command.target.is_some() || command.entity.is_some(),
        _ => true,
    }
}
