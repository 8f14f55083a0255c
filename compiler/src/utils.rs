use crate::error::FieldGenError;

/// Quotes `text` as a JSON string literal for diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

pub fn error(msg: &str, line: usize, column: usize) -> FieldGenError {
    FieldGenError::ParseError {
        msg: msg.to_string(),
        line,
        column,
    }
}

/// Strips `prefix` from a structure name. Names outside the namespace are kept whole.
pub fn short_name<'a>(name: &'a str, prefix: &str) -> &'a str {
    match name.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => rest,
        _ => name,
    }
}

/// Builds an upper-case C identifier from its parts, joined with `_`.
pub fn constant_name(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| part.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Turns an arbitrary file name into an include-guard identifier.
pub fn guard_name(file_name: &str) -> String {
    let mut guard: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if guard.starts_with(|c: char| c.is_ascii_digit()) {
        guard.insert(0, '_');
    }
    guard
}
