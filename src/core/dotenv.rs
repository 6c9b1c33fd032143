//! `KEY=VALUE` line format.
//!
//! Used for grouped parameter payloads and for the grouped cache entry.
//! Empty lines and `#` comments are skipped, keys and values are trimmed,
//! and single or double quotes around a value are stripped (double-quoted
//! values support `\n`, `\r`, `\"` and `\\` escapes).

use std::collections::BTreeMap;

use crate::core::env::check_variable;

/// A line that is not a `KEY=VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number
    pub line: usize,
    pub reason: &'static str,
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Parse `KEY=VALUE` text into a map. Later duplicates win.
///
/// Every pair must pass [`check_variable`], so the result can always be
/// applied to the process environment.
pub fn parse(text: &str) -> Result<BTreeMap<String, String>, LineError> {
    let mut vars = BTreeMap::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or(LineError {
            line: index + 1,
            reason: "expected KEY=VALUE",
        })?;

        let key = key.trim();
        let value = parse_value(value.trim());
        check_variable(key, &value).map_err(|reason| LineError {
            line: index + 1,
            reason,
        })?;

        vars.insert(key.to_string(), value);
    }

    Ok(vars)
}

/// Render a map as `KEY = VALUE` lines, quoting where needed.
pub fn render(vars: &BTreeMap<String, String>) -> String {
    let mut output = String::new();

    for (key, value) in vars {
        if needs_quotes(value) {
            output.push_str(&format!("{} = \"{}\"\n", key, escape_value(value)));
        } else {
            output.push_str(&format!("{} = {}\n", key, value));
        }
    }

    output
}

fn parse_value(raw: &str) -> String {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return unescape_double_quoted(&raw[1..raw.len() - 1]);
    }

    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return raw[1..raw.len() - 1].to_string();
    }

    raw.to_string()
}

fn unescape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

// Anything the trimming or quote stripping in `parse` would alter.
fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(['\n', '\r', '"', '\'', '\\'])
}

fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(ch),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_payload() {
        let vars = parse("FOO=bar\nBAR=baz").unwrap();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["FOO"], "bar");
        assert_eq!(vars["BAR"], "baz");
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let vars = parse("# header\n\nFOO=bar\n   \n# trailing\n").unwrap();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars["FOO"], "bar");
    }

    #[test]
    fn test_parse_splits_on_first_equals() {
        let vars = parse("DSN=postgres://u:p@h/db?sslmode=require").unwrap();
        assert_eq!(vars["DSN"], "postgres://u:p@h/db?sslmode=require");
    }

    #[test]
    fn test_parse_trims_around_equals() {
        let vars = parse("FOO = bar").unwrap();
        assert_eq!(vars["FOO"], "bar");
    }

    #[test]
    fn test_parse_strips_quotes() {
        let vars = parse("A=\"with space\"\nB='single'\nC=\"line1\\nline2\"").unwrap();
        assert_eq!(vars["A"], "with space");
        assert_eq!(vars["B"], "single");
        assert_eq!(vars["C"], "line1\nline2");
    }

    #[test]
    fn test_parse_rejects_line_without_equals() {
        let err = parse("FOO=bar\nnot an assignment").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_parse_rejects_empty_key() {
        let err = parse("=value").unwrap_err();
        assert_eq!(err.reason, "empty variable name");
    }

    #[test]
    fn test_parse_rejects_nul_in_value() {
        let err = parse("FOO=\"a\0b\"").unwrap_err();
        assert_eq!(err.line, 1);
        assert_eq!(err.reason, "value contains a NUL byte");
    }

    #[test]
    fn test_render_uses_spaced_format() {
        let mut vars = BTreeMap::new();
        vars.insert("FOO".to_string(), "bar".to_string());
        assert_eq!(render(&vars), "FOO = bar\n");
    }

    #[test]
    fn test_render_preserves_awkward_values() {
        let mut vars = BTreeMap::new();
        vars.insert("EMPTY".to_string(), String::new());
        vars.insert("PADDED".to_string(), "  padded ".to_string());
        vars.insert("MULTI".to_string(), "a\nb \"q\" \\ c".to_string());
        vars.insert("QUOTED".to_string(), "'x'".to_string());
        vars.insert("HASH".to_string(), "a#b=c".to_string());

        assert_eq!(parse(&render(&vars)).unwrap(), vars);
    }
}
