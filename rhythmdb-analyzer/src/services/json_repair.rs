//! Tolerant JSON repair for LLM chat-completion output (§4.4, §9).
//!
//! A focused subsystem, not a general parser: strip code fences, normalize
//! curly quotes, extract the largest balanced `{...}` substring, drop
//! trailing commas, quote bare keys, convert single-quoted strings to
//! double-quoted, strip control characters.

/// Repair `raw` well enough for `serde_json::from_str` to have a second
/// chance after an initial parse failure.
pub fn repair(raw: &str) -> String {
    let no_fences = strip_code_fences(raw);
    let straight_quotes = normalize_quotes(&no_fences);
    let balanced = extract_balanced_braces(&straight_quotes).unwrap_or(straight_quotes);
    let no_control = strip_control_chars(&balanced);
    let single_to_double = single_quote_strings_to_double(&no_control);
    let keys_quoted = quote_bare_keys(&single_to_double);
    drop_trailing_commas(&keys_quoted)
}

fn strip_code_fences(s: &str) -> String {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].to_string();
        }
        return rest.to_string();
    }
    trimmed.to_string()
}

fn normalize_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Find the largest `{...}` substring with balanced braces, ignoring braces
/// inside string literals.
fn extract_balanced_braces(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let start = chars.iter().position(|&c| c == '{')?;

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut end = None;
    for (i, &c) in chars.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    end = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }
    let end = end?;
    Some(chars[start..=end].iter().collect())
}

fn strip_control_chars(s: &str) -> String {
    s.chars().filter(|c| !c.is_control() || *c == '\n' || *c == '\t').collect()
}

/// Convert `'single quoted'` string literals to `"double quoted"`, leaving
/// apostrophes inside already-double-quoted strings alone.
fn single_quote_strings_to_double(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut in_double = false;
    while let Some(c) = chars.next() {
        match c {
            '"' if !in_double => {
                in_double = true;
                out.push(c);
            }
            '"' if in_double => {
                in_double = false;
                out.push(c);
            }
            '\'' if !in_double => {
                out.push('"');
                for nc in chars.by_ref() {
                    if nc == '\'' {
                        break;
                    }
                    out.push(nc);
                }
                out.push('"');
            }
            other => out.push(other),
        }
    }
    out
}

/// Quote bare object keys (`{foo: 1}` → `{"foo": 1}`), a common local-LLM
/// slip for small models.
fn quote_bare_keys(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    let mut in_string = false;
    while let Some(c) = chars.next() {
        if c == '"' {
            in_string = !in_string;
            out.push(c);
            continue;
        }
        if in_string {
            out.push(c);
            continue;
        }
        if (c == '{' || c == ',') && c.is_ascii() {
            out.push(c);
            let mut lookahead = String::new();
            while matches!(chars.peek(), Some(w) if w.is_whitespace()) {
                lookahead.push(chars.next().unwrap());
            }
            out.push_str(&lookahead);
            let mut key = String::new();
            while matches!(chars.peek(), Some(k) if k.is_alphanumeric() || *k == '_') {
                key.push(chars.next().unwrap());
            }
            if !key.is_empty() && matches!(chars.peek(), Some(':')) {
                out.push('"');
                out.push_str(&key);
                out.push('"');
            } else {
                out.push_str(&key);
            }
            continue;
        }
        out.push(c);
    }
    out
}

/// Remove a trailing comma immediately before a closing `}` or `]`.
fn drop_trailing_commas(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == ',' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j < chars.len() && (chars[j] == '}' || chars[j] == ']') {
                i += 1;
                continue;
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fences() {
        let raw = "```json\n{\"a\":1}\n```";
        let repaired = repair(raw);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn extracts_largest_balanced_object_ignoring_preamble() {
        let raw = "Here is the JSON you asked for: {\"a\": {\"b\": 1}} Hope that helps!";
        let repaired = repair(raw);
        let v: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(v["a"]["b"], 1);
    }

    #[test]
    fn drops_trailing_commas() {
        let raw = "{\"a\":1,\"b\":[1,2,],}";
        let repaired = repair(raw);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }

    #[test]
    fn quotes_bare_keys() {
        let raw = "{mood: \"Chill/Mellow\", genre: \"Ambient\"}";
        let repaired = repair(raw);
        let v: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(v["mood"], "Chill/Mellow");
    }

    #[test]
    fn converts_single_quoted_strings() {
        let raw = "{'mood': 'Chill/Mellow'}";
        let repaired = repair(raw);
        let v: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(v["mood"], "Chill/Mellow");
    }

    #[test]
    fn normalizes_curly_quotes() {
        let raw = "{\u{201C}mood\u{201D}: \u{201C}Chill/Mellow\u{201D}}";
        let repaired = repair(raw);
        assert!(serde_json::from_str::<serde_json::Value>(&repaired).is_ok());
    }
}
