//! Parse LLM output into categories and scores

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Parse a category response
///
/// Accepts a JSON array (optionally inside a markdown code block or
/// surrounded by prose) or a comma/newline separated list with an optional
/// `Categories:` prefix. Entries are trimmed and lower-cased, empty entries
/// are dropped and the result is truncated to `max_categories`.
pub fn parse_categories(response: &str, max_categories: usize) -> Vec<String> {
    let body = strip_code_fence(response);

    let raw = match parse_json_array(&body) {
        Some(items) => items,
        None => split_list(&body),
    };

    raw.iter()
        .map(|entry| normalize_category(entry))
        .filter(|entry| !entry.is_empty())
        .take(max_categories)
        .collect()
}

/// Find the first integer in a response
///
/// Values too large for `i64` saturate, so clamping afterwards still works.
pub fn extract_first_integer(response: &str) -> Option<i64> {
    static INTEGER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = INTEGER.get_or_init(|| Regex::new(r"-?\d+").ok()).as_ref()?;

    let found = re.find(response)?.as_str();
    Some(found.parse::<i64>().unwrap_or(if found.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    }))
}

/// Remove a surrounding markdown code block, if any
fn strip_code_fence(response: &str) -> String {
    let trimmed = response.trim();

    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }

    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return trimmed.trim_matches('`').to_string();
    }

    // Skip the opening fence line and the closing fence if present
    let end = if lines[lines.len() - 1].trim_start().starts_with("```") {
        lines.len() - 1
    } else {
        lines.len()
    };
    lines[1..end].join("\n")
}

fn parse_json_array(body: &str) -> Option<Vec<String>> {
    let start = body.find('[')?;
    let end = body.rfind(']')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<Value>(&body[start..=end]).ok()? {
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn split_list(body: &str) -> Vec<String> {
    let trimmed = body.trim();
    let without_prefix = match trimmed.get(..11) {
        Some(prefix) if prefix.eq_ignore_ascii_case("categories:") => &trimmed[11..],
        _ => trimmed,
    };

    without_prefix
        .split([',', '\n'])
        .map(str::to_string)
        .collect()
}

fn normalize_category(entry: &str) -> String {
    entry
        .trim()
        .trim_start_matches(['-', '*', '•'])
        .trim()
        .trim_matches(['"', '\'', '`'])
        .trim_end_matches('.')
        .trim()
        .to_lowercase()
}
