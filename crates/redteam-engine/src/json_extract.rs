//! Tolerant extraction of `{improvement, prompt}` fields from attacker
//! output.
//!
//! Attackers are adversarially creative and often wrap JSON in prose or
//! markdown fences. This MUST tolerate that without losing a usable
//! candidate, because discarding one wastes a model call.

use field_pattern::field_regex;
use serde_json::Value;

/// Strip a leading/trailing markdown code fence (` ```json` or bare ` ``` `).
fn strip_markdown_fence(response: &str) -> &str {
    let mut s = response.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    s = s.trim();
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Decode the JSON backslash escapes the fallback regex is allowed to see:
/// `\"`, `\n`, `\\`.
fn unescape(body: &str) -> String {
    body.replace("\\\"", "\"")
        .replace("\\n", "\n")
        .replace("\\\\", "\\")
}

/// Extract `field` from attacker `response`, or `None` if neither tier
/// matches.
fn extract_field_raw(response: &str, field: &str) -> Option<String> {
    let stripped = strip_markdown_fence(response);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stripped) {
        if let Some(Value::String(s)) = map.get(field) {
            return Some(s.clone());
        }
    }

    let re = field_regex(field);
    re.captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| unescape(m.as_str()))
}

/// Extract the `prompt` field, falling back to the entire raw text when
/// both tiers fail (the attacker ignored the format instruction, but its
/// text is still a usable candidate).
pub fn extract_prompt(response: &str) -> String {
    extract_field_raw(response, "prompt").unwrap_or_else(|| response.to_string())
}

/// Extract the `improvement` field, falling back to an empty string.
pub fn extract_improvement(response: &str) -> String {
    extract_field_raw(response, "improvement").unwrap_or_default()
}

mod field_pattern {
    use regex::Regex;

    pub fn field_regex(field: &str) -> Regex {
        let pattern = format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)"\s*}}"#, regex::escape(field));
        Regex::new(&pattern).expect("field regex is statically valid")
    }
}
