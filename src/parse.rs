//! JSON extraction from free-form model output.
//!
//! Models asked for "JSON only" still wrap their answer in markdown fences,
//! prose, or an envelope object. Strategies are tried in order: code-fence
//! stripping, direct parse, regex-extracted bracket span, and (for arrays)
//! unwrapping the first array-valued member of an envelope object.

use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

fn array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("static regex"))
}

fn object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Strip markdown code fences, keeping the fenced body when present.
pub fn strip_code_fences(response: &str) -> &str {
    if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(response)
            .trim()
    } else if response.contains("```") {
        response.split("```").nth(1).unwrap_or(response).trim()
    } else {
        response.trim()
    }
}

/// Parse a JSON array out of model text.
pub fn parse_array<T: DeserializeOwned>(response: &str) -> Result<Vec<T>> {
    let cleaned = strip_code_fences(response);

    // Direct parse
    if let Ok(items) = serde_json::from_str::<Vec<T>>(cleaned) {
        return Ok(items);
    }

    // Regex-extracted array span
    if let Some(m) = array_regex().find(cleaned) {
        if let Ok(items) = serde_json::from_str::<Vec<T>>(m.as_str()) {
            return Ok(items);
        }
    }

    // Envelope object: take the first array-valued member
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(cleaned) {
        for (_, value) in map {
            if value.is_array() {
                return serde_json::from_value(value)
                    .with_context(|| format!("Array inside object did not match: {}", snippet(cleaned)));
            }
        }
    }

    anyhow::bail!("No JSON array found in response: {}", snippet(cleaned))
}

/// Parse a JSON object out of model text.
pub fn parse_object<T: DeserializeOwned>(response: &str) -> Result<T> {
    let cleaned = strip_code_fences(response);

    if let Ok(parsed) = serde_json::from_str::<T>(cleaned) {
        return Ok(parsed);
    }

    if let Some(m) = object_regex().find(cleaned) {
        return serde_json::from_str(m.as_str())
            .with_context(|| format!("JSON structure mismatch: {}", snippet(cleaned)));
    }

    anyhow::bail!("No JSON object found in response: {}", snippet(cleaned))
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
