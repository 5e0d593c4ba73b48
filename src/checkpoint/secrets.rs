//! Secret collection and scrubbing for checkpoint data.
//!
//! Components can declare prop paths (and whole outputs) as secret; every
//! string value found there, eight characters or longer, is registered and
//! replaced with `[secret]` wherever it appears in props, outputs, metadata,
//! or progress payloads of the registering node and its descendants. Secrets
//! are matched longest-first so overlapping values scrub cleanly.

use serde_json::Value;

/// Strings shorter than this are never treated as secrets; masking very
/// short values would leak more than it hides.
pub(crate) const MIN_SECRET_LENGTH: usize = 8;

pub(crate) const SECRET_MASK: &str = "[secret]";

/// Walk a dot-separated path into a JSON value.
pub(crate) fn value_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Recursively collect maskable string values.
pub(crate) fn collect_secret_values(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if s.len() >= MIN_SECRET_LENGTH && !out.iter().any(|known| known == s) {
                out.push(s.clone());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_secret_values(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_secret_values(item, out);
            }
        }
        _ => {}
    }
}

/// Replace every registered secret inside `value` with [`SECRET_MASK`].
///
/// `secrets` must be sorted longest-first by the caller (see
/// [`sort_for_scrub`]) so a secret embedded in a longer one cannot leave a
/// partial remainder behind.
pub(crate) fn scrub_value(value: &Value, secrets: &[String]) -> Value {
    if secrets.is_empty() {
        return value.clone();
    }
    match value {
        Value::String(s) => Value::String(scrub_string(s, secrets)),
        Value::Array(items) => Value::Array(items.iter().map(|v| scrub_value(v, secrets)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), scrub_value(v, secrets)))
                .collect(),
        ),
        other => other.clone(),
    }
}

pub(crate) fn scrub_string(input: &str, secrets: &[String]) -> String {
    let mut result = input.to_string();
    for secret in secrets {
        if result.contains(secret.as_str()) {
            result = result.replace(secret.as_str(), SECRET_MASK);
        }
    }
    result
}

/// Order secrets longest-first for scrubbing.
pub(crate) fn sort_for_scrub(secrets: &mut [String]) {
    secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
}
