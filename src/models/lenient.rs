//! Serde helpers for payloads that send the same field as a string or a number.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

/// Deserializes `"60"`, `60`, `60.5` or `null` into an optional string.
/// Blank strings become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<StringOrNumber>::deserialize(deserializer)?;
    Ok(value
        .map(|v| match v {
            StringOrNumber::String(s) => s.trim().to_string(),
            StringOrNumber::Int(i) => i.to_string(),
            StringOrNumber::Float(f) => f.to_string(),
        })
        .filter(|s| !s.is_empty()))
}
