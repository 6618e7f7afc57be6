#![forbid(unsafe_code)]

//! Record identifiers.
//!
//! Ids are opaque strings. Callers may hand in numeric ids (older clients
//! stored millisecond timestamps as numbers), so every entry point runs the
//! value through [`canonical_id`] or [`IdInput::canonical`] before comparing
//! or persisting it.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Canonical string form of a textual id, or `None` when it is blank.
#[must_use]
pub fn canonical_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// An id as supplied by a caller: text or a JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdInput {
    Text(String),
    Number(serde_json::Number),
}

impl IdInput {
    #[must_use]
    pub fn canonical(&self) -> Option<String> {
        match self {
            Self::Text(s) => canonical_id(s),
            Self::Number(n) => Some(number_to_id(n)),
        }
    }
}

impl fmt::Display for IdInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for IdInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for IdInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<u64> for IdInput {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for IdInput {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

fn number_to_id(n: &serde_json::Number) -> String {
    if let Some(v) = n.as_u64() {
        return v.to_string();
    }
    if let Some(v) = n.as_i64() {
        return v.to_string();
    }
    match n.as_f64() {
        // 7.0 and 7 name the same id.
        #[allow(clippy::cast_possible_truncation)]
        Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

/// Deserializes a stored id that may have been written as a number.
pub(crate) fn deserialize_canonical<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let input = IdInput::deserialize(deserializer)?;
    input
        .canonical()
        .ok_or_else(|| serde::de::Error::custom("id must not be empty"))
}

/// Like [`deserialize_canonical`], but a blank value reads as `""`: the
/// reference points at nothing.
pub(crate) fn deserialize_reference<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let input = IdInput::deserialize(deserializer)?;
    Ok(input.canonical().unwrap_or_default())
}
