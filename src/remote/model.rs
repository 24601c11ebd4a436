//! JSON-RPC request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const GET_VALUE_METHOD: &str = "get_value";
pub const GET_KEYS_METHOD: &str = "get_keys";

#[derive(Debug, Clone, Serialize)]
pub struct GetValueRequest<'a> {
    pub id: &'a str,
    pub key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetKeysRequest<'a> {
    pub id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetValueResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    /// Absent and `null` both decode to [`Value::Null`].
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetKeysResponse {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_success() -> bool {
    true
}

/// Phrases a data layer uses to report a missing store or key.
const ABSENCE_PHRASES: &[&str] = &["not found", "does not exist", "unknown store", "unknown key"];

/// Returns `true` if an RPC error message reports a missing store or key.
///
/// Anything else, including generic "unknown error" messages, is a failure.
pub fn is_not_found_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    ABSENCE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}
