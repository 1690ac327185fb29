//! Request and result types exchanged over HTTP.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /sanitize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeRequest {
    pub text: String,
}

/// Why a request body could not be turned into a [`SanitizeRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestProblem {
    /// Empty body, unparseable JSON, or JSON `null`
    NoBody,
    /// `text` missing, not a string, or empty
    NoText,
}

impl SanitizeRequest {
    /// Parse a raw request body.
    ///
    /// Done by hand instead of through `Json<SanitizeRequest>` so that a missing
    /// body and a missing `text` field can be told apart.
    pub fn from_body(body: &[u8]) -> Result<Self, RequestProblem> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(RequestProblem::NoBody);
        }

        let value: Value = serde_json::from_slice(body).map_err(|_| RequestProblem::NoBody)?;
        if value.is_null() {
            return Err(RequestProblem::NoBody);
        }

        match value.get("text").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Ok(Self {
                text: text.to_string(),
            }),
            _ => Err(RequestProblem::NoText),
        }
    }
}

/// The three sanitized renderings returned to callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeResult {
    #[serde(rename = "Masked")]
    pub masked: String,
    #[serde(rename = "Rephrased")]
    pub rephrased: String,
    #[serde(rename = "Synthetic")]
    pub synthetic: String,
}

impl SanitizeResult {
    /// Same text in every field. Used whenever the model output has no usable structure.
    pub fn uniform(text: &str) -> Self {
        Self {
            masked: text.to_string(),
            rephrased: text.to_string(),
            synthetic: text.to_string(),
        }
    }

    /// Build from a parsed JSON object; absent or non-string fields become empty.
    pub fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        let field = |name: &str| {
            object
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            masked: field("Masked"),
            rephrased: field("Rephrased"),
            synthetic: field("Synthetic"),
        }
    }
}
