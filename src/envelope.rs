//! Page envelope returned by every Up API call
//!
//! ```json
//! { "data": [...], "links": { "prev": null, "next": "https://..." } }
//! { "errors": [{ "status": "401", "title": "Not Authorized", "detail": "..." }] }
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, UpError};

/// Top-level JSON object of a response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub links: Option<Links>,
    #[serde(default)]
    pub errors: Option<Vec<ApiErrorObject>>,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
}

/// One upstream error object
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiErrorObject {
    #[serde(default, deserialize_with = "string_or_number")]
    pub status: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    /// Fail with [`UpError::Api`] when the envelope carries errors, so no
    /// data from it is ever treated as valid
    pub fn check_errors(self) -> Result<Self> {
        match self.errors {
            Some(errors) => Err(UpError::Api { errors }),
            None => Ok(self),
        }
    }

    /// Link to the following page, if any
    pub fn next_link(&self) -> Option<&str> {
        self.links.as_ref().and_then(|l| l.next.as_deref())
    }

    /// Take the `data` array of a paginated response
    pub fn take_records(&mut self) -> Result<Vec<Value>> {
        match self.data.take() {
            Some(Value::Array(records)) => Ok(records),
            Some(other) => Err(UpError::malformed(format!(
                "expected a data array, found {}",
                json_type(&other)
            ))),
            None => Err(UpError::malformed("response has no data array")),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
