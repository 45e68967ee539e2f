//! JSON codec wrapper (the "JSON codec" external adapter of spec `4.8`).
//!
//! Restricted, per the Non-goals, to a flat string-to-string mapping: values
//! that are not JSON strings are reported rather than exposed to callers.

use serde_json::{Map, Value};

use crate::error::{EepmanError, Result};

/// A parsed document: a flat `string -> string` mapping.
pub struct Document {
    map: Map<String, Value>,
}

impl Document {
    /// The literal empty document, as written by `clear()`.
    pub fn empty() -> Self {
        Self { map: Map::new() }
    }

    /// Parses `bytes` as a JSON object.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes).map_err(EepmanError::JsonParseFail)?;
        match value {
            Value::Object(map) => Ok(Self { map }),
            _ => Err(EepmanError::JsonRootNotObject),
        }
    }

    /// Fetches `key` as a string, or an error if absent or not a string.
    pub fn get(&self, key: &str) -> Result<&str> {
        match self.map.get(key) {
            None => Err(EepmanError::JsonKeyNotFound(key.to_string())),
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(EepmanError::JsonKeyNotString(key.to_string())),
        }
    }

    /// Returns `true` if `key` is present (regardless of its value's type).
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Inserts or replaces `key -> value`. A `None` value is stored as the
    /// empty string, per spec `4.7` ("a null input is treated as the empty
    /// string").
    pub fn set(&mut self, key: &str, value: Option<&str>) {
        self.map
            .insert(key.to_string(), Value::String(value.unwrap_or("").to_string()));
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    /// Enumerates the currently-defined keys, in undefined order.
    pub fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    /// Serialises the document in compact (non-pretty) form.
    pub fn to_compact_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&Value::Object(self.map.clone())).map_err(EepmanError::JsonError)
    }
}
