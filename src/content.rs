//! Content records as returned by the CMS.
//!
//! A record is a flat mapping from field name to value. Values are
//! classified once, when the JSON body is decoded, and never mutated after.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reference to an uploaded media asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Value of a single record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Plain text
    Text(String),
    /// Rich-editor output (already HTML)
    RichText(String),
    /// Image or file reference
    Media(MediaRef),
    /// Boolean switch, e.g. which job type a listing describes
    Flag(bool),
}

impl FieldValue {
    /// Textual content, if this is a text-like value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::RichText(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) | FieldValue::RichText(s) => s.trim().is_empty(),
            FieldValue::Media(m) => m.url.trim().is_empty(),
            FieldValue::Flag(_) => false,
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if looks_like_markup(s) => Some(FieldValue::RichText(s.clone())),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Flag(*b)),
            Value::Number(n) => Some(FieldValue::Text(n.to_string())),
            Value::Object(obj) => {
                let url = obj.get("url")?.as_str()?.to_string();
                let dim = |key: &str| {
                    obj.get(key)
                        .and_then(Value::as_u64)
                        .and_then(|v| u32::try_from(v).ok())
                };
                Some(FieldValue::Media(MediaRef {
                    url,
                    width: dim("width"),
                    height: dim("height"),
                }))
            }
            // Null, arrays (multi-select, repeaters) carry nothing we render
            _ => None,
        }
    }
}

fn looks_like_markup(s: &str) -> bool {
    let t = s.trim();
    t.starts_with('<') && t.ends_with('>')
}

/// One logical entity from the CMS: a page section, a job listing, a cost tier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl ContentRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a JSON object. Anything other than an object
    /// yields an empty record.
    pub fn from_json(value: &Value) -> Self {
        let fields = value
            .as_object()
            .map(|obj| {
                obj.iter()
                    .filter_map(|(k, v)| FieldValue::from_json(v).map(|fv| (k.clone(), fv)))
                    .collect()
            })
            .unwrap_or_default();
        Self { fields }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Truthiness of a switch field. Non-empty text counts as set.
    pub fn is_flag_set(&self, key: &str) -> bool {
        match self.fields.get(key) {
            Some(FieldValue::Flag(b)) => *b,
            Some(other) => !other.is_empty(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decoded response body of a content endpoint
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPayload {
    /// Object endpoint: the body is the record
    Single(ContentRecord),
    /// List endpoint: records under `contents`
    List(Vec<ContentRecord>),
}

impl ContentPayload {
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::MalformedBody("expected a JSON object".into()))?;
        match obj.get("contents") {
            Some(Value::Array(items)) => Ok(ContentPayload::List(
                items.iter().map(ContentRecord::from_json).collect(),
            )),
            _ => Ok(ContentPayload::Single(ContentRecord::from_json(value))),
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_json(&value)
    }

    /// Record for single-record layouts: the body itself, or the first
    /// list item. An empty record counts as no record.
    pub fn single(&self) -> Option<&ContentRecord> {
        let record = match self {
            ContentPayload::Single(record) => Some(record),
            ContentPayload::List(items) => items.first(),
        };
        record.filter(|r| !r.is_empty())
    }

    /// Records for list layouts. A single-record body has no list.
    pub fn items(&self) -> &[ContentRecord] {
        match self {
            ContentPayload::List(items) => items,
            ContentPayload::Single(_) => &[],
        }
    }
}
