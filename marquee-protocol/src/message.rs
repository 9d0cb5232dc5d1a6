//! Structured message document
//!
//! A message feed item carries a JSON document describing one styled message:
//! ```text
//! {"name": "birthday",
//!  "elements": [{"type": "color", "data": "#FF0000"},
//!               {"type": "text",  "data": "Happy birthday!"}]}
//! ```
//! Element order is significant. This module only checks the document shape;
//! element validation belongs to the message parser.

use alloc::string::String;
use alloc::vec::Vec;

use serde_json::Value;

use crate::error::WireError;

// Element type tags
pub const TAG_FONT: &str = "font";
pub const TAG_BACKGROUND: &str = "back";
pub const TAG_ICON: &str = "icon";
pub const TAG_COLOR: &str = "color";
pub const TAG_TEXT: &str = "text";
pub const TAG_EFFECT: &str = "fx";

/// One `{type, data}` entry as it appeared on the wire
///
/// Fields that are absent or not strings decode as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WireElement {
    pub tag: Option<String>,
    pub data: Option<String>,
}

impl WireElement {
    fn from_value(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };
        Self {
            tag: take_string(fields.remove("type")),
            data: take_string(fields.remove("data")),
        }
    }
}

/// A decoded structured message document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Category label
    pub name: Option<String>,
    pub elements: Vec<WireElement>,
}

impl WireMessage {
    /// Decode a document from an item value
    pub fn decode(raw: &str) -> Result<Self, WireError> {
        let doc: Value = serde_json::from_str(raw).map_err(|_| WireError::NotJson)?;
        let Value::Object(mut fields) = doc else {
            return Err(WireError::UnexpectedShape);
        };
        let elements = match fields.remove("elements") {
            Some(Value::Array(elements)) => elements,
            Some(_) => return Err(WireError::UnexpectedShape),
            None => return Err(WireError::MissingField),
        };

        Ok(Self {
            name: take_string(fields.remove("name")),
            elements: elements.into_iter().map(WireElement::from_value).collect(),
        })
    }
}

fn take_string(value: Option<Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}
