//! JSON ingestion for virtual trees.
//!
//! Trees authored outside Rust (fixtures, snapshots, a remote renderer) can
//! be loaded from JSON of the shape
//!
//! ```json
//! { "type": "div", "props": { "id": "app" }, "children": ["hi", { "type": "br" }] }
//! ```
//!
//! `props` and `children` are optional. Strings, numbers and booleans in
//! `children` become text elements, `null` children are skipped. Event
//! handlers cannot be expressed in JSON.

use serde_json::{Map, Value};
use thiserror::Error;

use super::{create_element, format_number, Element, ElementType, PropValue, Props, CHILDREN};

/// Errors produced while loading an element tree from JSON.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected an element object, found {0}")]
    NotAnElement(&'static str),

    #[error("element is missing a string `type`")]
    MissingType,

    #[error("prop `{key}` has unsupported {kind} value")]
    UnsupportedPropValue { key: String, kind: &'static str },

    #[error("unsupported {0} child")]
    UnsupportedChild(&'static str),
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn number_text(n: &serde_json::Number) -> String {
    match n.as_i64() {
        Some(i) => i.to_string(),
        None => format_number(n.as_f64().unwrap_or(f64::NAN)),
    }
}

impl Element {
    /// Parse an element tree from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ElementError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Convert an already parsed JSON value into an element tree.
    pub fn from_value(value: &Value) -> Result<Self, ElementError> {
        let Value::Object(object) = value else {
            return Err(ElementError::NotAnElement(kind_of(value)));
        };

        let ty = match object.get("type") {
            Some(Value::String(tag)) => ElementType::host(tag.as_str()),
            _ => return Err(ElementError::MissingType),
        };

        let props = match object.get("props") {
            None | Some(Value::Null) => Props::new(),
            Some(Value::Object(map)) => props_from_map(map)?,
            Some(other) => return Err(ElementError::NotAnElement(kind_of(other))),
        };

        let mut children = Vec::new();
        if let Some(value) = object.get(CHILDREN) {
            match value {
                Value::Array(items) => {
                    for item in items {
                        if let Some(child) = child_from_value(item)? {
                            children.push(child);
                        }
                    }
                }
                Value::Null => {}
                other => return Err(ElementError::UnsupportedChild(kind_of(other))),
            }
        }

        Ok(create_element(ty, props, children))
    }
}

fn props_from_map(map: &Map<String, Value>) -> Result<Props, ElementError> {
    let mut props = Props::new();
    for (key, value) in map {
        let value = match value {
            Value::Null => continue,
            Value::Bool(b) => PropValue::Bool(*b),
            Value::Number(n) => PropValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => PropValue::Str(s.clone()),
            other => {
                return Err(ElementError::UnsupportedPropValue {
                    key: key.clone(),
                    kind: kind_of(other),
                })
            }
        };
        props.insert(key.as_str(), value);
    }
    Ok(props)
}

fn child_from_value(value: &Value) -> Result<Option<Element>, ElementError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(Element::text(b.to_string()))),
        Value::Number(n) => Ok(Some(Element::text(number_text(n)))),
        Value::String(s) => Ok(Some(Element::text(s.as_str()))),
        Value::Object(_) => Element::from_value(value).map(Some),
        Value::Array(_) => Err(ElementError::UnsupportedChild("array")),
    }
}
