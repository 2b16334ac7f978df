//! Declarative attribute schema shared by the UI and persistence layers.
//!
//! Nodes keep their configuration in typed fields. The schema is only used
//! to validate externally supplied values before they are applied, so the
//! update path never does string-keyed lookups.

use crate::graph::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A dynamically typed attribute value as it appears in session files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(v) => Some(*v),
            AttributeValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Bool(_) => "bool",
            AttributeValue::Int(_) => "integer",
            AttributeValue::Float(_) => "float",
            AttributeValue::String(_) => "string",
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Float(v) => write!(f, "{}", v),
            AttributeValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::String(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::String(v)
    }
}

/// Editor hint for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    String,
    IntSpinner,
    FloatSpinner,
    FloatSlider,
    Checkbox,
    /// One of a fixed set of string options.
    ComboBox(&'static [&'static str]),
}

/// One entry of a node's attribute table.
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub key: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub widget: WidgetKind,
    pub default: AttributeValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub visible: bool,
}

impl AttributeSchema {
    pub fn new(
        key: &'static str,
        display_name: &'static str,
        widget: WidgetKind,
        default: impl Into<AttributeValue>,
    ) -> Self {
        Self {
            key,
            display_name,
            description: "",
            widget,
            default: default.into(),
            min: None,
            max: None,
            visible: true,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Check `value` against the widget type and bounds.
    ///
    /// Returns the value coerced to the widget's type (integers become floats
    /// for float widgets).
    pub fn validate(&self, value: &AttributeValue) -> GraphResult<AttributeValue> {
        let type_error = |expected: &'static str| GraphError::AttributeType {
            key: self.key.to_string(),
            expected,
            found: value.type_name(),
        };

        let coerced = match self.widget {
            WidgetKind::String => AttributeValue::String(
                value.as_str().ok_or_else(|| type_error("string"))?.to_string(),
            ),
            WidgetKind::Checkbox => {
                AttributeValue::Bool(value.as_bool().ok_or_else(|| type_error("bool"))?)
            }
            WidgetKind::IntSpinner => {
                AttributeValue::Int(value.as_int().ok_or_else(|| type_error("integer"))?)
            }
            WidgetKind::FloatSpinner | WidgetKind::FloatSlider => {
                AttributeValue::Float(value.as_float().ok_or_else(|| type_error("float"))?)
            }
            WidgetKind::ComboBox(options) => {
                let choice = value.as_str().ok_or_else(|| type_error("string"))?;
                if !options.contains(&choice) {
                    return Err(GraphError::InvalidAttribute {
                        key: self.key.to_string(),
                        message: format!("'{}' is not one of {:?}", choice, options),
                    });
                }
                AttributeValue::String(choice.to_string())
            }
        };

        if let Some(number) = coerced.as_float() {
            let min = self.min.unwrap_or(f64::NEG_INFINITY);
            let max = self.max.unwrap_or(f64::INFINITY);
            if !(min..=max).contains(&number) {
                return Err(GraphError::AttributeBounds {
                    key: self.key.to_string(),
                    value: number,
                    min,
                    max,
                });
            }
        }

        Ok(coerced)
    }
}
