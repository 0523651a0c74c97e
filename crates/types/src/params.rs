//! Infrastructure parameter definitions and typed parameter values.
//!
//! Parameter definitions arrive as JSON from the deployment input set; values
//! cross a dynamic boundary (JSON from templates, strings from the terminal).
//! [`ParamValue`] models them as a tagged variant carrying the canonical
//! native representation so validation can discriminate on the tag.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// The declared type of an infrastructure parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterType {
    String,
    SecureString,
    Int,
    Bool,
    Array,
    Object,
    SecureObject,
}

impl ParameterType {
    /// Whether values of this type should be collected without echo.
    pub fn is_secure(&self) -> bool {
        matches!(self, Self::SecureString | Self::SecureObject)
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::SecureString => "secureString",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Array => "array",
            Self::Object => "object",
            Self::SecureObject => "secureObject",
        };
        f.write_str(name)
    }
}

/// Declarative schema for one input expected by an infrastructure template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    /// The parameter's declared type
    pub r#type: ParameterType,
    /// The template's own default; `metadata.azd.default` overrides it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    /// When present, the value must equal one of these entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    /// Inclusive lower bound, meaningful for `int`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<i64>,
    /// Inclusive upper bound, meaningful for `int`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<i64>,
    /// Minimum length, meaningful for `string` and `array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// Maximum length, meaningful for `string` and `array`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    /// Opaque metadata mapping; the well-known `azd` key is recognized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, Value>>,
}

impl ParameterDefinition {
    /// Construct a bare definition of the given type with no constraints.
    pub fn of_type(r#type: ParameterType) -> Self {
        Self {
            r#type,
            default_value: None,
            allowed_values: None,
            min_value: None,
            max_value: None,
            min_length: None,
            max_length: None,
            metadata: None,
        }
    }

    /// Parse the well-known `metadata.azd` block, if present.
    ///
    /// A present but malformed block is a configuration error; callers treat
    /// it as fatal rather than silently ignoring operator intent.
    pub fn azd_metadata(&self) -> Result<Option<AzdMetadata>, MetadataError> {
        let Some(raw) = self.metadata.as_ref().and_then(|m| m.get("azd")) else {
            return Ok(None);
        };
        serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|source| MetadataError { source })
    }
}

/// The recognized shape of the `metadata.azd` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AzdMetadata {
    /// Suggested default value; overrides the template's own default
    #[serde(default)]
    pub default: Option<Value>,
    /// Semantic override that selects a specialized prompter ("location")
    #[serde(default)]
    pub r#type: Option<String>,
}

/// The `metadata.azd` block could not be parsed.
#[derive(Debug, Error)]
#[error("failed to parse the 'azd' parameter metadata block: {source}")]
pub struct MetadataError {
    #[source]
    source: serde_json::Error,
}

/// A typed parameter value in its canonical native representation.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    String(String),
    Int(i64),
    Bool(bool),
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl ParamValue {
    /// The parameter type family this value satisfies.
    ///
    /// Secure variants share the representation of their plain counterparts,
    /// so `String` answers for `secureString` and `Object` for
    /// `secureObject`.
    pub fn matches(&self, r#type: ParameterType) -> bool {
        matches!(
            (self, r#type),
            (Self::String(_), ParameterType::String | ParameterType::SecureString)
                | (Self::Int(_), ParameterType::Int)
                | (Self::Bool(_), ParameterType::Bool)
                | (Self::Array(_), ParameterType::Array)
                | (Self::Object(_), ParameterType::Object | ParameterType::SecureObject)
        )
    }

    /// Render the value back to its JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Int(n) => Value::Number((*n).into()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Array(items) => Value::Array(items.clone()),
            Self::Object(map) => Value::Object(map.clone()),
        }
    }

    /// Convert a JSON value into the typed representation declared by
    /// `r#type`, rejecting natural-type mismatches.
    ///
    /// The conversion is strict on purpose: a numeric-looking string is not
    /// an int, and an array is not an object. Coercing here would mask schema
    /// drift between the template and its inputs.
    pub fn from_json(value: &Value, r#type: ParameterType) -> Result<Self, ValueTypeError> {
        let converted = match (r#type, value) {
            (ParameterType::String | ParameterType::SecureString, Value::String(s)) => {
                Some(Self::String(s.clone()))
            }
            (ParameterType::Int, Value::Number(n)) => n.as_i64().map(Self::Int),
            (ParameterType::Bool, Value::Bool(b)) => Some(Self::Bool(*b)),
            (ParameterType::Array, Value::Array(items)) => Some(Self::Array(items.clone())),
            (ParameterType::Object | ParameterType::SecureObject, Value::Object(map)) => {
                Some(Self::Object(map.clone()))
            }
            _ => None,
        };
        converted.ok_or_else(|| ValueTypeError {
            expected: r#type,
            found: value.clone(),
        })
    }

    /// Display rendering used when a value becomes a prompt default.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

/// A JSON value did not match the declared parameter type.
#[derive(Debug, Error)]
#[error("value '{found}' does not have the natural type of a '{expected}' parameter")]
pub struct ValueTypeError {
    expected: ParameterType,
    found: Value,
}
