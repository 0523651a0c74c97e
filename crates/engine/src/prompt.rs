//! Interactive gathering of infrastructure parameter values.
//!
//! Given one parameter definition, [`Prompter::prompt_for_parameter`] drives
//! the console until it holds a valid typed value. Validation failures loop
//! with an explanatory message; configuration problems (a default outside the
//! allowed values, an empty allowed list, a default of the wrong natural
//! type) are fatal and abort before any interaction.

use std::sync::Arc;

use azd_api::LocationProvider;
use azd_console::{Console, ConsoleError, PromptOptions, SelectOptions};
use azd_types::{MetadataError, ParamValue, ParameterDefinition, ParameterType};
use serde_json::Value;
use thiserror::Error;

/// `metadata.azd.type` value that selects the region picker.
const LOCATION_METADATA_TYPE: &str = "location";

/// A parameter could not be resolved to a value.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Console interaction failed or was canceled; propagated unchanged.
    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("parameter '{name}' has an empty list of allowed values")]
    EmptyAllowedValues { name: String },

    #[error("the default value '{value}' is not one of the allowed values for parameter '{name}'")]
    DefaultNotAllowed { name: String, value: Value },

    #[error("failed to convert the default value '{value}' for parameter '{name}' to a boolean")]
    BoolDefaultType { name: String, value: Value },

    #[error("the default value for parameter '{name}' must be a number, found '{value}'")]
    IntDefaultType { name: String, value: Value },

    #[error("the default value for parameter '{name}' must be a string, found '{value}'")]
    StringDefaultType { name: String, value: Value },

    #[error("the default value '{value}' for parameter '{name}' does not match the parameter type")]
    DefaultType { name: String, value: Value },

    #[error("allowed value '{value}' does not have the natural type of parameter '{name}'")]
    AllowedValueType { name: String, value: Value },

    #[error("the stored value '{value}' for parameter '{name}' does not match the parameter type")]
    StoredValueType { name: String, value: Value },

    #[error("the allowed values for parameter '{name}' exclude every subscription location")]
    NoMatchingLocation { name: String },

    #[error("failed to list subscription locations")]
    Locations(#[source] anyhow::Error),
}

impl PromptError {
    /// Whether this outcome is an operator cancellation rather than an error.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Console(ConsoleError::Canceled))
    }
}

/// Drives the console to collect typed parameter values.
pub struct Prompter {
    console: Arc<dyn Console>,
    locations: Arc<dyn LocationProvider>,
}

impl Prompter {
    pub fn new(console: Arc<dyn Console>, locations: Arc<dyn LocationProvider>) -> Self {
        Self { console, locations }
    }

    /// Produce a valid typed value for one parameter.
    ///
    /// `current` is the template's own default (or a previously stored
    /// value); `metadata.azd.default` overrides it when present.
    pub async fn prompt_for_parameter(
        &self,
        name: &str,
        definition: &ParameterDefinition,
        current: Option<&Value>,
    ) -> Result<ParamValue, PromptError> {
        let metadata = definition.azd_metadata()?.unwrap_or_default();
        let effective_default = metadata.default.as_ref().or(current);
        let default = resolve_default(name, definition, effective_default)?;
        let wants_location = metadata.r#type.as_deref() == Some(LOCATION_METADATA_TYPE);

        if let Some(allowed) = definition.allowed_values.as_deref() {
            if allowed.is_empty() {
                return Err(PromptError::EmptyAllowedValues { name: name.to_string() });
            }
            if let Some(default) = default.as_ref()
                && !allowed.contains(&default.to_json())
            {
                return Err(PromptError::DefaultNotAllowed {
                    name: name.to_string(),
                    value: default.to_json(),
                });
            }
            if wants_location {
                return self.prompt_location(name, Some(allowed), default).await;
            }
            return self.prompt_allowed(name, definition, allowed, default).await;
        }

        match definition.r#type {
            ParameterType::Bool => self.prompt_bool(name, default).await,
            _ if wants_location => self.prompt_location(name, None, default).await,
            _ => self.prompt_free_text(name, definition, default).await,
        }
    }

    /// Select over the exact allowed-values sequence.
    async fn prompt_allowed(
        &self,
        name: &str,
        definition: &ParameterDefinition,
        allowed: &[Value],
        default: Option<ParamValue>,
    ) -> Result<ParamValue, PromptError> {
        let default_index = default
            .as_ref()
            .and_then(|value| allowed.iter().position(|candidate| *candidate == value.to_json()));
        let index = self
            .console
            .select(SelectOptions {
                message: select_message(name),
                choices: allowed.iter().map(choice_label).collect(),
                default_index,
            })
            .await?;
        let chosen = &allowed[index];
        ParamValue::from_json(chosen, definition.r#type).map_err(|_| PromptError::AllowedValueType {
            name: name.to_string(),
            value: chosen.clone(),
        })
    }

    /// Booleans always present a False/True selection.
    async fn prompt_bool(&self, name: &str, default: Option<ParamValue>) -> Result<ParamValue, PromptError> {
        let default_index = default.map(|value| match value {
            ParamValue::Bool(true) => 1,
            _ => 0,
        });
        let index = self
            .console
            .select(SelectOptions {
                message: select_message(name),
                choices: vec!["False".to_string(), "True".to_string()],
                default_index,
            })
            .await?;
        Ok(ParamValue::Bool(index == 1))
    }

    /// Region picker over the subscription's locations, optionally filtered
    /// by the allowed values.
    async fn prompt_location(
        &self,
        name: &str,
        allowed: Option<&[Value]>,
        default: Option<ParamValue>,
    ) -> Result<ParamValue, PromptError> {
        let mut locations = self.locations.locations().await.map_err(PromptError::Locations)?;
        if let Some(allowed) = allowed {
            locations.retain(|location| {
                allowed
                    .iter()
                    .any(|candidate| candidate.as_str() == Some(location.name.as_str()))
            });
            if locations.is_empty() {
                return Err(PromptError::NoMatchingLocation { name: name.to_string() });
            }
        }
        let default_index = default.as_ref().and_then(|value| match value {
            ParamValue::String(region) => locations.iter().position(|location| location.name == *region),
            _ => None,
        });
        let index = self
            .console
            .select(SelectOptions {
                message: select_message(name),
                choices: locations
                    .iter()
                    .map(|location| location.regional_display_name.clone())
                    .collect(),
                default_index,
            })
            .await?;
        Ok(ParamValue::String(locations[index].name.clone()))
    }

    /// Free-text prompt with the validate-and-retry loop.
    async fn prompt_free_text(
        &self,
        name: &str,
        definition: &ParameterDefinition,
        default: Option<ParamValue>,
    ) -> Result<ParamValue, PromptError> {
        let default_text = default.as_ref().map(ParamValue::to_display_string);
        loop {
            let input = self
                .console
                .prompt(PromptOptions {
                    message: enter_message(name),
                    default: default_text.clone(),
                    is_password: definition.r#type.is_secure(),
                })
                .await?;
            match convert_input(definition, &input) {
                Ok(value) => return Ok(value),
                Err(reason) => self.console.message(&reason),
            }
        }
    }
}

fn enter_message(name: &str) -> String {
    format!("Enter a value for the '{name}' infrastructure parameter:")
}

fn select_message(name: &str) -> String {
    format!("Select a value for the '{name}' infrastructure parameter:")
}

fn choice_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Resolve the effective default, enforcing that its natural type matches
/// the parameter type.
///
/// Strictness is deliberate: booleans additionally accept the strings
/// "true"/"false" (case-insensitive) because template tooling spells them
/// that way, but a numeric-looking string is never an int. Coercing there
/// would mask schema drift.
fn resolve_default(
    name: &str,
    definition: &ParameterDefinition,
    default: Option<&Value>,
) -> Result<Option<ParamValue>, PromptError> {
    let Some(default) = default else {
        return Ok(None);
    };
    let resolved = match definition.r#type {
        ParameterType::Bool => match default {
            Value::Bool(flag) => ParamValue::Bool(*flag),
            Value::String(text) => match text.to_ascii_lowercase().as_str() {
                "true" => ParamValue::Bool(true),
                "false" => ParamValue::Bool(false),
                _ => {
                    return Err(PromptError::BoolDefaultType {
                        name: name.to_string(),
                        value: default.clone(),
                    });
                }
            },
            other => {
                return Err(PromptError::BoolDefaultType {
                    name: name.to_string(),
                    value: other.clone(),
                });
            }
        },
        ParameterType::Int => match default.as_i64() {
            Some(number) => ParamValue::Int(number),
            None => {
                return Err(PromptError::IntDefaultType {
                    name: name.to_string(),
                    value: default.clone(),
                });
            }
        },
        ParameterType::String | ParameterType::SecureString => match default {
            Value::String(text) => ParamValue::String(text.clone()),
            other => {
                return Err(PromptError::StringDefaultType {
                    name: name.to_string(),
                    value: other.clone(),
                });
            }
        },
        other_type => {
            ParamValue::from_json(default, other_type).map_err(|_| PromptError::DefaultType {
                name: name.to_string(),
                value: default.clone(),
            })?
        }
    };
    Ok(Some(resolved))
}

/// Coerce terminal input into a typed value, or explain which constraint it
/// violates. Messages are deterministic and name the literal bound.
fn convert_input(definition: &ParameterDefinition, input: &str) -> Result<ParamValue, String> {
    match definition.r#type {
        ParameterType::String | ParameterType::SecureString => {
            let length = input.chars().count() as u64;
            if let Some(min) = definition.min_length
                && length < min
            {
                return Err(format!("value must be at least '{min}' in length"));
            }
            if let Some(max) = definition.max_length
                && length > max
            {
                return Err(format!("value must be at most '{max}' in length"));
            }
            Ok(ParamValue::String(input.to_string()))
        }
        ParameterType::Int => {
            let value: i64 = input
                .trim()
                .parse()
                .map_err(|_| format!("failed to convert '{input}' to an integer"))?;
            if let Some(min) = definition.min_value
                && value < min
            {
                return Err(format!("value must be at least '{min}'"));
            }
            if let Some(max) = definition.max_value
                && value > max
            {
                return Err(format!("value must be at most '{max}'"));
            }
            Ok(ParamValue::Int(value))
        }
        ParameterType::Bool => match azd_util::parse_bool(input) {
            Some(flag) => Ok(ParamValue::Bool(flag)),
            None => Err(format!("failed to convert '{input}' to a boolean")),
        },
        ParameterType::Array => match serde_json::from_str::<Value>(input) {
            Ok(Value::Array(items)) => Ok(ParamValue::Array(items)),
            _ => Err("failed to parse value as a JSON array".to_string()),
        },
        ParameterType::Object | ParameterType::SecureObject => match serde_json::from_str::<Value>(input) {
            Ok(Value::Object(map)) => Ok(ParamValue::Object(map)),
            _ => Err("failed to parse value as a JSON object".to_string()),
        },
    }
}
