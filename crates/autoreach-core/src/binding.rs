//! Declared values of handler configuration and step inputs.
//!
//! Raw document values are parsed once, at load time, into a [`Binding`].
//! A `{{...}}` token in a handler config entry names an environment variable;
//! the same token in a step input names a previous step's output.

use crate::step::StepId;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

const TOKEN_OPEN: &str = "{{";
const TOKEN_CLOSE: &str = "}}";
const OUTPUT_SEGMENT: &str = "output";

/// A parsed binding.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A value used as-is.
    Literal(Value),
    /// `{{NAME}}` in a config entry, substituted from the environment.
    EnvRef(String),
    /// `{{step_id.output.key}}` or `{{step_id.output}}` in a step input.
    StepRef {
        /// The producing step.
        step_id: StepId,
        /// Key projected out of a mapping output; `None` passes the whole
        /// output through.
        key: Option<String>,
    },
}

/// A `{{...}}` token that cannot be interpreted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid reference token '{token}': {reason}")]
pub struct InvalidBinding {
    /// The raw token text.
    pub token: String,
    /// Why the token was rejected.
    pub reason: &'static str,
}

impl Binding {
    /// Parses a handler config value.
    ///
    /// ```
    /// use autoreach_core::Binding;
    /// use serde_json::json;
    ///
    /// let binding = Binding::parse_config(&json!("{{APOLLO_API_KEY}}")).unwrap();
    /// assert_eq!(binding, Binding::EnvRef("APOLLO_API_KEY".to_string()));
    /// ```
    pub fn parse_config(value: &Value) -> Result<Self, InvalidBinding> {
        match token_contents(value) {
            Some(inner) => {
                if inner.is_empty() {
                    return Err(InvalidBinding {
                        token: raw_token(value),
                        reason: "environment reference is empty",
                    });
                }
                Ok(Binding::EnvRef(inner.to_string()))
            }
            None => Ok(Binding::Literal(value.clone())),
        }
    }

    /// Parses a step input value.
    ///
    /// The first dot-separated segment is the step id and the last one is the
    /// projected key. A trailing `output` segment (or none at all) marks a
    /// whole-output reference.
    ///
    /// ```
    /// use autoreach_core::{Binding, StepId};
    /// use serde_json::json;
    ///
    /// let binding = Binding::parse_input(&json!("{{prospect_search.output.leads}}")).unwrap();
    /// assert_eq!(
    ///     binding,
    ///     Binding::StepRef { step_id: StepId::new("prospect_search"), key: Some("leads".to_string()) }
    /// );
    /// ```
    pub fn parse_input(value: &Value) -> Result<Self, InvalidBinding> {
        let Some(inner) = token_contents(value) else {
            return Ok(Binding::Literal(value.clone()));
        };

        let segments: Vec<&str> = inner.split('.').map(str::trim).collect();
        let step_id = segments.first().copied().unwrap_or_default();
        if step_id.is_empty() {
            return Err(InvalidBinding {
                token: raw_token(value),
                reason: "step reference has no step id",
            });
        }

        let key = match segments.as_slice() {
            [_] => None,
            [_, only] if *only == OUTPUT_SEGMENT => None,
            [.., last] if last.is_empty() => {
                return Err(InvalidBinding {
                    token: raw_token(value),
                    reason: "step reference ends with an empty key",
                });
            }
            [.., last] => Some((*last).to_string()),
            [] => None,
        };

        Ok(Binding::StepRef {
            step_id: StepId::new(step_id),
            key,
        })
    }

    /// Returns `true` for `Binding::Literal`.
    pub fn is_literal(&self) -> bool {
        matches!(self, Binding::Literal(_))
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Literal(value) => write!(f, "{value}"),
            Binding::EnvRef(name) => write!(f, "{{{{{name}}}}}"),
            Binding::StepRef { step_id, key: None } => {
                write!(f, "{{{{{step_id}.{OUTPUT_SEGMENT}}}}}")
            }
            Binding::StepRef {
                step_id,
                key: Some(key),
            } => write!(f, "{{{{{step_id}.{OUTPUT_SEGMENT}.{key}}}}}"),
        }
    }
}

fn token_contents(value: &Value) -> Option<&str> {
    let text = value.as_str()?;
    let inner = text.strip_prefix(TOKEN_OPEN)?.strip_suffix(TOKEN_CLOSE)?;
    Some(inner.trim())
}

fn raw_token(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}
