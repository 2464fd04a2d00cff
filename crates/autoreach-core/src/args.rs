//! Named values passed to handler constructors and entry points.

use crate::error::HandlerError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Keyword arguments for a handler's entry point, in declaration order.
///
/// A `null` value is treated the same as an absent one, so a reference to a
/// step that never ran looks like an omitted argument to the handler.
///
/// # Examples
///
/// ```
/// use autoreach_core::Arguments;
/// use serde_json::json;
///
/// let mut args = Arguments::new();
/// args.insert("tone", json!("formal"));
/// args.insert("ranked_leads", json!(null));
///
/// assert_eq!(args.optional::<String>("tone").unwrap(), Some("formal".to_string()));
/// assert_eq!(args.optional::<Vec<String>>("ranked_leads").unwrap(), None);
/// assert!(args.required::<String>("persona").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, Value>,
}

impl Arguments {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Returns the raw value of an argument; `null` reads as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    /// Deserializes an argument if present.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, HandlerError> {
        self.get(name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| HandlerError::InvalidArgument {
                    name: name.to_string(),
                    details: e.to_string(),
                })
            })
            .transpose()
    }

    /// Deserializes an argument that must be present.
    pub fn required<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        self.optional(name)?
            .ok_or_else(|| HandlerError::MissingArgument(name.to_string()))
    }

    /// Iterates argument names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Returns the number of arguments, including null ones.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no argument was declared.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Resolved constructor parameters for one handler instance.
///
/// Keys are lower-cased; every value is non-null by the time a handler sees
/// it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerConfig {
    values: IndexMap<String, Value>,
}

impl HandlerConfig {
    /// Creates an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter. The key is lower-cased.
    pub fn insert(&mut self, key: impl AsRef<str>, value: Value) {
        self.values.insert(key.as_ref().to_lowercase(), value);
    }

    /// Returns the raw value of a parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    /// Deserializes a parameter if present.
    pub fn optional<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, HandlerError> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| HandlerError::InvalidConfig {
                    key: key.to_string(),
                    details: e.to_string(),
                })
            })
            .transpose()
    }

    /// Deserializes a parameter that must be present.
    pub fn required<T: DeserializeOwned>(&self, key: &str) -> Result<T, HandlerError> {
        self.optional(key)?.ok_or_else(|| HandlerError::InvalidConfig {
            key: key.to_string(),
            details: "required parameter was not supplied".to_string(),
        })
    }

    /// Returns the keys whose value is `null`, in declaration order.
    pub fn missing_keys(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|(_, v)| v.is_null())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Iterates `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: AsRef<str>> FromIterator<(K, Value)> for HandlerConfig {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (key, value) in iter {
            config.insert(key, value);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argument_type_mismatch() {
        let args: Arguments = [("leads", json!("not a list"))].into_iter().collect();
        let err = args.optional::<Vec<Value>>("leads").unwrap_err();
        assert!(matches!(err, HandlerError::InvalidArgument { ref name, .. } if name == "leads"));
    }

    #[test]
    fn test_argument_names_keep_order() {
        let args: Arguments = [("b", json!(1)), ("a", json!(2))].into_iter().collect();
        assert_eq!(args.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn test_config_keys_are_lowercased() {
        let config: HandlerConfig = [("API_KEY", json!("k1")), ("Sheet_Id", json!(null))]
            .into_iter()
            .collect();

        assert_eq!(config.required::<String>("api_key").unwrap(), "k1");
        assert_eq!(config.missing_keys(), vec!["sheet_id".to_string()]);
        assert!(config.required::<String>("sheet_id").is_err());
    }
}
