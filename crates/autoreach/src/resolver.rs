//! Step input resolution against the output table.
//!
//! Projection follows one compatibility rule that downstream handlers depend
//! on: a mapping output is projected by key, while a sequence output is passed
//! through whole whatever key was named. Anything unresolvable becomes `null`
//! so the consuming handler decides whether that is fatal.

use autoreach_core::{Arguments, Binding, OutputTable};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Materializes one binding.
///
/// # Examples
///
/// ```
/// use autoreach::resolve;
/// use autoreach_core::{Binding, OutputTable, StepId};
/// use serde_json::json;
///
/// let mut table = OutputTable::new();
/// table.record("a", json!({"leads": [{"id": 1}]}));
///
/// let binding = Binding::StepRef { step_id: StepId::new("a"), key: Some("leads".into()) };
/// assert_eq!(resolve(&binding, &table), json!([{"id": 1}]));
/// ```
pub fn resolve(binding: &Binding, table: &OutputTable) -> Value {
    match binding {
        Binding::Literal(value) => value.clone(),
        // Inputs never read the environment.
        Binding::EnvRef(name) => {
            debug!("environment reference '{}' in step input resolves to null", name);
            Value::Null
        }
        Binding::StepRef { step_id, key } => {
            let Some(output) = table.get(step_id.as_str()) else {
                debug!("step '{}' has no recorded output; resolving to null", step_id);
                return Value::Null;
            };
            project(output, key.as_deref())
        }
    }
}

/// Resolves every input of a step into keyword arguments.
pub fn resolve_inputs(inputs: &IndexMap<String, Binding>, table: &OutputTable) -> Arguments {
    inputs
        .iter()
        .map(|(name, binding)| (name.as_str(), resolve(binding, table)))
        .collect()
}

fn project(output: &Value, key: Option<&str>) -> Value {
    match (output, key) {
        (Value::Array(_), _) => output.clone(),
        (_, None) => output.clone(),
        (Value::Object(map), Some(key)) => map.get(key).cloned().unwrap_or(Value::Null),
        (_, Some(_)) => Value::Null,
    }
}
