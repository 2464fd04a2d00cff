//! Workflow document loading.
//!
//! A workflow document is a JSON object naming the workflow and listing its
//! steps in execution order. Each step binds one handler (`agent`), the
//! handler's constructor config (`tools[].config`) and the step's inputs.
//! Every `{{...}}` token is parsed into a [`Binding`] here, so a malformed
//! reference fails the load instead of surprising the run.

use autoreach_core::{Binding, HandlerName, StepId, WorkflowError};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

const UNNAMED_WORKFLOW: &str = "Unnamed";

/// One handler constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    /// Parameter name as written in the document.
    pub key: String,
    /// Literal or `{{ENV_VAR}}` reference.
    pub binding: Binding,
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDescriptor {
    /// Unique id, used as the output table key.
    pub id: StepId,
    /// Handler type to instantiate.
    pub handler: HandlerName,
    /// Constructor parameters, in declaration order.
    pub config: Vec<ConfigEntry>,
    /// Input name to binding, in declaration order.
    pub inputs: IndexMap<String, Binding>,
}

impl StepDescriptor {
    /// Creates a step with no config and no inputs.
    pub fn new(id: impl Into<StepId>, handler: impl Into<HandlerName>) -> Self {
        Self {
            id: id.into(),
            handler: handler.into(),
            config: Vec::new(),
            inputs: IndexMap::new(),
        }
    }

    /// Adds a constructor parameter.
    pub fn with_config(mut self, key: impl Into<String>, binding: Binding) -> Self {
        self.config.push(ConfigEntry {
            key: key.into(),
            binding,
        });
        self
    }

    /// Adds an input binding.
    pub fn with_input(mut self, name: impl Into<String>, binding: Binding) -> Self {
        self.inputs.insert(name.into(), binding);
        self
    }
}

/// A parsed workflow document. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDescriptor {
    name: String,
    steps: Vec<StepDescriptor>,
}

impl WorkflowDescriptor {
    /// Builds a descriptor, rejecting duplicate step ids.
    pub fn new(
        name: impl Into<String>,
        steps: Vec<StepDescriptor>,
    ) -> Result<Self, WorkflowError> {
        let mut seen = HashSet::new();
        for (position, step) in steps.iter().enumerate() {
            if !seen.insert(step.id.as_str()) {
                return Err(WorkflowError::InvalidStep {
                    position,
                    details: format!("duplicate step id '{}'", step.id),
                });
            }
        }

        Ok(Self {
            name: name.into(),
            steps,
        })
    }

    /// Returns the workflow name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the steps in execution order.
    pub fn steps(&self) -> &[StepDescriptor] {
        &self.steps
    }

    /// Returns the step with the given id.
    pub fn step(&self, id: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|step| step.id.as_str() == id)
    }

    /// Returns the number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[derive(Debug, Deserialize)]
struct RawWorkflow {
    #[serde(default)]
    workflow_name: Option<String>,
    #[serde(default)]
    steps: Vec<Value>,
}

/// Loads a workflow document from disk.
///
/// # Errors
///
/// - [`WorkflowError::WorkflowNotFound`] if `path` does not exist
/// - [`WorkflowError::MalformedWorkflow`] if it cannot be read or is not a
///   valid document
/// - [`WorkflowError::InvalidStep`] if a step entry is invalid
pub fn load(path: impl AsRef<Path>) -> Result<WorkflowDescriptor, WorkflowError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(WorkflowError::WorkflowNotFound(path.to_path_buf()));
    }

    let source =
        std::fs::read_to_string(path).map_err(|e| WorkflowError::MalformedWorkflow {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

    let raw: RawWorkflow =
        serde_json::from_str(&source).map_err(|e| WorkflowError::MalformedWorkflow {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

    build(raw)
}

/// Parses a workflow document held in memory.
pub fn parse(source: &str) -> Result<WorkflowDescriptor, WorkflowError> {
    let raw: RawWorkflow =
        serde_json::from_str(source).map_err(|e| WorkflowError::MalformedWorkflow {
            path: "<memory>".into(),
            details: e.to_string(),
        })?;

    build(raw)
}

fn build(raw: RawWorkflow) -> Result<WorkflowDescriptor, WorkflowError> {
    let name = raw
        .workflow_name
        .unwrap_or_else(|| UNNAMED_WORKFLOW.to_string());

    let steps = raw
        .steps
        .iter()
        .enumerate()
        .map(|(position, step)| parse_step(position, step))
        .collect::<Result<Vec<_>, _>>()?;

    let workflow = WorkflowDescriptor::new(name, steps)?;
    info!("Loaded workflow: {}", workflow.name());
    Ok(workflow)
}

fn parse_step(position: usize, raw: &Value) -> Result<StepDescriptor, WorkflowError> {
    let invalid = |details: String| WorkflowError::InvalidStep { position, details };

    let object = raw
        .as_object()
        .ok_or_else(|| invalid("step entry is not an object".to_string()))?;

    let id = required_text(object, "id").ok_or_else(|| invalid("missing 'id'".to_string()))?;
    let agent =
        required_text(object, "agent").ok_or_else(|| invalid("missing 'agent'".to_string()))?;

    let mut step = StepDescriptor::new(id, agent);

    match object.get("tools") {
        None | Some(Value::Null) => {}
        Some(Value::Array(tools)) => {
            for tool in tools {
                let config = match tool.get("config") {
                    None | Some(Value::Null) => continue,
                    Some(Value::Object(config)) => config,
                    Some(_) => return Err(invalid("tool 'config' is not an object".to_string())),
                };
                for (key, value) in config {
                    let binding = Binding::parse_config(value)
                        .map_err(|e| invalid(format!("config '{key}': {e}")))?;
                    step = step.with_config(key.clone(), binding);
                }
            }
        }
        Some(_) => return Err(invalid("'tools' is not an array".to_string())),
    }

    match object.get("inputs") {
        None | Some(Value::Null) => {}
        Some(Value::Object(inputs)) => {
            for (name, value) in inputs {
                let binding = Binding::parse_input(value)
                    .map_err(|e| invalid(format!("input '{name}': {e}")))?;
                step = step.with_input(name.clone(), binding);
            }
        }
        Some(_) => return Err(invalid("'inputs' is not an object".to_string())),
    }

    Ok(step)
}

fn required_text<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
