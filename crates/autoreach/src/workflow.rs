//! Workflow engine for executing steps.

use crate::document::{self, StepDescriptor, WorkflowDescriptor};
use crate::registry::{HandlerRegistry, HandlerSet};
use crate::resolver::resolve_inputs;
use autoreach_core::{Environment, OutputTable, StepId, StepState, WorkflowError};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use tracing::{info, warn};

/// A loaded workflow with one handler bound per step.
pub struct Workflow {
    descriptor: WorkflowDescriptor,
    handlers: HandlerSet,
}

impl fmt::Debug for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.descriptor.name())
            .field("steps", &self.descriptor.step_count())
            .field("handlers", &self.handlers)
            .finish()
    }
}

impl Workflow {
    /// Binds an already built handler set to a descriptor.
    pub fn new(descriptor: WorkflowDescriptor, handlers: HandlerSet) -> Self {
        Self {
            descriptor,
            handlers,
        }
    }

    /// Creates a new workflow builder.
    pub fn builder() -> WorkflowBuilder {
        WorkflowBuilder::new()
    }

    /// Returns the workflow name.
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Returns the parsed document.
    pub fn descriptor(&self) -> &WorkflowDescriptor {
        &self.descriptor
    }

    /// Returns the handlers built for this workflow.
    pub fn handlers(&self) -> &HandlerSet {
        &self.handlers
    }

    /// Errors raised while constructing handlers.
    pub fn construction_errors(&self) -> &[WorkflowError] {
        self.handlers.errors()
    }

    /// Construction errors followed by the run failures of `outputs`.
    ///
    /// A step whose handler could not be constructed is listed once, by its
    /// construction error.
    pub fn failures<'a>(&'a self, outputs: &'a OutputTable) -> Vec<&'a WorkflowError> {
        let construction = self.construction_errors();
        let not_constructed: HashSet<&StepId> = construction
            .iter()
            .filter_map(WorkflowError::step_id)
            .collect();

        construction
            .iter()
            .chain(outputs.failures().iter().filter(|failure| {
                failure
                    .step_id()
                    .map_or(true, |id| !not_constructed.contains(id))
            }))
            .collect()
    }

    /// Runs every step once, in declaration order. See [`run`].
    pub async fn run(&self) -> OutputTable {
        run(&self.descriptor, &self.handlers).await
    }
}

/// Runs every step of `workflow` once, in declaration order.
///
/// Each step's inputs are resolved against the outputs recorded so far, its
/// handler is invoked, and the returned value is recorded under the step id.
/// A step without a handler, or whose handler fails, records nothing and the
/// run moves on. This function never fails; errors are kept in
/// [`OutputTable::failures`].
pub async fn run(workflow: &WorkflowDescriptor, handlers: &HandlerSet) -> OutputTable {
    let mut table = OutputTable::new();

    for step in workflow.steps() {
        run_step(step, handlers, &mut table).await;
    }

    info!(
        "Workflow '{}' execution completed in {:?}: {} of {} steps recorded output",
        workflow.name(),
        table.elapsed(),
        table.len(),
        workflow.step_count()
    );
    table
}

async fn run_step(step: &StepDescriptor, handlers: &HandlerSet, table: &mut OutputTable) {
    info!("Running step: {} ({})", step.id, step.handler);

    table.transition(&step.id, StepState::ResolvingInputs);
    let args = resolve_inputs(&step.inputs, table);

    let Some(handler) = handlers.get(step.id.as_str()) else {
        let error = WorkflowError::StepExecution {
            step_id: step.id.clone(),
            details: format!("handler '{}' was not initialized", step.handler),
        };
        warn!("{}", error);
        table.record_failure(step.id.clone(), error);
        return;
    };

    table.transition(&step.id, StepState::Invoking);
    let outcome = match AssertUnwindSafe(handler.invoke(args)).catch_unwind().await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(format!("handler panicked: {}", panic_message(payload.as_ref()))),
    };

    match outcome {
        Ok(output) => {
            info!(
                "Step '{}' completed. Output keys: {}",
                step.id,
                describe_keys(&output)
            );
            table.record(step.id.clone(), output);
        }
        Err(details) => {
            let error = WorkflowError::StepExecution {
                step_id: step.id.clone(),
                details,
            };
            warn!("{}", error);
            table.record_failure(step.id.clone(), error);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

fn describe_keys(output: &Value) -> String {
    let keys = match output {
        Value::Object(map) => map.keys().cloned().collect::<Vec<_>>(),
        Value::Array(items) => match items.first() {
            Some(Value::Object(first)) => first.keys().cloned().collect(),
            _ => return "unknown".to_string(),
        },
        _ => return "unknown".to_string(),
    };
    format!("{keys:?}")
}

/// Builder for constructing [`Workflow`] instances.
///
/// Defaults to the built-in handlers and a snapshot of the process
/// environment.
#[derive(Default)]
pub struct WorkflowBuilder {
    registry: Option<HandlerRegistry>,
    environment: Option<Environment>,
}

impl WorkflowBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            registry: None,
            environment: None,
        }
    }

    /// Uses `registry` to construct handlers.
    pub fn registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses `environment` to substitute `{{NAME}}` config entries.
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Loads a document from disk and builds its handlers.
    pub fn load(self, path: impl AsRef<Path>) -> Result<Workflow, WorkflowError> {
        let descriptor = document::load(path)?;
        Ok(self.build(descriptor))
    }

    /// Parses an in-memory document and builds its handlers.
    pub fn parse(self, source: &str) -> Result<Workflow, WorkflowError> {
        let descriptor = document::parse(source)?;
        Ok(self.build(descriptor))
    }

    /// Builds handlers for an existing descriptor.
    pub fn build(self, descriptor: WorkflowDescriptor) -> Workflow {
        let registry = self
            .registry
            .unwrap_or_else(HandlerRegistry::with_builtin_handlers);
        let environment = self.environment.unwrap_or_else(Environment::from_process);

        let handlers = registry.build(&descriptor, &environment);
        Workflow::new(descriptor, handlers)
    }
}
