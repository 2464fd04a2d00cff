//! Workflow and handler error types.

use crate::step::{HandlerName, StepId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, building or running a workflow.
///
/// Document-level variants (`WorkflowNotFound`, `MalformedWorkflow`,
/// `InvalidStep`) abort a run before any step executes. The remaining
/// variants are reported per step and never stop the run.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WorkflowError {
    /// The workflow document does not exist.
    #[error("Workflow document not found: {}", .0.display())]
    WorkflowNotFound(PathBuf),

    /// The workflow document is not valid structured data.
    #[error("Malformed workflow document '{}': {details}", .path.display())]
    MalformedWorkflow {
        /// Path of the document.
        path: PathBuf,
        /// Parser message.
        details: String,
    },

    /// A step entry is structurally invalid.
    #[error("Invalid step at position {position}: {details}")]
    InvalidStep {
        /// 0-based position of the step in the document.
        position: usize,
        /// What is wrong with the entry.
        details: String,
    },

    /// No handler is registered under the declared name.
    #[error("Unknown handler '{handler}' in step '{step_id}'")]
    UnknownHandler {
        /// Declared handler name.
        handler: HandlerName,
        /// Step that declared it.
        step_id: StepId,
    },

    /// One or more config values resolved to nothing.
    #[error("Missing environment values for handler '{handler}' in step '{step_id}': {}", .keys.join(", "))]
    MissingConfig {
        /// Handler being constructed.
        handler: HandlerName,
        /// Step being constructed.
        step_id: StepId,
        /// Every missing key, in declaration order.
        keys: Vec<String>,
    },

    /// The handler rejected its resolved configuration.
    #[error("Failed to construct handler '{handler}' in step '{step_id}': {details}")]
    HandlerConstruction {
        /// Handler being constructed.
        handler: HandlerName,
        /// Step being constructed.
        step_id: StepId,
        /// Constructor message.
        details: String,
    },

    /// A step's handler was unavailable or its entry point failed.
    #[error("Error running step {step_id}: {details}")]
    StepExecution {
        /// The failed step.
        step_id: StepId,
        /// Details about the failure.
        details: String,
    },
}

impl WorkflowError {
    /// Returns `true` for errors that abort a run before any step executes.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkflowError::WorkflowNotFound(_)
                | WorkflowError::MalformedWorkflow { .. }
                | WorkflowError::InvalidStep { .. }
        )
    }

    /// Returns the step this error belongs to, if any.
    pub fn step_id(&self) -> Option<&StepId> {
        match self {
            WorkflowError::UnknownHandler { step_id, .. }
            | WorkflowError::MissingConfig { step_id, .. }
            | WorkflowError::HandlerConstruction { step_id, .. }
            | WorkflowError::StepExecution { step_id, .. } => Some(step_id),
            _ => None,
        }
    }
}

/// Errors returned by a handler's constructor or entry point.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// A required argument was absent or null.
    #[error("missing required argument '{0}'")]
    MissingArgument(String),

    /// An argument had the wrong shape.
    #[error("invalid argument '{name}': {details}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Deserialization message.
        details: String,
    },

    /// A config parameter was absent or had the wrong shape.
    #[error("invalid config '{key}': {details}")]
    InvalidConfig {
        /// Config key (lower-cased).
        key: String,
        /// What is wrong with it.
        details: String,
    },

    /// A call to an external service failed.
    #[error("{service} request failed: {details}")]
    Request {
        /// Service name, e.g. `brevo`.
        service: &'static str,
        /// Transport or status message.
        details: String,
    },

    /// An external service answered with something unexpected.
    #[error("unexpected {service} response: {details}")]
    UnexpectedResponse {
        /// Service name.
        service: &'static str,
        /// What was unexpected.
        details: String,
    },
}
