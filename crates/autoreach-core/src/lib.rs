//! Core traits and types for the autoreach workflow engine.
//!
//! This crate provides minimal abstractions without runtime dependencies.
//! Handler authors should depend on this crate to implement custom handlers.
//!
//! # Core Types
//!
//! - [`Handler`] - The entry point every workflow step invokes
//! - [`ConstructHandler`] - Builds a handler from a step's resolved config
//! - [`Binding`] - A parsed config or input value (literal or `{{...}}` reference)
//! - [`OutputTable`] - Step outputs accumulated during one run
//! - [`Environment`] - Snapshot of process configuration used by `{{NAME}}` tokens
//! - [`WorkflowError`] / [`HandlerError`] - Error types

mod args;
mod binding;
mod context;
mod error;
mod step;
mod traits;

pub use args::{Arguments, HandlerConfig};
pub use binding::{Binding, InvalidBinding};
pub use context::{Environment, OutputTable};
pub use error::{HandlerError, WorkflowError};
pub use step::{HandlerName, StepId, StepState};
pub use traits::{ConstructHandler, Handler};
