//! # AutoReach
//!
//! A declarative workflow executor for outbound sales pipelines.
//!
//! A workflow document lists steps in order. Each step names a handler,
//! configures it from environment variables (`"{{APOLLO_API_KEY}}"`) and
//! wires its inputs to earlier outputs (`"{{prospect_search.output.leads}}"`).
//! Steps run sequentially; a failing step is recorded and the run continues.
//!
//! ## Features
//!
//! - **Static registry**: handlers register by type through [`ConstructHandler`]
//! - **Typed bindings**: references are parsed into [`Binding`]s when the document loads
//! - **Failure isolation**: one broken step never aborts the run
//! - **Built-in handlers**: prospect search, enrichment, scoring, drafting,
//!   sending, tracking and feedback, see [`handlers`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use autoreach::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), WorkflowError> {
//!     let workflow = Workflow::builder()
//!         .environment(Environment::from_process())
//!         .load("workflow.json")?;
//!
//!     let outputs = workflow.run().await;
//!     for failure in outputs.failures() {
//!         eprintln!("{failure}");
//!     }
//!     println!("{}", outputs.to_json());
//!     Ok(())
//! }
//! ```
//!
//! ## Custom Handlers
//!
//! ```rust,ignore
//! use autoreach::prelude::*;
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//!
//! #[derive(Debug)]
//! struct EchoAgent;
//!
//! impl ConstructHandler for EchoAgent {
//!     fn construct(_config: &HandlerConfig) -> Result<Self, HandlerError> {
//!         Ok(EchoAgent)
//!     }
//! }
//!
//! #[async_trait]
//! impl Handler for EchoAgent {
//!     async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
//!         let text: String = args.required("text")?;
//!         Ok(json!({ "echo": text }))
//!     }
//!
//!     fn name(&self) -> HandlerName {
//!         Self::handler_name()
//!     }
//! }
//!
//! let mut registry = HandlerRegistry::with_builtin_handlers();
//! registry.register::<EchoAgent>();
//! let workflow = Workflow::builder().registry(registry).load("workflow.json")?;
//! ```

mod document;
pub mod handlers;
mod registry;
mod resolver;
mod workflow;

// Re-export core types
pub use autoreach_core::*;

pub use document::{load, parse, ConfigEntry, StepDescriptor, WorkflowDescriptor};
pub use registry::{lookup_key, resolve_config, HandlerRegistry, HandlerSet};
pub use resolver::{resolve, resolve_inputs};
pub use workflow::{run, Workflow, WorkflowBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Arguments, Binding, ConstructHandler, Environment, Handler, HandlerConfig, HandlerError,
        HandlerName, HandlerRegistry, OutputTable, StepId, Workflow, WorkflowBuilder,
        WorkflowError,
    };
}
