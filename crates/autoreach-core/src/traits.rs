//! The handler contract.

use crate::args::{Arguments, HandlerConfig};
use crate::error::HandlerError;
use crate::step::HandlerName;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

/// A component invoked by a workflow step.
///
/// A handler exposes exactly one entry point. It receives the step's resolved
/// inputs as named arguments and returns either a mapping or a sequence of
/// records; the returned value is stored verbatim in the output table.
///
/// Handlers are never invoked concurrently by the executor.
///
/// # Examples
///
/// ```
/// use autoreach_core::{Arguments, Handler, HandlerError, HandlerName};
/// use async_trait::async_trait;
/// use serde_json::{json, Value};
///
/// #[derive(Debug)]
/// struct EchoAgent;
///
/// #[async_trait]
/// impl Handler for EchoAgent {
///     async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
///         let leads: Vec<Value> = args.optional("leads")?.unwrap_or_default();
///         Ok(json!({ "leads": leads }))
///     }
///
///     fn name(&self) -> HandlerName {
///         HandlerName::new("EchoAgent")
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + Debug {
    /// Runs the handler with the step's resolved inputs.
    ///
    /// Arguments the handler does not read are ignored.
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError>;

    /// Returns the handler name.
    fn name(&self) -> HandlerName;
}

/// A handler type that can be built from a step's resolved configuration.
///
/// Registering a `ConstructHandler` derives the registry key from the type
/// name, so `ProspectSearchAgent` is reachable as `"ProspectSearchAgent"`
/// (or `"prospect_search_agent"`) in a workflow document.
pub trait ConstructHandler: Handler + Sized + 'static {
    /// Builds the handler. `config` never contains null values.
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError>;

    /// Returns the name this type is registered under.
    fn handler_name() -> HandlerName {
        HandlerName::from_type_name::<Self>()
    }
}
