//! Handler registration and per-step instantiation.

use crate::document::{ConfigEntry, StepDescriptor, WorkflowDescriptor};
use autoreach_core::{
    Binding, ConstructHandler, Environment, Handler, HandlerConfig, HandlerError, HandlerName,
    StepId, WorkflowError,
};
use heck::ToSnakeCase;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

type Factory = Box<dyn Fn(&HandlerConfig) -> Result<Box<dyn Handler>, HandlerError> + Send + Sync>;

struct Registration {
    name: HandlerName,
    factory: Factory,
}

/// Maps handler names to constructors.
///
/// Names are matched by their snake_case key, so a document may write either
/// `ScoringAgent` or `scoring_agent`.
///
/// # Examples
///
/// ```
/// use autoreach::HandlerRegistry;
///
/// let registry = HandlerRegistry::with_builtin_handlers();
/// assert!(registry.contains("ProspectSearchAgent"));
/// assert!(registry.contains("feedback_trainer_agent"));
/// assert!(!registry.contains("MissingAgent"));
/// ```
#[derive(Default)]
pub struct HandlerRegistry {
    registrations: HashMap<String, Registration>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self
            .registrations
            .values()
            .map(|r| r.name.as_str())
            .collect();
        names.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

/// Derives the registry key of a handler name: CamelCase is split on case
/// transitions and joined with underscores in lower case.
///
/// ```
/// assert_eq!(autoreach::lookup_key("OutreachContentAgent"), "outreach_content_agent");
/// ```
pub fn lookup_key(name: &str) -> String {
    name.trim().to_snake_case()
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in outreach handlers.
    pub fn with_builtin_handlers() -> Self {
        let mut registry = Self::new();
        crate::handlers::register_builtin(&mut registry);
        registry
    }

    /// Registers a handler type under its type name.
    pub fn register<H: ConstructHandler>(&mut self) -> &mut Self {
        self.register_factory(H::handler_name(), |config| {
            H::construct(config).map(|handler| Box::new(handler) as Box<dyn Handler>)
        })
    }

    /// Registers an explicit constructor under `name`, replacing any previous
    /// registration with the same key.
    pub fn register_factory<F>(&mut self, name: impl Into<HandlerName>, factory: F) -> &mut Self
    where
        F: Fn(&HandlerConfig) -> Result<Box<dyn Handler>, HandlerError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.registrations.insert(
            lookup_key(name.as_str()),
            Registration {
                name,
                factory: Box::new(factory),
            },
        );
        self
    }

    /// Returns `true` if a handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.registrations.contains_key(&lookup_key(name))
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Constructs the handler for one step.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::UnknownHandler`] if the step's handler name is not registered
    /// - [`WorkflowError::MissingConfig`] listing every config key that resolved to nothing
    /// - [`WorkflowError::HandlerConstruction`] if the handler rejects its config
    pub fn instantiate(
        &self,
        step: &StepDescriptor,
        environment: &Environment,
    ) -> Result<Box<dyn Handler>, WorkflowError> {
        let registration = self
            .registrations
            .get(&lookup_key(step.handler.as_str()))
            .ok_or_else(|| WorkflowError::UnknownHandler {
                handler: step.handler.clone(),
                step_id: step.id.clone(),
            })?;

        let config = resolve_config(&step.config, environment);
        let missing = config.missing_keys();
        if !missing.is_empty() {
            return Err(WorkflowError::MissingConfig {
                handler: step.handler.clone(),
                step_id: step.id.clone(),
                keys: missing,
            });
        }

        let handler =
            (registration.factory)(&config).map_err(|e| WorkflowError::HandlerConstruction {
                handler: step.handler.clone(),
                step_id: step.id.clone(),
                details: e.to_string(),
            })?;

        info!(
            "Initialized handler: {} for step '{}' with config keys {:?}",
            registration.name,
            step.id,
            config.iter().map(|(k, _)| k).collect::<Vec<_>>()
        );
        Ok(handler)
    }

    /// Constructs one handler per step.
    ///
    /// A step whose handler cannot be built is logged and left without a
    /// handler; the remaining steps are still initialized.
    pub fn build(&self, workflow: &WorkflowDescriptor, environment: &Environment) -> HandlerSet {
        let mut set = HandlerSet::default();

        for step in workflow.steps() {
            match self.instantiate(step, environment) {
                Ok(handler) => {
                    set.handlers.insert(step.id.clone(), handler);
                }
                Err(e) => {
                    warn!(
                        "Error initializing handler '{}' (step '{}'): {}",
                        step.handler, step.id, e
                    );
                    set.errors.push(e);
                }
            }
        }

        set
    }
}

/// Substitutes `{{NAME}}` config entries from the environment.
///
/// Keys are lower-cased. An unset variable becomes `null`, which
/// [`HandlerRegistry::instantiate`] reports as missing.
pub fn resolve_config(entries: &[ConfigEntry], environment: &Environment) -> HandlerConfig {
    entries
        .iter()
        .map(|entry| {
            let value = match &entry.binding {
                Binding::Literal(value) => value.clone(),
                Binding::EnvRef(name) => environment
                    .get(name)
                    .map(|v| Value::String(v.to_string()))
                    .unwrap_or(Value::Null),
                Binding::StepRef { .. } => Value::Null,
            };
            (entry.key.as_str(), value)
        })
        .collect()
}

/// Handlers built for one run, keyed by step id.
#[derive(Default)]
pub struct HandlerSet {
    handlers: HashMap<StepId, Box<dyn Handler>>,
    errors: Vec<WorkflowError>,
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("steps", &self.handlers.keys().collect::<Vec<_>>())
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl HandlerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a handler to a step directly.
    pub fn insert(&mut self, step_id: impl Into<StepId>, handler: Box<dyn Handler>) {
        self.handlers.insert(step_id.into(), handler);
    }

    /// Returns the handler bound to a step.
    pub fn get(&self, step_id: &str) -> Option<&dyn Handler> {
        self.handlers.get(step_id).map(|h| &**h)
    }

    /// Errors raised while constructing handlers.
    pub fn errors(&self) -> &[WorkflowError] {
        &self.errors
    }

    /// Returns the number of constructed handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler was constructed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
