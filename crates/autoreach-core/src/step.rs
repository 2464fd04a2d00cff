//! Step identifiers and lifecycle state.

use std::fmt;

/// Type-safe step identifier.
///
/// Step ids are the lookup keys of the output table, so they must be unique
/// across a workflow document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(String);

impl StepId {
    /// Creates a new StepId.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the step id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Handler name as declared in a workflow document (`"agent"`), e.g.
/// `ProspectSearchAgent`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerName(String);

impl HandlerName {
    /// Creates a new HandlerName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a HandlerName from a type's name (extracts last segment).
    ///
    /// ```
    /// use autoreach_core::HandlerName;
    ///
    /// struct ScoringAgent;
    /// assert_eq!(HandlerName::from_type_name::<ScoringAgent>().as_str(), "ScoringAgent");
    /// ```
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let short_name = full_name.rsplit("::").next().unwrap_or(full_name);
        Self::new(short_name)
    }

    /// Returns the handler name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HandlerName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HandlerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for HandlerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle of a single step within one run.
///
/// `Pending -> ResolvingInputs -> Invoking -> {Completed | Failed}`. There is
/// no backward transition; `Failed` is terminal for the step only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    /// Not yet reached by the executor.
    #[default]
    Pending,
    /// Bindings are being materialized from the output table.
    ResolvingInputs,
    /// The handler's entry point is running.
    Invoking,
    /// The handler returned and its output was recorded.
    Completed,
    /// The handler was missing or returned an error; nothing was recorded.
    Failed,
}

impl StepState {
    /// Returns `true` for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Completed | StepState::Failed)
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::ResolvingInputs => write!(f, "resolving_inputs"),
            StepState::Invoking => write!(f, "invoking"),
            StepState::Completed => write!(f, "completed"),
            StepState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_id() {
        let id = StepId::new("prospect_search");
        assert_eq!(id.as_str(), "prospect_search");

        let id: StepId = "prospect_search".into();
        assert_eq!(id.to_string(), "prospect_search");
    }

    #[test]
    fn test_handler_name_from_type() {
        struct OutreachExecutorAgent;
        assert_eq!(
            HandlerName::from_type_name::<OutreachExecutorAgent>(),
            HandlerName::new("OutreachExecutorAgent")
        );
    }

    #[test]
    fn test_step_state() {
        assert_eq!(StepState::default(), StepState::Pending);
        assert!(StepState::Completed.is_terminal());
        assert!(StepState::Failed.is_terminal());
        assert!(!StepState::Invoking.is_terminal());
        assert_eq!(StepState::ResolvingInputs.to_string(), "resolving_inputs");
    }
}
