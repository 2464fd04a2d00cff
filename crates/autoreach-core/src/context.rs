//! Run state shared between the executor and the reference resolver.

use crate::error::WorkflowError;
use crate::step::{StepId, StepState};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::time::Instant;

/// Read-only snapshot of process-wide configuration.
///
/// Taken once per run and passed explicitly to the handler registry, so
/// tests can inject a fake environment.
///
/// # Examples
///
/// ```
/// use autoreach_core::Environment;
///
/// let env = Environment::from_pairs([("APOLLO_API_KEY", "k1")]);
/// assert_eq!(env.get("APOLLO_API_KEY"), Some("k1"));
/// assert_eq!(env.get("HUNTER_API_KEY"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        Self {
            vars: pairs
                .into_iter()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        }
    }

    /// Builds an environment from name/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value for `name`, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Returns the number of variables in the snapshot.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if the snapshot holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Outputs recorded during one workflow run, keyed by step id.
///
/// Entries are written in step-declaration order and never replaced or
/// removed. A step that failed has no entry; its error is kept in
/// [`OutputTable::failures`].
///
/// # Examples
///
/// ```
/// use autoreach_core::OutputTable;
/// use serde_json::json;
///
/// let mut table = OutputTable::new();
/// assert!(table.record("prospect_search", json!({"leads": []})));
/// assert!(!table.record("prospect_search", json!({"leads": [1]})));
///
/// assert_eq!(table.get("prospect_search"), Some(&json!({"leads": []})));
/// assert_eq!(table.get("scoring"), None);
/// ```
pub struct OutputTable {
    outputs: IndexMap<StepId, Value>,
    states: IndexMap<StepId, StepState>,
    failures: Vec<WorkflowError>,
    started_at: Instant,
}

impl fmt::Debug for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputTable")
            .field("steps", &self.outputs.keys().collect::<Vec<_>>())
            .field("failures", &self.failures.len())
            .field("started_at", &self.started_at)
            .finish()
    }
}

impl Default for OutputTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            outputs: IndexMap::new(),
            states: IndexMap::new(),
            failures: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Records a step's output.
    ///
    /// Returns `false` and leaves the table unchanged if the step already has
    /// an entry.
    pub fn record(&mut self, step_id: impl Into<StepId>, output: Value) -> bool {
        let step_id = step_id.into();
        if self.outputs.contains_key(&step_id) {
            return false;
        }
        self.states.insert(step_id.clone(), StepState::Completed);
        self.outputs.insert(step_id, output);
        true
    }

    /// Records a failed step. No output entry is written.
    ///
    /// Returns `false` and leaves the table unchanged if the step already
    /// completed.
    pub fn record_failure(&mut self, step_id: impl Into<StepId>, error: WorkflowError) -> bool {
        let step_id = step_id.into();
        if self.outputs.contains_key(&step_id) {
            return false;
        }
        self.states.insert(step_id, StepState::Failed);
        self.failures.push(error);
        true
    }

    /// Moves a step to a non-terminal state.
    ///
    /// Returns `false` if `state` is terminal or the step already reached a
    /// terminal state; use [`record`](Self::record) and
    /// [`record_failure`](Self::record_failure) to finish a step.
    pub fn transition(&mut self, step_id: &StepId, state: StepState) -> bool {
        if state.is_terminal() || self.state(step_id.as_str()).is_terminal() {
            return false;
        }
        self.states.insert(step_id.clone(), state);
        true
    }

    /// Returns the recorded output of a step.
    pub fn get(&self, step_id: &str) -> Option<&Value> {
        self.outputs.get(step_id)
    }

    /// Returns `true` if the step has a recorded output.
    pub fn contains(&self, step_id: &str) -> bool {
        self.outputs.contains_key(step_id)
    }

    /// Returns the last known state of a step, `Pending` if never reached.
    pub fn state(&self, step_id: &str) -> StepState {
        self.states.get(step_id).copied().unwrap_or_default()
    }

    /// Iterates recorded outputs in the order they were written.
    pub fn iter(&self) -> impl Iterator<Item = (&StepId, &Value)> {
        self.outputs.iter()
    }

    /// Returns the recorded step ids in the order they were written.
    pub fn step_ids(&self) -> impl Iterator<Item = &StepId> {
        self.outputs.keys()
    }

    /// Errors observed while running steps.
    pub fn failures(&self) -> &[WorkflowError] {
        &self.failures
    }

    /// Returns the number of recorded outputs.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns `true` if no output has been recorded.
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// Returns the time elapsed since the table was created.
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Converts the recorded outputs into a JSON object keyed by step id.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.outputs
                .iter()
                .map(|(id, output)| (id.to_string(), output.clone()))
                .collect(),
        )
    }
}
