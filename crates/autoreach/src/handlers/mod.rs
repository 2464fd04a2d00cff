//! Built-in outreach handlers.
//!
//! Each handler wraps one external service (or one business rule) and is
//! registered under its type name. Base URLs are configurable through a
//! `base_url` config parameter so the handlers can be pointed at a test
//! server.

mod data_enrichment;
mod feedback_trainer;
mod outreach_content;
mod outreach_executor;
mod prospect_search;
mod response_tracker;
mod samples;
mod scoring;

pub use data_enrichment::DataEnrichmentAgent;
pub use feedback_trainer::{FeedbackSheet, FeedbackTrainerAgent};
pub use outreach_content::OutreachContentAgent;
pub use outreach_executor::OutreachExecutorAgent;
pub use prospect_search::ProspectSearchAgent;
pub use response_tracker::ResponseTrackerAgent;
pub use scoring::{ScoringAgent, ScoringCriteria};

use crate::registry::HandlerRegistry;
use autoreach_core::{HandlerConfig, HandlerError};
use serde_json::{Map, Value};

/// Registers every built-in handler.
pub fn register_builtin(registry: &mut HandlerRegistry) {
    registry
        .register::<ProspectSearchAgent>()
        .register::<DataEnrichmentAgent>()
        .register::<ScoringAgent>()
        .register::<OutreachContentAgent>()
        .register::<OutreachExecutorAgent>()
        .register::<ResponseTrackerAgent>()
        .register::<FeedbackTrainerAgent>();
}

fn http_client(service: &'static str) -> Result<reqwest::Client, HandlerError> {
    reqwest::Client::builder()
        .user_agent(concat!("autoreach/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| HandlerError::Request {
            service,
            details: e.to_string(),
        })
}

fn base_url(config: &HandlerConfig, default: &str) -> Result<String, HandlerError> {
    let url: String = config
        .optional("base_url")?
        .unwrap_or_else(|| default.to_string());
    Ok(url.trim_end_matches('/').to_string())
}

/// Reads a string field of a JSON record, treating `null` and empty strings
/// as absent.
fn text<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Converts a list of JSON values into records, skipping non-objects.
fn records(values: Vec<Value>) -> Vec<Map<String, Value>> {
    values
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
