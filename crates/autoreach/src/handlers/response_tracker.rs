//! Engagement tracking from Apollo campaign email activity.

use super::{base_url, http_client, text};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

const APOLLO_BASE_URL: &str = "https://api.apollo.io/v1";
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_CAMPAIGN_ID: &str = "autoreach_campaign_001";

/// Collects open, click and reply events for a campaign.
///
/// Input: `campaign_id`. Output: `{"responses": [...]}`, empty when no API
/// key is configured or the fetch fails.
#[derive(Debug)]
pub struct ResponseTrackerAgent {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl ConstructHandler for ResponseTrackerAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            api_key: config.optional("api_key")?,
            base_url: base_url(config, APOLLO_BASE_URL)?,
            client: http_client("apollo")?,
        })
    }
}

#[async_trait]
impl Handler for ResponseTrackerAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let campaign_id: String = args
            .optional("campaign_id")?
            .unwrap_or_else(|| DEFAULT_CAMPAIGN_ID.to_string());

        let Some(api_key) = self.api_key.as_deref() else {
            info!("[ResponseTracker] No Apollo API key provided, skipping {}", campaign_id);
            return Ok(json!({ "responses": [] }));
        };

        let responses: Vec<Value> = match self.fetch(api_key, &campaign_id).await {
            Ok(events) => events.iter().filter_map(Value::as_object).map(parse_event).collect(),
            Err(e) => {
                warn!("[ResponseTracker] {}", e);
                Vec::new()
            }
        };

        info!(
            "[ResponseTracker] Campaign {}: {} responses",
            campaign_id,
            responses.len()
        );
        Ok(json!({ "responses": responses }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

impl ResponseTrackerAgent {
    async fn fetch(&self, api_key: &str, campaign_id: &str) -> Result<Vec<Value>, HandlerError> {
        let request_error = |e: reqwest::Error| HandlerError::Request {
            service: "apollo",
            details: e.to_string(),
        };

        let data: Value = self
            .client
            .get(format!("{}/campaigns/{}/emails", self.base_url, campaign_id))
            .bearer_auth(api_key)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        match data.get("emails") {
            Some(Value::Array(events)) => Ok(events.clone()),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(other) => Err(HandlerError::UnexpectedResponse {
                service: "apollo",
                details: format!("'emails' is not a list: {other}"),
            }),
        }
    }
}

fn parse_event(event: &Map<String, Value>) -> Value {
    let flag = |key: &str| event.get(key).and_then(Value::as_bool).unwrap_or(false);

    json!({
        "lead": text(event, "contact_name")
            .or_else(|| text(event, "recipient"))
            .unwrap_or("Unknown"),
        "company": text(event, "account_name").unwrap_or("Unknown Company"),
        "email": text(event, "recipient_email").unwrap_or_default(),
        "opened": flag("opened"),
        "clicked": flag("clicked"),
        "replied": flag("replied"),
        "reply_text": event.get("reply_text").cloned().unwrap_or(Value::Null),
        "timestamp": text(event, "last_activity_at")
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
    })
}
