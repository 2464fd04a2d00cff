//! Email delivery through Brevo's transactional API.

use super::{base_url, http_client, records, text};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use chrono::Local;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

const BREVO_BASE_URL: &str = "https://api.brevo.com/v3";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_FROM_EMAIL: &str = "noreply@autoreach.io";
const SENDER_NAME: &str = "AutoReach";

/// Sends drafted messages and reports a per-message delivery status.
///
/// Input: `messages` (required). Output:
/// `{"sent_status": [...], "campaign_id": "autoreach_<timestamp>"}`.
#[derive(Debug)]
pub struct OutreachExecutorAgent {
    api_key: String,
    from_email: String,
    base_url: String,
    client: reqwest::Client,
}

impl ConstructHandler for OutreachExecutorAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            api_key: config.required("api_key")?,
            from_email: config
                .optional("from_email")?
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            base_url: base_url(config, BREVO_BASE_URL)?,
            client: http_client("brevo")?,
        })
    }
}

#[async_trait]
impl Handler for OutreachExecutorAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let messages: Vec<Value> = args.required("messages")?;
        let campaign_id = format!("autoreach_{}", Local::now().format("%Y%m%d_%H%M%S"));

        let mut sent_status = Vec::with_capacity(messages.len());
        for (idx, message) in records(messages).iter().enumerate() {
            sent_status.push(self.deliver(idx + 1, message, &campaign_id).await);
        }

        let sent = sent_status
            .iter()
            .filter(|status| status["status"] == "sent")
            .count();
        info!(
            "[OutreachExecutor] Campaign {}: {}/{} messages sent",
            campaign_id,
            sent,
            sent_status.len()
        );

        Ok(json!({ "sent_status": sent_status, "campaign_id": campaign_id }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

impl OutreachExecutorAgent {
    async fn deliver(&self, idx: usize, message: &Map<String, Value>, campaign_id: &str) -> Value {
        let lead = text(message, "lead").unwrap_or_default();
        let email = text(message, "email").unwrap_or_default();
        let subject = text(message, "subject").unwrap_or_default();
        let body = text(message, "email_body").unwrap_or_default();

        let payload = json!({
            "sender": {"name": SENDER_NAME, "email": self.from_email},
            "to": [{"email": email, "name": lead}],
            "subject": subject,
            "htmlContent": format!("<p>{}</p>", body.replace('\n', "<br>")),
            "tags": ["autoreach", campaign_id]
        });

        let (status, message_id, error) = match self.send(&payload).await {
            Ok(message_id) => ("sent", message_id, Value::Null),
            Err(e) => {
                warn!("[OutreachExecutor] Sending to {} failed: {}", email, e);
                ("failed", None, json!(e.to_string()))
            }
        };
        let message_id = message_id.unwrap_or_else(|| format!("msg_{idx}"));

        json!({
            "lead": lead,
            "email": email,
            "subject": subject,
            "campaign_id": campaign_id,
            "status": status,
            "message_id": message_id,
            "error": error,
        })
    }

    /// Returns the `messageId` assigned by Brevo, if any.
    async fn send(&self, payload: &Value) -> Result<Option<String>, HandlerError> {
        let request_error = |e: reqwest::Error| HandlerError::Request {
            service: "brevo",
            details: e.to_string(),
        };

        let data: Value = self
            .client
            .post(format!("{}/smtp/email", self.base_url))
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(payload)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?
            .json()
            .await
            .unwrap_or(Value::Null);

        Ok(data
            .get("messageId")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}
