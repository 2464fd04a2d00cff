//! Personalized email drafting through OpenRouter chat completions.

use super::{base_url, http_client, records, samples, text};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{info, warn};

const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat-v3.1:free";
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(20);
const SYSTEM_PROMPT: &str = "You are an SDR writing concise, personalized outreach emails. \
Keep emails under 150 words. Be friendly, professional, and specific.";

/// Drafts one outreach email per ranked lead.
///
/// Inputs: `ranked_leads`, `persona` (default `SDR`), `tone` (default
/// `friendly`). Output: `{"messages": [...]}`. A failed completion does not
/// fail the step; the error text becomes the message body.
#[derive(Debug)]
pub struct OutreachContentAgent {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl ConstructHandler for OutreachContentAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            api_key: config.required("api_key")?,
            model: config
                .optional("model")?
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: base_url(config, OPENROUTER_BASE_URL)?,
            client: http_client("openrouter")?,
        })
    }
}

#[async_trait]
impl Handler for OutreachContentAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let mut leads: Vec<Value> = args.optional("ranked_leads")?.unwrap_or_default();
        if leads.is_empty() {
            leads = samples::ranked_leads();
        }
        let persona: String = args.optional("persona")?.unwrap_or_else(|| "SDR".into());
        let tone: String = args.optional("tone")?.unwrap_or_else(|| "friendly".into());

        let mut messages = Vec::with_capacity(leads.len());
        for lead in records(leads) {
            messages.push(self.draft(&lead, &persona, &tone).await);
        }

        info!("[OutreachContent] Drafted {} messages", messages.len());
        Ok(json!({ "messages": messages }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

impl OutreachContentAgent {
    async fn draft(&self, lead: &Map<String, Value>, persona: &str, tone: &str) -> Value {
        let contact = text(lead, "contact")
            .or_else(|| text(lead, "contact_name"))
            .unwrap_or("there");
        let company = text(lead, "company").unwrap_or("your company");
        let role = text(lead, "role").unwrap_or("decision maker");
        let tech = lead
            .get("technologies")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let prompt = format!(
            "Write a short {tone} outreach email to {contact} at {company}. \
They are a {role} and their company uses: {tech}. \
Mention one specific way we can help their team. \
Sign off professionally as {persona}. Keep it under 120 words. No subject line needed."
        );

        let body = self.complete(&prompt).await.unwrap_or_else(|error| {
            warn!("[OutreachContent] Drafting for {} failed: {}", contact, error);
            error
        });

        json!({
            "lead": contact,
            "company": company,
            "email": guess_address(contact, company),
            "subject": format!("Quick idea for {company}"),
            "email_body": body,
            "score": lead.get("score").or_else(|| lead.get("total_score")).cloned().unwrap_or(json!(0)),
        })
    }

    /// Runs one completion. The error side is the text substituted for the
    /// email body.
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": 500,
            "temperature": 0.7
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", "https://autoreach.local")
            .header("X-Title", "AutoReach")
            .json(&payload)
            .timeout(COMPLETION_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                if e.is_timeout() {
                    "[Error generating email: Request timeout]".to_string()
                } else {
                    format!("[Error generating email: {e}]")
                }
            })?;

        let data: Value = response
            .json()
            .await
            .map_err(|e| format!("[Error parsing response: {e}]"))?;

        data.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                "[Error parsing response: missing choices[0].message.content]".to_string()
            })
    }
}

fn guess_address(contact: &str, company: &str) -> String {
    format!(
        "{}@{}.com",
        contact.to_lowercase().replace(' ', "."),
        company.to_lowercase().replace(' ', "")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn agent(base: &str) -> OutreachContentAgent {
        let config: HandlerConfig = [("API_KEY", json!("or-1")), ("base_url", json!(base))]
            .into_iter()
            .collect();
        OutreachContentAgent::construct(&config).expect("valid config")
    }

    #[test]
    fn test_api_key_is_required() {
        let error = OutreachContentAgent::construct(&HandlerConfig::new()).unwrap_err();
        assert!(matches!(error, HandlerError::InvalidConfig { ref key, .. } if key == "api_key"));
    }

    #[test]
    fn test_guess_address() {
        assert_eq!(guess_address("Jane Doe", "Example Corp"), "jane.doe@examplecorp.com");
    }

    #[tokio::test]
    async fn test_drafts_from_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer or-1"))
            .and(header("X-Title", "AutoReach"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "  Hi Sam, ...  "}}]
            })))
            .mount(&server)
            .await;

        let args: Arguments = [(
            "ranked_leads",
            json!([{"contact_name": "Sam Lee", "company": "Acme", "role": "VP of Sales", "total_score": 0.9}]),
        )]
        .into_iter()
        .collect();

        let output = agent(&server.uri())
            .invoke(args)
            .await
            .expect("drafting succeeds");

        assert_eq!(
            output["messages"],
            json!([{
                "lead": "Sam Lee",
                "company": "Acme",
                "email": "sam.lee@acme.com",
                "subject": "Quick idea for Acme",
                "email_body": "Hi Sam, ...",
                "score": 0.9
            }])
        );
    }

    #[tokio::test]
    async fn test_failed_completion_becomes_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let output = agent(&server.uri())
            .invoke(Arguments::new())
            .await
            .expect("step still succeeds");

        let messages = output["messages"].as_array().expect("messages list");
        assert_eq!(messages.len(), 2);
        let body = messages[0]["email_body"].as_str().expect("body");
        assert!(body.starts_with("[Error generating email:"), "{body}");
        assert_eq!(messages[0]["score"], 0.85);
    }

    #[tokio::test]
    async fn test_unparseable_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let args: Arguments = [("ranked_leads", json!([{"company": "Acme"}]))]
            .into_iter()
            .collect();
        let output = agent(&server.uri()).invoke(args).await.expect("step succeeds");

        let message = &output["messages"][0];
        assert_eq!(message["lead"], "there");
        assert!(message["email_body"]
            .as_str()
            .is_some_and(|body| body.starts_with("[Error parsing response:")));
    }
}
