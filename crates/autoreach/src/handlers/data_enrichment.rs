//! Lead enrichment: role lookup through Hunter, seniority and tech stack.

use super::{base_url, http_client, records, samples, text};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::warn;

const HUNTER_BASE_URL: &str = "https://api.hunter.io/v2";
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);
const INITIAL_ENGAGEMENT: f64 = 0.75;

/// Adds role, seniority, technologies and a base engagement score to leads.
#[derive(Debug)]
pub struct DataEnrichmentAgent {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl ConstructHandler for DataEnrichmentAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            api_key: config.optional("api_key")?,
            base_url: base_url(config, HUNTER_BASE_URL)?,
            client: http_client("hunter")?,
        })
    }
}

#[async_trait]
impl Handler for DataEnrichmentAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let mut leads: Vec<Value> = args.optional("leads")?.unwrap_or_default();
        if leads.is_empty() {
            leads = samples::enrichment_leads();
        }

        let mut enriched_leads = Vec::with_capacity(leads.len());
        for lead in records(leads) {
            enriched_leads.push(self.enrich(&lead).await);
        }

        Ok(json!({ "enriched_leads": enriched_leads }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

impl DataEnrichmentAgent {
    async fn enrich(&self, lead: &Map<String, Value>) -> Value {
        let company = text(lead, "company").unwrap_or("Unknown");
        let name = text(lead, "contact_name").unwrap_or("John Doe");
        let email = text(lead, "email").unwrap_or_default();
        let linkedin = text(lead, "linkedin").unwrap_or_default();

        let mut role = None;
        if let Some(api_key) = self.api_key.as_deref() {
            if !email.is_empty() {
                role = self.fetch_role(api_key, email).await;
            }
        }
        let role = role.unwrap_or_else(|| guess_role(email, name).to_string());

        json!({
            "company": company,
            "contact_name": name,
            "email": email,
            "linkedin": linkedin,
            "role": role,
            "technologies": samples::tech_stack(company),
            "seniority_level": seniority(&role),
            "engagement_score": INITIAL_ENGAGEMENT,
        })
    }

    /// Looks up the position registered for `email`. Any failure is logged
    /// and treated as unknown.
    async fn fetch_role(&self, api_key: &str, email: &str) -> Option<String> {
        let response = self
            .client
            .get(format!("{}/email-finder", self.base_url))
            .query(&[("email", email), ("api_key", api_key)])
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await;

        let response = match response {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Hunter.io lookup for {} returned {}", email, response.status());
                return None;
            }
            Err(e) => {
                warn!("Hunter.io lookup failed for {}: {}", email, e);
                return None;
            }
        };

        match response.json::<Value>().await {
            Ok(data) => data
                .pointer("/data/position")
                .and_then(Value::as_str)
                .filter(|position| !position.is_empty())
                .map(str::to_string),
            Err(e) => {
                warn!("Hunter.io lookup failed for {}: {}", email, e);
                None
            }
        }
    }
}

fn guess_role(email: &str, name: &str) -> &'static str {
    let email = email.to_lowercase();
    let name = name.to_lowercase();
    let mentions = |needle: &str| email.contains(needle) || name.contains(needle);

    if mentions("vp") {
        "VP of Sales"
    } else if mentions("director") {
        "Director of Sales"
    } else if mentions("manager") {
        "Sales Manager"
    } else {
        "Sales Executive"
    }
}

fn seniority(role: &str) -> &'static str {
    let role = role.to_lowercase();
    if ["vp", "chief", "head"].iter().any(|k| role.contains(k)) {
        "executive"
    } else if role.contains("director") {
        "senior"
    } else {
        "mid"
    }
}
