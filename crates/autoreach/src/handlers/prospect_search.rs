//! Prospect search against Apollo's contact search.

use super::{base_url, http_client, samples, text};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

const APOLLO_BASE_URL: &str = "https://api.apollo.io/v1";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const TARGET_TITLES: [&str; 5] = [
    "Sales Manager",
    "Sales Executive",
    "VP of Sales",
    "Director of Sales",
    "Head of Growth",
];

/// Finds contacts matching an ideal customer profile.
///
/// Inputs: `icp` (object), `signals` (list of strings).
/// Output: `{"leads": [...]}`. Without an API key, or when the search fails
/// or finds nobody, placeholder leads are returned instead.
#[derive(Debug)]
pub struct ProspectSearchAgent {
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl ConstructHandler for ProspectSearchAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self {
            api_key: config.optional("api_key")?,
            base_url: base_url(config, APOLLO_BASE_URL)?,
            client: http_client("apollo")?,
        })
    }
}

#[async_trait]
impl Handler for ProspectSearchAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let icp: Value = args.optional("icp")?.unwrap_or_else(samples::default_icp);
        let signals: Vec<String> = args
            .optional("signals")?
            .unwrap_or_else(samples::default_signals);

        match &self.api_key {
            Some(api_key) => {
                info!("[ProspectSearch] Searching Apollo API with ICP: {}", icp);
                match self.search(api_key, &icp).await {
                    Ok(leads) if !leads.is_empty() => {
                        info!("[ProspectSearch] Found {} leads from Apollo", leads.len());
                        return Ok(json!({ "leads": leads }));
                    }
                    Ok(_) => info!("[ProspectSearch] No leads found from Apollo, using fallback data"),
                    Err(e) => warn!("[ProspectSearch] {}; using fallback data", e),
                }
            }
            None => info!("[ProspectSearch] No Apollo API key provided, using fallback data"),
        }

        debug!("buying signals {:?} are not sent to Apollo", signals);
        Ok(json!({ "leads": samples::prospect_leads() }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

impl ProspectSearchAgent {
    async fn search(&self, api_key: &str, icp: &Value) -> Result<Vec<Value>, HandlerError> {
        let payload = search_payload(icp);
        let request_error = |e: reqwest::Error| HandlerError::Request {
            service: "apollo",
            details: e.to_string(),
        };

        let data: Value = self
            .client
            .post(format!("{}/contacts/search", self.base_url))
            .header("X-Api-Key", api_key)
            .json(&payload)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(request_error)?
            .json()
            .await
            .map_err(request_error)?;

        let contacts = data
            .get("contacts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(contacts
            .iter()
            .filter_map(Value::as_object)
            .map(contact_to_lead)
            .collect())
    }
}

fn search_payload(icp: &Value) -> Value {
    let industry = icp.get("industry").and_then(Value::as_str).unwrap_or("SaaS");
    let location = icp
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or("United States");

    let mut payload = json!({
        "q_organization_industry": industry,
        "organization_locations": [location],
        "person_titles": TARGET_TITLES,
        "per_page": 10,
        "page": 1
    });

    let employees = icp.get("employee_count");
    let bound = |key: &str, default: i64| {
        employees
            .and_then(|range| range.get(key))
            .and_then(Value::as_i64)
            .unwrap_or(default)
    };
    let (min, max) = (bound("min", 100), bound("max", 1000));
    if min != 0 && max != 0 {
        payload["q_organization_employee_count_range"] = json!(format!("{min}-{max}"));
    }

    payload
}

fn contact_to_lead(contact: &Map<String, Value>) -> Value {
    let empty = Map::new();
    let organization = contact
        .get("organization")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let contact_name = format!(
        "{} {}",
        text(contact, "first_name").unwrap_or_default(),
        text(contact, "last_name").unwrap_or_default()
    )
    .trim()
    .to_string();

    let location = organization
        .get("locations")
        .and_then(Value::as_array)
        .and_then(|locations| locations.first())
        .and_then(|first| first.get("city"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    json!({
        "company": text(organization, "name").unwrap_or("Unknown"),
        "contact_name": contact_name,
        "email": text(contact, "email").unwrap_or_default(),
        "linkedin": text(contact, "linkedin_url").unwrap_or_default(),
        "signal": "apollo_search",
        "industry": text(organization, "industry").unwrap_or_default(),
        "location": location,
        "employee_count": organization.get("employee_count").cloned().unwrap_or(Value::Null),
        "revenue": organization.get("annual_revenue").cloned().unwrap_or(Value::Null),
        "apollo_id": contact.get("id").cloned().unwrap_or(Value::Null),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn agent(api_key: Option<&str>, base: &str) -> ProspectSearchAgent {
        let mut config = HandlerConfig::new();
        if let Some(key) = api_key {
            config.insert("api_key", json!(key));
        }
        config.insert("base_url", json!(base));
        ProspectSearchAgent::construct(&config).expect("valid config")
    }

    #[test]
    fn test_search_payload_defaults() {
        let payload = search_payload(&json!({}));
        assert_eq!(payload["q_organization_industry"], "SaaS");
        assert_eq!(payload["organization_locations"], json!(["United States"]));
        assert_eq!(payload["q_organization_employee_count_range"], "100-1000");
        assert_eq!(payload["person_titles"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn test_zero_employee_bound_omits_range() {
        let payload = search_payload(&json!({"employee_count": {"min": 0, "max": 50}}));
        assert!(payload.get("q_organization_employee_count_range").is_none());
    }

    #[tokio::test]
    async fn test_fallback_without_api_key() {
        let output = agent(None, "http://127.0.0.1:9")
            .invoke(Arguments::new())
            .await
            .expect("fallback succeeds");
        let leads = output["leads"].as_array().expect("leads list");
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0]["company"], "ExampleCorp");
    }

    #[tokio::test]
    async fn test_maps_apollo_contacts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contacts/search"))
            .and(header("X-Api-Key", "k1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contacts": [{
                    "id": "c-9",
                    "first_name": "Sam",
                    "last_name": "Lee",
                    "email": "sam@acme.io",
                    "linkedin_url": "https://linkedin.com/in/samlee",
                    "organization": {
                        "name": "Acme",
                        "industry": "SaaS",
                        "locations": [{"city": "Denver"}],
                        "employee_count": 300,
                        "annual_revenue": 42000000
                    }
                }]
            })))
            .mount(&server)
            .await;

        let output = agent(Some("k1"), &server.uri())
            .invoke(Arguments::new())
            .await
            .expect("search succeeds");

        assert_eq!(
            output["leads"],
            json!([{
                "company": "Acme",
                "contact_name": "Sam Lee",
                "email": "sam@acme.io",
                "linkedin": "https://linkedin.com/in/samlee",
                "signal": "apollo_search",
                "industry": "SaaS",
                "location": "Denver",
                "employee_count": 300,
                "revenue": 42000000,
                "apollo_id": "c-9"
            }])
        );
    }

    #[tokio::test]
    async fn test_apollo_error_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let output = agent(Some("k1"), &server.uri())
            .invoke(Arguments::new())
            .await
            .expect("fallback succeeds");
        assert_eq!(output["leads"][1]["company"], "TestCo");
    }
}
