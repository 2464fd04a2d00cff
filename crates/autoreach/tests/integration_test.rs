use async_trait::async_trait;
use autoreach::prelude::*;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug)]
struct ProducerAgent;

impl ConstructHandler for ProducerAgent {
    fn construct(_config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(ProducerAgent)
    }
}

#[async_trait]
impl Handler for ProducerAgent {
    async fn invoke(&self, _args: Arguments) -> Result<Value, HandlerError> {
        Ok(json!({"leads": [{"id": 1}]}))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

#[derive(Debug)]
struct ListAgent;

impl ConstructHandler for ListAgent {
    fn construct(_config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(ListAgent)
    }
}

#[async_trait]
impl Handler for ListAgent {
    async fn invoke(&self, _args: Arguments) -> Result<Value, HandlerError> {
        Ok(json!([{"id": 1}, {"id": 2}]))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

#[derive(Debug)]
struct BrokenAgent;

impl ConstructHandler for BrokenAgent {
    fn construct(_config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(BrokenAgent)
    }
}

#[async_trait]
impl Handler for BrokenAgent {
    async fn invoke(&self, _args: Arguments) -> Result<Value, HandlerError> {
        Err(HandlerError::UnexpectedResponse {
            service: "test",
            details: "boom".to_string(),
        })
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

/// Echoes back whatever it received as `items`.
#[derive(Debug)]
struct ItemsProbeAgent;

impl ConstructHandler for ItemsProbeAgent {
    fn construct(_config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(ItemsProbeAgent)
    }
}

#[async_trait]
impl Handler for ItemsProbeAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        Ok(json!({ "items": args.get("items").cloned().unwrap_or(Value::Null) }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

/// Reports the api key it was constructed with.
#[derive(Debug)]
struct KeyProbeAgent {
    api_key: String,
}

impl ConstructHandler for KeyProbeAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(KeyProbeAgent {
            api_key: config.required("api_key")?,
        })
    }
}

#[async_trait]
impl Handler for KeyProbeAgent {
    async fn invoke(&self, _args: Arguments) -> Result<Value, HandlerError> {
        Ok(json!({ "api_key": self.api_key }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

fn test_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry
        .register::<ProducerAgent>()
        .register::<ListAgent>()
        .register::<BrokenAgent>()
        .register::<ItemsProbeAgent>()
        .register::<KeyProbeAgent>();
    registry
}

fn two_step_document(producer: &str, reference: &str) -> String {
    json!({
        "workflow_name": "two steps",
        "steps": [
            {"id": "a", "agent": producer},
            {"id": "b", "agent": "ItemsProbeAgent", "inputs": {"items": reference}}
        ]
    })
    .to_string()
}

#[tokio::test]
async fn test_output_flows_to_next_step() {
    let workflow = Workflow::builder()
        .registry(test_registry())
        .environment(Environment::new())
        .parse(&two_step_document("ProducerAgent", "{{a.output.leads}}"))
        .expect("valid workflow");

    let outputs = workflow.run().await;

    assert!(outputs.failures().is_empty());
    assert_eq!(outputs.get("a"), Some(&json!({"leads": [{"id": 1}]})));
    assert_eq!(outputs.get("b"), Some(&json!({"items": [{"id": 1}]})));
    assert_eq!(
        outputs.step_ids().map(StepId::as_str).collect::<Vec<_>>(),
        vec!["a", "b"]
    );
}

#[tokio::test]
async fn test_failed_step_is_isolated() {
    let workflow = Workflow::builder()
        .registry(test_registry())
        .environment(Environment::new())
        .parse(&two_step_document("BrokenAgent", "{{a.output.leads}}"))
        .expect("valid workflow");

    let outputs = workflow.run().await;

    assert!(!outputs.contains("a"));
    assert_eq!(outputs.get("b"), Some(&json!({"items": null})));
    assert_eq!(outputs.failures().len(), 1);
    assert_eq!(
        outputs.failures()[0].to_string(),
        "Error running step a: unexpected test response: boom"
    );
}

#[tokio::test]
async fn test_sequence_output_passes_whole() {
    let workflow = Workflow::builder()
        .registry(test_registry())
        .environment(Environment::new())
        .parse(&two_step_document("ListAgent", "{{a.output.whatever}}"))
        .expect("valid workflow");

    let outputs = workflow.run().await;
    assert_eq!(
        outputs.get("b"),
        Some(&json!({"items": [{"id": 1}, {"id": 2}]}))
    );
}

#[tokio::test]
async fn test_missing_environment_value() {
    let document = json!({
        "steps": [{
            "id": "search",
            "agent": "KeyProbeAgent",
            "tools": [{"name": "apollo", "config": {"api_key": "{{APOLLO_API_KEY}}"}}]
        }]
    })
    .to_string();

    let workflow = Workflow::builder()
        .registry(test_registry())
        .environment(Environment::new())
        .parse(&document)
        .expect("valid workflow");

    let errors = workflow.construction_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        WorkflowError::MissingConfig { keys, .. } if keys == &["api_key".to_string()]
    ));

    let outputs = workflow.run().await;
    assert!(outputs.is_empty());
    assert_eq!(outputs.failures().len(), 1);

    let workflow = Workflow::builder()
        .registry(test_registry())
        .environment(Environment::from_pairs([("APOLLO_API_KEY", "k1")]))
        .parse(&document)
        .expect("valid workflow");

    assert!(workflow.construction_errors().is_empty());
    let outputs = workflow.run().await;
    assert_eq!(outputs.get("search"), Some(&json!({"api_key": "k1"})));
}

#[tokio::test]
async fn test_unknown_handler_does_not_stop_run() {
    let document = json!({
        "steps": [
            {"id": "ghost", "agent": "NoSuchAgent"},
            {"id": "a", "agent": "ProducerAgent"}
        ]
    })
    .to_string();

    let workflow = Workflow::builder()
        .registry(test_registry())
        .environment(Environment::new())
        .parse(&document)
        .expect("valid workflow");

    assert!(matches!(
        workflow.construction_errors(),
        [WorkflowError::UnknownHandler { .. }]
    ));

    let outputs = workflow.run().await;
    assert!(outputs.contains("a"));
    assert!(!outputs.contains("ghost"));
}

#[test]
fn test_bundled_workflow_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../workflows/autoreach.json");
    let workflow = Workflow::builder()
        .environment(Environment::new())
        .load(path)
        .expect("bundled workflow loads");

    assert_eq!(workflow.descriptor().step_count(), 7);
    // Only scoring needs no environment values.
    assert_eq!(workflow.construction_errors().len(), 6);
    assert!(workflow.handlers().get("scoring").is_some());
}

async fn mount_services(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/contacts/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contacts": [{
                "id": "c-1",
                "first_name": "Sam",
                "last_name": "Lee",
                "email": "sam@acme.io",
                "organization": {"name": "Acme", "employee_count": 800, "annual_revenue": 120000000}
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/email-finder"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": {"position": "VP of Sales"}})),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "Hi Sam, quick idea for Acme."}}]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/smtp/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"messageId": "<m-1>"})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/campaigns/autoreach_\d{8}_\d{6}/emails$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "emails": [{
                "contact_name": "Sam Lee",
                "account_name": "Acme",
                "recipient_email": "sam@acme.io",
                "opened": true,
                "clicked": true,
                "replied": true,
                "last_activity_at": "2025-10-20T08:00:00Z"
            }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_builtin_pipeline() {
    let server = MockServer::start().await;
    mount_services(&server).await;
    let sheets = tempfile::tempdir().expect("tempdir");
    let base = server.uri();

    let document = json!({
        "workflow_name": "AutoReach",
        "steps": [
            {
                "id": "prospect_search",
                "agent": "ProspectSearchAgent",
                "tools": [{"config": {"api_key": "{{APOLLO_API_KEY}}", "base_url": base}}],
                "inputs": {"icp": {"industry": "SaaS"}, "signals": ["recent_funding"]}
            },
            {
                "id": "enrichment",
                "agent": "DataEnrichmentAgent",
                "tools": [{"config": {"api_key": "{{HUNTER_API_KEY}}", "base_url": base}}],
                "inputs": {"leads": "{{prospect_search.output.leads}}"}
            },
            {
                "id": "scoring",
                "agent": "ScoringAgent",
                "inputs": {"enriched_leads": "{{enrichment.output.enriched_leads}}"}
            },
            {
                "id": "outreach_content",
                "agent": "OutreachContentAgent",
                "tools": [{"config": {"api_key": "{{DEEPSEEK_API_KEY}}", "base_url": base}}],
                "inputs": {"ranked_leads": "{{scoring.output.ranked_leads}}", "persona": "Alex"}
            },
            {
                "id": "send",
                "agent": "OutreachExecutorAgent",
                "tools": [{"config": {"api_key": "{{BREVO_API_KEY}}", "base_url": base}}],
                "inputs": {"messages": "{{outreach_content.output.messages}}"}
            },
            {
                "id": "response_tracking",
                "agent": "ResponseTrackerAgent",
                "tools": [{"config": {"api_key": "{{APOLLO_API_KEY}}", "base_url": base}}],
                "inputs": {"campaign_id": "{{send.output.campaign_id}}"}
            },
            {
                "id": "feedback",
                "agent": "FeedbackTrainerAgent",
                "tools": [{"config": {"sheet_id": "{{SHEET_ID}}", "log_dir": sheets.path()}}],
                "inputs": {"responses": "{{response_tracking.output.responses}}"}
            }
        ]
    })
    .to_string();

    let environment = Environment::from_pairs([
        ("APOLLO_API_KEY", "ap-1"),
        ("HUNTER_API_KEY", "hu-1"),
        ("DEEPSEEK_API_KEY", "or-1"),
        ("BREVO_API_KEY", "br-1"),
        ("SHEET_ID", "campaigns"),
    ]);

    let workflow = Workflow::builder()
        .environment(environment)
        .parse(&document)
        .expect("valid workflow");
    assert!(workflow.construction_errors().is_empty());

    let outputs = workflow.run().await;

    assert!(outputs.failures().is_empty(), "{:?}", outputs.failures());
    assert_eq!(outputs.len(), 7);

    let ranked = &outputs.get("scoring").expect("scoring output")["ranked_leads"][0];
    assert_eq!(ranked["role"], "VP of Sales");
    assert_eq!(ranked["seniority_level"], "executive");

    let message = &outputs.get("outreach_content").expect("content output")["messages"][0];
    assert_eq!(message["email_body"], "Hi Sam, quick idea for Acme.");
    assert_eq!(message["email"], "sam.lee@acme.com");

    let sent = &outputs.get("send").expect("send output")["sent_status"][0];
    assert_eq!(sent["status"], "sent");
    assert_eq!(sent["message_id"], "<m-1>");

    let feedback = outputs.get("feedback").expect("feedback output");
    assert_eq!(feedback["analytics"]["reply_rate"], 100.0);
    assert!(sheets.path().join("campaigns.tsv").exists());
}
