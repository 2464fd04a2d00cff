//! Placeholder records used when a handler receives no input or its service
//! returns nothing.

use serde_json::{json, Value};

pub(crate) fn default_icp() -> Value {
    json!({
        "industry": "SaaS",
        "location": "United States",
        "employee_count": {"min": 100, "max": 1000},
        "revenue": {"min": 20_000_000, "max": 200_000_000}
    })
}

pub(crate) fn default_signals() -> Vec<String> {
    vec!["recent_funding".to_string(), "hiring_for_sales".to_string()]
}

pub(crate) fn prospect_leads() -> Vec<Value> {
    vec![
        json!({
            "company": "ExampleCorp",
            "contact_name": "Jane Doe",
            "email": "jane.doe@examplecorp.com",
            "linkedin": "https://linkedin.com/in/janedoe",
            "signal": "recent_funding",
            "industry": "SaaS",
            "location": "San Francisco, CA",
            "employee_count": 250,
            "revenue": 50_000_000,
            "apollo_id": "contact_001"
        }),
        json!({
            "company": "TestCo",
            "contact_name": "Alice Smith",
            "email": "alice@testco.com",
            "linkedin": "https://linkedin.com/in/alicesmith",
            "signal": "hiring_for_sales",
            "industry": "SaaS",
            "location": "Austin, TX",
            "employee_count": 150,
            "revenue": 35_000_000,
            "apollo_id": "contact_002"
        }),
    ]
}

pub(crate) fn enrichment_leads() -> Vec<Value> {
    vec![
        json!({
            "company": "ExampleCorp",
            "contact_name": "Jane Doe",
            "email": "jane@examplecorp.com",
            "linkedin": "https://linkedin.com/in/janedoe"
        }),
        json!({
            "company": "TestCo",
            "contact_name": "Alice Smith",
            "email": "alice@testco.com",
            "linkedin": "https://linkedin.com/in/alicesmith"
        }),
    ]
}

pub(crate) fn scoring_leads() -> Vec<Value> {
    vec![
        json!({
            "company": "ExampleCorp",
            "contact_name": "Jane Doe",
            "role": "Sales Manager",
            "technologies": ["Salesforce", "HubSpot"],
            "employee_count": 250,
            "revenue": 50_000_000,
            "engagement_score": 0.75
        }),
        json!({
            "company": "TestCo",
            "contact_name": "Alice Smith",
            "role": "Sales Executive",
            "technologies": ["Pipedrive"],
            "employee_count": 150,
            "revenue": 35_000_000,
            "engagement_score": 0.6
        }),
    ]
}

pub(crate) fn ranked_leads() -> Vec<Value> {
    vec![
        json!({
            "company": "ExampleCorp",
            "contact": "Jane Doe",
            "role": "Sales Manager",
            "technologies": ["Salesforce"],
            "score": 0.85
        }),
        json!({
            "company": "TestCo",
            "contact": "Alice Smith",
            "role": "Sales Executive",
            "technologies": ["Pipedrive"],
            "score": 0.72
        }),
    ]
}

pub(crate) fn responses() -> Vec<Value> {
    vec![
        json!({
            "lead": "Jane Doe",
            "opened": true,
            "clicked": false,
            "replied": true,
            "timestamp": "2025-10-19T09:00:00"
        }),
        json!({
            "lead": "Alice Smith",
            "opened": true,
            "clicked": true,
            "replied": false,
            "timestamp": "2025-10-19T09:30:00"
        }),
    ]
}

/// Known tech stacks by company name.
pub(crate) fn tech_stack(company: &str) -> Vec<&'static str> {
    match company {
        "ExampleCorp" => vec!["Salesforce", "HubSpot", "Outreach", "LinkedIn Sales Navigator"],
        "TestCo" => vec!["Pipedrive", "Microsoft Dynamics", "Slack", "Zapier"],
        _ => vec!["Salesforce", "HubSpot"],
    }
}
