//! Lead scoring: a weighted sum of normalized features.

use super::{records, round_to, samples};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;

const TARGET_ROLES: [&str; 4] = [
    "sales manager",
    "sales executive",
    "director of sales",
    "vp of sales",
];

/// Feature weights. Missing weights count as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringCriteria {
    #[serde(default)]
    pub employee_count: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub role_match: f64,
    #[serde(default)]
    pub engagement_score: f64,
}

impl Default for ScoringCriteria {
    fn default() -> Self {
        Self {
            employee_count: 0.25,
            revenue: 0.35,
            role_match: 0.25,
            engagement_score: 0.15,
        }
    }
}

/// Scores enriched leads and ranks them by descending total score.
///
/// Inputs: `enriched_leads`, `scoring_criteria` (overrides the configured
/// weights). Output: `{"ranked_leads": [...]}` where each lead gains a
/// `score_breakdown` and a `total_score`.
#[derive(Debug, Default)]
pub struct ScoringAgent {
    criteria: ScoringCriteria,
}

impl ScoringAgent {
    /// Creates an agent with the given weights.
    pub fn new(criteria: ScoringCriteria) -> Self {
        Self { criteria }
    }

    /// Scores one lead in place.
    pub fn score(&self, lead: &mut Map<String, Value>, criteria: &ScoringCriteria) -> f64 {
        let employees = normalize(number(lead, "employee_count"), 50.0, 1000.0);
        let revenue = normalize(number(lead, "revenue"), 20_000_000.0, 200_000_000.0);

        let role = lead
            .get("role")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase();
        let role_score = if TARGET_ROLES.iter().any(|r| role.contains(r)) {
            1.0
        } else {
            0.5
        };
        let engagement = number(lead, "engagement_score").unwrap_or(0.5);

        let parts = [
            employees * criteria.employee_count,
            revenue * criteria.revenue,
            role_score * criteria.role_match,
            engagement * criteria.engagement_score,
        ];
        let total = round_to(parts.iter().sum(), 3);

        lead.insert(
            "score_breakdown".to_string(),
            json!({
                "employee_count": round_to(parts[0], 3),
                "revenue": round_to(parts[1], 3),
                "role_match": round_to(parts[2], 3),
                "engagement": round_to(parts[3], 3),
            }),
        );
        lead.insert("total_score".to_string(), json!(total));
        total
    }
}

impl ConstructHandler for ScoringAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        Ok(Self::new(
            config.optional("scoring_criteria")?.unwrap_or_default(),
        ))
    }
}

#[async_trait]
impl Handler for ScoringAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let criteria: ScoringCriteria = args
            .optional("scoring_criteria")?
            .unwrap_or_else(|| self.criteria.clone());

        let mut leads: Vec<Value> = args.optional("enriched_leads")?.unwrap_or_default();
        if leads.is_empty() {
            leads = samples::scoring_leads();
        }

        let mut scored: Vec<(f64, Map<String, Value>)> = records(leads)
            .into_iter()
            .map(|mut lead| (self.score(&mut lead, &criteria), lead))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        let ranked_leads: Vec<Value> = scored
            .into_iter()
            .map(|(_, lead)| Value::Object(lead))
            .collect();
        Ok(json!({ "ranked_leads": ranked_leads }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

/// Clamps `(value - min) / (max - min)` to `0..=1`; absent values score 0.
fn normalize(value: Option<f64>, min: f64, max: f64) -> f64 {
    value.map_or(0.0, |v| ((v - min) / (max - min)).clamp(0.0, 1.0))
}

fn number(lead: &Map<String, Value>, key: &str) -> Option<f64> {
    lead.get(key).and_then(Value::as_f64)
}
