//! Campaign analytics, recommendations and the feedback sheet.

use super::{records, round_to, samples, text};
use async_trait::async_trait;
use autoreach_core::{Arguments, ConstructHandler, Handler, HandlerConfig, HandlerError, HandlerName};
use serde_json::{json, Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_LOG_DIR: &str = "logs/feedback";
const CAMPAIGN_ID: &str = "autoreach_campaign";
const HEADER: [&str; 7] = [
    "Timestamp",
    "Campaign ID",
    "Total Sent",
    "Open Rate",
    "Click Rate",
    "Reply Rate",
    "Recommendations",
];

/// Append-only tab-separated log of campaign results.
///
/// A sheet that cannot be opened leaves the handler usable: results are
/// still computed, only the write is skipped.
#[derive(Debug)]
pub enum FeedbackSheet {
    /// Rows are appended to the file at `path`.
    Active { file: Mutex<File>, path: PathBuf },
    /// No rows are written.
    Disabled { reason: String },
}

impl FeedbackSheet {
    /// Opens (or creates) `{log_dir}/{sheet_id}.tsv`.
    pub fn open(log_dir: &Path, sheet_id: Option<&str>) -> Self {
        let Some(sheet_id) = sheet_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Self::Disabled {
                reason: "no sheet_id configured".to_string(),
            };
        };

        let path = log_dir.join(format!("{sheet_id}.tsv"));
        let opened = fs::create_dir_all(log_dir).and_then(|()| {
            OpenOptions::new().create(true).append(true).open(&path)
        });

        match opened {
            Ok(file) => {
                info!("[FeedbackTrainer] Connected to feedback sheet: {}", path.display());
                Self::Active {
                    file: Mutex::new(file),
                    path,
                }
            }
            Err(e) => {
                warn!(
                    "[FeedbackTrainer] Could not open feedback sheet {}: {}",
                    path.display(),
                    e
                );
                Self::Disabled {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Returns `true` when rows are written.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }

    /// Appends one row, preceded by the header when the sheet is empty.
    pub fn append(&self, row: &[String]) -> io::Result<()> {
        let Self::Active { file, .. } = self else {
            return Ok(());
        };
        let mut file = file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "feedback sheet lock poisoned"))?;

        if file.metadata()?.len() == 0 {
            writeln!(file, "{}", HEADER.join("\t"))?;
        }
        let cells: Vec<String> = row.iter().map(|cell| sanitize(cell)).collect();
        writeln!(file, "{}", cells.join("\t"))?;
        file.flush()
    }
}

/// Turns response events into engagement analytics and recommendations.
///
/// Input: `responses`. Output:
/// `{"recommendations": [...], "analytics": {...}}`.
#[derive(Debug)]
pub struct FeedbackTrainerAgent {
    sheet: FeedbackSheet,
}

impl FeedbackTrainerAgent {
    /// Creates an agent writing to `sheet`.
    pub fn new(sheet: FeedbackSheet) -> Self {
        Self { sheet }
    }

    /// The sheet this agent writes to.
    pub fn sheet(&self) -> &FeedbackSheet {
        &self.sheet
    }
}

impl ConstructHandler for FeedbackTrainerAgent {
    fn construct(config: &HandlerConfig) -> Result<Self, HandlerError> {
        let sheet_id: Option<String> = config.optional("sheet_id")?;
        let log_dir: PathBuf = config
            .optional("log_dir")?
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));
        Ok(Self::new(FeedbackSheet::open(&log_dir, sheet_id.as_deref())))
    }
}

#[async_trait]
impl Handler for FeedbackTrainerAgent {
    async fn invoke(&self, args: Arguments) -> Result<Value, HandlerError> {
        let mut responses: Vec<Value> = args.optional("responses")?.unwrap_or_default();
        if responses.is_empty() {
            responses = samples::responses();
        }
        let responses = records(responses);
        let metrics = Metrics::collect(&responses);
        let recommendations = metrics.recommendations();

        let timestamp = responses
            .first()
            .and_then(|first| text(first, "timestamp"))
            .unwrap_or_default();
        let row = vec![
            timestamp.to_string(),
            CAMPAIGN_ID.to_string(),
            metrics.total.to_string(),
            format!("{:.1}%", metrics.open_rate()),
            format!("{:.1}%", metrics.click_rate()),
            format!("{:.1}%", metrics.reply_rate()),
            recommendations.join(", "),
        ];
        match &self.sheet {
            FeedbackSheet::Active { path, .. } => match self.sheet.append(&row) {
                Ok(()) => info!("[FeedbackTrainer] Logged results to {}", path.display()),
                Err(e) => warn!("[FeedbackTrainer] Error writing to sheet: {}", e),
            },
            FeedbackSheet::Disabled { reason } => {
                info!("[FeedbackTrainer] Feedback sheet disabled ({}), skipping write", reason)
            }
        }

        Ok(json!({
            "recommendations": recommendations,
            "analytics": metrics.to_json(),
        }))
    }

    fn name(&self) -> HandlerName {
        Self::handler_name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Metrics {
    total: usize,
    opened: usize,
    clicked: usize,
    replied: usize,
}

impl Metrics {
    fn collect(responses: &[Map<String, Value>]) -> Self {
        let count = |key: &str| {
            responses
                .iter()
                .filter(|r| r.get(key).and_then(Value::as_bool).unwrap_or(false))
                .count()
        };
        Self {
            total: responses.len(),
            opened: count("opened"),
            clicked: count("clicked"),
            replied: count("replied"),
        }
    }

    fn rate(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 / self.total as f64 * 100.0
        }
    }

    fn open_rate(&self) -> f64 {
        self.rate(self.opened)
    }

    fn click_rate(&self) -> f64 {
        self.rate(self.clicked)
    }

    fn reply_rate(&self) -> f64 {
        self.rate(self.replied)
    }

    fn recommendations(&self) -> Vec<String> {
        let (open, click, reply) = (self.open_rate(), self.click_rate(), self.reply_rate());
        let mut out = Vec::new();

        if open < 30.0 {
            out.push(format!(
                "Low open rate ({open:.1}%). Consider tweaking subject lines and send times."
            ));
        }
        if click < 10.0 {
            out.push(
                "Low click-through rate. Add more compelling CTAs and improve email formatting."
                    .to_string(),
            );
        }
        if reply < 5.0 {
            out.push(
                "Low reply rate. Improve email personalization and focus on addressing specific pain points."
                    .to_string(),
            );
        }
        if open > 50.0 && reply < 10.0 {
            out.push(
                "High opens but low replies. Your subject line is working, but body content needs refinement."
                    .to_string(),
            );
        }
        if reply > 20.0 {
            out.push(
                "Great reply rate! Consider increasing ICP targeting scope to find more similar prospects."
                    .to_string(),
            );
        }
        if out.is_empty() {
            out.push(
                "Campaign metrics look good. Continue with current strategy and A/B test subject variations."
                    .to_string(),
            );
        }
        out
    }

    fn to_json(self) -> Value {
        json!({
            "total_sent": self.total,
            "open_rate": round_to(self.open_rate(), 2),
            "click_rate": round_to(self.click_rate(), 2),
            "reply_rate": round_to(self.reply_rate(), 2),
            "opened_count": self.opened,
            "clicked_count": self.clicked,
            "replied_count": self.replied,
        })
    }
}

fn sanitize(cell: &str) -> String {
    cell.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(opened: bool, clicked: bool, replied: bool) -> Value {
        json!({"lead": "x", "opened": opened, "clicked": clicked, "replied": replied, "timestamp": "2025-10-20T08:00:00"})
    }

    #[test]
    fn test_thresholds() {
        let metrics = Metrics {
            total: 10,
            opened: 2,
            clicked: 0,
            replied: 0,
        };
        let recommendations = metrics.recommendations();
        assert_eq!(recommendations.len(), 3);
        assert_eq!(
            recommendations[0],
            "Low open rate (20.0%). Consider tweaking subject lines and send times."
        );

        let healthy = Metrics {
            total: 10,
            opened: 4,
            clicked: 2,
            replied: 1,
        };
        assert_eq!(
            healthy.recommendations(),
            vec!["Campaign metrics look good. Continue with current strategy and A/B test subject variations."]
        );
    }

    #[test]
    fn test_high_opens_low_replies() {
        let metrics = Metrics {
            total: 10,
            opened: 8,
            clicked: 3,
            replied: 0,
        };
        let recommendations = metrics.recommendations();
        assert!(recommendations[0].starts_with("Low reply rate."));
        assert!(recommendations[1].starts_with("High opens but low replies."));
    }

    #[test]
    fn test_without_sheet_id_is_disabled() {
        let agent = FeedbackTrainerAgent::construct(&HandlerConfig::new()).expect("constructs");
        assert!(!agent.sheet().is_active());
    }

    #[test]
    fn test_unopenable_sheet_is_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, "").expect("write blocker");

        let sheet = FeedbackSheet::open(&blocker, Some("sheet-1"));
        assert!(matches!(sheet, FeedbackSheet::Disabled { .. }));
    }

    #[tokio::test]
    async fn test_disabled_sheet_still_recommends() {
        let agent = FeedbackTrainerAgent::new(FeedbackSheet::Disabled {
            reason: "test".into(),
        });
        let output = agent.invoke(Arguments::new()).await.expect("analysis succeeds");

        assert_eq!(
            output["analytics"],
            json!({
                "total_sent": 2,
                "open_rate": 100.0,
                "click_rate": 50.0,
                "reply_rate": 50.0,
                "opened_count": 2,
                "clicked_count": 1,
                "replied_count": 1
            })
        );
        assert_eq!(
            output["recommendations"],
            json!(["Great reply rate! Consider increasing ICP targeting scope to find more similar prospects."])
        );
    }

    #[tokio::test]
    async fn test_appends_rows_with_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config: HandlerConfig = [
            ("SHEET_ID", json!("sheet-1")),
            ("log_dir", json!(dir.path().join("feedback"))),
        ]
        .into_iter()
        .collect();
        let agent = FeedbackTrainerAgent::construct(&config).expect("constructs");
        assert!(agent.sheet().is_active());

        let args: Arguments = [(
            "responses",
            json!([response(true, false, false), response(false, false, false)]),
        )]
        .into_iter()
        .collect();
        agent.invoke(args.clone()).await.expect("first run");
        agent.invoke(args).await.expect("second run");

        let contents =
            fs::read_to_string(dir.path().join("feedback").join("sheet-1.tsv")).expect("sheet");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Timestamp\tCampaign ID"));
        let row: Vec<&str> = lines[1].split('\t').collect();
        assert_eq!(
            &row[..6],
            ["2025-10-20T08:00:00", "autoreach_campaign", "2", "50.0%", "0.0%", "0.0%"]
        );
        assert!(row[6].starts_with("Low click-through rate."));
    }
}
