//! The terminal aggregate of one pipeline run.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Produced once per run by the completion step, logged for observability
/// and never read back by the pipeline. Absent fields stay absent rather
/// than being defaulted to misleading values.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    pub record: RecordSummary,
    pub changes: ChangeSummary,
    pub task: TaskSummary,
    pub received_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub steps: StepSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeSummary {
    pub pipeline_changed: bool,
    pub status_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSummary {
    pub parsed: bool,
    pub authenticated: bool,
    pub fetched: bool,
    pub task_created: bool,
}
