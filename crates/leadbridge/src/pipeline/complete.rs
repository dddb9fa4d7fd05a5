//! Final step: fold every prior output into one summary.

use crate::crm::Lead;
use crate::erp::TaskResult;
use crate::pipeline::{
    ChangeSummary, IntegrationSummary, RecordSummary, StepSummary, TaskSummary,
};
use crate::webhook::normalize::ParsedChangeRecord;
use async_trait::async_trait;
use chrono::Utc;
use leadbridge_core::{RunContext, Step, StepError, StepName, StepOutput};
use tracing::info;

/// Pure aggregation, no external call. Reaching this step means every
/// prior step succeeded, so the only failure mode left is a missing
/// context value, which is a bug rather than an operational condition.
#[derive(Debug)]
pub struct Complete;

#[async_trait]
impl Step for Complete {
    async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError> {
        let record = ctx.require::<ParsedChangeRecord>()?;
        let lead = ctx.require::<Lead>()?;
        let task = ctx.require::<TaskResult>()?;

        let summary = IntegrationSummary {
            run_id: ctx.metadata("run_id").map(str::to_string),
            record: RecordSummary {
                id: lead.id,
                name: lead.name.clone(),
                price: lead.price,
                status_id: lead.status_id,
                pipeline_id: lead.pipeline_id,
            },
            changes: ChangeSummary {
                pipeline_changed: record.pipeline_changed,
                status_changed: record.status_changed,
            },
            task: TaskSummary {
                task_id: task.task_id,
            },
            received_at: record.received_at,
            completed_at: Utc::now(),
            elapsed_ms: ctx.elapsed().as_millis() as u64,
            steps: StepSummary {
                parsed: true,
                authenticated: true,
                fetched: true,
                task_created: task.task_id.is_some(),
            },
        };

        if let Ok(json) = serde_json::to_string(&summary) {
            info!(summary = %json, "integration pipeline completed");
        }

        ctx.put(summary);
        Ok(StepOutput::done())
    }

    fn name(&self) -> StepName {
        StepName::new(crate::pipeline::COMPLETE_STEP)
    }
}
