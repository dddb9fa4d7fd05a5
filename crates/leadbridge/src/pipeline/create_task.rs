//! Fourth step: mirror the record into the ERP.

use crate::crm::Lead;
use crate::pipeline::{PipelineDeps, COMPLETE_STEP};
use async_trait::async_trait;
use leadbridge_core::{RetryPolicy, RunContext, Step, StepError, StepName, StepOutput};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct CreateTask {
    deps: Arc<PipelineDeps>,
}

impl CreateTask {
    pub fn new(deps: Arc<PipelineDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Step for CreateTask {
    async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError> {
        let lead = ctx.require::<Lead>()?;

        // Known hazard: this write carries no idempotency key, so a retry
        // after a half-failed attempt can leave a duplicate task behind.
        let result = self.deps.erp.create_task(&lead.name, lead.price).await?;

        info!(task_id = ?result.task_id, lead_id = lead.id, "erp task created");

        ctx.put(result);
        Ok(StepOutput::next(COMPLETE_STEP))
    }

    fn name(&self) -> StepName {
        StepName::new(crate::pipeline::CREATE_TASK_STEP)
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.deps.upstream_retry.clone()
    }
}
