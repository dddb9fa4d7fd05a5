//! Third step: re-read the full record from the CRM.

use crate::crm::AccessToken;
use crate::pipeline::{authenticate::effective_subdomain, PipelineDeps, CREATE_TASK_STEP};
use crate::webhook::normalize::ParsedChangeRecord;
use async_trait::async_trait;
use leadbridge_core::{RetryPolicy, RunContext, Step, StepError, StepName, StepOutput};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct FetchLead {
    deps: Arc<PipelineDeps>,
}

impl FetchLead {
    pub fn new(deps: Arc<PipelineDeps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Step for FetchLead {
    async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError> {
        let record = ctx.require::<ParsedChangeRecord>()?;
        let token = ctx.require::<AccessToken>()?;
        let subdomain = effective_subdomain(&self.deps, record);

        // Pure read: repeating this on retry has no side effects.
        let lead = self
            .deps
            .crm
            .fetch_lead(&record.record_id, token, &subdomain)
            .await?;

        info!(lead_id = lead.id, name = %lead.name, price = ?lead.price, "lead fetched");

        ctx.put(lead);
        Ok(StepOutput::next(CREATE_TASK_STEP))
    }

    fn name(&self) -> StepName {
        StepName::new(crate::pipeline::FETCH_STEP)
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.deps.upstream_retry.clone()
    }
}
