//! First step: extract the canonical change record from the inbound event.

use crate::pipeline::AUTH_STEP;
use crate::webhook::{normalize, InboundEvent};
use async_trait::async_trait;
use leadbridge_core::{RunContext, Step, StepError, StepName, StepOutput};
use tracing::info;

#[derive(Debug)]
pub struct ParseWebhook;

#[async_trait]
impl Step for ParseWebhook {
    async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError> {
        let event = ctx.require::<InboundEvent>()?;
        // Fatal on failure: the payload will not change on retry.
        let record = normalize::parse_record(&event.raw, event.received_at)?;

        info!(
            record_id = %record.record_id,
            status_changed = record.status_changed,
            pipeline_changed = record.pipeline_changed,
            "webhook parsed"
        );

        ctx.put(record);
        Ok(StepOutput::next(AUTH_STEP))
    }

    fn name(&self) -> StepName {
        StepName::new(crate::pipeline::PARSE_STEP)
    }
}
