//! Second step: exchange the configured credential for an access token.

use crate::pipeline::{PipelineDeps, FETCH_STEP};
use crate::webhook::normalize::ParsedChangeRecord;
use async_trait::async_trait;
use leadbridge_core::{RetryPolicy, RunContext, Step, StepError, StepName, StepOutput};
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Authenticate {
    deps: Arc<PipelineDeps>,
}

impl Authenticate {
    pub fn new(deps: Arc<PipelineDeps>) -> Self {
        Self { deps }
    }
}

/// The webhook's subdomain wins over the configured one, so a single
/// deployment can serve webhooks from more than one CRM account.
pub(crate) fn effective_subdomain(deps: &PipelineDeps, record: &ParsedChangeRecord) -> String {
    record
        .subdomain
        .clone()
        .unwrap_or_else(|| deps.config.crm.subdomain.clone())
}

#[async_trait]
impl Step for Authenticate {
    async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError> {
        let record = ctx.require::<ParsedChangeRecord>()?;
        let subdomain = effective_subdomain(&self.deps, record);

        let token = self
            .deps
            .crm
            .authenticate(&self.deps.config.crm.auth, &subdomain)
            .await?;

        info!(%subdomain, expires_in = ?token.expires_in, "crm authentication succeeded");

        ctx.put(token);
        Ok(StepOutput::next(FETCH_STEP))
    }

    fn name(&self) -> StepName {
        StepName::new(crate::pipeline::AUTH_STEP)
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.deps.upstream_retry.clone()
    }
}
