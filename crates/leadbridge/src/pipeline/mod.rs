//! The relay pipeline: parse → authenticate → fetch → create task → complete.
//!
//! Each arrow is a step boundary; steps advance strictly in this order with
//! no branching. A run either reaches `complete` or stops at the first step
//! whose failure is fatal or whose retries are exhausted.

mod authenticate;
mod complete;
mod create_task;
mod fetch;
mod parse;
mod summary;

pub use summary::{ChangeSummary, IntegrationSummary, RecordSummary, StepSummary, TaskSummary};

use crate::config::Config;
use crate::crm::CrmClient;
use crate::erp::ErpClient;
use crate::webhook::InboundEvent;
use leadbridge_core::{BuildError, RetryPolicy, RunContext, RunError, Runner, StepError, StepName};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Step names as the run history reports them.
pub const PARSE_STEP: &str = "parse-webhook";
pub const AUTH_STEP: &str = "authenticate";
pub const FETCH_STEP: &str = "fetch-lead";
pub const CREATE_TASK_STEP: &str = "create-task";
pub const COMPLETE_STEP: &str = "complete";

/// Everything the steps borrow, shared across all runs.
#[derive(Debug)]
pub struct PipelineDeps {
    pub config: Arc<Config>,
    pub crm: CrmClient,
    pub erp: ErpClient,
    /// Retry applied to the steps that talk to upstream systems.
    pub upstream_retry: RetryPolicy,
}

impl PipelineDeps {
    pub fn new(config: Arc<Config>) -> Self {
        let crm = match &config.crm.base_url {
            Some(url) => CrmClient::with_base_url(url.clone()),
            None => CrmClient::new(),
        };
        let erp = ErpClient::new(config.erp.clone());
        Self {
            config,
            crm,
            erp,
            upstream_retry: RetryPolicy::exponential(3, Duration::from_secs(1)),
        }
    }

    pub fn with_upstream_retry(mut self, policy: RetryPolicy) -> Self {
        self.upstream_retry = policy;
        self
    }
}

/// A built pipeline, ready to execute runs. Immutable and shareable.
#[derive(Debug)]
pub struct Pipeline {
    runner: Runner,
}

impl Pipeline {
    pub fn new(deps: Arc<PipelineDeps>) -> Result<Self, BuildError> {
        let runner = Runner::builder()
            .step(parse::ParseWebhook)
            .step(authenticate::Authenticate::new(deps.clone()))
            .step(fetch::FetchLead::new(deps.clone()))
            .step(create_task::CreateTask::new(deps))
            .step(complete::Complete)
            .start_with(PARSE_STEP)
            .build()?;
        Ok(Self { runner })
    }

    /// Executes one run for an inbound event. Every value created along
    /// the way lives in the run's own context and is dropped with it.
    pub async fn run(&self, event: InboundEvent) -> Result<IntegrationSummary, RunError> {
        let mut ctx = RunContext::new();
        ctx.set_metadata("run_id", uuid::Uuid::new_v4().to_string());
        ctx.put(event);

        self.runner.execute(&mut ctx).await?;

        ctx.take::<IntegrationSummary>()
            .ok_or_else(|| RunError::StepFailed {
                step: StepName::new(COMPLETE_STEP),
                attempts: 1,
                error: StepError::fatal("run completed without a summary"),
            })
    }
}

/// Drains the webhook trigger; each event becomes one fully independent
/// run with no ordering guarantee relative to the others. Two events for
/// the same record may race at the ERP insert.
pub fn spawn_dispatcher(
    pipeline: Arc<Pipeline>,
    mut trigger: mpsc::Receiver<InboundEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = trigger.recv().await {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                match pipeline.run(event).await {
                    Ok(summary) => {
                        info!(task_id = ?summary.task.task_id, "integration run completed")
                    }
                    // Terminal: abandoned runs are not resumed.
                    Err(error) => warn!(step = %error.step(), %error, "integration run failed"),
                }
            });
        }
    })
}
