//! Sequential executor for a chain of named steps.

use crate::context::RunContext;
use crate::error::{BuildError, RunError, StepError};
use crate::step::{Step, StepName, StepOutput};
use std::collections::HashMap;
use std::fmt;
use tokio::time::timeout;
use tracing::{info, warn};

/// Ordered record of the steps a run completed, in execution order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunTrace(Vec<StepName>);

impl RunTrace {
    pub fn steps(&self) -> &[StepName] {
        &self.0
    }

    pub fn completed(&self, name: &str) -> bool {
        self.0.iter().any(|s| s.as_str() == name)
    }

    fn push(&mut self, name: StepName) {
        self.0.push(name);
    }
}

/// Executes registered steps one after another, honoring each step's
/// timeout and retry policy. Immutable after build; safe to share across
/// concurrent runs, which otherwise share nothing.
pub struct Runner {
    steps: HashMap<StepName, Box<dyn Step>>,
    start: StepName,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("start", &self.start)
            .finish()
    }
}

impl Runner {
    pub fn builder() -> RunnerBuilder {
        RunnerBuilder::default()
    }

    pub fn start_step(&self) -> &StepName {
        &self.start
    }

    pub fn has_step(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Runs the chain from the start step until a step completes the run
    /// or fails terminally. No step is skipped and none re-enters.
    pub async fn execute(&self, ctx: &mut RunContext) -> Result<RunTrace, RunError> {
        let mut trace = RunTrace::default();
        let mut current = Some(self.start.clone());

        while let Some(name) = current {
            let step = self
                .steps
                .get(&name)
                .ok_or_else(|| RunError::UnknownStep(name.clone()))?;
            let output = self.run_step(step.as_ref(), ctx).await?;
            trace.push(name);
            current = match output {
                StepOutput::Continue(next) => Some(next),
                StepOutput::Complete => None,
            };
        }

        Ok(trace)
    }

    async fn run_step(
        &self,
        step: &dyn Step,
        ctx: &mut RunContext,
    ) -> Result<StepOutput, RunError> {
        let policy = step.retry_policy();
        let max_retries = policy.max_retries();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let result = match timeout(step.timeout(), step.execute(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(StepError::transient(format!(
                    "attempt exceeded the {:?} budget",
                    step.timeout()
                ))),
            };

            match result {
                Ok(output) => {
                    info!(step = %step.name(), attempt, "step completed");
                    return Ok(output);
                }
                Err(error) if error.is_retryable() && attempt <= max_retries => {
                    warn!(step = %step.name(), attempt, %error, "step failed, will retry");
                    if let Some(delay) = policy.delay_for_attempt(attempt - 1) {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(error) => {
                    warn!(step = %step.name(), attempt, %error, "step failed terminally");
                    return Err(RunError::StepFailed {
                        step: step.name(),
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}

/// Builder for [`Runner`]. Steps register under their own
/// [`name()`](Step::name).
#[derive(Default)]
pub struct RunnerBuilder {
    steps: HashMap<StepName, Box<dyn Step>>,
    start: Option<StepName>,
}

impl RunnerBuilder {
    pub fn step<S: Step + 'static>(mut self, step: S) -> Self {
        self.steps.insert(step.name(), Box::new(step));
        self
    }

    pub fn start_with(mut self, name: impl Into<StepName>) -> Self {
        self.start = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Runner, BuildError> {
        let start = self.start.ok_or(BuildError::NoStartStep)?;
        if !self.steps.contains_key(&start) {
            return Err(BuildError::StartStepMissing(start));
        }
        Ok(Runner {
            steps: self.steps,
            start,
        })
    }
}
