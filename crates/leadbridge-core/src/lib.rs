//! Named, retryable step execution.
//!
//! A pipeline run is a strictly sequential chain of named steps. Each step
//! consumes values the previous steps left in the [`RunContext`], produces
//! its own, and either names its successor or completes the run. The
//! [`Runner`] executes one chain, applying each step's timeout and
//! [`RetryPolicy`]; a failure that is [`FailureKind::Fatal`] is never
//! retried, while transient failures are retried up to the policy's bound.
//!
//! Pipeline code depends only on the [`Step`] trait and its error types, so
//! the bundled runner can be swapped for a durable external scheduler
//! without touching the steps themselves.

mod context;
mod error;
mod runner;
mod step;

pub use context::RunContext;
pub use error::{BuildError, FailureKind, RunError, StepError};
pub use runner::{RunTrace, Runner, RunnerBuilder};
pub use step::{RetryPolicy, Step, StepName, StepOutput};
