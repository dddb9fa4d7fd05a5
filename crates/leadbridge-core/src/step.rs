//! The step trait and its supporting types.

use crate::context::RunContext;
use crate::error::StepError;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::time::Duration;

/// Name of a step, used for chaining and in run history.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StepName(String);

impl StepName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// What the runner should do after a step succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutput {
    /// Hand control to the named step.
    Continue(StepName),
    /// The run is finished.
    Complete,
}

impl StepOutput {
    pub fn next(name: impl Into<StepName>) -> Self {
        Self::Continue(name.into())
    }

    pub fn done() -> Self {
        Self::Complete
    }
}

/// Bounded retry for transient step failures.
///
/// The delay between attempts belongs to the scheduler running the step;
/// steps themselves never sleep.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Fail on the first error.
    #[default]
    None,
    /// Constant delay between attempts.
    Fixed { max_retries: u32, delay: Duration },
    /// Delay doubles per attempt, capped at `max_delay`.
    Exponential {
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
    },
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        RetryPolicy::Fixed { max_retries, delay }
    }

    /// Doubling backoff capped at 60 seconds.
    ///
    /// ```
    /// use leadbridge_core::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(3, Duration::from_millis(100));
    /// assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(100)));
    /// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(400)));
    /// ```
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        RetryPolicy::Exponential {
            max_retries,
            initial_delay,
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn max_retries(&self) -> u32 {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Fixed { max_retries, .. } => *max_retries,
            RetryPolicy::Exponential { max_retries, .. } => *max_retries,
        }
    }

    /// Delay before retry number `attempt` (0-indexed), or `None` for
    /// [`RetryPolicy::None`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Fixed { delay, .. } => Some(*delay),
            RetryPolicy::Exponential {
                initial_delay,
                max_delay,
                ..
            } => {
                let millis = (initial_delay.as_millis() as u64)
                    .saturating_mul(1u64 << attempt.min(32));
                Some(Duration::from_millis(
                    millis.min(max_delay.as_millis() as u64),
                ))
            }
        }
    }
}

/// One retryable unit of work in a pipeline run.
///
/// ```
/// use leadbridge_core::{RunContext, Step, StepError, StepName, StepOutput};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Greet;
///
/// #[async_trait]
/// impl Step for Greet {
///     async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError> {
///         ctx.put("hello".to_string());
///         Ok(StepOutput::done())
///     }
///
///     fn name(&self) -> StepName {
///         StepName::new("greet")
///     }
/// }
/// ```
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Runs the step against the shared run context.
    async fn execute(&self, ctx: &mut RunContext) -> Result<StepOutput, StepError>;

    fn name(&self) -> StepName;

    /// Retry applied to transient failures of this step.
    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::None
    }

    /// Wall-clock budget for a single attempt.
    fn timeout(&self) -> Duration {
        Duration::from_secs(30)
    }
}
