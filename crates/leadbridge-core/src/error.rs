//! Step and run error types.

use crate::step::StepName;
use std::error::Error as StdError;
use thiserror::Error;

/// How the runner should treat a step failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Retrying cannot help: bad configuration or a malformed input.
    Fatal,
    /// Expected to clear up on its own; worth retrying within the step's
    /// retry policy.
    Transient,
}

/// A failure raised by a single step execution.
///
/// Carries the original domain error as its source so callers can recover
/// it after the run fails:
///
/// ```
/// use leadbridge_core::{FailureKind, StepError};
///
/// #[derive(Debug, thiserror::Error)]
/// #[error("upstream said no")]
/// struct UpstreamError;
///
/// let err = StepError::with_source(FailureKind::Transient, UpstreamError);
/// assert!(err.is_retryable());
/// assert!(err.source_as::<UpstreamError>().is_some());
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StepError {
    kind: FailureKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl StepError {
    /// A failure that must not be retried.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Fatal,
            message: message.into(),
            source: None,
        }
    }

    /// A failure the runner may retry.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transient,
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a domain error, keeping it reachable through [`source_as`].
    ///
    /// [`source_as`]: StepError::source_as
    pub fn with_source(kind: FailureKind, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            kind,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Transient
    }

    /// Downcasts the wrapped source error, if any.
    pub fn source_as<T: StdError + 'static>(&self) -> Option<&T> {
        self.source.as_ref().and_then(|s| s.downcast_ref::<T>())
    }
}

/// Terminal outcome of a failed pipeline run.
#[derive(Debug, Error)]
pub enum RunError {
    /// A step named a successor that was never registered.
    #[error("unknown step: {0}")]
    UnknownStep(StepName),

    /// A step failed fatally or exhausted its retries.
    #[error("step '{step}' failed after {attempts} attempt(s): {error}")]
    StepFailed {
        step: StepName,
        /// Attempts actually consumed, retries included.
        attempts: u32,
        #[source]
        error: StepError,
    },
}

impl RunError {
    /// Name of the step the run failed at.
    pub fn step(&self) -> &StepName {
        match self {
            RunError::UnknownStep(name) => name,
            RunError::StepFailed { step, .. } => step,
        }
    }
}

/// Returned by [`RunnerBuilder::build`](crate::RunnerBuilder::build) when
/// the step chain is not wired up correctly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("start step must be set")]
    NoStartStep,
    #[error("start step '{0}' is not registered")]
    StartStepMissing(StepName),
}
