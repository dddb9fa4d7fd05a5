//! Integration error taxonomy.
//!
//! Configuration and validation failures are fatal: retrying a run cannot
//! fix a missing secret or a payload without a record id. Upstream
//! rejections and transport failures are transient and retried within each
//! step's bounded policy. Every upstream variant carries the HTTP status
//! and body so a failure can be diagnosed without re-running.

use crate::config::ConfigError;
use leadbridge_core::{FailureKind, StepError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No record id under any known field path. Fatal for the run: the
    /// payload will not change on retry.
    #[error("no record identifier in webhook payload")]
    MissingRecordId,

    /// Payload matched none of the known shapes. Never guessed at.
    #[error("webhook payload matches no known shape")]
    UnrecognizedShape,

    #[error("crm subdomain does not form a valid origin: {0}")]
    InvalidSubdomain(String),

    #[error("crm token exchange rejected with status {status}: {body}")]
    CrmAuth { status: u16, body: String },

    #[error("crm api returned status {status}: {body}")]
    CrmApi { status: u16, body: String },

    #[error("erp api returned status {status}: {body}")]
    ErpApi { status: u16, body: String },

    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

impl IntegrationError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IntegrationError::CrmAuth { .. }
                | IntegrationError::CrmApi { .. }
                | IntegrationError::ErpApi { .. }
                | IntegrationError::Transport(_)
        )
    }
}

impl From<IntegrationError> for StepError {
    fn from(err: IntegrationError) -> Self {
        let kind = if err.is_transient() {
            FailureKind::Transient
        } else {
            FailureKind::Fatal
        };
        StepError::with_source(kind, err)
    }
}
