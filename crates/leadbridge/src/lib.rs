//! Relays amoCRM status-change webhooks into ERP tasks.
//!
//! An inbound webhook becomes one pipeline run of five named steps:
//! `parse-webhook` → `authenticate` → `fetch-lead` → `create-task` →
//! `complete`. Parsing tolerates every payload shape amoCRM has emitted,
//! authentication exchanges the configured credential for a short-lived
//! token, the lead is re-read from the CRM as the authoritative record, the
//! ERP insert maps it onto the ERP's fixed field schema, and completion
//! folds everything into one summary for the logs.
//!
//! Steps talking to upstream systems retry transient failures up to three
//! times; malformed payloads and missing configuration fail the run
//! immediately. Runs are independent of each other: nothing is shared, no
//! ordering is guaranteed, and a redelivered webhook starts a second run.

pub mod config;
pub mod crm;
pub mod erp;
pub mod error;
pub mod pipeline;
pub mod webhook;
