//! Inbound webhook ingestion: payload normalization and the HTTP endpoint.

pub mod normalize;
pub mod server;

use chrono::{DateTime, Utc};
use serde_json::Value;

/// Best-effort identifiers pulled out at ingestion time. Purely advisory;
/// the parse step re-extracts them authoritatively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordHint {
    pub record_id: Option<String>,
    pub account_id: Option<String>,
    pub subdomain: Option<String>,
}

/// One normalized inbound event per accepted HTTP call.
///
/// The raw payload is kept verbatim; ingestion never rejects a call just
/// because it could not locate a record id (the CRM would keep
/// redelivering), so a hint-less event is still enqueued and fails later
/// at the parse step.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub raw: Value,
    pub entity: Option<String>,
    pub action: Option<String>,
    pub hint: RecordHint,
    pub received_at: DateTime<Utc>,
}

impl InboundEvent {
    pub fn new(raw: Value) -> Self {
        let (entity, action) = normalize::infer_labels(&raw);
        let hint = normalize::hints(&raw);
        Self {
            raw,
            entity,
            action,
            hint,
            received_at: Utc::now(),
        }
    }
}
