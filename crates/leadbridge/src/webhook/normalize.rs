//! Structural probing over the payload shapes amoCRM has emitted.
//!
//! Four generations of the webhook have been observed in production:
//!
//! 1. form-encoded flat bracket keys (`leads[status][0][id]`), decoded
//!    into a JSON object whose values are strings or one-element arrays;
//! 2. the same flat keys wrapped in an engine event envelope
//!    (`{ "data": { ... }, "id": ..., "ts": ... }`);
//! 3. nested entity/action arrays (`{ "leads": { "status": [ record ] } }`)
//!    with an `account` sibling;
//! 4. a pre-parsed object (`leadId`/`lead_id`, optionally under
//!    `parsedData`).
//!
//! Shapes are probed in that order and nothing is guessed: a payload that
//! matches none of them is an [`IntegrationError::UnrecognizedShape`].

use crate::error::IntegrationError;
use crate::webhook::RecordHint;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use url::form_urlencoded;

/// The canonical change record the parse step hands downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChangeRecord {
    pub record_id: String,
    pub account_id: Option<String>,
    pub subdomain: Option<String>,
    pub pipeline_id: Option<String>,
    pub status_id: Option<String>,
    pub old_pipeline_id: Option<String>,
    pub old_status_id: Option<String>,
    pub pipeline_changed: bool,
    pub status_changed: bool,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct RawFields {
    record_id: Option<String>,
    account_id: Option<String>,
    subdomain: Option<String>,
    pipeline_id: Option<String>,
    status_id: Option<String>,
    old_pipeline_id: Option<String>,
    old_status_id: Option<String>,
    entity: Option<String>,
    action: Option<String>,
}

/// Strict extraction: the parse step's entry point.
pub fn parse_record(
    raw: &Value,
    received_at: DateTime<Utc>,
) -> Result<ParsedChangeRecord, IntegrationError> {
    let fields = extract(raw).ok_or(IntegrationError::UnrecognizedShape)?;
    let record_id = fields.record_id.ok_or(IntegrationError::MissingRecordId)?;

    // Changed flags are pure functions of the id pairs: a side that is
    // present against one that is absent counts as changed.
    let pipeline_changed = fields.pipeline_id != fields.old_pipeline_id;
    let status_changed = fields.status_id != fields.old_status_id;

    Ok(ParsedChangeRecord {
        record_id,
        account_id: fields.account_id,
        subdomain: fields.subdomain,
        pipeline_id: fields.pipeline_id,
        status_id: fields.status_id,
        old_pipeline_id: fields.old_pipeline_id,
        old_status_id: fields.old_status_id,
        pipeline_changed,
        status_changed,
        received_at,
    })
}

/// Lenient extraction for ingestion-time hints.
pub fn hints(raw: &Value) -> RecordHint {
    match extract(raw) {
        Some(fields) => RecordHint {
            record_id: fields.record_id,
            account_id: fields.account_id,
            subdomain: fields.subdomain,
        },
        None => RecordHint::default(),
    }
}

/// Entity/action labels, if the payload shape reveals them.
pub fn infer_labels(raw: &Value) -> (Option<String>, Option<String>) {
    match extract(raw) {
        Some(fields) => (fields.entity, fields.action),
        None => (None, None),
    }
}

/// Decodes a form-encoded body into the flat-key JSON object shape, with
/// repeated keys collected into arrays the way the original webhook
/// platform presented them.
pub fn form_to_value(body: &[u8]) -> Value {
    let mut map = Map::new();
    for (key, value) in form_urlencoded::parse(body) {
        let entry = map
            .entry(key.into_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(Value::String(value.into_owned()));
        }
    }
    Value::Object(map)
}

fn extract(raw: &Value) -> Option<RawFields> {
    let obj = raw.as_object()?;

    if obj.keys().any(|k| k.contains('[')) {
        return Some(from_flat(obj));
    }
    if let Some(data) = obj.get("data").and_then(Value::as_object) {
        if data.keys().any(|k| k.contains('[')) {
            return Some(from_flat(data));
        }
    }
    if let Some(fields) = from_nested(obj) {
        return Some(fields);
    }
    from_pre_parsed(obj)
}

fn from_flat(map: &Map<String, Value>) -> RawFields {
    let mut fields = RawFields::default();
    for (key, value) in map {
        let segments = split_bracket_key(key);
        let Some(value) = scalar(value) else {
            continue;
        };
        match segments.as_slice() {
            ["account", "id"] => fields.account_id = Some(value),
            ["account", "subdomain"] => fields.subdomain = Some(value),
            [entity, action, "0", field] => {
                fields.entity.get_or_insert_with(|| entity.to_string());
                fields.action.get_or_insert_with(|| action.to_string());
                set_record_field(&mut fields, field, value);
            }
            _ => {}
        }
    }
    fields
}

fn from_nested(obj: &Map<String, Value>) -> Option<RawFields> {
    let (entity, actions) = obj.iter().find_map(|(key, value)| {
        if key == "account" {
            return None;
        }
        let actions = value.as_object()?;
        actions
            .values()
            .any(Value::is_array)
            .then(|| (key, actions))
    })?;
    let (action, records) = actions
        .iter()
        .find_map(|(action, value)| Some((action, value.as_array()?)))?;
    let record = records.first()?.as_object()?;

    let mut fields = RawFields {
        entity: Some(entity.clone()),
        action: Some(action.clone()),
        ..RawFields::default()
    };
    for (field, value) in record {
        if let Some(value) = scalar(value) {
            set_record_field(&mut fields, field, value);
        }
    }
    if let Some(account) = obj.get("account").and_then(Value::as_object) {
        fields.account_id = account.get("id").and_then(scalar);
        fields.subdomain = account.get("subdomain").and_then(scalar);
    }
    Some(fields)
}

fn from_pre_parsed(obj: &Map<String, Value>) -> Option<RawFields> {
    // The engine event generation nested the canonical data one level down.
    if let Some(parsed) = obj.get("parsedData").and_then(Value::as_object) {
        let mut fields = from_pre_parsed(parsed)?;
        fields.entity = fields
            .entity
            .or_else(|| obj.get("entity").and_then(scalar));
        fields.action = fields
            .action
            .or_else(|| obj.get("action").and_then(scalar));
        return Some(fields);
    }

    let record_id = pick(obj, &["leadId", "lead_id", "recordId", "record_id"])?;
    Some(RawFields {
        record_id: Some(record_id),
        account_id: pick(obj, &["accountId", "account_id"]),
        subdomain: pick(obj, &["subdomain"]),
        pipeline_id: pick(obj, &["pipelineId", "pipeline_id"]),
        status_id: pick(obj, &["statusId", "status_id"]),
        old_pipeline_id: pick(obj, &["oldPipelineId", "old_pipeline_id"]),
        old_status_id: pick(obj, &["oldStatusId", "old_status_id"]),
        entity: obj.get("entity").and_then(scalar),
        action: obj.get("action").and_then(scalar),
    })
}

fn set_record_field(fields: &mut RawFields, field: &str, value: String) {
    match field {
        "id" => fields.record_id = Some(value),
        "status_id" => fields.status_id = Some(value),
        "pipeline_id" => fields.pipeline_id = Some(value),
        "old_status_id" => fields.old_status_id = Some(value),
        "old_pipeline_id" => fields.old_pipeline_id = Some(value),
        _ => {}
    }
}

fn pick(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(scalar))
}

/// `"leads[status][0][id]"` → `["leads", "status", "0", "id"]`.
fn split_bracket_key(key: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut rest = key;
    if let Some(open) = rest.find('[') {
        segments.push(&rest[..open]);
        rest = &rest[open..];
    } else {
        segments.push(rest);
        return segments;
    }
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        segments.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    segments
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(scalar),
        _ => None,
    }
}
