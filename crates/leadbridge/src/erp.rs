//! ERP custom insert API client.
//!
//! The ERP exposes a single action-dispatch endpoint; tasks are created by
//! an `insert` action against a fixed entity category. The `field_*`
//! numbers are the ERP's schema identifiers and must not be renamed.

use crate::config::ErpConfig;
use crate::error::IntegrationError;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    key: &'a str,
    username: &'a str,
    password: &'a str,
    action: &'static str,
    entity_id: u32,
    items: InsertItems<'a>,
}

#[derive(Debug, Serialize)]
struct InsertItems<'a> {
    /// Task name.
    field_1039: &'a str,
    /// Amount. Omitted as a key, not nulled, when there is none.
    #[serde(skip_serializing_if = "Option::is_none")]
    field_1040: Option<i64>,
}

/// What the ERP answered for one insert.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_id: Option<i64>,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ErpClient {
    http: reqwest::Client,
    config: ErpConfig,
}

impl ErpClient {
    pub fn new(config: ErpConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Inserts one task. Not idempotent: the insert API has no dedup key,
    /// so repeating this call creates a second task.
    ///
    /// An amount of zero is treated like an absent one and left out of the
    /// request entirely.
    pub async fn create_task(
        &self,
        name: &str,
        amount: Option<i64>,
    ) -> Result<TaskResult, IntegrationError> {
        let request = InsertRequest {
            key: &self.config.key,
            username: &self.config.username,
            password: &self.config.password,
            action: "insert",
            entity_id: self.config.entity_id,
            items: InsertItems {
                field_1039: name,
                field_1040: amount.filter(|a| *a != 0),
            },
        };

        let response = self
            .http
            .post(self.config.url.clone())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IntegrationError::ErpApi {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let raw: Value = response.json().await?;
        let task_id = raw.pointer("/data/id").and_then(Value::as_i64);
        Ok(TaskResult { task_id, raw })
    }
}
