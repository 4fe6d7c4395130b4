//! Request and response shapes of the batch endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

/// Path of the batch endpoint.
pub const BATCH_PATH: &str = "/api/batch";

/// Backend status code signalling success.
pub const SUCCESS_CODE: i64 = 200;

/// Message shown when the backend gives no reason for a failure.
pub const GENERIC_FAILURE_MESSAGE: &str = "请求失败";

/// CRUD verb understood by the batch endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Insert a record.
    Create,
    /// Read records.
    Query,
    /// Modify a record.
    Update,
    /// Remove a record.
    Delete,
}

/// Outbound batch request. Entity and action legality is left to the backend.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RequestEnvelope {
    /// Target entity name (for example `order` or `work_order`).
    pub entity: String,
    /// Operation to perform.
    pub action: Action,
    /// Record identifier for single-record operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Payload for create/update.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Filter for query/update/delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
    /// Related entities to load alongside the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<Vec<String>>,
}

impl RequestEnvelope {
    /// Start an envelope for `entity` and `action`.
    #[must_use]
    pub fn new(entity: impl Into<String>, action: Action) -> Self {
        Self {
            entity: entity.into(),
            action,
            id: None,
            data: None,
            conditions: None,
            fetch: None,
        }
    }

    /// Query `entity`.
    #[must_use]
    pub fn query(entity: impl Into<String>) -> Self {
        Self::new(entity, Action::Query)
    }

    /// Create a record of `entity` from `data`.
    #[must_use]
    pub fn create(entity: impl Into<String>, data: Value) -> Self {
        Self::new(entity, Action::Create).with_data(data)
    }

    /// Set the record identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the filter conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Value) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Set related entities to fetch.
    #[must_use]
    pub fn with_fetch<I, S>(mut self, fetch: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = Some(fetch.into_iter().map(Into::into).collect());
        self
    }
}

/// Inbound batch response.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BatchResponse {
    /// Backend status code.
    #[serde(default)]
    pub code: Option<i64>,
    /// Result payload.
    #[serde(default)]
    pub data: Value,
    /// Human-readable message.
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
    /// Alternative success flag used by some endpoints.
    #[serde(default)]
    pub success: Option<bool>,
}

impl BatchResponse {
    /// Whether the backend reported success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code.is_none_or(|code| code == SUCCESS_CODE) && self.success != Some(false)
    }

    /// Return the payload, or a business error when the backend refused.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Business`] when `code != 200` or `success == false`.
    pub fn into_data(self) -> ClientResult<Value> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ClientError::Business {
                code: self.code,
                message: self
                    .message
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
            })
        }
    }
}

/// Detect a business failure in an arbitrary response body.
///
/// Bodies carrying `code != 200` or `success == false` are failures; bodies
/// without either marker are accepted.
#[must_use]
pub fn business_failure(body: &Value) -> Option<ClientError> {
    let object = body.as_object()?;
    let code = object.get("code").and_then(Value::as_i64);
    let success = object.get("success").and_then(Value::as_bool);
    let failed = code.is_some_and(|code| code != SUCCESS_CODE) || success == Some(false);
    failed.then(|| ClientError::Business {
        code,
        message: failure_message(object).unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
    })
}

/// First non-empty message field of a response object.
pub(crate) fn failure_message(object: &Map<String, Value>) -> Option<String> {
    ["errorMessage", "message", "msg"]
        .iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .find(|message| !message.is_empty())
        .map(str::to_string)
}
