//! JSON-RPC 2.0 envelopes and the helpers that pick responses apart.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{CommunicationError, CoreError};

pub(crate) struct JsonRpcRequest<'a> {
    pub(crate) jsonrpc: &'static str,
    pub(crate) method: &'a str,
    pub(crate) params: &'a Value,
    pub(crate) id: u64,
}

impl<'a> JsonRpcRequest<'a> {
    pub(crate) fn new(method: &'a str, params: &'a Value, id: u64) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id,
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        serde_json::json!({
            "jsonrpc": self.jsonrpc,
            "method": self.method,
            "params": self.params,
            "id": self.id,
        })
    }
}

/// Standard JSON-RPC error object `{"code": <int>, "message": <string>}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    pub(crate) code: i64,
    pub(crate) message: String,
}

/// Extract `(code, message)` from a JSON-RPC `error` member.
///
/// Non-standard error payloads keep no code and use the raw JSON as message.
pub(crate) fn describe_error(err: &Value) -> (Option<i64>, String) {
    match ErrorObject::deserialize(err) {
        Ok(parsed) => (Some(parsed.code), parsed.message),
        Err(_) => (None, format!("non-standard JSON-RPC error: {err}")),
    }
}

/// The `error` member of a response object, when present and not null.
pub(crate) fn error_member(raw: &Value) -> Option<&Value> {
    raw.get("error").filter(|err| !err.is_null())
}

/// Build the error for a response that carries a JSON-RPC `error` member.
///
/// `request` is the serialized call (or batch) the response belongs to.
pub(crate) fn rejected(url: &str, request: String, response: Value) -> CommunicationError {
    let (code, message) = match error_member(&response) {
        Some(err) => describe_error(err),
        None => (None, format!("unexpected response: {response}")),
    };
    CommunicationError::WithResponse {
        url: url.to_owned(),
        request,
        response,
        code,
        message,
    }
}

pub(crate) fn parse_batch_id(id: Option<&Value>) -> Result<u64, CoreError> {
    let Some(id) = id else {
        return Err(CoreError::InvalidBatchResponse(
            "batch response item without id".to_owned(),
        ));
    };

    if let Some(n) = id.as_u64() {
        return Ok(n);
    }

    if let Some(s) = id.as_str() {
        return s.parse::<u64>().map_err(|e| {
            CoreError::InvalidBatchResponse(format!("invalid batch response id string: {e}"))
        });
    }

    Err(CoreError::InvalidBatchResponse(format!(
        "invalid batch response id: {id}"
    )))
}
