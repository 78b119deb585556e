//! Turns one raw JSON-RPC response object into the model a call expects.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::protocol::error_member;

#[derive(Debug)]
pub(crate) enum DecodeError {
    /// The response object carries a JSON-RPC `error` member.
    Protocol,
    /// The `result` does not fit the expected model.
    Malformed(String),
}

/// Decode `raw` (`{"id", "result"}` or `{"id", "error"}`) into `T`.
///
/// A missing `result` member decodes as JSON `null`, so methods that return
/// nothing can be requested as `()` or `Option<_>`.
pub(crate) fn decode<T: DeserializeOwned>(method: &str, raw: &Value) -> Result<T, DecodeError> {
    if error_member(raw).is_some() {
        return Err(DecodeError::Protocol);
    }

    let result = raw.get("result").unwrap_or(&Value::Null);
    T::deserialize(result).map_err(|e| DecodeError::Malformed(format!("{method}: {e}")))
}
