use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// One HTTP round-trip to a node.
///
/// Implementations own timeouts, retries and authentication. Callers treat
/// any returned error as final.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `body` to `url` and return the parsed JSON reply.
    ///
    /// A reply with an error status but a JSON body is reported as a
    /// [`TransportError`] whose `response` is set.
    async fn post(&self, url: &str, body: &Value) -> Result<Value, TransportError>;
}
