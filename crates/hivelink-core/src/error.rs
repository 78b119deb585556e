//! Error taxonomy for the node client.
//!
//! Every error here is `Clone`: a single transport failure is attached to
//! every placeholder of the batch it belongs to, and each placeholder hands
//! out its own copy on access.

use serde_json::Value;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("batch closed without any queued calls")]
    NothingToSend,

    #[error("response not ready: the batch holding this call has not been closed")]
    ResponseNotReady,

    #[error(transparent)]
    Communication(#[from] CommunicationError),

    #[error("cannot decode `{method}` result: {message}")]
    Decode { method: String, message: String },

    #[error("batch response holds {received} items but {expected} calls were sent")]
    BatchSizeMismatch { expected: usize, received: usize },

    #[error("invalid batch response: {0}")]
    InvalidBatchResponse(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CoreError {
    /// The communication failure behind this error, if any.
    pub fn as_communication(&self) -> Option<&CommunicationError> {
        match self {
            Self::Communication(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure talking to the node, split by whether the node answered at all.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommunicationError {
    /// Nothing usable came back: connect failure, timeout, or a body that
    /// is not JSON.
    #[error("no response from {url}: {reason}")]
    NoResponse {
        url: String,
        request: String,
        reason: String,
    },

    /// The node answered, but with a JSON-RPC error (for the whole batch or
    /// for one call inside it).
    #[error("{url} answered with an error: {message}")]
    WithResponse {
        url: String,
        request: String,
        response: Value,
        code: Option<i64>,
        message: String,
    },
}

impl CommunicationError {
    pub fn url(&self) -> &str {
        match self {
            Self::NoResponse { url, .. } | Self::WithResponse { url, .. } => url,
        }
    }

    /// Serialized request this error is scoped to: the whole batch envelope
    /// for aggregate failures, a single call for per-item failures.
    pub fn request(&self) -> &str {
        match self {
            Self::NoResponse { request, .. } | Self::WithResponse { request, .. } => request,
        }
    }

    pub fn response(&self) -> Option<&Value> {
        match self {
            Self::NoResponse { .. } => None,
            Self::WithResponse { response, .. } => Some(response),
        }
    }

    /// JSON-RPC error code, when the node sent a standard error object.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::NoResponse { .. } => None,
            Self::WithResponse { code, .. } => *code,
        }
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self, Self::NoResponse { .. })
    }
}

/// Error raised by a [`Transport`](crate::rpc::Transport) implementation.
///
/// `response` is set when the server did answer with a parseable JSON body
/// (typically an HTTP error status carrying a JSON-RPC error object).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub response: Option<Value>,
}

impl TransportError {
    pub fn no_response(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(message: impl Into<String>, response: Value) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }
}
