//! Many calls, one HTTP round-trip.
//!
//! A [`BatchSession`] queues calls and hands back a [`Delayed`] placeholder
//! for each. [`BatchSession::close`] sends all of them as one JSON array and
//! settles every placeholder, successful or not, before it returns.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{CommunicationError, CoreError, TransportError};

use super::delayed::{Delayed, PendingSlot};
use super::node::Node;
use super::protocol::{parse_batch_id, rejected, JsonRpcRequest};
use super::types::{OnlineStatus, Request};

/// What [`BatchSession::close`] does once failures are attached to their
/// placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Return the failure from `close`.
    #[default]
    Immediate,
    /// Return `Ok` from `close`; failures surface when a placeholder is read.
    DeferToAccess,
}

struct QueuedCall {
    body: Value,
    slot: Box<dyn PendingSlot>,
}

/// Calls queued for one batched round-trip to a [`Node`].
///
/// Closing consumes the session. Dropping it unclosed sends nothing and
/// leaves its placeholders pending.
pub struct BatchSession<'a> {
    node: &'a Node,
    policy: ErrorPolicy,
    calls: Vec<QueuedCall>,
}

impl<'a> BatchSession<'a> {
    pub(super) fn open(node: &'a Node, policy: ErrorPolicy) -> Self {
        Self {
            node,
            policy,
            calls: Vec::new(),
        }
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Queue a call whose result decodes as `T`. No I/O happens here.
    pub fn add<T>(&mut self, request: Request) -> Delayed<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let id = self.calls.len() as u64;
        let body = JsonRpcRequest::new(&request.method, &request.params, id).to_value();
        let delayed = Delayed::pending(id, &request.method, self.node.url(), body.to_string());
        self.calls.push(QueuedCall {
            body,
            slot: Box::new(delayed.clone()),
        });
        delayed
    }

    /// Give up on the queued calls without sending them.
    pub(super) fn abandon(mut self) {
        debug!(
            rpc.batch_size = self.calls.len(),
            "batch abandoned before close"
        );
        self.calls.clear();
    }

    /// Send every queued call in one request and settle all placeholders.
    ///
    /// Whatever the outcome, every placeholder is settled before this
    /// returns. Under [`ErrorPolicy::Immediate`] a failure is also returned
    /// here. A response that breaks the batch contract (wrong item count,
    /// bad or repeated ids) is always returned.
    pub async fn close(mut self) -> Result<(), CoreError> {
        let calls = std::mem::take(&mut self.calls);
        if calls.is_empty() {
            return Err(CoreError::NothingToSend);
        }

        let url = self.node.url();
        let envelope = Value::Array(calls.iter().map(|call| call.body.clone()).collect());
        debug!(rpc.batch_size = calls.len(), "rpc batch call");

        let response = match self.node.post(&envelope).await {
            Ok(response) => response,
            Err(TransportError {
                message,
                response: None,
            }) => {
                self.node.set_online_status(OnlineStatus::Offline);
                warn!(rpc.batch_size = calls.len(), error = %message, "rpc batch got no response");
                let err = CommunicationError::NoResponse {
                    url: url.to_owned(),
                    request: envelope.to_string(),
                    reason: message,
                };
                return self.fail_all(&calls, err.into());
            }
            Err(TransportError {
                response: Some(response),
                ..
            }) => response,
        };
        trace!(rpc.batch_size = calls.len(), response = %response, "rpc batch response");

        let items = match response {
            Value::Array(items) => items,
            other => {
                debug!(rpc.batch_size = calls.len(), "rpc batch rejected as a whole");
                let err = rejected(url, envelope.to_string(), other);
                return self.fail_all(&calls, err.into());
            }
        };

        let items = match order_by_id(items, calls.len()) {
            Ok(items) => items,
            Err(err) => {
                warn!(rpc.batch_size = calls.len(), error = %err, "rpc batch response violates contract");
                for call in &calls {
                    call.slot.fail(err.clone());
                }
                return Err(err);
            }
        };
        self.node.set_online_status(OnlineStatus::Online);

        let mut failed = Vec::new();
        for (call, item) in calls.iter().zip(items) {
            if !call.slot.resolve(&item) {
                failed.push(item);
            }
        }
        debug!(
            rpc.batch_size = calls.len(),
            rpc.batch_failed = failed.len(),
            "rpc batch response distributed"
        );

        if failed.is_empty() || self.policy == ErrorPolicy::DeferToAccess {
            return Ok(());
        }
        Err(CommunicationError::WithResponse {
            url: url.to_owned(),
            request: envelope.to_string(),
            message: format!("{} of {} batched calls failed", failed.len(), calls.len()),
            response: Value::Array(failed),
            code: None,
        }
        .into())
    }

    fn fail_all(&self, calls: &[QueuedCall], err: CoreError) -> Result<(), CoreError> {
        for call in calls {
            call.slot.fail(err.clone());
        }
        match self.policy {
            ErrorPolicy::Immediate => Err(err),
            ErrorPolicy::DeferToAccess => Ok(()),
        }
    }
}

impl Drop for BatchSession<'_> {
    fn drop(&mut self) {
        if !self.calls.is_empty() {
            warn!(
                rpc.batch_size = self.calls.len(),
                "batch dropped before close; its placeholders stay pending"
            );
        }
    }
}

/// Put batch response items in submission order, matching on `id`.
///
/// Ids are the zero-based submission positions, so every id must be in
/// range and appear exactly once.
fn order_by_id(items: Vec<Value>, expected: usize) -> Result<Vec<Value>, CoreError> {
    if items.len() != expected {
        return Err(CoreError::BatchSizeMismatch {
            expected,
            received: items.len(),
        });
    }

    let mut ordered: Vec<Option<Value>> = vec![None; expected];
    for item in items {
        let id = parse_batch_id(item.get("id"))?;
        let slot = usize::try_from(id)
            .ok()
            .and_then(|index| ordered.get_mut(index))
            .ok_or_else(|| {
                CoreError::InvalidBatchResponse(format!(
                    "response id {id} does not match any of the {expected} calls"
                ))
            })?;
        if slot.is_some() {
            return Err(CoreError::InvalidBatchResponse(format!(
                "response id {id} appears more than once"
            )));
        }
        *slot = Some(item);
    }

    // Count and uniqueness checks above leave no gaps.
    Ok(ordered.into_iter().flatten().collect())
}
