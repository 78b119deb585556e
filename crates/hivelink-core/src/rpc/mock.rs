use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

use super::Transport;

/// One scripted answer of [`MockTransport`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// A 2xx response with this JSON body.
    Body(Value),
    /// An error status whose body parsed as this JSON.
    ErrorBody(Value),
    /// No response at all.
    NoResponse(String),
}

/// A scripted transport for tests. Replies are consumed in order; once
/// they run out every call fails with no response.
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
    bodies: Mutex<Vec<Value>>,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder {
            replies: VecDeque::new(),
            latency: None,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request bodies received so far, in order.
    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().expect("mock lock poisoned").clone()
    }
}

pub struct MockTransportBuilder {
    replies: VecDeque<Reply>,
    latency: Option<Duration>,
}

impl MockTransportBuilder {
    pub fn reply(mut self, body: Value) -> Self {
        self.replies.push_back(Reply::Body(body));
        self
    }

    pub fn error_body(mut self, body: Value) -> Self {
        self.replies.push_back(Reply::ErrorBody(body));
        self
    }

    pub fn no_response(mut self, reason: &str) -> Self {
        self.replies.push_back(Reply::NoResponse(reason.to_owned()));
        self
    }

    /// Delay every reply, so concurrent callers overlap.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn build(self) -> MockTransport {
        MockTransport {
            replies: Mutex::new(self.replies),
            latency: self.latency,
            calls: AtomicUsize::new(0),
            bodies: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(&self, _url: &str, body: &Value) -> Result<Value, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .expect("mock lock poisoned")
            .push(body.clone());
        let reply = self
            .replies
            .lock()
            .expect("mock lock poisoned")
            .pop_front();

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match reply {
            Some(Reply::Body(body)) => Ok(body),
            Some(Reply::ErrorBody(body)) => {
                Err(TransportError::with_response("HTTP 500 Internal Server Error", body))
            }
            Some(Reply::NoResponse(reason)) => Err(TransportError::no_response(reason)),
            None => Err(TransportError::no_response("mock transport has no scripted reply")),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let mock = MockTransport::builder()
            .reply(json!({"id": 0, "result": 1}))
            .no_response("refused")
            .build();

        let first = mock.post("http://node", &json!({"n": 1})).await;
        assert_eq!(first.expect("scripted body"), json!({"id": 0, "result": 1}));

        let second = mock.post("http://node", &json!({"n": 2})).await;
        assert!(second.expect_err("scripted failure").response.is_none());

        let third = mock.post("http://node", &json!({"n": 3})).await;
        assert!(third.is_err());

        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.bodies()[1], json!({"n": 2}));
    }
}
