//! Placeholders for calls queued in a [`BatchSession`](super::BatchSession).
//!
//! A [`Delayed<T>`] is handed out as soon as a call is queued. It stays
//! pending until the batch is closed, then holds either the decoded `T` or
//! the error for that call. Every accessor checks the state first, so early
//! access fails deterministically with [`CoreError::ResponseNotReady`].

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::CoreError;

use super::decode::{decode, DecodeError};
use super::protocol::rejected;

/// Observable state of a [`Delayed`] placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedState {
    Pending,
    Resolved,
    Failed,
}

#[derive(Debug)]
enum Outcome<T> {
    Pending,
    Resolved(T),
    Failed(CoreError),
}

struct Shared<T> {
    id: u64,
    method: String,
    url: String,
    request: String,
    outcome: Mutex<Outcome<T>>,
}

/// Result of one batched call, available once the batch is closed.
///
/// Clones share the same slot.
pub struct Delayed<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Delayed<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Delayed<T> {
    pub(crate) fn pending(id: u64, method: &str, url: &str, request: String) -> Self {
        Self {
            shared: Arc::new(Shared {
                id,
                method: method.to_owned(),
                url: url.to_owned(),
                request,
                outcome: Mutex::new(Outcome::Pending),
            }),
        }
    }

    /// Sequence id of the call inside its batch.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn method(&self) -> &str {
        &self.shared.method
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// The serialized JSON-RPC call, as sent.
    pub fn request(&self) -> &str {
        &self.shared.request
    }

    pub fn state(&self) -> DelayedState {
        match &*self.lock() {
            Outcome::Pending => DelayedState::Pending,
            Outcome::Resolved(_) => DelayedState::Resolved,
            Outcome::Failed(_) => DelayedState::Failed,
        }
    }

    /// The stored failure, if the call failed.
    pub fn error(&self) -> Option<CoreError> {
        match &*self.lock() {
            Outcome::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    /// Read from the decoded result.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, CoreError> {
        match &*self.lock() {
            Outcome::Pending => Err(CoreError::ResponseNotReady),
            Outcome::Failed(err) => Err(err.clone()),
            Outcome::Resolved(value) => Ok(f(value)),
        }
    }

    /// Mutate the decoded result in place. Later reads observe the change.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, CoreError> {
        match &mut *self.lock() {
            Outcome::Pending => Err(CoreError::ResponseNotReady),
            Outcome::Failed(err) => Err(err.clone()),
            Outcome::Resolved(value) => Ok(f(value)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Outcome<T>> {
        self.shared
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Store the outcome. Only the first call has an effect.
    fn settle(&self, outcome: Result<T, CoreError>) {
        let mut slot = self.lock();
        if matches!(*slot, Outcome::Pending) {
            *slot = match outcome {
                Ok(value) => Outcome::Resolved(value),
                Err(err) => Outcome::Failed(err),
            };
        }
    }
}

impl<T: Clone> Delayed<T> {
    /// A copy of the decoded result.
    pub fn get(&self) -> Result<T, CoreError> {
        self.read(T::clone)
    }
}

impl<T: fmt::Debug> fmt::Debug for Delayed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delayed")
            .field("id", &self.shared.id)
            .field("method", &self.shared.method)
            .field("outcome", &*self.lock())
            .finish()
    }
}

// ==============================================================================
// Type-erased slot
// ==============================================================================

/// What a batch needs from a queued placeholder, independent of its `T`.
pub(crate) trait PendingSlot: Send + Sync {
    /// Settle from one batch response item. Returns `false` when the item
    /// turned into a failure for this call.
    fn resolve(&self, item: &Value) -> bool;

    fn fail(&self, error: CoreError);
}

impl<T> PendingSlot for Delayed<T>
where
    T: DeserializeOwned + Send + 'static,
{
    fn resolve(&self, item: &Value) -> bool {
        let outcome = match decode::<T>(&self.shared.method, item) {
            Ok(value) => Ok(value),
            Err(DecodeError::Protocol) => Err(CoreError::Communication(rejected(
                &self.shared.url,
                self.shared.request.clone(),
                item.clone(),
            ))),
            Err(DecodeError::Malformed(message)) => Err(CoreError::Decode {
                method: self.shared.method.clone(),
                message,
            }),
        };
        let ok = outcome.is_ok();
        self.settle(outcome);
        ok
    }

    fn fail(&self, error: CoreError) {
        self.settle(Err(error));
    }
}
