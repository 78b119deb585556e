//! Node RPC layer.
//!
//! [`Node`] sends single JSON-RPC calls and opens [`BatchSession`]s that
//! aggregate many calls into one HTTP round-trip, handing back a
//! [`Delayed`] placeholder per call. Requests travel through a
//! [`Transport`]; [`HttpTransport`] is the `reqwest` implementation and
//! `mock::MockTransport` the scripted one used in tests.

mod batch;
mod decode;
mod delayed;
mod http_adapter;
#[cfg(test)]
pub mod mock;
mod node;
mod protocol;
mod transport;
pub mod types;

pub use batch::{BatchSession, ErrorPolicy};
pub use delayed::{Delayed, DelayedState};
pub use http_adapter::HttpTransport;
pub use node::Node;
pub use transport::Transport;
pub use types::{BasicInfo, DynamicGlobalProperties, NetworkType, OnlineStatus, Request, Version};
