pub mod cache;
pub mod config;
pub mod error;
pub mod rpc;

#[cfg(test)]
mod test_util;

pub use config::{HttpTransportConfig, NodeConfig};
pub use error::{CommunicationError, CoreError, TransportError};
pub use rpc::{BatchSession, Delayed, ErrorPolicy, Node, Request};
