//! HTTP implementation of [`Transport`](super::Transport) using `reqwest`,
//! with basic auth, optional request rate limiting and retry of
//! no-response failures.

mod client;
mod connection;

pub use client::HttpTransport;
pub(crate) use connection::parse_node_url;
