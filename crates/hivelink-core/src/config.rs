//! Connection settings for a node client and its HTTP transport.

use std::time::Duration;

/// Settings for [`Node`](crate::rpc::Node).
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// JSON-RPC endpoint, `http://` or `https://`.
    pub url: String,
    /// Chain id known up front. When set, `Node::chain_id` never asks the node.
    pub chain_id: Option<String>,
    pub transport: HttpTransportConfig,
}

impl NodeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            chain_id: None,
            transport: HttpTransportConfig::default(),
        }
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = Some(chain_id.into());
        self
    }
}

/// Settings for [`HttpTransport`](crate::rpc::HttpTransport).
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Basic-auth credentials, for nodes behind an authenticating proxy.
    /// Set both or neither.
    pub user: Option<String>,
    pub pass: Option<String>,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// Outbound request cap. A batch counts as one request.
    pub requests_per_second: Option<u32>,
    /// Extra attempts after a failure that produced no response at all.
    pub max_retries: u32,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            user: None,
            pass: None,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
            requests_per_second: None,
            max_retries: 0,
        }
    }
}
