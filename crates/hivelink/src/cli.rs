use clap::{Parser, Subcommand};

/// hivelink: inspect a Hive JSON-RPC node, one call or one batch at a time.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Node JSON-RPC URL.
    #[arg(long, default_value = "https://api.hive.blog", env = "HIVELINK_NODE_URL")]
    pub node_url: String,

    /// RPC username (optional; most public nodes need no auth).
    #[arg(long, env = "HIVELINK_RPC_USER")]
    pub rpc_user: Option<String>,

    /// RPC password (optional; most public nodes need no auth).
    #[arg(long, env = "HIVELINK_RPC_PASS")]
    pub rpc_pass: Option<String>,

    /// Chain id to assume instead of asking the node.
    #[arg(long, env = "HIVELINK_CHAIN_ID")]
    pub chain_id: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Maximum outbound requests per second (a batch counts as one).
    #[arg(long)]
    pub requests_per_second: Option<u32>,

    /// Retries after a request gets no response at all.
    #[arg(long, default_value = "0")]
    pub max_retries: u32,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show chain id, network, version and head block of the node.
    Info,

    /// Send a single call and print its result.
    Call {
        /// Method name, e.g. `database_api.get_version`.
        method: String,

        /// Parameters as JSON. Defaults to `{}`.
        params: Option<String>,
    },

    /// Send several calls in one batch and print each outcome.
    Batch {
        /// Calls as `method` or `method=<json params>` (repeatable).
        #[arg(required = true)]
        calls: Vec<String>,

        /// Exit with an error when any call fails, instead of reporting it
        /// next to the others.
        #[arg(long)]
        strict: bool,
    },
}
