//! Shared test helpers for `hivelink-core` unit tests.
//!
//! Canned `database_api` payloads and a node wired to a scripted transport,
//! so tests across modules build the same dummy data.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::NodeConfig;
use crate::rpc::mock::MockTransport;
use crate::rpc::Node;

pub const MAINNET_CHAIN_ID: &str =
    "beeab0de00000000000000000000000000000000000000000000000000000000";

// ==============================================================================
// Node
// ==============================================================================

/// A node at a fixed address talking through `transport`.
pub fn node_with(transport: Arc<MockTransport>) -> Node {
    Node::new(&NodeConfig::new("https://api.hive.blog"), transport)
        .expect("static test config is valid")
}

// ==============================================================================
// database_api Payloads
// ==============================================================================

pub fn config_json() -> Value {
    json!({
        "HIVE_BLOCKCHAIN_VERSION": "1.27.0",
        "HIVE_BLOCK_INTERVAL": 3,
        "HIVE_ADDRESS_PREFIX": "STM",
    })
}

pub fn version_json() -> Value {
    json!({
        "blockchain_version": "1.27.0",
        "hive_revision": "a1b2c3d4",
        "fc_revision": "a1b2c3d4",
        "chain_id": MAINNET_CHAIN_ID,
        "node_type": "mainnet",
    })
}

pub fn dgp_json(head_block_number: u32) -> Value {
    json!({
        "id": 0,
        "head_block_number": head_block_number,
        "head_block_id": format!("{head_block_number:08x}00000000000000000000000000000000"),
        "time": "2024-05-01T12:00:00",
        "current_witness": "blocktrades",
        "last_irreversible_block_num": head_block_number.saturating_sub(20),
        "current_supply": "400000000.000 HIVE",
    })
}

/// Batch reply to the three node-info calls, deliberately out of order.
pub fn basic_info_reply(head_block_number: u32) -> Value {
    json!([
        {"jsonrpc": "2.0", "id": 2, "result": dgp_json(head_block_number)},
        {"jsonrpc": "2.0", "id": 0, "result": config_json()},
        {"jsonrpc": "2.0", "id": 1, "result": version_json()},
    ])
}
