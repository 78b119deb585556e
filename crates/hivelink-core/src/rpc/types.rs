//! Requests and the node metadata models the client caches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==============================================================================
// Request
// ==============================================================================

/// A JSON-RPC call before it is given a sequence id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub params: Value,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// A call with empty named parameters (`{}`), the usual shape for
    /// `database_api` getters.
    pub fn without_params(method: impl Into<String>) -> Self {
        Self::new(method, Value::Object(Map::new()))
    }
}

pub mod methods {
    pub const GET_CONFIG: &str = "database_api.get_config";
    pub const GET_VERSION: &str = "database_api.get_version";
    pub const GET_DYNAMIC_GLOBAL_PROPERTIES: &str =
        "database_api.get_dynamic_global_properties";
}

// ==============================================================================
// Node Info
// ==============================================================================

/// Result of `database_api.get_version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub blockchain_version: String,
    pub hive_revision: String,
    pub fc_revision: String,
    pub chain_id: String,
    #[serde(default)]
    pub node_type: Option<String>,
}

/// Subset of `database_api.get_dynamic_global_properties`. Unlisted fields
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub head_block_number: u32,
    pub head_block_id: String,
    pub time: String,
    pub current_witness: String,
    pub last_irreversible_block_num: u32,
}

impl DynamicGlobalProperties {
    /// Whether `self` describes a later head block than `other`.
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self.head_block_number > other.head_block_number
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Mirrornet,
    Unknown(String),
}

impl NetworkType {
    pub fn from_node_type(node_type: Option<&str>) -> Self {
        match node_type {
            Some("mainnet") => Self::Mainnet,
            Some("testnet") => Self::Testnet,
            Some("mirrornet") => Self::Mirrornet,
            Some(other) => Self::Unknown(other.to_owned()),
            None => Self::Unknown(String::new()),
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Mirrornet => write!(f, "mirrornet"),
            Self::Unknown(raw) if raw.is_empty() => write!(f, "unknown"),
            Self::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// Node metadata fetched once and cached by [`Node`](super::Node).
#[derive(Debug, Clone, PartialEq)]
pub struct BasicInfo {
    /// `database_api.get_config`, kept raw: its keys vary between releases.
    pub config: Map<String, Value>,
    pub version: Version,
    pub chain_id: String,
    pub network_type: NetworkType,
    pub dynamic_global_properties: DynamicGlobalProperties,
}

impl BasicInfo {
    pub fn new(
        config: Map<String, Value>,
        version: Version,
        dynamic_global_properties: DynamicGlobalProperties,
    ) -> Self {
        let network_type = NetworkType::from_node_type(version.node_type.as_deref());
        Self {
            config,
            chain_id: version.chain_id.clone(),
            network_type,
            version,
            dynamic_global_properties,
        }
    }
}

// ==============================================================================
// Online Status
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnlineStatus {
    Unknown,
    Online,
    Offline,
}

impl OnlineStatus {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Online => 1,
            Self::Offline => 2,
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Online,
            2 => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for OnlineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}
