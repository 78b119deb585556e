use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info, trace};

use crate::cache::LazyCache;
use crate::config::NodeConfig;
use crate::error::{CommunicationError, CoreError, TransportError};

use super::batch::{BatchSession, ErrorPolicy};
use super::decode::{decode, DecodeError};
use super::http_adapter::{parse_node_url, HttpTransport};
use super::protocol::{rejected, JsonRpcRequest};
use super::types::{methods, BasicInfo, DynamicGlobalProperties, OnlineStatus, Request, Version};
use super::Transport;

/// JSON-RPC client bound to one node address.
///
/// Sends single calls, opens batches, tracks whether the node answered the
/// last exchange, and caches the node's [`BasicInfo`].
pub struct Node {
    url: String,
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    online: AtomicU8,
    info: LazyCache<BasicInfo>,
    chain_id: OnceCell<String>,
}

impl Node {
    /// Create a client over an explicit transport.
    pub fn new(config: &NodeConfig, transport: Arc<dyn Transport>) -> Result<Self, CoreError> {
        let url = parse_node_url(&config.url)?;
        Ok(Self {
            url,
            transport,
            next_id: AtomicU64::new(0),
            online: AtomicU8::new(OnlineStatus::Unknown.to_u8()),
            info: LazyCache::new(),
            chain_id: OnceCell::new_with(config.chain_id.clone()),
        })
    }

    /// Create a client over HTTP, configured from `config.transport`.
    pub fn connect(config: &NodeConfig) -> Result<Self, CoreError> {
        let transport = HttpTransport::new(&config.transport)?;
        Self::new(config, Arc::new(transport))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn online_status(&self) -> OnlineStatus {
        OnlineStatus::from_u8(self.online.load(Ordering::Relaxed))
    }

    pub(super) fn set_online_status(&self, status: OnlineStatus) {
        self.online.store(status.to_u8(), Ordering::Relaxed);
    }

    /// Point the client at another node. Cached node info is dropped and the
    /// online status goes back to unknown. A known chain id is kept.
    pub fn set_url(&mut self, url: &str) -> Result<(), CoreError> {
        self.url = parse_node_url(url)?;
        self.info.clear();
        self.set_online_status(OnlineStatus::Unknown);
        Ok(())
    }

    pub(super) async fn post(&self, body: &Value) -> Result<Value, TransportError> {
        self.transport.post(&self.url, body).await
    }

    /// Send one call and decode its result as `T`.
    pub async fn send<T: DeserializeOwned>(&self, request: &Request) -> Result<T, CoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(rpc.id = id, rpc.method = %request.method, "rpc call");
        let body = JsonRpcRequest::new(&request.method, &request.params, id).to_value();

        let raw = match self.post(&body).await {
            Ok(raw) => raw,
            Err(TransportError {
                message,
                response: None,
            }) => {
                self.set_online_status(OnlineStatus::Offline);
                debug!(rpc.id = id, rpc.method = %request.method, error = %message, "rpc call got no response");
                return Err(CommunicationError::NoResponse {
                    url: self.url.clone(),
                    request: body.to_string(),
                    reason: message,
                }
                .into());
            }
            Err(TransportError {
                response: Some(response),
                ..
            }) => return Err(rejected(&self.url, body.to_string(), response).into()),
        };
        trace!(rpc.id = id, rpc.method = %request.method, response = %raw, "rpc response");

        match decode::<T>(&request.method, &raw) {
            Ok(value) => {
                self.set_online_status(OnlineStatus::Online);
                Ok(value)
            }
            Err(DecodeError::Protocol) => Err(rejected(&self.url, body.to_string(), raw).into()),
            Err(DecodeError::Malformed(message)) => {
                self.set_online_status(OnlineStatus::Online);
                Err(CoreError::Decode {
                    method: request.method.clone(),
                    message,
                })
            }
        }
    }

    /// Open an empty batch against this node.
    pub fn batch(&self, policy: ErrorPolicy) -> BatchSession<'_> {
        BatchSession::open(self, policy)
    }

    /// Queue calls with `build`, then send them as one batch.
    ///
    /// If `build` fails its error is returned as is and nothing is sent; the
    /// placeholders it queued stay pending. Otherwise the batch is closed,
    /// which fails with [`CoreError::NothingToSend`] when `build` queued
    /// nothing.
    pub async fn with_batch<R, E, F>(&self, policy: ErrorPolicy, build: F) -> Result<R, E>
    where
        F: FnOnce(&mut BatchSession<'_>) -> Result<R, E>,
        E: From<CoreError>,
    {
        let mut batch = self.batch(policy);
        match build(&mut batch) {
            Ok(value) => {
                batch.close().await?;
                Ok(value)
            }
            Err(err) => {
                batch.abandon();
                Err(err)
            }
        }
    }

    // ==========================================================================
    // Cached node info
    // ==========================================================================

    /// Node metadata, fetched on first use.
    ///
    /// Concurrent first callers share a single fetch.
    pub async fn cached_info(&self) -> Result<Arc<BasicInfo>, CoreError> {
        self.info.get_or_fetch(|| self.fetch_basic_info()).await
    }

    /// Drop cached node metadata; the next [`cached_info`](Self::cached_info)
    /// fetches it again.
    pub async fn invalidate_cache(&self) {
        self.info.invalidate().await;
    }

    /// Fetch fresh dynamic global properties, and store them in the cached
    /// info when they describe a later head block than the cached ones.
    pub async fn refresh_dynamic_global_properties(
        &self,
    ) -> Result<DynamicGlobalProperties, CoreError> {
        let fresh: DynamicGlobalProperties = self
            .send(&Request::without_params(methods::GET_DYNAMIC_GLOBAL_PROPERTIES))
            .await?;
        self.info
            .update(|info| {
                if fresh.is_newer_than(&info.dynamic_global_properties) {
                    info.dynamic_global_properties = fresh.clone();
                }
            })
            .await;
        Ok(fresh)
    }

    /// Chain id of the node: the configured one if any, else the one from
    /// [`cached_info`](Self::cached_info). Once known it is never asked for
    /// again.
    pub async fn chain_id(&self) -> Result<String, CoreError> {
        self.chain_id
            .get_or_try_init(|| async {
                let info = self.cached_info().await?;
                Ok::<_, CoreError>(info.chain_id.clone())
            })
            .await
            .cloned()
    }

    async fn fetch_basic_info(&self) -> Result<BasicInfo, CoreError> {
        let mut batch = self.batch(ErrorPolicy::Immediate);
        let config = batch.add::<Map<String, Value>>(Request::without_params(methods::GET_CONFIG));
        let version = batch.add::<Version>(Request::without_params(methods::GET_VERSION));
        let dgp = batch.add::<DynamicGlobalProperties>(Request::without_params(
            methods::GET_DYNAMIC_GLOBAL_PROPERTIES,
        ));
        batch.close().await?;

        let info = BasicInfo::new(config.get()?, version.get()?, dgp.get()?);
        info!(
            rpc.url = %self.url,
            chain_id = %info.chain_id,
            network = %info.network_type,
            head_block = info.dynamic_global_properties.head_block_number,
            "fetched node info"
        );
        Ok(info)
    }
}
