//! JSON-RPC client with per-call timeouts and provider failover.
//!
//! # Responsibilities
//! - Connect to the primary endpoint plus any failover endpoints
//! - Query head block, block timestamps and contract logs
//! - Verify the connected chain matches configuration

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::eips::BlockNumberOrTag;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Filter, Log};
use alloy::transports::TransportResult;
use metrics::gauge;
use tokio::time::timeout;

use crate::blockchain::types::{BlockchainConfig, BlockchainError, BlockchainResult, ChainId};

type DynProvider = Arc<dyn Provider + Send + Sync>;

/// Blockchain RPC client wrapper with failover support.
#[derive(Clone)]
pub struct BlockchainClient {
    /// Primary first, then failovers in configured order.
    providers: Vec<DynProvider>,
    config: BlockchainConfig,
    timeout_duration: Duration,
}

impl BlockchainClient {
    /// Build providers for every configured URL.
    ///
    /// A chain id mismatch or unreachable endpoint is logged, not fatal:
    /// the relay reports a connection error at start instead.
    pub async fn new(config: BlockchainConfig) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut providers = Vec::new();

        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        providers.push(Arc::new(ProviderBuilder::new().connect_http(primary_url)) as DynProvider);

        for url_str in &config.failover_urls {
            if let Ok(url) = url_str.parse() {
                providers.push(Arc::new(ProviderBuilder::new().connect_http(url)) as DynProvider);
            } else {
                tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL");
            }
        }

        let client = Self {
            providers,
            config: config.clone(),
            timeout_duration,
        };

        match client.verify_chain_id().await {
            Ok(()) => tracing::info!(
                rpc_url = %config.rpc_url,
                chain_id = config.chain_id,
                "Blockchain client initialized"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                "Blockchain client initialized but chain verification failed"
            ),
        }

        Ok(client)
    }

    /// Run `call` against each provider in turn until one answers in time.
    async fn with_failover<T, F, Fut>(&self, what: &str, call: F) -> BlockchainResult<T>
    where
        F: Fn(DynProvider) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        for (i, provider) in self.providers.iter().enumerate() {
            match timeout(self.timeout_duration, call(provider.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    tracing::warn!(provider_idx = i, call = what, error = %e, "RPC error, trying next provider")
                }
                Err(_) => tracing::warn!(provider_idx = i, call = what, "RPC timeout, trying next provider"),
            }
        }
        Err(BlockchainError::Rpc(format!("All RPC providers failed: {what}")))
    }

    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.with_failover("eth_chainId", |p| async move { p.get_chain_id().await })
            .await
            .map(ChainId)
    }

    pub async fn get_block_number(&self) -> BlockchainResult<u64> {
        self.with_failover("eth_blockNumber", |p| async move { p.get_block_number().await })
            .await
    }

    /// Timestamp (seconds) of block `number`, if the node knows the block.
    pub async fn get_block_timestamp(&self, number: u64) -> BlockchainResult<Option<u64>> {
        let block = self
            .with_failover("eth_getBlockByNumber", |p| async move {
                p.get_block_by_number(BlockNumberOrTag::Number(number)).await
            })
            .await?;
        Ok(block.map(|b| b.header.timestamp))
    }

    pub async fn get_logs(&self, filter: &Filter) -> BlockchainResult<Vec<Log>> {
        self.with_failover("eth_getLogs", |p| {
            let filter = filter.clone();
            async move { p.get_logs(&filter).await }
        })
        .await
    }

    /// True when some provider answers `eth_blockNumber`.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.get_block_number().await.is_ok();
        gauge!("relay_chain_rpc_healthy").set(if healthy { 1.0 } else { 0.0 });
        healthy
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    pub fn confirmation_blocks(&self) -> u32 {
        self.config.confirmation_blocks
    }
}

impl std::fmt::Debug for BlockchainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainClient")
            .field("rpc_url", &self.config.rpc_url)
            .field("providers", &self.providers.len())
            .field("chain_id", &self.config.chain_id)
            .finish()
    }
}
