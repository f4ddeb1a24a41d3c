//! Raw chain-state reads.
//!
//! [`ChainReader`] is the capability the rest of the system consumes; the
//! alloy-backed [`RpcChainReader`] talks JSON-RPC to one HTTP endpoint per
//! network. Reads at historical blocks require an archive node.

use std::collections::HashMap;

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use tracing::{debug, info};

use crate::{ChainError, Network};

/// Subset of a block header used for pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    /// Unix seconds
    pub timestamp: u64,
    /// EIP-1559 base fee in wei (absent before London)
    pub base_fee_per_gas: Option<u64>,
}

/// Read access to chain state.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Current chain head.
    async fn latest_block_number(&self, network: Network) -> Result<u64, ChainError>;

    /// Header of block `number`, or `None` past the chain head.
    async fn block_header(
        &self,
        network: Network,
        number: u64,
    ) -> Result<Option<BlockHeader>, ChainError>;

    /// `eth_call` against `to` with raw calldata at `block`.
    async fn call(
        &self,
        network: Network,
        to: Address,
        calldata: Bytes,
        block: u64,
    ) -> Result<Bytes, ChainError>;

    /// Deployed bytecode of `address` at `block` (empty if none).
    async fn code_at(
        &self,
        network: Network,
        address: Address,
        block: u64,
    ) -> Result<Bytes, ChainError>;
}

/// Execute a typed contract call at `block`.
///
/// Returns `Ok(None)` when the call returns no data, which is what a node
/// answers for an address without code at that block.
pub async fn call_typed<C: SolCall>(
    reader: &dyn ChainReader,
    network: Network,
    to: Address,
    call: &C,
    block: u64,
) -> Result<Option<C::Return>, ChainError> {
    let raw = reader
        .call(network, to, Bytes::from(call.abi_encode()), block)
        .await?;
    if raw.is_empty() {
        return Ok(None);
    }
    C::abi_decode_returns(&raw)
        .map(Some)
        .map_err(|e| ChainError::Decode {
            call: C::SIGNATURE,
            reason: e.to_string(),
        })
}

/// JSON-RPC chain reader backed by alloy HTTP providers.
#[derive(Clone)]
pub struct RpcChainReader {
    providers: HashMap<Network, DynProvider>,
}

impl std::fmt::Debug for RpcChainReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChainReader")
            .field("networks", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RpcChainReader {
    /// Create a reader from `(network, http_url)` pairs.
    pub fn new<I, S>(endpoints: I) -> Result<Self, ChainError>
    where
        I: IntoIterator<Item = (Network, S)>,
        S: AsRef<str>,
    {
        let mut providers = HashMap::new();
        for (network, url) in endpoints {
            let url = url.as_ref();
            let parsed = Url::parse(url).map_err(|e| ChainError::InvalidEndpoint {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            let provider = ProviderBuilder::new().connect_http(parsed).erased();
            info!(network = %network, "RPC provider configured");
            providers.insert(network, provider);
        }
        Ok(Self { providers })
    }

    fn provider(&self, network: Network) -> Result<&DynProvider, ChainError> {
        self.providers
            .get(&network)
            .ok_or(ChainError::NetworkNotConfigured(network))
    }

    /// Check that every configured endpoint answers with the expected chain ID.
    pub async fn health_check(&self) -> Result<(), ChainError> {
        for (network, provider) in &self.providers {
            let chain_id = provider.get_chain_id().await?;
            if chain_id != network.chain_id() {
                return Err(ChainError::InvalidEndpoint {
                    url: network.to_string(),
                    reason: format!("expected chain {}, got {}", network.chain_id(), chain_id),
                });
            }
            let block = provider.get_block_number().await?;
            debug!(network = %network, chain_id, block, "Provider health check passed");
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn latest_block_number(&self, network: Network) -> Result<u64, ChainError> {
        Ok(self.provider(network)?.get_block_number().await?)
    }

    async fn block_header(
        &self,
        network: Network,
        number: u64,
    ) -> Result<Option<BlockHeader>, ChainError> {
        let block = self
            .provider(network)?
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await?;

        Ok(block.map(|b| BlockHeader {
            number: b.header.number,
            timestamp: b.header.timestamp,
            base_fee_per_gas: b.header.base_fee_per_gas,
        }))
    }

    async fn call(
        &self,
        network: Network,
        to: Address,
        calldata: Bytes,
        block: u64,
    ) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default().to(to).input(calldata.into());
        Ok(self.provider(network)?.call(tx).number(block).await?)
    }

    async fn code_at(
        &self,
        network: Network,
        address: Address,
        block: u64,
    ) -> Result<Bytes, ChainError> {
        Ok(self
            .provider(network)?
            .get_code_at(address)
            .number(block)
            .await?)
    }
}
