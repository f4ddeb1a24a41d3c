//! Contract deployment lookup.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, instrument};

use crate::{BlockHeader, ChainError, ChainReader, Network, RetryPolicy};

/// Finds the first block at which a contract has code.
///
/// Code presence is monotonic for contracts that are never self-destructed,
/// so a binary search over `[0, latest]` on `eth_getCode` is enough.
#[derive(Clone)]
pub struct DeploymentLocator {
    reader: Arc<dyn ChainReader>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for DeploymentLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentLocator")
            .field("retry", &self.retry)
            .finish()
    }
}

impl DeploymentLocator {
    pub fn new(reader: Arc<dyn ChainReader>, retry: RetryPolicy) -> Self {
        Self { reader, retry }
    }

    async fn has_code(
        &self,
        network: Network,
        address: Address,
        block: u64,
    ) -> Result<bool, ChainError> {
        let code = self
            .retry
            .run_chain("code_at", || self.reader.code_at(network, address, block))
            .await?;
        Ok(!code.is_empty())
    }

    /// First block with code at `address`, or `None` if it has none at head.
    #[instrument(skip(self), fields(network = %network, address = %address))]
    pub async fn deployment_block(
        &self,
        network: Network,
        address: Address,
    ) -> Result<Option<u64>, ChainError> {
        let latest = self
            .retry
            .run_chain("latest_block_number", || {
                self.reader.latest_block_number(network)
            })
            .await?;

        if !self.has_code(network, address, latest).await? {
            debug!(latest, "No code at chain head");
            return Ok(None);
        }

        // Invariant: code at `high`, none before `low`
        let mut low = 0u64;
        let mut high = latest;
        while low < high {
            let mid = low + (high - low) / 2;
            if self.has_code(network, address, mid).await? {
                high = mid;
            } else {
                low = mid + 1;
            }
        }

        debug!(block = high, "Found deployment block");
        Ok(Some(high))
    }

    /// Header of the deployment block of `address`.
    pub async fn deployment_header(
        &self,
        network: Network,
        address: Address,
    ) -> Result<Option<BlockHeader>, ChainError> {
        let Some(block) = self.deployment_block(network, address).await? else {
            return Ok(None);
        };
        self.retry
            .run_chain("block_header", || self.reader.block_header(network, block))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockChain;

    #[tokio::test]
    async fn test_finds_first_block_with_code() {
        let token = Address::repeat_byte(0x42);
        let chain = Arc::new(MockChain::with_blocks(1_000, 12, 500).token(token, Some(18), 137));
        let locator = DeploymentLocator::new(chain, RetryPolicy::no_retry());

        assert_eq!(
            locator
                .deployment_block(Network::Ethereum, token)
                .await
                .unwrap(),
            Some(137)
        );
        let header = locator
            .deployment_header(Network::Ethereum, token)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(header.timestamp, 1_000 + 12 * 137);
    }

    #[tokio::test]
    async fn test_contract_without_code() {
        let chain = Arc::new(MockChain::with_blocks(1_000, 12, 500));
        let locator = DeploymentLocator::new(chain, RetryPolicy::no_retry());
        let block = locator
            .deployment_block(Network::Ethereum, Address::repeat_byte(0x42))
            .await
            .unwrap();
        assert_eq!(block, None);
    }

    #[tokio::test]
    async fn test_genesis_deployment() {
        let token = Address::repeat_byte(0x42);
        let chain = Arc::new(MockChain::with_blocks(1_000, 12, 64).token(token, None, 0));
        let locator = DeploymentLocator::new(chain, RetryPolicy::no_retry());
        assert_eq!(
            locator
                .deployment_block(Network::Ethereum, token)
                .await
                .unwrap(),
            Some(0)
        );
    }
}
