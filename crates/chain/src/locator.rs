//! Timestamp → block number lookup.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::{BlockHeader, ChainError, ChainReader, Network, RetryPolicy};

/// Finds the latest block whose timestamp does not exceed a target time.
///
/// Relies on block timestamps being non-decreasing in block number. Probes
/// are issued one at a time; each probe goes through the retry policy.
#[derive(Clone)]
pub struct BlockTimestampLocator {
    reader: Arc<dyn ChainReader>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for BlockTimestampLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockTimestampLocator")
            .field("retry", &self.retry)
            .finish()
    }
}

impl BlockTimestampLocator {
    pub fn new(reader: Arc<dyn ChainReader>, retry: RetryPolicy) -> Self {
        Self { reader, retry }
    }

    /// Block at or immediately before `timestamp` (unix seconds).
    ///
    /// Searches `[1, latest]`; when no block there is early enough, genesis is
    /// checked and [`ChainError::BeforeGenesis`] returned if it is later than
    /// the target. A probe that finds no block ends the search with the best
    /// bound seen so far.
    #[instrument(skip(self), fields(network = %network))]
    pub async fn locate_block(&self, network: Network, timestamp: u64) -> Result<u64, ChainError> {
        let latest = self
            .retry
            .run_chain("latest_block_number", || {
                self.reader.latest_block_number(network)
            })
            .await?;

        let mut low = 1u64;
        let mut high = latest;
        let mut best = None;
        let mut probes = 0u32;

        while low <= high {
            let mid = low + (high - low) / 2;
            probes += 1;

            let Some(header) = self.header(network, mid).await? else {
                debug!(block = mid, "Probe past chain head, stopping search");
                break;
            };

            if header.timestamp == timestamp {
                best = Some(mid);
                break;
            }
            if header.timestamp < timestamp {
                best = Some(mid);
                low = mid + 1;
            } else {
                // mid >= 1 here, and mid == 1 ends the loop via low > high
                high = mid - 1;
            }
        }

        let block = match best {
            Some(block) => block,
            None => self.genesis_at_or_before(network, timestamp).await?,
        };

        debug!(timestamp, block, probes, latest, "Located block");
        Ok(block)
    }

    async fn genesis_at_or_before(
        &self,
        network: Network,
        timestamp: u64,
    ) -> Result<u64, ChainError> {
        match self.header(network, 0).await? {
            Some(genesis) if genesis.timestamp > timestamp => Err(ChainError::BeforeGenesis {
                timestamp,
                genesis: genesis.timestamp,
            }),
            _ => Ok(0),
        }
    }

    /// Header of `block`, retried on transient failures.
    pub async fn header(
        &self,
        network: Network,
        block: u64,
    ) -> Result<Option<BlockHeader>, ChainError> {
        self.retry
            .run_chain("block_header", || self.reader.block_header(network, block))
            .await
    }
}
