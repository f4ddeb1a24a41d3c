//! Day-by-day price history backfill.

use std::sync::Arc;

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pricehistory_chain::{ChainError, DeploymentLocator, Network};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{date_of, noon_of, ResolvePrice};

/// Source of a token's creation date.
#[async_trait]
pub trait CreationDateLookup: Send + Sync {
    /// UTC date of the token's first on-chain activity, if it can be found.
    async fn creation_date(
        &self,
        token: Address,
        network: Network,
    ) -> Result<Option<NaiveDate>, ChainError>;
}

#[async_trait]
impl CreationDateLookup for DeploymentLocator {
    async fn creation_date(
        &self,
        token: Address,
        network: Network,
    ) -> Result<Option<NaiveDate>, ChainError> {
        Ok(self
            .deployment_header(network, token)
            .await?
            .map(|header| date_of(header.timestamp)))
    }
}

/// Outcome of one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    /// Days visited
    pub days: u32,
    pub resolved: u32,
    pub failed: u32,
}

/// Walks every day from a token's creation through today, resolving noon.
///
/// All pricing goes through the resolver; a failing day is logged and the
/// walk moves on.
#[derive(Clone)]
pub struct BackfillWalker {
    resolver: Arc<dyn ResolvePrice>,
    creation: Arc<dyn CreationDateLookup>,
}

impl std::fmt::Debug for BackfillWalker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackfillWalker").finish_non_exhaustive()
    }
}

impl BackfillWalker {
    pub fn new(resolver: Arc<dyn ResolvePrice>, creation: Arc<dyn CreationDateLookup>) -> Self {
        Self { resolver, creation }
    }

    /// Backfill `token` from its creation date through today.
    #[instrument(skip(self), fields(token = %token, network = %network))]
    pub async fn run(&self, token: Address, network: Network) -> BackfillReport {
        let now = Utc::now();
        let today = now.date_naive();

        let from = match self.creation.creation_date(token, network).await {
            Ok(Some(date)) => date,
            Ok(None) => {
                info!("Creation date undeterminable, backfilling today only");
                today
            }
            Err(e) => {
                warn!(error = %e, "Creation date lookup failed, backfilling today only");
                today
            }
        };

        self.run_range(token, network, from, now).await
    }

    /// Resolve noon of every day in `[from, now]`, sequentially.
    ///
    /// Noon of the current day is clamped to `now`.
    pub async fn run_range(
        &self,
        token: Address,
        network: Network,
        from: NaiveDate,
        now: DateTime<Utc>,
    ) -> BackfillReport {
        let today = now.date_naive();
        let now_ts = now.timestamp().max(0) as u64;
        let mut report = BackfillReport::default();

        info!(from = %from, to = %today, "Starting backfill");

        for date in from.iter_days().take_while(|d| *d <= today) {
            let timestamp = noon_of(date).min(now_ts);
            report.days += 1;

            match self.resolver.resolve(token, network, timestamp).await {
                Ok(point) => {
                    report.resolved += 1;
                    debug!(date = %date, price = point.price, source = %point.source, "Backfilled day");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(date = %date, error = %e, "Failed to backfill day");
                }
            }
        }

        info!(
            days = report.days,
            resolved = report.resolved,
            failed = report.failed,
            "Backfill finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PricePoint, PriceSource, ResolveError};
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use pricehistory_chain::testing::MockChain;
    use pricehistory_chain::RetryPolicy;

    /// Records every request; fails on the listed timestamps.
    #[derive(Default)]
    struct RecordingResolver {
        calls: Mutex<Vec<u64>>,
        failing: Vec<u64>,
    }

    #[async_trait]
    impl ResolvePrice for RecordingResolver {
        async fn resolve(
            &self,
            token: Address,
            network: Network,
            timestamp: u64,
        ) -> Result<PricePoint, ResolveError> {
            self.calls.lock().push(timestamp);
            if self.failing.contains(&timestamp) {
                return Err(ResolveError::resolution(
                    crate::FailureReason::Transient,
                    ChainError::Transport("timeout".into()),
                ));
            }
            Ok(PricePoint::new(
                token,
                network,
                timestamp,
                1.0,
                PriceSource::Onchain,
            ))
        }
    }

    struct FixedCreation(Result<Option<NaiveDate>, ()>);

    #[async_trait]
    impl CreationDateLookup for FixedCreation {
        async fn creation_date(
            &self,
            _token: Address,
            _network: Network,
        ) -> Result<Option<NaiveDate>, ChainError> {
            self.0
                .map_err(|_| ChainError::Transport("connection refused".into()))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_three_days_with_a_failing_middle_day() {
        let from = date(2024, 3, 1);
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 18, 0, 0).unwrap();
        let resolver = Arc::new(RecordingResolver {
            failing: vec![noon_of(date(2024, 3, 2))],
            ..Default::default()
        });
        let walker = BackfillWalker::new(resolver.clone(), Arc::new(FixedCreation(Ok(None))));

        let report = walker
            .run_range(Address::ZERO, Network::Ethereum, from, now)
            .await;

        assert_eq!(
            report,
            BackfillReport {
                days: 3,
                resolved: 2,
                failed: 1
            }
        );
        assert_eq!(
            *resolver.calls.lock(),
            vec![
                noon_of(date(2024, 3, 1)),
                noon_of(date(2024, 3, 2)),
                noon_of(date(2024, 3, 3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_today_is_clamped_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 3, 8, 30, 0).unwrap();
        let resolver = Arc::new(RecordingResolver::default());
        let walker = BackfillWalker::new(resolver.clone(), Arc::new(FixedCreation(Ok(None))));

        let report = walker
            .run_range(Address::ZERO, Network::Ethereum, date(2024, 3, 3), now)
            .await;

        assert_eq!(report.days, 1);
        assert_eq!(*resolver.calls.lock(), vec![now.timestamp() as u64]);
    }

    #[tokio::test]
    async fn test_undeterminable_creation_walks_today_only() {
        for creation in [Ok(None), Err(())] {
            let resolver = Arc::new(RecordingResolver::default());
            let walker = BackfillWalker::new(resolver.clone(), Arc::new(FixedCreation(creation)));

            let report = walker.run(Address::ZERO, Network::Ethereum).await;
            assert_eq!(report.days, 1);
            assert_eq!(resolver.calls.lock().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_creation_date_from_deployment_block() {
        let token = Address::repeat_byte(0x42);
        // One block per hour from 2020-09-13T12:26:40Z
        let chain = MockChain::with_blocks(1_600_000_000, 3_600, 200).token(token, Some(18), 60);
        let locator = DeploymentLocator::new(Arc::new(chain), RetryPolicy::no_retry());

        let created = locator
            .creation_date(token, Network::Ethereum)
            .await
            .unwrap();
        assert_eq!(created, Some(date_of(1_600_000_000 + 60 * 3_600)));
        assert_eq!(created, Some(date(2020, 9, 16)));
    }
}
