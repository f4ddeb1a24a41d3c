//! Domain types shared by the resolver, discovery and backfill.

use alloy::primitives::Address;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pricehistory_chain::{Network, PairedType};
use serde::{Deserialize, Serialize};

use crate::ResolveError;

/// Which tier produced a price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Cache,
    Persisted,
    Interpolated,
    Onchain,
    Fallback,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Persisted => "persisted",
            Self::Interpolated => "interpolated",
            Self::Onchain => "onchain",
            Self::Fallback => "fallback",
        }
    }
}

impl std::str::FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cache" => Ok(Self::Cache),
            "persisted" => Ok(Self::Persisted),
            "interpolated" => Ok(Self::Interpolated),
            "onchain" => Ok(Self::Onchain),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!("unknown price source '{}'", other)),
        }
    }
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// USD price of a token at a moment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub token: Address,
    pub network: Network,
    /// Unix seconds; the start of the UTC day for persisted points
    pub timestamp: u64,
    /// USD, never negative
    pub price: f64,
    pub source: PriceSource,
}

impl PricePoint {
    pub fn new(
        token: Address,
        network: Network,
        timestamp: u64,
        price: f64,
        source: PriceSource,
    ) -> Self {
        Self {
            token,
            network,
            timestamp,
            price: price.max(0.0),
            source,
        }
    }

    /// UTC date of the point.
    pub fn date(&self) -> NaiveDate {
        date_of(self.timestamp)
    }

    /// Copy normalized to day granularity, as persisted.
    pub fn for_date(&self) -> Self {
        Self {
            timestamp: start_of_day(self.date()),
            ..*self
        }
    }

    /// Same price, re-labelled with the timestamp and tier of a request.
    pub fn served_as(&self, timestamp: u64, source: PriceSource) -> Self {
        Self {
            timestamp,
            source,
            ..*self
        }
    }
}

/// Token → pool assignment used for on-chain pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolMapping {
    pub token: Address,
    pub pool: Address,
    pub paired_token: Address,
    pub paired_type: PairedType,
}

/// Request to backfill the price history of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackfillJob {
    pub token: Address,
    pub network: Network,
}

/// Entry-point price request; every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceRequest {
    pub token: Option<Address>,
    pub network: Option<Network>,
    pub timestamp: Option<u64>,
}

impl PriceRequest {
    /// Check presence of all fields and that `timestamp` is not after `now`.
    pub fn validate(&self, now: u64) -> Result<(Address, Network, u64), ResolveError> {
        let token = self
            .token
            .ok_or_else(|| ResolveError::validation("Missing required field: token"))?;
        let network = self
            .network
            .ok_or_else(|| ResolveError::validation("Missing required field: network"))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| ResolveError::validation("Missing required field: timestamp"))?;
        ensure_not_future(timestamp, now)?;
        Ok((token, network, timestamp))
    }
}

/// Entry-point price response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub price: f64,
    pub source: PriceSource,
}

impl From<PricePoint> for PriceResponse {
    fn from(point: PricePoint) -> Self {
        Self {
            price: point.price,
            source: point.source,
        }
    }
}

pub(crate) fn ensure_not_future(timestamp: u64, now: u64) -> Result<(), ResolveError> {
    if timestamp > now {
        return Err(ResolveError::validation(
            "Timestamp is in the future. Please use a past date.",
        ));
    }
    Ok(())
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// UTC date containing `timestamp`.
pub fn date_of(timestamp: u64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(timestamp as i64, 0)
        .unwrap_or_default()
        .date_naive()
}

/// Unix seconds of 00:00:00 UTC on `date`.
pub fn start_of_day(date: NaiveDate) -> u64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp().max(0) as u64
}

/// Unix seconds of 12:00:00 UTC on `date`.
pub fn noon_of(date: NaiveDate) -> u64 {
    start_of_day(date) + 12 * 3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_helpers() {
        // 2023-11-14T22:13:20Z
        let ts = 1_700_000_000;
        let date = date_of(ts);
        assert_eq!(date, NaiveDate::from_ymd_opt(2023, 11, 14).unwrap());
        assert_eq!(start_of_day(date), 1_699_920_000);
        assert_eq!(noon_of(date), 1_699_963_200);
    }

    #[test]
    fn test_point_normalization() {
        let point = PricePoint::new(
            Address::repeat_byte(1),
            Network::Ethereum,
            1_700_000_000,
            12.5,
            PriceSource::Onchain,
        );
        let stored = point.for_date();
        assert_eq!(stored.timestamp, 1_699_920_000);
        assert_eq!(stored.price, 12.5);

        let served = stored.served_as(1_700_000_000, PriceSource::Persisted);
        assert_eq!(served.timestamp, 1_700_000_000);
        assert_eq!(served.source, PriceSource::Persisted);
    }

    #[test]
    fn test_negative_price_clamped() {
        let point = PricePoint::new(
            Address::ZERO,
            Network::Ethereum,
            0,
            -3.0,
            PriceSource::Fallback,
        );
        assert_eq!(point.price, 0.0);
    }

    #[test]
    fn test_request_validation() {
        let now = 1_700_000_000;
        let request: PriceRequest = serde_json::from_str(
            r#"{"token": "0x6b175474e89094c44da98b954eedeac495271d0f", "network": "ethereum", "timestamp": 1600000000}"#,
        )
        .unwrap();
        let (_, network, ts) = request.validate(now).unwrap();
        assert_eq!(network, Network::Ethereum);
        assert_eq!(ts, 1_600_000_000);

        let missing: PriceRequest = serde_json::from_str(r#"{"network": "ethereum"}"#).unwrap();
        assert!(matches!(
            missing.validate(now),
            Err(ResolveError::Validation(m)) if m.contains("token")
        ));

        let future = PriceRequest {
            timestamp: Some(now + 1),
            ..request
        };
        assert!(matches!(future.validate(now), Err(ResolveError::Validation(_))));
    }

    #[test]
    fn test_one_second_ahead_is_future() {
        let now = 1_700_000_000;
        let request = PriceRequest {
            token: Some(Address::repeat_byte(1)),
            network: Some(Network::Polygon),
            timestamp: Some(now),
        };
        assert!(request.validate(now).is_ok());

        let ahead = PriceRequest {
            timestamp: Some(now + 1),
            ..request
        };
        assert!(matches!(
            ahead.validate(now),
            Err(ResolveError::Validation(m)) if m.contains("future")
        ));
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&PriceSource::Interpolated).unwrap(),
            "\"interpolated\""
        );
        let response = PriceResponse {
            price: 1.0,
            source: PriceSource::Onchain,
        };
        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"price":1.0,"source":"onchain"}"#
        );
    }
}
