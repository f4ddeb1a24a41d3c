//! Uniswap V2 subgraph client for pool discovery.

use std::cmp::Ordering;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{IndexError, PairIndex, PoolCandidate};

/// Pairs requested per side (token as `token0`, token as `token1`).
pub const DEFAULT_PAIRS_PER_SIDE: u32 = 5;

const TOP_PAIRS_QUERY: &str = r#"
query TopPairs($token: String!, $first: Int!) {
  asToken0: pairs(
    first: $first
    where: { token0: $token }
    orderBy: reserveUSD
    orderDirection: desc
  ) {
    id
    token0 { id }
    token1 { id }
    reserveUSD
  }
  asToken1: pairs(
    first: $first
    where: { token1: $token }
    orderBy: reserveUSD
    orderDirection: desc
  ) {
    id
    token0 { id }
    token1 { id }
    reserveUSD
  }
}
"#;

/// Uniswap V2 subgraph client.
#[derive(Debug, Clone)]
pub struct UniswapV2SubgraphClient {
    client: reqwest::Client,
    base_url: String,
    pairs_per_side: u32,
}

impl UniswapV2SubgraphClient {
    /// Create a client for a subgraph endpoint.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            pairs_per_side: DEFAULT_PAIRS_PER_SIDE,
        }
    }

    /// Set how many pairs to request for each side.
    pub fn with_pairs_per_side(mut self, pairs_per_side: u32) -> Self {
        self.pairs_per_side = pairs_per_side.max(1);
        self
    }

    /// Endpoint URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PairIndex for UniswapV2SubgraphClient {
    #[instrument(skip(self), fields(token = %token))]
    async fn top_pools_for_token(&self, token: Address) -> Result<Vec<PoolCandidate>, IndexError> {
        let request = GraphQlRequest {
            query: TOP_PAIRS_QUERY,
            variables: TopPairsVariables {
                // The subgraph stores ids as lowercase hex
                token: format!("{token:#x}"),
                first: self.pairs_per_side,
            },
        };

        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Http(format!("{status} - {body}")));
        }

        let body: GraphQlResponse<TopPairsData> = response.json().await?;
        let candidates = into_candidates(body)?;

        debug!(
            count = candidates.len(),
            top_pool = ?candidates.first().map(|c| c.pool),
            "Fetched subgraph pairs"
        );

        Ok(candidates)
    }
}

/// Merge both sides and rank by `reserve_usd` descending.
///
/// The sort is stable: among equal reserves the first one returned wins.
pub fn rank_candidates(mut candidates: Vec<PoolCandidate>) -> Vec<PoolCandidate> {
    candidates.sort_by(|a, b| {
        b.reserve_usd
            .partial_cmp(&a.reserve_usd)
            .unwrap_or(Ordering::Equal)
    });
    candidates
}

fn into_candidates(body: GraphQlResponse<TopPairsData>) -> Result<Vec<PoolCandidate>, IndexError> {
    if !body.errors.is_empty() {
        let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(IndexError::GraphQl(messages.join("; ")));
    }
    let data = body
        .data
        .ok_or_else(|| IndexError::Decode("response has neither data nor errors".into()))?;

    let merged = data
        .as_token0
        .into_iter()
        .chain(data.as_token1)
        .map(|row| PoolCandidate {
            pool: row.id,
            token0: row.token0.id,
            token1: row.token1.id,
            reserve_usd: row.reserve_usd,
        })
        .collect();

    Ok(rank_candidates(merged))
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: TopPairsVariables,
}

#[derive(Debug, Serialize)]
struct TopPairsVariables {
    token: String,
    first: u32,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopPairsData {
    #[serde(default)]
    as_token0: Vec<PairRow>,
    #[serde(default)]
    as_token1: Vec<PairRow>,
}

#[derive(Debug, Deserialize)]
struct PairRow {
    id: Address,
    token0: TokenRef,
    token1: TokenRef,
    #[serde(rename = "reserveUSD", deserialize_with = "deserialize_f64_from_string")]
    reserve_usd: f64,
}

#[derive(Debug, Deserialize)]
struct TokenRef {
    id: Address,
}

/// The subgraph encodes BigDecimal fields as strings.
fn deserialize_f64_from_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}
