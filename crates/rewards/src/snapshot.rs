// Copyright 2025 Nodesweep Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reward tree documents: the off-chain JSON published per interval, addressed by
//! content identifier, plus a fetching client with the caching the addressing allows.

use std::{
    collections::HashMap,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};

use alloy::primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// How long a fetched live-estimate document is served from cache before refetching.
pub const ESTIMATE_TTL: Duration = Duration::from_secs(5 * 60);

/// Reward tree documents serialize asset amounts as decimal strings, not JSON numbers.
mod u256_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_str(&raw).map_err(serde::de::Error::custom)
    }
}

/// One node's rewards within an interval's tree document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRewardsEntry {
    /// Smoothing pool ETH owed to the node.
    #[serde(with = "u256_decimal", default)]
    pub smoothing_pool_eth: U256,
    /// Protocol token owed for collateral.
    #[serde(with = "u256_decimal", default)]
    pub collateral_rpl: U256,
    /// Protocol token owed for oracle DAO membership.
    #[serde(with = "u256_decimal", default)]
    pub oracle_dao_rpl: U256,
    /// Merkle proof for the node's leaf. Absent in pending and estimate documents,
    /// which are not claimable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merkle_proof: Vec<B256>,
}

/// Network-wide totals within an interval's tree document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRewards {
    #[serde(with = "u256_decimal", default)]
    pub total_smoothing_pool_eth: U256,
    #[serde(with = "u256_decimal", default)]
    pub total_collateral_rpl: U256,
    #[serde(with = "u256_decimal", default)]
    pub total_oracle_dao_rpl: U256,
    #[serde(with = "u256_decimal", default)]
    pub protocol_dao_rpl: U256,
}

/// A reward tree document: the full per-node reward breakdown for one interval.
///
/// Finalized documents are immutable and content-addressed. Pending documents share
/// the schema but have no proofs. Estimate documents additionally cover only the
/// elapsed part of the ongoing interval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsTreeDocument {
    pub reward_index: u64,
    #[serde(default)]
    pub start_time: u64,
    #[serde(default)]
    pub end_time: u64,
    #[serde(default)]
    pub total_rewards: TotalRewards,
    #[serde(default)]
    pub node_rewards: HashMap<Address, NodeRewardsEntry>,
}

impl RewardsTreeDocument {
    /// The node's entry in this document, if it earned anything this interval.
    pub fn node_entry(&self, node: Address) -> Option<&NodeRewardsEntry> {
        self.node_rewards.get(&node)
    }
}

enum EstimateSlot {
    Empty,
    Filled { fetched_at: Instant, doc: Arc<RewardsTreeDocument> },
}

/// HTTP client for reward tree documents.
///
/// Finalized trees are content-addressed, so a fetched document is cached for the
/// lifetime of the client and never refetched. Live-estimate documents mutate at
/// their source and are cached with a TTL instead.
pub struct SnapshotClient {
    client: reqwest::Client,
    gateway: Url,
    estimate_url: Option<Url>,
    trees: Mutex<HashMap<String, Arc<OnceCell<Arc<RewardsTreeDocument>>>>>,
    estimate: Mutex<EstimateSlot>,
    estimate_ttl: Duration,
}

impl SnapshotClient {
    /// Create a client fetching trees through the given content gateway. `estimate_url`,
    /// when set, points at the rolling estimate document for the ongoing interval.
    pub fn new(gateway: Url, estimate_url: Option<Url>) -> Self {
        Self {
            client: reqwest::Client::new(),
            gateway,
            estimate_url,
            trees: Mutex::new(HashMap::new()),
            estimate: Mutex::new(EstimateSlot::Empty),
            estimate_ttl: ESTIMATE_TTL,
        }
    }

    /// Override the estimate cache TTL.
    pub fn with_estimate_ttl(mut self, ttl: Duration) -> Self {
        self.estimate_ttl = ttl;
        self
    }

    /// Gateway URL for a tree document by content identifier.
    pub fn tree_url(&self, cid: &str) -> Result<Url> {
        self.gateway.join(cid).with_context(|| format!("invalid tree CID {cid}"))
    }

    /// Fetch the tree document addressed by `cid`, caching it forever.
    ///
    /// Concurrent callers for the same CID share a single in-flight request. A failed
    /// fetch is not cached; the next caller retries.
    pub async fn fetch_tree(&self, cid: &str) -> Result<Arc<RewardsTreeDocument>> {
        let cell = {
            let mut trees = self.trees.lock().await;
            trees.entry(cid.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };
        let url = self.tree_url(cid)?;
        cell.get_or_try_init(|| async {
            let doc = self.get_json(url.clone()).await?;
            Ok::<_, anyhow::Error>(Arc::new(doc))
        })
        .await
        .cloned()
    }

    /// Fetch the rolling estimate document for the ongoing interval, if an estimate
    /// source is configured. Served from cache within the TTL.
    pub async fn fetch_estimate(&self) -> Result<Option<Arc<RewardsTreeDocument>>> {
        let Some(url) = self.estimate_url.clone() else {
            return Ok(None);
        };

        let mut slot = self.estimate.lock().await;
        if let EstimateSlot::Filled { fetched_at, doc } = &*slot {
            if fetched_at.elapsed() < self.estimate_ttl {
                return Ok(Some(doc.clone()));
            }
        }

        let doc = Arc::new(self.get_json::<RewardsTreeDocument>(url).await?);
        *slot = EstimateSlot::Filled { fetched_at: Instant::now(), doc: doc.clone() };
        Ok(Some(doc))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("error status fetching {url}"))?;
        response.json().await.with_context(|| format!("failed to decode JSON from {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    const DOC_JSON: &str = r#"{
        "rewardIndex": 12,
        "startTime": 1700000000,
        "endTime": 1702419200,
        "totalRewards": {
            "totalSmoothingPoolEth": "340282366920938463463374607431768211456",
            "totalCollateralRpl": "5000000000000000000",
            "totalOracleDaoRpl": "0",
            "protocolDaoRpl": "1"
        },
        "nodeRewards": {
            "0x1111111111111111111111111111111111111111": {
                "smoothingPoolEth": "2000000000000000000",
                "collateralRpl": "100000000000000000000",
                "oracleDaoRpl": "0",
                "merkleProof": [
                    "0x000000000000000000000000000000000000000000000000000000000000aaaa"
                ]
            }
        }
    }"#;

    #[test]
    fn decodes_decimal_string_amounts() {
        let doc: RewardsTreeDocument = serde_json::from_str(DOC_JSON).unwrap();
        assert_eq!(doc.reward_index, 12);
        // Larger than u128, exercises the decimal-string path.
        assert_eq!(
            doc.total_rewards.total_smoothing_pool_eth,
            U256::from_str("340282366920938463463374607431768211456").unwrap()
        );

        let entry = doc
            .node_entry(address!("0x1111111111111111111111111111111111111111"))
            .expect("node entry present");
        assert_eq!(entry.smoothing_pool_eth, U256::from(2_000_000_000_000_000_000u128));
        assert_eq!(entry.collateral_rpl, U256::from(100_000_000_000_000_000_000u128));
        assert_eq!(entry.merkle_proof.len(), 1);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let doc: RewardsTreeDocument = serde_json::from_str(r#"{"rewardIndex": 3}"#).unwrap();
        assert_eq!(doc.reward_index, 3);
        assert_eq!(doc.total_rewards.total_collateral_rpl, U256::ZERO);
        assert!(doc.node_rewards.is_empty());

        // A pending document entry carries no proof.
        let entry: NodeRewardsEntry =
            serde_json::from_str(r#"{"smoothingPoolEth": "5"}"#).unwrap();
        assert_eq!(entry.smoothing_pool_eth, U256::from(5));
        assert!(entry.merkle_proof.is_empty());
    }

    #[test]
    fn amounts_round_trip_as_strings() {
        let entry = NodeRewardsEntry {
            smoothing_pool_eth: U256::from(7),
            collateral_rpl: U256::MAX,
            oracle_dao_rpl: U256::ZERO,
            merkle_proof: vec![],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["smoothingPoolEth"], "7");
        assert_eq!(json["collateralRpl"], U256::MAX.to_string());

        let back: NodeRewardsEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back.collateral_rpl, U256::MAX);
    }

    #[test]
    fn tree_url_joins_cid_onto_gateway() {
        let client = SnapshotClient::new(Url::parse("https://ipfs.example/ipfs/").unwrap(), None);
        let url = client.tree_url("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ipfs.example/ipfs/bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"
        );
    }

    #[tokio::test]
    async fn estimate_is_none_without_a_source() {
        let client = SnapshotClient::new(Url::parse("https://ipfs.example/ipfs/").unwrap(), None);
        assert!(client.fetch_estimate().await.unwrap().is_none());
    }
}
