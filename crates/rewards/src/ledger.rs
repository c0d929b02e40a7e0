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

//! Interval reward ledgers. Resolution gathers on-chain events, contract reads, and
//! tree documents into plain source structs; assembly into a ledger is pure so the
//! ordering and classification rules are testable without a provider.

use std::{sync::Arc, time::Duration};

use alloy::{
    primitives::{Address, B256, U256},
    providers::Provider,
    rpc::types::{BlockNumberOrTag, Filter, Log},
    sol_types::{SolEvent, SolValue},
};
use anyhow::{bail, Context, Result};
use futures_util::future::join_all;
use nodesweep_contracts::{Deployment, IMerkleDistributor, IRewardsPool};
use tokio_util::sync::CancellationToken;

use crate::{
    amount::{percent_elapsed_ppm, project_full_interval},
    cache::{CallCache, CallKey},
    snapshot::{NodeRewardsEntry, RewardsTreeDocument, SnapshotClient, TotalRewards},
    FALLBACK_INTERVAL_TIME, LOG_QUERY_CHUNK_SIZE, MULTICALL_CHUNK_SIZE,
};

/// TTL for contract reads cached within one resolver.
const READ_CACHE_TTL: Duration = Duration::from_secs(30);

/// One node's reward amounts for one interval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardShare {
    /// Smoothing pool ETH.
    pub smoothing_pool_eth: U256,
    /// Protocol token earned on collateral.
    pub collateral_token: U256,
    /// Protocol token earned from oracle DAO membership.
    pub oracle_dao_token: U256,
}

impl RewardShare {
    pub fn from_entry(entry: &NodeRewardsEntry) -> Self {
        Self {
            smoothing_pool_eth: entry.smoothing_pool_eth,
            collateral_token: entry.collateral_rpl,
            oracle_dao_token: entry.oracle_dao_rpl,
        }
    }

    /// Total protocol token claimed alongside the ETH.
    pub fn claimable_token(&self) -> U256 {
        self.collateral_token.saturating_add(self.oracle_dao_token)
    }

    pub fn is_zero(&self) -> bool {
        self.smoothing_pool_eth.is_zero() && self.claimable_token().is_zero()
    }
}

/// Claim state of a finalized interval for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimStatus {
    Unclaimed,
    Claimed,
    /// The claim lookup failed or has not run; never claimable until a later
    /// resolve answers definitively.
    Unknown,
}

/// What is known about a node's rewards for one interval. The variant states the
/// data's provenance; callers display and plan against the variant rather than
/// silently substituting one kind of number for another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalRewards {
    /// Interval reached oracle consensus; amounts are exact and claimable.
    Finalized { share: RewardShare, merkle_proof: Vec<B256>, claimed: ClaimStatus },
    /// Interval ended and a snapshot was submitted, but consensus is outstanding.
    /// Amounts are exact but not yet claimable. `None` means the node is absent
    /// from the submitted tree, which is not the same fact as an explicit zero.
    Pending { share: Option<RewardShare> },
    /// Interval is still accruing. `raw_share` covers the elapsed portion;
    /// `projected_share` linearly extrapolates it to the full interval.
    Estimated { raw_share: RewardShare, projected_share: RewardShare, ppm_elapsed: u64 },
    /// The interval exists but its document could not be retrieved.
    Unavailable,
}

/// One interval's row in a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub reward_index: u64,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    pub rewards: IntervalRewards,
}

impl LedgerEntry {
    /// Whether this entry can go into a claim transaction. Requires a definitive
    /// unclaimed status; [ClaimStatus::Unknown] is excluded.
    pub fn is_claimable(&self) -> bool {
        matches!(
            &self.rewards,
            IntervalRewards::Finalized { share, claimed: ClaimStatus::Unclaimed, .. }
                if !share.is_zero()
        )
    }
}

/// Totals across a ledger's claimable entries.
#[derive(Debug, Clone, Default)]
pub struct ClaimableTotals {
    pub smoothing_pool_eth: U256,
    pub token: U256,
    /// Reward indices contributing to the totals, ascending.
    pub intervals: Vec<u64>,
}

/// A node's reward history, newest interval first. The ongoing interval is always
/// the first entry; finalized intervals the node earned nothing in are omitted.
#[derive(Debug, Clone, Default)]
pub struct NodeLedger {
    pub node: Address,
    pub entries: Vec<LedgerEntry>,
}

impl NodeLedger {
    /// Finalized, unclaimed, nonzero entries, ascending by interval for claim
    /// calldata assembly.
    pub fn claimable_entries(&self) -> Vec<&LedgerEntry> {
        let mut entries: Vec<&LedgerEntry> =
            self.entries.iter().filter(|entry| entry.is_claimable()).collect();
        entries.sort_by_key(|entry| entry.reward_index);
        entries
    }

    pub fn claimable_totals(&self) -> ClaimableTotals {
        let mut totals = ClaimableTotals::default();
        for entry in self.claimable_entries() {
            if let IntervalRewards::Finalized { share, .. } = &entry.rewards {
                totals.smoothing_pool_eth =
                    totals.smoothing_pool_eth.saturating_add(share.smoothing_pool_eth);
                totals.token = totals.token.saturating_add(share.claimable_token());
                totals.intervals.push(entry.reward_index);
            }
        }
        totals
    }

    /// The in-progress interval's entry.
    pub fn ongoing_entry(&self) -> Option<&LedgerEntry> {
        self.entries.first()
    }
}

/// One interval's network-wide totals.
#[derive(Debug, Clone)]
pub struct ProtocolLedgerEntry {
    pub reward_index: u64,
    pub start_time: Option<u64>,
    pub end_time: Option<u64>,
    /// `None` when the interval's document could not be retrieved.
    pub totals: Option<TotalRewards>,
}

/// Network-wide reward history, oldest interval first.
#[derive(Debug, Clone, Default)]
pub struct ProtocolLedger {
    pub entries: Vec<ProtocolLedgerEntry>,
}

/// Resolved inputs for one finalized interval.
#[derive(Debug, Clone)]
pub struct FinalizedSource {
    pub index: u64,
    pub start_time: u64,
    pub end_time: u64,
    /// `None` when the document fetch failed; the interval still appears in the
    /// ledger as [IntervalRewards::Unavailable].
    pub doc: Option<Arc<RewardsTreeDocument>>,
    pub claimed: ClaimStatus,
}

/// Where the ongoing interval's exact amounts come from, when they exist at all.
#[derive(Debug, Clone)]
pub enum PendingSource {
    /// A snapshot was submitted and its document retrieved.
    Document(Arc<RewardsTreeDocument>),
    /// A snapshot was submitted but its document could not be retrieved.
    Unavailable,
}

/// Resolved inputs for the ongoing interval.
#[derive(Debug, Clone)]
pub struct OngoingSource {
    pub index: u64,
    pub start_time: u64,
    pub end_time: u64,
    /// Present once the interval has ended and a snapshot submission was observed.
    pub pending: Option<PendingSource>,
    /// Rolling estimate document covering the elapsed portion of the interval.
    pub estimate: Option<Arc<RewardsTreeDocument>>,
    /// Evaluation time, unix seconds.
    pub now: u64,
}

/// Assemble a node's ledger from resolved sources. Pure.
///
/// Finalized intervals where the node is absent from the document are skipped
/// entirely: absence is a fact (the node earned nothing), not missing data. The
/// ongoing interval is always present; a pending document without the node
/// carries the absence itself rather than a fabricated zero.
pub fn build_node_ledger(
    node: Address,
    finalized: &[FinalizedSource],
    ongoing: &OngoingSource,
) -> NodeLedger {
    let mut entries = Vec::with_capacity(finalized.len() + 1);

    let ongoing_rewards = match &ongoing.pending {
        Some(PendingSource::Document(doc)) => {
            let share = doc.node_entry(node).map(RewardShare::from_entry);
            IntervalRewards::Pending { share }
        }
        Some(PendingSource::Unavailable) => IntervalRewards::Unavailable,
        None => {
            let ppm_elapsed =
                percent_elapsed_ppm(ongoing.now, ongoing.start_time, ongoing.end_time);
            let raw_share = ongoing
                .estimate
                .as_ref()
                .and_then(|doc| doc.node_entry(node))
                .map(RewardShare::from_entry)
                .unwrap_or_default();
            let projected_share = RewardShare {
                smoothing_pool_eth: project_full_interval(raw_share.smoothing_pool_eth, ppm_elapsed),
                collateral_token: project_full_interval(raw_share.collateral_token, ppm_elapsed),
                oracle_dao_token: project_full_interval(raw_share.oracle_dao_token, ppm_elapsed),
            };
            IntervalRewards::Estimated { raw_share, projected_share, ppm_elapsed }
        }
    };
    entries.push(LedgerEntry {
        reward_index: ongoing.index,
        start_time: Some(ongoing.start_time),
        end_time: Some(ongoing.end_time),
        rewards: ongoing_rewards,
    });

    let mut finalized: Vec<&FinalizedSource> = finalized.iter().collect();
    finalized.sort_by_key(|source| std::cmp::Reverse(source.index));
    for source in finalized {
        let rewards = match &source.doc {
            None => IntervalRewards::Unavailable,
            Some(doc) => match doc.node_entry(node) {
                None => continue,
                Some(entry) => IntervalRewards::Finalized {
                    share: RewardShare::from_entry(entry),
                    merkle_proof: entry.merkle_proof.clone(),
                    claimed: source.claimed,
                },
            },
        };
        entries.push(LedgerEntry {
            reward_index: source.index,
            start_time: Some(source.start_time),
            end_time: Some(source.end_time),
            rewards,
        });
    }

    NodeLedger { node, entries }
}

/// Assemble the network-wide ledger from resolved sources. Pure.
pub fn build_protocol_ledger(
    finalized: &[FinalizedSource],
    ongoing: &OngoingSource,
) -> ProtocolLedger {
    let mut sources: Vec<&FinalizedSource> = finalized.iter().collect();
    sources.sort_by_key(|source| source.index);

    let mut entries: Vec<ProtocolLedgerEntry> = sources
        .into_iter()
        .map(|source| ProtocolLedgerEntry {
            reward_index: source.index,
            start_time: Some(source.start_time),
            end_time: Some(source.end_time),
            totals: source.doc.as_ref().map(|doc| doc.total_rewards.clone()),
        })
        .collect();

    let ongoing_totals = match &ongoing.pending {
        Some(PendingSource::Document(doc)) => Some(doc.total_rewards.clone()),
        Some(PendingSource::Unavailable) => None,
        None => ongoing.estimate.as_ref().map(|doc| doc.total_rewards.clone()),
    };
    entries.push(ProtocolLedgerEntry {
        reward_index: ongoing.index,
        start_time: Some(ongoing.start_time),
        end_time: Some(ongoing.end_time),
        totals: ongoing_totals,
    });

    ProtocolLedger { entries }
}

/// Query logs in block chunks to stay under provider response limits.
pub async fn query_logs_chunked<P: Provider>(
    provider: &P,
    filter: Filter,
    from_block: u64,
    to_block: u64,
) -> Result<Vec<Log>> {
    let mut all_logs = Vec::new();

    let mut current_from = from_block;
    while current_from <= to_block {
        let current_to = (current_from + LOG_QUERY_CHUNK_SIZE - 1).min(to_block);

        let chunk_filter = filter
            .clone()
            .from_block(BlockNumberOrTag::Number(current_from))
            .to_block(BlockNumberOrTag::Number(current_to));

        let logs = provider.get_logs(&chunk_filter).await?;
        all_logs.extend(logs);

        current_from = current_to + 1;
    }

    Ok(all_logs)
}

/// Key for an argumentless contract read at the latest block.
fn read_key(contract: Address, function: &'static str) -> CallKey {
    CallKey { contract, function, args: vec![], block: None }
}

/// Key for one node's claim status on one interval.
fn claim_key(distributor: Address, index: u64, node: Address) -> CallKey {
    CallKey {
        contract: distributor,
        function: "isClaimed",
        args: (U256::from(index), node).abi_encode(),
        block: None,
    }
}

/// Resolves ledgers against a deployment: event scans, contract reads, and document
/// fetches, assembled through the pure builders above. Contract reads go through
/// [CallCache]s so repeated resolves within the TTL reuse prior answers and
/// concurrent resolves share in-flight fetches.
pub struct LedgerResolver<'a, P> {
    provider: &'a P,
    deployment: &'a Deployment,
    snapshots: &'a SnapshotClient,
    reads: CallCache<U256>,
    claims: CallCache<bool>,
    cancel: CancellationToken,
}

impl<'a, P: Provider> LedgerResolver<'a, P> {
    pub fn new(provider: &'a P, deployment: &'a Deployment, snapshots: &'a SnapshotClient) -> Self {
        Self {
            provider,
            deployment,
            snapshots,
            reads: CallCache::new(READ_CACHE_TTL),
            claims: CallCache::new(READ_CACHE_TTL),
            cancel: CancellationToken::new(),
        }
    }

    /// Use the given token; cancelling it aborts resolution at the next step boundary.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            bail!("ledger resolution cancelled");
        }
        Ok(())
    }

    /// Resolve the full ledger for one node.
    pub async fn resolve_node(&self, node: Address) -> Result<NodeLedger> {
        let (mut finalized, ongoing) = self.resolve_sources().await?;
        self.mark_claimed(node, &mut finalized).await?;
        Ok(build_node_ledger(node, &finalized, &ongoing))
    }

    /// Resolve the network-wide ledger.
    pub async fn resolve_protocol(&self) -> Result<ProtocolLedger> {
        let (finalized, ongoing) = self.resolve_sources().await?;
        Ok(build_protocol_ledger(&finalized, &ongoing))
    }

    async fn resolve_sources(&self) -> Result<(Vec<FinalizedSource>, OngoingSource)> {
        self.check_cancelled()?;

        let rewards_pool =
            IRewardsPool::new(self.deployment.rewards_pool_address, self.provider);
        let current_block =
            self.provider.get_block_number().await.context("failed to get block number")?;

        // Every finalized interval is announced by exactly one consensus event.
        let snapshot_filter = Filter::new()
            .address(self.deployment.rewards_pool_address)
            .event_signature(IRewardsPool::RewardSnapshot::SIGNATURE_HASH);
        let snapshot_logs = query_logs_chunked(
            self.provider,
            snapshot_filter,
            self.deployment.from_block,
            current_block,
        )
        .await
        .context("failed to query reward snapshot events")?;
        tracing::debug!("found {} reward snapshot events", snapshot_logs.len());

        self.check_cancelled()?;

        let mut announced = Vec::with_capacity(snapshot_logs.len());
        for log in &snapshot_logs {
            let decoded = log
                .log_decode::<IRewardsPool::RewardSnapshot>()
                .context("failed to decode RewardSnapshot event")?;
            let data = decoded.inner.data;
            announced.push((
                data.rewardIndex.to::<u64>(),
                data.treeCid.clone(),
                data.intervalStartTime.to::<u64>(),
                data.intervalEndTime.to::<u64>(),
            ));
        }

        let pool_address = self.deployment.rewards_pool_address;
        let ongoing_index = self
            .reads
            .get_or_fetch(read_key(pool_address, "getRewardIndex"), || async {
                rewards_pool.getRewardIndex().call().await.context("getRewardIndex failed")
            })
            .await?
            .to::<u64>();

        // Interval timing for the ongoing row. The configured interval length is
        // protocol state; the fallback only covers an unreadable configuration.
        let ongoing_start = self
            .reads
            .get_or_fetch(read_key(pool_address, "getClaimIntervalTimeStart"), || async {
                rewards_pool
                    .getClaimIntervalTimeStart()
                    .call()
                    .await
                    .context("getClaimIntervalTimeStart failed")
            })
            .await?
            .to::<u64>();
        let interval_time = match self
            .reads
            .get_or_fetch(read_key(pool_address, "getClaimIntervalTime"), || async {
                rewards_pool
                    .getClaimIntervalTime()
                    .call()
                    .await
                    .context("getClaimIntervalTime failed")
            })
            .await
        {
            Ok(time) => time.to::<u64>(),
            Err(err) => {
                tracing::warn!("getClaimIntervalTime failed, assuming fallback length: {err:#}");
                FALLBACK_INTERVAL_TIME
            }
        };

        self.check_cancelled()?;

        // Submissions for the ongoing interval precede consensus; the latest
        // submission's document carries the pending amounts.
        let submitted_filter = Filter::new()
            .address(self.deployment.rewards_pool_address)
            .event_signature(IRewardsPool::RewardSnapshotSubmitted::SIGNATURE_HASH)
            .topic2(B256::from(U256::from(ongoing_index)));
        let submitted_logs = query_logs_chunked(
            self.provider,
            submitted_filter,
            self.deployment.from_block,
            current_block,
        )
        .await
        .context("failed to query snapshot submission events")?;
        let pending_cid = submitted_logs
            .last()
            .map(|log| {
                log.log_decode::<IRewardsPool::RewardSnapshotSubmitted>()
                    .context("failed to decode RewardSnapshotSubmitted event")
                    .map(|decoded| decoded.inner.data.treeCid.clone())
            })
            .transpose()?;

        self.check_cancelled()?;

        // Fetch all documents concurrently; a failed fetch degrades that interval
        // to Unavailable rather than failing resolution.
        let doc_fetches = announced.iter().map(|(index, cid, _, _)| async move {
            match self.snapshots.fetch_tree(cid).await {
                Ok(doc) => Some(doc),
                Err(err) => {
                    tracing::warn!("failed to fetch tree for interval {index}: {err:#}");
                    None
                }
            }
        });
        let docs = join_all(doc_fetches).await;

        let finalized: Vec<FinalizedSource> = announced
            .iter()
            .zip(docs)
            .map(|((index, _, start, end), doc)| FinalizedSource {
                index: *index,
                start_time: *start,
                end_time: *end,
                doc,
                claimed: ClaimStatus::Unknown,
            })
            .collect();

        self.check_cancelled()?;

        let pending = match pending_cid {
            Some(cid) => match self.snapshots.fetch_tree(&cid).await {
                Ok(doc) => Some(PendingSource::Document(doc)),
                Err(err) => {
                    tracing::warn!("failed to fetch pending tree for interval {ongoing_index}: {err:#}");
                    Some(PendingSource::Unavailable)
                }
            },
            None => None,
        };

        let estimate = if pending.is_none() {
            match self.snapshots.fetch_estimate().await {
                Ok(doc) => doc,
                Err(err) => {
                    tracing::warn!("failed to fetch reward estimate: {err:#}");
                    None
                }
            }
        } else {
            None
        };

        let ongoing = OngoingSource {
            index: ongoing_index,
            start_time: ongoing_start,
            end_time: ongoing_start + interval_time,
            pending,
            estimate,
            now: chrono::Utc::now().timestamp() as u64,
        };

        Ok((finalized, ongoing))
    }

    /// Fill in the claim status of each finalized interval for `node`.
    async fn mark_claimed(&self, node: Address, finalized: &mut [FinalizedSource]) -> Result<()> {
        if finalized.is_empty() {
            return Ok(());
        }
        self.check_cancelled()?;

        let distributor_address = self.deployment.merkle_distributor_address;
        let distributor = IMerkleDistributor::new(distributor_address, self.provider);

        // Serve what the cache already knows, then batch the rest.
        let mut misses = Vec::new();
        for (i, source) in finalized.iter_mut().enumerate() {
            match self.claims.get(&claim_key(distributor_address, source.index, node)).await {
                Some(true) => source.claimed = ClaimStatus::Claimed,
                Some(false) => source.claimed = ClaimStatus::Unclaimed,
                None => misses.push(i),
            }
        }

        for chunk in misses.chunks(MULTICALL_CHUNK_SIZE) {
            let mut multicall =
                self.provider.multicall().dynamic::<IMerkleDistributor::isClaimedCall>();
            for &i in chunk {
                multicall = multicall
                    .add_dynamic(distributor.isClaimed(U256::from(finalized[i].index), node));
            }
            // A failed lookup leaves those intervals at unknown claim status, which
            // is never claimable; the rest of the ledger still resolves.
            let results: Vec<bool> = match multicall.aggregate().await {
                Ok(results) => results,
                Err(err) => {
                    tracing::warn!(
                        "claim status lookup failed for {} interval(s): {err:#}",
                        chunk.len()
                    );
                    continue;
                }
            };
            for (&i, claimed) in chunk.iter().zip(results) {
                let key = claim_key(distributor_address, finalized[i].index, node);
                self.claims.insert(key, claimed).await;
                finalized[i].claimed =
                    if claimed { ClaimStatus::Claimed } else { ClaimStatus::Unclaimed };
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PPM_SCALE;
    use alloy::primitives::address;

    const NODE: Address = address!("0x1111111111111111111111111111111111111111");
    const OTHER: Address = address!("0x2222222222222222222222222222222222222222");

    fn doc_with(node: Address, eth: u64, token: u64, proof: bool) -> Arc<RewardsTreeDocument> {
        let mut doc = RewardsTreeDocument::default();
        doc.node_rewards.insert(
            node,
            NodeRewardsEntry {
                smoothing_pool_eth: U256::from(eth),
                collateral_rpl: U256::from(token),
                oracle_dao_rpl: U256::ZERO,
                merkle_proof: if proof { vec![B256::from([0xaa; 32])] } else { vec![] },
            },
        );
        Arc::new(doc)
    }

    fn finalized(
        index: u64,
        doc: Option<Arc<RewardsTreeDocument>>,
        claimed: ClaimStatus,
    ) -> FinalizedSource {
        FinalizedSource {
            index,
            start_time: index * 1_000,
            end_time: (index + 1) * 1_000,
            doc,
            claimed,
        }
    }

    fn ongoing(index: u64) -> OngoingSource {
        OngoingSource {
            index,
            start_time: 10_000,
            end_time: 12_000,
            pending: None,
            estimate: None,
            now: 11_000,
        }
    }

    #[test]
    fn ongoing_entry_is_first_and_unique() {
        let sources = vec![
            finalized(0, Some(doc_with(NODE, 10, 5, true)), ClaimStatus::Claimed),
            finalized(1, Some(doc_with(NODE, 20, 5, true)), ClaimStatus::Unclaimed),
        ];
        let ledger = build_node_ledger(NODE, &sources, &ongoing(2));

        assert_eq!(ledger.entries[0].reward_index, 2);
        assert!(matches!(ledger.entries[0].rewards, IntervalRewards::Estimated { .. }));
        let ongoing_count = ledger
            .entries
            .iter()
            .filter(|e| matches!(e.rewards, IntervalRewards::Estimated { .. } | IntervalRewards::Pending { .. }))
            .count();
        assert_eq!(ongoing_count, 1);

        // Finalized entries newest first after the ongoing row.
        assert_eq!(ledger.entries[1].reward_index, 1);
        assert_eq!(ledger.entries[2].reward_index, 0);
    }

    #[test]
    fn assembly_is_idempotent() {
        let sources = vec![
            finalized(1, Some(doc_with(NODE, 20, 5, true)), ClaimStatus::Unclaimed),
            finalized(0, Some(doc_with(NODE, 10, 5, true)), ClaimStatus::Claimed),
        ];
        let a = build_node_ledger(NODE, &sources, &ongoing(2));
        let b = build_node_ledger(NODE, &sources, &ongoing(2));
        assert_eq!(a.entries, b.entries);
    }

    #[test]
    fn absent_node_intervals_are_skipped() {
        let sources = vec![
            finalized(0, Some(doc_with(NODE, 10, 5, true)), ClaimStatus::Unclaimed),
            finalized(1, Some(doc_with(OTHER, 99, 99, true)), ClaimStatus::Unclaimed),
        ];
        let ledger = build_node_ledger(NODE, &sources, &ongoing(2));
        let indices: Vec<u64> = ledger.entries.iter().map(|e| e.reward_index).collect();
        assert_eq!(indices, vec![2, 0]);
    }

    #[test]
    fn unfetchable_documents_surface_as_unavailable() {
        let sources = vec![finalized(0, None, ClaimStatus::Unknown)];
        let ledger = build_node_ledger(NODE, &sources, &ongoing(1));
        assert_eq!(ledger.entries[1].rewards, IntervalRewards::Unavailable);
        // Unavailable entries never count as claimable.
        assert!(ledger.claimable_entries().is_empty());
    }

    #[test]
    fn pending_document_yields_exact_unclaimable_share() {
        let mut source = ongoing(1);
        source.pending = Some(PendingSource::Document(doc_with(NODE, 30, 7, false)));
        let ledger = build_node_ledger(NODE, &[], &source);

        match &ledger.entries[0].rewards {
            IntervalRewards::Pending { share: Some(share) } => {
                assert_eq!(share.smoothing_pool_eth, U256::from(30));
                assert_eq!(share.claimable_token(), U256::from(7));
            }
            other => panic!("expected pending rewards, got {other:?}"),
        }
        assert!(ledger.claimable_entries().is_empty());
    }

    #[test]
    fn pending_node_absence_is_distinct_from_an_explicit_zero() {
        // The node is missing from the submitted tree entirely.
        let mut source = ongoing(1);
        source.pending = Some(PendingSource::Document(doc_with(OTHER, 30, 7, false)));
        let ledger = build_node_ledger(NODE, &[], &source);
        assert_eq!(ledger.entries[0].rewards, IntervalRewards::Pending { share: None });

        // The node is present with zero amounts.
        let mut source = ongoing(1);
        source.pending = Some(PendingSource::Document(doc_with(NODE, 0, 0, false)));
        let ledger = build_node_ledger(NODE, &[], &source);
        match &ledger.entries[0].rewards {
            IntervalRewards::Pending { share: Some(share) } => assert!(share.is_zero()),
            other => panic!("expected an explicit zero share, got {other:?}"),
        }
    }

    #[test]
    fn estimate_projects_to_full_interval() {
        let mut source = ongoing(1);
        // Half elapsed: now 11_000 in [10_000, 12_000].
        source.estimate = Some(doc_with(NODE, 10, 4, false));
        let ledger = build_node_ledger(NODE, &[], &source);

        match &ledger.entries[0].rewards {
            IntervalRewards::Estimated { raw_share, projected_share, ppm_elapsed } => {
                assert_eq!(*ppm_elapsed, PPM_SCALE / 2);
                assert_eq!(raw_share.smoothing_pool_eth, U256::from(10));
                assert_eq!(projected_share.smoothing_pool_eth, U256::from(20));
                assert_eq!(projected_share.collateral_token, U256::from(8));
            }
            other => panic!("expected estimated rewards, got {other:?}"),
        }
    }

    #[test]
    fn missing_estimate_is_a_zero_estimate_not_unavailable() {
        let ledger = build_node_ledger(NODE, &[], &ongoing(1));
        match &ledger.entries[0].rewards {
            IntervalRewards::Estimated { raw_share, .. } => assert!(raw_share.is_zero()),
            other => panic!("expected estimated rewards, got {other:?}"),
        }
    }

    #[test]
    fn claimable_totals_cover_unclaimed_finalized_only() {
        let sources = vec![
            finalized(0, Some(doc_with(NODE, 10, 5, true)), ClaimStatus::Claimed),
            finalized(1, Some(doc_with(NODE, 20, 6, true)), ClaimStatus::Unclaimed),
            finalized(2, Some(doc_with(NODE, 30, 7, true)), ClaimStatus::Unclaimed),
            finalized(3, None, ClaimStatus::Unknown),
        ];
        let ledger = build_node_ledger(NODE, &sources, &ongoing(4));

        let totals = ledger.claimable_totals();
        assert_eq!(totals.intervals, vec![1, 2]);
        assert_eq!(totals.smoothing_pool_eth, U256::from(50));
        assert_eq!(totals.token, U256::from(13));
    }

    #[test]
    fn unknown_claim_status_is_listed_but_never_claimable() {
        // A failed claim lookup leaves the interval at unknown status while the
        // rest of the ledger resolves; it must not enter claim calldata.
        let sources = vec![
            finalized(0, Some(doc_with(NODE, 10, 5, true)), ClaimStatus::Unknown),
            finalized(1, Some(doc_with(NODE, 20, 6, true)), ClaimStatus::Unclaimed),
        ];
        let ledger = build_node_ledger(NODE, &sources, &ongoing(2));

        assert!(matches!(
            ledger.entries[2].rewards,
            IntervalRewards::Finalized { claimed: ClaimStatus::Unknown, .. }
        ));
        let totals = ledger.claimable_totals();
        assert_eq!(totals.intervals, vec![1]);
        assert_eq!(totals.smoothing_pool_eth, U256::from(20));
    }

    #[test]
    fn protocol_ledger_is_ascending_and_complete() {
        let sources = vec![
            finalized(1, Some(doc_with(NODE, 20, 6, true)), ClaimStatus::Unclaimed),
            finalized(0, None, ClaimStatus::Unknown),
        ];
        let ledger = build_protocol_ledger(&sources, &ongoing(2));

        let indices: Vec<u64> = ledger.entries.iter().map(|e| e.reward_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(ledger.entries[0].totals.is_none());
        assert!(ledger.entries[1].totals.is_some());
    }
}
