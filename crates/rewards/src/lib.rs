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

//! Reward ledger resolution and batch sweep planning for staking node operators.

use alloy::primitives::U256;

// Declare modules
pub mod amount;
pub mod cache;
pub mod continuous;
pub mod gas;
pub mod ledger;
pub mod snapshot;
pub mod sweeper;

// Re-export commonly used types
pub use amount::{percent_elapsed_ppm, project_full_interval, sum_amounts, PPM_SCALE};

pub use cache::{prefetch_minipool_balances, CallCache, CallKey};

pub use continuous::{aggregate_continuous, ContinuousRewards, MinipoolBalance, MinipoolStatus};

pub use gas::{
    efficiency_percent, estimate_claim_intervals_gas, estimate_distribute_consensus_batch_gas,
    estimate_distribute_tips_gas, gas_cost_wei, net_receipt, GasSeverity,
};

pub use ledger::{
    build_node_ledger, build_protocol_ledger, query_logs_chunked, ClaimStatus, ClaimableTotals,
    FinalizedSource, IntervalRewards, LedgerEntry, LedgerResolver, NodeLedger, OngoingSource,
    PendingSource, ProtocolLedger, ProtocolLedgerEntry, RewardShare,
};

pub use snapshot::{NodeRewardsEntry, RewardsTreeDocument, SnapshotClient, TotalRewards};

pub use sweeper::{BatchOperation, OperationKind, SweepInputs, SweepPlan};

/// Interval length assumed before the live protocol configuration has been read.
///
/// The protocol-configured value always wins once `getClaimIntervalTime` is readable;
/// this constant only covers the window before that read resolves.
pub const FALLBACK_INTERVAL_TIME: u64 = 28 * 24 * 60 * 60;

/// Block span per `eth_getLogs` request, to stay under provider response limits.
pub const LOG_QUERY_CHUNK_SIZE: u64 = 50_000;

/// Calls per multicall batch when prefetching per-interval or per-minipool state.
pub const MULTICALL_CHUNK_SIZE: usize = 50;

/// Minipool count above which detail prefetches are staggered with bounded jitter,
/// to avoid a thundering herd against rate-limited providers.
pub const STAGGER_THRESHOLD: usize = 50;

/// Upper bound on the random delay inserted between staggered prefetch batches.
pub const STAGGER_MAX_JITTER_MS: u64 = 250;

/// Protocol-imposed maximum number of minipool distribute calls per batch.
pub const DISTRIBUTE_BATCH_LIMIT: usize = 20;

/// Per-minipool balance ceiling above which a distribute must also finalize
/// the minipool (`distributeBalance(false)`).
pub fn distribute_finalize_ceiling() -> U256 {
    // 8 ETH in wei.
    U256::from(8_000_000_000_000_000_000u128)
}
