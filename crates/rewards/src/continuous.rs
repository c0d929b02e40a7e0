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

//! Continuous (non-interval) rewards: undistributed minipool balances and the
//! node's execution-layer tip/MEV share.

use alloy::primitives::{Address, U256};

/// Operational status of a minipool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinipoolStatus {
    Initialized,
    Prelaunch,
    Staking,
    Dissolved,
}

impl MinipoolStatus {
    /// Decode the on-chain status code. The deprecated withdrawable code and any
    /// unknown future codes map to `Dissolved`, which never contributes to totals.
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => MinipoolStatus::Initialized,
            1 => MinipoolStatus::Prelaunch,
            2 => MinipoolStatus::Staking,
            _ => MinipoolStatus::Dissolved,
        }
    }
}

/// A minipool's undistributed balance, split into node and protocol shares where
/// the contract version supports the fee split.
#[derive(Debug, Clone)]
pub struct MinipoolBalance {
    pub minipool: Address,
    pub node: Address,
    pub status: MinipoolStatus,
    pub total_balance: U256,
    /// Node operator's share. Zero (undefined) when not fee-split upgraded.
    pub node_share: U256,
    /// Pooled depositors' share. Zero (undefined) when not fee-split upgraded.
    pub protocol_share: U256,
    /// Legacy contracts lack a node/protocol balance split and must not be
    /// distributed through the batch path.
    pub fee_split_upgraded: bool,
}

impl MinipoolBalance {
    /// Whether this minipool can contribute to a distribute batch: staking,
    /// fee-split upgraded, and holding a nonzero balance.
    pub fn is_distribution_eligible(&self) -> bool {
        self.status == MinipoolStatus::Staking
            && self.fee_split_upgraded
            && self.total_balance > U256::ZERO
    }
}

/// Aggregate continuous rewards for one node.
#[derive(Debug, Clone, Default)]
pub struct ContinuousRewards {
    /// Sum of eligible minipools' node shares.
    pub node_share_total: U256,
    /// Sum of eligible minipools' protocol shares.
    pub protocol_share_total: U256,
    /// The node's share held by its fee distributor contract. This lives in a
    /// separate sub-account from minipool balances and is queried independently.
    pub distributor_node_share: U256,
    /// Minipools that contributed to the totals.
    pub contributing_minipools: Vec<Address>,
}

impl ContinuousRewards {
    /// Node share across both sub-account kinds.
    pub fn node_total(&self) -> U256 {
        self.node_share_total.saturating_add(self.distributor_node_share)
    }
}

/// Sum node/protocol shares across the node's eligible minipools.
///
/// Ineligible minipools (wrong status, or not fee-split upgraded) contribute zero
/// to the totals but are not removed from the caller's listing; this aggregation
/// excludes them from sums, not from existence.
pub fn aggregate_continuous(
    minipools: &[MinipoolBalance],
    distributor_node_share: U256,
) -> ContinuousRewards {
    let mut totals = ContinuousRewards { distributor_node_share, ..Default::default() };

    for minipool in minipools {
        if !minipool.is_distribution_eligible() {
            continue;
        }
        totals.node_share_total = totals.node_share_total.saturating_add(minipool.node_share);
        totals.protocol_share_total =
            totals.protocol_share_total.saturating_add(minipool.protocol_share);
        totals.contributing_minipools.push(minipool.minipool);
    }

    totals
}
