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

//! Gas-unit estimates for the sweep sub-operations, and receipt/efficiency math.
//!
//! The per-operation figures are calibrated from historical transaction profiling.
//! They are configuration, not derivations; callers that want a live estimate can
//! try `eth_estimateGas` first and fall back to these.

use alloy::primitives::U256;

/// Fixed transaction overhead of a claim-and-stake call.
pub const CLAIM_TX_BASE_GAS: u64 = 64_000;
/// Calldata cost per claimed interval (index, amounts, proof array head).
pub const CLAIM_PER_INTERVAL_CALLDATA_GAS: u64 = 3_200;
/// Merkle proof verification cost per claimed interval.
pub const CLAIM_PER_INTERVAL_PROOF_GAS: u64 = 27_500;
/// Storage refund credited per claimed interval (claim bitmap slot write).
pub const CLAIM_PER_INTERVAL_REFUND_GAS: u64 = 4_100;
/// Flat protocol token transfer cost.
pub const CLAIM_TOKEN_TRANSFER_GAS: u64 = 34_000;
/// Flat native asset transfer cost.
pub const CLAIM_ETH_TRANSFER_GAS: u64 = 12_500;
/// Staking call cost, paid only when a nonzero amount is restaked.
pub const CLAIM_RESTAKE_GAS: u64 = 106_000;

/// Fixed transaction overhead of a tips/MEV distribute call.
pub const TIPS_TX_BASE_GAS: u64 = 21_000;
/// Flat distributor `distribute()` cost. No batch dimension.
pub const TIPS_DISTRIBUTE_GAS: u64 = 66_500;

/// Fixed transaction overhead of a consensus-batch distribute call.
pub const BATCH_TX_BASE_GAS: u64 = 39_000;
/// Calldata cost per batched minipool.
pub const BATCH_PER_MINIPOOL_CALLDATA_GAS: u64 = 900;
/// `distributeBalance` cost per batched minipool.
pub const BATCH_PER_MINIPOOL_DISTRIBUTE_GAS: u64 = 168_000;
/// Storage refund credited per batched minipool.
pub const BATCH_PER_MINIPOOL_REFUND_GAS: u64 = 6_200;

/// Gas estimate for claiming `intervals` finalized intervals, optionally restaking
/// part of the claimed token. An empty claim costs nothing.
pub fn estimate_claim_intervals_gas(intervals: u64, restaking: bool) -> u64 {
    if intervals == 0 {
        return 0;
    }
    let per_interval = CLAIM_PER_INTERVAL_CALLDATA_GAS + CLAIM_PER_INTERVAL_PROOF_GAS
        - CLAIM_PER_INTERVAL_REFUND_GAS;
    let mut gas = CLAIM_TX_BASE_GAS
        + intervals * per_interval
        + CLAIM_TOKEN_TRANSFER_GAS
        + CLAIM_ETH_TRANSFER_GAS;
    if restaking {
        gas += CLAIM_RESTAKE_GAS;
    }
    gas
}

/// Gas estimate for distributing the node's execution-layer tips/MEV share.
pub fn estimate_distribute_tips_gas() -> u64 {
    TIPS_TX_BASE_GAS + TIPS_DISTRIBUTE_GAS
}

/// Gas estimate for a consensus-rewards distribute batch over `members` minipools.
/// An empty batch costs nothing.
pub fn estimate_distribute_consensus_batch_gas(members: u64) -> u64 {
    if members == 0 {
        return 0;
    }
    let per_member = BATCH_PER_MINIPOOL_CALLDATA_GAS + BATCH_PER_MINIPOOL_DISTRIBUTE_GAS
        - BATCH_PER_MINIPOOL_REFUND_GAS;
    BATCH_TX_BASE_GAS + members * per_member
}

/// Total gas cost in wei.
pub fn gas_cost_wei(gas_units: u64, gas_price_wei: U256) -> U256 {
    U256::from(gas_units).saturating_mul(gas_price_wei)
}

/// Gross proceeds minus gas cost, saturating at zero.
pub fn net_receipt(gross: U256, gas_units: u64, gas_price_wei: U256) -> U256 {
    gross.saturating_sub(gas_cost_wei(gas_units, gas_price_wei))
}

/// Share of gross proceeds kept after gas, as a percentage in `[0, 100]`.
///
/// Saturates at 0% when the gas cost exceeds the gross proceeds. A zero gross is
/// defined as 0% so the degenerate case stays displayable without a division by zero.
pub fn efficiency_percent(gross: U256, gas_units: u64, gas_price_wei: U256) -> f64 {
    if gross.is_zero() {
        return 0.0;
    }
    let net = net_receipt(gross, gas_units, gas_price_wei);
    // Basis points via U256 keeps the division exact for 256-bit amounts.
    let bps = net * U256::from(10_000u64) / gross;
    bps.to::<u64>() as f64 / 100.0
}

/// Display/alerting band for a claim's gas efficiency. Thresholds are tunable
/// policy, not a structural invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasSeverity {
    Good,
    Caution,
    Poor,
}

impl GasSeverity {
    /// Band for an efficiency percentage: `>99` good, `>95` caution, else poor.
    pub fn from_efficiency(percent: f64) -> Self {
        if percent > 99.0 {
            GasSeverity::Good
        } else if percent > 95.0 {
            GasSeverity::Caution
        } else {
            GasSeverity::Poor
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batches_cost_nothing() {
        assert_eq!(estimate_claim_intervals_gas(0, false), 0);
        assert_eq!(estimate_claim_intervals_gas(0, true), 0);
        assert_eq!(estimate_distribute_consensus_batch_gas(0), 0);
    }

    #[test]
    fn restake_cost_is_conditional() {
        let without = estimate_claim_intervals_gas(3, false);
        let with = estimate_claim_intervals_gas(3, true);
        assert_eq!(with - without, CLAIM_RESTAKE_GAS);
    }

    #[test]
    fn claim_gas_grows_linearly_per_interval() {
        let one = estimate_claim_intervals_gas(1, false);
        let two = estimate_claim_intervals_gas(2, false);
        let per_interval = CLAIM_PER_INTERVAL_CALLDATA_GAS + CLAIM_PER_INTERVAL_PROOF_GAS
            - CLAIM_PER_INTERVAL_REFUND_GAS;
        assert_eq!(two - one, per_interval);
    }

    #[test]
    fn efficiency_is_bounded() {
        // gross 100 wei, gas cost 1 wei -> 99%.
        let eff = efficiency_percent(U256::from(100), 1, U256::from(1));
        assert!((eff - 99.0).abs() < f64::EPSILON);

        // Gas cost above gross saturates at 0%, never negative.
        let eff = efficiency_percent(U256::from(100), 200, U256::from(1));
        assert_eq!(eff, 0.0);

        // Zero gross is defined as 0%.
        assert_eq!(efficiency_percent(U256::ZERO, 100, U256::from(1)), 0.0);

        // Free gas is 100%.
        assert_eq!(efficiency_percent(U256::from(100), 0, U256::from(1)), 100.0);
    }

    #[test]
    fn severity_bands() {
        assert_eq!(GasSeverity::from_efficiency(99.5), GasSeverity::Good);
        assert_eq!(GasSeverity::from_efficiency(99.0), GasSeverity::Caution);
        assert_eq!(GasSeverity::from_efficiency(96.0), GasSeverity::Caution);
        assert_eq!(GasSeverity::from_efficiency(95.0), GasSeverity::Poor);
        assert_eq!(GasSeverity::from_efficiency(0.0), GasSeverity::Poor);
    }

    #[test]
    fn net_receipt_saturates() {
        assert_eq!(net_receipt(U256::from(100), 1, U256::from(1)), U256::from(99));
        assert_eq!(net_receipt(U256::from(100), 200, U256::from(1)), U256::ZERO);
    }
}
