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

//! Sweep planning: fold a node's claimable intervals, tips share, and distributable
//! minipool balances into one atomic multicall transaction.
//!
//! A plan is a pure value over resolved inputs. Toggling operations or adjusting the
//! restake amount re-derives estimates from the inputs; nothing is mutated
//! optimistically, so a plan stays consistent with the chain state it was built from
//! until the caller re-resolves.

use std::time::Duration;

use alloy::{
    primitives::{utils::format_ether, Address, U256},
    providers::Provider,
    rpc::types::TransactionReceipt,
    sol_types::SolCall,
};
use anyhow::{bail, ensure, Context, Result};
use nodesweep_contracts::{
    extract_tx_log, Deployment, IMerkleDistributor, IMinipool, IMulticall3, INodeDistributor,
};

use crate::{
    continuous::MinipoolBalance,
    distribute_finalize_ceiling,
    gas::{
        estimate_claim_intervals_gas, estimate_distribute_consensus_batch_gas,
        estimate_distribute_tips_gas, gas_cost_wei, net_receipt,
    },
    ledger::{IntervalRewards, NodeLedger},
    DISTRIBUTE_BATCH_LIMIT,
};

/// One whole protocol token, the restake adjustment step.
fn one_token() -> U256 {
    U256::from(1_000_000_000_000_000_000u128)
}

/// Everything a sweep plan is derived from. Resolved once; the plan never goes back
/// to the chain.
#[derive(Debug, Clone)]
pub struct SweepInputs {
    pub node: Address,
    pub ledger: NodeLedger,
    pub minipools: Vec<MinipoolBalance>,
    pub distributor_node_share: U256,
    pub distributor_address: Address,
}

/// The sub-operations a sweep can contain, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    ClaimIntervals,
    DistributeTips,
    DistributeConsensusBatch,
}

/// One planned sub-operation with its estimated effects.
#[derive(Debug, Clone)]
pub struct BatchOperation {
    pub kind: OperationKind,
    pub enabled: bool,
    pub estimated_gas_units: u64,
    /// ETH credited to the node by this operation.
    pub estimated_eth_delta: U256,
    /// Protocol token credited to the node's wallet by this operation, net of restake.
    pub estimated_token_delta: U256,
}

/// An adjustable sweep plan over fixed inputs.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    inputs: SweepInputs,
    pub claim_enabled: bool,
    pub restake_amount: U256,
    pub tips_enabled: bool,
    pub consensus_enabled: bool,
    pub batch_size: usize,
    /// Minipools below this balance are left out of the consensus batch.
    pub eth_threshold: U256,
}

impl SweepPlan {
    /// Build a plan with defaults: every operation with something to do is enabled,
    /// the full claimable token amount is restaked, and the batch takes the largest
    /// balances up to the protocol limit.
    pub fn from_inputs(inputs: SweepInputs) -> Self {
        let totals = inputs.ledger.claimable_totals();
        let has_claim =
            !totals.intervals.is_empty() && !(totals.smoothing_pool_eth + totals.token).is_zero();
        let eligible_count =
            inputs.minipools.iter().filter(|m| m.is_distribution_eligible()).count();
        let tips_enabled = !inputs.distributor_node_share.is_zero();

        Self {
            claim_enabled: has_claim,
            restake_amount: totals.token,
            tips_enabled,
            consensus_enabled: eligible_count > 0,
            batch_size: eligible_count.min(DISTRIBUTE_BATCH_LIMIT),
            eth_threshold: U256::ZERO,
            inputs,
        }
    }

    pub fn inputs(&self) -> &SweepInputs {
        &self.inputs
    }

    /// Set the restake amount, clamped to the claimable token total and rounded down
    /// to a whole token. The maximum is representable exactly so "restake everything"
    /// never leaves dust behind.
    pub fn set_restake_amount(&mut self, amount: U256) {
        let max = self.inputs.ledger.claimable_totals().token;
        if amount >= max {
            self.restake_amount = max;
        } else {
            self.restake_amount = amount - amount % one_token();
        }
    }

    /// Set how many minipools the consensus batch may contain, capped at the
    /// protocol limit and the eligible population.
    pub fn set_batch_size(&mut self, size: usize) {
        self.batch_size = size.min(DISTRIBUTE_BATCH_LIMIT).min(self.eligible_minipools().len());
    }

    /// Distribution-eligible minipools, largest balance first. Ties break on address
    /// so the ordering is total and the same inputs always yield the same batch.
    pub fn eligible_minipools(&self) -> Vec<&MinipoolBalance> {
        let mut eligible: Vec<&MinipoolBalance> =
            self.inputs.minipools.iter().filter(|m| m.is_distribution_eligible()).collect();
        eligible.sort_by(|a, b| {
            b.total_balance.cmp(&a.total_balance).then_with(|| a.minipool.cmp(&b.minipool))
        });
        eligible
    }

    /// The minipools the consensus batch would distribute under the current settings.
    pub fn current_batch(&self) -> Vec<&MinipoolBalance> {
        self.eligible_minipools()
            .into_iter()
            .filter(|m| m.total_balance >= self.eth_threshold)
            .take(self.batch_size)
            .collect()
    }

    fn claim_operation(&self) -> BatchOperation {
        let totals = self.inputs.ledger.claimable_totals();
        let enabled = self.claim_enabled && !totals.intervals.is_empty();
        BatchOperation {
            kind: OperationKind::ClaimIntervals,
            enabled,
            estimated_gas_units: if enabled {
                estimate_claim_intervals_gas(
                    totals.intervals.len() as u64,
                    !self.restake_amount.is_zero(),
                )
            } else {
                0
            },
            estimated_eth_delta: if enabled { totals.smoothing_pool_eth } else { U256::ZERO },
            estimated_token_delta: if enabled {
                totals.token.saturating_sub(self.restake_amount)
            } else {
                U256::ZERO
            },
        }
    }

    fn tips_operation(&self) -> BatchOperation {
        let enabled = self.tips_enabled && !self.inputs.distributor_node_share.is_zero();
        BatchOperation {
            kind: OperationKind::DistributeTips,
            enabled,
            estimated_gas_units: if enabled { estimate_distribute_tips_gas() } else { 0 },
            estimated_eth_delta: if enabled {
                self.inputs.distributor_node_share
            } else {
                U256::ZERO
            },
            estimated_token_delta: U256::ZERO,
        }
    }

    fn consensus_operation(&self) -> BatchOperation {
        let batch = self.current_batch();
        let enabled = self.consensus_enabled && !batch.is_empty();
        let node_eth: U256 = batch.iter().fold(U256::ZERO, |acc, m| acc.saturating_add(m.node_share));
        BatchOperation {
            kind: OperationKind::DistributeConsensusBatch,
            enabled,
            estimated_gas_units: if enabled {
                estimate_distribute_consensus_batch_gas(batch.len() as u64)
            } else {
                0
            },
            estimated_eth_delta: if enabled { node_eth } else { U256::ZERO },
            estimated_token_delta: U256::ZERO,
        }
    }

    /// All sub-operations in submission order, including disabled ones.
    pub fn operations(&self) -> Vec<BatchOperation> {
        vec![self.claim_operation(), self.tips_operation(), self.consensus_operation()]
    }

    /// Total gas units across enabled operations.
    pub fn estimated_gas_units(&self) -> u64 {
        self.operations().iter().filter(|op| op.enabled).map(|op| op.estimated_gas_units).sum()
    }

    /// Total ETH the sweep would credit the node, before gas.
    pub fn gross_eth_total(&self) -> U256 {
        self.operations()
            .iter()
            .filter(|op| op.enabled)
            .fold(U256::ZERO, |acc, op| acc.saturating_add(op.estimated_eth_delta))
    }

    /// Net ETH after gas at the given price, saturating at zero.
    pub fn net_receipt_wei(&self, gas_price_wei: U256) -> U256 {
        net_receipt(self.gross_eth_total(), self.estimated_gas_units(), gas_price_wei)
    }

    /// Share of gross proceeds kept after gas, as a percentage.
    pub fn efficiency_percent(&self, gas_price_wei: U256) -> f64 {
        crate::gas::efficiency_percent(
            self.gross_eth_total(),
            self.estimated_gas_units(),
            gas_price_wei,
        )
    }

    /// Estimated gas cost in wei at the given price.
    pub fn gas_cost_wei(&self, gas_price_wei: U256) -> U256 {
        gas_cost_wei(self.estimated_gas_units(), gas_price_wei)
    }

    /// Encode the enabled operations as multicall legs, in submission order.
    /// Every leg has `allowFailure = false`, so the whole sweep reverts together.
    pub fn build_calls(&self, deployment: &Deployment) -> Vec<IMulticall3::Call3> {
        let mut calls = Vec::new();

        if self.claim_operation().enabled {
            let mut reward_index = Vec::new();
            let mut amount_token = Vec::new();
            let mut amount_eth = Vec::new();
            let mut merkle_proof = Vec::new();
            for entry in self.inputs.ledger.claimable_entries() {
                if let IntervalRewards::Finalized { share, merkle_proof: proof, .. } =
                    &entry.rewards
                {
                    reward_index.push(U256::from(entry.reward_index));
                    amount_token.push(share.claimable_token());
                    amount_eth.push(share.smoothing_pool_eth);
                    merkle_proof.push(proof.clone());
                }
            }
            let call = IMerkleDistributor::claimAndStakeCall {
                nodeAddress: self.inputs.node,
                rewardIndex: reward_index,
                amountToken: amount_token,
                amountEth: amount_eth,
                merkleProof: merkle_proof,
                stakeAmount: self.restake_amount,
            };
            calls.push(IMulticall3::Call3 {
                target: deployment.merkle_distributor_address,
                allowFailure: false,
                callData: call.abi_encode().into(),
            });
        }

        if self.tips_operation().enabled {
            calls.push(IMulticall3::Call3 {
                target: self.inputs.distributor_address,
                allowFailure: false,
                callData: INodeDistributor::distributeCall {}.abi_encode().into(),
            });
        }

        if self.consensus_operation().enabled {
            for minipool in self.current_batch() {
                // Above the protocol ceiling the distribute must also finalize.
                let rewards_only = minipool.total_balance <= distribute_finalize_ceiling();
                calls.push(IMulticall3::Call3 {
                    target: minipool.minipool,
                    allowFailure: false,
                    callData: IMinipool::distributeBalanceCall { rewardsOnly: rewards_only }
                        .abi_encode()
                        .into(),
                });
            }
        }

        calls
    }

    /// Submit the planned sweep through Multicall3 and wait for inclusion.
    pub async fn execute<P: Provider>(
        &self,
        provider: &P,
        deployment: &Deployment,
        tx_timeout: Duration,
    ) -> Result<TransactionReceipt> {
        let calls = self.build_calls(deployment);
        if calls.is_empty() {
            bail!("sweep plan contains no enabled operations");
        }
        tracing::info!(
            "submitting sweep with {} calls, ~{} gas",
            calls.len(),
            self.estimated_gas_units()
        );

        let multicall = IMulticall3::new(deployment.multicall3_address, provider);
        let call = multicall.aggregate3(calls);
        let call = match call.estimate_gas().await {
            Ok(gas) => call.gas(gas),
            Err(err) => {
                tracing::warn!("eth_estimateGas failed, using calibrated estimate: {err:#}");
                call.gas(self.estimated_gas_units())
            }
        };

        let pending = call.send().await.context("failed to send sweep transaction")?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(%tx_hash, "sweep transaction sent");

        let receipt = pending
            .with_timeout(Some(tx_timeout))
            .get_receipt()
            .await
            .context("failed to confirm sweep transaction")?;
        ensure!(receipt.status(), "sweep transaction reverted: {tx_hash}");
        tracing::info!(block = receipt.block_number, "sweep transaction confirmed");

        if self.claim_operation().enabled {
            match extract_tx_log::<IMerkleDistributor::RewardsClaimed>(&receipt) {
                Ok(log) => {
                    let claim = log.data();
                    tracing::info!(
                        "claimed {} interval(s): {} ETH, {} token",
                        claim.rewardIndex.len(),
                        format_ether(claim.amountEth),
                        format_ether(claim.amountToken),
                    );
                }
                Err(err) => tracing::warn!("could not decode claim event from receipt: {err:#}"),
            }
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        continuous::MinipoolStatus,
        ledger::{ClaimStatus, LedgerEntry, RewardShare},
    };
    use alloy::primitives::{address, B256};

    const NODE: Address = address!("0x1111111111111111111111111111111111111111");
    const DISTRIBUTOR: Address = address!("0x2222222222222222222222222222222222222222");

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(1_000_000_000_000_000_000u128)
    }

    fn finalized_entry(
        index: u64,
        smoothing_eth: U256,
        token: U256,
        claimed: ClaimStatus,
    ) -> LedgerEntry {
        LedgerEntry {
            reward_index: index,
            start_time: Some(0),
            end_time: Some(1),
            rewards: IntervalRewards::Finalized {
                share: RewardShare {
                    smoothing_pool_eth: smoothing_eth,
                    collateral_token: token,
                    oracle_dao_token: U256::ZERO,
                },
                merkle_proof: vec![B256::from([index as u8; 32])],
                claimed,
            },
        }
    }

    fn minipool(tag: u8, balance: U256) -> MinipoolBalance {
        MinipoolBalance {
            minipool: Address::from([tag; 20]),
            node: NODE,
            status: MinipoolStatus::Staking,
            total_balance: balance,
            node_share: balance / U256::from(2),
            protocol_share: balance - balance / U256::from(2),
            fee_split_upgraded: true,
        }
    }

    fn inputs(
        entries: Vec<LedgerEntry>,
        minipools: Vec<MinipoolBalance>,
        tips: U256,
    ) -> SweepInputs {
        SweepInputs {
            node: NODE,
            ledger: NodeLedger { node: NODE, entries },
            minipools,
            distributor_node_share: tips,
            distributor_address: DISTRIBUTOR,
        }
    }

    #[test]
    fn batch_takes_largest_balances_first() {
        let pools =
            vec![minipool(1, eth(5)), minipool(2, eth(3)), minipool(3, eth(8)), minipool(4, eth(1))];
        let mut plan = SweepPlan::from_inputs(inputs(vec![], pools, U256::ZERO));
        plan.set_batch_size(2);

        let batch = plan.current_batch();
        let balances: Vec<U256> = batch.iter().map(|m| m.total_balance).collect();
        assert_eq!(balances, vec![eth(8), eth(5)]);
    }

    #[test]
    fn batch_size_is_capped_at_protocol_limit() {
        let pools: Vec<MinipoolBalance> =
            (1..=30).map(|tag| minipool(tag, eth(1))).collect();
        let plan = SweepPlan::from_inputs(inputs(vec![], pools, U256::ZERO));
        assert_eq!(plan.batch_size, DISTRIBUTE_BATCH_LIMIT);
        assert_eq!(plan.current_batch().len(), DISTRIBUTE_BATCH_LIMIT);
    }

    #[test]
    fn threshold_filters_small_balances() {
        let pools = vec![minipool(1, eth(5)), minipool(2, eth(1))];
        let mut plan = SweepPlan::from_inputs(inputs(vec![], pools, U256::ZERO));
        plan.eth_threshold = eth(2);
        let batch = plan.current_batch();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].total_balance, eth(5));
    }

    #[test]
    fn default_plan_sweeps_everything() {
        // 2 ETH smoothing pool + 0.5 ETH minipool node share, no tips.
        let entries =
            vec![finalized_entry(0, eth(2), U256::from(100) * eth(1), ClaimStatus::Unclaimed)];
        let pools = vec![minipool(1, eth(1))];
        let plan = SweepPlan::from_inputs(inputs(entries, pools, U256::ZERO));

        assert!(plan.claim_enabled);
        assert!(plan.consensus_enabled);
        assert!(!plan.tips_enabled);
        // Full claimable token restaked by default.
        assert_eq!(plan.restake_amount, U256::from(100) * eth(1));

        let gross = plan.gross_eth_total();
        assert_eq!(gross, eth(2) + eth(1) / U256::from(2));

        let ops = plan.operations();
        assert!(ops[0].enabled && ops[2].enabled && !ops[1].enabled);
        // Restaking everything leaves no token in the wallet.
        assert_eq!(ops[0].estimated_token_delta, U256::ZERO);

        let calls = plan.build_calls(&nodesweep_contracts::deployments::MAINNET);
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|call| !call.allowFailure));
    }

    #[test]
    fn disabling_an_operation_removes_its_gas_and_calls() {
        let entries = vec![finalized_entry(0, eth(2), eth(1), ClaimStatus::Unclaimed)];
        let pools = vec![minipool(1, eth(1))];
        let mut plan = SweepPlan::from_inputs(inputs(entries, pools, eth(1)));

        let full_gas = plan.estimated_gas_units();
        let full_calls = plan.build_calls(&nodesweep_contracts::deployments::MAINNET).len();
        assert_eq!(full_calls, 3);

        plan.tips_enabled = false;
        assert_eq!(plan.estimated_gas_units(), full_gas - estimate_distribute_tips_gas());
        assert_eq!(plan.build_calls(&nodesweep_contracts::deployments::MAINNET).len(), 2);
        // Tips ETH no longer counted.
        assert_eq!(plan.gross_eth_total(), eth(2) + eth(1) / U256::from(2));
    }

    #[test]
    fn claimed_zero_and_unknown_intervals_never_enter_the_claim() {
        let entries = vec![
            finalized_entry(0, eth(1), U256::ZERO, ClaimStatus::Claimed),
            finalized_entry(1, U256::ZERO, U256::ZERO, ClaimStatus::Unclaimed),
            finalized_entry(2, eth(2), eth(1), ClaimStatus::Unclaimed),
            finalized_entry(3, eth(4), eth(2), ClaimStatus::Unknown),
        ];
        let plan = SweepPlan::from_inputs(inputs(entries, vec![], U256::ZERO));
        let calls = plan.build_calls(&nodesweep_contracts::deployments::MAINNET);
        assert_eq!(calls.len(), 1);

        let decoded = IMerkleDistributor::claimAndStakeCall::abi_decode(&calls[0].callData)
            .expect("claim call decodes");
        assert_eq!(decoded.rewardIndex, vec![U256::from(2)]);
        assert_eq!(decoded.amountEth, vec![eth(2)]);
        assert_eq!(decoded.stakeAmount, eth(1));
    }

    #[test]
    fn restake_amount_clamps_and_steps() {
        let entries =
            vec![finalized_entry(0, U256::ZERO, eth(10) + U256::from(123), ClaimStatus::Unclaimed)];
        let mut plan = SweepPlan::from_inputs(inputs(entries, vec![], U256::ZERO));

        // Whole-token rounding below the maximum.
        plan.set_restake_amount(eth(3) + U256::from(999));
        assert_eq!(plan.restake_amount, eth(3));

        // The maximum snaps exactly, dust included.
        plan.set_restake_amount(eth(100));
        assert_eq!(plan.restake_amount, eth(10) + U256::from(123));

        plan.set_restake_amount(U256::ZERO);
        assert_eq!(plan.restake_amount, U256::ZERO);
    }

    #[test]
    fn balances_above_the_ceiling_also_finalize() {
        let pools = vec![minipool(1, eth(9)), minipool(2, eth(1))];
        let plan = SweepPlan::from_inputs(inputs(vec![], pools, U256::ZERO));
        let calls = plan.build_calls(&nodesweep_contracts::deployments::MAINNET);
        assert_eq!(calls.len(), 2);

        // Largest first: 9 ETH exceeds the ceiling, so rewardsOnly must be false.
        let first = IMinipool::distributeBalanceCall::abi_decode(&calls[0].callData).unwrap();
        assert!(!first.rewardsOnly);
        let second = IMinipool::distributeBalanceCall::abi_decode(&calls[1].callData).unwrap();
        assert!(second.rewardsOnly);
    }

    #[test]
    fn empty_plan_reports_no_work() {
        let plan = SweepPlan::from_inputs(inputs(vec![], vec![], U256::ZERO));
        assert_eq!(plan.estimated_gas_units(), 0);
        assert_eq!(plan.gross_eth_total(), U256::ZERO);
        assert!(plan.build_calls(&nodesweep_contracts::deployments::MAINNET).is_empty());
    }
}
