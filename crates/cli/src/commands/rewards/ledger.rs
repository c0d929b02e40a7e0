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

use alloy::{
    primitives::{utils::format_ether, Address, U256},
    providers::{Provider, ProviderBuilder},
};
use anyhow::Context;
use clap::Args;
use nodesweep_rewards::{
    efficiency_percent, estimate_claim_intervals_gas, ClaimStatus, GasSeverity, IntervalRewards,
    LedgerResolver, PPM_SCALE,
};

use crate::{config::GlobalConfig, settings::Settings};

/// Command to show the reward ledger for a node.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct RewardsLedger {
    /// Node address to resolve. Defaults to the saved node or the signer's address.
    pub node: Option<Address>,
}

impl RewardsLedger {
    /// Run the [RewardsLedger] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let settings = Settings::load()?;
        let node = global_config.resolve_node(self.node, &settings)?;
        let rpc_url = global_config.require_rpc_url()?;

        // Connect to the chain.
        let provider = ProviderBuilder::new()
            .connect(rpc_url.as_str())
            .await
            .with_context(|| format!("failed to connect provider to {rpc_url}"))?;
        let chain_id = provider.get_chain_id().await?;
        let deployment = global_config.resolve_deployment(chain_id)?;

        let snapshots = global_config.snapshot_client(&settings)?;
        let resolver = LedgerResolver::new(&provider, &deployment, &snapshots);
        let ledger = resolver.resolve_node(node).await?;

        println!("Reward ledger for {node}");
        for entry in &ledger.entries {
            match &entry.rewards {
                IntervalRewards::Finalized { share, claimed, .. } => {
                    let state = match claimed {
                        ClaimStatus::Claimed => "claimed ",
                        ClaimStatus::Unclaimed => "unclaimed",
                        ClaimStatus::Unknown => "claim status unknown",
                    };
                    println!(
                        "  #{:<4} finalized {state}  {} ETH  {} RPL",
                        entry.reward_index,
                        format_ether(share.smoothing_pool_eth),
                        format_ether(share.claimable_token()),
                    );
                }
                IntervalRewards::Pending { share: Some(share) } => {
                    println!(
                        "  #{:<4} pending consensus   {} ETH  {} RPL",
                        entry.reward_index,
                        format_ether(share.smoothing_pool_eth),
                        format_ether(share.claimable_token()),
                    );
                }
                IntervalRewards::Pending { share: None } => {
                    println!(
                        "  #{:<4} pending consensus   node not in submitted tree",
                        entry.reward_index,
                    );
                }
                IntervalRewards::Estimated { projected_share, ppm_elapsed, .. } => {
                    println!(
                        "  #{:<4} ongoing ({}% elapsed)  ~{} ETH  ~{} RPL projected",
                        entry.reward_index,
                        ppm_elapsed * 100 / PPM_SCALE,
                        format_ether(projected_share.smoothing_pool_eth),
                        format_ether(projected_share.claimable_token()),
                    );
                }
                IntervalRewards::Unavailable => {
                    println!("  #{:<4} document unavailable", entry.reward_index);
                }
            }
        }

        let totals = ledger.claimable_totals();
        println!(
            "Claimable across {} interval(s): {} ETH, {} RPL",
            totals.intervals.len(),
            format_ether(totals.smoothing_pool_eth),
            format_ether(totals.token),
        );

        if !totals.intervals.is_empty() {
            let gas_units = estimate_claim_intervals_gas(totals.intervals.len() as u64, false);
            let gas_price = U256::from(provider.get_gas_price().await?);
            let efficiency =
                efficiency_percent(totals.smoothing_pool_eth, gas_units, gas_price);
            let severity = match GasSeverity::from_efficiency(efficiency) {
                GasSeverity::Good => "good",
                GasSeverity::Caution => "caution",
                GasSeverity::Poor => "poor",
            };
            println!(
                "Claiming now: ~{gas_units} gas, efficiency {efficiency:.2}% ({severity})"
            );
        }

        Ok(())
    }
}
