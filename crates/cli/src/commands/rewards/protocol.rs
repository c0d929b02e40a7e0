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
    primitives::utils::format_ether,
    providers::{Provider, ProviderBuilder},
};
use anyhow::Context;
use clap::Args;
use nodesweep_rewards::LedgerResolver;

use crate::{config::GlobalConfig, settings::Settings};

/// Command to show network-wide reward totals per interval.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct RewardsProtocol {}

impl RewardsProtocol {
    /// Run the [RewardsProtocol] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let settings = Settings::load()?;
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
        let ledger = resolver.resolve_protocol().await?;

        println!("Network reward totals, oldest interval first");
        for entry in &ledger.entries {
            match &entry.totals {
                Some(totals) => println!(
                    "  #{:<4} {} ETH smoothing pool, {} RPL collateral, {} RPL oDAO",
                    entry.reward_index,
                    format_ether(totals.total_smoothing_pool_eth),
                    format_ether(totals.total_collateral_rpl),
                    format_ether(totals.total_oracle_dao_rpl),
                ),
                None => println!("  #{:<4} document unavailable", entry.reward_index),
            }
        }

        Ok(())
    }
}
