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
    primitives::{utils::format_ether, Address},
    providers::{Provider, ProviderBuilder},
};
use anyhow::Context;
use clap::Args;
use nodesweep_rewards::{
    aggregate_continuous,
    cache::{enumerate_node_minipools, fetch_distributor_node_share, prefetch_minipool_balances},
};

use crate::{config::GlobalConfig, settings::Settings};

/// Command to show continuous rewards: undistributed minipool balances and the fee
/// distributor share.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct Continuous {
    /// Node address to inspect. Defaults to the saved node or the signer's address.
    pub node: Option<Address>,
}

impl Continuous {
    /// Run the [Continuous] command.
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

        let addresses = enumerate_node_minipools(&provider, &deployment, node).await?;
        let minipools = prefetch_minipool_balances(&provider, node, &addresses).await?;
        let (distributor, distributor_share) =
            fetch_distributor_node_share(&provider, &deployment, node).await?;

        let totals = aggregate_continuous(&minipools, distributor_share);

        println!("Continuous rewards for {node}");
        for minipool in &minipools {
            let note = if minipool.is_distribution_eligible() {
                ""
            } else if !minipool.fee_split_upgraded {
                " (not fee-split upgraded)"
            } else {
                " (not distributable)"
            };
            println!(
                "  {} {:?}  balance {} ETH, node share {} ETH{note}",
                minipool.minipool,
                minipool.status,
                format_ether(minipool.total_balance),
                format_ether(minipool.node_share),
            );
        }
        println!("Fee distributor {distributor}: node share {} ETH", format_ether(distributor_share));
        println!(
            "Distributable node total: {} ETH across {} minipool(s), plus {} ETH at the distributor",
            format_ether(totals.node_share_total),
            totals.contributing_minipools.len(),
            format_ether(totals.distributor_node_share),
        );

        Ok(())
    }
}
