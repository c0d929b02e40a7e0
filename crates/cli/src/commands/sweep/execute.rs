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

use std::time::Duration;

use alloy::{
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
};
use anyhow::Context;
use clap::Args;

use super::{print_plan, resolve_plan, SweepOptions};
use crate::{config::GlobalConfig, settings::Settings};

const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(120);

/// Command to submit the planned sweep as one atomic transaction.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct SweepExecute {
    /// Node address to sweep. Defaults to the saved node or the signer's address.
    pub node: Option<Address>,

    #[clap(flatten)]
    pub options: SweepOptions,
}

impl SweepExecute {
    /// Run the [SweepExecute] command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        let settings = Settings::load()?;
        let node = global_config.resolve_node(self.node, &settings)?;
        let tx_signer = global_config.require_private_key()?;
        let rpc_url = global_config.require_rpc_url()?;

        // Connect to the chain.
        let provider = ProviderBuilder::new()
            .wallet(tx_signer)
            .connect(rpc_url.as_str())
            .await
            .with_context(|| format!("failed to connect provider to {rpc_url}"))?;
        let chain_id = provider.get_chain_id().await?;
        let deployment = global_config.resolve_deployment(chain_id)?;
        let snapshots = global_config.snapshot_client(&settings)?;

        let mut plan = resolve_plan(&provider, &deployment, &snapshots, node).await?;
        self.options.apply(&mut plan)?;

        let gas_price = U256::from(provider.get_gas_price().await?);
        print_plan(&plan, gas_price);

        let timeout = global_config.tx_timeout.unwrap_or(DEFAULT_TX_TIMEOUT);
        let receipt = plan.execute(&provider, &deployment, timeout).await?;
        println!(
            "Sweep confirmed in block {} ({} gas used): {}",
            receipt.block_number.unwrap_or_default(),
            receipt.gas_used,
            receipt.transaction_hash,
        );

        Ok(())
    }
}
