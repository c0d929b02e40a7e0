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
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder},
};
use anyhow::Context;
use clap::Args;

use super::{print_plan, resolve_plan, SweepOptions};
use crate::{config::GlobalConfig, settings::Settings};

/// Command to show what a sweep would do without sending anything.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct SweepPlanCmd {
    /// Node address to plan for. Defaults to the saved node or the signer's address.
    pub node: Option<Address>,

    #[clap(flatten)]
    pub options: SweepOptions,
}

impl SweepPlanCmd {
    /// Run the [SweepPlanCmd] command.
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

        let mut plan = resolve_plan(&provider, &deployment, &snapshots, node).await?;
        self.options.apply(&mut plan)?;

        let gas_price = U256::from(provider.get_gas_price().await?);
        print_plan(&plan, gas_price);

        let calls = plan.build_calls(&deployment);
        println!("Would submit {} call(s) through Multicall3 at {}", calls.len(), deployment.multicall3_address);

        Ok(())
    }
}
