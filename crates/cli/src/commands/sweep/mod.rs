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

//! Commands for planning and submitting batched sweep transactions.

mod execute;
mod plan;

pub use execute::SweepExecute;
pub use plan::SweepPlanCmd;

use alloy::{
    primitives::{
        utils::{format_ether, parse_ether},
        Address, U256,
    },
    providers::Provider,
};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use nodesweep_contracts::Deployment;
use nodesweep_rewards::{
    cache::{enumerate_node_minipools, fetch_distributor_node_share, prefetch_minipool_balances},
    GasSeverity, LedgerResolver, OperationKind, SnapshotClient, SweepInputs, SweepPlan,
};

use crate::config::GlobalConfig;

/// Commands for batched sweeps.
#[derive(Subcommand, Clone, Debug)]
pub enum SweepCommands {
    /// Show what a sweep would do without sending anything.
    Plan(SweepPlanCmd),
    /// Submit the planned sweep as one atomic transaction.
    Execute(SweepExecute),
}

impl SweepCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Plan(cmd) => cmd.run(global_config).await,
            Self::Execute(cmd) => cmd.run(global_config).await,
        }
    }
}

/// Plan adjustments shared by the plan and execute commands.
#[derive(Args, Clone, Debug)]
pub struct SweepOptions {
    /// Leave finalized interval rewards unclaimed.
    #[clap(long)]
    pub no_claim: bool,
    /// Protocol token amount to restake when claiming, e.g. `--restake 10`.
    /// Defaults to the full claimable amount.
    #[clap(long)]
    pub restake: Option<String>,
    /// Skip distributing the fee distributor's tips share.
    #[clap(long)]
    pub no_tips: bool,
    /// Skip the consensus-rewards distribute batch.
    #[clap(long)]
    pub no_consensus: bool,
    /// Number of minipools per distribute batch.
    #[clap(long)]
    pub batch_size: Option<usize>,
    /// Leave minipools below this balance out of the batch, e.g. `--eth-threshold 0.5`.
    #[clap(long)]
    pub eth_threshold: Option<String>,
}

impl SweepOptions {
    /// Apply these adjustments to a default plan.
    pub fn apply(&self, plan: &mut SweepPlan) -> Result<()> {
        if self.no_claim {
            plan.claim_enabled = false;
        }
        if let Some(restake) = &self.restake {
            let amount = parse_ether(restake)
                .with_context(|| format!("invalid restake amount {restake}"))?;
            plan.set_restake_amount(amount);
        }
        if self.no_tips {
            plan.tips_enabled = false;
        }
        if self.no_consensus {
            plan.consensus_enabled = false;
        }
        if let Some(size) = self.batch_size {
            plan.set_batch_size(size);
        }
        if let Some(threshold) = &self.eth_threshold {
            plan.eth_threshold = parse_ether(threshold)
                .with_context(|| format!("invalid ETH threshold {threshold}"))?;
        }
        Ok(())
    }
}

/// Resolve everything a sweep plan needs for one node.
pub(crate) async fn resolve_plan<P: Provider>(
    provider: &P,
    deployment: &Deployment,
    snapshots: &SnapshotClient,
    node: Address,
) -> Result<SweepPlan> {
    let resolver = LedgerResolver::new(provider, deployment, snapshots);
    let ledger = resolver.resolve_node(node).await?;

    let addresses = enumerate_node_minipools(provider, deployment, node).await?;
    let minipools = prefetch_minipool_balances(provider, node, &addresses).await?;
    let (distributor_address, distributor_node_share) =
        fetch_distributor_node_share(provider, deployment, node).await?;

    Ok(SweepPlan::from_inputs(SweepInputs {
        node,
        ledger,
        minipools,
        distributor_node_share,
        distributor_address,
    }))
}

fn operation_name(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::ClaimIntervals => "claim intervals",
        OperationKind::DistributeTips => "distribute tips",
        OperationKind::DistributeConsensusBatch => "distribute consensus batch",
    }
}

/// Print a plan's operations and economics at the given gas price.
pub(crate) fn print_plan(plan: &SweepPlan, gas_price_wei: U256) {
    println!("Sweep plan for {}", plan.inputs().node);
    for op in plan.operations() {
        let marker = if op.enabled { "+" } else { "-" };
        println!(
            "  [{marker}] {:<28} {:>9} gas  {} ETH  {} RPL",
            operation_name(op.kind),
            op.estimated_gas_units,
            format_ether(op.estimated_eth_delta),
            format_ether(op.estimated_token_delta),
        );
    }

    let efficiency = plan.efficiency_percent(gas_price_wei);
    let severity = match GasSeverity::from_efficiency(efficiency) {
        GasSeverity::Good => "good",
        GasSeverity::Caution => "caution",
        GasSeverity::Poor => "poor",
    };
    println!(
        "Total: {} gas (~{} ETH at current prices), gross {} ETH, net {} ETH",
        plan.estimated_gas_units(),
        format_ether(plan.gas_cost_wei(gas_price_wei)),
        format_ether(plan.gross_eth_total()),
        format_ether(plan.net_receipt_wei(gas_price_wei)),
    );
    println!("Efficiency: {efficiency:.2}% ({severity})");
}
