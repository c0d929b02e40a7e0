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

//! Commands for interval reward ledgers.

mod ledger;
mod protocol;

pub use ledger::RewardsLedger;
pub use protocol::RewardsProtocol;

use clap::Subcommand;

use crate::config::GlobalConfig;

/// Commands for interval reward ledgers.
#[derive(Subcommand, Clone, Debug)]
pub enum RewardsCommands {
    /// Show the reward ledger for a node.
    Ledger(RewardsLedger),
    /// Show network-wide reward totals per interval.
    Protocol(RewardsProtocol),
}

impl RewardsCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Ledger(cmd) => cmd.run(global_config).await,
            Self::Protocol(cmd) => cmd.run(global_config).await,
        }
    }
}
