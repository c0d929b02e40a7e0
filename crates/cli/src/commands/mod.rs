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

//! Commands of the nodesweep CLI.

mod config;
mod continuous;
mod rewards;
mod sweep;

pub use config::ConfigCommands;
pub use continuous::Continuous;
pub use rewards::RewardsCommands;
pub use sweep::SweepCommands;

use clap::Subcommand;

use crate::config::GlobalConfig;

/// Top-level commands.
#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Interval reward ledgers.
    #[clap(subcommand)]
    Rewards(RewardsCommands),
    /// Continuous rewards: minipool balances and the fee distributor share.
    Continuous(Continuous),
    /// Plan and submit batched sweep transactions.
    #[clap(subcommand)]
    Sweep(SweepCommands),
    /// Manage saved settings.
    #[clap(subcommand)]
    Config(ConfigCommands),
}

impl Command {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Rewards(cmd) => cmd.run(global_config).await,
            Self::Continuous(cmd) => cmd.run(global_config).await,
            Self::Sweep(cmd) => cmd.run(global_config).await,
            Self::Config(cmd) => cmd.run(global_config).await,
        }
    }
}
