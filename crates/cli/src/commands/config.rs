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

//! Commands for the saved settings file.

use alloy::primitives::Address;
use anyhow::ensure;
use clap::{Args, Subcommand};
use url::Url;

use crate::{config::GlobalConfig, settings::Settings};

/// Commands for saved settings.
#[derive(Subcommand, Clone, Debug)]
pub enum ConfigCommands {
    /// Print the saved settings.
    Get(ConfigGet),
    /// Save default values for common options.
    Set(ConfigSet),
    /// Delete the saved settings.
    Clear(ConfigClear),
}

impl ConfigCommands {
    /// Run the command.
    pub async fn run(&self, global_config: &GlobalConfig) -> anyhow::Result<()> {
        match self {
            Self::Get(cmd) => cmd.run(global_config).await,
            Self::Set(cmd) => cmd.run(global_config).await,
            Self::Clear(cmd) => cmd.run(global_config).await,
        }
    }
}

/// Command to print the saved settings.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct ConfigGet {}

impl ConfigGet {
    /// Run the [ConfigGet] command.
    pub async fn run(&self, _global_config: &GlobalConfig) -> anyhow::Result<()> {
        let path = Settings::default_path()?;
        let settings = Settings::load()?;
        println!("{}", serde_json::to_string_pretty(&settings)?);
        println!("({})", path.display());
        Ok(())
    }
}

/// Command to save default values for common options.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct ConfigSet {
    /// Default node address.
    #[clap(long)]
    pub node: Option<Address>,
    /// Default content gateway for reward tree documents.
    #[clap(long)]
    pub gateway_url: Option<Url>,
    /// Default rolling estimate document URL.
    #[clap(long)]
    pub estimate_url: Option<Url>,
}

impl ConfigSet {
    /// Run the [ConfigSet] command.
    pub async fn run(&self, _global_config: &GlobalConfig) -> anyhow::Result<()> {
        ensure!(
            self.node.is_some() || self.gateway_url.is_some() || self.estimate_url.is_some(),
            "nothing to set; pass at least one of --node, --gateway-url, --estimate-url"
        );

        let mut settings = Settings::load()?;
        if let Some(node) = self.node {
            settings.node_address = Some(node);
        }
        if let Some(url) = &self.gateway_url {
            settings.gateway_url = Some(url.clone());
        }
        if let Some(url) = &self.estimate_url {
            settings.estimate_url = Some(url.clone());
        }
        settings.store()?;

        println!("Settings saved to {}", Settings::default_path()?.display());
        Ok(())
    }
}

/// Command to delete the saved settings.
#[non_exhaustive]
#[derive(Args, Clone, Debug)]
pub struct ConfigClear {}

impl ConfigClear {
    /// Run the [ConfigClear] command.
    pub async fn run(&self, _global_config: &GlobalConfig) -> anyhow::Result<()> {
        Settings::clear()?;
        println!("Settings cleared");
        Ok(())
    }
}
