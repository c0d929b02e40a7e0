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

//! Common configuration options for nodesweep commands.

use std::{num::ParseIntError, time::Duration};

use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use anyhow::{Context, Result};
use clap::Args;
use nodesweep_contracts::Deployment;
use nodesweep_rewards::SnapshotClient;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::settings::Settings;

/// Gateway used for tree documents when neither flags nor saved settings name one.
const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs/";

/// Common configuration options for all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalConfig {
    /// URL of the Ethereum RPC endpoint
    #[clap(short, long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<Url>,

    /// Private key of the node wallet (without 0x prefix)
    #[clap(long, env = "PRIVATE_KEY", global = true, hide_env_values = true)]
    pub private_key: Option<PrivateKeySigner>,

    /// Ethereum transaction timeout in seconds.
    #[clap(long, env = "TX_TIMEOUT", global = true, value_parser = |arg: &str| -> Result<Duration, ParseIntError> {Ok(Duration::from_secs(arg.parse()?))})]
    pub tx_timeout: Option<Duration>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long, env = "LOG_LEVEL", global = true, default_value = "info")]
    pub log_level: LevelFilter,

    /// Content gateway for fetching reward tree documents.
    #[clap(long, env = "GATEWAY_URL", global = true)]
    pub gateway_url: Option<Url>,

    /// URL of the rolling reward estimate document for the ongoing interval.
    #[clap(long, env = "ESTIMATE_URL", global = true)]
    pub estimate_url: Option<Url>,

    /// Configuration for the protocol deployment to use.
    #[clap(flatten, next_help_heading = "Protocol Deployment")]
    pub deployment: Option<Deployment>,
}

impl GlobalConfig {
    /// Access [Self::rpc_url] or return an error that can be shown to the user.
    pub fn require_rpc_url(&self) -> Result<Url> {
        self.rpc_url
            .clone()
            .context("Blockchain RPC URL not provided; please set --rpc-url or the RPC_URL env var")
    }

    /// Access [Self::private_key] or return an error that can be shown to the user.
    pub fn require_private_key(&self) -> Result<PrivateKeySigner> {
        self.private_key.clone().context(
            "Private key not provided; please set --private-key or the PRIVATE_KEY env var",
        )
    }

    /// The deployment from flags, or the built-in one for the connected chain.
    pub fn resolve_deployment(&self, chain_id: u64) -> Result<Deployment> {
        self.deployment.clone().or_else(|| Deployment::from_chain_id(chain_id)).context(
            "could not determine deployment from chain ID; please specify deployment explicitly",
        )
    }

    /// The node address to operate on: explicit argument, saved settings, or the
    /// signer's own address, in that order.
    pub fn resolve_node(&self, node: Option<Address>, settings: &Settings) -> Result<Address> {
        if let Some(node) = node {
            return Ok(node);
        }
        if let Some(node) = settings.node_address {
            return Ok(node);
        }
        Ok(self
            .require_private_key()
            .context("no node address given and none saved; pass one or run `nodesweep config set`")?
            .address())
    }

    /// Build the tree document client from flags and saved settings.
    pub fn snapshot_client(&self, settings: &Settings) -> Result<SnapshotClient> {
        let gateway = match self.gateway_url.clone().or_else(|| settings.gateway_url.clone()) {
            Some(url) => url,
            None => Url::parse(DEFAULT_GATEWAY_URL).context("invalid default gateway URL")?,
        };
        let estimate = self.estimate_url.clone().or_else(|| settings.estimate_url.clone());
        Ok(SnapshotClient::new(gateway, estimate))
    }
}
