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

use alloy::primitives::{address, Address};
use clap::Args;
use derive_builder::Builder;

pub use alloy_chains::NamedChain;

/// Canonical Multicall3 address, identical on every supported chain.
pub const MULTICALL3_ADDRESS: Address = address!("0xcA11bde05977b3631167028862bE2a173976CA11");

/// Configuration for a deployment of the staking protocol contracts.
// NOTE: See https://github.com/clap-rs/clap/issues/5092#issuecomment-1703980717 about clap usage.
#[non_exhaustive]
#[derive(Clone, Debug, Builder, Args)]
#[group(
    requires = "rewards_pool_address",
    requires = "merkle_distributor_address",
    requires = "minipool_manager_address",
    requires = "distributor_factory_address"
)]
pub struct Deployment {
    /// EIP-155 chain ID of the network.
    #[clap(long, env)]
    #[builder(setter(into, strip_option), default)]
    pub chain_id: Option<u64>,

    /// Address of the [IRewardsPool] contract.
    ///
    /// [IRewardsPool]: crate::IRewardsPool
    #[clap(long, env, required = false, long_help = "Address of the rewards pool contract")]
    #[builder(setter(into))]
    pub rewards_pool_address: Address,

    /// Address of the [IMerkleDistributor] contract.
    ///
    /// [IMerkleDistributor]: crate::IMerkleDistributor
    #[clap(long, env, required = false, long_help = "Address of the merkle distributor contract")]
    #[builder(setter(into))]
    pub merkle_distributor_address: Address,

    /// Address of the [IMinipoolManager] contract.
    ///
    /// [IMinipoolManager]: crate::IMinipoolManager
    #[clap(long, env, required = false, long_help = "Address of the minipool manager contract")]
    #[builder(setter(into))]
    pub minipool_manager_address: Address,

    /// Address of the [INodeDistributorFactory] contract.
    ///
    /// [INodeDistributorFactory]: crate::INodeDistributorFactory
    #[clap(long, env, required = false, long_help = "Address of the node distributor factory")]
    #[builder(setter(into))]
    pub distributor_factory_address: Address,

    /// Address of the Multicall3 contract used to submit batch plans.
    #[clap(long, env, default_value_t = MULTICALL3_ADDRESS)]
    #[builder(default = "MULTICALL3_ADDRESS")]
    pub multicall3_address: Address,

    /// First block to scan for reward snapshot events.
    ///
    /// Blocks before contract creation hold no events; starting there only slows scans down.
    #[clap(long, env, default_value_t = 0)]
    #[builder(default)]
    pub from_block: u64,
}

impl Deployment {
    /// Create a new [DeploymentBuilder].
    pub fn builder() -> DeploymentBuilder {
        Default::default()
    }

    /// Lookup the [Deployment] for a named chain.
    pub const fn from_chain(chain: NamedChain) -> Option<Deployment> {
        match chain {
            NamedChain::Mainnet => Some(MAINNET),
            NamedChain::Holesky => Some(HOLESKY),
            _ => None,
        }
    }

    /// Lookup the [Deployment] by chain ID.
    pub fn from_chain_id(chain_id: impl Into<u64>) -> Option<Deployment> {
        let chain = NamedChain::try_from(chain_id.into()).ok()?;
        Self::from_chain(chain)
    }
}

/// [Deployment] for Ethereum mainnet.
pub const MAINNET: Deployment = Deployment {
    chain_id: Some(NamedChain::Mainnet as u64),
    rewards_pool_address: address!("0xee4d2a71cf479e0d3d0c3c2c923dbfeb57e73111"),
    merkle_distributor_address: address!("0x5ce71e603b138f7e65029cc1918c0566ed0dbd4b"),
    minipool_manager_address: address!("0x6d010c43d4e96d74c422f2e27370af48711b49bf"),
    distributor_factory_address: address!("0xe228017f77b3e0785e794e4c0a8a6b935f85cbd3"),
    multicall3_address: MULTICALL3_ADDRESS,
    from_block: 15_450_000,
};

/// [Deployment] for the Holesky testnet.
pub const HOLESKY: Deployment = Deployment {
    chain_id: Some(NamedChain::Holesky as u64),
    rewards_pool_address: address!("0xa805d68b61956bc92d556f2be6d18747adaeee82"),
    merkle_distributor_address: address!("0x4fbe5e4b412171f8b2c962ee24b1e10f78a1f52d"),
    minipool_manager_address: address!("0xb815a94fccdbd39eaef4da5b7dc293eb5ad2a8de"),
    distributor_factory_address: address!("0x73090578d18bb51c0ba1a1bbd5f3861c22c08a9a"),
    multicall3_address: MULTICALL3_ADDRESS,
    from_block: 1_200_000,
};
