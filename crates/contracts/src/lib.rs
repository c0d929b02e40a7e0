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

//! Smart contract interfaces for the staking protocol contracts nodesweep reads and writes.

use alloy::{
    rpc::types::{Log, TransactionReceipt},
    sol_types::SolEvent,
};
use anyhow::{bail, ensure, Context, Result};

pub mod deployments;

pub use deployments::Deployment;

alloy::sol! {
    #![sol(rpc, all_derives)]

    /// Interval registry. One reward interval is always accruing; finalized intervals are
    /// announced with a `RewardSnapshot` event carrying the content address of the reward
    /// tree document.
    interface IRewardsPool {
        /// The next reward index to be finalized, i.e. the identity of the ongoing interval.
        function getRewardIndex() external view returns (uint256);
        /// Configured interval length in seconds.
        function getClaimIntervalTime() external view returns (uint256);
        /// Start time of the ongoing interval, unix seconds.
        function getClaimIntervalTimeStart() external view returns (uint256);

        /// Emitted once per oracle submission for a not-yet-finalized interval.
        event RewardSnapshotSubmitted(address indexed from, uint256 indexed rewardIndex, string treeCid);
        /// Emitted when an interval reaches oracle consensus and becomes claimable.
        event RewardSnapshot(uint256 indexed rewardIndex, bytes32 merkleRoot, string treeCid, uint256 intervalStartTime, uint256 intervalEndTime);
    }

    /// Merkle distributor for finalized interval rewards.
    interface IMerkleDistributor {
        /// Whether the node has already claimed the given interval.
        function isClaimed(uint256 rewardIndex, address nodeAddress) external view returns (bool);
        /// Claim one or more finalized intervals, restaking `stakeAmount` of the claimed
        /// protocol token back into the node's staking position.
        function claimAndStake(address nodeAddress, uint256[] calldata rewardIndex, uint256[] calldata amountToken, uint256[] calldata amountEth, bytes32[][] calldata merkleProof, uint256 stakeAmount) external;

        /// Emitted by a successful claim with the total amounts transferred.
        event RewardsClaimed(address indexed nodeAddress, uint256[] rewardIndex, uint256 amountToken, uint256 amountEth);
    }

    /// Node -> minipool enumeration.
    interface IMinipoolManager {
        function getNodeMinipoolCount(address nodeAddress) external view returns (uint256);
        function getNodeMinipoolAt(address nodeAddress, uint256 index) external view returns (address);
    }

    /// A per-validator staking sub-account holding an undistributed balance.
    interface IMinipool {
        /// Status code: 0 initialized, 1 prelaunch, 2 staking, 3 dissolved.
        function getStatus() external view returns (uint8);
        /// Contract version. Versions >= 3 support the node/protocol fee split.
        function version() external view returns (uint8);
        /// Node operator's share of the given balance under the current fee split.
        function calculateNodeShare(uint256 balance) external view returns (uint256);
        /// Distribute the minipool balance. `rewardsOnly = false` also finalizes the
        /// minipool and is required above the protocol's per-call balance ceiling.
        function distributeBalance(bool rewardsOnly) external;
    }

    /// Deterministic lookup of a node's fee distributor contract.
    interface INodeDistributorFactory {
        function getProxyAddress(address nodeAddress) external view returns (address);
    }

    /// Per-node fee distributor holding execution-layer tips/MEV.
    interface INodeDistributor {
        /// The node operator's share of the distributor balance.
        function getNodeShare() external view returns (uint256);
        /// Distribute the balance between the node and the protocol.
        function distribute() external;
    }

    /// Canonical Multicall3. Planned sub-operations are submitted through `aggregate3`
    /// with `allowFailure = false` on every call, so the batch is atomic.
    interface IMulticall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external payable returns (Result[] memory returnData);
    }
}

/// Find the single `E` event among receipt logs.
///
/// Exactly one match is required: zero means the transaction did not do what the
/// caller believes it did, more than one means the caller needs a narrower query.
pub fn find_tx_log<E: SolEvent>(logs: &[Log]) -> Result<Log<E>> {
    let mut matching = logs.iter().filter(|log| log.topic0() == Some(&E::SIGNATURE_HASH));
    let Some(log) = matching.next() else {
        bail!("no {} event found in receipt logs", E::SIGNATURE);
    };
    ensure!(
        matching.next().is_none(),
        "more than one {} event found in receipt logs",
        E::SIGNATURE
    );
    log.log_decode::<E>().with_context(|| format!("failed to decode event {}", E::SIGNATURE))
}

/// Extract a single typed event log from a transaction receipt.
pub fn extract_tx_log<E: SolEvent>(receipt: &TransactionReceipt) -> Result<Log<E>> {
    find_tx_log(receipt.inner.logs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Address, LogData, U256};

    fn rpc_log(address: Address, data: LogData) -> Log {
        Log { inner: alloy::primitives::Log { address, data }, ..Default::default() }
    }

    fn claim_event(index: u64) -> IMerkleDistributor::RewardsClaimed {
        IMerkleDistributor::RewardsClaimed {
            nodeAddress: address!("0x1111111111111111111111111111111111111111"),
            rewardIndex: vec![U256::from(index)],
            amountToken: U256::from(5),
            amountEth: U256::from(7),
        }
    }

    #[test]
    fn finds_the_single_matching_event() {
        let distributor = address!("0x2222222222222222222222222222222222222222");
        let logs = vec![rpc_log(distributor, claim_event(3).encode_log_data())];

        let log = find_tx_log::<IMerkleDistributor::RewardsClaimed>(&logs).unwrap();
        assert_eq!(log.data().rewardIndex, vec![U256::from(3)]);
        assert_eq!(log.data().amountEth, U256::from(7));
    }

    #[test]
    fn missing_event_is_an_error() {
        let logs: Vec<Log> = vec![];
        assert!(find_tx_log::<IMerkleDistributor::RewardsClaimed>(&logs).is_err());
    }

    #[test]
    fn duplicate_events_are_rejected() {
        let distributor = address!("0x2222222222222222222222222222222222222222");
        let logs = vec![
            rpc_log(distributor, claim_event(1).encode_log_data()),
            rpc_log(distributor, claim_event(2).encode_log_data()),
        ];
        assert!(find_tx_log::<IMerkleDistributor::RewardsClaimed>(&logs).is_err());
    }
}
