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

//! Caching and prefetching utilities for on-chain reward state.

use std::{collections::HashMap, future::IntoFuture, sync::Arc, time::Duration};

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
};
use anyhow::{Context, Result};
use futures_util::future::try_join_all;
use nodesweep_contracts::{
    Deployment, IMinipool, IMinipoolManager, INodeDistributor, INodeDistributorFactory,
};
use rand::Rng;
use tokio::{
    sync::{Mutex, OnceCell},
    time::Instant,
};

use crate::{
    continuous::{MinipoolBalance, MinipoolStatus},
    MULTICALL_CHUNK_SIZE, STAGGER_MAX_JITTER_MS, STAGGER_THRESHOLD,
};

/// Identity of a cached contract read. Two reads are the same entry only when the
/// contract, function, encoded arguments, and pinned block all match; a read at
/// "latest" (`block: None`) never aliases a read pinned to a height.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub contract: Address,
    pub function: &'static str,
    pub args: Vec<u8>,
    pub block: Option<u64>,
}

struct CacheSlot<V> {
    inserted_at: Instant,
    ttl: Duration,
    cell: Arc<OnceCell<V>>,
}

/// TTL cache over contract reads, deduplicating concurrent fetches per key.
///
/// Each key holds a [OnceCell]: the first caller runs the fetch, concurrent callers
/// for the same key await the same in-flight future, and a failed fetch leaves the
/// slot empty for the next caller to retry. Expiry is handled at lookup time by
/// replacing the slot.
pub struct CallCache<V> {
    slots: Mutex<HashMap<CallKey, CacheSlot<V>>>,
    default_ttl: Duration,
}

impl<V: Clone> CallCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self { slots: Mutex::new(HashMap::new()), default_ttl }
    }

    /// Get the cached value for `key`, or run `fetch` to populate it.
    pub async fn get_or_fetch<F, Fut>(&self, key: CallKey, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V>>,
    {
        let cell = {
            let mut slots = self.slots.lock().await;
            let expired = slots
                .get(&key)
                .map(|slot| slot.inserted_at.elapsed() >= slot.ttl)
                .unwrap_or(true);
            if expired {
                slots.insert(
                    key.clone(),
                    CacheSlot {
                        inserted_at: Instant::now(),
                        ttl: self.default_ttl,
                        cell: Arc::new(OnceCell::new()),
                    },
                );
            }
            // Slot exists after the insert above.
            slots[&key].cell.clone()
        };

        cell.get_or_try_init(fetch).await.cloned()
    }

    /// Value for `key`, if present and unexpired.
    pub async fn get(&self, key: &CallKey) -> Option<V> {
        let slots = self.slots.lock().await;
        let slot = slots.get(key)?;
        if slot.inserted_at.elapsed() >= slot.ttl {
            return None;
        }
        slot.cell.get().cloned()
    }

    /// Insert an already-resolved value, replacing any existing entry for `key`.
    /// Lets batched fetches (multicalls) feed the cache without going through
    /// per-key fetch closures.
    pub async fn insert(&self, key: CallKey, value: V) {
        let slot = CacheSlot {
            inserted_at: Instant::now(),
            ttl: self.default_ttl,
            cell: Arc::new(OnceCell::from(value)),
        };
        self.slots.lock().await.insert(key, slot);
    }

    /// Drop the entry for `key`, forcing the next read to refetch.
    pub async fn invalidate(&self, key: &CallKey) {
        self.slots.lock().await.remove(key);
    }

    /// Drop all entries.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }
}

/// Enumerate the node's minipool addresses through the minipool manager.
pub async fn enumerate_node_minipools<P: Provider>(
    provider: &P,
    deployment: &Deployment,
    node: Address,
) -> Result<Vec<Address>> {
    let manager = IMinipoolManager::new(deployment.minipool_manager_address, provider);
    let count =
        manager.getNodeMinipoolCount(node).call().await.context("getNodeMinipoolCount failed")?;
    let count = count.to::<u64>();
    if count == 0 {
        return Ok(vec![]);
    }

    let mut addresses = Vec::with_capacity(count as usize);
    for chunk_start in (0..count).step_by(MULTICALL_CHUNK_SIZE) {
        let chunk_end = (chunk_start + MULTICALL_CHUNK_SIZE as u64).min(count);
        let mut multicall =
            provider.multicall().dynamic::<IMinipoolManager::getNodeMinipoolAtCall>();
        for index in chunk_start..chunk_end {
            multicall = multicall.add_dynamic(manager.getNodeMinipoolAt(node, U256::from(index)));
        }
        let results: Vec<Address> = multicall.aggregate().await?;
        addresses.extend(results);
    }
    Ok(addresses)
}

/// Prefetch status, version, balance, and node share for the given minipools.
///
/// Balances come from `eth_getBalance`; status, version, and node share are batched
/// through dynamic multicalls in [MULTICALL_CHUNK_SIZE] chunks. Above
/// [STAGGER_THRESHOLD] minipools, a bounded random delay is inserted between chunks
/// so rate-limited providers see a spread of requests rather than a burst.
pub async fn prefetch_minipool_balances<P: Provider>(
    provider: &P,
    node: Address,
    minipools: &[Address],
) -> Result<Vec<MinipoolBalance>> {
    if minipools.is_empty() {
        return Ok(vec![]);
    }

    let stagger = minipools.len() > STAGGER_THRESHOLD;
    let mut balances = Vec::with_capacity(minipools.len());

    for (i, chunk) in minipools.chunks(MULTICALL_CHUNK_SIZE).enumerate() {
        if stagger && i > 0 {
            let jitter = rand::rng().random_range(0..=STAGGER_MAX_JITTER_MS);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
        }

        let totals: Vec<U256> = try_join_all(
            chunk.iter().map(|&address| provider.get_balance(address).into_future()),
        )
        .await
        .context("failed to fetch minipool balances")?;

        let mut status_multicall = provider.multicall().dynamic::<IMinipool::getStatusCall>();
        let mut version_multicall = provider.multicall().dynamic::<IMinipool::versionCall>();
        for &address in chunk {
            let minipool = IMinipool::new(address, provider);
            status_multicall = status_multicall.add_dynamic(minipool.getStatus());
            version_multicall = version_multicall.add_dynamic(minipool.version());
        }
        let statuses: Vec<u8> = status_multicall.aggregate().await?;
        let versions: Vec<u8> = version_multicall.aggregate().await?;

        // calculateNodeShare reverts on pre-fee-split contracts, so only upgraded
        // minipools go into the share multicall.
        let upgraded: Vec<usize> =
            (0..chunk.len()).filter(|&j| versions[j] >= 3 && !totals[j].is_zero()).collect();
        let mut node_shares: HashMap<usize, U256> = HashMap::new();
        if !upgraded.is_empty() {
            let mut share_multicall =
                provider.multicall().dynamic::<IMinipool::calculateNodeShareCall>();
            for &j in &upgraded {
                let minipool = IMinipool::new(chunk[j], provider);
                share_multicall = share_multicall.add_dynamic(minipool.calculateNodeShare(totals[j]));
            }
            let shares: Vec<U256> = share_multicall.aggregate().await?;
            for (&j, share) in upgraded.iter().zip(shares) {
                node_shares.insert(j, share);
            }
        }

        for (j, &address) in chunk.iter().enumerate() {
            let fee_split_upgraded = versions[j] >= 3;
            let node_share = node_shares.get(&j).copied().unwrap_or(U256::ZERO);
            let protocol_share = if fee_split_upgraded {
                totals[j].saturating_sub(node_share)
            } else {
                U256::ZERO
            };
            balances.push(MinipoolBalance {
                minipool: address,
                node,
                status: MinipoolStatus::from_code(statuses[j]),
                total_balance: totals[j],
                node_share,
                protocol_share,
                fee_split_upgraded,
            });
        }
    }

    tracing::debug!("prefetched balances for {} minipools", balances.len());
    Ok(balances)
}

/// Resolve the node's fee distributor and read its node share.
pub async fn fetch_distributor_node_share<P: Provider>(
    provider: &P,
    deployment: &Deployment,
    node: Address,
) -> Result<(Address, U256)> {
    let factory = INodeDistributorFactory::new(deployment.distributor_factory_address, provider);
    let distributor_address =
        factory.getProxyAddress(node).call().await.context("getProxyAddress failed")?;
    let distributor = INodeDistributor::new(distributor_address, provider);
    let node_share = distributor.getNodeShare().call().await.context("getNodeShare failed")?;
    Ok((distributor_address, node_share))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(tag: u8) -> CallKey {
        CallKey {
            contract: Address::from([tag; 20]),
            function: "getNodeShare",
            args: vec![],
            block: None,
        }
    }

    #[tokio::test]
    async fn caches_within_ttl() {
        let cache: CallCache<u64> = CallCache::new(Duration::from_secs(60));
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(key(1), || async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_alias() {
        let cache: CallCache<u64> = CallCache::new(Duration::from_secs(60));
        let a = cache.get_or_fetch(key(1), || async { Ok(1) }).await.unwrap();
        let latest = key(2);
        let pinned = CallKey { block: Some(100), ..latest.clone() };
        let b = cache.get_or_fetch(latest, || async { Ok(2) }).await.unwrap();
        let c = cache.get_or_fetch(pinned, || async { Ok(3) }).await.unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[tokio::test]
    async fn failed_fetch_is_retried() {
        let cache: CallCache<u64> = CallCache::new(Duration::from_secs(60));

        let failed: Result<u64> =
            cache.get_or_fetch(key(1), || async { anyhow::bail!("rpc down") }).await;
        assert!(failed.is_err());

        let value = cache.get_or_fetch(key(1), || async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn expires_after_ttl() {
        let cache: CallCache<u64> = CallCache::new(Duration::from_secs(10));

        let first = cache.get_or_fetch(key(1), || async { Ok(1) }).await.unwrap();
        assert_eq!(first, 1);

        tokio::time::advance(Duration::from_secs(11)).await;

        let second = cache.get_or_fetch(key(1), || async { Ok(2) }).await.unwrap();
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn insert_then_get_round_trips() {
        let cache: CallCache<bool> = CallCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&key(1)).await, None);

        cache.insert(key(1), true).await;
        assert_eq!(cache.get(&key(1)).await, Some(true));
        assert_eq!(cache.get(&key(2)).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn get_ignores_expired_entries() {
        let cache: CallCache<bool> = CallCache::new(Duration::from_secs(10));
        cache.insert(key(1), true).await;

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.get(&key(1)).await, None);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache: CallCache<u64> = CallCache::new(Duration::from_secs(60));
        let k = key(1);
        assert_eq!(cache.get_or_fetch(k.clone(), || async { Ok(1) }).await.unwrap(), 1);
        cache.invalidate(&k).await;
        assert_eq!(cache.get_or_fetch(k, || async { Ok(2) }).await.unwrap(), 2);
    }
}
