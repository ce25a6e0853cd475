use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::cache::UtxoCache;
use crate::chain_client::ChainClient;
use crate::errors::FetchError;
use crate::model::{EnrichedUtxo, Network, RawUtxo, UtxoMetadata};

const MAX_FETCH_ATTEMPTS: u32 = 3;

type FetchFuture = Shared<BoxFuture<'static, Result<Vec<EnrichedUtxo>, FetchError>>>;

fn in_flight_key(address: &str, network: Network) -> String {
    format!("{network}:{address}")
}

/// Retrieves raw UTXOs plus the current virtual DAA score, enriches them,
/// retries transient failures, and deduplicates concurrent fetches for the
/// same `(address, network)`.
pub struct UtxoFetcher {
    chain: Arc<dyn ChainClient>,
    cache: Arc<UtxoCache>,
    min_utxo_age_blocks: u64,
    in_flight: Mutex<HashMap<String, FetchFuture>>,
}

impl UtxoFetcher {
    pub fn new(chain: Arc<dyn ChainClient>, cache: Arc<UtxoCache>, min_utxo_age_blocks: u64) -> Self {
        Self {
            chain,
            cache,
            min_utxo_age_blocks,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn enrich(&self, raw: RawUtxo, virtual_score: u64, now_ms: i64) -> EnrichedUtxo {
        let metadata = UtxoMetadata::derive(
            virtual_score,
            raw.utxo_entry.block_daa_score,
            self.min_utxo_age_blocks,
            now_ms,
        );
        EnrichedUtxo {
            outpoint: raw.outpoint,
            utxo_entry: raw.utxo_entry,
            metadata,
        }
    }

    pub async fn current_virtual_score(&self, address: &str, network: Network) -> u64 {
        self.chain.get_virtual_daa_score(address, network).await
    }

    pub async fn invalidate(&self, address: &str, network: Network) {
        self.cache.invalidate(address, network).await;
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }

    /// Step 1 (cache) / step 2 (single-flight) / step 3-5 (fetch, filter,
    /// enrich, store).
    pub async fn fetch(
        &self,
        address: &str,
        network: Network,
        force_refresh: bool,
        now_ms: i64,
    ) -> Result<Vec<EnrichedUtxo>, FetchError> {
        if !force_refresh {
            if let Some(cached) = self.cache.get(address, network, now_ms).await {
                return Ok(cached);
            }
        }

        let key = in_flight_key(address, network);

        let future = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(&key) {
                existing.clone()
            } else {
                let fetch_future = self.fetch_upstream(address.to_string(), network, now_ms).boxed().shared();
                in_flight.insert(key.clone(), fetch_future.clone());
                fetch_future
            }
        };

        let result = future.await;

        // Remove the entry once the future has settled, success or failure,
        // regardless of which caller happens to observe completion first.
        let mut in_flight = self.in_flight.lock().await;
        if let Some(entry) = in_flight.get(&key) {
            if entry.peek().is_some() {
                in_flight.remove(&key);
            }
        }
        drop(in_flight);

        result
    }

    async fn fetch_upstream(
        &self,
        address: String,
        network: Network,
        now_ms: i64,
    ) -> Result<Vec<EnrichedUtxo>, FetchError> {
        let virtual_score = self.current_virtual_score(&address, network).await;

        let mut last_error = None;
        let mut raw_utxos = None;
        for attempt in 1..=MAX_FETCH_ATTEMPTS {
            match self.chain.get_utxos(&address, network).await {
                Ok(utxos) => {
                    raw_utxos = Some(utxos);
                    break;
                }
                Err(err) => {
                    warn!("utxo fetch attempt {attempt} for {address} failed: {err}");
                    last_error = Some(err);
                    if attempt < MAX_FETCH_ATTEMPTS {
                        let backoff_ms = 1000u64 * (1u64 << (attempt - 1));
                        sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        let raw_utxos = match raw_utxos {
            Some(utxos) => utxos,
            None => {
                return Err(last_error.unwrap_or(FetchError::Exhausted {
                    address,
                    attempts: MAX_FETCH_ATTEMPTS,
                    cause: "unknown".to_string(),
                }))
            }
        };

        let enriched: Vec<EnrichedUtxo> = raw_utxos
            .into_iter()
            .map(|raw| self.enrich(raw, virtual_score, now_ms))
            .collect();

        debug!("fetched {} utxos for {address} on {network}", enriched.len());
        self.cache.set(&address, network, enriched.clone(), now_ms).await;
        Ok(enriched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::model::{Outpoint, ScriptPublicKey, UtxoEntryData};

    struct CountingChainClient {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChainClient for CountingChainClient {
        async fn get_utxos(&self, _address: &str, _network: Network) -> Result<Vec<RawUtxo>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![RawUtxo {
                outpoint: Outpoint::new("a".repeat(64), 0),
                utxo_entry: UtxoEntryData {
                    amount: 100_000_000,
                    script_public_key: ScriptPublicKey { version: 0, script: String::new() },
                    block_daa_score: 5,
                    is_coinbase: false,
                },
            }])
        }

        async fn get_virtual_daa_score(&self, _address_hint: &str, _network: Network) -> u64 {
            15
        }
    }

    #[tokio::test]
    async fn enrich_computes_age_and_freshness() {
        let cache = Arc::new(UtxoCache::new(10_000));
        let chain: Arc<dyn ChainClient> = Arc::new(CountingChainClient { calls: AtomicU32::new(0) });
        let fetcher = UtxoFetcher::new(chain, cache, 10);

        let raw = RawUtxo {
            outpoint: Outpoint::new("a".repeat(64), 0),
            utxo_entry: UtxoEntryData {
                amount: 100,
                script_public_key: ScriptPublicKey { version: 0, script: String::new() },
                block_daa_score: 5,
                is_coinbase: false,
            },
        };
        let enriched = fetcher.enrich(raw, 20, 0);
        assert_eq!(enriched.age_in_blocks(), 15);
        assert!(!enriched.is_fresh());
    }

    #[tokio::test]
    async fn concurrent_fetches_coalesce_into_one_upstream_call() {
        let cache = Arc::new(UtxoCache::new(10_000));
        let chain = Arc::new(CountingChainClient { calls: AtomicU32::new(0) });
        let fetcher = Arc::new(UtxoFetcher::new(chain.clone(), cache, 10));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let fetcher = fetcher.clone();
            handles.push(tokio::spawn(async move {
                fetcher.fetch("addr1", Network::Mainnet, false, 0).await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_fetch_after_settlement_hits_cache_not_upstream_again() {
        let cache = Arc::new(UtxoCache::new(10_000));
        let chain = Arc::new(CountingChainClient { calls: AtomicU32::new(0) });
        let fetcher = UtxoFetcher::new(chain.clone(), cache, 10);

        fetcher.fetch("addr1", Network::Mainnet, false, 0).await.unwrap();
        fetcher.fetch("addr1", Network::Mainnet, false, 100).await.unwrap();

        assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
    }
}
