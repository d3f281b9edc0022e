use std::{collections::HashMap, future::Future};

use parking_lot::Mutex;
use tracing::trace;

/// Memoizes `block_number -> block_timestamp` lookups against the node.
///
/// Single-writer (shared only with the ingestion pipeline), and never
/// invalidated: a reorg may leave a stale timestamp cached for a block
/// number that now refers to a different block, but timestamps here are
/// metadata only and never drive fold logic, so this is an accepted
/// simplification rather than a bug.
#[derive(Debug, Default)]
pub struct BlockTimeCache {
    entries: Mutex<HashMap<u64, u64>>,
}

impl BlockTimeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached timestamp for `block_number`, fetching and
    /// memoizing it via `fetch` on a miss.
    pub async fn get_or_fetch<F, Fut, E>(&self, block_number: u64, fetch: F) -> Result<u64, E>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<u64, E>>,
    {
        if let Some(ts) = self.entries.lock().get(&block_number).copied() {
            return Ok(ts);
        }

        trace!(block_number, "block timestamp cache miss");
        let ts = fetch(block_number).await?;
        self.entries.lock().insert(block_number, ts);
        Ok(ts)
    }

    /// Number of memoized block numbers. Exposed for tests only; the cache
    /// is intentionally unbounded (see design notes) within one process
    /// lifetime.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memoizes_after_first_fetch() {
        let cache = BlockTimeCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            let ts = cache
                .get_or_fetch(100, |_| async {
                    calls += 1;
                    Ok::<_, std::convert::Infallible>(1_700_000_000)
                })
                .await
                .unwrap();
            assert_eq!(ts, 1_700_000_000);
        }

        assert_eq!(calls, 1, "fetch should only run once per block number");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn distinct_blocks_fetch_independently() {
        let cache = BlockTimeCache::new();
        cache.get_or_fetch(1u64, |b| async move { Ok::<_, std::convert::Infallible>(b * 10) }).await.unwrap();
        cache.get_or_fetch(2u64, |b| async move { Ok::<_, std::convert::Infallible>(b * 10) }).await.unwrap();
        assert_eq!(cache.len(), 2);
    }
}
