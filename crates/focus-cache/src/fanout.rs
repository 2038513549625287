//! Bounded parallel hash reads.

use std::sync::Arc;

use focus_store::{HashFields, KvStore, StoreResult};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::error::{CacheError, CacheResult};

type Read = (String, HashFields);

/// Read every hash in `keys`, at most `limit` at a time.
///
/// Results come back in completion order, paired with their key. The first
/// failing read fails the whole call: no further reads are started and
/// reads still in flight are aborted.
pub async fn read_hashes(
    store: Arc<dyn KvStore>,
    keys: Vec<String>,
    limit: usize,
) -> CacheResult<Vec<Read>> {
    let sem = Arc::new(Semaphore::new(limit.max(1)));
    let mut join_set = JoinSet::new();
    let mut results = Vec::with_capacity(keys.len());

    for key in keys {
        // Collect finished reads while waiting for a permit.
        let permit = loop {
            tokio::select! {
                biased;
                Some(joined) = join_set.join_next() => results.push(finished(joined)?),
                permit = sem.clone().acquire_owned() => {
                    break permit.map_err(|e| CacheError::Task(e.to_string()))?;
                }
            }
        };
        let store = Arc::clone(&store);
        join_set.spawn(async move {
            let _permit = permit;
            let hash = store.hgetall(&key).await;
            hash.map(|h| (key, h))
        });
    }

    while let Some(joined) = join_set.join_next().await {
        results.push(finished(joined)?);
    }
    Ok(results)
}

fn finished(joined: Result<StoreResult<Read>, JoinError>) -> CacheResult<Read> {
    let read = joined.map_err(|e| CacheError::Task(e.to_string()))?;
    Ok(read?)
}
