//! Bounded-concurrency execution of indexed units of work.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::errors::{BatchError, BatchResult};

/// Run `task(0..count)` on a pool of at most `limit` concurrent workers.
///
/// Workers pull the next unstarted index until none remain. Once any task
/// fails, idle workers stop pulling; tasks already running finish but their
/// results are dropped and the first error is returned. Results come back in
/// index order regardless of completion order.
///
/// `limit` is clamped to `1..=count`.
pub async fn run_with_concurrency<T, F, Fut>(
    count: usize,
    limit: usize,
    task: F,
) -> BatchResult<Vec<T>>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = BatchResult<T>>,
{
    if count == 0 {
        return Ok(Vec::new());
    }

    let workers = limit.clamp(1, count);
    let next = AtomicUsize::new(0);
    let first_error: OnceLock<BatchError> = OnceLock::new();
    let results: Mutex<Vec<Option<T>>> = Mutex::new((0..count).map(|_| None).collect());
    debug!(count, workers, "starting worker pool");

    {
        let (next, first_error, results, task) = (&next, &first_error, &results, &task);
        let pool = (0..workers).map(|worker| async move {
            loop {
                if first_error.get().is_some() {
                    break;
                }
                let index = next.fetch_add(1, Ordering::SeqCst);
                if index >= count {
                    break;
                }
                match task(index).await {
                    Ok(value) => results.lock().await[index] = Some(value),
                    Err(err) => {
                        debug!(worker, index, error = %err, "unit of work failed");
                        // Only the first failure is kept.
                        let _ = first_error.set(err);
                        break;
                    }
                }
            }
        });
        join_all(pool).await;
    }

    if let Some(err) = first_error.into_inner() {
        return Err(err);
    }

    // Every index below `count` was claimed, and a claimed index either
    // filled its slot or set `first_error`, so no slot is empty here.
    collect_results(results.into_inner())
}

fn collect_results<T>(slots: Vec<Option<T>>) -> BatchResult<Vec<T>> {
    let total = slots.len();
    let missing = slots.iter().filter(|slot| slot.is_none()).count();
    if missing > 0 {
        return Err(BatchError::IncompleteResults { missing, total });
    }
    Ok(slots.into_iter().flatten().collect())
}
