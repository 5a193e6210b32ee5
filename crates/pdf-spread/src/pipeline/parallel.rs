//! Bounded parallel execution of blocking page work

use crate::types::{Result, SpreadError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run `task` over every input on the blocking pool, at most `parallelism`
/// at a time.
///
/// Results come back in input order regardless of completion order. A task
/// that panics yields an error for its own slot only.
pub(crate) async fn run_blocking<I, T, F>(
    inputs: Vec<I>,
    parallelism: usize,
    task: F,
) -> Vec<Result<T>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(usize, I) -> Result<T> + Send + Sync + 'static,
{
    let total = inputs.len();
    let task = Arc::new(task);
    let permits = Arc::new(Semaphore::new(parallelism.max(1)));
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let task = Arc::clone(&task);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome = tokio::task::spawn_blocking(move || (*task)(index, input)).await;
            (index, outcome)
        });
    }

    let mut results: Vec<Option<Result<T>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => {
                results[index] = Some(outcome.map_err(SpreadError::from).and_then(|r| r));
            }
            Err(e) => log::error!("Page task could not be joined: {}", e),
        }
    }

    results
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| Err(SpreadError::Embed("page task did not complete".to_string())))
        })
        .collect()
}
