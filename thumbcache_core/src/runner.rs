//! Bounded-parallelism executor
//!
//! Runs one asynchronous worker per item with at most `concurrency`
//! invocations in flight. Results are addressed by input index, progress
//! is reported in completion order.
//!
//! Workers are futures driven by the caller's task, not spawned tasks.
//! When a worker fails, the runner returns that error immediately and the
//! remaining in-flight futures are dropped along with the runner.

use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;

/// Progress after one item completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskProgress {
    /// Input index of the item that just completed
    pub index: usize,
    /// Number of items in the run
    pub total: usize,
    /// Number of items completed so far, including this one
    pub current: usize,
}

/// Run `worker` over `items` with bounded concurrency
pub async fn run_with_concurrency<T, R, E, F, Fut>(
    items: Vec<T>,
    concurrency: usize,
    worker: F,
) -> Result<Vec<R>, E>
where
    F: FnMut(T, usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    run_with_concurrency_and_progress(items, concurrency, worker, |_| {}).await
}

/// Run `worker` over `items` with bounded concurrency, calling `on_progress`
/// after every completion
///
/// `concurrency` is clamped to at least 1. `results[i]` is always the output
/// of `worker(items[i], i)`. An empty input returns immediately without
/// calling `worker` or `on_progress`.
pub async fn run_with_concurrency_and_progress<T, R, E, F, Fut, P>(
    items: Vec<T>,
    concurrency: usize,
    mut worker: F,
    mut on_progress: P,
) -> Result<Vec<R>, E>
where
    F: FnMut(T, usize) -> Fut,
    Fut: Future<Output = Result<R, E>>,
    P: FnMut(TaskProgress),
{
    let total = items.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    let concurrency = concurrency.max(1);
    let mut results: Vec<Option<R>> = (0..total).map(|_| None).collect();
    let mut pending = items.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();

    for (index, item) in pending.by_ref().take(concurrency) {
        in_flight.push(indexed(index, worker(item, index)));
    }

    let mut completed = 0usize;
    while let Some((index, outcome)) = in_flight.next().await {
        results[index] = Some(outcome?);
        completed += 1;

        on_progress(TaskProgress {
            index,
            total,
            current: completed,
        });

        // A slot just freed up
        if let Some((next_index, item)) = pending.next() {
            in_flight.push(indexed(next_index, worker(item, next_index)));
        }
    }

    Ok(results.into_iter().flatten().collect())
}

fn indexed<Fut: Future>(index: usize, fut: Fut) -> impl Future<Output = (usize, Fut::Output)> {
    async move { (index, fut.await) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_input_never_calls_worker() {
        let calls = AtomicUsize::new(0);
        let mut progress_calls = 0;

        let results: Vec<u32> = run_with_concurrency_and_progress(
            Vec::<u32>::new(),
            4,
            |item, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ()>(item) }
            },
            |_| progress_calls += 1,
        )
        .await
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(progress_calls, 0);
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Later items finish first
        let items: Vec<u64> = (0..6).collect();
        let results = run_with_concurrency(items, 6, |item, index| async move {
            tokio::time::sleep(Duration::from_millis(60 - item * 10)).await;
            Ok::<_, ()>((index, item * 2))
        })
        .await
        .unwrap();

        let expected: Vec<(usize, u64)> = (0..6).map(|i| (i as usize, i * 2)).collect();
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = run_with_concurrency(vec![1, 2, 3], 0, |item, _| {
            let active = active.clone();
            let peak = peak.clone();
            async move {
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, ()>(item)
            }
        })
        .await
        .unwrap();

        assert_eq!(results, vec![1, 2, 3]);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_progress_reports_every_completion() {
        let mut seen = Vec::new();

        run_with_concurrency_and_progress(
            vec!["a", "b", "c", "d"],
            2,
            |item, _| async move { Ok::<_, ()>(item.len()) },
            |progress| seen.push(progress),
        )
        .await
        .unwrap();

        assert_eq!(seen.len(), 4);
        assert!(seen.iter().all(|p| p.total == 4));
        let counts: Vec<usize> = seen.iter().map(|p| p.current).collect();
        assert_eq!(counts, vec![1, 2, 3, 4]);

        let mut indices: Vec<usize> = seen.iter().map(|p| p.index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_first_error_is_returned() {
        let result = run_with_concurrency(vec![1, 2, 3, 4], 2, |item, _| async move {
            if item == 3 {
                Err(format!("item {item} failed"))
            } else {
                Ok(item)
            }
        })
        .await;

        assert_eq!(result, Err("item 3 failed".to_string()));
    }

    #[tokio::test]
    async fn test_items_beyond_window_are_deferred() {
        let started = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());

        let run = {
            let started = started.clone();
            let gate = gate.clone();
            tokio::spawn(async move {
                run_with_concurrency((0..5).collect::<Vec<u32>>(), 2, move |item, _| {
                    let started = started.clone();
                    let gate = gate.clone();
                    async move {
                        started.fetch_add(1, Ordering::SeqCst);
                        gate.notified().await;
                        Ok::<_, ()>(item)
                    }
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(started.load(Ordering::SeqCst), 2);

        // Release workers one at a time until the run drains
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            gate.notify_one();
        }

        let results = run.await.unwrap().unwrap();
        assert_eq!(results, vec![0, 1, 2, 3, 4]);
    }
}
