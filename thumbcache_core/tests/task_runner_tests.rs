//! Property tests for the bounded-concurrency runner

use proptest::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thumbcache_core::runner::{run_with_concurrency, run_with_concurrency_and_progress};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Yield a data-dependent number of times so completion order differs from
/// input order
async fn jitter(item: u32) {
    for _ in 0..(item % 7) {
        tokio::task::yield_now().await;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_results_are_index_addressed(
        items in prop::collection::vec(0u32..1000, 1..40),
        concurrency in 1usize..10,
    ) {
        let expected: Vec<(usize, u64)> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (i, u64::from(*item) * 3))
            .collect();

        let results = runtime().block_on(run_with_concurrency(
            items,
            concurrency,
            |item, index| async move {
                jitter(item).await;
                Ok::<_, ()>((index, u64::from(item) * 3))
            },
        ));

        prop_assert_eq!(results, Ok(expected));
    }

    #[test]
    fn test_never_exceeds_concurrency(
        items in prop::collection::vec(0u32..100, 1..40),
        concurrency in 1usize..8,
    ) {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let total = items.len();

        let mut reported = 0usize;
        let results = runtime().block_on(run_with_concurrency_and_progress(
            items,
            concurrency,
            |item, _| {
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    jitter(item).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ()>(item)
                }
            },
            |progress| {
                reported += 1;
                assert_eq!(progress.total, total);
                assert_eq!(progress.current, reported);
            },
        ));

        prop_assert!(results.is_ok());
        prop_assert!(peak.load(Ordering::SeqCst) <= concurrency);
        prop_assert_eq!(reported, total);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bound_holds_on_multi_thread_runtime() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let results = run_with_concurrency((0..50).collect::<Vec<u32>>(), 3, |item, _| {
        let active = active.clone();
        let peak = peak.clone();
        async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            // Real blocking-pool work so completions interleave across threads
            tokio::task::spawn_blocking(move || std::thread::sleep(std::time::Duration::from_millis(1)))
                .await
                .unwrap();
            active.fetch_sub(1, Ordering::SeqCst);
            Ok::<_, ()>(item)
        }
    })
    .await
    .unwrap();

    assert_eq!(results, (0..50).collect::<Vec<u32>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}
