//! Bounded, index-ordered execution of per-item fetches.

use std::future::Future;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::error::{FetchError, FetchResult};

/// Progress bar for a batch of `total` items; hidden unless `verbose`.
pub fn batch_progress(total: usize, verbose: bool) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("##-"));
    }
    bar
}

/// Run `fetch(i)` for every `i` in `0..total` with at most `max_workers`
/// in flight, returning results in index order.
///
/// Batches smaller than `max_workers` run one after another. The first
/// failure aborts the batch; fetches still in flight are dropped.
/// `progress` advances once per completed item.
pub async fn fetch_indexed<T, F, Fut>(
    total: usize,
    max_workers: usize,
    progress: &ProgressBar,
    fetch: F,
) -> FetchResult<Vec<T>>
where
    F: Fn(usize) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    let max_workers = max_workers.max(1);
    let abort = |index: usize, e: FetchError| {
        progress.abandon_with_message(format!("failed at item {}", index));
        FetchError::batch_aborted(index, total, e)
    };

    if total < max_workers {
        for index in 0..total {
            let item = fetch(index).await.map_err(|e| abort(index, e))?;
            slots[index] = Some(item);
            progress.inc(1);
            debug!(index, total, "Fetched item");
        }
    } else {
        let mut results = stream::iter(0..total)
            .map(|index| {
                let fut = fetch(index);
                async move { (index, fut.await) }
            })
            .buffer_unordered(max_workers);

        while let Some((index, result)) = results.next().await {
            let item = result.map_err(|e| abort(index, e))?;
            slots[index] = Some(item);
            progress.inc(1);
            debug!(index, total, "Fetched item");
        }
    }
    progress.finish();

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| FetchError::unexpected(format!("no result for item {}", index)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pooled_results_are_index_ordered() {
        // later indices finish first
        let out = fetch_indexed(8, 3, &ProgressBar::hidden(), |i| async move {
            tokio::time::sleep(Duration::from_millis((8 - i as u64) * 5)).await;
            Ok(i * 10)
        })
        .await
        .unwrap();
        assert_eq!(out, vec![0, 10, 20, 30, 40, 50, 60, 70]);
    }

    #[tokio::test]
    async fn test_small_batch_runs_sequentially() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let progress = batch_progress(3, false);
        let out = fetch_indexed(3, 5, &progress, |i| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, vec![0, 1, 2]);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(progress.position(), 3);
        assert!(progress.is_finished());
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_workers() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        fetch_indexed(20, 4, &ProgressBar::hidden(), |i| {
            let running = running.clone();
            let peak = peak.clone();
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(3)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(i)
            }
        })
        .await
        .unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_failure_aborts_batch() {
        let progress = ProgressBar::hidden();
        let err = fetch_indexed(6, 2, &progress, |i| async move {
            if i == 4 {
                Err(FetchError::unexpected("boom"))
            } else {
                Ok(i)
            }
        })
        .await
        .unwrap_err();
        match err {
            FetchError::BatchAborted { index, total, .. } => {
                assert_eq!(index, 4);
                assert_eq!(total, 6);
            }
            other => panic!("expected BatchAborted, got {:?}", other),
        }
        assert!(progress.position() < 6);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let out: Vec<usize> = fetch_indexed(0, 5, &ProgressBar::hidden(), |i| async move { Ok(i) })
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
