// Tests for call de-duplication

use crate::error::LcuError;
use crate::lcu::debounce::DebounceCache;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

#[cfg(test)]
mod debounce_tests {
  use super::*;

  fn counted_operation(
    counter: &Arc<AtomicUsize>,
    delay: Duration,
  ) -> impl FnOnce() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<usize, LcuError>> + Send>>
  {
    let counter = counter.clone();
    move || {
      Box::pin(async move {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        sleep(delay).await;
        Ok(n)
      })
    }
  }

  /// Two calls 10 ms apart share one invocation and one result.
  #[tokio::test(start_paused = true)]
  async fn test_burst_is_collapsed() {
    let cache: DebounceCache<usize> = DebounceCache::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let window = Duration::from_millis(1000);

    let first = cache.debounce("k", window, counted_operation(&counter, Duration::from_millis(50)));
    let second = async {
      sleep(Duration::from_millis(10)).await;
      cache
        .debounce("k", window, counted_operation(&counter, Duration::from_millis(50)))
        .await
    };
    let (a, b) = tokio::join!(first, second);

    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  /// A completed result is reused inside the window and refreshed after it.
  #[tokio::test(start_paused = true)]
  async fn test_window_expiry_triggers_fresh_work() {
    let cache: DebounceCache<usize> = DebounceCache::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let window = Duration::from_millis(200);

    let a = cache
      .debounce("k", window, counted_operation(&counter, Duration::ZERO))
      .await
      .unwrap();
    sleep(Duration::from_millis(100)).await;
    let b = cache
      .debounce("k", window, counted_operation(&counter, Duration::ZERO))
      .await
      .unwrap();
    assert_eq!((a, b), (1, 1));

    sleep(Duration::from_millis(250)).await;
    assert!(cache.is_empty());
    let c = cache
      .debounce("k", window, counted_operation(&counter, Duration::ZERO))
      .await
      .unwrap();
    assert_eq!(c, 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_keys_are_independent() {
    let cache: DebounceCache<usize> = DebounceCache::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let window = Duration::from_millis(500);

    let (a, b) = tokio::join!(
      cache.debounce("a", window, counted_operation(&counter, Duration::from_millis(5))),
      cache.debounce("b", window, counted_operation(&counter, Duration::from_millis(5))),
    );
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_errors_are_shared_too() {
    let cache: DebounceCache<usize> = DebounceCache::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let window = Duration::from_millis(300);

    let failing = |calls: Arc<AtomicUsize>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Err::<usize, _>(LcuError::SessionUnavailable("no session".into()))
      }
    };

    let a = cache.debounce("s", window, failing(calls.clone())).await;
    let b = cache.debounce("s", window, failing(calls.clone())).await;
    assert_eq!(a, b);
    assert!(a.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  /// The operation completes even if the first caller stops waiting.
  #[tokio::test(start_paused = true)]
  async fn test_dropped_caller_does_not_cancel_work() {
    let cache: DebounceCache<usize> = DebounceCache::new();
    let counter = Arc::new(AtomicUsize::new(0));
    let window = Duration::from_millis(1000);

    let abandoned = tokio::time::timeout(
      Duration::from_millis(5),
      cache.debounce("k", window, counted_operation(&counter, Duration::from_millis(50))),
    )
    .await;
    assert!(abandoned.is_err());

    let value = cache
      .debounce("k", window, counted_operation(&counter, Duration::from_millis(50)))
      .await
      .unwrap();
    assert_eq!(value, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }
}
