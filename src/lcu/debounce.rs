// Collapse bursts of identical calls into one
//
// One entry per key. While an entry is in flight, or settled less than
// `window` ago, callers with the same key share its result. A background task
// removes the entry `window` after it settles.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::LcuError;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, LcuError>>>;

struct DebounceEntry<T> {
  id: u64,
  result: SharedResult<T>,
  started_at: Instant,
  settled_at: Arc<OnceLock<Instant>>,
}

impl<T> DebounceEntry<T> {
  fn is_live(&self, window: Duration) -> bool {
    match self.settled_at.get() {
      None => true,
      Some(settled) => settled.elapsed() < window,
    }
  }
}

pub struct DebounceCache<T> {
  entries: Arc<Mutex<HashMap<String, DebounceEntry<T>>>>,
  next_id: AtomicU64,
}

impl<T> Default for DebounceCache<T> {
  fn default() -> Self {
    Self {
      entries: Arc::new(Mutex::new(HashMap::new())),
      next_id: AtomicU64::new(1),
    }
  }
}

impl<T> DebounceCache<T>
where
  T: Clone + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self::default()
  }

  /// Run `operation` unless a call with the same key is in flight or
  /// finished within `window`, in which case that call's result is returned.
  pub async fn debounce<F, Fut>(
    &self,
    key: &str,
    window: Duration,
    operation: F,
  ) -> Result<T, LcuError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, LcuError>> + Send + 'static,
  {
    let shared = {
      let mut entries = self
        .entries
        .lock()
        .map_err(|_| LcuError::Transport("debounce cache poisoned".into()))?;

      match entries.get(key) {
        Some(entry) if entry.is_live(window) => {
          tracing::trace!(
            key,
            age_ms = entry.started_at.elapsed().as_millis() as u64,
            "debounced call"
          );
          entry.result.clone()
        }
        _ => {
          let id = self.next_id.fetch_add(1, Ordering::Relaxed);
          let result = operation().boxed().shared();
          let settled_at = Arc::new(OnceLock::new());
          entries.insert(
            key.to_string(),
            DebounceEntry {
              id,
              result: result.clone(),
              started_at: Instant::now(),
              settled_at: settled_at.clone(),
            },
          );
          self.spawn_cleanup(key.to_string(), id, result.clone(), settled_at, window);
          result
        }
      }
    };

    shared.await
  }

  /// Drive the operation to completion and expire the entry afterwards.
  fn spawn_cleanup(
    &self,
    key: String,
    id: u64,
    result: SharedResult<T>,
    settled_at: Arc<OnceLock<Instant>>,
    window: Duration,
  ) {
    let entries = Arc::clone(&self.entries);
    tokio::spawn(async move {
      let _ = result.await;
      let _ = settled_at.set(Instant::now());
      tokio::time::sleep(window).await;
      if let Ok(mut entries) = entries.lock() {
        if entries.get(&key).map(|e| e.id) == Some(id) {
          entries.remove(&key);
        }
      }
    });
  }

  /// Number of live keys.
  pub fn len(&self) -> usize {
    self.entries.lock().map(|e| e.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Forget every entry. In-flight operations still complete.
  pub fn clear(&self) {
    if let Ok(mut entries) = self.entries.lock() {
      entries.clear();
    }
  }
}
