use crate::backend::{CoordinationBackend, Node};
use crate::error::{CounterError, Result};
use crate::path::CounterPath;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

/// Data written into newly created nodes.
const INITIAL_VALUE: &str = "0";

/// Configures where the counter lives and how hard reservations retry.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CounterSettings {
    /// Location of the counter node.
    pub path: CounterPath,
    /// Version conflicts tolerated per reservation before giving up.
    #[builder(default = 16)]
    pub max_cas_retries: u32,
    /// First backoff after a version conflict; doubled on every retry.
    #[builder(default = Duration::from_millis(1))]
    pub initial_backoff: Duration,
    /// Upper bound for the backoff between retries.
    #[builder(default = Duration::from_millis(64))]
    pub max_backoff: Duration,
}

/// The cluster-wide counter, shared by every process through the
/// coordination backend.
///
/// The stored value only moves forward, and only through a versioned write,
/// so two reservations can never hand out overlapping ranges.
pub struct CounterStore<B: CoordinationBackend + ?Sized> {
    backend: Arc<B>,
    settings: CounterSettings,
    path: String,
}

impl<B: CoordinationBackend + ?Sized> CounterStore<B> {
    /// Binds a store to `backend` without touching the coordination service.
    ///
    /// Use [`CounterStore::connect`] unless the path is known to exist.
    pub fn new(backend: Arc<B>, settings: CounterSettings) -> Self {
        let path = settings.path.to_string();
        Self {
            backend,
            settings,
            path,
        }
    }

    /// Binds a store to `backend` and makes sure the counter node exists.
    ///
    /// Any failure here means the process must not start serving.
    pub async fn connect(backend: Arc<B>, settings: CounterSettings) -> Result<Self> {
        let store = Self::new(backend, settings);
        store.ensure_path_exists().await?;
        info!(path = %store.path, "counter store ready");
        Ok(store)
    }

    /// The normalized counter path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Creates the counter node and any missing ancestors, each holding `"0"`.
    ///
    /// Safe to run concurrently from many processes: a node that somebody
    /// else created first counts as success.
    pub async fn ensure_path_exists(&self) -> Result<()> {
        for node in self.settings.path.ancestors() {
            if self.backend.create(&node, INITIAL_VALUE).await? {
                debug!(path = %node, "created coordination node");
            } else {
                trace!(path = %node, "coordination node already exists");
            }
        }
        Ok(())
    }

    /// Atomically advances the counter by `size` and returns its previous
    /// value. The caller owns `[start, start + size)`.
    pub async fn reserve_range(&self, size: u64) -> Result<u64> {
        if size == 0 {
            return Err(CounterError::InvalidRangeSize);
        }

        let mut attempt = 0_u32;
        let mut backoff = self.settings.initial_backoff;

        loop {
            let (current, version) = self.read_current().await?;
            let next = current
                .checked_add(size)
                .ok_or_else(|| CounterError::Exhausted(self.path.clone()))?;

            match self
                .backend
                .set_if_version(&self.path, &next.to_string(), version)
                .await
            {
                Ok(()) => {
                    debug!(
                        path = %self.path,
                        range_start = current,
                        range_end = next,
                        attempts = attempt + 1,
                        "reserved counter range"
                    );
                    return Ok(current);
                }
                Err(CounterError::VersionConflict { .. }) => {
                    attempt += 1;
                    if attempt >= self.settings.max_cas_retries {
                        warn!(path = %self.path, attempts = attempt, "counter reservation kept conflicting");
                        return Err(CounterError::MaxRetriesExceeded { attempts: attempt });
                    }
                    trace!(path = %self.path, attempt, "version conflict, retrying reservation");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.settings.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads the counter without advancing it.
    ///
    /// This is the first value the next reservation would hand out.
    pub async fn current(&self) -> Result<u64> {
        self.read_current().await.map(|(value, _)| value)
    }

    /// Releases the coordination backend.
    pub async fn shutdown(&self) -> Result<()> {
        self.backend.close().await
    }

    async fn read_current(&self) -> Result<(u64, crate::backend::Version)> {
        let Node { data, version } = self
            .backend
            .get(&self.path)
            .await?
            .ok_or_else(|| CounterError::NoNode(self.path.clone()))?;

        let value = data
            .trim()
            .parse::<u64>()
            .map_err(|e| CounterError::CorruptedData {
                path: self.path.clone(),
                reason: format!("'{data}' is not a decimal u64: {e}"),
            })?;

        Ok((value, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use std::collections::HashSet;

    fn settings(path: &str) -> CounterSettings {
        CounterSettings::builder()
            .path(CounterPath::new(path).unwrap())
            .build()
    }

    async fn store() -> CounterStore<InMemoryBackend> {
        CounterStore::connect(Arc::new(InMemoryBackend::new()), settings("/tinylink/counter"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn ensure_path_creates_ancestors_with_zero() {
        let backend = Arc::new(InMemoryBackend::new());
        CounterStore::connect(backend.clone(), settings("/a/b/c"))
            .await
            .unwrap();

        for path in ["/a", "/a/b", "/a/b/c"] {
            let node = backend.get(path).await.unwrap().unwrap();
            assert_eq!(node.data, "0", "node {path} should start at zero");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_connects_share_one_path() {
        let backend = Arc::new(InMemoryBackend::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let backend = backend.clone();
                tokio::spawn(async move {
                    CounterStore::connect(backend, settings("/tinylink/counter")).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for path in ["/tinylink", "/tinylink/counter"] {
            let node = backend.get(path).await.unwrap().unwrap();
            assert_eq!(node.data, "0", "node {path} should start at zero");
            assert_eq!(node.version, 0, "node {path} should never be rewritten");
        }
    }

    #[tokio::test]
    async fn ensure_path_keeps_existing_value() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.create("/a", "0").await.unwrap();
        backend.create("/a/b", "4200").await.unwrap();

        let store = CounterStore::connect(backend, settings("/a/b")).await.unwrap();
        store.ensure_path_exists().await.unwrap();
        assert_eq!(store.current().await.unwrap(), 4200);
    }

    #[tokio::test]
    async fn connect_fails_when_unreachable() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set_reachable(false);

        let result = CounterStore::connect(backend, settings("/a")).await;
        assert!(matches!(result, Err(CounterError::Unavailable(_))));
    }

    #[tokio::test]
    async fn reserve_returns_consecutive_ranges() {
        let store = store().await;

        assert_eq!(store.reserve_range(100).await.unwrap(), 0);
        assert_eq!(store.reserve_range(100).await.unwrap(), 100);
        assert_eq!(store.reserve_range(5).await.unwrap(), 200);
        assert_eq!(store.current().await.unwrap(), 205);
    }

    #[tokio::test]
    async fn reserve_rejects_zero_size() {
        let store = store().await;
        assert_eq!(
            store.reserve_range(0).await.unwrap_err(),
            CounterError::InvalidRangeSize
        );
    }

    #[tokio::test]
    async fn reserve_surfaces_unavailable_without_advancing() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = CounterStore::connect(backend.clone(), settings("/a"))
            .await
            .unwrap();
        store.reserve_range(10).await.unwrap();

        backend.set_reachable(false);
        let err = store.reserve_range(10).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, CounterError::Unavailable(_)));

        backend.set_reachable(true);
        assert_eq!(store.reserve_range(10).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn reserve_without_path_fails() {
        let store = CounterStore::new(Arc::new(InMemoryBackend::new()), settings("/a"));
        assert_eq!(
            store.reserve_range(1).await.unwrap_err(),
            CounterError::NoNode("/a".to_string())
        );
    }

    #[tokio::test]
    async fn reserve_detects_corrupted_counter() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.create("/a", "not-a-number").await.unwrap();
        let store = CounterStore::connect(backend, settings("/a")).await.unwrap();

        assert!(matches!(
            store.reserve_range(1).await,
            Err(CounterError::CorruptedData { .. })
        ));
    }

    #[tokio::test]
    async fn reserve_reports_exhaustion() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.create("/a", &(u64::MAX - 5).to_string()).await.unwrap();
        let store = CounterStore::connect(backend, settings("/a")).await.unwrap();

        assert_eq!(store.reserve_range(5).await.unwrap(), u64::MAX - 5);
        assert_eq!(
            store.reserve_range(1).await.unwrap_err(),
            CounterError::Exhausted("/a".to_string())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_are_disjoint() {
        let backend = Arc::new(InMemoryBackend::new());
        let settings = CounterSettings::builder()
            .path(CounterPath::new("/a").unwrap())
            .max_cas_retries(1_000)
            .build();
        let store = Arc::new(CounterStore::connect(backend, settings).await.unwrap());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move {
                    let mut starts = Vec::new();
                    for _ in 0..25 {
                        starts.push(store.reserve_range(10).await.unwrap());
                    }
                    starts
                })
            })
            .collect();

        let mut starts = HashSet::new();
        for handle in handles {
            for start in handle.await.unwrap() {
                assert_eq!(start % 10, 0, "ranges must stay aligned to the range size");
                assert!(starts.insert(start), "range starting at {start} was issued twice");
            }
        }

        assert_eq!(starts.len(), 200);
        assert_eq!(store.current().await.unwrap(), 2_000);
    }
}
