use crate::backend::CoordinationBackend;
use crate::error::{CounterError, Result};
use crate::store::CounterStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use typed_builder::TypedBuilder;

/// Configures a [`RangeAllocator`].
#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct AllocatorSettings {
    /// Number of counter values leased per round trip to the coordination
    /// service. Values left in a lease when the process stops are lost.
    #[builder(default = 1_000)]
    pub range_size: u64,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A range of counter values owned by this process.
///
/// Values in `[start, cursor)` have been handed out; `[cursor, end)` are still
/// available. A lease is replaced, never refilled, once `cursor == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterLease {
    pub start: u64,
    pub end: u64,
    pub cursor: u64,
}

impl CounterLease {
    fn new(start: u64, size: u64) -> Self {
        Self {
            start,
            end: start + size,
            cursor: start,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.end
    }

    pub fn remaining(&self) -> u64 {
        self.end - self.cursor
    }
}

/// Hands out counter values from a locally held lease, reserving a new range
/// from the [`CounterStore`] whenever the current one runs dry.
///
/// Values issued by one allocator are strictly increasing. The lease lock is
/// held across the reservation round trip, so callers that hit an exhausted
/// lease together wait for a single reservation instead of each making one.
pub struct RangeAllocator<B: CoordinationBackend + ?Sized> {
    store: Arc<CounterStore<B>>,
    range_size: u64,
    lease: Mutex<Option<CounterLease>>,
    reservations: AtomicU64,
}

impl<B: CoordinationBackend + ?Sized> RangeAllocator<B> {
    /// Fails with `InvalidRangeSize` if the configured range is empty.
    pub fn new(store: Arc<CounterStore<B>>, settings: AllocatorSettings) -> Result<Self> {
        if settings.range_size == 0 {
            return Err(CounterError::InvalidRangeSize);
        }

        Ok(Self {
            store,
            range_size: settings.range_size,
            lease: Mutex::new(None),
            reservations: AtomicU64::new(0),
        })
    }

    /// Returns the next unused counter value.
    ///
    /// Only blocks on the coordination service when the lease is exhausted.
    /// If the reservation fails, the allocator stays empty and the next call
    /// tries again.
    pub async fn next(&self) -> Result<u64> {
        let mut guard = self.lease.lock().await;

        let mut lease = match *guard {
            Some(lease) if !lease.is_exhausted() => lease,
            _ => {
                let start = self.store.reserve_range(self.range_size).await?;
                self.reservations.fetch_add(1, Ordering::Relaxed);

                let lease = CounterLease::new(start, self.range_size);
                info!(
                    path = %self.store.path(),
                    range_start = lease.start,
                    range_end = lease.end,
                    "allocated new counter range"
                );
                lease
            }
        };

        let value = lease.cursor;
        lease.cursor += 1;
        *guard = Some(lease);
        Ok(value)
    }

    /// A snapshot of the current lease, if any.
    pub async fn lease(&self) -> Option<CounterLease> {
        *self.lease.lock().await
    }

    /// Number of ranges reserved from the counter store so far.
    pub fn reservations(&self) -> u64 {
        self.reservations.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &Arc<CounterStore<B>> {
        &self.store
    }
}
