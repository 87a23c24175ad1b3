use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tinylink_core::repository::{ReadRepository, Repository, Result, UrlRecord};
use tinylink_core::{ShortCode, StorageError};
use tracing::trace;

/// In-memory implementation of the repository contracts using DashMap.
///
/// Records are indexed by code, with a second index from original URL to
/// code. An insert holds the URL slot for its whole duration, so two inserts
/// of the same URL can never both succeed.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    by_code: DashMap<String, UrlRecord>,
    by_url: DashMap<String, String>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

#[async_trait]
impl ReadRepository for InMemoryRepository {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self
            .by_code
            .get(code.as_str())
            .map(|record| record.value().clone()))
    }

    async fn find_by_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let Some(code) = self.by_url.get(original_url).map(|code| code.value().clone()) else {
            return Ok(None);
        };

        Ok(self.by_code.get(&code).map(|record| record.value().clone()))
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, record: &UrlRecord) -> Result<()> {
        let url_slot = match self.by_url.entry(record.original_url.clone()) {
            Entry::Occupied(_) => {
                return Err(StorageError::UrlConflict(record.original_url.clone()));
            }
            Entry::Vacant(slot) => slot,
        };

        match self.by_code.entry(record.code.as_str().to_string()) {
            Entry::Occupied(_) => Err(StorageError::CodeConflict(record.code.to_string())),
            Entry::Vacant(code_slot) => {
                code_slot.insert(record.clone());
                url_slot.insert(record.code.as_str().to_string());
                trace!(code = %record.code, "stored record in memory");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::{SignedDuration, Timestamp};
    use std::sync::Arc;

    fn record(counter: u64, url: &str, expire_at: Option<Timestamp>) -> UrlRecord {
        UrlRecord {
            code: ShortCode::from_counter(counter),
            original_url: url.to_string(),
            counter,
            created_at: Timestamp::now(),
            expire_at,
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_code_and_url() {
        let repo = InMemoryRepository::new();
        let rec = record(10, "https://example.com", None);

        repo.insert(&rec).await.unwrap();

        assert_eq!(repo.find_by_code(&rec.code).await.unwrap(), Some(rec.clone()));
        assert_eq!(
            repo.find_by_url("https://example.com").await.unwrap(),
            Some(rec)
        );
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn unknown_lookups_return_none() {
        let repo = InMemoryRepository::new();
        assert!(repo.is_empty());
        assert!(repo
            .find_by_code(&ShortCode::from_counter(1))
            .await
            .unwrap()
            .is_none());
        assert!(repo.find_by_url("https://nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_without_claiming_url() {
        let repo = InMemoryRepository::new();
        repo.insert(&record(1, "https://one.example", None))
            .await
            .unwrap();

        let err = repo
            .insert(&record(1, "https://two.example", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::CodeConflict(_)));
        assert!(repo.find_by_url("https://two.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_url_is_rejected() {
        let repo = InMemoryRepository::new();
        repo.insert(&record(1, "https://example.com", None))
            .await
            .unwrap();

        let err = repo
            .insert(&record(2, "https://example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UrlConflict(_)));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn expired_records_are_still_returned() {
        let repo = InMemoryRepository::new();
        let expired = Timestamp::now() - SignedDuration::from_secs(1);
        let rec = record(5, "https://example.com", Some(expired));
        repo.insert(&rec).await.unwrap();

        assert_eq!(repo.find_by_code(&rec.code).await.unwrap(), Some(rec));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_inserts_of_one_url_leave_one_record() {
        let repo = Arc::new(InMemoryRepository::new());

        let handles: Vec<_> = (0..16)
            .map(|counter| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.insert(&record(counter, "https://race.example", None))
                        .await
                })
            })
            .collect();

        let mut stored = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => stored += 1,
                Err(e) => assert!(matches!(e, StorageError::UrlConflict(_))),
            }
        }

        assert_eq!(stored, 1);
        assert_eq!(repo.len(), 1);
    }
}
