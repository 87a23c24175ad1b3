use async_trait::async_trait;
use thiserror::Error;
use tinylink_core::ShortCode;
use tinylink_counter::{CoordinationBackend, CounterError, RangeAllocator};

/// A freshly issued counter value and the short code derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub counter: u64,
    pub code: ShortCode,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Counter(#[from] CounterError),
}

impl GenerateError {
    /// Whether the coordination service could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, GenerateError::Counter(CounterError::Unavailable(_)))
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GenerateError::Counter(e) => e.is_retryable(),
        }
    }
}

/// Trait for generating short codes.
///
/// Implementations must never hand out the same code twice, across every
/// process that shares their source of uniqueness. They don't touch the
/// durable store.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    async fn generate(&self) -> Result<GeneratedCode, GenerateError>;
}

#[async_trait]
impl<B: CoordinationBackend + ?Sized> Generator for RangeAllocator<B> {
    async fn generate(&self) -> Result<GeneratedCode, GenerateError> {
        let counter = self.next().await?;
        Ok(GeneratedCode {
            counter,
            code: ShortCode::from_counter(counter),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tinylink_counter::{
        AllocatorSettings, CounterPath, CounterSettings, CounterStore, InMemoryBackend,
    };

    async fn allocator(backend: Arc<InMemoryBackend>) -> RangeAllocator<InMemoryBackend> {
        let settings = CounterSettings::builder()
            .path(CounterPath::new("/tinylink/counter").unwrap())
            .build();
        let store = CounterStore::connect(backend, settings).await.unwrap();
        RangeAllocator::new(
            Arc::new(store),
            AllocatorSettings::builder().range_size(100).build(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn codes_encode_the_issued_counter() {
        let generator = allocator(Arc::new(InMemoryBackend::new())).await;

        let first = generator.generate().await.unwrap();
        assert_eq!(first.counter, 0);
        assert_eq!(first.code.as_str(), "0");

        for _ in 1..62 {
            generator.generate().await.unwrap();
        }
        let generated = generator.generate().await.unwrap();
        assert_eq!(generated.counter, 62);
        assert_eq!(generated.code.as_str(), "10");
        assert_eq!(generated.code.counter().unwrap(), 62);
    }

    #[tokio::test]
    async fn unreachable_coordination_is_reported_as_unavailable() {
        let backend = Arc::new(InMemoryBackend::new());
        let generator = allocator(backend.clone()).await;

        backend.set_reachable(false);
        let err = generator.generate().await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.is_retryable());
    }
}
