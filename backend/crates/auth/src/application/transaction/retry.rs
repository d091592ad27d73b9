//! Retry on serialization failure or deadlock
//!
//! Only errors classified by [`AuthError::is_retryable`] trigger another
//! attempt. There is no backoff; the cancellation token is checked before
//! every attempt.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{TransactionBackend, TransactionCoordinator, UnitOfWork};
use crate::error::{AuthError, AuthResult};

impl<B: TransactionBackend> TransactionCoordinator<B> {
    /// Run `work` in a fresh transaction up to `max_retries + 1` times
    pub async fn execute_retryable<T, F>(
        &self,
        cancel: &CancellationToken,
        work: F,
    ) -> AuthResult<T>
    where
        T: Send,
        F: for<'u> Fn(&'u mut UnitOfWork<B::Tx>) -> BoxFuture<'u, AuthResult<T>> + Send + Sync,
    {
        let attempts = self.max_retries().saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                tracing::debug!(attempt, "Retry loop cancelled");
                return Err(AuthError::Cancelled);
            }

            match self.execute(cancel, &work).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    if attempt >= attempts {
                        tracing::error!(attempts, error = %e, "Transaction retries exhausted");
                        return Err(AuthError::RetriesExhausted {
                            attempts,
                            source: Box::new(e),
                        });
                    }
                    tracing::warn!(
                        attempt,
                        max_attempts = attempts,
                        code = e.code(),
                        "Retrying transaction after conflict"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryAuthStore;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn coordinator(store: &MemoryAuthStore, retries: u32) -> TransactionCoordinator<MemoryAuthStore> {
        TransactionCoordinator::new(Arc::new(store.clone()), retries, 10)
    }

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let store = MemoryAuthStore::new();
        store.faults().inject_commit_conflicts(2);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let value = coordinator(&store, 3)
            .execute_retryable(&CancellationToken::new(), move |_uow| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let store = MemoryAuthStore::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let err = coordinator(&store, 2)
            .execute_retryable(&CancellationToken::new(), move |_uow| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AuthError::TransactionConflict("40001".into()))
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let store = MemoryAuthStore::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let err = coordinator(&store, 5)
            .execute_retryable(&CancellationToken::new(), move |_uow| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AuthError::InvalidCredentials)
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_between_attempts() {
        let store = MemoryAuthStore::new();
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let trigger = cancel.clone();
        let err = coordinator(&store, 5)
            .execute_retryable(&cancel, move |_uow| {
                let counter = counter.clone();
                let trigger = trigger.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    // Fails with a retryable error, then the caller gives up
                    trigger.cancel();
                    Err::<(), _>(AuthError::TransactionConflict("40P01".into()))
                })
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
