//! Transaction Coordinator
//!
//! Every multi-step write goes through a [`TransactionCoordinator`]. It offers
//! a plain unit of work with commit/rollback hooks, fixed-size batches, sagas
//! with compensating steps, and a retry loop for serialization failures and
//! deadlocks. All entry points take a [`CancellationToken`]; once it fires no
//! new transaction or attempt is started.

pub mod batch;
pub mod retry;
pub mod saga;
pub mod unit_of_work;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::domain::repository::AuthStores;
use crate::error::{AuthError, AuthResult};

pub use batch::{BatchOp, BatchReport};
pub use saga::{Saga, SagaStep};
pub use unit_of_work::UnitOfWork;

/// Isolation level applied when a transaction begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
}

impl TxOptions {
    pub fn serializable() -> Self {
        Self {
            isolation: IsolationLevel::Serializable,
            read_only: false,
        }
    }

    pub fn read_only() -> Self {
        Self {
            isolation: IsolationLevel::RepeatableRead,
            read_only: true,
        }
    }
}

/// Storage that can open transactions
///
/// The transaction handle implements the same store traits as the pool.
pub trait TransactionBackend: Send + Sync {
    type Tx: AuthStores + Send + 'static;

    fn begin(&self, options: TxOptions) -> impl Future<Output = AuthResult<Self::Tx>> + Send;

    fn commit(&self, tx: Self::Tx) -> impl Future<Output = AuthResult<()>> + Send;

    fn rollback(&self, tx: Self::Tx) -> impl Future<Output = AuthResult<()>> + Send;
}

pub struct TransactionCoordinator<B> {
    backend: Arc<B>,
    options: TxOptions,
    max_retries: u32,
    batch_size: usize,
}

impl<B> Clone for TransactionCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            options: self.options,
            max_retries: self.max_retries,
            batch_size: self.batch_size,
        }
    }
}

impl<B: TransactionBackend> TransactionCoordinator<B> {
    pub fn new(backend: Arc<B>, max_retries: u32, batch_size: usize) -> Self {
        Self {
            backend,
            options: TxOptions::default(),
            max_retries,
            batch_size: batch_size.max(1),
        }
    }

    /// Default options for transactions this coordinator opens
    pub fn with_options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `work` in one transaction; any error rolls back
    ///
    /// `work` may only capture owned data; clone `Arc`s in.
    pub async fn execute<T, F>(&self, cancel: &CancellationToken, work: F) -> AuthResult<T>
    where
        T: Send,
        F: for<'u> FnOnce(&'u mut UnitOfWork<B::Tx>) -> BoxFuture<'u, AuthResult<T>> + Send,
    {
        self.execute_with(self.options, cancel, work).await
    }

    pub async fn execute_with<T, F>(
        &self,
        options: TxOptions,
        cancel: &CancellationToken,
        work: F,
    ) -> AuthResult<T>
    where
        T: Send,
        F: for<'u> FnOnce(&'u mut UnitOfWork<B::Tx>) -> BoxFuture<'u, AuthResult<T>> + Send,
    {
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }

        let tx = self.backend.begin(options).await?;
        let mut uow = UnitOfWork::new(tx);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AuthError::Cancelled),
            result = work(&mut uow) => result,
        };

        let (tx, commit_hooks, rollback_hooks) = uow.into_parts();
        match outcome {
            Ok(value) => match self.backend.commit(tx).await {
                Ok(()) => {
                    unit_of_work::run_hooks(commit_hooks, "commit");
                    Ok(value)
                }
                Err(e) => {
                    tracing::error!(code = e.code(), error = %e, "Transaction commit failed");
                    unit_of_work::run_hooks(rollback_hooks, "rollback");
                    Err(e)
                }
            },
            Err(e) => {
                unit_of_work::run_hooks(rollback_hooks, "rollback");
                if let Err(rollback_err) = self.backend.rollback(tx).await {
                    tracing::error!(error = %rollback_err, "Transaction rollback failed");
                }
                tracing::debug!(code = e.code(), "Transaction rolled back");
                Err(e)
            }
        }
    }
}
