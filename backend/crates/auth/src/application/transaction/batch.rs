//! Batch execution
//!
//! Operations are split into groups of `batch_size`; each group commits in its
//! own transaction. A failing group rolls back alone and stops the batch.
//! Groups committed before it stay committed.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{TransactionBackend, TransactionCoordinator};
use crate::error::{AuthError, AuthResult};

/// One operation against an open transaction
pub type BatchOp<Tx> = Box<dyn for<'t> FnOnce(&'t Tx) -> BoxFuture<'t, AuthResult<()>> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub groups_committed: usize,
    pub operations_committed: usize,
}

impl<B: TransactionBackend> TransactionCoordinator<B> {
    /// Box a closure as a [`BatchOp`]
    pub fn batch_op<F>(op: F) -> BatchOp<B::Tx>
    where
        F: for<'t> FnOnce(&'t B::Tx) -> BoxFuture<'t, AuthResult<()>> + Send + 'static,
    {
        Box::new(op)
    }

    /// Run `ops` in groups of the configured batch size
    ///
    /// Fails with [`AuthError::BatchFailed`] carrying the index of the
    /// operation that failed, or of the group's first operation when the
    /// group itself could not commit.
    pub async fn execute_batch(
        &self,
        cancel: &CancellationToken,
        ops: Vec<BatchOp<B::Tx>>,
    ) -> AuthResult<BatchReport> {
        let total = ops.len();
        let mut report = BatchReport::default();
        let mut remaining = ops.into_iter();
        let mut offset = 0usize;

        loop {
            let group: Vec<BatchOp<B::Tx>> = remaining.by_ref().take(self.batch_size).collect();
            if group.is_empty() {
                break;
            }
            let group_len = group.len();
            let group_start = offset;

            self.execute(cancel, move |uow| {
                Box::pin(async move {
                    for (i, op) in group.into_iter().enumerate() {
                        op(uow.tx()).await.map_err(|e| AuthError::BatchFailed {
                            offset: group_start + i,
                            source: Box::new(e),
                        })?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                failed @ AuthError::BatchFailed { .. } => failed,
                // Commit conflict or cancellation: blame the group
                other => AuthError::BatchFailed {
                    offset: group_start,
                    source: Box::new(other),
                },
            })
            .inspect_err(|e| {
                tracing::warn!(
                    group_start,
                    committed = report.operations_committed,
                    total,
                    error = %e,
                    "Batch stopped"
                );
            })?;

            offset += group_len;
            report.groups_committed += 1;
            report.operations_committed += group_len;
        }

        tracing::debug!(
            groups = report.groups_committed,
            operations = report.operations_committed,
            "Batch completed"
        );
        Ok(report)
    }
}
