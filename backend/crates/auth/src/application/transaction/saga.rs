//! Saga execution
//!
//! Steps run in order, each in its own transaction. When step `k` fails the
//! compensations of steps `k-1..=0` run in reverse, again one transaction
//! each. A failing compensation stops the unwind and is reported together
//! with the original failure; compensations are never retried.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use super::{TransactionBackend, TransactionCoordinator};
use crate::error::{AuthError, AuthResult};

type StepFn<Tx> = Box<dyn for<'t> FnOnce(&'t Tx) -> BoxFuture<'t, AuthResult<()>> + Send>;

pub struct SagaStep<Tx> {
    pub name: &'static str,
    execute: StepFn<Tx>,
    compensate: StepFn<Tx>,
}

pub struct Saga<Tx> {
    steps: Vec<SagaStep<Tx>>,
}

impl<Tx> Default for Saga<Tx> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<Tx> Saga<Tx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step<E, C>(mut self, name: &'static str, execute: E, compensate: C) -> Self
    where
        E: for<'t> FnOnce(&'t Tx) -> BoxFuture<'t, AuthResult<()>> + Send + 'static,
        C: for<'t> FnOnce(&'t Tx) -> BoxFuture<'t, AuthResult<()>> + Send + 'static,
    {
        self.steps.push(SagaStep {
            name,
            execute: Box::new(execute),
            compensate: Box::new(compensate),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<B: TransactionBackend> TransactionCoordinator<B> {
    /// Run a saga to completion or unwind it
    ///
    /// Cancellation stops forward progress; compensations for completed steps
    /// still run.
    pub async fn run_saga(&self, cancel: &CancellationToken, saga: Saga<B::Tx>) -> AuthResult<()> {
        let mut completed: Vec<(usize, &'static str, StepFn<B::Tx>)> = Vec::new();

        for (index, step) in saga.steps.into_iter().enumerate() {
            let SagaStep {
                name,
                execute,
                compensate,
            } = step;

            match self.execute(cancel, move |uow| execute(uow.tx())).await {
                Ok(()) => {
                    tracing::debug!(step = index, name, "Saga step completed");
                    completed.push((index, name, compensate));
                }
                Err(original) => {
                    tracing::warn!(
                        step = index,
                        name,
                        error = %original,
                        "Saga step failed, compensating"
                    );
                    return Err(self.compensate(index, name, original, completed).await);
                }
            }
        }

        Ok(())
    }

    async fn compensate(
        &self,
        failed_step: usize,
        failed_name: &'static str,
        original: AuthError,
        completed: Vec<(usize, &'static str, StepFn<B::Tx>)>,
    ) -> AuthError {
        let unwind = CancellationToken::new();

        for (index, name, compensate) in completed.into_iter().rev() {
            if let Err(compensation) = self.execute(&unwind, move |uow| compensate(uow.tx())).await {
                tracing::error!(
                    failed_step,
                    compensating_step = index,
                    name,
                    error = %compensation,
                    "Saga compensation failed"
                );
                return AuthError::SagaCompensationFailed {
                    failed_step,
                    compensating_step: index,
                    original: Box::new(original),
                    compensation: Box::new(compensation),
                };
            }
            tracing::debug!(step = index, name, "Saga step compensated");
        }

        AuthError::SagaStepFailed {
            step: failed_step,
            name: failed_name,
            source: Box::new(original),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::user::{User, fixtures};
    use crate::domain::repository::UserRepository;
    use crate::domain::value_object::{email::Email, user_name::UserName};
    use crate::infra::memory::MemoryAuthStore;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<String>>>;

    fn named_user(name: &str) -> User {
        let mut user = fixtures::user(Utc::now());
        user.user_name = UserName::new(name).unwrap();
        user.email = Email::new(format!("{name}@example.com")).unwrap();
        user
    }

    /// Step that creates a user; its compensation removes it again
    fn create_step(saga: Saga<MemoryAuthStore>, name: &'static str, log: &Log) -> Saga<MemoryAuthStore> {
        let user = named_user(name);
        let user_id = user.user_id;
        let (exec_log, comp_log) = (log.clone(), log.clone());
        saga.step(
            name,
            move |tx| {
                Box::pin(async move {
                    tx.create_user(&user).await?;
                    exec_log.lock().unwrap().push(format!("exec {name}"));
                    Ok(())
                })
            },
            move |tx| {
                Box::pin(async move {
                    tx.remove_user(&user_id).await;
                    comp_log.lock().unwrap().push(format!("compensate {name}"));
                    Ok(())
                })
            },
        )
    }

    #[tokio::test]
    async fn test_failure_compensates_in_reverse() {
        let store = MemoryAuthStore::new();
        let coordinator = TransactionCoordinator::new(Arc::new(store.clone()), 0, 10);
        let log: Log = Arc::default();

        let saga = create_step(Saga::new(), "a", &log);
        let saga = create_step(saga, "b", &log);
        let saga = saga.step(
            "c",
            |_tx| Box::pin(async { Err(AuthError::Internal("c failed".into())) }),
            |_tx| Box::pin(async { Ok(()) }),
        );
        assert_eq!(saga.len(), 3);

        let err = coordinator
            .run_saga(&CancellationToken::new(), saga)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::SagaStepFailed { step: 2, name: "c", .. }));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["exec a", "exec b", "compensate b", "compensate a"]
        );
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_compensation_failure_is_reported_distinctly() {
        let store = MemoryAuthStore::new();
        let coordinator = TransactionCoordinator::new(Arc::new(store.clone()), 0, 10);
        let log: Log = Arc::default();

        let saga = create_step(Saga::new(), "a", &log);
        let saga = saga
            .step(
                "b",
                |_tx| Box::pin(async { Ok(()) }),
                |_tx| Box::pin(async { Err(AuthError::Internal("cannot undo b".into())) }),
            )
            .step(
                "c",
                |_tx| Box::pin(async { Err(AuthError::Internal("c failed".into())) }),
                |_tx| Box::pin(async { Ok(()) }),
            );

        let err = coordinator
            .run_saga(&CancellationToken::new(), saga)
            .await
            .unwrap_err();
        match err {
            AuthError::SagaCompensationFailed {
                failed_step,
                compensating_step,
                original,
                compensation,
            } => {
                assert_eq!(failed_step, 2);
                assert_eq!(compensating_step, 1);
                assert_eq!(original.to_string(), "Internal error: c failed");
                assert_eq!(compensation.to_string(), "Internal error: cannot undo b");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Unwind stopped before reaching step a
        assert_eq!(*log.lock().unwrap(), vec!["exec a"]);
        assert_eq!(store.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_successful_saga() {
        let store = MemoryAuthStore::new();
        let coordinator = TransactionCoordinator::new(Arc::new(store.clone()), 0, 10);
        let log: Log = Arc::default();

        let saga = create_step(create_step(Saga::new(), "a", &log), "b", &log);
        coordinator
            .run_saga(&CancellationToken::new(), saga)
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["exec a", "exec b"]);
        assert_eq!(store.user_count().await, 2);
    }
}
