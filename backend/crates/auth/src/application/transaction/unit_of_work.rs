//! Unit of Work
//!
//! A transaction handle plus hooks. Commit hooks run after a successful
//! commit; rollback hooks run before the rollback is issued (or after a
//! failed commit). Each hook runs at most once, in registration order. A
//! failing hook is logged and never changes the outcome.

use crate::error::AuthResult;

pub type Hook = Box<dyn FnOnce() -> AuthResult<()> + Send>;

pub struct UnitOfWork<Tx> {
    tx: Tx,
    on_commit: Vec<Hook>,
    on_rollback: Vec<Hook>,
}

impl<Tx> UnitOfWork<Tx> {
    pub(crate) fn new(tx: Tx) -> Self {
        Self {
            tx,
            on_commit: Vec::new(),
            on_rollback: Vec::new(),
        }
    }

    /// Stores bound to this transaction
    pub fn tx(&self) -> &Tx {
        &self.tx
    }

    pub fn on_commit(&mut self, hook: impl FnOnce() -> AuthResult<()> + Send + 'static) {
        self.on_commit.push(Box::new(hook));
    }

    pub fn on_rollback(&mut self, hook: impl FnOnce() -> AuthResult<()> + Send + 'static) {
        self.on_rollback.push(Box::new(hook));
    }

    pub(crate) fn into_parts(self) -> (Tx, Vec<Hook>, Vec<Hook>) {
        (self.tx, self.on_commit, self.on_rollback)
    }
}

pub(crate) fn run_hooks(hooks: Vec<Hook>, phase: &'static str) {
    for (index, hook) in hooks.into_iter().enumerate() {
        if let Err(e) = hook() {
            tracing::warn!(phase, index, code = e.code(), error = %e, "Transaction hook failed");
        }
    }
}
