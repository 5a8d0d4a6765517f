use std::{cell::RefCell, rc::Rc};

use crate::{
    error::{EngineError, EngineResult},
    types::Type,
    typesystem::{TypeSystem, TypeSystemListener},
};

/// Listener installed for the lifetime of a transaction; collects every
/// type created while the transaction is active.
struct TransactionListener {
    created: RefCell<Vec<Type>>,
}

impl TypeSystemListener for TransactionListener {
    fn created(&self, ty: Type) {
        self.created.borrow_mut().push(ty);
    }

    fn destroyed(&self, ty: Type) {
        self.created.borrow_mut().retain(|t| *t != ty);
    }
}

/// A transactional view over type registration.
///
/// Every type created while the transaction is active is collected.
/// `commit` forgets the list; dropping the transaction without committing
/// rolls back, destroying the collected types in reverse registration
/// order, so a `?` that propagates out of the transaction's scope
/// triggers the rollback automatically.
///
/// Transactions must not overlap: starting one while another is active
/// fails, and nesting is not supported.
pub struct TypeSystemTransaction<'ts> {
    type_system: &'ts TypeSystem,
    listener: Rc<TransactionListener>,
    committed: bool,
}

impl<'ts> TypeSystemTransaction<'ts> {
    /// Starts a transaction on `type_system`.
    pub fn begin(type_system: &'ts TypeSystem) -> EngineResult<Self> {
        if type_system.has_active_transaction() {
            return Err(EngineError::runtime_error("a type-system transaction is already active"));
        }
        type_system.set_transaction_active(true);
        let listener = Rc::new(TransactionListener {
            created: RefCell::new(Vec::new()),
        });
        type_system.add_listener(listener.clone());
        Ok(Self {
            type_system,
            listener,
            committed: false,
        })
    }

    /// The types created so far under this transaction.
    #[must_use]
    pub fn created_types(&self) -> Vec<Type> {
        self.listener.created.borrow().clone()
    }

    /// Keeps every type created under the transaction.
    pub fn commit(mut self) {
        self.listener.created.borrow_mut().clear();
        self.committed = true;
        self.finish();
    }

    /// Destroys every collected type, most recent first.
    pub fn rollback(mut self) {
        self.do_rollback();
        self.committed = true;
        self.finish();
    }

    fn do_rollback(&self) {
        let types = std::mem::take(&mut *self.listener.created.borrow_mut());
        for ty in types.into_iter().rev() {
            self.type_system.destroy(ty);
        }
    }

    fn finish(&self) {
        let listener: Rc<dyn TypeSystemListener> = self.listener.clone();
        self.type_system.remove_listener(&listener);
        self.type_system.set_transaction_active(false);
    }
}

impl Drop for TypeSystemTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.do_rollback();
            self.finish();
        }
    }
}
