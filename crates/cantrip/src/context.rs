use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::value::Value;

pub(crate) struct ContextImpl {
    name: String,
    vars: RefCell<IndexMap<String, Value>>,
}

/// A named evaluation context: the variables bound by successive `eval`
/// calls against it.
#[derive(Clone)]
pub struct Context(Rc<ContextImpl>);

impl Context {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(ContextImpl {
            name: name.into(),
            vars: RefCell::new(IndexMap::new()),
        }))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn add_var(&self, name: impl Into<String>, value: Value) {
        self.0.vars.borrow_mut().insert(name.into(), value);
    }

    #[must_use]
    pub fn get_var(&self, name: &str) -> Option<Value> {
        self.0.vars.borrow().get(name).cloned()
    }

    #[must_use]
    pub fn vars(&self) -> IndexMap<String, Value> {
        self.0.vars.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.vars.borrow_mut().clear();
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Context({name}, {n} vars)",
            name = self.name(),
            n = self.0.vars.borrow().len()
        )
    }
}
