use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use crate::{function::Function, prototype::Prototype, types::Type, value::Value};

/// A variable captured by a lambda: its type and source name.
///
/// The name `"this"` in the first slot marks a `this`-capturing lambda,
/// which gives the lambda body access to the enclosing class's data
/// members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub ty: Type,
    pub name: String,
}

impl Capture {
    #[must_use]
    pub fn new(ty: Type, name: impl Into<String>) -> Self {
        Self { ty, name: name.into() }
    }
}

pub(crate) struct ClosureTypeImpl {
    id: Cell<Type>,
    captures: Vec<Capture>,
    prototype: Prototype,
    call_operator: RefCell<Option<Function>>,
}

/// The unique class-like type synthesized for a lambda expression, with
/// the captures as members and `operator()` as its sole member function.
#[derive(Clone)]
pub struct ClosureType(pub(crate) Rc<ClosureTypeImpl>);

impl ClosureType {
    #[must_use]
    pub fn new(captures: Vec<Capture>, prototype: Prototype) -> Self {
        Self(Rc::new(ClosureTypeImpl {
            id: Cell::new(Type::NULL),
            captures,
            prototype,
            call_operator: RefCell::new(None),
        }))
    }

    #[must_use]
    pub fn id(&self) -> Type {
        self.0.id.get()
    }

    pub(crate) fn set_id(&self, id: Type) {
        self.0.id.set(id);
    }

    #[must_use]
    pub fn captures(&self) -> &[Capture] {
        &self.0.captures
    }

    #[must_use]
    pub fn capture_index(&self, name: &str) -> Option<usize> {
        self.0.captures.iter().position(|c| c.name == name)
    }

    /// True when the first capture is the enclosing object.
    #[must_use]
    pub fn captures_this(&self) -> bool {
        self.0.captures.first().is_some_and(|c| c.name == "this")
    }

    #[must_use]
    pub fn prototype(&self) -> &Prototype {
        &self.0.prototype
    }

    /// The generated `operator()`.
    #[must_use]
    pub fn call_operator(&self) -> Option<Function> {
        self.0.call_operator.borrow().clone()
    }

    pub fn set_call_operator(&self, f: Function) {
        *self.0.call_operator.borrow_mut() = Some(f);
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ClosureType {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for ClosureType {}

impl fmt::Debug for ClosureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClosureType(id {id:?}, {n} captures)",
            id = self.id(),
            n = self.captures().len()
        )
    }
}

/// The runtime payload of a lambda value: its closure type and the
/// captured values, in capture order.
#[derive(Clone)]
pub struct LambdaObject {
    closure: ClosureType,
    captures: Vec<Value>,
}

impl LambdaObject {
    #[must_use]
    pub fn new(closure: ClosureType) -> Self {
        Self {
            closure,
            captures: Vec::new(),
        }
    }

    #[must_use]
    pub fn closure_type(&self) -> &ClosureType {
        &self.closure
    }

    #[must_use]
    pub fn captures(&self) -> &[Value] {
        &self.captures
    }

    #[must_use]
    pub fn capture_at(&self, index: usize) -> Option<Value> {
        self.captures.get(index).cloned()
    }

    pub fn push_capture(&mut self, value: Value) {
        self.captures.push(value);
    }
}
