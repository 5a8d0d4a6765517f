use std::{cell::Cell, fmt, rc::Rc};

use crate::{function::Function, prototype::Prototype, types::Type};

pub(crate) struct FunctionTypeImpl {
    id: Cell<Type>,
    prototype: Prototype,
    assignment: Function,
}

/// A first-class function type: a prototype plus the generated binary
/// assignment operator over values of that type.
///
/// Function types are deduplicated by prototype equality through
/// `TypeSystem::function_type_for`.
#[derive(Clone)]
pub struct FunctionType(pub(crate) Rc<FunctionTypeImpl>);

impl FunctionType {
    pub(crate) fn new(prototype: Prototype, assignment: Function) -> Self {
        Self(Rc::new(FunctionTypeImpl {
            id: Cell::new(Type::NULL),
            prototype,
            assignment,
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
    pub fn prototype(&self) -> &Prototype {
        &self.0.prototype
    }

    /// The generated assignment operator; its native body copies the
    /// wrapped function.
    #[must_use]
    pub fn assignment_operator(&self) -> Function {
        self.0.assignment.clone()
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for FunctionType {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for FunctionType {}

impl fmt::Debug for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FunctionType(id {id:?}, {proto:?})",
            id = self.id(),
            proto = self.prototype()
        )
    }
}
