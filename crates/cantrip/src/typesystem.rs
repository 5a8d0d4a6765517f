use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use crate::{
    class::{Class, ClassBuilder},
    closure::ClosureType,
    enumeration::{Enum, EnumBuilder},
    error::{EngineError, EngineResult},
    function::FunctionBuilder,
    function_type::FunctionType,
    operators::OperatorId,
    prototype::Prototype,
    symbols::Symbol,
    types::{Type, TypeKind},
};

/// Observes type creation and destruction.
///
/// Each listener sees `created` exactly once per successful registration
/// and `destroyed` exactly once per unregistration.
pub trait TypeSystemListener {
    fn created(&self, ty: Type);
    fn destroyed(&self, ty: Type);
}

/// The type registry: four parallel tables indexed by the low bits of a
/// type id, one per kind.
///
/// Slots can be reserved ahead of registration to obtain a contiguous
/// range of pending ids for forward references.
pub struct TypeSystem {
    classes: RefCell<Vec<Option<Class>>>,
    enums: RefCell<Vec<Option<Enum>>>,
    closures: RefCell<Vec<Option<ClosureType>>>,
    function_types: RefCell<Vec<Option<FunctionType>>>,
    listeners: RefCell<Vec<Rc<dyn TypeSystemListener>>>,
    transaction_active: Cell<bool>,
}

impl TypeSystem {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            classes: RefCell::new(Vec::new()),
            enums: RefCell::new(Vec::new()),
            closures: RefCell::new(Vec::new()),
            function_types: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            transaction_active: Cell::new(false),
        }
    }

    /// True iff `ty`'s slot is populated (fundamentals always exist).
    #[must_use]
    pub fn exists(&self, ty: Type) -> bool {
        if ty.is_null() {
            return false;
        }
        match ty.kind() {
            TypeKind::Fundamental => ty.is_fundamental() || ty.base() == Type::INITIALIZER_LIST,
            TypeKind::Object => slot_occupied(&self.classes.borrow(), ty),
            TypeKind::Enum => slot_occupied(&self.enums.borrow(), ty),
            TypeKind::Closure => slot_occupied(&self.closures.borrow(), ty),
            TypeKind::FunctionType => slot_occupied(&self.function_types.borrow(), ty),
        }
    }

    /// The class registered for `ty`, or `None` for a wrong kind or an
    /// empty slot. Never panics.
    #[must_use]
    pub fn get_class(&self, ty: Type) -> Option<Class> {
        if !ty.is_object() {
            return None;
        }
        slot_get(&self.classes.borrow(), ty)
    }

    #[must_use]
    pub fn get_enum(&self, ty: Type) -> Option<Enum> {
        if !ty.is_enum() {
            return None;
        }
        slot_get(&self.enums.borrow(), ty)
    }

    #[must_use]
    pub fn get_closure_type(&self, ty: Type) -> Option<ClosureType> {
        if !ty.is_closure() {
            return None;
        }
        slot_get(&self.closures.borrow(), ty)
    }

    #[must_use]
    pub fn get_function_type(&self, ty: Type) -> Option<FunctionType> {
        if !ty.is_function_type() {
            return None;
        }
        slot_get(&self.function_types.borrow(), ty)
    }

    /// Reserves `count` contiguous pending slots of the given kind and
    /// returns the first reserved id. Later registrations passed a
    /// reserved id complete the reservation.
    pub fn reserve(&self, kind: TypeKind, count: usize) -> Type {
        let make = |index: usize| match kind {
            TypeKind::Object => Type::object(index as u32),
            TypeKind::Enum => Type::enumeration(index as u32),
            TypeKind::Closure => Type::closure(index as u32),
            TypeKind::FunctionType => Type::function_type(index as u32),
            TypeKind::Fundamental => Type::NULL,
        };
        let first = match kind {
            TypeKind::Object => reserve_slots(&mut self.classes.borrow_mut(), count),
            TypeKind::Enum => reserve_slots(&mut self.enums.borrow_mut(), count),
            TypeKind::Closure => reserve_slots(&mut self.closures.borrow_mut(), count),
            TypeKind::FunctionType => reserve_slots(&mut self.function_types.borrow_mut(), count),
            TypeKind::Fundamental => return Type::NULL,
        };
        make(first)
    }

    /// Registers a class described by `builder` and returns its handle.
    ///
    /// The base class, if any, must already be registered. The class is
    /// also recorded in its enclosing symbol, when the builder names one.
    pub fn register_class(&self, builder: ClassBuilder) -> EngineResult<Class> {
        if let Some(base) = &builder.base {
            if !self.exists(base.id()) {
                return Err(EngineError::unknown_type(base.id()));
            }
        }

        let reserved = builder.reserved_id;
        let enclosing = builder.enclosing.clone();
        let class = Class::from_builder(&builder);

        let id = {
            let mut classes = self.classes.borrow_mut();
            let index = claim_slot(&mut classes, reserved)?;
            let id = Type::object(index as u32);
            classes[index - 1] = Some(class.clone());
            id
        };
        class.set_id(id);

        match enclosing.resolve() {
            Some(Symbol::Namespace(ns)) => ns.add_class(class.clone()),
            Some(Symbol::Class(outer)) => outer.add_nested_class(class.clone()),
            None => {}
        }

        self.notify_created(id);
        Ok(class)
    }

    /// Registers an enum described by `builder`, synthesizing its implicit
    /// member functions.
    pub fn register_enum(&self, builder: EnumBuilder) -> EngineResult<Enum> {
        let reserved = builder.reserved_id;
        let enclosing = builder.enclosing.clone();
        let e = Enum::from_builder(&builder);

        let id = {
            let mut enums = self.enums.borrow_mut();
            let index = claim_slot(&mut enums, reserved)?;
            let id = Type::enumeration(index as u32);
            enums[index - 1] = Some(e.clone());
            id
        };
        e.set_id(id);
        e.synthesize_members();

        match enclosing.resolve() {
            Some(Symbol::Namespace(ns)) => ns.add_enum(e.clone()),
            Some(Symbol::Class(outer)) => outer.add_nested_enum(e.clone()),
            None => {}
        }

        self.notify_created(id);
        Ok(e)
    }

    /// Registers a closure type, assigning it an id.
    pub fn register_closure_type(&self, closure: ClosureType) -> EngineResult<Type> {
        let id = {
            let mut closures = self.closures.borrow_mut();
            let index = claim_slot(&mut closures, None)?;
            let id = Type::closure(index as u32);
            closures[index - 1] = Some(closure.clone());
            id
        };
        closure.set_id(id);
        self.notify_created(id);
        Ok(id)
    }

    /// Returns the function type whose prototype equals `prototype`,
    /// creating it (and its assignment operator) on first request.
    pub fn function_type_for(&self, prototype: &Prototype) -> FunctionType {
        if let Some(existing) = self
            .function_types
            .borrow()
            .iter()
            .flatten()
            .find(|ft| ft.prototype() == prototype)
        {
            return existing.clone();
        }

        let index = self.function_types.borrow().len() + 1;
        let id = Type::function_type(index as u32);

        // The assignment operator's native body copies the wrapped
        // function from the right operand into the left one.
        let assignment = FunctionBuilder::operator(OperatorId::Assignment)
            .returns(Type::reference(id))
            .params([Type::reference(id), Type::const_reference(id)])
            .callback(|call| {
                let dest = call.arg(0);
                let src = call.arg(1);
                if let Some(f) = src.as_function() {
                    dest.set_function(f);
                }
                Ok(dest)
            })
            .build();

        let ft = FunctionType::new(prototype.clone(), assignment);
        ft.set_id(id);
        self.function_types.borrow_mut().push(Some(ft.clone()));
        self.notify_created(id);
        ft
    }

    /// Unregisters `ty`, cascading through the symbol's children.
    pub fn destroy(&self, ty: Type) {
        match ty.kind() {
            TypeKind::Object => {
                let Some(class) = self.get_class(ty) else { return };
                for nested in class.nested_class_ids() {
                    self.destroy(nested);
                }
                for nested in class.nested_enum_ids() {
                    self.destroy(nested);
                }
                class.clear_members();
                slot_clear(&mut self.classes.borrow_mut(), ty);
                self.notify_destroyed(ty);
            }
            TypeKind::Enum => {
                let Some(e) = self.get_enum(ty) else { return };
                e.clear_members();
                slot_clear(&mut self.enums.borrow_mut(), ty);
                self.notify_destroyed(ty);
            }
            TypeKind::Closure => {
                if slot_occupied(&self.closures.borrow(), ty) {
                    slot_clear(&mut self.closures.borrow_mut(), ty);
                    self.notify_destroyed(ty);
                }
            }
            TypeKind::FunctionType => {
                if slot_occupied(&self.function_types.borrow(), ty) {
                    slot_clear(&mut self.function_types.borrow_mut(), ty);
                    self.notify_destroyed(ty);
                }
            }
            TypeKind::Fundamental => {}
        }
    }

    pub fn add_listener(&self, listener: Rc<dyn TypeSystemListener>) {
        self.listeners.borrow_mut().push(listener);
    }

    pub fn remove_listener(&self, listener: &Rc<dyn TypeSystemListener>) {
        self.listeners.borrow_mut().retain(|l| !Rc::ptr_eq(l, listener));
    }

    fn notify_created(&self, ty: Type) {
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener.created(ty);
        }
    }

    fn notify_destroyed(&self, ty: Type) {
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener.destroyed(ty);
        }
    }

    #[must_use]
    pub fn has_active_transaction(&self) -> bool {
        self.transaction_active.get()
    }

    pub(crate) fn set_transaction_active(&self, active: bool) {
        self.transaction_active.set(active);
    }
}

fn slot_occupied<T>(slots: &[Option<T>], ty: Type) -> bool {
    let index = ty.index();
    index >= 1 && slots.get(index - 1).is_some_and(Option::is_some)
}

fn slot_get<T: Clone>(slots: &[Option<T>], ty: Type) -> Option<T> {
    let index = ty.index();
    if index == 0 {
        return None;
    }
    slots.get(index - 1).and_then(Clone::clone)
}

fn slot_clear<T>(slots: &mut [Option<T>], ty: Type) {
    let index = ty.index();
    if index >= 1 && index <= slots.len() {
        slots[index - 1] = None;
    }
}

fn reserve_slots<T>(slots: &mut Vec<Option<T>>, count: usize) -> usize {
    let first = slots.len() + 1;
    for _ in 0..count {
        slots.push(None);
    }
    first
}

/// Claims a slot: either the reserved one (which must be pending) or a
/// fresh one at the end of the table. Returns the 1-based index.
fn claim_slot<T>(slots: &mut Vec<Option<T>>, reserved: Option<Type>) -> EngineResult<usize> {
    match reserved {
        Some(ty) => {
            let index = ty.index();
            if index == 0 || index > slots.len() {
                return Err(EngineError::unknown_type(ty));
            }
            if slots[index - 1].is_some() {
                return Err(EngineError::runtime_error(format!(
                    "type slot {index} is already occupied"
                )));
            }
            Ok(index)
        }
        None => {
            slots.push(None);
            Ok(slots.len())
        }
    }
}
