use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::{
    function::{Function, FunctionBuilder},
    operators::OperatorId,
    symbols::EnclosingSymbol,
    types::Type,
    value::Value,
};

pub(crate) struct EnumImpl {
    id: Cell<Type>,
    name: String,
    enum_class: bool,
    values: RefCell<IndexMap<String, i32>>,
    enclosing: RefCell<EnclosingSymbol>,
    from_int_constructor: RefCell<Option<Function>>,
    copy_constructor: RefCell<Option<Function>>,
    assignment: RefCell<Option<Function>>,
}

/// An enumeration: a unique-string → int map of values, plus the
/// synthesized int-constructor, copy constructor and assignment operator.
#[derive(Clone)]
pub struct Enum(pub(crate) Rc<EnumImpl>);

/// Weak counterpart of [`Enum`].
#[derive(Clone)]
pub struct WeakEnum(Weak<EnumImpl>);

impl WeakEnum {
    #[must_use]
    pub fn upgrade(&self) -> Option<Enum> {
        self.0.upgrade().map(Enum)
    }
}

impl Enum {
    pub(crate) fn from_builder(builder: &EnumBuilder) -> Self {
        Self(Rc::new(EnumImpl {
            id: Cell::new(Type::NULL),
            name: builder.name.clone(),
            enum_class: builder.enum_class,
            values: RefCell::new(builder.values.clone()),
            enclosing: RefCell::new(builder.enclosing.clone()),
            from_int_constructor: RefCell::new(None),
            copy_constructor: RefCell::new(None),
            assignment: RefCell::new(None),
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
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// True for scoped enums (`enum class`), whose keys are not injected
    /// into the enclosing scope.
    #[must_use]
    pub fn is_enum_class(&self) -> bool {
        self.0.enum_class
    }

    #[must_use]
    pub fn values(&self) -> IndexMap<String, i32> {
        self.0.values.borrow().clone()
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.0.values.borrow().contains_key(key)
    }

    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<i32> {
        self.0.values.borrow().get(key).copied()
    }

    /// The key mapping to `value`, if any.
    #[must_use]
    pub fn key_of(&self, value: i32) -> Option<String> {
        self.0
            .values
            .borrow()
            .iter()
            .find_map(|(k, v)| (*v == value).then(|| k.clone()))
    }

    pub fn add_value(&self, key: impl Into<String>, value: i32) {
        self.0.values.borrow_mut().insert(key.into(), value);
    }

    #[must_use]
    pub fn enclosing_symbol(&self) -> Option<crate::symbols::Symbol> {
        self.0.enclosing.borrow().resolve()
    }

    pub(crate) fn set_enclosing_symbol(&self, enclosing: EnclosingSymbol) {
        *self.0.enclosing.borrow_mut() = enclosing;
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakEnum {
        WeakEnum(Rc::downgrade(&self.0))
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// The synthesized implicit int→enum constructor.
    #[must_use]
    pub fn from_int_constructor(&self) -> Option<Function> {
        self.0.from_int_constructor.borrow().clone()
    }

    #[must_use]
    pub fn copy_constructor(&self) -> Option<Function> {
        self.0.copy_constructor.borrow().clone()
    }

    #[must_use]
    pub fn assignment_operator(&self) -> Option<Function> {
        self.0.assignment.borrow().clone()
    }

    /// Synthesizes the implicit member functions. Called by the type
    /// system right after the id is assigned.
    pub(crate) fn synthesize_members(&self) {
        let id = self.id();

        let enum_for_ctor = self.clone();
        let from_int = FunctionBuilder::constructor()
            .returns(id)
            .param(Type::reference(id).with_this_flag())
            .param(Type::INT)
            .callback(move |call| {
                let raw = call.arg(1).as_int().unwrap_or_default();
                Ok(Value::enumerator(Enumerator::new(enum_for_ctor.clone(), raw)))
            })
            .build();
        *self.0.from_int_constructor.borrow_mut() = Some(from_int);

        let enum_for_copy = self.clone();
        let copy = FunctionBuilder::constructor()
            .returns(id)
            .param(Type::reference(id).with_this_flag())
            .param(Type::const_reference(id))
            .callback(move |call| {
                let src = call.arg(1);
                let raw = src.as_enumerator().map_or(0, |e| e.value());
                Ok(Value::enumerator(Enumerator::new(enum_for_copy.clone(), raw)))
            })
            .build();
        *self.0.copy_constructor.borrow_mut() = Some(copy);

        let assign = FunctionBuilder::operator(OperatorId::Assignment)
            .returns(Type::reference(id))
            .param(Type::reference(id).with_this_flag())
            .param(Type::const_reference(id))
            .callback(|call| {
                let dest = call.arg(0);
                let src = call.arg(1);
                if let Some(e) = src.as_enumerator() {
                    dest.set_enumerator(e);
                }
                Ok(dest)
            })
            .build();
        *self.0.assignment.borrow_mut() = Some(assign);
    }

    pub(crate) fn clear_members(&self) {
        self.0.values.borrow_mut().clear();
        *self.0.from_int_constructor.borrow_mut() = None;
        *self.0.copy_constructor.borrow_mut() = None;
        *self.0.assignment.borrow_mut() = None;
    }
}

impl PartialEq for Enum {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Enum {}

impl fmt::Debug for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Enum({name}, id {id:?})", name = self.name(), id = self.id())
    }
}

/// A single enum value: the enum it belongs to plus the raw integer.
#[derive(Clone)]
pub struct Enumerator {
    enum_: Enum,
    value: i32,
}

impl Enumerator {
    #[must_use]
    pub fn new(enum_: Enum, value: i32) -> Self {
        Self { enum_, value }
    }

    #[must_use]
    pub fn enumeration(&self) -> &Enum {
        &self.enum_
    }

    #[must_use]
    pub fn enum_type(&self) -> Type {
        self.enum_.id()
    }

    #[must_use]
    pub fn value(&self) -> i32 {
        self.value
    }

    /// The declared key for this value, if the value is named.
    #[must_use]
    pub fn key(&self) -> Option<String> {
        self.enum_.key_of(self.value)
    }
}

impl PartialEq for Enumerator {
    fn eq(&self, other: &Self) -> bool {
        self.enum_.same_as(&other.enum_) && self.value == other.value
    }
}

impl Eq for Enumerator {}

impl fmt::Debug for Enumerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{name}::{key}", name = self.enum_.name()),
            None => write!(f, "{name}({value})", name = self.enum_.name(), value = self.value),
        }
    }
}

/// Fluent description of an enum to be registered in the type system.
#[derive(Clone)]
pub struct EnumBuilder {
    pub(crate) name: String,
    pub(crate) enum_class: bool,
    pub(crate) values: IndexMap<String, i32>,
    next_value: i32,
    pub(crate) enclosing: EnclosingSymbol,
    pub(crate) reserved_id: Option<Type>,
}

impl EnumBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enum_class: false,
            values: IndexMap::new(),
            next_value: 0,
            enclosing: EnclosingSymbol::None,
            reserved_id: None,
        }
    }

    #[must_use]
    pub fn enum_class(mut self) -> Self {
        self.enum_class = true;
        self
    }

    /// Adds a key with the next implicit value.
    #[must_use]
    pub fn value(mut self, key: impl Into<String>) -> Self {
        let v = self.next_value;
        self.next_value += 1;
        self.values.insert(key.into(), v);
        self
    }

    /// Adds a key with an explicit value; subsequent implicit values
    /// continue from it.
    #[must_use]
    pub fn value_with(mut self, key: impl Into<String>, value: i32) -> Self {
        self.next_value = value + 1;
        self.values.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn enclosing(mut self, enclosing: EnclosingSymbol) -> Self {
        self.enclosing = enclosing;
        self
    }

    #[must_use]
    pub fn with_reserved_id(mut self, id: Type) -> Self {
        self.reserved_id = Some(id);
        self
    }
}
