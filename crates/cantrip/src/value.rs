use std::{
    any::Any,
    cell::{Cell, Ref, RefCell},
    fmt,
    rc::Rc,
};

use crate::{
    array::ArrayObject,
    closure::LambdaObject,
    enumeration::Enumerator,
    function::Function,
    initializer_list::InitializerListObject,
    types::Type,
};

/// Host-provided payload plus an optional script-visible member vector.
///
/// This is the hybrid shape: a native class can carry both a Rust payload
/// (accessed by native callbacks through downcasting) and sub-objects
/// added by script constructors.
pub(crate) struct NativeObject {
    pub payload: Box<dyn Any>,
    pub members: Vec<Value>,
}

/// The tagged payload of a value.
///
/// Fundamentals are stored inline; compound payloads own their data.
/// `Reference` aliases another value without owning it: destroying a
/// reference never touches the referent.
pub(crate) enum ValueData {
    Void,
    Bool(bool),
    Char(char),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    /// A script-defined object: its data members, in declaration order
    /// (base-class members first).
    Object(Vec<Value>),
    Native(NativeObject),
    Array(ArrayObject),
    Enumerator(Enumerator),
    Function(Function),
    Lambda(LambdaObject),
    InitializerList(InitializerListObject),
    Reference(Value),
}

pub(crate) struct ValueImpl {
    ty: Cell<Type>,
    data: RefCell<ValueData>,
}

/// A cheap, reference-counted handle to a runtime value.
///
/// Cloning the handle increments the reference count; equality is identity
/// of the underlying object. All mutation goes through interior
/// mutability, which is what gives script assignment its reference
/// semantics: every handle to a cell observes a `set_int` through any
/// other handle.
///
/// Reference counts are not atomic; sharing a `Value` across threads is
/// not possible (`Rc` is not `Send`).
#[derive(Clone)]
pub struct Value(pub(crate) Rc<ValueImpl>);

thread_local! {
    static VOID: Value = Value::make(Type::VOID, ValueData::Void);
}

impl Value {
    pub(crate) fn make(ty: Type, data: ValueData) -> Self {
        Self(Rc::new(ValueImpl {
            ty: Cell::new(ty),
            data: RefCell::new(data),
        }))
    }

    /// The distinguished void value.
    ///
    /// A per-thread singleton with a shared reference count; destroying it
    /// is a no-op. Never model it as global mutable state.
    #[must_use]
    pub fn void() -> Self {
        VOID.with(Self::clone)
    }

    #[must_use]
    pub fn bool_(v: bool) -> Self {
        Self::make(Type::BOOL, ValueData::Bool(v))
    }

    #[must_use]
    pub fn char_(v: char) -> Self {
        Self::make(Type::CHAR, ValueData::Char(v))
    }

    #[must_use]
    pub fn int(v: i32) -> Self {
        Self::make(Type::INT, ValueData::Int(v))
    }

    #[must_use]
    pub fn float(v: f32) -> Self {
        Self::make(Type::FLOAT, ValueData::Float(v))
    }

    #[must_use]
    pub fn double(v: f64) -> Self {
        Self::make(Type::DOUBLE, ValueData::Double(v))
    }

    #[must_use]
    pub fn string(v: impl Into<String>) -> Self {
        Self::make(Type::STRING, ValueData::String(v.into()))
    }

    /// An uninitialized script object of class type `ty` with no members yet.
    #[must_use]
    pub fn object(ty: Type) -> Self {
        Self::make(ty, ValueData::Object(Vec::new()))
    }

    /// A value of class type `ty` wrapping a host payload.
    #[must_use]
    pub fn native<T: Any>(ty: Type, payload: T) -> Self {
        Self::make(
            ty,
            ValueData::Native(NativeObject {
                payload: Box::new(payload),
                members: Vec::new(),
            }),
        )
    }

    #[must_use]
    pub fn array(ty: Type, array: ArrayObject) -> Self {
        Self::make(ty, ValueData::Array(array))
    }

    #[must_use]
    pub fn enumerator(e: Enumerator) -> Self {
        let ty = e.enum_type();
        Self::make(ty, ValueData::Enumerator(e))
    }

    /// Wraps a function in a value of the matching function type.
    #[must_use]
    pub fn function(ty: Type, f: Function) -> Self {
        Self::make(ty, ValueData::Function(f))
    }

    #[must_use]
    pub fn lambda(ty: Type, l: LambdaObject) -> Self {
        Self::make(ty, ValueData::Lambda(l))
    }

    #[must_use]
    pub fn initializer_list(ty: Type, list: InitializerListObject) -> Self {
        Self::make(ty, ValueData::InitializerList(list))
    }

    /// A reference value aliasing `target`. Destroying the reference never
    /// destroys the referent.
    #[must_use]
    pub fn reference(target: &Self) -> Self {
        let ty = Type::reference(target.get_type());
        Self::make(ty, ValueData::Reference(target.clone()))
    }

    #[must_use]
    pub fn get_type(&self) -> Type {
        self.0.ty.get()
    }

    pub(crate) fn set_type(&self, ty: Type) {
        self.0.ty.set(ty);
    }

    /// Number of live handles to this value.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Identity comparison, like pointer equality.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn borrow_data(&self) -> Ref<'_, ValueData> {
        self.0.data.borrow()
    }

    pub(crate) fn replace_data(&self, data: ValueData) -> ValueData {
        self.0.data.replace(data)
    }

    // --- variant predicates ---

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::Void)
    }

    #[must_use]
    pub fn is_function(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::Function(_))
    }

    #[must_use]
    pub fn is_lambda(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::Lambda(_))
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::Array(_))
    }

    #[must_use]
    pub fn is_initializer_list(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::InitializerList(_))
    }

    #[must_use]
    pub fn is_enumerator(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::Enumerator(_))
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::Reference(_))
    }

    #[must_use]
    pub fn is_string(&self) -> bool {
        matches!(&*self.borrow_data(), ValueData::String(_))
    }

    // --- fundamental accessors (forward through references) ---

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match &*self.borrow_data() {
            ValueData::Bool(v) => Some(*v),
            ValueData::Reference(v) => v.as_bool(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match &*self.borrow_data() {
            ValueData::Char(v) => Some(*v),
            ValueData::Reference(v) => v.as_char(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i32> {
        match &*self.borrow_data() {
            ValueData::Int(v) => Some(*v),
            ValueData::Reference(v) => v.as_int(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f32> {
        match &*self.borrow_data() {
            ValueData::Float(v) => Some(*v),
            ValueData::Reference(v) => v.as_float(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_double(&self) -> Option<f64> {
        match &*self.borrow_data() {
            ValueData::Double(v) => Some(*v),
            ValueData::Reference(v) => v.as_double(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_string(&self) -> Option<String> {
        match &*self.borrow_data() {
            ValueData::String(s) => Some(s.clone()),
            ValueData::Reference(v) => v.as_string(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_enumerator(&self) -> Option<Enumerator> {
        match &*self.borrow_data() {
            ValueData::Enumerator(e) => Some(e.clone()),
            ValueData::Reference(v) => v.as_enumerator(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_function(&self) -> Option<Function> {
        match &*self.borrow_data() {
            ValueData::Function(f) => Some(f.clone()),
            ValueData::Reference(v) => v.as_function(),
            _ => None,
        }
    }

    // --- fundamental mutators ---

    pub fn set_bool(&self, v: bool) {
        self.set_data_fundamental(ValueData::Bool(v));
    }

    pub fn set_char(&self, v: char) {
        self.set_data_fundamental(ValueData::Char(v));
    }

    pub fn set_int(&self, v: i32) {
        self.set_data_fundamental(ValueData::Int(v));
    }

    pub fn set_float(&self, v: f32) {
        self.set_data_fundamental(ValueData::Float(v));
    }

    pub fn set_double(&self, v: f64) {
        self.set_data_fundamental(ValueData::Double(v));
    }

    pub fn set_string(&self, v: impl Into<String>) {
        self.set_data_fundamental(ValueData::String(v.into()));
    }

    pub fn set_enumerator(&self, e: Enumerator) {
        self.set_data_fundamental(ValueData::Enumerator(e));
    }

    pub(crate) fn set_function(&self, f: Function) {
        self.set_data_fundamental(ValueData::Function(f));
    }

    fn set_data_fundamental(&self, data: ValueData) {
        let forward = match &*self.borrow_data() {
            ValueData::Reference(v) => Some(v.clone()),
            _ => None,
        };
        match forward {
            Some(target) => target.set_data_fundamental(data),
            None => {
                *self.0.data.borrow_mut() = data;
            }
        }
    }

    // --- sub-object collection (script objects and hybrids) ---

    /// Number of sub-objects held by a script object (0 for other kinds).
    #[must_use]
    pub fn member_count(&self) -> usize {
        match &*self.borrow_data() {
            ValueData::Object(members) => members.len(),
            ValueData::Native(n) => n.members.len(),
            ValueData::Reference(v) => v.member_count(),
            _ => 0,
        }
    }

    pub fn push_member(&self, member: Value) {
        let forward = match &mut *self.0.data.borrow_mut() {
            ValueData::Object(members) => {
                members.push(member);
                return;
            }
            ValueData::Native(n) => {
                n.members.push(member);
                return;
            }
            ValueData::Reference(v) => v.clone(),
            _ => return,
        };
        forward.push_member(member);
    }

    #[must_use]
    pub fn pop_member(&self) -> Option<Value> {
        let forward = match &mut *self.0.data.borrow_mut() {
            ValueData::Object(members) => return members.pop(),
            ValueData::Native(n) => return n.members.pop(),
            ValueData::Reference(v) => v.clone(),
            _ => return None,
        };
        forward.pop_member()
    }

    #[must_use]
    pub fn member_at(&self, index: usize) -> Option<Value> {
        match &*self.borrow_data() {
            ValueData::Object(members) => members.get(index).cloned(),
            ValueData::Native(n) => n.members.get(index).cloned(),
            ValueData::Reference(v) => v.member_at(index),
            _ => None,
        }
    }

    // --- native payload access ---

    /// Runs `f` over the host payload if this value wraps a `T`.
    pub fn with_native<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        match &*self.borrow_data() {
            ValueData::Native(n) => n.payload.downcast_ref::<T>().map(f),
            ValueData::Reference(v) => v.with_native(f),
            _ => None,
        }
    }

    /// Runs `f` over the host payload mutably if this value wraps a `T`.
    pub fn with_native_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let forward = match &mut *self.0.data.borrow_mut() {
            ValueData::Native(n) => return n.payload.downcast_mut::<T>().map(f),
            ValueData::Reference(v) => v.clone(),
            _ => return None,
        };
        forward.with_native_mut(f)
    }

    /// Runs `f` over the array payload, if any.
    pub fn with_array<R>(&self, f: impl FnOnce(&ArrayObject) -> R) -> Option<R> {
        match &*self.borrow_data() {
            ValueData::Array(a) => Some(f(a)),
            ValueData::Reference(v) => v.with_array(f),
            _ => None,
        }
    }

    pub fn with_array_mut<R>(&self, f: impl FnOnce(&mut ArrayObject) -> R) -> Option<R> {
        let forward = match &mut *self.0.data.borrow_mut() {
            ValueData::Array(a) => return Some(f(a)),
            ValueData::Reference(v) => v.clone(),
            _ => return None,
        };
        forward.with_array_mut(f)
    }

    pub fn with_string_mut<R>(&self, f: impl FnOnce(&mut String) -> R) -> Option<R> {
        let forward = match &mut *self.0.data.borrow_mut() {
            ValueData::String(s) => return Some(f(s)),
            ValueData::Reference(v) => v.clone(),
            _ => return None,
        };
        forward.with_string_mut(f)
    }

    pub(crate) fn with_lambda<R>(&self, f: impl FnOnce(&LambdaObject) -> R) -> Option<R> {
        match &*self.borrow_data() {
            ValueData::Lambda(l) => Some(f(l)),
            ValueData::Reference(v) => v.with_lambda(f),
            _ => None,
        }
    }

    pub(crate) fn with_initializer_list<R>(&self, f: impl FnOnce(&InitializerListObject) -> R) -> Option<R> {
        match &*self.borrow_data() {
            ValueData::InitializerList(l) => Some(f(l)),
            ValueData::Reference(v) => v.with_initializer_list(f),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.borrow_data() {
            ValueData::Void => write!(f, "Value(void)"),
            ValueData::Bool(v) => write!(f, "Value({v})"),
            ValueData::Char(v) => write!(f, "Value({v:?})"),
            ValueData::Int(v) => write!(f, "Value({v})"),
            ValueData::Float(v) => write!(f, "Value({v}f)"),
            ValueData::Double(v) => write!(f, "Value({v})"),
            ValueData::String(s) => write!(f, "Value({s:?})"),
            ValueData::Object(members) => {
                write!(f, "Value(object of {ty:?}, {n} members)", ty = self.get_type(), n = members.len())
            }
            ValueData::Native(_) => write!(f, "Value(native of {ty:?})", ty = self.get_type()),
            ValueData::Array(a) => write!(f, "Value(array, len {n})", n = a.len()),
            ValueData::Enumerator(e) => write!(f, "Value({e:?})"),
            ValueData::Function(func) => write!(f, "Value(function {name})", name = func.name()),
            ValueData::Lambda(_) => write!(f, "Value(lambda of {ty:?})", ty = self.get_type()),
            ValueData::InitializerList(l) => write!(f, "Value(initializer-list, len {n})", n = l.len()),
            ValueData::Reference(v) => write!(f, "Value(ref -> {v:?})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_is_a_shared_singleton() {
        let a = Value::void();
        let b = Value::void();
        assert!(a.same_as(&b));
        assert!(a.is_void());
        assert_eq!(a.get_type(), Type::VOID);
        assert!(a.ref_count() > 1);
    }

    #[test]
    fn cloning_increments_refcount() {
        let v = Value::int(5);
        assert_eq!(v.ref_count(), 1);
        let w = v.clone();
        assert_eq!(v.ref_count(), 2);
        assert!(v.same_as(&w));
        drop(w);
        assert_eq!(v.ref_count(), 1);
    }

    #[test]
    fn assignment_through_any_handle_is_visible() {
        let v = Value::int(1);
        let w = v.clone();
        w.set_int(42);
        assert_eq!(v.as_int(), Some(42));
    }

    #[test]
    fn references_forward_reads_and_writes() {
        let v = Value::double(1.5);
        let r = Value::reference(&v);
        assert!(r.is_reference());
        assert_eq!(r.as_double(), Some(1.5));
        r.set_double(2.5);
        assert_eq!(v.as_double(), Some(2.5));
        // Dropping the reference must not affect the referent.
        drop(r);
        assert_eq!(v.as_double(), Some(2.5));
    }

    #[test]
    fn object_member_collection() {
        let obj = Value::object(Type::object(7));
        assert_eq!(obj.member_count(), 0);
        obj.push_member(Value::int(1));
        obj.push_member(Value::int(2));
        assert_eq!(obj.member_count(), 2);
        assert_eq!(obj.member_at(0).and_then(|m| m.as_int()), Some(1));
        assert_eq!(obj.pop_member().and_then(|m| m.as_int()), Some(2));
        assert_eq!(obj.member_count(), 1);
    }

    #[test]
    fn native_payload_downcast() {
        struct Widget {
            count: u32,
        }
        let v = Value::native(Type::object(9), Widget { count: 3 });
        assert_eq!(v.with_native(|w: &Widget| w.count), Some(3));
        v.with_native_mut(|w: &mut Widget| w.count += 1);
        assert_eq!(v.with_native(|w: &Widget| w.count), Some(4));
        assert_eq!(v.with_native(|_: &String| ()), None);
    }
}
