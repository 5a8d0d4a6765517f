use std::{any::Any, cell::{Cell, Ref, RefCell}, fmt, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    access::AccessSpecifier,
    class::Class,
    engine::Engine,
    error::EngineResult,
    interpreter::{self, FunctionCall},
    ir::{Expr, Stmt},
    namespace::Namespace,
    operators::OperatorId,
    prototype::Prototype,
    symbols::{EnclosingSymbol, Name, Symbol},
    template::{FunctionTemplate, TemplateArgument},
    types::Type,
    value::Value,
};

/// What a function symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Constructor,
    Destructor,
    Cast,
    Operator,
    LiteralOperator,
}

/// Declaration specifiers a function can carry, one bit each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionSpecifier {
    Static = 1,
    Explicit = 2,
    Virtual = 4,
    Pure = 8,
    ConstExpr = 16,
    Default = 32,
    Delete = 64,
}

/// Packed function flags: specifier bits in the low byte, the access
/// specifier in the bits above.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionFlags(u16);

impl FunctionFlags {
    const ACCESS_SHIFT: u16 = 8;
    const ACCESS_MASK: u16 = 0b11 << Self::ACCESS_SHIFT;

    #[must_use]
    pub fn test(self, specifier: FunctionSpecifier) -> bool {
        self.0 & (specifier as u16) != 0
    }

    pub fn set(&mut self, specifier: FunctionSpecifier) {
        self.0 |= specifier as u16;
    }

    #[must_use]
    pub fn access(self) -> AccessSpecifier {
        match (self.0 & Self::ACCESS_MASK) >> Self::ACCESS_SHIFT {
            1 => AccessSpecifier::Protected,
            2 => AccessSpecifier::Private,
            _ => AccessSpecifier::Public,
        }
    }

    pub fn set_access(&mut self, access: AccessSpecifier) {
        let bits = match access {
            AccessSpecifier::Public => 0,
            AccessSpecifier::Protected => 1,
            AccessSpecifier::Private => 2,
        };
        self.0 = (self.0 & !Self::ACCESS_MASK) | (bits << Self::ACCESS_SHIFT);
    }
}

/// Signature of native callbacks attachable to any function kind.
///
/// The callback reads its arguments from the frame and returns the result
/// value; constructors return the object they built.
pub type NativeCallback = Rc<dyn Fn(&mut FunctionCall<'_>) -> EngineResult<Value>>;

/// Links a function instance back to the template it was stamped from.
#[derive(Clone)]
pub struct TemplateInstanceInfo {
    pub template: FunctionTemplate,
    pub arguments: Vec<TemplateArgument>,
}

pub(crate) struct FunctionImpl {
    kind: FunctionKind,
    name: Name,
    prototype: RefCell<Prototype>,
    flags: Cell<FunctionFlags>,
    enclosing: RefCell<EnclosingSymbol>,
    body: RefCell<Option<Rc<Stmt>>>,
    native: RefCell<Option<NativeCallback>>,
    /// Stored in reverse order: index 0 holds the default for the *last*
    /// parameter. This makes "fill the missing tail" at call sites a
    /// simple prefix read.
    default_arguments: RefCell<Vec<Rc<Expr>>>,
    user_data: RefCell<Option<Rc<dyn Any>>>,
    template_info: RefCell<Option<TemplateInstanceInfo>>,
}

/// A function symbol: free function, constructor, destructor, conversion
/// function, operator or literal operator.
///
/// The handle is cheap to clone; equality is identity.
#[derive(Clone)]
pub struct Function(pub(crate) Rc<FunctionImpl>);

impl Function {
    pub(crate) fn from_parts(kind: FunctionKind, name: Name, prototype: Prototype, flags: FunctionFlags) -> Self {
        Self(Rc::new(FunctionImpl {
            kind,
            name,
            prototype: RefCell::new(prototype),
            flags: Cell::new(flags),
            enclosing: RefCell::new(EnclosingSymbol::None),
            body: RefCell::new(None),
            native: RefCell::new(None),
            default_arguments: RefCell::new(Vec::new()),
            user_data: RefCell::new(None),
            template_info: RefCell::new(None),
        }))
    }

    #[must_use]
    pub fn kind(&self) -> FunctionKind {
        self.0.kind
    }

    #[must_use]
    pub fn name(&self) -> Name {
        self.0.name.clone()
    }

    #[must_use]
    pub fn prototype(&self) -> Ref<'_, Prototype> {
        self.0.prototype.borrow()
    }

    #[must_use]
    pub fn return_type(&self) -> Type {
        self.prototype().return_type()
    }

    #[must_use]
    pub fn parameter(&self, index: usize) -> Option<Type> {
        self.prototype().parameter(index)
    }

    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.prototype().count()
    }

    #[must_use]
    pub fn flags(&self) -> FunctionFlags {
        self.0.flags.get()
    }

    #[must_use]
    pub fn access(&self) -> AccessSpecifier {
        self.flags().access()
    }

    #[must_use]
    pub fn is_static(&self) -> bool {
        self.flags().test(FunctionSpecifier::Static)
    }

    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.flags().test(FunctionSpecifier::Explicit)
    }

    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.flags().test(FunctionSpecifier::Virtual)
    }

    #[must_use]
    pub fn is_pure_virtual(&self) -> bool {
        self.flags().test(FunctionSpecifier::Pure)
    }

    #[must_use]
    pub fn is_defaulted(&self) -> bool {
        self.flags().test(FunctionSpecifier::Default)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.flags().test(FunctionSpecifier::Delete)
    }

    /// True for member functions whose implicit object parameter is a
    /// `const` reference.
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.implicit_object_type().is_some_and(Type::is_const)
    }

    /// The type of the implicit object parameter, if this is a non-static
    /// member function.
    #[must_use]
    pub fn implicit_object_type(&self) -> Option<Type> {
        let proto = self.prototype();
        match proto.parameter(0) {
            Some(t) if t.is_this() => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_member_function(&self) -> bool {
        self.implicit_object_type().is_some()
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.0.kind == FunctionKind::Constructor
    }

    #[must_use]
    pub fn is_destructor(&self) -> bool {
        self.0.kind == FunctionKind::Destructor
    }

    #[must_use]
    pub fn is_cast(&self) -> bool {
        self.0.kind == FunctionKind::Cast
    }

    #[must_use]
    pub fn is_operator(&self) -> bool {
        self.0.kind == FunctionKind::Operator
    }

    #[must_use]
    pub fn operator_id(&self) -> Option<OperatorId> {
        self.0.name.operator_id()
    }

    /// The target type of a conversion function.
    #[must_use]
    pub fn cast_target(&self) -> Option<Type> {
        self.0.name.cast_target()
    }

    /// The source type of a conversion function: its implicit object
    /// parameter, stripped of `this`-ness.
    #[must_use]
    pub fn cast_source(&self) -> Option<Type> {
        if self.is_cast() {
            self.parameter(0).map(|t| t.without_flag(Type::THIS_FLAG))
        } else {
            None
        }
    }

    /// A constructor with only the implicit object parameter.
    #[must_use]
    pub fn is_default_constructor(&self) -> bool {
        self.is_constructor() && self.parameter_count() == 1
    }

    /// A constructor taking `cref(Class)` as its only real parameter.
    #[must_use]
    pub fn is_copy_constructor(&self) -> bool {
        self.is_constructor()
            && self.parameter_count() == 2
            && self.member_of().is_some_and(|class| {
                self.parameter(1)
                    .is_some_and(|p| p.base() == class.id() && p.is_const_ref() && !p.is_forwarding_reference())
            })
    }

    /// A constructor taking `rref(Class)` as its only real parameter.
    #[must_use]
    pub fn is_move_constructor(&self) -> bool {
        self.is_constructor()
            && self.parameter_count() == 2
            && self.member_of().is_some_and(|class| {
                self.parameter(1)
                    .is_some_and(|p| p.base() == class.id() && p.is_forwarding_reference())
            })
    }

    #[must_use]
    pub fn enclosing_symbol(&self) -> Option<Symbol> {
        self.0.enclosing.borrow().resolve()
    }

    pub(crate) fn set_enclosing_symbol(&self, enclosing: EnclosingSymbol) {
        *self.0.enclosing.borrow_mut() = enclosing;
    }

    /// The class this function is a member of, if any.
    #[must_use]
    pub fn member_of(&self) -> Option<Class> {
        match self.enclosing_symbol() {
            Some(Symbol::Class(c)) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn enclosing_namespace(&self) -> Option<Namespace> {
        match self.enclosing_symbol() {
            Some(Symbol::Namespace(ns)) => Some(ns),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_native(&self) -> bool {
        self.0.native.borrow().is_some()
    }

    #[must_use]
    pub fn body(&self) -> Option<Rc<Stmt>> {
        self.0.body.borrow().clone()
    }

    /// Attaches a script IR body, replacing any native callback.
    pub fn set_body(&self, body: Rc<Stmt>) {
        *self.0.body.borrow_mut() = Some(body);
        *self.0.native.borrow_mut() = None;
    }

    #[must_use]
    pub(crate) fn native_callback(&self) -> Option<NativeCallback> {
        self.0.native.borrow().clone()
    }

    /// Attaches a native callback, replacing any script body.
    pub fn set_native_callback(&self, callback: NativeCallback) {
        *self.0.native.borrow_mut() = Some(callback);
        *self.0.body.borrow_mut() = None;
    }

    /// The default-argument expressions, reversed: index 0 is the default
    /// for the last parameter.
    #[must_use]
    pub fn default_arguments(&self) -> Vec<Rc<Expr>> {
        self.0.default_arguments.borrow().clone()
    }

    #[must_use]
    pub fn default_argument_count(&self) -> usize {
        self.0.default_arguments.borrow().len()
    }

    pub fn set_default_arguments(&self, reversed: Vec<Rc<Expr>>) {
        *self.0.default_arguments.borrow_mut() = reversed;
    }

    /// Marks the function static, stripping the implicit object parameter
    /// if it has one.
    pub fn set_static(&self) {
        let mut flags = self.flags();
        flags.set(FunctionSpecifier::Static);
        self.0.flags.set(flags);
        let mut proto = self.0.prototype.borrow_mut();
        if proto.parameter(0).is_some_and(Type::is_this) {
            proto.remove_front();
        }
    }

    pub(crate) fn force_virtual(&self) {
        let mut flags = self.flags();
        flags.set(FunctionSpecifier::Virtual);
        self.0.flags.set(flags);
    }

    #[must_use]
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.0.user_data.borrow().clone()
    }

    pub fn set_user_data(&self, data: Rc<dyn Any>) {
        *self.0.user_data.borrow_mut() = Some(data);
    }

    #[must_use]
    pub fn template_instance_info(&self) -> Option<TemplateInstanceInfo> {
        self.0.template_info.borrow().clone()
    }

    #[must_use]
    pub fn instance_of(&self) -> Option<FunctionTemplate> {
        self.0.template_info.borrow().as_ref().map(|info| info.template.clone())
    }

    #[must_use]
    pub fn template_arguments(&self) -> Vec<TemplateArgument> {
        self.0
            .template_info
            .borrow()
            .as_ref()
            .map(|info| info.arguments.clone())
            .unwrap_or_default()
    }

    pub(crate) fn set_template_instance_info(&self, info: TemplateInstanceInfo) {
        *self.0.template_info.borrow_mut() = Some(info);
    }

    /// Identity comparison.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Invokes the function through the engine's interpreter.
    ///
    /// For member functions the object must be the first argument; for
    /// constructors pass a leading placeholder (e.g. `Value::void()`).
    pub fn invoke(&self, engine: &Engine, args: &[Value]) -> EngineResult<Value> {
        interpreter::invoke(engine, self, args)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Function {}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Function({kind} {name} {proto:?})",
            kind = self.kind(),
            name = self.name(),
            proto = self.prototype()
        )
    }
}

/// Fluent construction of [`Function`] symbols.
///
/// The builder produces an unregistered function; registration happens
/// through `Namespace::add_function` or the `Class` registration methods,
/// which also insert the implicit object parameter for non-static members.
#[derive(Clone)]
pub struct FunctionBuilder {
    kind: FunctionKind,
    name: Name,
    prototype: Prototype,
    flags: FunctionFlags,
    native: Option<NativeCallback>,
    body: Option<Rc<Stmt>>,
    default_arguments: Vec<Rc<Expr>>,
    const_member: bool,
}

impl FunctionBuilder {
    fn new(kind: FunctionKind, name: Name) -> Self {
        Self {
            kind,
            name,
            prototype: Prototype::new(Type::VOID),
            flags: FunctionFlags::default(),
            native: None,
            body: None,
            default_arguments: Vec::new(),
            const_member: false,
        }
    }

    #[must_use]
    pub fn function(name: impl Into<Name>) -> Self {
        Self::new(FunctionKind::Function, name.into())
    }

    #[must_use]
    pub fn constructor() -> Self {
        Self::new(FunctionKind::Constructor, Name::String(String::new()))
    }

    #[must_use]
    pub fn destructor() -> Self {
        Self::new(FunctionKind::Destructor, Name::String(String::new()))
    }

    #[must_use]
    pub fn cast(target: Type) -> Self {
        let mut b = Self::new(FunctionKind::Cast, Name::Cast(target));
        b.prototype.set_return_type(target);
        b
    }

    #[must_use]
    pub fn operator(op: OperatorId) -> Self {
        Self::new(FunctionKind::Operator, Name::Operator(op))
    }

    #[must_use]
    pub fn literal_operator(suffix: impl Into<String>) -> Self {
        Self::new(FunctionKind::LiteralOperator, Name::LiteralOperator(suffix.into()))
    }

    #[must_use]
    pub fn returns(mut self, ty: Type) -> Self {
        self.prototype.set_return_type(ty);
        self
    }

    #[must_use]
    pub fn param(mut self, ty: Type) -> Self {
        self.prototype.push(ty);
        self
    }

    #[must_use]
    pub fn params(mut self, types: impl IntoIterator<Item = Type>) -> Self {
        for ty in types {
            self.prototype.push(ty);
        }
        self
    }

    #[must_use]
    pub fn callback(mut self, callback: impl Fn(&mut FunctionCall<'_>) -> EngineResult<Value> + 'static) -> Self {
        self.native = Some(Rc::new(callback));
        self
    }

    #[must_use]
    pub fn body(mut self, body: Rc<Stmt>) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn static_(mut self) -> Self {
        self.flags.set(FunctionSpecifier::Static);
        self
    }

    #[must_use]
    pub fn explicit_(mut self) -> Self {
        self.flags.set(FunctionSpecifier::Explicit);
        self
    }

    #[must_use]
    pub fn virtual_(mut self) -> Self {
        self.flags.set(FunctionSpecifier::Virtual);
        self
    }

    #[must_use]
    pub fn pure_(mut self) -> Self {
        self.flags.set(FunctionSpecifier::Virtual);
        self.flags.set(FunctionSpecifier::Pure);
        self
    }

    #[must_use]
    pub fn defaulted(mut self) -> Self {
        self.flags.set(FunctionSpecifier::Default);
        self
    }

    #[must_use]
    pub fn deleted(mut self) -> Self {
        self.flags.set(FunctionSpecifier::Delete);
        self
    }

    /// Makes the implicit object parameter const when the function is
    /// registered on a class.
    #[must_use]
    pub fn const_(mut self) -> Self {
        self.const_member = true;
        self
    }

    #[must_use]
    pub fn access(mut self, access: AccessSpecifier) -> Self {
        self.flags.set_access(access);
        self
    }

    /// Appends a default-argument expression for the next-to-last declared
    /// parameter; call in reverse declaration order.
    #[must_use]
    pub fn default_argument(mut self, expr: Rc<Expr>) -> Self {
        self.default_arguments.push(expr);
        self
    }

    #[must_use]
    pub(crate) fn is_const_member(&self) -> bool {
        self.const_member
    }

    #[must_use]
    pub(crate) fn is_static_builder(&self) -> bool {
        self.flags.test(FunctionSpecifier::Static)
    }

    #[must_use]
    pub(crate) fn kind_of(&self) -> FunctionKind {
        self.kind
    }

    /// Inserts the implicit object parameter at position 0.
    pub(crate) fn insert_this_param(&mut self, class_id: Type) {
        let this_ty = if self.const_member {
            Type::const_reference(class_id).with_this_flag()
        } else {
            Type::reference(class_id).with_this_flag()
        };
        self.prototype.insert_front(this_ty);
    }

    /// Builds the function symbol without registering it anywhere.
    #[must_use]
    pub fn build(self) -> Function {
        let f = Function::from_parts(self.kind, self.name, self.prototype, self.flags);
        if let Some(native) = self.native {
            *f.0.native.borrow_mut() = Some(native);
        }
        if let Some(body) = self.body {
            *f.0.body.borrow_mut() = Some(body);
        }
        *f.0.default_arguments.borrow_mut() = self.default_arguments;
        f
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_pack_access_and_specifiers() {
        let mut flags = FunctionFlags::default();
        flags.set(FunctionSpecifier::Virtual);
        flags.set_access(AccessSpecifier::Private);
        assert!(flags.test(FunctionSpecifier::Virtual));
        assert!(!flags.test(FunctionSpecifier::Static));
        assert_eq!(flags.access(), AccessSpecifier::Private);
        flags.set_access(AccessSpecifier::Public);
        assert!(flags.test(FunctionSpecifier::Virtual));
        assert_eq!(flags.access(), AccessSpecifier::Public);
    }

    #[test]
    fn set_static_strips_this_parameter() {
        let f = FunctionBuilder::function("size")
            .returns(Type::INT)
            .param(Type::const_reference(Type::STRING).with_this_flag())
            .build();
        assert!(f.is_member_function());
        assert!(f.is_const());
        f.set_static();
        assert!(f.is_static());
        assert!(!f.is_member_function());
        assert_eq!(f.parameter_count(), 0);
    }

    #[test]
    fn builder_sets_kind_and_prototype() {
        let f = FunctionBuilder::operator(OperatorId::Addition)
            .returns(Type::INT)
            .params([Type::INT, Type::INT])
            .build();
        assert!(f.is_operator());
        assert_eq!(f.operator_id(), Some(OperatorId::Addition));
        assert_eq!(f.parameter_count(), 2);
        assert_eq!(f.return_type(), Type::INT);
        assert!(!f.is_native());
    }
}
