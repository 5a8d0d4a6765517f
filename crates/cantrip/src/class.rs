use std::{
    any::Any,
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::{
    access::AccessSpecifier,
    enumeration::Enum,
    function::{Function, FunctionBuilder, FunctionKind},
    symbols::EnclosingSymbol,
    template::{ClassTemplate, FunctionTemplate, TemplateArgument},
    types::Type,
    value::Value,
};

/// A non-static data member: its type (with the access specifier packed
/// in the type's access bits) and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMember {
    pub ty: Type,
    pub name: String,
}

impl DataMember {
    #[must_use]
    pub fn new(ty: Type, name: impl Into<String>) -> Self {
        Self { ty, name: name.into() }
    }

    #[must_use]
    pub fn access(&self) -> AccessSpecifier {
        self.ty.access_specifier()
    }
}

/// A static data member: a shared value plus its access level.
#[derive(Debug, Clone)]
pub struct StaticDataMember {
    pub ty: Type,
    pub value: Value,
}

impl StaticDataMember {
    #[must_use]
    pub fn access(&self) -> AccessSpecifier {
        self.ty.access_specifier()
    }
}

/// Links a template instance class back to the template that produced it.
#[derive(Clone)]
pub struct ClassTemplateInstanceInfo {
    pub template: ClassTemplate,
    pub arguments: Vec<TemplateArgument>,
}

pub(crate) struct ClassImpl {
    id: Cell<Type>,
    name: String,
    parent: RefCell<Option<WeakClass>>,
    final_: bool,
    enclosing: RefCell<EnclosingSymbol>,
    data_members: RefCell<Vec<DataMember>>,
    static_members: RefCell<IndexMap<String, StaticDataMember>>,
    constructors: RefCell<Vec<Function>>,
    default_constructor: RefCell<Option<Function>>,
    copy_constructor: RefCell<Option<Function>>,
    move_constructor: RefCell<Option<Function>>,
    destructor: RefCell<Option<Function>>,
    functions: RefCell<Vec<Function>>,
    operators: RefCell<Vec<Function>>,
    casts: RefCell<Vec<Function>>,
    classes: RefCell<Vec<Class>>,
    enums: RefCell<Vec<Enum>>,
    class_templates: RefCell<Vec<ClassTemplate>>,
    function_templates: RefCell<Vec<FunctionTemplate>>,
    typedefs: RefCell<IndexMap<String, Type>>,
    friend_functions: RefCell<Vec<Function>>,
    friend_classes: RefCell<Vec<WeakClass>>,
    virtual_members: RefCell<Vec<Function>>,
    is_abstract: Cell<bool>,
    user_data: RefCell<Option<Rc<dyn Any>>>,
    template_info: RefCell<Option<ClassTemplateInstanceInfo>>,
}

/// A class: identifier, name, optional base class, members, virtual table.
///
/// The handle is cheap to clone; equality is identity. Classes own their
/// nested symbols by strong handles; the enclosing-symbol back-pointer is
/// weak.
#[derive(Clone)]
pub struct Class(pub(crate) Rc<ClassImpl>);

/// Weak counterpart of [`Class`], used for back-pointers.
#[derive(Clone)]
pub struct WeakClass(Weak<ClassImpl>);

impl WeakClass {
    #[must_use]
    pub fn upgrade(&self) -> Option<Class> {
        self.0.upgrade().map(Class)
    }
}

impl Class {
    pub(crate) fn from_builder(builder: &ClassBuilder) -> Self {
        let class = Self(Rc::new(ClassImpl {
            id: Cell::new(Type::NULL),
            name: builder.name.clone(),
            parent: RefCell::new(None),
            final_: builder.final_,
            enclosing: RefCell::new(builder.enclosing.clone()),
            data_members: RefCell::new(builder.data_members.clone()),
            static_members: RefCell::new(IndexMap::new()),
            constructors: RefCell::new(Vec::new()),
            default_constructor: RefCell::new(None),
            copy_constructor: RefCell::new(None),
            move_constructor: RefCell::new(None),
            destructor: RefCell::new(None),
            functions: RefCell::new(Vec::new()),
            operators: RefCell::new(Vec::new()),
            casts: RefCell::new(Vec::new()),
            classes: RefCell::new(Vec::new()),
            enums: RefCell::new(Vec::new()),
            class_templates: RefCell::new(Vec::new()),
            function_templates: RefCell::new(Vec::new()),
            typedefs: RefCell::new(IndexMap::new()),
            friend_functions: RefCell::new(Vec::new()),
            friend_classes: RefCell::new(Vec::new()),
            virtual_members: RefCell::new(Vec::new()),
            is_abstract: Cell::new(false),
            user_data: RefCell::new(builder.user_data.clone()),
            template_info: RefCell::new(None),
        }));
        if let Some(parent) = &builder.base {
            class.set_parent(parent);
        }
        class
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

    #[must_use]
    pub fn is_final(&self) -> bool {
        self.0.final_
    }

    #[must_use]
    pub fn parent(&self) -> Option<Class> {
        self.0.parent.borrow().as_ref().and_then(WeakClass::upgrade)
    }

    /// Inherits the base's vtable and abstractness.
    ///
    /// The parent must already be registered in the type system.
    pub(crate) fn set_parent(&self, parent: &Class) {
        *self.0.parent.borrow_mut() = Some(parent.downgrade());
        self.0.is_abstract.set(parent.is_abstract());
        *self.0.virtual_members.borrow_mut() = parent.vtable();
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakClass {
        WeakClass(Rc::downgrade(&self.0))
    }

    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn enclosing_symbol(&self) -> Option<crate::symbols::Symbol> {
        self.0.enclosing.borrow().resolve()
    }

    pub(crate) fn set_enclosing_symbol(&self, enclosing: EnclosingSymbol) {
        *self.0.enclosing.borrow_mut() = enclosing;
    }

    /// True if this class is `base` or derives from it.
    #[must_use]
    pub fn inherits(&self, base: &Class) -> bool {
        self.inheritance_level(base) >= 0
    }

    /// Number of derivation steps from `self` up to `base`; 0 if they are
    /// the same class, -1 if `self` does not derive from `base`.
    #[must_use]
    pub fn inheritance_level(&self, base: &Class) -> i32 {
        let mut depth = 0;
        let mut current = self.clone();
        loop {
            if current.same_as(base) {
                return depth;
            }
            match current.parent() {
                Some(p) => {
                    current = p;
                    depth += 1;
                }
                None => return -1,
            }
        }
    }

    /// The base class `depth` levels up the inheritance chain.
    #[must_use]
    pub fn indirect_base(&self, depth: i32) -> Option<Class> {
        let mut current = self.clone();
        for _ in 0..depth {
            current = current.parent()?;
        }
        Some(current)
    }

    // --- data members ---

    #[must_use]
    pub fn data_members(&self) -> Vec<DataMember> {
        self.0.data_members.borrow().clone()
    }

    #[must_use]
    pub fn data_member_count(&self) -> usize {
        self.0.data_members.borrow().len()
    }

    /// Total number of data members, including the inherited ones.
    #[must_use]
    pub fn cumulated_data_member_count(&self) -> usize {
        self.data_member_count() + self.parent().map_or(0, |p| p.cumulated_data_member_count())
    }

    /// Offset of this class's own data members within an instance's
    /// sub-object vector.
    #[must_use]
    pub fn attributes_offset(&self) -> usize {
        self.parent().map_or(0, |p| p.cumulated_data_member_count())
    }

    pub fn add_data_member(&self, ty: Type, name: impl Into<String>, access: AccessSpecifier) {
        self.0
            .data_members
            .borrow_mut()
            .push(DataMember::new(ty.with_access(access), name));
    }

    /// Finds a data member by name in this class or its ancestors,
    /// most-derived first. Returns the owning class and the index within
    /// that class's own member list.
    #[must_use]
    pub fn find_data_member(&self, name: &str) -> Option<(Class, usize)> {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            let found = class.0.data_members.borrow().iter().position(|m| m.name == name);
            if let Some(index) = found {
                return Some((class, index));
            }
            current = class.parent();
        }
        None
    }

    // --- static data members ---

    pub fn add_static_data_member(&self, name: impl Into<String>, value: Value, access: AccessSpecifier) {
        let ty = value.get_type().with_access(access);
        self.0
            .static_members
            .borrow_mut()
            .insert(name.into(), StaticDataMember { ty, value });
    }

    #[must_use]
    pub fn static_data_member(&self, name: &str) -> Option<StaticDataMember> {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if let Some(member) = class.0.static_members.borrow().get(name) {
                return Some(member.clone());
            }
            current = class.parent();
        }
        None
    }

    // --- constructors / destructor ---

    #[must_use]
    pub fn constructors(&self) -> Vec<Function> {
        self.0.constructors.borrow().clone()
    }

    #[must_use]
    pub fn default_constructor(&self) -> Option<Function> {
        self.0.default_constructor.borrow().clone()
    }

    #[must_use]
    pub fn copy_constructor(&self) -> Option<Function> {
        self.0.copy_constructor.borrow().clone()
    }

    #[must_use]
    pub fn move_constructor(&self) -> Option<Function> {
        self.0.move_constructor.borrow().clone()
    }

    #[must_use]
    pub fn is_default_constructible(&self) -> bool {
        self.default_constructor().is_some_and(|c| !c.is_deleted())
    }

    #[must_use]
    pub fn is_copy_constructible(&self) -> bool {
        self.copy_constructor().is_some_and(|c| !c.is_deleted())
    }

    #[must_use]
    pub fn is_move_constructible(&self) -> bool {
        self.move_constructor().is_some_and(|c| !c.is_deleted())
    }

    #[must_use]
    pub fn destructor(&self) -> Option<Function> {
        self.0.destructor.borrow().clone()
    }

    /// Builds a constructor from `builder`, inserting the implicit object
    /// parameter, and registers it.
    pub fn new_constructor(&self, mut builder: FunctionBuilder) -> Function {
        debug_assert!(builder.kind_of() == FunctionKind::Constructor);
        builder.insert_this_param(self.id());
        let ctor = builder.build();
        ctor.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.register_constructor(ctor.clone());
        ctor
    }

    pub(crate) fn register_constructor(&self, ctor: Function) {
        if ctor.is_default_constructor() {
            *self.0.default_constructor.borrow_mut() = Some(ctor.clone());
        } else if ctor.is_copy_constructor() {
            *self.0.copy_constructor.borrow_mut() = Some(ctor.clone());
        } else if ctor.is_move_constructor() {
            *self.0.move_constructor.borrow_mut() = Some(ctor.clone());
        }
        self.0.constructors.borrow_mut().push(ctor);
    }

    pub fn new_destructor(&self, mut builder: FunctionBuilder) -> Function {
        debug_assert!(builder.kind_of() == FunctionKind::Destructor);
        builder.insert_this_param(self.id());
        let dtor = builder.build();
        dtor.set_enclosing_symbol(EnclosingSymbol::from(self));
        *self.0.destructor.borrow_mut() = Some(dtor.clone());
        dtor
    }

    // --- member functions, operators, casts ---

    #[must_use]
    pub fn member_functions(&self) -> Vec<Function> {
        self.0.functions.borrow().clone()
    }

    #[must_use]
    pub fn operators(&self) -> Vec<Function> {
        self.0.operators.borrow().clone()
    }

    #[must_use]
    pub fn casts(&self) -> Vec<Function> {
        self.0.casts.borrow().clone()
    }

    /// Builds a method from `builder` (inserting the implicit object
    /// parameter unless the builder is static) and registers it,
    /// maintaining the virtual table.
    pub fn new_method(&self, mut builder: FunctionBuilder) -> Function {
        if !builder.is_static_builder() {
            builder.insert_this_param(self.id());
        }
        let f = builder.build();
        f.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.add_member(f.clone());
        f
    }

    pub fn new_operator(&self, mut builder: FunctionBuilder) -> Function {
        debug_assert!(builder.kind_of() == FunctionKind::Operator);
        if !builder.is_static_builder() {
            builder.insert_this_param(self.id());
        }
        let f = builder.build();
        f.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.add_member(f.clone());
        f
    }

    pub fn new_cast(&self, mut builder: FunctionBuilder) -> Function {
        debug_assert!(builder.kind_of() == FunctionKind::Cast);
        builder.insert_this_param(self.id());
        let f = builder.build();
        f.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.add_member(f.clone());
        f
    }

    /// Registers an already-built function, dispatching it into the right
    /// list and maintaining the virtual table.
    pub fn add_member(&self, f: Function) {
        f.set_enclosing_symbol(EnclosingSymbol::from(self));
        match f.kind() {
            FunctionKind::Constructor => {
                self.register_constructor(f);
            }
            FunctionKind::Destructor => {
                *self.0.destructor.borrow_mut() = Some(f);
            }
            FunctionKind::Cast => {
                self.0.casts.borrow_mut().push(f);
            }
            FunctionKind::Operator => {
                self.0.operators.borrow_mut().push(f);
            }
            FunctionKind::Function | FunctionKind::LiteralOperator => {
                self.0.functions.borrow_mut().push(f.clone());
                self.update_vtable(&f);
                if f.is_pure_virtual() {
                    self.0.is_abstract.set(true);
                }
            }
        }
    }

    // --- virtual table ---

    /// The ordered list of overridable member functions.
    #[must_use]
    pub fn vtable(&self) -> Vec<Function> {
        self.0.virtual_members.borrow().clone()
    }

    /// The class is abstract iff its vtable contains a pure virtual.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.0.is_abstract.get()
    }

    fn check_overrides(derived: &Function, base: &Function) -> bool {
        if derived.parameter_count() != base.parameter_count() {
            return false;
        }
        if derived.return_type() != base.return_type() {
            return false;
        }
        // Skip the implicit object parameter: it differs by class.
        for i in 1..derived.parameter_count() {
            if derived.parameter(i) != base.parameter(i) {
                return false;
            }
        }
        derived.name() == base.name()
    }

    fn check_still_abstract(&self) {
        let abstract_ = self.0.virtual_members.borrow().iter().any(Function::is_pure_virtual);
        self.0.is_abstract.set(abstract_);
    }

    fn update_vtable(&self, f: &Function) {
        if f.is_constructor() || f.is_destructor() || f.is_operator() || f.is_cast() {
            return;
        }

        let Some(base) = self.parent() else {
            if f.is_virtual() {
                self.0.virtual_members.borrow_mut().push(f.clone());
            }
            return;
        };

        let base_vtable = base.vtable();

        // Base virtual members may have been registered after this class
        // was created; catch up before updating.
        {
            let mut vtable = self.0.virtual_members.borrow_mut();
            while vtable.len() < base_vtable.len() {
                let next = base_vtable[vtable.len()].clone();
                vtable.push(next);
            }
        }

        for (i, entry) in base_vtable.iter().enumerate() {
            if Self::check_overrides(f, entry) {
                f.force_virtual();
                self.0.virtual_members.borrow_mut()[i] = f.clone();
                if entry.is_pure_virtual() {
                    self.check_still_abstract();
                }
                return;
            }
        }

        if f.is_virtual() {
            self.0.virtual_members.borrow_mut().push(f.clone());
        }
    }

    // --- nested symbols ---

    #[must_use]
    pub fn classes(&self) -> Vec<Class> {
        self.0.classes.borrow().clone()
    }

    pub(crate) fn add_nested_class(&self, class: Class) {
        class.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.0.classes.borrow_mut().push(class);
    }

    #[must_use]
    pub fn enums(&self) -> Vec<Enum> {
        self.0.enums.borrow().clone()
    }

    pub(crate) fn add_nested_enum(&self, e: Enum) {
        e.set_enclosing_symbol(EnclosingSymbol::from(self));
        self.0.enums.borrow_mut().push(e);
    }

    #[must_use]
    pub fn class_templates(&self) -> Vec<ClassTemplate> {
        self.0.class_templates.borrow().clone()
    }

    pub fn add_class_template(&self, t: ClassTemplate) {
        self.0.class_templates.borrow_mut().push(t);
    }

    #[must_use]
    pub fn function_templates(&self) -> Vec<FunctionTemplate> {
        self.0.function_templates.borrow().clone()
    }

    pub fn add_function_template(&self, t: FunctionTemplate) {
        self.0.function_templates.borrow_mut().push(t);
    }

    #[must_use]
    pub fn typedefs(&self) -> IndexMap<String, Type> {
        self.0.typedefs.borrow().clone()
    }

    pub fn add_typedef(&self, name: impl Into<String>, ty: Type) {
        self.0.typedefs.borrow_mut().insert(name.into(), ty);
    }

    #[must_use]
    pub fn find_typedef(&self, name: &str) -> Option<Type> {
        self.0.typedefs.borrow().get(name).copied()
    }

    // --- friends ---

    pub fn add_friend_function(&self, f: Function) {
        self.0.friend_functions.borrow_mut().push(f);
    }

    pub fn add_friend_class(&self, class: &Class) {
        self.0.friend_classes.borrow_mut().push(class.downgrade());
    }

    #[must_use]
    pub fn is_friend_function(&self, f: &Function) -> bool {
        self.0.friend_functions.borrow().iter().any(|g| g.same_as(f))
    }

    #[must_use]
    pub fn is_friend_class(&self, class: &Class) -> bool {
        self.0
            .friend_classes
            .borrow()
            .iter()
            .filter_map(WeakClass::upgrade)
            .any(|c| c.same_as(class))
    }

    // --- misc ---

    #[must_use]
    pub fn user_data(&self) -> Option<Rc<dyn Any>> {
        self.0.user_data.borrow().clone()
    }

    pub fn set_user_data(&self, data: Rc<dyn Any>) {
        *self.0.user_data.borrow_mut() = Some(data);
    }

    #[must_use]
    pub fn template_instance_info(&self) -> Option<ClassTemplateInstanceInfo> {
        self.0.template_info.borrow().clone()
    }

    #[must_use]
    pub fn instance_of(&self) -> Option<ClassTemplate> {
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

    pub(crate) fn set_template_instance_info(&self, info: ClassTemplateInstanceInfo) {
        *self.0.template_info.borrow_mut() = Some(info);
    }

    /// Finds member functions by plain name (not operators or casts).
    #[must_use]
    pub fn find_member_functions(&self, name: &str) -> Vec<Function> {
        self.0
            .functions
            .borrow()
            .iter()
            .filter(|f| f.name().as_str() == Some(name))
            .cloned()
            .collect()
    }

    /// Drops all member lists; used when the class is destroyed through
    /// the type system.
    pub(crate) fn clear_members(&self) {
        self.0.data_members.borrow_mut().clear();
        self.0.static_members.borrow_mut().clear();
        self.0.constructors.borrow_mut().clear();
        *self.0.default_constructor.borrow_mut() = None;
        *self.0.copy_constructor.borrow_mut() = None;
        *self.0.move_constructor.borrow_mut() = None;
        *self.0.destructor.borrow_mut() = None;
        self.0.functions.borrow_mut().clear();
        self.0.operators.borrow_mut().clear();
        self.0.casts.borrow_mut().clear();
        self.0.classes.borrow_mut().clear();
        self.0.enums.borrow_mut().clear();
        self.0.class_templates.borrow_mut().clear();
        self.0.function_templates.borrow_mut().clear();
        self.0.typedefs.borrow_mut().clear();
        self.0.friend_functions.borrow_mut().clear();
        self.0.friend_classes.borrow_mut().clear();
        self.0.virtual_members.borrow_mut().clear();
    }

    /// Nested classes, for destruction cascades.
    #[must_use]
    pub(crate) fn nested_class_ids(&self) -> Vec<Type> {
        self.0.classes.borrow().iter().map(Class::id).collect()
    }

    #[must_use]
    pub(crate) fn nested_enum_ids(&self) -> Vec<Type> {
        self.0.enums.borrow().iter().map(Enum::id).collect()
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({name}, id {id:?})", name = self.name(), id = self.id())
    }
}

/// Fluent description of a class to be registered in the type system.
#[derive(Clone)]
pub struct ClassBuilder {
    pub(crate) name: String,
    pub(crate) base: Option<Class>,
    pub(crate) final_: bool,
    pub(crate) data_members: Vec<DataMember>,
    pub(crate) enclosing: EnclosingSymbol,
    pub(crate) user_data: Option<Rc<dyn Any>>,
    pub(crate) reserved_id: Option<Type>,
}

impl ClassBuilder {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            final_: false,
            data_members: Vec::new(),
            enclosing: EnclosingSymbol::None,
            user_data: None,
            reserved_id: None,
        }
    }

    #[must_use]
    pub fn base(mut self, parent: Class) -> Self {
        self.base = Some(parent);
        self
    }

    #[must_use]
    pub fn final_(mut self) -> Self {
        self.final_ = true;
        self
    }

    #[must_use]
    pub fn data_member(mut self, ty: Type, name: impl Into<String>, access: AccessSpecifier) -> Self {
        self.data_members.push(DataMember::new(ty.with_access(access), name));
        self
    }

    #[must_use]
    pub fn enclosing(mut self, enclosing: EnclosingSymbol) -> Self {
        self.enclosing = enclosing;
        self
    }

    #[must_use]
    pub fn user_data(mut self, data: Rc<dyn Any>) -> Self {
        self.user_data = Some(data);
        self
    }

    /// Registers the class into a slot previously obtained from
    /// `TypeSystem::reserve`.
    #[must_use]
    pub fn with_reserved_id(mut self, id: Type) -> Self {
        self.reserved_id = Some(id);
        self
    }
}
