//! Tests for classes: data members, special-member identification, the
//! virtual table, abstractness, friends and typedefs.

use cantrip::{
    AccessSpecifier, ClassBuilder, Engine, FunctionBuilder, Type, Value,
};

fn engine_with_class(name: &str) -> (Engine, cantrip::Class) {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new(name)).unwrap();
    (engine, class)
}

// =============================================================================
// 1. Data members
// =============================================================================

#[test]
fn data_member_access_is_stored_in_the_type_bits() {
    let (_engine, class) = engine_with_class("P");
    class.add_data_member(Type::INT, "x", AccessSpecifier::Private);
    class.add_data_member(Type::DOUBLE, "y", AccessSpecifier::Public);

    let members = class.data_members();
    assert_eq!(members[0].access(), AccessSpecifier::Private);
    assert_eq!(members[0].ty.base(), Type::INT);
    assert_eq!(members[1].access(), AccessSpecifier::Public);
}

#[test]
fn attributes_offset_is_the_base_cumulated_count() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("Base")).unwrap();
    base.add_data_member(Type::INT, "a", AccessSpecifier::Public);
    base.add_data_member(Type::INT, "b", AccessSpecifier::Public);

    let derived = engine
        .register_class(ClassBuilder::new("Derived").base(base.clone()))
        .unwrap();
    derived.add_data_member(Type::INT, "c", AccessSpecifier::Public);

    assert_eq!(base.attributes_offset(), 0);
    assert_eq!(derived.attributes_offset(), 2);
    assert_eq!(derived.cumulated_data_member_count(), 3);

    // Lookup walks most-derived first and reports the owning class.
    let (owner, index) = derived.find_data_member("a").unwrap();
    assert!(owner.same_as(&base));
    assert_eq!(index, 0);
    let (owner, index) = derived.find_data_member("c").unwrap();
    assert!(owner.same_as(&derived));
    assert_eq!(index, 0);
}

#[test]
fn static_data_members_are_shared_and_visible_from_derived() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("Counted")).unwrap();
    base.add_static_data_member("count", Value::int(7), AccessSpecifier::Public);
    let derived = engine
        .register_class(ClassBuilder::new("MoreCounted").base(base.clone()))
        .unwrap();

    let member = derived.static_data_member("count").unwrap();
    assert_eq!(member.value.as_int(), Some(7));
    member.value.set_int(8);
    assert_eq!(base.static_data_member("count").unwrap().value.as_int(), Some(8));
}

// =============================================================================
// 2. Special members
// =============================================================================

#[test]
fn constructor_kinds_are_identified_by_shape() {
    let (_engine, class) = engine_with_class("S");
    let id = class.id();

    let default = class.new_constructor(FunctionBuilder::constructor().returns(id).callback(move |_c| Ok(Value::object(id))));
    let copy = class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::const_reference(id))
            .callback(move |_c| Ok(Value::object(id))),
    );
    let from_int = class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::INT)
            .callback(move |_c| Ok(Value::object(id))),
    );
    let moving = class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::forwarding_reference(id))
            .callback(move |_c| Ok(Value::object(id))),
    );

    assert!(default.is_default_constructor());
    assert!(copy.is_copy_constructor());
    assert!(moving.is_move_constructor());
    assert!(!from_int.is_copy_constructor());
    assert!(class.default_constructor().unwrap().same_as(&default));
    assert!(class.copy_constructor().unwrap().same_as(&copy));
    assert!(class.move_constructor().unwrap().same_as(&moving));
    assert!(class.is_copy_constructible());
}

#[test]
fn deleted_copy_constructor_makes_class_non_copyable() {
    let (engine, class) = engine_with_class("NoCopy");
    let id = class.id();
    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::const_reference(id))
            .deleted(),
    );
    assert!(!class.is_copy_constructible());

    let err = engine.copy(&Value::object(id)).unwrap_err();
    assert_eq!(err.kind(), cantrip::ErrorKind::CopyError);
}

// =============================================================================
// 3. Virtual table
// =============================================================================

#[test]
fn virtual_members_are_appended_and_inherited() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("Shape")).unwrap();
    let area = base.new_method(
        FunctionBuilder::function("area")
            .returns(Type::DOUBLE)
            .const_()
            .virtual_()
            .callback(|_c| Ok(Value::double(0.0))),
    );
    assert_eq!(base.vtable().len(), 1);
    assert!(base.vtable()[0].same_as(&area));
    assert!(!base.is_abstract());

    let derived = engine
        .register_class(ClassBuilder::new("Circle").base(base.clone()))
        .unwrap();
    assert_eq!(derived.vtable().len(), 1, "derived inherits the base vtable");

    let override_ = derived.new_method(
        FunctionBuilder::function("area")
            .returns(Type::DOUBLE)
            .const_()
            .callback(|_c| Ok(Value::double(3.14))),
    );
    assert_eq!(derived.vtable().len(), 1);
    assert!(derived.vtable()[0].same_as(&override_), "matching signature replaces the slot");
    assert!(override_.is_virtual(), "overriding implicitly marks the function virtual");
    assert!(base.vtable()[0].same_as(&area), "the base vtable is untouched");
}

#[test]
fn abstractness_follows_pure_virtuals() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("Abstract")).unwrap();
    base.new_method(
        FunctionBuilder::function("run")
            .returns(Type::VOID)
            .pure_(),
    );
    assert!(base.is_abstract());

    let derived = engine
        .register_class(ClassBuilder::new("Concrete").base(base.clone()))
        .unwrap();
    assert!(derived.is_abstract(), "abstractness is inherited until overridden");

    derived.new_method(
        FunctionBuilder::function("run")
            .returns(Type::VOID)
            .callback(|_c| Ok(Value::void())),
    );
    assert!(!derived.is_abstract(), "overriding the pure virtual clears abstractness");
}

#[test]
fn unrelated_method_does_not_touch_the_vtable() {
    let engine = Engine::new();
    let base = engine.register_class(ClassBuilder::new("V")).unwrap();
    base.new_method(
        FunctionBuilder::function("hook")
            .returns(Type::VOID)
            .virtual_()
            .callback(|_c| Ok(Value::void())),
    );
    let derived = engine.register_class(ClassBuilder::new("W").base(base.clone())).unwrap();
    derived.new_method(
        FunctionBuilder::function("helper")
            .returns(Type::VOID)
            .callback(|_c| Ok(Value::void())),
    );
    assert_eq!(derived.vtable().len(), 1);
    assert!(derived.vtable()[0].same_as(&base.vtable()[0]));
}

// =============================================================================
// 4. Inheritance queries, friends, typedefs
// =============================================================================

#[test]
fn inheritance_level_counts_derivation_steps() {
    let engine = Engine::new();
    let a = engine.register_class(ClassBuilder::new("A")).unwrap();
    let b = engine.register_class(ClassBuilder::new("B").base(a.clone())).unwrap();
    let c = engine.register_class(ClassBuilder::new("C").base(b.clone())).unwrap();
    let unrelated = engine.register_class(ClassBuilder::new("U")).unwrap();

    assert_eq!(c.inheritance_level(&a), 2);
    assert_eq!(c.inheritance_level(&b), 1);
    assert_eq!(c.inheritance_level(&c), 0);
    assert_eq!(a.inheritance_level(&c), -1);
    assert_eq!(c.inheritance_level(&unrelated), -1);
    assert!(c.indirect_base(2).unwrap().same_as(&a));
}

#[test]
fn friends_and_typedefs_are_recorded() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Secretive")).unwrap();
    let buddy = engine.register_class(ClassBuilder::new("Buddy")).unwrap();
    let helper = FunctionBuilder::function("peek").returns(Type::INT).build();

    class.add_friend_class(&buddy);
    class.add_friend_function(helper.clone());
    class.add_typedef("value_type", Type::INT);

    assert!(class.is_friend_class(&buddy));
    assert!(class.is_friend_function(&helper));
    assert!(!buddy.is_friend_class(&class));
    assert_eq!(class.find_typedef("value_type"), Some(Type::INT));
    assert_eq!(class.find_typedef("missing"), None);
}

#[test]
fn final_flag_is_reported() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Sealed").final_()).unwrap();
    assert!(class.is_final());
}
