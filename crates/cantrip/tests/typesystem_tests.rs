//! Tests for the type registry: existence, destruction cascades,
//! listeners, reservations, function-type deduplication and
//! transactions.

use std::{cell::RefCell, rc::Rc};

use cantrip::{
    ClassBuilder, Engine, EnumBuilder, Prototype, Type, TypeKind, TypeSystemListener, TypeSystemTransaction, Value,
};

#[derive(Default)]
struct CountingListener {
    created: RefCell<Vec<Type>>,
    destroyed: RefCell<Vec<Type>>,
}

impl TypeSystemListener for CountingListener {
    fn created(&self, ty: Type) {
        self.created.borrow_mut().push(ty);
    }

    fn destroyed(&self, ty: Type) {
        self.destroyed.borrow_mut().push(ty);
    }
}

// =============================================================================
// 1. Existence and destruction
// =============================================================================

#[test]
fn fundamentals_always_exist() {
    let engine = Engine::new();
    let ts = engine.type_system();
    for ty in [Type::BOOL, Type::CHAR, Type::INT, Type::FLOAT, Type::DOUBLE] {
        assert!(ts.exists(ty), "{ty:?} should exist");
    }
    assert!(ts.exists(Type::STRING), "the built-in String class should exist");
    assert!(!ts.exists(Type::object(4000)), "an unregistered class id should not exist");
}

#[test]
fn registered_class_exists_until_destroyed() {
    let engine = Engine::new();
    let class = engine.register_class(ClassBuilder::new("Widget")).unwrap();
    let id = class.id();
    assert!(engine.type_system().exists(id));
    assert_eq!(engine.type_system().get_class(id).unwrap().name(), "Widget");

    engine.destroy_type(id);
    assert!(!engine.type_system().exists(id));
    assert!(engine.type_system().get_class(id).is_none());
}

#[test]
fn wrong_kind_getters_return_none_instead_of_failing() {
    let engine = Engine::new();
    let ts = engine.type_system();
    assert!(ts.get_enum(Type::STRING).is_none());
    assert!(ts.get_class(Type::INT).is_none());
    assert!(ts.get_closure_type(Type::STRING).is_none());
    assert!(ts.get_function_type(Type::INT).is_none());
}

// =============================================================================
// 2. Listeners
// =============================================================================

#[test]
fn listener_sees_created_then_destroyed_exactly_once() {
    let engine = Engine::new();
    let listener = Rc::new(CountingListener::default());
    engine.type_system().add_listener(listener.clone());

    let class = engine.register_class(ClassBuilder::new("Tracked")).unwrap();
    let id = class.id();
    assert_eq!(listener.created.borrow().iter().filter(|t| **t == id).count(), 1);
    assert!(listener.destroyed.borrow().is_empty());

    engine.destroy_type(id);
    assert_eq!(listener.destroyed.borrow().iter().filter(|t| **t == id).count(), 1);

    // Destroying again does not notify again.
    engine.destroy_type(id);
    assert_eq!(listener.destroyed.borrow().iter().filter(|t| **t == id).count(), 1);
}

#[test]
fn destroying_a_class_cascades_to_nested_types() {
    let engine = Engine::new();
    let outer = engine.register_class(ClassBuilder::new("Outer")).unwrap();
    let inner = engine
        .register_class(ClassBuilder::new("Inner").enclosing(cantrip::EnclosingSymbol::from(&outer)))
        .unwrap();
    let inner_id = inner.id();
    assert!(engine.type_system().exists(inner_id));

    engine.destroy_type(outer.id());
    assert!(!engine.type_system().exists(inner_id), "nested class should be unregistered");
}

// =============================================================================
// 3. Reservations
// =============================================================================

#[test]
fn reserving_then_registering_consumes_exactly_the_reserved_ids() {
    let engine = Engine::new();
    let ts = engine.type_system();
    let first = ts.reserve(TypeKind::Object, 3);
    assert!(!ts.exists(first), "reserved slots are pending, not populated");

    let ids: Vec<Type> = (0..3).map(|i| Type::object((first.index() + i) as u32)).collect();
    for (i, id) in ids.iter().enumerate() {
        let class = ts
            .register_class(ClassBuilder::new(format!("R{i}")).with_reserved_id(*id))
            .unwrap();
        assert_eq!(class.id(), *id);
    }
    for id in &ids {
        assert!(ts.exists(*id));
    }

    // A fresh registration lands after the reserved range.
    let next = ts.register_class(ClassBuilder::new("After")).unwrap();
    assert!(next.id().index() > ids[2].index());
}

#[test]
fn registering_into_an_occupied_slot_fails() {
    let engine = Engine::new();
    let ts = engine.type_system();
    let class = ts.register_class(ClassBuilder::new("Original")).unwrap();
    let err = ts
        .register_class(ClassBuilder::new("Squatter").with_reserved_id(class.id()))
        .unwrap_err();
    assert_eq!(err.kind(), cantrip::ErrorKind::RuntimeError);
}

// =============================================================================
// 4. Function types
// =============================================================================

#[test]
fn function_type_is_deduplicated_by_prototype() {
    let engine = Engine::new();
    let ts = engine.type_system();
    let proto = Prototype::with_params(Type::VOID, [Type::INT]);
    let a = ts.function_type_for(&proto);
    let b = ts.function_type_for(&proto);
    assert!(a.same_as(&b), "equal prototypes must map to the same function type");

    let other = ts.function_type_for(&Prototype::with_params(Type::INT, [Type::INT]));
    assert!(!a.same_as(&other));
}

#[test]
fn function_type_assignment_copies_the_wrapped_function() {
    let engine = Engine::new();
    let ts = engine.type_system();
    let proto = Prototype::with_params(Type::INT, [Type::INT]);
    let ft = ts.function_type_for(&proto);

    let f = cantrip::FunctionBuilder::function("first")
        .returns(Type::INT)
        .param(Type::INT)
        .callback(|_c| Ok(Value::int(1)))
        .build();
    let g = cantrip::FunctionBuilder::function("second")
        .returns(Type::INT)
        .param(Type::INT)
        .callback(|_c| Ok(Value::int(2)))
        .build();

    let dest = Value::function(ft.id(), f);
    let src = Value::function(ft.id(), g.clone());
    let assignment = ft.assignment_operator();
    assignment.invoke(&engine, &[dest.clone(), src]).unwrap();
    assert!(dest.as_function().unwrap().same_as(&g));
}

// =============================================================================
// 5. Transactions
// =============================================================================

#[test]
fn committed_transaction_keeps_created_types() {
    let engine = Engine::new();
    let id;
    {
        let tx = TypeSystemTransaction::begin(engine.type_system()).unwrap();
        let class = engine.register_class(ClassBuilder::new("Kept")).unwrap();
        id = class.id();
        assert_eq!(tx.created_types(), vec![id]);
        tx.commit();
    }
    assert!(engine.type_system().exists(id));
    assert!(!engine.type_system().has_active_transaction());
}

#[test]
fn dropped_transaction_rolls_back_in_reverse_order() {
    let engine = Engine::new();
    let listener = Rc::new(CountingListener::default());
    engine.type_system().add_listener(listener.clone());

    let (a, b);
    {
        let _tx = TypeSystemTransaction::begin(engine.type_system()).unwrap();
        a = engine.register_class(ClassBuilder::new("A")).unwrap().id();
        b = engine.register_enum(EnumBuilder::new("B").value("x")).unwrap().id();
        // Dropped without commit: the error path of the caller.
    }
    assert!(!engine.type_system().exists(a));
    assert!(!engine.type_system().exists(b));
    assert_eq!(*listener.destroyed.borrow(), vec![b, a], "rollback destroys most recent first");
    assert!(!engine.type_system().has_active_transaction());
}

#[test]
fn nested_transactions_are_rejected() {
    let engine = Engine::new();
    let _tx = TypeSystemTransaction::begin(engine.type_system()).unwrap();
    assert!(engine.type_system().has_active_transaction());
    assert!(TypeSystemTransaction::begin(engine.type_system()).is_err());
}
