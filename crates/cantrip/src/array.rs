use crate::{
    class::{Class, ClassBuilder},
    engine::Engine,
    error::{EngineError, EngineResult},
    function::FunctionBuilder,
    operators::OperatorId,
    template::{ClassTemplate, TemplateArgument},
    types::Type,
    value::Value,
};

/// The runtime payload of an `Array<T>` value.
#[derive(Clone, Default)]
pub struct ArrayObject {
    element_type: Type,
    elements: Vec<Value>,
}

impl ArrayObject {
    #[must_use]
    pub fn new(element_type: Type) -> Self {
        Self {
            element_type,
            elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_elements(element_type: Type, elements: Vec<Value>) -> Self {
        Self { element_type, elements }
    }

    #[must_use]
    pub fn element_type(&self) -> Type {
        self.element_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn at(&self, index: usize) -> Option<Value> {
        self.elements.get(index).cloned()
    }

    pub fn set(&mut self, index: usize, value: Value) {
        self.elements[index] = value;
    }

    pub fn push(&mut self, value: Value) {
        self.elements.push(value);
    }

    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }
}

/// Native instantiation backend for the built-in `Array<T>` template.
///
/// Synthesizes the instance class with a default constructor, a sized
/// constructor, copy construction, assignment, `size` and element access.
pub(crate) fn instantiate_array(
    engine: &Engine,
    template: &ClassTemplate,
    args: &[TemplateArgument],
) -> EngineResult<Class> {
    let [TemplateArgument::Type(element_type)] = args else {
        return Err(EngineError::template_instantiation_error(
            "Array",
            "expected a single type argument",
        ));
    };
    let element_type = element_type.base();

    let class = engine
        .type_system()
        .register_class(ClassBuilder::new(format!("Array<{element_type}>")))?;
    let id = class.id();

    class.new_constructor(
        FunctionBuilder::constructor().returns(id).callback(move |call| {
            let ty = call.callee().member_of().map_or(id, |c| c.id());
            Ok(Value::array(ty, ArrayObject::new(element_type)))
        }),
    );

    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::INT)
            .explicit_()
            .callback(move |call| {
                let count = call.arg(1).as_int().unwrap_or(0).max(0) as usize;
                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    elements.push(call.engine().construct(element_type, &[])?);
                }
                Ok(Value::array(id, ArrayObject::with_elements(element_type, elements)))
            }),
    );

    class.new_constructor(
        FunctionBuilder::constructor()
            .returns(id)
            .param(Type::const_reference(id))
            .callback(move |call| {
                let src = call.arg(1);
                let engine = call.engine();
                let copied: EngineResult<Vec<Value>> = src
                    .with_array(|a| a.elements().to_vec())
                    .unwrap_or_default()
                    .iter()
                    .map(|v| engine.copy(v))
                    .collect();
                Ok(Value::array(id, ArrayObject::with_elements(element_type, copied?)))
            }),
    );

    class.new_destructor(FunctionBuilder::destructor().callback(|call| {
        let this = call.arg(0);
        this.with_array_mut(|a| a.elements.clear());
        Ok(Value::void())
    }));

    class.new_method(
        FunctionBuilder::function("size")
            .returns(Type::INT)
            .const_()
            .callback(|call| {
                let this = call.arg(0);
                let len = this.with_array(ArrayObject::len).unwrap_or(0);
                Ok(Value::int(len as i32))
            }),
    );

    class.new_method(
        FunctionBuilder::function("at")
            .returns(Type::const_reference(element_type))
            .param(Type::INT)
            .const_()
            .callback(|call| {
                let this = call.arg(0);
                let index = call.arg(1).as_int().unwrap_or(-1);
                element_at(&this, index)
            }),
    );

    class.new_operator(
        FunctionBuilder::operator(OperatorId::Subscript)
            .returns(Type::reference(element_type))
            .param(Type::INT)
            .callback(|call| {
                let this = call.arg(0);
                let index = call.arg(1).as_int().unwrap_or(-1);
                element_at(&this, index)
            }),
    );

    class.new_operator(
        FunctionBuilder::operator(OperatorId::Assignment)
            .returns(Type::reference(id))
            .param(Type::const_reference(id))
            .callback(move |call| {
                let dest = call.arg(0);
                let src = call.arg(1);
                let engine = call.engine();
                let copied: EngineResult<Vec<Value>> = src
                    .with_array(|a| a.elements().to_vec())
                    .unwrap_or_default()
                    .iter()
                    .map(|v| engine.copy(v))
                    .collect();
                let copied = copied?;
                dest.with_array_mut(|a| a.elements = copied);
                Ok(dest)
            }),
    );

    class.set_template_instance_info(crate::class::ClassTemplateInstanceInfo {
        template: template.clone(),
        arguments: args.to_vec(),
    });

    Ok(class)
}

fn element_at(this: &Value, index: i32) -> EngineResult<Value> {
    if index < 0 {
        return Err(EngineError::runtime_error(format!("array index {index} is negative")));
    }
    this.with_array(|a| a.at(index as usize))
        .flatten()
        .ok_or_else(|| EngineError::runtime_error(format!("array index {index} out of range")))
}
