use crate::{
    class::{Class, ClassBuilder},
    engine::Engine,
    error::{EngineError, EngineResult},
    function::FunctionBuilder,
    template::{ClassTemplate, TemplateArgument},
    types::Type,
    value::Value,
};

/// A temporary view over a contiguous range of values, used to initialize
/// aggregates and containers.
///
/// The elements are handles into the execution context's initializer
/// buffer; the list itself never owns their storage, so dropping it does
/// not destroy the elements.
#[derive(Clone, Default)]
pub struct InitializerListObject {
    elements: Vec<Value>,
}

impl InitializerListObject {
    #[must_use]
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
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

    #[must_use]
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }
}

/// Native instantiation backend for the built-in `InitializerList<T>`
/// template: a read-only view type with `size` and `at`.
pub(crate) fn instantiate_initializer_list(
    engine: &Engine,
    template: &ClassTemplate,
    args: &[TemplateArgument],
) -> EngineResult<Class> {
    let [TemplateArgument::Type(element_type)] = args else {
        return Err(EngineError::template_instantiation_error(
            "InitializerList",
            "expected a single type argument",
        ));
    };
    let element_type = element_type.base();

    let class = engine
        .type_system()
        .register_class(ClassBuilder::new(format!("InitializerList<{element_type}>")))?;

    class.new_method(
        FunctionBuilder::function("size")
            .returns(Type::INT)
            .const_()
            .callback(|call| {
                let len = call.arg(0).with_initializer_list(InitializerListObject::len).unwrap_or(0);
                Ok(Value::int(len as i32))
            }),
    );

    class.new_method(
        FunctionBuilder::function("at")
            .returns(Type::const_reference(element_type))
            .param(Type::INT)
            .const_()
            .callback(|call| {
                let index = call.arg(1).as_int().unwrap_or(-1);
                if index < 0 {
                    return Err(EngineError::runtime_error(format!(
                        "initializer-list index {index} is negative"
                    )));
                }
                call.arg(0)
                    .with_initializer_list(|l| l.at(index as usize))
                    .flatten()
                    .ok_or_else(|| EngineError::runtime_error(format!("initializer-list index {index} out of range")))
            }),
    );

    class.set_template_instance_info(crate::class::ClassTemplateInstanceInfo {
        template: template.clone(),
        arguments: args.to_vec(),
    });

    Ok(class)
}
