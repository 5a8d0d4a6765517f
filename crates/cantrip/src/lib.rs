#![doc = include_str!("../../../README.md")]
#![expect(dead_code, reason = "embedding APIs keep some currently-unused surface")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]

mod access;
mod array;
mod attributes;
mod builtins;
mod class;
mod closure;
mod compiler;
mod context;
mod conversion;
mod engine;
mod enumeration;
mod error;
mod function;
mod function_type;
mod initializer_list;
mod interpreter;
mod ir;
mod locals;
mod module;
mod namespace;
mod operators;
pub mod overload;
mod prototype;
mod scope;
mod script;
mod string_builtin;
mod symbols;
mod template;
pub mod tracer;
mod transaction;
mod types;
mod typesystem;
mod value;

pub use crate::{
    access::AccessSpecifier,
    array::ArrayObject,
    attributes::{Attribute, AttributesMap, DefaultArgumentsMap, SymbolKey},
    class::{Class, ClassBuilder, ClassTemplateInstanceInfo, DataMember, StaticDataMember, WeakClass},
    closure::{Capture, ClosureType, LambdaObject},
    compiler::{CompileMode, CompilerBackend},
    context::Context,
    conversion::{
        Conversion, ConversionPolicy, ConversionRank, NumericConversion, NumericPromotion, StandardConversion,
    },
    engine::{Engine, EngineConfig},
    enumeration::{Enum, EnumBuilder, Enumerator, WeakEnum},
    error::{EngineError, EngineResult, ErrorKind},
    function::{
        Function, FunctionBuilder, FunctionFlags, FunctionKind, FunctionSpecifier, NativeCallback,
        TemplateInstanceInfo,
    },
    function_type::FunctionType,
    initializer_list::InitializerListObject,
    interpreter::{
        DebugHandler, DefaultDebugHandler, FrameFlag, FunctionCall, Workspace, WorkspaceVar,
    },
    ir::{Breakpoint, DebugInfoBlock, DebugVarInfo, Expr, Stmt},
    locals::Locals,
    module::{GroupModule, LegacyModule, Module, ModuleInterface, ModuleLoadCallback, ScriptModule},
    namespace::{Namespace, WeakNamespace},
    operators::{Associativity, OperatorArity, OperatorId},
    overload::{self as overload_resolution, OverloadResult},
    prototype::Prototype,
    scope::{NameLookup, Scope, ScopeKind, TemplateLookup},
    script::{DiagnosticMessage, Script, Severity, SourceFile},
    symbols::{EnclosingSymbol, Name, Symbol, SymbolKind},
    template::{
        ClassTemplate, ClassTemplateBackend, Deduction, FunctionTemplate, FunctionTemplateBackend,
        PartialSpecialization, TemplateArgument, TemplateArgumentDeduction, TemplateParameter,
        TemplateParameterKind, TemplatePartialOrdering, TemplatePattern, deduce_from_arguments, partial_ordering,
        select_function_template,
    },
    transaction::TypeSystemTransaction,
    types::{Type, TypeKind},
    typesystem::{TypeSystem, TypeSystemListener},
    value::Value,
};
