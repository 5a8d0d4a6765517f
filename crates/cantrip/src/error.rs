use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can produce an engine error.
pub type EngineResult<T> = Result<T, EngineError>;

/// The kinds of failures the engine can report.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g., `ConversionError` -> "ConversionError").
///
/// Conversion computation and overload resolution never produce these: they
/// return sentinel values (`NotConvertible`, an empty selection) and leave it
/// to the caller to decide whether a missing candidate is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A feature that is recognized but not provided by this build.
    NotImplemented,
    /// A generic runtime failure inside the interpreter.
    RuntimeError,
    /// A failure while evaluating an expression (bad condition type, …).
    EvaluationError,
    /// A value could not be converted to the requested type.
    ConversionError,
    /// A value could not be copied (deleted or absent copy constructor).
    CopyError,
    /// A type id that is not registered in the type system.
    UnknownType,
    /// No constructor of the class accepts the provided arguments.
    NoMatchingConstructor,
    /// The selected constructor is deleted.
    ConstructorIsDeleted,
    /// More arguments were provided than any constructor accepts.
    TooManyArgumentInInitialization,
    /// Fewer arguments were provided than any constructor requires.
    TooFewArgumentInInitialization,
    /// A deleted function was invoked.
    DeletedFunctionCall,
    /// Overload resolution found two candidates neither of which is better.
    AmbiguousCall,
    /// Overload resolution found no viable candidate.
    NoMatchingOverload,
    /// A template could not be instantiated for the given arguments.
    TemplateInstantiationError,
    /// The value stack reached its fixed capacity.
    StackOverflow,
    /// The callstack reached its fixed capacity.
    CallstackOverflow,
    /// A module failed to load; the message carries the detail.
    ModuleLoadingError,
}

/// A typed error carrying an [`ErrorKind`] and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    kind: ErrorKind,
    message: String,
}

impl EngineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn not_implemented(what: impl Display) -> Self {
        Self::new(ErrorKind::NotImplemented, format!("{what} is not implemented"))
    }

    pub(crate) fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    pub(crate) fn evaluation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EvaluationError, message)
    }

    pub(crate) fn conversion_error(src: impl Display, dest: impl Display) -> Self {
        Self::new(
            ErrorKind::ConversionError,
            format!("could not convert from '{src}' to '{dest}'"),
        )
    }

    pub(crate) fn copy_error(ty: impl Display) -> Self {
        Self::new(ErrorKind::CopyError, format!("could not copy value of type '{ty}'"))
    }

    pub(crate) fn unknown_type(ty: impl Display) -> Self {
        Self::new(ErrorKind::UnknownType, format!("unknown type '{ty}'"))
    }

    pub(crate) fn no_matching_constructor(class_name: &str) -> Self {
        Self::new(
            ErrorKind::NoMatchingConstructor,
            format!("could not find a matching constructor for class '{class_name}'"),
        )
    }

    pub(crate) fn constructor_is_deleted(class_name: &str) -> Self {
        Self::new(
            ErrorKind::ConstructorIsDeleted,
            format!("the selected constructor of class '{class_name}' is deleted"),
        )
    }

    pub(crate) fn too_many_arguments(class_name: &str, actual: usize) -> Self {
        Self::new(
            ErrorKind::TooManyArgumentInInitialization,
            format!("too many arguments ({actual}) in initialization of '{class_name}'"),
        )
    }

    pub(crate) fn too_few_arguments(class_name: &str, actual: usize) -> Self {
        Self::new(
            ErrorKind::TooFewArgumentInInitialization,
            format!("too few arguments ({actual}) in initialization of '{class_name}'"),
        )
    }

    pub(crate) fn deleted_function_call(name: impl Display) -> Self {
        Self::new(
            ErrorKind::DeletedFunctionCall,
            format!("attempt to call deleted function '{name}'"),
        )
    }

    pub(crate) fn ambiguous_call(name: impl Display) -> Self {
        Self::new(ErrorKind::AmbiguousCall, format!("call to '{name}' is ambiguous"))
    }

    pub(crate) fn no_matching_overload(name: impl Display) -> Self {
        Self::new(
            ErrorKind::NoMatchingOverload,
            format!("no matching overload found for '{name}'"),
        )
    }

    pub(crate) fn template_instantiation_error(name: &str, detail: impl Display) -> Self {
        Self::new(
            ErrorKind::TemplateInstantiationError,
            format!("could not instantiate template '{name}': {detail}"),
        )
    }

    pub(crate) fn stack_overflow() -> Self {
        Self::new(ErrorKind::StackOverflow, "value stack overflow")
    }

    pub(crate) fn callstack_overflow() -> Self {
        Self::new(ErrorKind::CallstackOverflow, "callstack overflow")
    }

    pub(crate) fn module_loading_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModuleLoadingError, message)
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{kind}", kind = self.kind)
        } else {
            write!(f, "{kind}: {msg}", kind = self.kind, msg = self.message)
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        let kind = ErrorKind::NoMatchingConstructor;
        let as_str: &'static str = kind.into();
        assert_eq!(as_str, "NoMatchingConstructor");
        assert_eq!(ErrorKind::from_str(as_str).unwrap(), kind);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = EngineError::too_many_arguments("A", 4);
        assert_eq!(err.kind(), ErrorKind::TooManyArgumentInInitialization);
        let text = err.to_string();
        assert!(text.starts_with("TooManyArgumentInInitialization"), "got: {text}");
        assert!(text.contains('4'), "got: {text}");
    }
}
