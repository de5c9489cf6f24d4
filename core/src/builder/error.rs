//! Build-time errors.
//!
//! Everything reported here is fatal for the fragment: the evaluator tree is
//! never produced, so nothing reaches the debuggee.

use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::casting::CastError;
use crate::parser::Span;
use crate::types::{JavaType, PrimitiveKind};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct BuildError {
    pub kind: BuildErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildErrorKind {
    /// A construct the evaluator has no node for.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    #[error("cannot find symbol `{0}`")]
    UnresolvedName(String),

    #[error("cannot find class `{0}`")]
    UnknownType(String),

    #[error("no field `{field}` in {class}")]
    UnknownField { class: String, field: String },

    #[error("no method `{name}` in {class}")]
    UnknownMethod { class: String, name: String },

    #[error("no {what} of {class} applies to arguments ({args})")]
    NoApplicableMethod {
        what: String,
        class: String,
        args: String,
    },

    #[error("incompatible types: {0}")]
    IncompatibleTypes(#[from] CastError),

    #[error("bad operand types for `{op}`: {left} and {right}")]
    BadOperands {
        op: String,
        left: JavaType,
        right: JavaType,
    },

    #[error("bad operand type {operand} for `{op}`")]
    BadOperand { op: String, operand: JavaType },

    #[error("{found} cannot be used here; expected {expected}")]
    UnexpectedType { expected: String, found: JavaType },

    #[error("the left-hand side must be a variable")]
    NotAssignable,

    #[error("local variable `{0}` is declared in an enclosing method and was not captured")]
    UnreachableLocal(String),

    #[error("`this` is not available in a static context")]
    NoThis,

    #[error("non-static member `{0}` cannot be referenced from a static context")]
    NotStatic(String),

    #[error("{0} has no enclosing instance")]
    NoEnclosingInstance(String),

    #[error("variable `{0}` is already defined")]
    DuplicateVariable(String),

    #[error("label `{0}` is already in use")]
    DuplicateLabel(String),

    #[error("`{0}` outside of a loop")]
    JumpOutsideLoop(&'static str),

    #[error("undefined label `{0}`")]
    UndefinedLabel(String),

    #[error("`continue {0}` does not name a loop")]
    NotALoopLabel(String),

    #[error("integer literal {0} is out of range")]
    IntegerTooLarge(String),

    #[error("cannot infer the type of `{0}`")]
    CannotInfer(String),

    #[error("{kind} cannot be boxed: {wrapper} has neither valueOf({kind}) nor a {kind} constructor")]
    NoBoxingFactory {
        kind: PrimitiveKind,
        wrapper: &'static str,
    },

    #[error("{0} is abstract; cannot be instantiated")]
    NotInstantiable(String),
}

impl BuildError {
    pub fn new(kind: impl Into<BuildErrorKind>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help): (&str, Vec<String>) = match &self.kind {
            BuildErrorKind::Unsupported(_) => (
                "B001",
                vec!["Rewrite the fragment without this construct".to_string()],
            ),
            BuildErrorKind::UnresolvedName(_) => ("B002", vec![]),
            BuildErrorKind::UnknownType(_) => (
                "B003",
                vec!["Use the fully qualified class name".to_string()],
            ),
            BuildErrorKind::UnknownField { .. } => ("B004", vec![]),
            BuildErrorKind::UnknownMethod { .. } => ("B005", vec![]),
            BuildErrorKind::NoApplicableMethod { .. } => (
                "B006",
                vec!["Check the argument types or add an explicit cast".to_string()],
            ),
            BuildErrorKind::IncompatibleTypes(_) => ("B007", vec![]),
            BuildErrorKind::BadOperands { .. } | BuildErrorKind::BadOperand { .. } => {
                ("B008", vec![])
            }
            BuildErrorKind::UnexpectedType { .. } => ("B009", vec![]),
            BuildErrorKind::NotAssignable => ("B010", vec![]),
            BuildErrorKind::UnreachableLocal(_) => (
                "B011",
                vec!["Evaluate the fragment in the frame that declares the variable".to_string()],
            ),
            BuildErrorKind::NoThis
            | BuildErrorKind::NotStatic(_)
            | BuildErrorKind::NoEnclosingInstance(_) => ("B012", vec![]),
            BuildErrorKind::DuplicateVariable(_) | BuildErrorKind::DuplicateLabel(_) => {
                ("B013", vec![])
            }
            BuildErrorKind::JumpOutsideLoop(_)
            | BuildErrorKind::UndefinedLabel(_)
            | BuildErrorKind::NotALoopLabel(_) => ("B014", vec![]),
            BuildErrorKind::IntegerTooLarge(_) => (
                "B015",
                vec!["Add an `L` suffix for a long literal".to_string()],
            ),
            BuildErrorKind::CannotInfer(_) => (
                "B016",
                vec!["Declare the variable with an explicit type".to_string()],
            ),
            BuildErrorKind::NoBoxingFactory { .. } => ("B017", vec![]),
            BuildErrorKind::NotInstantiable(_) => ("B018", vec![]),
        };

        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone(),
            related: Vec::new(),
            help,
            code: Some(code.to_string()),
        }
    }
}
