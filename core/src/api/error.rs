//! Public error types of the evaluation API.
//!
//! Internal errors (`ParseError`, `BuildError`, `ExecutionError`) are
//! converted to these types at the API boundary. Exceptions thrown in the
//! debuggee are kept apart from failures of the evaluator itself: the
//! debugger shows the former as the fragment's result.

use core::fmt;

use thiserror::Error;

use crate::builder::BuildError;
use crate::evaluator::{ExecutionError, ExecutionErrorKind, RuntimeError};
use crate::parser::{ParseError, Span};
use crate::values::ObjectRef;

/// Public error type for all engine operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The fragment does not parse or does not type-check. Nothing was run.
    #[error("compilation failed with {} error(s)", error_count(diagnostics))]
    Compilation {
        diagnostics: Vec<Diagnostic>,
        src: String,
    },

    /// Evaluation failed (null dereference, failed cast, division by zero,
    /// lost connection to the debuggee, ...).
    #[error("runtime error: {}", diagnostic.message)]
    Runtime { diagnostic: Diagnostic, src: String },

    /// An exception thrown in the debuggee, or by a `throw` statement, that the
    /// fragment did not catch.
    #[error("exception thrown: {exception}")]
    Exception {
        exception: ObjectRef,
        span: Span,
        src: String,
    },

    /// Evaluation depth or loop iteration limit exceeded.
    #[error("resource limit exceeded: {0}")]
    ResourceExceeded(String),
}

fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}

impl Error {
    /// Source text of the fragment the error refers to.
    pub fn source_text(&self) -> Option<&str> {
        match self {
            Error::Compilation { src, .. }
            | Error::Runtime { src, .. }
            | Error::Exception { src, .. } => Some(src),
            Error::ResourceExceeded(_) => None,
        }
    }

    pub(crate) fn from_parse(error: &ParseError, src: &str) -> Self {
        Error::Compilation {
            diagnostics: vec![error.to_diagnostic()],
            src: src.to_string(),
        }
    }

    pub(crate) fn from_build(error: &BuildError, src: &str) -> Self {
        Error::Compilation {
            diagnostics: vec![error.to_diagnostic()],
            src: src.to_string(),
        }
    }

    pub(crate) fn from_execution(error: ExecutionError, src: &str) -> Self {
        match error.kind {
            ExecutionErrorKind::ResourceExceeded(exceeded) => {
                Error::ResourceExceeded(exceeded.to_string())
            }
            ExecutionErrorKind::Runtime(runtime) => Error::Runtime {
                diagnostic: runtime_diagnostic(&runtime, error.span),
                src: src.to_string(),
            },
        }
    }
}

fn runtime_diagnostic(error: &RuntimeError, span: Span) -> Diagnostic {
    let (code, help): (&str, Vec<String>) = match error {
        RuntimeError::DivisionByZero => ("R001", vec![]),
        RuntimeError::IndexOutOfBounds { .. } | RuntimeError::NegativeArraySize(_) => {
            ("R002", vec![])
        }
        RuntimeError::NullPointer(_) => ("R003", vec![]),
        RuntimeError::Cast(_) | RuntimeError::ClassCast { .. } => ("R004", vec![]),
        RuntimeError::InvocationDisabled => (
            "R005",
            vec!["Enable method invocation to run methods in the debuggee".to_string()],
        ),
        RuntimeError::Vm(_) => ("R006", vec![]),
        _ => ("R000", vec![]),
    };
    Diagnostic {
        severity: Severity::Error,
        message: error.to_string(),
        span,
        related: Vec::new(),
        help,
        code: Some(code.to_string()),
    }
}

/// A diagnostic message (error, warning, or info) with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity level (error, warning, info).
    pub severity: Severity,

    /// Primary diagnostic message.
    pub message: String,

    /// Source location of the primary issue.
    pub span: Span,

    /// Related locations that provide additional context.
    pub related: Vec<RelatedInfo>,

    /// Suggestions on how to fix the issue.
    pub help: Vec<String>,

    /// Error code (e.g., "B007") for documentation lookup.
    pub code: Option<String>,
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Related information for a diagnostic (e.g., "declared here").
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedInfo {
    pub span: Span,
    pub message: String,
}
