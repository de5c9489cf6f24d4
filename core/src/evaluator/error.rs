//! Runtime evaluation errors.
//!
//! # Error Categories
//!
//! - **Runtime errors**: failures of one evaluation (null dereference, failed
//!   cast, division by zero, a debuggee call that could not be made). They
//!   abort the evaluation and are reported with the span of the failing node.
//!
//! - **Resource exceeded errors**: evaluation depth or loop iteration limits.
//!
//! Exceptions thrown inside the debuggee are not errors: they travel as
//! [`Interrupt::Thrown`](super::Interrupt::Thrown) so that `try`/`catch` in
//! the fragment can observe them.

use thiserror::Error;

use crate::casting::CastError;
use crate::parser::Span;
use crate::remote::VmError;
use crate::types::{JavaType, PrimitiveKind};
use crate::values::{ObjectRef, Value};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
    pub span: Span,
}

impl ExecutionError {
    pub fn new(kind: impl Into<ExecutionErrorKind>, span: Span) -> Self {
        Self {
            kind: kind.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionErrorKind {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceededError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: i32 },

    #[error("negative array size {0}")]
    NegativeArraySize(i32),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error("{0}")]
    NullPointer(String),

    #[error("{value} cannot be cast to {target}")]
    ClassCast { value: String, target: JavaType },

    #[error("{0} is not a wrapper object")]
    NotAWrapper(String),

    #[error("cannot box {kind}: {wrapper} has neither valueOf({kind}) nor a matching constructor")]
    NoBoxingFactory {
        kind: PrimitiveKind,
        wrapper: &'static str,
    },

    #[error("expected {expected}, found {found}")]
    UnexpectedValue { expected: String, found: String },

    #[error("`this` is not available in this frame")]
    NoThis,

    #[error("`{0}` is not available")]
    Unavailable(String),

    #[error("method invocation is disabled")]
    InvocationDisabled,

    #[error("`{0}` outside of the statement it targets")]
    StrayJump(String),

    #[error("variable `{0}` is already defined in this scope")]
    DuplicateVariable(String),

    #[error("{0} is not a variable")]
    NotAssignable(String),

    #[error(transparent)]
    Vm(VmError),
}

impl From<VmError> for RuntimeError {
    fn from(error: VmError) -> Self {
        match error {
            VmError::IndexOutOfBounds { index, length } => {
                RuntimeError::IndexOutOfBounds { index, length }
            }
            other => RuntimeError::Vm(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceExceededError {
    #[error("evaluation stack overflow: depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },

    #[error("loop iteration limit of {max_iterations} exceeded")]
    IterationLimit { max_iterations: usize },
}

/// Why evaluation of a node did not produce a value.
///
/// Only [`Interrupt::Error`] is a failure of the evaluator itself; the other
/// variants are control flow that an enclosing node may absorb.
#[derive(Debug, Clone, PartialEq)]
pub enum Interrupt {
    Error(ExecutionError),
    /// An exception thrown by the debuggee or by a `throw` statement.
    Thrown { exception: ObjectRef, span: Span },
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

impl Interrupt {
    pub fn error(kind: impl Into<ExecutionErrorKind>, span: &Span) -> Self {
        Interrupt::Error(ExecutionError::new(kind, span.clone()))
    }

    /// Classify a debuggee failure: exceptions stay catchable, everything else
    /// is an evaluation error.
    pub fn from_vm(error: VmError, span: &Span) -> Self {
        match error {
            VmError::Exception(exception) => Interrupt::Thrown {
                exception,
                span: span.clone(),
            },
            other => Interrupt::error(RuntimeError::from(other), span),
        }
    }
}

/// Attach the span of the failing node to a lower-level error.
pub(crate) trait AtSpan<T> {
    fn at(self, span: &Span) -> Result<T, Interrupt>;
}

impl<T> AtSpan<T> for Result<T, VmError> {
    fn at(self, span: &Span) -> Result<T, Interrupt> {
        self.map_err(|error| Interrupt::from_vm(error, span))
    }
}

impl<T> AtSpan<T> for Result<T, RuntimeError> {
    fn at(self, span: &Span) -> Result<T, Interrupt> {
        self.map_err(|error| Interrupt::error(error, span))
    }
}

impl<T> AtSpan<T> for Result<T, CastError> {
    fn at(self, span: &Span) -> Result<T, Interrupt> {
        self.map_err(|error| Interrupt::error(RuntimeError::from(error), span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_index_errors_become_runtime_index_errors() {
        let error = RuntimeError::from(VmError::IndexOutOfBounds {
            index: 5,
            length: 2,
        });
        assert_eq!(
            error,
            RuntimeError::IndexOutOfBounds {
                index: 5,
                length: 2
            }
        );
        assert_eq!(error.to_string(), "index 5 out of bounds for length 2");
    }

    #[test]
    fn test_display_through_kind() {
        let error = ExecutionError::new(RuntimeError::DivisionByZero, Span(3..8));
        assert_eq!(error.to_string(), "division by zero");
        let error = ExecutionError::new(
            ResourceExceededError::StackOverflow {
                depth: 11,
                max_depth: 10,
            },
            Span(0..1),
        );
        assert!(error.to_string().contains("exceeds maximum of 10"));
    }

    #[test]
    fn test_debuggee_exceptions_stay_catchable() {
        let exception = ObjectRef::new(9, "java.lang.IllegalStateException");
        let interrupt = Interrupt::from_vm(VmError::Exception(exception.clone()), &Span(1..4));
        assert_eq!(
            interrupt,
            Interrupt::Thrown {
                exception,
                span: Span(1..4)
            }
        );
        let interrupt = Interrupt::from_vm(VmError::Disconnected, &Span(1..4));
        assert!(matches!(
            interrupt,
            Interrupt::Error(ExecutionError {
                kind: ExecutionErrorKind::Runtime(RuntimeError::Vm(VmError::Disconnected)),
                ..
            })
        ));
    }
}
