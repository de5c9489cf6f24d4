//! jeval - evaluation of Java code fragments in a debugger
//!
//! # Overview
//!
//! jeval compiles the code a user types into a debugger's "evaluate" box
//! (an expression, or a sequence of statements) and runs it against a
//! suspended frame of the debuggee. Everything the fragment reads, writes or
//! calls goes through a [`RemoteVm`], so the same engine works with any
//! debugger back end that can implement it.
//!
//! # Quick Start
//!
//! ```ignore
//! use jeval::{ClassPath, CompileContext, Engine, EngineOptions, FrameContext, JavaType, Value};
//! use jeval::remote::MockVm;
//!
//! let engine = Engine::new(ClassPath::with_builtins(), EngineOptions::default());
//! let context = CompileContext::new().local("n", JavaType::int());
//! let expr = engine.compile("int s = 0; for (int i = 1; i <= n; i++) s += i; s", &context)?;
//!
//! let mut vm = MockVm::new();
//! vm.set_local(1, 0, "n", Value::Int(4));
//! let result = expr.evaluate(&mut vm, &FrameContext::new(1, 0))?;
//! assert_eq!(result.value, Value::Int(10));
//! ```
//!
//! # Errors
//!
//! Compilation reports every problem before anything reaches the debuggee.
//! At run time, exceptions thrown in the debuggee and not caught by the
//! fragment come back as [`Error::Exception`], apart from failures of the
//! evaluation itself ([`Error::Runtime`]). [`render_error`] prints either
//! with the offending part of the fragment underlined.

mod error_renderer;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from jeval_core
pub use jeval_core::api::{
    CompilationOptions, CompiledExpression, Diagnostic, Engine, EngineOptions, Error, Evaluation,
    ExecutionOptions, RelatedInfo, Severity,
};

// Re-export commonly used types and values
pub use jeval_core::evaluator::{FrameContext, Modifier};
pub use jeval_core::remote::{self, RemoteVm, VmError};
pub use jeval_core::types::{
    self, ClassInfo, ClassPath, CompileContext, JavaType, LocalVariable, PrimitiveKind,
    SymbolResolver,
};
pub use jeval_core::values::{self, ObjectRef, Value};
