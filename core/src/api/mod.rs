//! Public API for compiling and evaluating code fragments.
//!
//! An [`Engine`] compiles the text typed into a debugger's "evaluate" box
//! against the classes of the debuggee, and the resulting
//! [`CompiledExpression`] runs it against a suspended frame through a
//! [`RemoteVm`](crate::remote::RemoteVm).
//!
//! # Example
//!
//! ```ignore
//! use jeval_core::api::{Engine, EngineOptions};
//! use jeval_core::evaluator::FrameContext;
//! use jeval_core::types::{ClassPath, CompileContext};
//!
//! let engine = Engine::new(ClassPath::with_builtins(), EngineOptions::default());
//! let context = CompileContext::in_class("com.example.Shop");
//! let expr = engine.compile("items.size() > limit", &context)?;
//!
//! let evaluation = expr.evaluate(&mut vm, &FrameContext::new(thread, frame))?;
//! println!("{}", evaluation.value);
//! ```

pub mod engine;
pub mod error;
pub mod expression;
pub mod options;

pub use engine::Engine;
pub use error::{Diagnostic, Error, RelatedInfo, Severity};
pub use expression::{CompiledExpression, Evaluation};
pub use options::{CompilationOptions, EngineOptions, ExecutionOptions};
