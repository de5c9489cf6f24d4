//! Tree-walking evaluator for compiled fragments.
//!
//! The evaluator runs an [`EvaluatorNode`] tree produced by the
//! [builder](crate::builder) against a suspended frame of the debuggee. Every
//! read, write and call goes through a [`RemoteVm`].
//!
//! ## Design Principles
//!
//! - **Never panic**: malformed trees and misbehaving debuggees surface as
//!   errors.
//! - **Stack-safe**: depth tracking stops runaway recursion, and an optional
//!   iteration limit stops runaway loops.
//! - **Reusable trees**: nodes hold no per-evaluation state; all of it lives in
//!   the [`ExecutionContext`].
//!
//! ## Example
//!
//! ```ignore
//! use jeval_core::evaluator::{self, EvaluatorOptions, FrameContext};
//!
//! let frame = FrameContext::new(thread, frame_id);
//! let result = evaluator::run(&mut vm, &frame, &EvaluatorOptions::default(), &root, None)?;
//! ```

mod coercion;
mod context;
mod error;
mod eval;
mod modifier;
mod node;
mod operators;

#[cfg(test)]
mod eval_test;

pub use context::{ExecutionContext, FrameContext, PinnedRefs};
pub use error::{
    ExecutionError, ExecutionErrorKind, Interrupt, ResourceExceededError, RuntimeError,
};
pub use modifier::Modifier;
pub use node::{
    BinaryOperation, CastTarget, CatchNode, Constant, EvaluatorNode, FieldTarget, Jump, LocalRef,
    LogicalOp, NodeKind, Receiver,
};

use context::Location;
use tracing::debug;

use crate::remote::RemoteVm;
use crate::types::JavaType;
use crate::values::Value;

/// Limits and switches for one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorOptions {
    /// Maximum evaluation stack depth.
    pub max_depth: usize,
    /// Maximum number of loop iterations, across all loops, if set.
    pub max_iterations: Option<usize>,
    /// Whether the fragment may call methods and constructors in the
    /// debuggee.
    pub allow_method_invocation: bool,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_iterations: None,
            allow_method_invocation: true,
        }
    }
}

/// Result of a completed evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub value: Value,
    /// Where the value was read from, when the root is a variable, field or
    /// array element.
    pub modifier: Option<Modifier>,
}

/// Evaluate `root` against `frame`.
///
/// `root_type` is the static type of the root when it is an lvalue; it enables
/// the [`Modifier`]. A `return` at top level yields its value. An uncaught
/// `break` or `continue` is an error. Exceptions thrown in the debuggee and not
/// caught by the fragment come back as [`Interrupt::Thrown`].
pub fn run(
    vm: &mut dyn RemoteVm,
    frame: &FrameContext,
    options: &EvaluatorOptions,
    root: &EvaluatorNode,
    root_type: Option<&JavaType>,
) -> Result<Outcome, Interrupt> {
    let mut context = ExecutionContext::new(vm, frame, options);
    let result = match root_type {
        Some(ty) if root.is_lvalue() => eval_lvalue(&mut context, root, ty),
        _ => context.eval(root).map(|value| Outcome {
            value,
            modifier: None,
        }),
    };
    debug!(
        iterations = context.iterations,
        pinned = context.pinned().len(),
        ok = result.is_ok(),
        "evaluation finished"
    );
    match result {
        Err(Interrupt::Return(value)) => Ok(Outcome {
            value,
            modifier: None,
        }),
        Err(Interrupt::Break(label)) => Err(stray_jump("break", label, root)),
        Err(Interrupt::Continue(label)) => Err(stray_jump("continue", label, root)),
        other => other,
    }
}

fn stray_jump(keyword: &str, label: Option<String>, root: &EvaluatorNode) -> Interrupt {
    let statement = match label {
        Some(label) => format!("{} {}", keyword, label),
        None => keyword.to_string(),
    };
    Interrupt::error(RuntimeError::StrayJump(statement), &root.span)
}

fn eval_lvalue(
    context: &mut ExecutionContext<'_>,
    root: &EvaluatorNode,
    ty: &JavaType,
) -> Result<Outcome, Interrupt> {
    let location = context.locate(root)?;
    let value = context.read(&location, &root.span)?;
    let modifier = match location {
        Location::Scoped(_) => None,
        Location::FrameLocal(name) => Some(Modifier::Local {
            thread: context.frame.thread,
            frame: context.frame.frame,
            name,
            ty: ty.clone(),
        }),
        Location::Field { object, field } => Some(Modifier::Field { object, field }),
        Location::StaticField(field) => Some(Modifier::StaticField { field }),
        Location::ArrayElement { array, index } => Some(Modifier::ArrayElement {
            array,
            index,
            element: ty.clone(),
        }),
    };
    Ok(Outcome { value, modifier })
}
