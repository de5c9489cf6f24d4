//! Lowering of parsed fragments to evaluator trees.
//!
//! The builder resolves every name against a [`CompileContext`] and a
//! [`SymbolResolver`], type-checks the fragment with Java's conversion rules
//! and selects overloads, so that a fragment which builds only fails at run
//! time for reasons the debuggee decides (exceptions, nulls, disconnects).

mod builder;
mod error;
mod overload;
mod scope;

#[cfg(test)]
mod builder_test;

pub use error::{BuildError, BuildErrorKind};

use crate::evaluator::EvaluatorNode;
use crate::parser::ParsedFragment;
use crate::types::{CompileContext, JavaType, SymbolResolver};

/// A fragment ready to be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltFragment {
    pub root: EvaluatorNode,
    /// Static type of the fragment's value; `void` when it has none.
    pub result_type: JavaType,
    /// Whether the fragment is a single expression. Only then can its value
    /// carry a modifier.
    pub is_expression: bool,
}

/// Build the evaluator tree of `parsed`, evaluated in `context`.
pub fn build(
    parsed: &ParsedFragment<'_>,
    context: &CompileContext,
    resolver: &dyn SymbolResolver,
) -> Result<BuiltFragment, BuildError> {
    builder::Builder::new(parsed, context, resolver).build()
}
