//! Configuration options for the evaluation engine.

use crate::evaluator::EvaluatorOptions;
use crate::parser::DEFAULT_MAX_DEPTH;

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use jeval_core::api::CompilationOptions;
///
/// let options = CompilationOptions::default();
/// assert_eq!(options.max_nesting_depth, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationOptions {
    /// Deepest expression nesting the parser accepts.
    ///
    /// Default: 500
    pub max_nesting_depth: usize,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Configuration options for evaluating a compiled fragment.
///
/// # Example
///
/// ```
/// use jeval_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_depth: 500,
///     max_iterations: Some(10_000),
///     allow_method_invocation: false,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOptions {
    /// Maximum evaluation stack depth (for recursion protection).
    ///
    /// Default: 1000
    pub max_depth: usize,

    /// Maximum number of loop iterations, across all loops (if Some).
    ///
    /// Default: None
    pub max_iterations: Option<usize>,

    /// Whether the fragment may run methods and constructors in the debuggee.
    /// Boxing through `valueOf` and string conversion through `toString` are
    /// not affected.
    ///
    /// Default: true
    pub allow_method_invocation: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_iterations: None,
            allow_method_invocation: true,
        }
    }
}

impl From<&ExecutionOptions> for EvaluatorOptions {
    fn from(options: &ExecutionOptions) -> Self {
        EvaluatorOptions {
            max_depth: options.max_depth,
            max_iterations: options.max_iterations,
            allow_method_invocation: options.allow_method_invocation,
        }
    }
}

/// Configuration options for the engine.
///
/// These set the defaults for compilation and execution, which can be
/// overridden on a per-call basis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// Default options for compilation.
    ///
    /// These can be overridden with `Engine::compile_with_options()`.
    pub default_compilation_options: CompilationOptions,

    /// Default options for execution.
    ///
    /// These can be overridden with `CompiledExpression::evaluate_with_options()`.
    pub default_execution_options: ExecutionOptions,
}
