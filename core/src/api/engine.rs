//! The compilation engine.

use bumpalo::Bump;
use tracing::debug;

use super::{CompilationOptions, CompiledExpression, EngineOptions, Error};
use crate::types::{CompileContext, SymbolResolver};
use crate::{builder, parser};

/// Compiles code fragments against the classes of a debuggee.
///
/// The engine owns the [`SymbolResolver`] that answers questions about
/// classes, fields and methods, and the default options for compilation and
/// evaluation. Compiled expressions own everything they need and can be kept
/// and evaluated any number of times, on any frame of a matching context.
///
/// # Example
///
/// ```ignore
/// use jeval_core::api::{Engine, EngineOptions};
/// use jeval_core::evaluator::FrameContext;
/// use jeval_core::remote::MockVm;
/// use jeval_core::types::{ClassPath, CompileContext, JavaType};
///
/// let engine = Engine::new(ClassPath::with_builtins(), EngineOptions::default());
/// let context = CompileContext::new().local("x", JavaType::int());
/// let expr = engine.compile("x * 2 + 1", &context)?;
///
/// let mut vm = MockVm::new();
/// vm.set_local(1, 0, "x", Value::Int(20));
/// let result = expr.evaluate(&mut vm, &FrameContext::new(1, 0))?;
/// assert_eq!(result.value, Value::Int(41));
/// ```
#[derive(Debug, Clone)]
pub struct Engine<R> {
    resolver: R,
    options: EngineOptions,
}

impl<R: SymbolResolver> Engine<R> {
    pub fn new(resolver: R, options: EngineOptions) -> Self {
        Self { resolver, options }
    }

    /// Access the symbol resolver.
    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Access the symbol resolver, e.g. to register classes loaded since the
    /// engine was created.
    pub fn resolver_mut(&mut self) -> &mut R {
        &mut self.resolver
    }

    /// Access the engine options.
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Compile a fragment with the engine's default compilation options.
    ///
    /// `context` describes where the fragment will be evaluated: the class of
    /// the suspended method, whether it is static, the frame's visible locals
    /// and any labels the debugger defined.
    pub fn compile(&self, source: &str, context: &CompileContext) -> Result<CompiledExpression, Error> {
        self.compile_with_options(source, context, &self.options.default_compilation_options)
    }

    /// Compile a fragment with explicit compilation options.
    pub fn compile_with_options(
        &self,
        source: &str,
        context: &CompileContext,
        options: &CompilationOptions,
    ) -> Result<CompiledExpression, Error> {
        let arena = Bump::new();
        let parsed = parser::parse_with_max_depth(&arena, source, options.max_nesting_depth)
            .map_err(|e| Error::from_parse(&e, source))?;
        let built = builder::build(&parsed, context, &self.resolver)
            .map_err(|e| Error::from_build(&e, source))?;
        debug!(
            result_type = %built.result_type,
            expression = built.is_expression,
            "fragment compiled"
        );
        Ok(CompiledExpression::new(
            built,
            source,
            self.options.default_execution_options.clone(),
        ))
    }
}
