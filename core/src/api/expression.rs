//! Compiled code fragments.

use static_assertions::assert_impl_all;

use super::{Error, ExecutionOptions};
use crate::builder::BuiltFragment;
use crate::evaluator::{self, EvaluatorOptions, FrameContext, Interrupt, Modifier, RuntimeError};
use crate::remote::RemoteVm;
use crate::types::JavaType;
use crate::values::Value;

/// Result of evaluating a fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    /// Where the value came from, when the fragment is a single variable,
    /// field or array element expression. Lets a debugger offer "set value".
    pub modifier: Option<Modifier>,
}

/// A compiled fragment ready for evaluation.
///
/// The evaluator tree is immutable: every evaluation gets a fresh execution
/// context, so the same expression can be evaluated repeatedly, on different
/// frames, or from several threads.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    built: BuiltFragment,
    source: String,
    options: ExecutionOptions,
}

assert_impl_all!(CompiledExpression: Send, Sync);

impl CompiledExpression {
    pub(crate) fn new(built: BuiltFragment, source: &str, options: ExecutionOptions) -> Self {
        Self {
            built,
            source: source.to_string(),
            options,
        }
    }

    /// Evaluate against a suspended frame with the engine's default execution
    /// options.
    pub fn evaluate(&self, vm: &mut dyn RemoteVm, frame: &FrameContext) -> Result<Evaluation, Error> {
        self.evaluate_with_options(vm, frame, &self.options)
    }

    /// Evaluate against a suspended frame with explicit execution options.
    ///
    /// References pinned during the evaluation are released before this
    /// returns, whatever the outcome.
    pub fn evaluate_with_options(
        &self,
        vm: &mut dyn RemoteVm,
        frame: &FrameContext,
        options: &ExecutionOptions,
    ) -> Result<Evaluation, Error> {
        let root_type = self.built.is_expression.then_some(&self.built.result_type);
        let outcome = evaluator::run(
            vm,
            frame,
            &EvaluatorOptions::from(options),
            &self.built.root,
            root_type,
        );
        match outcome {
            Ok(outcome) => Ok(Evaluation {
                value: outcome.value,
                modifier: outcome.modifier,
            }),
            Err(Interrupt::Error(error)) => Err(Error::from_execution(error, &self.source)),
            Err(Interrupt::Thrown { exception, span }) => Err(Error::Exception {
                exception,
                span,
                src: self.source.clone(),
            }),
            Err(Interrupt::Return(value)) => Ok(Evaluation {
                value,
                modifier: None,
            }),
            Err(Interrupt::Break(_) | Interrupt::Continue(_)) => {
                let error = evaluator::ExecutionError::new(
                    RuntimeError::StrayJump("jump".to_string()),
                    self.built.root.span.clone(),
                );
                Err(Error::from_execution(error, &self.source))
            }
        }
    }

    /// Static type of the fragment's value; `void` for statements.
    pub fn result_type(&self) -> &JavaType {
        &self.built.result_type
    }

    /// Whether the fragment is a single expression.
    pub fn is_expression(&self) -> bool {
        self.built.is_expression
    }

    /// Source text the expression was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }
}
