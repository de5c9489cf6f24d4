//! Method and constructor overload resolution (JLS 15.12.2).
//!
//! Applicable candidates are searched in three phases: strict invocation
//! (no boxing), loose invocation (boxing allowed) and variable arity. The
//! first phase with an applicable candidate wins, and within it the most
//! specific candidate is selected.

use tracing::trace;

use crate::casting::{ConversionContext, plan_conversion};
use crate::types::{JavaType, MethodInfo, SymbolResolver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Phase {
    Strict,
    Loose,
    VariableArity,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Selection {
    pub method: MethodInfo,
    pub phase: Phase,
}

impl Selection {
    /// Expected type of argument `index`: the declared parameter, or the
    /// element type of the varargs array for the packed tail.
    pub fn param_type(&self, index: usize) -> &JavaType {
        let params = &self.method.params;
        if self.phase == Phase::VariableArity && index + 1 >= params.len() {
            if let Some(element) = params.last().and_then(JavaType::element_type) {
                return element;
            }
        }
        &params[index.min(params.len().saturating_sub(1))]
    }

    /// Number of leading arguments passed as themselves; the rest are packed.
    pub fn fixed_arity(&self) -> usize {
        match self.phase {
            Phase::VariableArity => self.method.params.len().saturating_sub(1),
            Phase::Strict | Phase::Loose => self.method.params.len(),
        }
    }
}

fn converts<R: SymbolResolver + ?Sized>(
    from: &JavaType,
    to: &JavaType,
    context: ConversionContext,
    resolver: &R,
) -> bool {
    plan_conversion(from, to, context, resolver).is_ok()
}

fn applicable<R: SymbolResolver + ?Sized>(
    method: &MethodInfo,
    args: &[JavaType],
    phase: Phase,
    resolver: &R,
) -> bool {
    let params = &method.params;
    match phase {
        Phase::Strict | Phase::Loose => {
            let context = if phase == Phase::Strict {
                ConversionContext::Strict
            } else {
                ConversionContext::Loose
            };
            params.len() == args.len()
                && args
                    .iter()
                    .zip(params)
                    .all(|(arg, param)| converts(arg, param, context, resolver))
        }
        Phase::VariableArity => {
            let Some((last, fixed)) = params.split_last() else {
                return false;
            };
            let Some(element) = last.element_type() else {
                return false;
            };
            method.is_varargs
                && args.len() >= fixed.len()
                && args.iter().zip(fixed).all(|(arg, param)| {
                    converts(arg, param, ConversionContext::Loose, resolver)
                })
                && args[fixed.len()..]
                    .iter()
                    .all(|arg| converts(arg, element, ConversionContext::Loose, resolver))
        }
    }
}

/// `a` is more specific than `b` when each parameter of `a` converts to the
/// matching parameter of `b` without boxing.
fn more_specific<R: SymbolResolver + ?Sized>(a: &MethodInfo, b: &MethodInfo, resolver: &R) -> bool {
    a.params.len() == b.params.len()
        && a.params
            .iter()
            .zip(&b.params)
            .all(|(x, y)| converts(x, y, ConversionContext::Strict, resolver))
}

/// Pick the method `args` invoke among `candidates`, or `None` if none
/// applies.
///
/// When no candidate is strictly more specific than all the others the first
/// one, in declaration order, is taken.
pub(super) fn select<R: SymbolResolver + ?Sized>(
    candidates: &[MethodInfo],
    args: &[JavaType],
    resolver: &R,
) -> Option<Selection> {
    for phase in [Phase::Strict, Phase::Loose, Phase::VariableArity] {
        let applicable: Vec<&MethodInfo> = candidates
            .iter()
            .filter(|m| applicable(m, args, phase, resolver))
            .collect();
        let Some(first) = applicable.first() else {
            continue;
        };
        let best = applicable
            .iter()
            .find(|m| {
                applicable
                    .iter()
                    .all(|other| core::ptr::eq(**m, *other) || more_specific(m, other, resolver))
            })
            .unwrap_or(first);
        trace!(method = %best, ?phase, candidates = applicable.len(), "overload selected");
        return Some(Selection {
            method: (*best).clone(),
            phase,
        });
    }
    None
}
