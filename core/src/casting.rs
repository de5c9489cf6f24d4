//! Primitive casts and conversion planning.
//!
//! [`cast_primitive`] is the run-time half: it reinterprets a primitive value
//! as another primitive kind. [`plan_conversion`] is the build-time half: it
//! decides which coercion steps (casts, boxing, unboxing, reference checks)
//! turn a value of one static type into another, for each conversion context.

use smallvec::SmallVec;
use thiserror::Error;

use crate::types::{JavaType, PrimitiveKind, SymbolResolver};
use crate::values::Value;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    #[error("cannot convert {from} to {to}")]
    Incompatible { from: JavaType, to: JavaType },

    #[error("cannot convert null to {to}")]
    NullToPrimitive { to: PrimitiveKind },

    #[error("{value_type} is not a primitive value")]
    NotPrimitive { value_type: JavaType },
}

/// Integral kinds are held exactly in `i64`; `float` is held exactly in `f64`.
enum Numeric {
    Integral(i64),
    Floating(f64),
}

fn numeric(value: &Value) -> Option<Numeric> {
    match value {
        Value::Byte(v) => Some(Numeric::Integral(i64::from(*v))),
        Value::Short(v) => Some(Numeric::Integral(i64::from(*v))),
        Value::Char(v) => Some(Numeric::Integral(i64::from(*v))),
        Value::Int(v) => Some(Numeric::Integral(i64::from(*v))),
        Value::Long(v) => Some(Numeric::Integral(*v)),
        Value::Float(v) => Some(Numeric::Floating(f64::from(*v))),
        Value::Double(v) => Some(Numeric::Floating(*v)),
        Value::Null | Value::Void | Value::Boolean(_) | Value::Object(_) => None,
    }
}

/// Cast a primitive value to `target` with Java semantics.
///
/// Narrowing integral casts truncate to the low bits, floating to integral
/// casts round toward zero and saturate (NaN becomes zero), and casts from
/// floating to `byte`, `short` or `char` go through `int` first.
pub fn cast_primitive(value: &Value, target: PrimitiveKind) -> Result<Value, CastError> {
    if value.is_null() {
        return Err(CastError::NullToPrimitive { to: target });
    }
    let Some(source) = value.primitive_kind() else {
        return Err(CastError::NotPrimitive {
            value_type: value.type_of(),
        });
    };
    if source == target {
        return Ok(value.clone());
    }
    let incompatible = || CastError::Incompatible {
        from: source.into(),
        to: target.into(),
    };
    if target == PrimitiveKind::Boolean {
        return Err(incompatible());
    }
    let Some(number) = numeric(value) else {
        return Err(incompatible());
    };

    let result = match target {
        PrimitiveKind::Boolean => return Err(incompatible()),
        PrimitiveKind::Byte => Value::Byte(match number {
            Numeric::Integral(v) => v as i8,
            Numeric::Floating(v) => (v as i32) as i8,
        }),
        PrimitiveKind::Short => Value::Short(match number {
            Numeric::Integral(v) => v as i16,
            Numeric::Floating(v) => (v as i32) as i16,
        }),
        PrimitiveKind::Char => Value::Char(match number {
            Numeric::Integral(v) => v as u16,
            Numeric::Floating(v) => (v as i32) as u16,
        }),
        PrimitiveKind::Int => Value::Int(match number {
            Numeric::Integral(v) => v as i32,
            Numeric::Floating(v) => v as i32,
        }),
        PrimitiveKind::Long => Value::Long(match number {
            Numeric::Integral(v) => v,
            Numeric::Floating(v) => v as i64,
        }),
        PrimitiveKind::Float => Value::Float(match number {
            Numeric::Integral(v) => v as f32,
            Numeric::Floating(v) => v as f32,
        }),
        PrimitiveKind::Double => Value::Double(match number {
            Numeric::Integral(v) => v as f64,
            Numeric::Floating(v) => v,
        }),
    };
    Ok(result)
}

/// Where a conversion happens; each context allows a different set of
/// conversions (JLS 5.2, 5.3, 5.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionContext {
    /// Strict invocation: identity, widening primitive and widening reference.
    Strict,
    /// Loose invocation: strict plus boxing and unboxing.
    Loose,
    /// Assignment: loose plus narrowing of `int` constants that fit.
    Assignment { constant: Option<i32> },
    /// Explicit cast.
    Cast,
}

/// One coercion the evaluator performs on a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStep {
    /// Primitive widening or narrowing to the given kind.
    Primitive(PrimitiveKind),
    Box(PrimitiveKind),
    Unbox(PrimitiveKind),
    /// Reference narrowing, checked at run time.
    CheckCast(JavaType),
}

/// Ordered steps turning a value of one type into another; empty for identity.
pub type Conversion = SmallVec<[ConversionStep; 2]>;

/// Decide how to convert a value of static type `from` to `to`.
pub fn plan_conversion<R: SymbolResolver + ?Sized>(
    from: &JavaType,
    to: &JavaType,
    context: ConversionContext,
    resolver: &R,
) -> Result<Conversion, CastError> {
    let mut steps = Conversion::new();
    if from == to {
        return Ok(steps);
    }
    let incompatible = || CastError::Incompatible {
        from: from.clone(),
        to: to.clone(),
    };
    let boxing_allowed = !matches!(context, ConversionContext::Strict);

    match (from, to) {
        (JavaType::Void, _) | (_, JavaType::Void) | (_, JavaType::Null) => Err(incompatible()),

        (JavaType::Primitive(source), JavaType::Primitive(target)) => {
            let allowed = match context {
                ConversionContext::Cast => source.is_numeric() == target.is_numeric(),
                ConversionContext::Assignment { constant } => {
                    source.widens_to(*target) || fits_constant(*source, *target, constant)
                }
                ConversionContext::Strict | ConversionContext::Loose => source.widens_to(*target),
            };
            if !allowed {
                return Err(incompatible());
            }
            steps.push(ConversionStep::Primitive(*target));
            Ok(steps)
        }

        (JavaType::Primitive(source), target) => {
            if !boxing_allowed {
                return Err(incompatible());
            }
            // `Byte b = 1`: narrow the constant, then box it.
            if let ConversionContext::Assignment { constant } = context {
                if let Some(kind) = target.unboxed() {
                    if kind != *source && fits_constant(*source, kind, constant) {
                        steps.push(ConversionStep::Primitive(kind));
                        steps.push(ConversionStep::Box(kind));
                        return Ok(steps);
                    }
                }
            }
            let wrapper = JavaType::class(source.wrapper_class());
            if !resolver.is_subtype(&wrapper, target) {
                return Err(incompatible());
            }
            steps.push(ConversionStep::Box(*source));
            Ok(steps)
        }

        (source, JavaType::Primitive(target)) => {
            if !boxing_allowed {
                return Err(incompatible());
            }
            if let Some(kind) = source.unboxed() {
                let allowed = match context {
                    ConversionContext::Cast => kind == *target || kind.widens_to(*target),
                    _ => kind.widens_to(*target),
                };
                if !allowed {
                    return Err(incompatible());
                }
                steps.push(ConversionStep::Unbox(kind));
                if kind != *target {
                    steps.push(ConversionStep::Primitive(*target));
                }
                return Ok(steps);
            }
            // `(int) object`: check the wrapper class, then unbox.
            let wrapper = JavaType::class(target.wrapper_class());
            if context == ConversionContext::Cast && resolver.is_subtype(&wrapper, source) {
                steps.push(ConversionStep::CheckCast(wrapper));
                steps.push(ConversionStep::Unbox(*target));
                return Ok(steps);
            }
            Err(incompatible())
        }

        (source, target) => {
            if resolver.is_subtype(source, target) {
                return Ok(steps);
            }
            if context == ConversionContext::Cast && castable_reference(source, target, resolver) {
                steps.push(ConversionStep::CheckCast(target.clone()));
                return Ok(steps);
            }
            Err(incompatible())
        }
    }
}

/// JLS 5.2: an `int` constant (or narrower) may narrow to `byte`, `short` or
/// `char` when its value is representable.
pub(crate) fn fits_constant(source: PrimitiveKind, target: PrimitiveKind, constant: Option<i32>) -> bool {
    let Some(value) = constant else {
        return false;
    };
    if !matches!(
        source,
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char | PrimitiveKind::Int
    ) {
        return false;
    }
    match target {
        PrimitiveKind::Byte => i8::try_from(value).is_ok(),
        PrimitiveKind::Short => i16::try_from(value).is_ok(),
        PrimitiveKind::Char => u16::try_from(value).is_ok(),
        _ => false,
    }
}

/// Narrowing reference conversion (JLS 5.1.6), approximated from what the
/// resolver knows about the two types.
fn castable_reference<R: SymbolResolver + ?Sized>(
    source: &JavaType,
    target: &JavaType,
    resolver: &R,
) -> bool {
    if resolver.is_subtype(target, source) {
        return true;
    }
    let is_interface = |ty: &JavaType| {
        ty.class_name()
            .and_then(|name| resolver.class(name))
            .is_some_and(|info| info.is_interface)
    };
    match (source, target) {
        (JavaType::Class(_), JavaType::Class(_)) => is_interface(source) || is_interface(target),
        (JavaType::Array(a), JavaType::Array(b)) if a.is_reference() && b.is_reference() => {
            castable_reference(a, b, resolver)
        }
        _ => false,
    }
}
