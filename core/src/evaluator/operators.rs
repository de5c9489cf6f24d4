//! Binary and unary operator implementations.
//!
//! Operands arrive already promoted to the operation kind chosen by the
//! builder; the helpers below only re-check that with [`cast_primitive`].

use crate::casting::cast_primitive;
use crate::evaluator::RuntimeError;
use crate::parser::{BinaryOp, ComparisonOp, UnaryOp};
use crate::types::PrimitiveKind;
use crate::values::Value;

fn unexpected(expected: impl Into<String>, found: impl ToString) -> RuntimeError {
    RuntimeError::UnexpectedValue {
        expected: expected.into(),
        found: found.to_string(),
    }
}

fn operand(value: &Value, kind: PrimitiveKind) -> Result<Value, RuntimeError> {
    Ok(cast_primitive(value, kind)?)
}

/// `+ - * / %` and `& | ^` with Java semantics.
///
/// Integer arithmetic wraps; integer division or remainder by zero fails.
/// Floating point follows IEEE 754.
pub(super) fn arithmetic(
    op: BinaryOp,
    kind: PrimitiveKind,
    left: &Value,
    right: &Value,
) -> Result<Value, RuntimeError> {
    match (operand(left, kind)?, operand(right, kind)?) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(match op {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div | BinaryOp::Rem if r == 0 => return Err(RuntimeError::DivisionByZero),
            // Wrapping handles MIN / -1.
            BinaryOp::Div => l.wrapping_div(r),
            BinaryOp::Rem => l.wrapping_rem(r),
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitOr => l | r,
            BinaryOp::BitXor => l ^ r,
            other => return Err(unexpected("arithmetic operator", other)),
        })),
        (Value::Long(l), Value::Long(r)) => Ok(Value::Long(match op {
            BinaryOp::Add => l.wrapping_add(r),
            BinaryOp::Sub => l.wrapping_sub(r),
            BinaryOp::Mul => l.wrapping_mul(r),
            BinaryOp::Div | BinaryOp::Rem if r == 0 => return Err(RuntimeError::DivisionByZero),
            BinaryOp::Div => l.wrapping_div(r),
            BinaryOp::Rem => l.wrapping_rem(r),
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitOr => l | r,
            BinaryOp::BitXor => l ^ r,
            other => return Err(unexpected("arithmetic operator", other)),
        })),
        (Value::Float(l), Value::Float(r)) => Ok(Value::Float(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            BinaryOp::Rem => l % r,
            other => return Err(unexpected("floating point operator", other)),
        })),
        (Value::Double(l), Value::Double(r)) => Ok(Value::Double(match op {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            BinaryOp::Rem => l % r,
            other => return Err(unexpected("floating point operator", other)),
        })),
        (Value::Boolean(l), Value::Boolean(r)) => Ok(Value::Boolean(match op {
            BinaryOp::BitAnd => l & r,
            BinaryOp::BitOr => l | r,
            BinaryOp::BitXor => l ^ r,
            other => return Err(unexpected("boolean operator", other)),
        })),
        (l, _) => Err(unexpected("int, long, float, double or boolean", l.type_of())),
    }
}

/// `<< >> >>>`. Only the low 5 (int) or 6 (long) bits of the distance count.
pub(super) fn shift(
    op: BinaryOp,
    kind: PrimitiveKind,
    left: &Value,
    right: &Value,
) -> Result<Value, RuntimeError> {
    let distance = right
        .as_integral()
        .ok_or_else(|| unexpected("integral shift distance", right.type_of()))?;
    match operand(left, kind)? {
        Value::Int(l) => {
            let d = (distance & 0x1f) as u32;
            Ok(Value::Int(match op {
                BinaryOp::Shl => l.wrapping_shl(d),
                BinaryOp::Shr => l >> d,
                BinaryOp::UShr => ((l as u32) >> d) as i32,
                other => return Err(unexpected("shift operator", other)),
            }))
        }
        Value::Long(l) => {
            let d = (distance & 0x3f) as u32;
            Ok(Value::Long(match op {
                BinaryOp::Shl => l.wrapping_shl(d),
                BinaryOp::Shr => l >> d,
                BinaryOp::UShr => ((l as u64) >> d) as i64,
                other => return Err(unexpected("shift operator", other)),
            }))
        }
        other => Err(unexpected("int or long", other.type_of())),
    }
}

/// Numeric comparisons and boolean equality. Any comparison involving NaN is
/// false, except `!=`.
pub(super) fn compare(
    op: ComparisonOp,
    kind: PrimitiveKind,
    left: &Value,
    right: &Value,
) -> Result<bool, RuntimeError> {
    let (left, right) = (operand(left, kind)?, operand(right, kind)?);
    if let (Value::Boolean(l), Value::Boolean(r)) = (&left, &right) {
        return match op {
            ComparisonOp::Eq => Ok(l == r),
            ComparisonOp::Neq => Ok(l != r),
            other => Err(unexpected("== or != on booleans", other)),
        };
    }
    if kind.is_integral() {
        let (Some(l), Some(r)) = (left.as_integral(), right.as_integral()) else {
            return Err(unexpected(kind.name(), left.type_of()));
        };
        return Ok(ordered(op, l, r));
    }
    match (left, right) {
        (Value::Float(l), Value::Float(r)) => Ok(ordered(op, l, r)),
        (Value::Double(l), Value::Double(r)) => Ok(ordered(op, l, r)),
        (l, _) => Err(unexpected(kind.name(), l.type_of())),
    }
}

fn ordered<T: PartialOrd>(op: ComparisonOp, l: T, r: T) -> bool {
    match op {
        ComparisonOp::Eq => l == r,
        ComparisonOp::Neq => l != r,
        ComparisonOp::Lt => l < r,
        ComparisonOp::Gt => l > r,
        ComparisonOp::Le => l <= r,
        ComparisonOp::Ge => l >= r,
    }
}

pub(super) fn unary(op: UnaryOp, kind: PrimitiveKind, value: &Value) -> Result<Value, RuntimeError> {
    let value = operand(value, kind)?;
    match (op, value) {
        (UnaryOp::Plus, v @ (Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_))) => {
            Ok(v)
        }
        (UnaryOp::Neg, Value::Int(v)) => Ok(Value::Int(v.wrapping_neg())),
        (UnaryOp::Neg, Value::Long(v)) => Ok(Value::Long(v.wrapping_neg())),
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Neg, Value::Double(v)) => Ok(Value::Double(-v)),
        (UnaryOp::BitNot, Value::Int(v)) => Ok(Value::Int(!v)),
        (UnaryOp::BitNot, Value::Long(v)) => Ok(Value::Long(!v)),
        (UnaryOp::Not, Value::Boolean(v)) => Ok(Value::Boolean(!v)),
        (op, v) => Err(unexpected(format!("operand of unary {}", op), v.type_of())),
    }
}
