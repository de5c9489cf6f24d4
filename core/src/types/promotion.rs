//! Numeric promotion (JLS 5.6).

use super::PrimitiveKind;

/// Unary numeric promotion: `byte`, `short` and `char` become `int`,
/// every other numeric kind is unchanged.
///
/// Returns `None` for `boolean`.
pub fn unary_numeric_promotion(kind: PrimitiveKind) -> Option<PrimitiveKind> {
    match kind {
        PrimitiveKind::Boolean => None,
        PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Char | PrimitiveKind::Int => {
            Some(PrimitiveKind::Int)
        }
        PrimitiveKind::Long => Some(PrimitiveKind::Long),
        PrimitiveKind::Float => Some(PrimitiveKind::Float),
        PrimitiveKind::Double => Some(PrimitiveKind::Double),
    }
}

/// Binary numeric promotion over the lattice `double > float > long > int`.
///
/// Returns `None` when either operand is `boolean`.
pub fn binary_numeric_promotion(
    left: PrimitiveKind,
    right: PrimitiveKind,
) -> Option<PrimitiveKind> {
    let left = unary_numeric_promotion(left)?;
    let right = unary_numeric_promotion(right)?;
    Some(rank_max(left, right))
}

fn rank(kind: PrimitiveKind) -> u8 {
    match kind {
        PrimitiveKind::Int => 0,
        PrimitiveKind::Long => 1,
        PrimitiveKind::Float => 2,
        PrimitiveKind::Double => 3,
        // Already promoted away.
        PrimitiveKind::Boolean
        | PrimitiveKind::Byte
        | PrimitiveKind::Short
        | PrimitiveKind::Char => 0,
    }
}

fn rank_max(left: PrimitiveKind, right: PrimitiveKind) -> PrimitiveKind {
    if rank(left) >= rank(right) { left } else { right }
}
