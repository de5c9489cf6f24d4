//! Handles to values living in the debuggee.
//!
//! Primitives are copied by value; everything else is an [`ObjectRef`] that
//! only means something to the [`RemoteVm`](crate::remote::RemoteVm) that
//! produced it.

pub mod format;

use core::fmt;

use crate::types::{JavaType, PrimitiveKind};

/// Remote object identifier, unique within one debuggee.
pub type ObjectId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub id: ObjectId,
    /// Source-style name of the object's runtime class (`java.lang.String`,
    /// `int[]`).
    pub runtime_type: String,
}

impl ObjectRef {
    pub fn new(id: ObjectId, runtime_type: impl Into<String>) -> Self {
        Self {
            id,
            runtime_type: runtime_type.into(),
        }
    }

    pub fn ty(&self) -> JavaType {
        JavaType::from_name(&self.runtime_type)
    }

    pub fn is_array(&self) -> bool {
        self.runtime_type.ends_with("[]")
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.runtime_type, self.id)
    }
}

/// A value as read from or written to the debuggee.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    /// Result of a `void` method or of a statement.
    Void,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    /// UTF-16 code unit.
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Object(ObjectRef),
}

impl Value {
    /// Default value of a field or array element of primitive `kind`.
    pub fn zero(kind: PrimitiveKind) -> Value {
        match kind {
            PrimitiveKind::Boolean => Value::Boolean(false),
            PrimitiveKind::Byte => Value::Byte(0),
            PrimitiveKind::Short => Value::Short(0),
            PrimitiveKind::Char => Value::Char(0),
            PrimitiveKind::Int => Value::Int(0),
            PrimitiveKind::Long => Value::Long(0),
            PrimitiveKind::Float => Value::Float(0.0),
            PrimitiveKind::Double => Value::Double(0.0),
        }
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Value::Boolean(_) => Some(PrimitiveKind::Boolean),
            Value::Byte(_) => Some(PrimitiveKind::Byte),
            Value::Short(_) => Some(PrimitiveKind::Short),
            Value::Char(_) => Some(PrimitiveKind::Char),
            Value::Int(_) => Some(PrimitiveKind::Int),
            Value::Long(_) => Some(PrimitiveKind::Long),
            Value::Float(_) => Some(PrimitiveKind::Float),
            Value::Double(_) => Some(PrimitiveKind::Double),
            Value::Null | Value::Void | Value::Object(_) => None,
        }
    }

    /// Runtime type of the value.
    pub fn type_of(&self) -> JavaType {
        match self {
            Value::Null => JavaType::Null,
            Value::Void => JavaType::Void,
            Value::Object(object) => object.ty(),
            _ => match self.primitive_kind() {
                Some(kind) => JavaType::Primitive(kind),
                None => JavaType::Void,
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral value widened to `i64`, for indices and lengths.
    pub fn as_integral(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Char(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_primitive(&self) -> bool {
        self.primitive_kind().is_some()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Void => write!(f, "void"),
            Value::Char(c) => write!(f, "'{}'", format::char_to_string(*c)),
            Value::Object(object) => write!(f, "{}", object),
            primitive => match format::primitive_to_string(primitive) {
                Some(text) => f.write_str(&text),
                None => write!(f, "{:?}", primitive),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_of() {
        assert_eq!(Value::Int(1).type_of(), JavaType::int());
        assert_eq!(Value::Null.type_of(), JavaType::Null);
        let array = Value::Object(ObjectRef::new(3, "int[]"));
        assert_eq!(array.type_of(), JavaType::array_of(JavaType::int()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Double(2.5).to_string(), "2.5");
        assert_eq!(Value::Char(u16::from(b'x')).to_string(), "'x'");
        assert_eq!(
            Value::Object(ObjectRef::new(12, "java.lang.Object")).to_string(),
            "java.lang.Object@12"
        );
    }

    #[test]
    fn test_zero_matches_kind() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(Value::zero(kind).primitive_kind(), Some(kind));
        }
    }
}
