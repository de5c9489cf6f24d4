use core::fmt;

use super::PrimitiveKind;
use crate::values::Value;

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";
pub const CLASS: &str = "java.lang.Class";
pub const THROWABLE: &str = "java.lang.Throwable";
pub const ITERABLE: &str = "java.lang.Iterable";
pub const ITERATOR: &str = "java.util.Iterator";

/// Static type of an expression, or runtime type of a value.
///
/// Generic type arguments are erased: `List<String>` is `Class("java.util.List")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JavaType {
    Primitive(PrimitiveKind),
    Void,
    /// The type of the `null` literal.
    Null,
    /// A class or interface, by fully qualified binary name (`a.b.Outer$Inner`).
    Class(String),
    Array(Box<JavaType>),
}

impl JavaType {
    pub fn boolean() -> Self {
        JavaType::Primitive(PrimitiveKind::Boolean)
    }

    pub fn int() -> Self {
        JavaType::Primitive(PrimitiveKind::Int)
    }

    pub fn long() -> Self {
        JavaType::Primitive(PrimitiveKind::Long)
    }

    pub fn double() -> Self {
        JavaType::Primitive(PrimitiveKind::Double)
    }

    pub fn class(name: impl Into<String>) -> Self {
        JavaType::Class(name.into())
    }

    pub fn object() -> Self {
        JavaType::Class(OBJECT.to_string())
    }

    pub fn string() -> Self {
        JavaType::Class(STRING.to_string())
    }

    pub fn array_of(element: JavaType) -> Self {
        JavaType::Array(Box::new(element))
    }

    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match self {
            JavaType::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match self {
            JavaType::Class(name) => Some(name),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&JavaType> {
        match self {
            JavaType::Array(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, JavaType::Class(_) | JavaType::Array(_) | JavaType::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, JavaType::Class(name) if name == STRING)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, JavaType::Primitive(PrimitiveKind::Boolean))
    }

    /// Primitive kind this type unboxes to, if it is a wrapper class.
    pub fn unboxed(&self) -> Option<PrimitiveKind> {
        match self {
            JavaType::Class(name) => PrimitiveKind::from_wrapper_class(name),
            _ => None,
        }
    }

    /// Wrapper class type for a primitive type.
    pub fn boxed(&self) -> Option<JavaType> {
        self.as_primitive()
            .map(|kind| JavaType::class(kind.wrapper_class()))
    }

    /// Primitive kind of this type after unboxing, if any.
    pub fn primitive_or_unboxed(&self) -> Option<PrimitiveKind> {
        self.as_primitive().or_else(|| self.unboxed())
    }

    /// Numeric primitive kind after unboxing, if any.
    pub fn numeric_kind(&self) -> Option<PrimitiveKind> {
        self.primitive_or_unboxed().filter(|kind| kind.is_numeric())
    }

    /// Zero value a variable of this type holds before it is assigned.
    pub fn default_value(&self) -> Value {
        match self {
            JavaType::Primitive(kind) => Value::zero(*kind),
            JavaType::Void => Value::Void,
            JavaType::Null | JavaType::Class(_) | JavaType::Array(_) => Value::Null,
        }
    }

    /// JNI type signature (`I`, `Ljava/lang/String;`, `[I`).
    pub fn signature(&self) -> String {
        match self {
            JavaType::Primitive(kind) => kind.descriptor().to_string(),
            JavaType::Void => "V".to_string(),
            JavaType::Null => format!("L{};", OBJECT.replace('.', "/")),
            JavaType::Class(name) => format!("L{};", name.replace('.', "/")),
            JavaType::Array(element) => format!("[{}", element.signature()),
        }
    }

    /// Parse a source-style type name as reported for runtime types
    /// (`int`, `java.lang.String`, `int[][]`).
    pub fn from_name(name: &str) -> JavaType {
        if let Some(element) = name.strip_suffix("[]") {
            return JavaType::array_of(JavaType::from_name(element));
        }
        if name == "void" {
            return JavaType::Void;
        }
        match PrimitiveKind::from_name(name) {
            Some(kind) => JavaType::Primitive(kind),
            None => JavaType::Class(name.to_string()),
        }
    }
}

impl From<PrimitiveKind> for JavaType {
    fn from(kind: PrimitiveKind) -> Self {
        JavaType::Primitive(kind)
    }
}

impl fmt::Display for JavaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaType::Primitive(kind) => write!(f, "{}", kind),
            JavaType::Void => write!(f, "void"),
            JavaType::Null => write!(f, "null"),
            JavaType::Class(name) => write!(f, "{}", name),
            JavaType::Array(element) => write!(f, "{}[]", element),
        }
    }
}

/// Build a JNI method signature from parameter and return types.
pub fn method_signature(params: &[JavaType], return_type: &JavaType) -> String {
    let mut signature = String::from("(");
    for param in params {
        signature.push_str(&param.signature());
    }
    signature.push(')');
    signature.push_str(&return_type.signature());
    signature
}
