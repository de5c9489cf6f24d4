//! The eight Java primitive kinds.
//!
//! Every coercion rule in the crate dispatches on [`PrimitiveKind`] with an
//! exhaustive `match`, so adding a rule for one kind forces a decision for all
//! of them.

use core::fmt;

/// A Java primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    /// Source-level keyword (`int`, `boolean`, ...).
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PrimitiveKind::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// JNI descriptor character.
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Byte => 'B',
            PrimitiveKind::Short => 'S',
            PrimitiveKind::Char => 'C',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Float => 'F',
            PrimitiveKind::Double => 'D',
        }
    }

    pub fn from_descriptor(c: char) -> Option<Self> {
        PrimitiveKind::ALL
            .into_iter()
            .find(|kind| kind.descriptor() == c)
    }

    /// Fully qualified name of the wrapper class used for boxing.
    pub fn wrapper_class(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "java.lang.Boolean",
            PrimitiveKind::Byte => "java.lang.Byte",
            PrimitiveKind::Short => "java.lang.Short",
            PrimitiveKind::Char => "java.lang.Character",
            PrimitiveKind::Int => "java.lang.Integer",
            PrimitiveKind::Long => "java.lang.Long",
            PrimitiveKind::Float => "java.lang.Float",
            PrimitiveKind::Double => "java.lang.Double",
        }
    }

    pub fn from_wrapper_class(class: &str) -> Option<Self> {
        PrimitiveKind::ALL
            .into_iter()
            .find(|kind| kind.wrapper_class() == class)
    }

    /// Name of the accessor that unboxes a wrapper of this kind
    /// (`intValue`, `booleanValue`, ...).
    pub fn unbox_method(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "booleanValue",
            PrimitiveKind::Byte => "byteValue",
            PrimitiveKind::Short => "shortValue",
            PrimitiveKind::Char => "charValue",
            PrimitiveKind::Int => "intValue",
            PrimitiveKind::Long => "longValue",
            PrimitiveKind::Float => "floatValue",
            PrimitiveKind::Double => "doubleValue",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveKind::Boolean)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Char
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    /// Widening primitive conversion (JLS 5.1.2), identity included.
    ///
    /// `char` widens to `int` and above but neither `byte` nor `short` widens
    /// to `char`.
    pub fn widens_to(self, target: PrimitiveKind) -> bool {
        use PrimitiveKind::*;
        if self == target {
            return true;
        }
        match self {
            Boolean => false,
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short | Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => matches!(target, Double),
            Double => false,
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
