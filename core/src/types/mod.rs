pub mod builtins;
mod class_path;
mod context;
mod java_type;
mod primitive;
pub mod promotion;
mod symbols;

pub use class_path::ClassPath;
pub use context::{Availability, CompileContext, LocalVariable};
pub use java_type::{
    CLASS, ITERABLE, ITERATOR, JavaType, OBJECT, STRING, THROWABLE, method_signature,
};
pub use primitive::PrimitiveKind;
pub use symbols::{
    CAPTURED_LOCAL_PREFIX, ClassInfo, FieldInfo, MethodInfo, OUTER_THIS_FIELD, SymbolResolver,
    simple_name,
};
