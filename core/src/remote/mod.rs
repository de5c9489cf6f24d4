//! The debuggee, as seen by the evaluator.
//!
//! [`RemoteVm`] is the small, synchronous subset of a JDI-like debugger
//! interface that evaluation needs. Every call blocks until the debuggee
//! answers. [`MockVm`] implements it in memory for tests and for hosts that
//! want to exercise compiled expressions without a live process.

mod mock;
mod natives;

use thiserror::Error;

use crate::types::{FieldInfo, JavaType, MethodInfo};
use crate::values::{ObjectId, ObjectRef, Value};

pub use mock::{MockFrame, MockVm, NativeMethod};

pub type ThreadId = u64;
pub type FrameId = u64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("the debuggee is disconnected")]
    Disconnected,

    /// The invoked code threw; the payload is the exception object.
    #[error("exception {0} thrown in the debuggee")]
    Exception(ObjectRef),

    #[error("local variable `{0}` is not available in this frame")]
    AbsentLocal(String),

    #[error("no field `{field}` in {class}")]
    NoSuchField { class: String, field: String },

    #[error("no method {name}{signature} in {class}")]
    NoSuchMethod {
        class: String,
        name: String,
        signature: String,
    },

    #[error("class {0} is not loaded")]
    ClassNotLoaded(String),

    #[error("invalid object id {0}")]
    InvalidObject(ObjectId),

    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: i32 },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("{0}")]
    Other(String),
}

/// Operations on a suspended debuggee.
///
/// Methods take `&mut self` because real connections are stateful (request
/// ids, caches) and the mock mutates its heap.
pub trait RemoteVm {
    /// Read a local variable or parameter of a suspended frame.
    fn frame_local(
        &mut self,
        thread: ThreadId,
        frame: FrameId,
        name: &str,
    ) -> Result<Value, VmError>;

    fn set_frame_local(
        &mut self,
        thread: ThreadId,
        frame: FrameId,
        name: &str,
        value: Value,
    ) -> Result<(), VmError>;

    /// `this` of the frame, or `None` in a static method.
    fn this_object(&mut self, thread: ThreadId, frame: FrameId)
    -> Result<Option<ObjectRef>, VmError>;

    fn get_field(&mut self, object: &ObjectRef, field: &FieldInfo) -> Result<Value, VmError>;

    fn set_field(
        &mut self,
        object: &ObjectRef,
        field: &FieldInfo,
        value: Value,
    ) -> Result<(), VmError>;

    fn get_static_field(&mut self, field: &FieldInfo) -> Result<Value, VmError>;

    fn set_static_field(&mut self, field: &FieldInfo, value: Value) -> Result<(), VmError>;

    /// Invoke an instance method on `receiver`.
    ///
    /// With `nonvirtual` the implementation declared by
    /// `method.declaring_class` runs even if the receiver overrides it
    /// (`super.m()`).
    fn invoke_method(
        &mut self,
        thread: ThreadId,
        receiver: &ObjectRef,
        method: &MethodInfo,
        args: &[Value],
        nonvirtual: bool,
    ) -> Result<Value, VmError>;

    fn invoke_static(
        &mut self,
        thread: ThreadId,
        method: &MethodInfo,
        args: &[Value],
    ) -> Result<Value, VmError>;

    /// Allocate an instance of `constructor.declaring_class` and run the
    /// constructor.
    ///
    /// For inner classes `args[0]` is the enclosing instance and the remaining
    /// arguments match `constructor.params`.
    fn new_instance(
        &mut self,
        thread: ThreadId,
        constructor: &MethodInfo,
        args: &[Value],
    ) -> Result<ObjectRef, VmError>;

    /// Look a method up in the loaded class by name and JNI signature.
    fn find_method(
        &mut self,
        class: &str,
        name: &str,
        signature: &str,
    ) -> Result<Option<MethodInfo>, VmError>;

    /// Create a `java.lang.String` in the debuggee.
    fn mirror_string(&mut self, text: &str) -> Result<ObjectRef, VmError>;

    /// Contents of a `java.lang.String`.
    fn string_value(&mut self, string: &ObjectRef) -> Result<String, VmError>;

    fn new_array(&mut self, element: &JavaType, length: i32) -> Result<ObjectRef, VmError>;

    fn array_length(&mut self, array: &ObjectRef) -> Result<i32, VmError>;

    fn array_get(&mut self, array: &ObjectRef, index: i32) -> Result<Value, VmError>;

    fn array_set(&mut self, array: &ObjectRef, index: i32, value: Value) -> Result<(), VmError>;

    fn is_instance_of(&mut self, object: &ObjectRef, ty: &JavaType) -> Result<bool, VmError>;

    /// The `java.lang.Class` object for `ty`, as loaded by `class_loader`.
    fn class_object(
        &mut self,
        ty: &JavaType,
        class_loader: Option<&ObjectRef>,
    ) -> Result<ObjectRef, VmError>;

    /// Keep `object` alive until [`enable_collection`](Self::enable_collection).
    fn disable_collection(&mut self, object: &ObjectRef) -> Result<(), VmError>;

    fn enable_collection(&mut self, object: &ObjectRef) -> Result<(), VmError>;
}
