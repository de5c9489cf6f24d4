use core::fmt;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};
use tracing::trace;

use super::{FrameId, RemoteVm, ThreadId, VmError, natives};
use crate::types::{
    ClassPath, FieldInfo, JavaType, MethodInfo, OBJECT, OUTER_THIS_FIELD, STRING, SymbolResolver,
};
use crate::values::{ObjectId, ObjectRef, Value, format};

/// Body of a method executed by [`MockVm`].
///
/// Receives the receiver (`None` for static methods) and the arguments;
/// constructors receive the freshly allocated instance.
pub type NativeMethod =
    Rc<dyn Fn(&mut MockVm, Option<&ObjectRef>, &[Value]) -> Result<Value, VmError>>;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum HeapObject {
    Instance(HashMap<String, Value>),
    /// `String` and `StringBuilder` contents.
    Text(String),
    /// `ArrayList` elements.
    List(Vec<Value>),
    Array(Vec<Value>),
    Class(JavaType),
}

#[derive(Debug, Clone)]
struct MockObject {
    runtime_type: String,
    data: HeapObject,
}

/// A suspended frame: its `this` and its visible locals.
#[derive(Debug, Clone, Default)]
pub struct MockFrame {
    pub this: Option<ObjectRef>,
    pub locals: Vec<(String, Value)>,
}

/// Deterministic, in-memory debuggee.
///
/// Method bodies are Rust closures registered per (class, name, parameter
/// types) and dispatched virtually up the superclass chain. Every builtin of
/// [`ClassPath::with_builtins`] has a body.
pub struct MockVm {
    class_path: ClassPath,
    heap: HashMap<ObjectId, MockObject>,
    next_id: ObjectId,
    frames: HashMap<(ThreadId, FrameId), MockFrame>,
    statics: HashMap<(String, String), Value>,
    natives: HashMap<(String, String, String), NativeMethod>,
    class_objects: HashMap<JavaType, ObjectRef>,
    pinned: HashSet<ObjectId>,
    connected: bool,
    /// Every method and constructor invoked, in order.
    pub invocations: Vec<String>,
    pub disable_collection_calls: Vec<ObjectId>,
    pub enable_collection_calls: Vec<ObjectId>,
}

impl fmt::Debug for MockVm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockVm")
            .field("classes", &self.class_path.len())
            .field("objects", &self.heap.len())
            .field("natives", &self.natives.len())
            .field("connected", &self.connected)
            .finish()
    }
}

impl Default for MockVm {
    fn default() -> Self {
        Self::new()
    }
}

fn native_key(class: &str, name: &str, params: &[JavaType]) -> (String, String, String) {
    let params: String = params.iter().map(JavaType::signature).collect();
    (class.to_string(), name.to_string(), params)
}

impl MockVm {
    pub fn new() -> Self {
        Self::with_class_path(ClassPath::with_builtins())
    }

    /// A debuggee whose loaded classes are `class_path`, which should include
    /// the builtins.
    pub fn with_class_path(class_path: ClassPath) -> Self {
        let mut vm = Self {
            class_path,
            heap: HashMap::new(),
            next_id: 1,
            frames: HashMap::new(),
            statics: HashMap::new(),
            natives: HashMap::new(),
            class_objects: HashMap::new(),
            pinned: HashSet::new(),
            connected: true,
            invocations: Vec::new(),
            disable_collection_calls: Vec::new(),
            enable_collection_calls: Vec::new(),
        };
        natives::install(&mut vm);
        vm
    }

    pub fn class_path(&self) -> &ClassPath {
        &self.class_path
    }

    pub fn class_path_mut(&mut self) -> &mut ClassPath {
        &mut self.class_path
    }

    /// Register the body of `class.name(params)`.
    pub fn define_native(
        &mut self,
        class: &str,
        name: &str,
        params: &[JavaType],
        body: impl Fn(&mut MockVm, Option<&ObjectRef>, &[Value]) -> Result<Value, VmError> + 'static,
    ) {
        self.natives
            .insert(native_key(class, name, params), Rc::new(body));
    }

    /// Every later request fails with [`VmError::Disconnected`].
    pub fn disconnect(&mut self) {
        self.connected = false;
    }

    pub fn is_collection_disabled(&self, id: ObjectId) -> bool {
        self.pinned.contains(&id)
    }

    pub fn frame_mut(&mut self, thread: ThreadId, frame: FrameId) -> &mut MockFrame {
        self.frames.entry((thread, frame)).or_default()
    }

    pub fn set_local(&mut self, thread: ThreadId, frame: FrameId, name: &str, value: Value) {
        let frame = self.frame_mut(thread, frame);
        match frame.locals.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => frame.locals.push((name.to_string(), value)),
        }
    }

    pub fn set_this(&mut self, thread: ThreadId, frame: FrameId, this: ObjectRef) {
        self.frame_mut(thread, frame).this = Some(this);
    }

    pub fn local(&self, thread: ThreadId, frame: FrameId, name: &str) -> Option<&Value> {
        self.frames
            .get(&(thread, frame))?
            .locals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// Allocate an instance of `class` with every declared field at its
    /// default value, without running a constructor.
    pub fn new_object(&mut self, class: &str) -> ObjectRef {
        self.allocate_for_class(class)
    }

    pub fn new_string(&mut self, text: &str) -> ObjectRef {
        self.allocate(STRING, HeapObject::Text(text.to_string()))
    }

    pub fn new_array_of(&mut self, element: &JavaType, values: Vec<Value>) -> ObjectRef {
        self.allocate(&format!("{}[]", element), HeapObject::Array(values))
    }

    /// A `java.util.ArrayList` holding `values`.
    pub fn new_list(&mut self, values: Vec<Value>) -> ObjectRef {
        self.allocate("java.util.ArrayList", HeapObject::List(values))
    }

    /// The wrapper object for a primitive value, or `None` for references.
    pub fn new_boxed(&mut self, value: Value) -> Option<ObjectRef> {
        let kind = value.primitive_kind()?;
        let fields = HashMap::from([("value".to_string(), value)]);
        Some(self.allocate(kind.wrapper_class(), HeapObject::Instance(fields)))
    }

    /// An exception object of `class` with the given detail message.
    pub fn new_throwable(&mut self, class: &str, message: Option<&str>) -> ObjectRef {
        let exception = self.allocate_for_class(class);
        let message = match message {
            Some(text) => Value::Object(self.new_string(text)),
            None => Value::Null,
        };
        self.set_field_value(&exception, "detailMessage", message);
        exception
    }

    pub fn field_value(&self, object: &ObjectRef, name: &str) -> Option<Value> {
        match &self.heap.get(&object.id)?.data {
            HeapObject::Instance(fields) => fields.get(name).cloned(),
            _ => None,
        }
    }

    /// Set or add an instance field, bypassing declared-field checks.
    pub fn set_field_value(&mut self, object: &ObjectRef, name: &str, value: Value) {
        if let Some(MockObject {
            data: HeapObject::Instance(fields),
            ..
        }) = self.heap.get_mut(&object.id)
        {
            fields.insert(name.to_string(), value);
        }
    }

    /// Contents of a string or string builder.
    pub fn text(&self, object: &ObjectRef) -> Option<&str> {
        match &self.heap.get(&object.id)?.data {
            HeapObject::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn array_values(&self, object: &ObjectRef) -> Option<&[Value]> {
        match &self.heap.get(&object.id)?.data {
            HeapObject::Array(values) | HeapObject::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn set_static(&mut self, class: &str, name: &str, value: Value) {
        self.statics
            .insert((class.to_string(), name.to_string()), value);
    }

    pub fn static_value(&self, class: &str, name: &str) -> Option<&Value> {
        self.statics.get(&(class.to_string(), name.to_string()))
    }

    /// Build an exception object of `class` to be thrown by a method body.
    pub fn throw(&mut self, class: &str, message: &str) -> VmError {
        VmError::Exception(self.new_throwable(class, Some(message)))
    }

    /// `String.valueOf(value)`, calling `toString()` on objects.
    pub fn to_java_string(&mut self, value: &Value) -> Result<String, VmError> {
        if let Some(text) = format::primitive_to_string(value) {
            return Ok(text);
        }
        let Value::Object(object) = value else {
            return Ok(String::new());
        };
        if object.runtime_type == STRING {
            return self.string_value(object);
        }
        match self.call(object, "toString", vec![], JavaType::string(), &[])? {
            Value::Object(string) => self.string_value(&string),
            _ => Ok("null".to_string()),
        }
    }

    /// Virtual call of `name(params)` on `receiver`.
    pub fn call(
        &mut self,
        receiver: &ObjectRef,
        name: &str,
        params: Vec<JavaType>,
        return_type: JavaType,
        args: &[Value],
    ) -> Result<Value, VmError> {
        let method = MethodInfo::new(receiver.runtime_type.clone(), name, params, return_type);
        self.invoke_method(0, receiver, &method, args, false)
    }

    pub(super) fn data(&self, object: &ObjectRef) -> Result<&HeapObject, VmError> {
        self.heap
            .get(&object.id)
            .map(|o| &o.data)
            .ok_or(VmError::InvalidObject(object.id))
    }

    pub(super) fn data_mut(&mut self, object: &ObjectRef) -> Result<&mut HeapObject, VmError> {
        self.heap
            .get_mut(&object.id)
            .map(|o| &mut o.data)
            .ok_or(VmError::InvalidObject(object.id))
    }

    fn ensure_connected(&self) -> Result<(), VmError> {
        if self.connected {
            Ok(())
        } else {
            Err(VmError::Disconnected)
        }
    }

    fn object(&self, object: &ObjectRef) -> Result<&MockObject, VmError> {
        self.ensure_connected()?;
        self.heap
            .get(&object.id)
            .ok_or(VmError::InvalidObject(object.id))
    }

    fn allocate(&mut self, runtime_type: &str, data: HeapObject) -> ObjectRef {
        let id = self.next_id;
        self.next_id += 1;
        self.heap.insert(
            id,
            MockObject {
                runtime_type: runtime_type.to_string(),
                data,
            },
        );
        ObjectRef::new(id, runtime_type)
    }

    fn allocate_for_class(&mut self, class: &str) -> ObjectRef {
        let data = match class {
            STRING | "java.lang.StringBuilder" => HeapObject::Text(String::new()),
            "java.util.ArrayList" => HeapObject::List(Vec::new()),
            _ => HeapObject::Instance(self.default_fields(class)),
        };
        self.allocate(class, data)
    }

    fn default_fields(&self, class: &str) -> HashMap<String, Value> {
        let mut fields = HashMap::new();
        let mut current = Some(class.to_string());
        while let Some(name) = current {
            let Some(info) = self.class_path.class(&name) else {
                break;
            };
            if info.has_outer_instance {
                fields
                    .entry(OUTER_THIS_FIELD.to_string())
                    .or_insert(Value::Null);
            }
            for field in info.fields.iter().filter(|f| !f.is_static) {
                fields
                    .entry(field.name.clone())
                    .or_insert_with(|| field.ty.default_value());
            }
            current = info.superclass.clone();
        }
        fields
    }

    /// Find a body for `name(params)` starting at `class` and walking up the
    /// superclass chain.
    fn lookup_native(&self, class: &str, name: &str, params: &[JavaType]) -> Option<NativeMethod> {
        let mut current = Some(class.to_string());
        while let Some(class) = current {
            if let Some(native) = self.natives.get(&native_key(&class, name, params)) {
                return Some(native.clone());
            }
            current = match self.class_path.class(&class) {
                Some(info) => info.superclass.clone(),
                None if class != OBJECT => Some(OBJECT.to_string()),
                None => None,
            };
        }
        None
    }

    fn no_such_method(method: &MethodInfo, class: &str) -> VmError {
        VmError::NoSuchMethod {
            class: class.to_string(),
            name: method.name.clone(),
            signature: method.signature(),
        }
    }

    fn array_data(&self, array: &ObjectRef) -> Result<&Vec<Value>, VmError> {
        match &self.object(array)?.data {
            HeapObject::Array(values) => Ok(values),
            _ => Err(VmError::TypeMismatch {
                expected: "array".to_string(),
                found: array.runtime_type.clone(),
            }),
        }
    }
}

fn check_index(index: i32, length: usize) -> Result<usize, VmError> {
    match usize::try_from(index) {
        Ok(i) if i < length => Ok(i),
        _ => Err(VmError::IndexOutOfBounds {
            index: i64::from(index),
            length: i32::try_from(length).unwrap_or(i32::MAX),
        }),
    }
}

impl RemoteVm for MockVm {
    fn frame_local(
        &mut self,
        thread: ThreadId,
        frame: FrameId,
        name: &str,
    ) -> Result<Value, VmError> {
        self.ensure_connected()?;
        self.local(thread, frame, name)
            .cloned()
            .ok_or_else(|| VmError::AbsentLocal(name.to_string()))
    }

    fn set_frame_local(
        &mut self,
        thread: ThreadId,
        frame: FrameId,
        name: &str,
        value: Value,
    ) -> Result<(), VmError> {
        self.ensure_connected()?;
        let slot = self
            .frames
            .get_mut(&(thread, frame))
            .and_then(|f| f.locals.iter_mut().find(|(n, _)| n == name))
            .ok_or_else(|| VmError::AbsentLocal(name.to_string()))?;
        slot.1 = value;
        Ok(())
    }

    fn this_object(
        &mut self,
        thread: ThreadId,
        frame: FrameId,
    ) -> Result<Option<ObjectRef>, VmError> {
        self.ensure_connected()?;
        Ok(self
            .frames
            .get(&(thread, frame))
            .and_then(|f| f.this.clone()))
    }

    fn get_field(&mut self, object: &ObjectRef, field: &FieldInfo) -> Result<Value, VmError> {
        let no_such_field = || VmError::NoSuchField {
            class: object.runtime_type.clone(),
            field: field.name.clone(),
        };
        match &self.object(object)?.data {
            HeapObject::Instance(fields) => fields.get(&field.name).cloned().ok_or_else(no_such_field),
            _ => Err(no_such_field()),
        }
    }

    fn set_field(
        &mut self,
        object: &ObjectRef,
        field: &FieldInfo,
        value: Value,
    ) -> Result<(), VmError> {
        self.object(object)?;
        let no_such_field = || VmError::NoSuchField {
            class: object.runtime_type.clone(),
            field: field.name.clone(),
        };
        match self.data_mut(object)? {
            HeapObject::Instance(fields) => {
                let slot = fields.get_mut(&field.name).ok_or_else(no_such_field)?;
                *slot = value;
                Ok(())
            }
            _ => Err(no_such_field()),
        }
    }

    fn get_static_field(&mut self, field: &FieldInfo) -> Result<Value, VmError> {
        self.ensure_connected()?;
        if let Some(value) = self.static_value(&field.declaring_class, &field.name) {
            return Ok(value.clone());
        }
        match self.class_path.find_field(&field.declaring_class, &field.name) {
            Some(declared) if declared.is_static => Ok(declared.ty.default_value()),
            _ => Err(VmError::NoSuchField {
                class: field.declaring_class.clone(),
                field: field.name.clone(),
            }),
        }
    }

    fn set_static_field(&mut self, field: &FieldInfo, value: Value) -> Result<(), VmError> {
        self.ensure_connected()?;
        if !self.class_path.contains(&field.declaring_class) {
            return Err(VmError::ClassNotLoaded(field.declaring_class.clone()));
        }
        self.set_static(&field.declaring_class, &field.name, value);
        Ok(())
    }

    fn invoke_method(
        &mut self,
        thread: ThreadId,
        receiver: &ObjectRef,
        method: &MethodInfo,
        args: &[Value],
        nonvirtual: bool,
    ) -> Result<Value, VmError> {
        let runtime_type = self.object(receiver)?.runtime_type.clone();
        let start = if nonvirtual {
            method.declaring_class.clone()
        } else if receiver.is_array() {
            OBJECT.to_string()
        } else {
            runtime_type
        };
        let native = self
            .lookup_native(&start, &method.name, &method.params)
            .ok_or_else(|| Self::no_such_method(method, &start))?;
        trace!(thread, %method, receiver = receiver.id, "mock invoke");
        self.invocations.push(method.to_string());
        native(self, Some(receiver), args)
    }

    fn invoke_static(
        &mut self,
        thread: ThreadId,
        method: &MethodInfo,
        args: &[Value],
    ) -> Result<Value, VmError> {
        self.ensure_connected()?;
        let native = self
            .lookup_native(&method.declaring_class, &method.name, &method.params)
            .ok_or_else(|| Self::no_such_method(method, &method.declaring_class))?;
        trace!(thread, %method, "mock invoke static");
        self.invocations.push(method.to_string());
        native(self, None, args)
    }

    fn new_instance(
        &mut self,
        thread: ThreadId,
        constructor: &MethodInfo,
        args: &[Value],
    ) -> Result<ObjectRef, VmError> {
        self.ensure_connected()?;
        let class = constructor.declaring_class.as_str();
        let info = self
            .class_path
            .class(class)
            .ok_or_else(|| VmError::ClassNotLoaded(class.to_string()))?;
        if info.is_interface {
            return Err(VmError::Other(format!("cannot instantiate interface {}", class)));
        }
        let has_outer_instance = info.has_outer_instance;

        let object = self.allocate_for_class(class);
        let args = match (has_outer_instance, args.split_first()) {
            (true, Some((outer, rest))) => {
                self.set_field_value(&object, OUTER_THIS_FIELD, outer.clone());
                rest
            }
            (true, None) => {
                return Err(VmError::Other(format!(
                    "missing enclosing instance for {}",
                    class
                )));
            }
            (false, _) => args,
        };

        trace!(thread, %constructor, "mock new instance");
        self.invocations.push(constructor.to_string());
        match self.lookup_native(class, MethodInfo::CONSTRUCTOR, &constructor.params) {
            Some(native) => {
                native(self, Some(&object), args)?;
            }
            None if constructor.params.is_empty() => {}
            None => return Err(Self::no_such_method(constructor, class)),
        }
        Ok(object)
    }

    fn find_method(
        &mut self,
        class: &str,
        name: &str,
        signature: &str,
    ) -> Result<Option<MethodInfo>, VmError> {
        self.ensure_connected()?;
        let info = self
            .class_path
            .class(class)
            .ok_or_else(|| VmError::ClassNotLoaded(class.to_string()))?;
        let candidates = if name == MethodInfo::CONSTRUCTOR {
            &info.constructors
        } else {
            &info.methods
        };
        Ok(candidates
            .iter()
            .find(|m| m.name == name && m.signature() == signature)
            .cloned())
    }

    fn mirror_string(&mut self, text: &str) -> Result<ObjectRef, VmError> {
        self.ensure_connected()?;
        Ok(self.new_string(text))
    }

    fn string_value(&mut self, string: &ObjectRef) -> Result<String, VmError> {
        match &self.object(string)?.data {
            HeapObject::Text(text) => Ok(text.clone()),
            _ => Err(VmError::TypeMismatch {
                expected: STRING.to_string(),
                found: string.runtime_type.clone(),
            }),
        }
    }

    fn new_array(&mut self, element: &JavaType, length: i32) -> Result<ObjectRef, VmError> {
        self.ensure_connected()?;
        let length = usize::try_from(length)
            .map_err(|_| VmError::Other(format!("negative array size {}", length)))?;
        let values = vec![element.default_value(); length];
        Ok(self.new_array_of(element, values))
    }

    fn array_length(&mut self, array: &ObjectRef) -> Result<i32, VmError> {
        let length = self.array_data(array)?.len();
        Ok(i32::try_from(length).unwrap_or(i32::MAX))
    }

    fn array_get(&mut self, array: &ObjectRef, index: i32) -> Result<Value, VmError> {
        let values = self.array_data(array)?;
        let index = check_index(index, values.len())?;
        Ok(values[index].clone())
    }

    fn array_set(&mut self, array: &ObjectRef, index: i32, value: Value) -> Result<(), VmError> {
        let length = self.array_data(array)?.len();
        let index = check_index(index, length)?;
        if let HeapObject::Array(values) = self.data_mut(array)? {
            values[index] = value;
        }
        Ok(())
    }

    fn is_instance_of(&mut self, object: &ObjectRef, ty: &JavaType) -> Result<bool, VmError> {
        self.object(object)?;
        Ok(self.class_path.is_subtype(&object.ty(), ty))
    }

    fn class_object(
        &mut self,
        ty: &JavaType,
        _class_loader: Option<&ObjectRef>,
    ) -> Result<ObjectRef, VmError> {
        self.ensure_connected()?;
        if let Some(object) = self.class_objects.get(ty) {
            return Ok(object.clone());
        }
        let object = self.allocate("java.lang.Class", HeapObject::Class(ty.clone()));
        self.class_objects.insert(ty.clone(), object.clone());
        Ok(object)
    }

    fn disable_collection(&mut self, object: &ObjectRef) -> Result<(), VmError> {
        self.object(object)?;
        self.disable_collection_calls.push(object.id);
        self.pinned.insert(object.id);
        Ok(())
    }

    fn enable_collection(&mut self, object: &ObjectRef) -> Result<(), VmError> {
        self.object(object)?;
        self.enable_collection_calls.push(object.id);
        self.pinned.remove(&object.id);
        Ok(())
    }
}
