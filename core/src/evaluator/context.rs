//! Per-evaluation mutable state.

use hashbrown::{HashMap, HashSet};
use tracing::{trace, warn};

use super::error::{AtSpan, Interrupt, RuntimeError};
use super::EvaluatorOptions;
use crate::parser::Span;
use crate::remote::{FrameId, RemoteVm, ThreadId, VmError};
use crate::scope_stack::ScopeStack;
use crate::types::{FieldInfo, MethodInfo, PrimitiveKind};
use crate::values::{ObjectId, ObjectRef, Value};

/// The suspended frame an evaluation runs against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameContext {
    pub thread: ThreadId,
    pub frame: FrameId,
    /// Loader of the frame's class, used to resolve class literals.
    pub class_loader: Option<ObjectRef>,
    /// Values the debugger injects by name.
    pub labels: Vec<(String, Value)>,
}

impl FrameContext {
    pub fn new(thread: ThreadId, frame: FrameId) -> Self {
        Self {
            thread,
            frame,
            ..Self::default()
        }
    }

    pub fn with_label(mut self, name: &str, value: Value) -> Self {
        self.labels.push((name.to_string(), value));
        self
    }

    pub fn label(&self, name: &str) -> Option<&Value> {
        self.labels
            .iter()
            .rev()
            .find(|(label, _)| label == name)
            .map(|(_, value)| value)
    }
}

/// Which candidate of an ambiguous name worked the first time it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FallbackChoice {
    Local,
    Field,
}

/// Remote references kept alive until the evaluation ends.
///
/// Objects created or returned mid-evaluation could otherwise be collected by
/// the debuggee before the fragment is done with them.
#[derive(Debug, Default)]
pub struct PinnedRefs {
    ids: HashSet<ObjectId>,
    objects: Vec<ObjectRef>,
}

impl PinnedRefs {
    pub fn pin(&mut self, vm: &mut dyn RemoteVm, object: &ObjectRef) -> Result<(), VmError> {
        if !self.ids.insert(object.id) {
            return Ok(());
        }
        vm.disable_collection(object)?;
        self.objects.push(object.clone());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Release every pinned reference. Failures are logged, not returned: the
    /// evaluation result is already decided by then.
    pub fn release(&mut self, vm: &mut dyn RemoteVm) {
        for object in self.objects.drain(..) {
            if let Err(error) = vm.enable_collection(&object) {
                warn!(object = %object, %error, "failed to release pinned reference");
            }
        }
        self.ids.clear();
    }
}

/// A readable and writable place, resolved from an lvalue node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Location {
    Scoped(String),
    FrameLocal(String),
    Field { object: ObjectRef, field: FieldInfo },
    StaticField(FieldInfo),
    ArrayElement { array: ObjectRef, index: i32 },
}

/// State of one evaluation of a compiled tree.
///
/// Created per request and dropped when it completes; dropping releases every
/// reference pinned along the way.
pub struct ExecutionContext<'a> {
    pub(crate) vm: &'a mut dyn RemoteVm,
    pub(crate) frame: &'a FrameContext,
    pub(crate) options: &'a EvaluatorOptions,
    pub(crate) scopes: ScopeStack<Value>,
    pub(crate) slots: Vec<Value>,
    pub(crate) depth: usize,
    pub(crate) iterations: usize,
    pub(crate) boxing: HashMap<PrimitiveKind, MethodInfo>,
    pub(crate) fallbacks: HashMap<String, FallbackChoice>,
    pub(crate) pinned: PinnedRefs,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        vm: &'a mut dyn RemoteVm,
        frame: &'a FrameContext,
        options: &'a EvaluatorOptions,
    ) -> Self {
        Self {
            vm,
            frame,
            options,
            scopes: ScopeStack::new(),
            slots: Vec::new(),
            depth: 0,
            iterations: 0,
            boxing: HashMap::new(),
            fallbacks: HashMap::new(),
            pinned: PinnedRefs::default(),
        }
    }

    pub fn thread(&self) -> ThreadId {
        self.frame.thread
    }

    pub fn pinned(&self) -> &PinnedRefs {
        &self.pinned
    }

    /// Keep the object behind `value`, if any, alive for the rest of the
    /// evaluation.
    pub(crate) fn pin(&mut self, value: Value, span: &Span) -> Result<Value, Interrupt> {
        if let Value::Object(object) = &value {
            self.pinned.pin(&mut *self.vm, object).at(span)?;
        }
        Ok(value)
    }

    pub(crate) fn pin_object(
        &mut self,
        object: ObjectRef,
        span: &Span,
    ) -> Result<ObjectRef, Interrupt> {
        self.pinned.pin(&mut *self.vm, &object).at(span)?;
        Ok(object)
    }

    pub(crate) fn this_object(&mut self, span: &Span) -> Result<ObjectRef, Interrupt> {
        self.vm
            .this_object(self.frame.thread, self.frame.frame)
            .at(span)?
            .ok_or_else(|| Interrupt::error(RuntimeError::NoThis, span))
    }

    pub(crate) fn read(&mut self, location: &Location, span: &Span) -> Result<Value, Interrupt> {
        match location {
            Location::Scoped(name) => self
                .scopes
                .lookup(name)
                .cloned()
                .ok_or_else(|| Interrupt::error(RuntimeError::Unavailable(name.clone()), span)),
            Location::FrameLocal(name) => self
                .vm
                .frame_local(self.frame.thread, self.frame.frame, name)
                .at(span),
            Location::Field { object, field } => {
                let value = self.vm.get_field(object, field).at(span)?;
                self.pin(value, span)
            }
            Location::StaticField(field) => {
                let value = self.vm.get_static_field(field).at(span)?;
                self.pin(value, span)
            }
            Location::ArrayElement { array, index } => {
                let value = self.vm.array_get(array, *index).at(span)?;
                self.pin(value, span)
            }
        }
    }

    pub(crate) fn write(
        &mut self,
        location: &Location,
        value: Value,
        span: &Span,
    ) -> Result<(), Interrupt> {
        trace!(?location, %value, "write");
        match location {
            Location::Scoped(name) => self
                .scopes
                .assign(name, value)
                .map_err(|_| Interrupt::error(RuntimeError::Unavailable(name.clone()), span)),
            Location::FrameLocal(name) => self
                .vm
                .set_frame_local(self.frame.thread, self.frame.frame, name, value)
                .at(span),
            Location::Field { object, field } => self.vm.set_field(object, field, value).at(span),
            Location::StaticField(field) => self.vm.set_static_field(field, value).at(span),
            Location::ArrayElement { array, index } => {
                self.vm.array_set(array, *index, value).at(span)
            }
        }
    }

    /// Count one loop iteration against the configured limit.
    pub(crate) fn tick(&mut self, span: &Span) -> Result<(), Interrupt> {
        self.iterations += 1;
        match self.options.max_iterations {
            Some(max_iterations) if self.iterations > max_iterations => Err(Interrupt::error(
                super::ResourceExceededError::IterationLimit { max_iterations },
                span,
            )),
            _ => Ok(()),
        }
    }
}

impl Drop for ExecutionContext<'_> {
    fn drop(&mut self) {
        if !self.pinned.is_empty() {
            trace!(count = self.pinned.len(), "releasing pinned references");
        }
        self.pinned.release(&mut *self.vm);
    }
}

impl core::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("frame", self.frame)
            .field("depth", &self.depth)
            .field("iterations", &self.iterations)
            .field("pinned", &self.pinned.len())
            .finish()
    }
}
