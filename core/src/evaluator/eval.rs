//! Core evaluation logic.

use smallvec::SmallVec;
use tracing::trace;

use super::context::{ExecutionContext, FallbackChoice, Location};
use super::error::{AtSpan, Interrupt, ResourceExceededError, RuntimeError};
use super::node::{
    BinaryOperation, CastTarget, CatchNode, Constant, EvaluatorNode, FieldTarget, Jump, LocalRef,
    LogicalOp, NodeKind, Receiver,
};
use super::operators;
use crate::casting::cast_primitive;
use crate::parser::Span;
use crate::remote::VmError;
use crate::scope_stack::Scope;
use crate::types::{FieldInfo, ITERABLE, ITERATOR, JavaType, MethodInfo};
use crate::values::{ObjectRef, Value};

type Args = SmallVec<[Value; 4]>;

fn null_pointer(message: String, span: &Span) -> Interrupt {
    Interrupt::error(RuntimeError::NullPointer(message), span)
}

fn unexpected(expected: &str, found: &Value, span: &Span) -> Interrupt {
    Interrupt::error(
        RuntimeError::UnexpectedValue {
            expected: expected.to_string(),
            found: found.type_of().to_string(),
        },
        span,
    )
}

/// Decide whether a loop goes on after its body completed with `result`.
///
/// An unlabeled `break`/`continue` targets the innermost loop; a labeled one
/// only the loop carrying that label.
fn continue_loop(label: &Option<String>, result: Result<Value, Interrupt>) -> Result<bool, Interrupt> {
    match result {
        Ok(_) | Err(Interrupt::Continue(None)) => Ok(true),
        Err(Interrupt::Break(None)) => Ok(false),
        Err(Interrupt::Continue(Some(target))) if label.as_deref() == Some(target.as_str()) => {
            Ok(true)
        }
        Err(Interrupt::Break(Some(target))) if label.as_deref() == Some(target.as_str()) => {
            Ok(false)
        }
        Err(other) => Err(other),
    }
}

impl<'a> ExecutionContext<'a> {
    /// Evaluate a node, guarding against runaway recursion.
    pub fn eval(&mut self, node: &EvaluatorNode) -> Result<Value, Interrupt> {
        if self.depth >= self.options.max_depth {
            return Err(Interrupt::error(
                ResourceExceededError::StackOverflow {
                    depth: self.depth,
                    max_depth: self.options.max_depth,
                },
                &node.span,
            ));
        }

        self.depth += 1;
        let result = self.eval_inner(node);
        self.depth -= 1;

        result
    }

    fn eval_inner(&mut self, node: &EvaluatorNode) -> Result<Value, Interrupt> {
        let span = &node.span;
        match &node.kind {
            NodeKind::Literal(Constant::Value(value)) => Ok(value.clone()),
            NodeKind::Literal(Constant::Str(text)) => {
                Ok(Value::Object(self.mirror_string(text, span)?))
            }

            NodeKind::LocalVariableRef(_)
            | NodeKind::FieldRef { .. }
            | NodeKind::ArrayAccess { .. } => {
                let location = self.locate(node)?;
                self.read(&location, span)
            }

            NodeKind::ThisRef { hops } | NodeKind::SuperRef { hops } => {
                Ok(Value::Object(self.outer_instance(hops, span)?))
            }

            NodeKind::TypeRef(ty) => {
                let class = self
                    .vm
                    .class_object(ty, self.frame.class_loader.as_ref())
                    .at(span)?;
                Ok(Value::Object(self.pin_object(class, span)?))
            }

            NodeKind::Assignment { target, value } => {
                let location = self.locate(target)?;
                let value = self.eval(value)?;
                self.write(&location, value.clone(), span)?;
                Ok(value)
            }

            NodeKind::CompoundAssignment { target, operation } => {
                let location = self.locate(target)?;
                let current = self.read(&location, span)?;
                let value = self.eval_with_slot(current, operation)?;
                self.write(&location, value.clone(), span)?;
                Ok(value)
            }

            NodeKind::PostfixOp {
                target, operation, ..
            } => {
                let location = self.locate(target)?;
                let old = self.read(&location, span)?;
                let value = self.eval_with_slot(old.clone(), operation)?;
                self.write(&location, value, span)?;
                Ok(old)
            }

            NodeKind::BinaryOp {
                operation,
                left,
                right,
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*operation, &left, &right, span)
            }

            NodeKind::Logical { op, left, right } => {
                let left_value = self.eval(left)?;
                let left_bool = self.condition(&left_value, &left.span)?;
                match (op, left_bool) {
                    (LogicalOp::And, false) => Ok(Value::Boolean(false)),
                    (LogicalOp::Or, true) => Ok(Value::Boolean(true)),
                    _ => {
                        let right_value = self.eval(right)?;
                        let right_bool = self.condition(&right_value, &right.span)?;
                        Ok(Value::Boolean(right_bool))
                    }
                }
            }

            NodeKind::UnaryOp { op, kind, operand } => {
                let value = self.eval(operand)?;
                operators::unary(*op, *kind, &value).at(span)
            }

            NodeKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.eval(cond)?;
                if self.condition(&cond_value, &cond.span)? {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }

            NodeKind::InstanceOf { operand, ty } => match self.eval(operand)? {
                Value::Object(object) => Ok(Value::Boolean(
                    self.vm.is_instance_of(&object, ty).at(span)?,
                )),
                _ => Ok(Value::Boolean(false)),
            },

            NodeKind::TypeCast { operand, target } => {
                let value = self.eval(operand)?;
                match target {
                    CastTarget::Primitive(kind) => cast_primitive(&value, *kind).at(span),
                    CastTarget::Reference(ty) => self.check_cast(value, ty, span),
                }
            }

            NodeKind::Boxing { operand, kind } => {
                let value = self.eval(operand)?;
                self.box_value(&value, *kind, span)
            }

            NodeKind::Unboxing { operand, kind } => {
                let value = self.eval(operand)?;
                self.unbox_value(&value, *kind, span)
            }

            NodeKind::NewArray { element, length } => {
                let length_value = self.eval(length)?;
                let length = self.index(&length_value, &length.span)?;
                if length < 0 {
                    return Err(Interrupt::error(RuntimeError::NegativeArraySize(length), span));
                }
                let array = self.vm.new_array(element, length).at(span)?;
                Ok(Value::Object(self.pin_object(array, span)?))
            }

            NodeKind::ArrayInitializer { element, elements } => {
                let values = self.eval_all(elements)?;
                let length = i32::try_from(values.len()).unwrap_or(i32::MAX);
                let array = self.vm.new_array(element, length).at(span)?;
                let array = self.pin_object(array, span)?;
                for (index, value) in (0..length).zip(values) {
                    self.vm.array_set(&array, index, value).at(span)?;
                }
                Ok(Value::Object(array))
            }

            NodeKind::NewInstance {
                constructor,
                outer,
                args,
            } => {
                self.check_invocation_allowed(span)?;
                let mut values = Args::new();
                if let Some(outer) = outer {
                    let outer_value = self.eval(outer)?;
                    if outer_value.is_null() {
                        return Err(null_pointer(
                            format!(
                                "cannot create {} without an enclosing instance",
                                constructor.declaring_class
                            ),
                            &outer.span,
                        ));
                    }
                    values.push(outer_value);
                }
                values.extend(self.eval_all(args)?);
                trace!(%constructor, "new instance");
                let thread = self.thread();
                let object = self.vm.new_instance(thread, constructor, &values).at(span)?;
                Ok(Value::Object(self.pin_object(object, span)?))
            }

            NodeKind::ArrayLength(array) => {
                let array_value = self.eval(array)?;
                let array = self.object(array_value, || "cannot read the length of a null array".to_string(), span)?;
                Ok(Value::Int(self.vm.array_length(&array).at(span)?))
            }

            NodeKind::MethodCall {
                receiver,
                method,
                args,
                nonvirtual,
            } => {
                self.check_invocation_allowed(span)?;
                let thread = self.thread();
                let result = match receiver {
                    Receiver::Static => {
                        let values = self.eval_all(args)?;
                        trace!(%method, "invoke static");
                        self.vm.invoke_static(thread, method, &values).at(span)?
                    }
                    Receiver::Instance(receiver) => {
                        let receiver_value = self.eval(receiver)?;
                        let object = self.object(
                            receiver_value,
                            || format!("cannot invoke \"{}\" because the receiver is null", method),
                            span,
                        )?;
                        let values = self.eval_all(args)?;
                        trace!(%method, receiver = %object, "invoke");
                        self.vm
                            .invoke_method(thread, &object, method, &values, *nonvirtual)
                            .at(span)?
                    }
                };
                self.pin(result, span)
            }

            NodeKind::Block {
                label,
                scope,
                statements,
            } => {
                self.enter_scope(scope, span)?;
                let result = self.eval_statements(statements);
                self.leave_scope(span)?;
                match result {
                    Err(Interrupt::Break(Some(target))) if label.as_ref() == Some(&target) => {
                        Ok(Value::Void)
                    }
                    other => other,
                }
            }

            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.eval(cond)?;
                if self.condition(&cond_value, &cond.span)? {
                    self.eval(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval(else_branch)
                } else {
                    Ok(Value::Void)
                }
            }

            NodeKind::While { label, cond, body } => {
                loop {
                    self.tick(span)?;
                    let cond_value = self.eval(cond)?;
                    if !self.condition(&cond_value, &cond.span)? {
                        break;
                    }
                    let result = self.eval(body);
                    if !continue_loop(label, result)? {
                        break;
                    }
                }
                Ok(Value::Void)
            }

            NodeKind::DoWhile { label, body, cond } => {
                loop {
                    self.tick(span)?;
                    let result = self.eval(body);
                    if !continue_loop(label, result)? {
                        break;
                    }
                    let cond_value = self.eval(cond)?;
                    if !self.condition(&cond_value, &cond.span)? {
                        break;
                    }
                }
                Ok(Value::Void)
            }

            NodeKind::For {
                label,
                scope,
                init,
                cond,
                update,
                body,
            } => {
                self.enter_scope(scope, span)?;
                let result = self.eval_for(label, init, cond.as_deref(), update, body, span);
                self.leave_scope(span)?;
                result
            }

            NodeKind::ForEach {
                label,
                variable,
                iterable,
                element,
                body,
            } => {
                let iterable_value = self.eval(iterable)?;
                let object = self.object(
                    iterable_value,
                    || "cannot iterate over null".to_string(),
                    &iterable.span,
                )?;
                if object.is_array() {
                    self.for_each_element(label, variable, &object, element, body, span)
                } else {
                    self.for_each_item(label, variable, &object, element, body, span)
                }
            }

            NodeKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::Void,
                };
                Err(Interrupt::Return(value))
            }

            NodeKind::Throw(exception) => {
                let value = self.eval(exception)?;
                let exception = self.object(value, || "cannot throw null".to_string(), span)?;
                Err(Interrupt::Thrown {
                    exception,
                    span: span.clone(),
                })
            }

            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                let mut outcome = self.eval(body);
                if let Err(Interrupt::Thrown { exception, .. }) = &outcome {
                    let exception = exception.clone();
                    outcome = match self.find_catch(catches, &exception, span) {
                        Ok(Some(clause)) => self.eval_catch(clause, exception, span),
                        Ok(None) => outcome,
                        Err(error) => Err(error),
                    };
                }
                if let Some(finally) = finally {
                    // An abrupt `finally` replaces whatever the body produced.
                    self.eval(finally)?;
                }
                outcome
            }

            NodeKind::BreakContinue { jump, label } => Err(match jump {
                Jump::Break => Interrupt::Break(label.clone()),
                Jump::Continue => Interrupt::Continue(label.clone()),
            }),

            NodeKind::LabeledValue(name) => self
                .frame
                .label(name)
                .cloned()
                .ok_or_else(|| Interrupt::error(RuntimeError::Unavailable(name.clone()), span)),

            NodeKind::Fallback { name, field } => {
                match self.fallbacks.get(name).copied() {
                    Some(FallbackChoice::Local) => {
                        return self.read(&Location::FrameLocal(name.clone()), span);
                    }
                    Some(FallbackChoice::Field) => {
                        if let Some(field) = field {
                            return self.eval(field);
                        }
                    }
                    None => {}
                }
                let local = self
                    .vm
                    .frame_local(self.frame.thread, self.frame.frame, name);
                match (local, field) {
                    (Ok(value), _) => {
                        self.fallbacks.insert(name.clone(), FallbackChoice::Local);
                        Ok(value)
                    }
                    (Err(VmError::AbsentLocal(_)), Some(field)) => {
                        trace!(%name, "local not available, reading the field");
                        let value = self.eval(field)?;
                        self.fallbacks.insert(name.clone(), FallbackChoice::Field);
                        Ok(value)
                    }
                    (Err(error), _) => Err(Interrupt::from_vm(error, span)),
                }
            }

            NodeKind::Slot(index) => self.slots.get(*index).cloned().ok_or_else(|| {
                Interrupt::error(RuntimeError::Unavailable(format!("slot {}", index)), span)
            }),
        }
    }

    /// Resolve an lvalue node to the place it denotes, evaluating its object
    /// and index subexpressions once.
    pub(crate) fn locate(&mut self, node: &EvaluatorNode) -> Result<Location, Interrupt> {
        let span = &node.span;
        match &node.kind {
            NodeKind::LocalVariableRef(LocalRef::Scoped(name)) => Ok(Location::Scoped(name.clone())),
            NodeKind::LocalVariableRef(LocalRef::Frame(name)) => {
                Ok(Location::FrameLocal(name.clone()))
            }
            NodeKind::FieldRef {
                target: FieldTarget::Static,
                field,
            } => Ok(Location::StaticField(field.clone())),
            NodeKind::FieldRef {
                target: FieldTarget::Instance(object),
                field,
            } => {
                let value = self.eval(object)?;
                let object = self.object(
                    value,
                    || format!("cannot access field \"{}\" because the value is null", field.name),
                    span,
                )?;
                Ok(Location::Field {
                    object,
                    field: field.clone(),
                })
            }
            NodeKind::ArrayAccess { array, index } => {
                let array_value = self.eval(array)?;
                let index_value = self.eval(index)?;
                let array = self.object(
                    array_value,
                    || "cannot access an element of a null array".to_string(),
                    span,
                )?;
                let index = self.index(&index_value, &index.span)?;
                Ok(Location::ArrayElement { array, index })
            }
            NodeKind::Fallback { name, field } => {
                let choice = match self.fallbacks.get(name).copied() {
                    Some(choice) => choice,
                    None => {
                        let local = self
                            .vm
                            .frame_local(self.frame.thread, self.frame.frame, name);
                        let choice = match (local, field) {
                            (Ok(_), _) => FallbackChoice::Local,
                            (Err(VmError::AbsentLocal(_)), Some(_)) => FallbackChoice::Field,
                            (Err(error), _) => return Err(Interrupt::from_vm(error, span)),
                        };
                        self.fallbacks.insert(name.clone(), choice);
                        choice
                    }
                };
                match (choice, field) {
                    (FallbackChoice::Field, Some(field)) => self.locate(field),
                    _ => Ok(Location::FrameLocal(name.clone())),
                }
            }
            _ => Err(Interrupt::error(
                RuntimeError::NotAssignable(format!("{:?}", node.kind)),
                span,
            )),
        }
    }

    fn binary(
        &mut self,
        operation: BinaryOperation,
        left: &Value,
        right: &Value,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        match operation {
            BinaryOperation::Arithmetic { op, kind } => {
                operators::arithmetic(op, kind, left, right).at(span)
            }
            BinaryOperation::Shift { op, kind } => operators::shift(op, kind, left, right).at(span),
            BinaryOperation::Compare { op, kind } => {
                Ok(Value::Boolean(operators::compare(op, kind, left, right).at(span)?))
            }
            BinaryOperation::ReferenceEquality { negated } => {
                let same = match (left, right) {
                    (Value::Null, Value::Null) => true,
                    (Value::Object(l), Value::Object(r)) => l.id == r.id,
                    _ => false,
                };
                Ok(Value::Boolean(same != negated))
            }
            BinaryOperation::Concat => {
                let mut text = self.string_of(left, span)?;
                text.push_str(&self.string_of(right, span)?);
                Ok(Value::Object(self.mirror_string(&text, span)?))
            }
        }
    }

    fn condition(&self, value: &Value, span: &Span) -> Result<bool, Interrupt> {
        value
            .as_bool()
            .ok_or_else(|| unexpected("boolean", value, span))
    }

    fn index(&self, value: &Value, span: &Span) -> Result<i32, Interrupt> {
        value
            .as_integral()
            .and_then(|index| i32::try_from(index).ok())
            .ok_or_else(|| unexpected("int", value, span))
    }

    fn object(
        &self,
        value: Value,
        null_message: impl FnOnce() -> String,
        span: &Span,
    ) -> Result<ObjectRef, Interrupt> {
        match value {
            Value::Object(object) => Ok(object),
            Value::Null => Err(null_pointer(null_message(), span)),
            other => Err(unexpected("an object", &other, span)),
        }
    }

    fn check_invocation_allowed(&self, span: &Span) -> Result<(), Interrupt> {
        if self.options.allow_method_invocation {
            Ok(())
        } else {
            Err(Interrupt::error(RuntimeError::InvocationDisabled, span))
        }
    }

    fn outer_instance(&mut self, hops: &[FieldInfo], span: &Span) -> Result<ObjectRef, Interrupt> {
        let mut current = self.this_object(span)?;
        for hop in hops {
            current = match self.vm.get_field(&current, hop).at(span)? {
                Value::Object(outer) => outer,
                _ => {
                    return Err(null_pointer(
                        format!("{} has no enclosing instance", current.runtime_type),
                        span,
                    ));
                }
            };
        }
        Ok(current)
    }

    fn eval_all(&mut self, nodes: &[EvaluatorNode]) -> Result<Args, Interrupt> {
        let mut values = Args::with_capacity(nodes.len());
        for node in nodes {
            values.push(self.eval(node)?);
        }
        Ok(values)
    }

    fn eval_statements(&mut self, statements: &[EvaluatorNode]) -> Result<Value, Interrupt> {
        let mut last = Value::Void;
        for statement in statements {
            last = self.eval(statement)?;
        }
        Ok(last)
    }

    fn eval_with_slot(&mut self, value: Value, node: &EvaluatorNode) -> Result<Value, Interrupt> {
        self.slots.push(value);
        let result = self.eval(node);
        self.slots.pop();
        result
    }

    fn enter_scope(&mut self, names: &[(String, Value)], span: &Span) -> Result<(), Interrupt> {
        let scope = Scope::with_defaults(names.iter().cloned()).map_err(|duplicate| {
            Interrupt::error(RuntimeError::DuplicateVariable(duplicate.0), span)
        })?;
        self.scopes.push(scope);
        Ok(())
    }

    fn leave_scope(&mut self, span: &Span) -> Result<(), Interrupt> {
        self.scopes
            .pop()
            .map(|_| ())
            .map_err(|error| Interrupt::error(RuntimeError::Unavailable(error.to_string()), span))
    }

    fn eval_for(
        &mut self,
        label: &Option<String>,
        init: &[EvaluatorNode],
        cond: Option<&EvaluatorNode>,
        update: &[EvaluatorNode],
        body: &EvaluatorNode,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        self.eval_all(init)?;
        loop {
            self.tick(span)?;
            if let Some(cond) = cond {
                let cond_value = self.eval(cond)?;
                if !self.condition(&cond_value, &cond.span)? {
                    break;
                }
            }
            let result = self.eval(body);
            if !continue_loop(label, result)? {
                break;
            }
            self.eval_all(update)?;
        }
        Ok(Value::Void)
    }

    /// One enhanced-`for` iteration: convert the raw element, bind it in a
    /// fresh scope and run the body.
    fn for_each_step(
        &mut self,
        label: &Option<String>,
        variable: &str,
        raw: Value,
        element: &EvaluatorNode,
        body: &EvaluatorNode,
        span: &Span,
    ) -> Result<bool, Interrupt> {
        let value = self.eval_with_slot(raw, element)?;
        self.enter_scope(&[(variable.to_string(), value)], span)?;
        let result = self.eval(body);
        self.leave_scope(span)?;
        continue_loop(label, result)
    }

    fn for_each_element(
        &mut self,
        label: &Option<String>,
        variable: &str,
        array: &ObjectRef,
        element: &EvaluatorNode,
        body: &EvaluatorNode,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        let length = self.vm.array_length(array).at(span)?;
        for index in 0..length {
            self.tick(span)?;
            let raw = self.vm.array_get(array, index).at(span)?;
            if !self.for_each_step(label, variable, raw, element, body, span)? {
                break;
            }
        }
        Ok(Value::Void)
    }

    fn for_each_item(
        &mut self,
        label: &Option<String>,
        variable: &str,
        iterable: &ObjectRef,
        element: &EvaluatorNode,
        body: &EvaluatorNode,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        self.check_invocation_allowed(span)?;
        let thread = self.thread();
        let iterator_method =
            MethodInfo::new(ITERABLE, "iterator", vec![], JavaType::class(ITERATOR));
        let has_next = MethodInfo::new(ITERATOR, "hasNext", vec![], JavaType::boolean());
        let next = MethodInfo::new(ITERATOR, "next", vec![], JavaType::object());

        let iterator = self
            .vm
            .invoke_method(thread, iterable, &iterator_method, &[], false)
            .at(span)?;
        let iterator = self.object(iterator, || "iterator() returned null".to_string(), span)?;
        let iterator = self.pin_object(iterator, span)?;
        loop {
            self.tick(span)?;
            let more = self
                .vm
                .invoke_method(thread, &iterator, &has_next, &[], false)
                .at(span)?;
            if !self.condition(&more, span)? {
                break;
            }
            let raw = self
                .vm
                .invoke_method(thread, &iterator, &next, &[], false)
                .at(span)?;
            let raw = self.pin(raw, span)?;
            if !self.for_each_step(label, variable, raw, element, body, span)? {
                break;
            }
        }
        Ok(Value::Void)
    }

    fn find_catch<'n>(
        &mut self,
        catches: &'n [CatchNode],
        exception: &ObjectRef,
        span: &Span,
    ) -> Result<Option<&'n CatchNode>, Interrupt> {
        for clause in catches {
            for ty in &clause.types {
                if self.vm.is_instance_of(exception, ty).at(span)? {
                    return Ok(Some(clause));
                }
            }
        }
        Ok(None)
    }

    fn eval_catch(
        &mut self,
        clause: &CatchNode,
        exception: ObjectRef,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        trace!(exception = %exception, variable = %clause.variable, "caught");
        self.enter_scope(&[(clause.variable.clone(), Value::Object(exception))], span)?;
        let result = self.eval(&clause.body);
        self.leave_scope(span)?;
        result
    }
}
