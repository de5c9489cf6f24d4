//! Conversions that need the debuggee: boxing, unboxing, checked reference
//! casts and string conversion.

use tracing::debug;

use super::context::ExecutionContext;
use super::error::{AtSpan, Interrupt, RuntimeError};
use crate::casting::cast_primitive;
use crate::parser::Span;
use crate::types::{JavaType, MethodInfo, OBJECT, PrimitiveKind, STRING, method_signature};
use crate::values::{ObjectRef, Value, format};

impl ExecutionContext<'_> {
    /// Wrap a primitive in its wrapper object, through `valueOf` or, on
    /// runtimes without it, the wrapper's constructor.
    pub(crate) fn box_value(
        &mut self,
        value: &Value,
        kind: PrimitiveKind,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        let primitive = cast_primitive(value, kind).at(span)?;
        let factory = self.boxing_factory(kind, span)?;
        let thread = self.thread();
        let boxed = if factory.is_constructor() {
            let object = self.vm.new_instance(thread, &factory, &[primitive]).at(span)?;
            Value::Object(object)
        } else {
            self.vm.invoke_static(thread, &factory, &[primitive]).at(span)?
        };
        self.pin(boxed, span)
    }

    fn boxing_factory(&mut self, kind: PrimitiveKind, span: &Span) -> Result<MethodInfo, Interrupt> {
        if let Some(factory) = self.boxing.get(&kind) {
            return Ok(factory.clone());
        }
        let wrapper = kind.wrapper_class();
        let param = JavaType::Primitive(kind);
        let value_of = method_signature(&[param.clone()], &JavaType::class(wrapper));
        let factory = match self.vm.find_method(wrapper, "valueOf", &value_of).at(span)? {
            Some(method) => method,
            None => {
                let constructor = method_signature(&[param], &JavaType::Void);
                self.vm
                    .find_method(wrapper, MethodInfo::CONSTRUCTOR, &constructor)
                    .at(span)?
                    .ok_or_else(|| {
                        Interrupt::error(RuntimeError::NoBoxingFactory { kind, wrapper }, span)
                    })?
            }
        };
        debug!(%kind, %factory, "boxing factory");
        self.boxing.insert(kind, factory.clone());
        Ok(factory)
    }

    /// Read the primitive out of a wrapper object and convert it to `kind`.
    pub(crate) fn unbox_value(
        &mut self,
        value: &Value,
        kind: PrimitiveKind,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        let object = match value {
            Value::Null => {
                return Err(Interrupt::error(
                    RuntimeError::NullPointer(format!("cannot unbox a null value to {}", kind)),
                    span,
                ));
            }
            Value::Object(object) => object,
            primitive => return cast_primitive(primitive, kind).at(span),
        };
        let Some(actual) = PrimitiveKind::from_wrapper_class(&object.runtime_type) else {
            return Err(Interrupt::error(
                RuntimeError::NotAWrapper(object.runtime_type.clone()),
                span,
            ));
        };
        let accessor = MethodInfo::new(
            actual.wrapper_class(),
            actual.unbox_method(),
            vec![],
            JavaType::Primitive(actual),
        );
        let thread = self.thread();
        let primitive = self
            .vm
            .invoke_method(thread, object, &accessor, &[], false)
            .at(span)?;
        cast_primitive(&primitive, kind).at(span)
    }

    /// Reference narrowing: `null` passes, anything else must be an instance
    /// of `ty`.
    pub(crate) fn check_cast(
        &mut self,
        value: Value,
        ty: &JavaType,
        span: &Span,
    ) -> Result<Value, Interrupt> {
        match &value {
            Value::Null => Ok(value),
            Value::Object(object) => {
                if self.vm.is_instance_of(object, ty).at(span)? {
                    Ok(value)
                } else {
                    Err(Interrupt::error(
                        RuntimeError::ClassCast {
                            value: object.runtime_type.clone(),
                            target: ty.clone(),
                        },
                        span,
                    ))
                }
            }
            other => Err(Interrupt::error(
                RuntimeError::UnexpectedValue {
                    expected: ty.to_string(),
                    found: other.type_of().to_string(),
                },
                span,
            )),
        }
    }

    /// `String.valueOf(value)`: primitives are formatted locally, strings read
    /// back, other objects asked for `toString()`.
    pub(crate) fn string_of(&mut self, value: &Value, span: &Span) -> Result<String, Interrupt> {
        if let Some(text) = format::primitive_to_string(value) {
            return Ok(text);
        }
        let Value::Object(object) = value else {
            return Err(Interrupt::error(
                RuntimeError::UnexpectedValue {
                    expected: "a value".to_string(),
                    found: value.type_of().to_string(),
                },
                span,
            ));
        };
        if object.runtime_type == STRING {
            return self.vm.string_value(object).at(span);
        }
        let to_string = MethodInfo::new(OBJECT, "toString", vec![], JavaType::string());
        let thread = self.thread();
        match self
            .vm
            .invoke_method(thread, object, &to_string, &[], false)
            .at(span)?
        {
            Value::Object(string) => self.vm.string_value(&string).at(span),
            _ => Ok("null".to_string()),
        }
    }

    /// Create a string in the debuggee and keep it alive.
    pub(crate) fn mirror_string(&mut self, text: &str, span: &Span) -> Result<ObjectRef, Interrupt> {
        let string = self.vm.mirror_string(text).at(span)?;
        self.pin_object(string, span)
    }
}
