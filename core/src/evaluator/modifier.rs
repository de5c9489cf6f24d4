//! Write access to the place an evaluated expression was read from.

use core::fmt;

use crate::casting::cast_primitive;
use crate::remote::{FrameId, RemoteVm, ThreadId, VmError};
use crate::types::{FieldInfo, JavaType};
use crate::values::{ObjectRef, Value};

/// A settable location produced by evaluating a variable, field or array
/// element expression, so a debugger can offer "set value".
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Local {
        thread: ThreadId,
        frame: FrameId,
        name: String,
        ty: JavaType,
    },
    Field {
        object: ObjectRef,
        field: FieldInfo,
    },
    StaticField {
        field: FieldInfo,
    },
    ArrayElement {
        array: ObjectRef,
        index: i32,
        element: JavaType,
    },
}

impl Modifier {
    /// Static type of the location.
    pub fn ty(&self) -> &JavaType {
        match self {
            Modifier::Local { ty, .. } => ty,
            Modifier::Field { field, .. } | Modifier::StaticField { field } => &field.ty,
            Modifier::ArrayElement { element, .. } => element,
        }
    }

    /// Store `value`, widening primitives to the location's type.
    pub fn set_value(&self, vm: &mut dyn RemoteVm, value: Value) -> Result<(), VmError> {
        let value = self.convert(value)?;
        match self {
            Modifier::Local {
                thread,
                frame,
                name,
                ..
            } => vm.set_frame_local(*thread, *frame, name, value),
            Modifier::Field { object, field } => vm.set_field(object, field, value),
            Modifier::StaticField { field } => vm.set_static_field(field, value),
            Modifier::ArrayElement { array, index, .. } => vm.array_set(array, *index, value),
        }
    }

    fn convert(&self, value: Value) -> Result<Value, VmError> {
        let ty = self.ty();
        let mismatch = |value: &Value| VmError::TypeMismatch {
            expected: ty.to_string(),
            found: value.type_of().to_string(),
        };
        match (ty.as_primitive(), value.primitive_kind()) {
            (Some(target), Some(source)) if source == target => Ok(value),
            (Some(target), Some(source)) if source.widens_to(target) => {
                cast_primitive(&value, target).map_err(|_| mismatch(&value))
            }
            (Some(_), _) => Err(mismatch(&value)),
            (None, Some(_)) => Err(mismatch(&value)),
            (None, None) => Ok(value),
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Local { name, .. } => write!(f, "local {}", name),
            Modifier::Field { object, field } => write!(f, "{}.{}", object, field.name),
            Modifier::StaticField { field } => write!(f, "{}", field),
            Modifier::ArrayElement { array, index, .. } => write!(f, "{}[{}]", array, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockVm;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_local_modifier_widens() {
        let mut vm = MockVm::new();
        vm.set_local(1, 1, "total", Value::Long(0));
        let modifier = Modifier::Local {
            thread: 1,
            frame: 1,
            name: "total".to_string(),
            ty: JavaType::long(),
        };
        modifier.set_value(&mut vm, Value::Int(7)).unwrap();
        assert_eq!(vm.local(1, 1, "total"), Some(&Value::Long(7)));
    }

    #[test]
    fn test_narrowing_is_rejected() {
        let mut vm = MockVm::new();
        let array = vm.new_array_of(&JavaType::int(), vec![Value::Int(1)]);
        let modifier = Modifier::ArrayElement {
            array: array.clone(),
            index: 0,
            element: JavaType::int(),
        };
        let result = modifier.set_value(&mut vm, Value::Double(2.5));
        assert!(matches!(result, Err(VmError::TypeMismatch { .. })));
        modifier.set_value(&mut vm, Value::Char(0x41)).unwrap();
        assert_eq!(vm.array_values(&array), Some(&[Value::Int(65)][..]));
    }

    #[test]
    fn test_reference_locations_reject_primitives() {
        let mut vm = MockVm::new();
        let modifier = Modifier::StaticField {
            field: FieldInfo::new_static("java.lang.Math", "name", JavaType::string()),
        };
        assert!(modifier.set_value(&mut vm, Value::Int(1)).is_err());
        assert_eq!(modifier.ty(), &JavaType::string());
        assert_eq!(modifier.to_string(), "java.lang.Math.name");
    }
}
