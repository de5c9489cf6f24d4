//! Method bodies for the builtin classes of [`MockVm`].

use super::mock::HeapObject;
use super::{MockVm, RemoteVm, VmError};
use crate::casting::cast_primitive;
use crate::types::{
    JavaType, OBJECT, PrimitiveKind, STRING, THROWABLE, builtins::ARRAY_LIST_ITERATOR,
};
use crate::values::{ObjectRef, Value, format};

const STRING_BUILDER: &str = "java.lang.StringBuilder";
const ARRAY_LIST: &str = "java.util.ArrayList";

pub(super) fn install(vm: &mut MockVm) {
    install_object(vm);
    install_string(vm);
    install_string_builder(vm);
    install_wrappers(vm);
    install_math(vm);
    install_array_list(vm);
    install_throwable(vm);
}

fn receiver(this: Option<&ObjectRef>) -> Result<&ObjectRef, VmError> {
    this.ok_or_else(|| VmError::Other("missing receiver".to_string()))
}

fn arg(args: &[Value], index: usize) -> Result<&Value, VmError> {
    args.get(index)
        .ok_or_else(|| VmError::Other(format!("missing argument {}", index)))
}

fn mismatch(expected: &str, found: &Value) -> VmError {
    VmError::TypeMismatch {
        expected: expected.to_string(),
        found: found.type_of().to_string(),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, VmError> {
    match arg(args, index)? {
        Value::Int(v) => Ok(*v),
        other => Err(mismatch("int", other)),
    }
}

fn double_arg(args: &[Value], index: usize) -> Result<f64, VmError> {
    match arg(args, index)? {
        Value::Double(v) => Ok(*v),
        other => Err(mismatch("double", other)),
    }
}

fn long_arg(args: &[Value], index: usize) -> Result<i64, VmError> {
    match arg(args, index)? {
        Value::Long(v) => Ok(*v),
        other => Err(mismatch("long", other)),
    }
}

/// Contents of a `String` argument; `None` for `null`.
fn string_arg(vm: &mut MockVm, args: &[Value], index: usize) -> Result<Option<String>, VmError> {
    match arg(args, index)? {
        Value::Null => Ok(None),
        Value::Object(object) => vm.string_value(object).map(Some),
        other => Err(mismatch(STRING, other)),
    }
}

fn text_of(vm: &MockVm, object: &ObjectRef) -> Result<String, VmError> {
    match vm.data(object)? {
        HeapObject::Text(text) => Ok(text.clone()),
        _ => Err(VmError::TypeMismatch {
            expected: STRING.to_string(),
            found: object.runtime_type.clone(),
        }),
    }
}

fn string_result(vm: &mut MockVm, text: &str) -> Result<Value, VmError> {
    Ok(Value::Object(vm.mirror_string(text)?))
}

/// `String.hashCode()` over UTF-16 code units.
fn java_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

fn install_object(vm: &mut MockVm) {
    vm.define_native(OBJECT, "<init>", &[], |_, _, _| Ok(Value::Void));
    vm.define_native(OBJECT, "hashCode", &[], |_, this, _| {
        Ok(Value::Int(receiver(this)?.id as i32))
    });
    vm.define_native(OBJECT, "equals", &[JavaType::object()], |_, this, args| {
        let this = receiver(this)?;
        Ok(Value::Boolean(
            matches!(arg(args, 0)?, Value::Object(other) if other.id == this.id),
        ))
    });
    vm.define_native(OBJECT, "toString", &[], |vm, this, _| {
        let this = receiver(this)?;
        let text = format!("{}@{:x}", this.runtime_type, this.id);
        string_result(vm, &text)
    });
    vm.define_native(OBJECT, "getClass", &[], |vm, this, _| {
        let this = receiver(this)?;
        Ok(Value::Object(vm.class_object(&this.ty(), None)?))
    });
    vm.define_native("java.lang.Class", "getName", &[], |vm, this, _| {
        let name = match vm.data(receiver(this)?)? {
            HeapObject::Class(ty) => ty.to_string(),
            _ => return Err(VmError::Other("not a class object".to_string())),
        };
        string_result(vm, &name)
    });
}

fn install_string(vm: &mut MockVm) {
    let string = JavaType::string;
    let int = JavaType::int;

    vm.define_native(STRING, "<init>", &[], |_, _, _| Ok(Value::Void));
    vm.define_native(STRING, "<init>", &[string()], |vm, this, args| {
        let text = string_arg(vm, args, 0)?.unwrap_or_default();
        *vm.data_mut(receiver(this)?)? = HeapObject::Text(text);
        Ok(Value::Void)
    });
    vm.define_native(STRING, "length", &[], |vm, this, _| {
        let text = text_of(vm, receiver(this)?)?;
        Ok(Value::Int(text.encode_utf16().count() as i32))
    });
    vm.define_native(STRING, "isEmpty", &[], |vm, this, _| {
        Ok(Value::Boolean(text_of(vm, receiver(this)?)?.is_empty()))
    });
    vm.define_native(STRING, "charAt", &[int()], |vm, this, args| {
        let units: Vec<u16> = text_of(vm, receiver(this)?)?.encode_utf16().collect();
        let index = int_arg(args, 0)?;
        match usize::try_from(index).ok().and_then(|i| units.get(i)) {
            Some(unit) => Ok(Value::Char(*unit)),
            None => Err(vm.throw(
                "java.lang.IndexOutOfBoundsException",
                &format!("index {} out of bounds for length {}", index, units.len()),
            )),
        }
    });
    vm.define_native(STRING, "substring", &[int(), int()], |vm, this, args| {
        let units: Vec<u16> = text_of(vm, receiver(this)?)?.encode_utf16().collect();
        let (begin, end) = (int_arg(args, 0)?, int_arg(args, 1)?);
        match (usize::try_from(begin), usize::try_from(end)) {
            (Ok(b), Ok(e)) if b <= e && e <= units.len() => {
                string_result(vm, &String::from_utf16_lossy(&units[b..e]))
            }
            _ => Err(vm.throw(
                "java.lang.IndexOutOfBoundsException",
                &format!("begin {}, end {}, length {}", begin, end, units.len()),
            )),
        }
    });
    vm.define_native(STRING, "indexOf", &[string()], |vm, this, args| {
        let text = text_of(vm, receiver(this)?)?;
        let Some(needle) = string_arg(vm, args, 0)? else {
            return Err(vm.throw("java.lang.NullPointerException", "indexOf(null)"));
        };
        let index = text
            .find(&needle)
            .map_or(-1, |byte| text[..byte].encode_utf16().count() as i32);
        Ok(Value::Int(index))
    });
    vm.define_native(STRING, "concat", &[string()], |vm, this, args| {
        let mut text = text_of(vm, receiver(this)?)?;
        let Some(other) = string_arg(vm, args, 0)? else {
            return Err(vm.throw("java.lang.NullPointerException", "concat(null)"));
        };
        text.push_str(&other);
        string_result(vm, &text)
    });
    vm.define_native(STRING, "equals", &[JavaType::object()], |vm, this, args| {
        let text = text_of(vm, receiver(this)?)?;
        let equal = match arg(args, 0)? {
            Value::Object(other) if other.runtime_type == STRING => text_of(vm, other)? == text,
            _ => false,
        };
        Ok(Value::Boolean(equal))
    });
    vm.define_native(STRING, "hashCode", &[], |vm, this, _| {
        Ok(Value::Int(java_hash(&text_of(vm, receiver(this)?)?)))
    });
    vm.define_native(STRING, "toString", &[], |_, this, _| {
        Ok(Value::Object(receiver(this)?.clone()))
    });
    vm.define_native(STRING, "valueOf", &[int()], |vm, _, args| {
        string_result(vm, &int_arg(args, 0)?.to_string())
    });
    vm.define_native(STRING, "valueOf", &[JavaType::object()], |vm, _, args| {
        let text = vm.to_java_string(arg(args, 0)?)?;
        string_result(vm, &text)
    });
    vm.define_native(
        STRING,
        "format",
        &[string(), JavaType::array_of(JavaType::object())],
        |vm, _, args| {
            let Some(pattern) = string_arg(vm, args, 0)? else {
                return Err(vm.throw("java.lang.NullPointerException", "format(null)"));
            };
            let values = match arg(args, 1)? {
                Value::Object(array) => vm.array_values(array).map(<[Value]>::to_vec).unwrap_or_default(),
                _ => Vec::new(),
            };
            let text = java_format(vm, &pattern, &values)?;
            string_result(vm, &text)
        },
    );
}

/// The `%s`, `%d`, `%n` and `%%` subset of `java.util.Formatter`.
fn java_format(vm: &mut MockVm, pattern: &str, values: &[Value]) -> Result<String, VmError> {
    let mut out = String::new();
    let mut values = values.iter();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('n') => out.push('\n'),
            Some(conversion @ ('s' | 'd')) => {
                let Some(value) = values.next() else {
                    return Err(vm.throw(
                        "java.lang.IllegalArgumentException",
                        &format!("Format specifier '%{}'", conversion),
                    ));
                };
                out.push_str(&vm.to_java_string(value)?);
            }
            other => {
                return Err(vm.throw(
                    "java.lang.IllegalArgumentException",
                    &format!("Conversion = '{}'", other.unwrap_or('%')),
                ));
            }
        }
    }
    Ok(out)
}

fn install_string_builder(vm: &mut MockVm) {
    fn append(vm: &mut MockVm, this: Option<&ObjectRef>, text: &str) -> Result<Value, VmError> {
        let this = receiver(this)?;
        match vm.data_mut(this)? {
            HeapObject::Text(buffer) => buffer.push_str(text),
            _ => return Err(VmError::Other("not a string builder".to_string())),
        }
        Ok(Value::Object(this.clone()))
    }

    vm.define_native(STRING_BUILDER, "<init>", &[], |_, _, _| Ok(Value::Void));
    vm.define_native(STRING_BUILDER, "<init>", &[JavaType::string()], |vm, this, args| {
        let text = string_arg(vm, args, 0)?.unwrap_or_else(|| "null".to_string());
        append(vm, this, &text).map(|_| Value::Void)
    });
    vm.define_native(STRING_BUILDER, "append", &[JavaType::string()], |vm, this, args| {
        let text = string_arg(vm, args, 0)?.unwrap_or_else(|| "null".to_string());
        append(vm, this, &text)
    });
    vm.define_native(STRING_BUILDER, "append", &[JavaType::object()], |vm, this, args| {
        let text = vm.to_java_string(arg(args, 0)?)?;
        append(vm, this, &text)
    });
    vm.define_native(STRING_BUILDER, "length", &[], |vm, this, _| {
        let text = text_of(vm, receiver(this)?)?;
        Ok(Value::Int(text.encode_utf16().count() as i32))
    });
    vm.define_native(STRING_BUILDER, "toString", &[], |vm, this, _| {
        let text = text_of(vm, receiver(this)?)?;
        string_result(vm, &text)
    });
}

/// Value held by a wrapper object.
fn wrapped(vm: &MockVm, this: Option<&ObjectRef>) -> Result<Value, VmError> {
    let this = receiver(this)?;
    vm.field_value(this, "value")
        .ok_or_else(|| VmError::NoSuchField {
            class: this.runtime_type.clone(),
            field: "value".to_string(),
        })
}

fn wrapper_hash(value: &Value) -> i32 {
    match value {
        Value::Boolean(b) => {
            if *b {
                1231
            } else {
                1237
            }
        }
        Value::Byte(v) => i32::from(*v),
        Value::Short(v) => i32::from(*v),
        Value::Char(v) => i32::from(*v),
        Value::Int(v) => *v,
        Value::Long(v) => (v ^ (v >> 32)) as i32,
        Value::Float(v) => v.to_bits() as i32,
        Value::Double(v) => {
            let bits = v.to_bits();
            (bits ^ (bits >> 32)) as i32
        }
        Value::Null | Value::Void | Value::Object(_) => 0,
    }
}

fn install_wrappers(vm: &mut MockVm) {
    for kind in PrimitiveKind::ALL {
        let class = kind.wrapper_class();
        let primitive = JavaType::Primitive(kind);

        vm.define_native(class, "valueOf", &[primitive.clone()], move |vm, _, args| {
            let value = cast_primitive(arg(args, 0)?, kind)
                .map_err(|e| VmError::Other(e.to_string()))?;
            vm.new_boxed(value)
                .map(Value::Object)
                .ok_or_else(|| VmError::Other("cannot box".to_string()))
        });
        vm.define_native(class, "<init>", &[primitive], move |vm, this, args| {
            let value = cast_primitive(arg(args, 0)?, kind)
                .map_err(|e| VmError::Other(e.to_string()))?;
            vm.set_field_value(receiver(this)?, "value", value);
            Ok(Value::Void)
        });

        let accessors: Vec<PrimitiveKind> = if kind.is_numeric() && kind != PrimitiveKind::Char {
            PrimitiveKind::ALL
                .into_iter()
                .filter(|k| k.is_numeric() && *k != PrimitiveKind::Char)
                .collect()
        } else {
            vec![kind]
        };
        for target in accessors {
            vm.define_native(class, target.unbox_method(), &[], move |vm, this, _| {
                let value = wrapped(vm, this)?;
                cast_primitive(&value, target).map_err(|e| VmError::Other(e.to_string()))
            });
        }

        vm.define_native(class, "toString", &[], |vm, this, _| {
            let value = wrapped(vm, this)?;
            let text = format::primitive_to_string(&value).unwrap_or_default();
            string_result(vm, &text)
        });
        vm.define_native(class, "hashCode", &[], |vm, this, _| {
            Ok(Value::Int(wrapper_hash(&wrapped(vm, this)?)))
        });
        vm.define_native(class, "equals", &[JavaType::object()], |vm, this, args| {
            let value = wrapped(vm, this)?;
            let equal = match arg(args, 0)? {
                Value::Object(other) if other.runtime_type == receiver(this)?.runtime_type => {
                    vm.field_value(other, "value") == Some(value)
                }
                _ => false,
            };
            Ok(Value::Boolean(equal))
        });
    }

    vm.define_native(
        "java.lang.Integer",
        "parseInt",
        &[JavaType::string()],
        |vm, _, args| {
            let text = string_arg(vm, args, 0)?.unwrap_or_else(|| "null".to_string());
            match text.parse::<i32>() {
                Ok(value) => Ok(Value::Int(value)),
                Err(_) => Err(vm.throw(
                    "java.lang.NumberFormatException",
                    &format!("For input string: \"{}\"", text),
                )),
            }
        },
    );

    let limits = [
        (PrimitiveKind::Byte, Value::Byte(i8::MIN), Value::Byte(i8::MAX)),
        (PrimitiveKind::Short, Value::Short(i16::MIN), Value::Short(i16::MAX)),
        (PrimitiveKind::Char, Value::Char(0), Value::Char(u16::MAX)),
        (PrimitiveKind::Int, Value::Int(i32::MIN), Value::Int(i32::MAX)),
        (PrimitiveKind::Long, Value::Long(i64::MIN), Value::Long(i64::MAX)),
        (
            PrimitiveKind::Float,
            Value::Float(f32::from_bits(1)),
            Value::Float(f32::MAX),
        ),
        (
            PrimitiveKind::Double,
            Value::Double(f64::from_bits(1)),
            Value::Double(f64::MAX),
        ),
    ];
    for (kind, min, max) in limits {
        vm.set_static(kind.wrapper_class(), "MIN_VALUE", min);
        vm.set_static(kind.wrapper_class(), "MAX_VALUE", max);
    }

    let boolean = PrimitiveKind::Boolean.wrapper_class();
    for (name, value) in [("TRUE", true), ("FALSE", false)] {
        if let Some(object) = vm.new_boxed(Value::Boolean(value)) {
            vm.set_static(boolean, name, Value::Object(object));
        }
    }
}

fn java_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn java_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn install_math(vm: &mut MockVm) {
    const MATH: &str = "java.lang.Math";
    let (int, long, double) = (JavaType::int(), JavaType::long(), JavaType::double());

    vm.set_static(MATH, "PI", Value::Double(core::f64::consts::PI));
    vm.define_native(MATH, "abs", &[int.clone()], |_, _, args| {
        Ok(Value::Int(int_arg(args, 0)?.wrapping_abs()))
    });
    vm.define_native(MATH, "abs", &[long.clone()], |_, _, args| {
        Ok(Value::Long(long_arg(args, 0)?.wrapping_abs()))
    });
    vm.define_native(MATH, "abs", &[double.clone()], |_, _, args| {
        Ok(Value::Double(double_arg(args, 0)?.abs()))
    });
    vm.define_native(MATH, "max", &[int.clone(), int.clone()], |_, _, args| {
        Ok(Value::Int(int_arg(args, 0)?.max(int_arg(args, 1)?)))
    });
    vm.define_native(MATH, "max", &[long.clone(), long.clone()], |_, _, args| {
        Ok(Value::Long(long_arg(args, 0)?.max(long_arg(args, 1)?)))
    });
    vm.define_native(MATH, "max", &[double.clone(), double.clone()], |_, _, args| {
        Ok(Value::Double(java_max(double_arg(args, 0)?, double_arg(args, 1)?)))
    });
    vm.define_native(MATH, "min", &[int.clone(), int], |_, _, args| {
        Ok(Value::Int(int_arg(args, 0)?.min(int_arg(args, 1)?)))
    });
    vm.define_native(MATH, "min", &[double.clone(), double.clone()], |_, _, args| {
        Ok(Value::Double(java_min(double_arg(args, 0)?, double_arg(args, 1)?)))
    });
    vm.define_native(MATH, "sqrt", &[double.clone()], |_, _, args| {
        Ok(Value::Double(double_arg(args, 0)?.sqrt()))
    });
    vm.define_native(MATH, "pow", &[double.clone(), double], |_, _, args| {
        Ok(Value::Double(double_arg(args, 0)?.powf(double_arg(args, 1)?)))
    });
}

fn list_values(vm: &MockVm, this: Option<&ObjectRef>) -> Result<Vec<Value>, VmError> {
    match vm.data(receiver(this)?)? {
        HeapObject::List(values) => Ok(values.clone()),
        _ => Err(VmError::Other("not a list".to_string())),
    }
}

/// `a.equals(b)` with `null` handled on the caller's side.
fn java_equals(vm: &mut MockVm, a: &Value, b: &Value) -> Result<bool, VmError> {
    match a {
        Value::Object(object) => {
            let result = vm.call(
                object,
                "equals",
                vec![JavaType::object()],
                JavaType::boolean(),
                core::slice::from_ref(b),
            )?;
            Ok(result.as_bool().unwrap_or(false))
        }
        other => Ok(other == b),
    }
}

fn install_array_list(vm: &mut MockVm) {
    let object = JavaType::object;

    vm.define_native(ARRAY_LIST, "<init>", &[], |_, _, _| Ok(Value::Void));
    vm.define_native(ARRAY_LIST, "size", &[], |vm, this, _| {
        Ok(Value::Int(list_values(vm, this)?.len() as i32))
    });
    vm.define_native(ARRAY_LIST, "isEmpty", &[], |vm, this, _| {
        Ok(Value::Boolean(list_values(vm, this)?.is_empty()))
    });
    vm.define_native(ARRAY_LIST, "add", &[object()], |vm, this, args| {
        let value = arg(args, 0)?.clone();
        if let HeapObject::List(values) = vm.data_mut(receiver(this)?)? {
            values.push(value);
        }
        Ok(Value::Boolean(true))
    });
    vm.define_native(ARRAY_LIST, "get", &[JavaType::int()], |vm, this, args| {
        let values = list_values(vm, this)?;
        let index = int_arg(args, 0)?;
        match usize::try_from(index).ok().and_then(|i| values.get(i)) {
            Some(value) => Ok(value.clone()),
            None => Err(vm.throw(
                "java.lang.IndexOutOfBoundsException",
                &format!("Index {} out of bounds for length {}", index, values.len()),
            )),
        }
    });
    vm.define_native(ARRAY_LIST, "contains", &[object()], |vm, this, args| {
        let needle = arg(args, 0)?;
        for value in list_values(vm, this)? {
            let found = match needle {
                Value::Null => value.is_null(),
                _ => java_equals(vm, needle, &value)?,
            };
            if found {
                return Ok(Value::Boolean(true));
            }
        }
        Ok(Value::Boolean(false))
    });
    vm.define_native(ARRAY_LIST, "iterator", &[], |vm, this, _| {
        let list = receiver(this)?.clone();
        let iterator = vm.new_object(ARRAY_LIST_ITERATOR);
        vm.set_field_value(&iterator, "list", Value::Object(list));
        vm.set_field_value(&iterator, "cursor", Value::Int(0));
        Ok(Value::Object(iterator))
    });

    fn iterator_state(vm: &MockVm, this: &ObjectRef) -> Result<(ObjectRef, i32), VmError> {
        match (vm.field_value(this, "list"), vm.field_value(this, "cursor")) {
            (Some(Value::Object(list)), Some(Value::Int(cursor))) => Ok((list, cursor)),
            _ => Err(VmError::Other("corrupt iterator".to_string())),
        }
    }

    vm.define_native(ARRAY_LIST_ITERATOR, "hasNext", &[], |vm, this, _| {
        let (list, cursor) = iterator_state(vm, receiver(this)?)?;
        let length = list_values(vm, Some(&list))?.len();
        Ok(Value::Boolean(usize::try_from(cursor).is_ok_and(|c| c < length)))
    });
    vm.define_native(ARRAY_LIST_ITERATOR, "next", &[], |vm, this, _| {
        let this = receiver(this)?;
        let (list, cursor) = iterator_state(vm, this)?;
        let values = list_values(vm, Some(&list))?;
        match usize::try_from(cursor).ok().and_then(|c| values.get(c)) {
            Some(value) => {
                vm.set_field_value(this, "cursor", Value::Int(cursor + 1));
                Ok(value.clone())
            }
            None => Err(vm.throw("java.util.NoSuchElementException", "no more elements")),
        }
    });
}

fn install_throwable(vm: &mut MockVm) {
    vm.define_native(THROWABLE, "<init>", &[], |vm, this, _| {
        vm.set_field_value(receiver(this)?, "detailMessage", Value::Null);
        Ok(Value::Void)
    });
    vm.define_native(THROWABLE, "<init>", &[JavaType::string()], |vm, this, args| {
        let message = arg(args, 0)?.clone();
        vm.set_field_value(receiver(this)?, "detailMessage", message);
        Ok(Value::Void)
    });
    vm.define_native(THROWABLE, "getMessage", &[], |vm, this, _| {
        Ok(vm
            .field_value(receiver(this)?, "detailMessage")
            .unwrap_or(Value::Null))
    });
    vm.define_native(THROWABLE, "toString", &[], |vm, this, _| {
        let this = receiver(this)?;
        let text = match vm.field_value(this, "detailMessage") {
            Some(Value::Object(message)) => {
                format!("{}: {}", this.runtime_type, vm.string_value(&message)?)
            }
            _ => this.runtime_type.clone(),
        };
        string_result(vm, &text)
    });
}
