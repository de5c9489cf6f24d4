//! `String.valueOf` for values that never need a round trip to the debuggee.

use super::Value;

/// Text that string concatenation produces for `value`, or `None` when the
/// value is an object whose `toString()` has to be invoked remotely.
pub fn primitive_to_string(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Char(c) => char_to_string(*c),
        Value::Int(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => float_to_string(*v),
        Value::Double(v) => double_to_string(*v),
        Value::Void | Value::Object(_) => return None,
    };
    Some(text)
}

/// A lone surrogate renders as U+FFFD.
pub fn char_to_string(c: u16) -> String {
    char::decode_utf16([c])
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

pub fn double_to_string(value: f64) -> String {
    if let Some(special) = special(
        value.is_nan(),
        value.is_infinite(),
        value == 0.0,
        value.is_sign_negative(),
    ) {
        return special;
    }
    render(format!("{}", value), format!("{:e}", value), value.abs())
}

pub fn float_to_string(value: f32) -> String {
    if let Some(special) = special(
        value.is_nan(),
        value.is_infinite(),
        value == 0.0,
        value.is_sign_negative(),
    ) {
        return special;
    }
    render(
        format!("{}", value),
        format!("{:e}", value),
        f64::from(value.abs()),
    )
}

fn special(nan: bool, infinite: bool, zero: bool, negative: bool) -> Option<String> {
    let text = match (nan, infinite, zero, negative) {
        (true, _, _, _) => "NaN",
        (_, true, _, false) => "Infinity",
        (_, true, _, true) => "-Infinity",
        (_, _, true, false) => "0.0",
        (_, _, true, true) => "-0.0",
        _ => return None,
    };
    Some(text.to_string())
}

/// Plain notation inside [10^-3, 10^7), computerized scientific notation
/// (`1.0E10`) outside.
fn render(plain: String, scientific: String, magnitude: f64) -> String {
    if (1e-3..1e7).contains(&magnitude) {
        return with_fraction(plain);
    }
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            format!("{}E{}", with_fraction(mantissa.to_string()), exponent)
        }
        None => scientific,
    }
}

fn with_fraction(text: String) -> String {
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}
