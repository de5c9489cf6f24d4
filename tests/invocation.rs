mod cases;

use cases::{Debuggee, SHOP};
use jeval::{ExecutionOptions, Error, Value};
use pretty_assertions::assert_eq;

test_case!(
    implicit_this_call,
    input: "size()",
    value: Value::Int(3),
);

test_case!(
    explicit_this_call,
    input: "this.discount(0.25)",
    value: Value::Double(75.0),
);

test_case!(
    argument_widened_to_parameter,
    input: "discount(0)",
    value: Value::Double(100.0),
);

test_case!(
    static_factory_then_field,
    input: "Shop.create().count",
    value: Value::Int(0),
);

test_case!(
    static_field_arithmetic,
    input: "TOTAL + n",
    value: Value::Long(1_004),
);

test_case!(
    most_specific_overload,
    input: "Math.max(n, 10L)",
    value: Value::Long(10),
);

test_case!(
    int_overload_preferred,
    input: "Math.max(n, 10)",
    value: Value::Int(10),
);

test_case!(
    static_overload_by_argument,
    input: "String.valueOf(n) + String.valueOf(owner)",
    text: "4ada",
);

test_case!(
    chained_virtual_calls,
    input: "getClass().getName()",
    text: "com.example.Shop",
);

test_case!(
    inner_class_instance,
    input: "Cart c = new Cart(); c.quantity = 2; c.total()",
    value: Value::Int(2),
);

test_case!(
    list_calls,
    input: "java.util.ArrayList l = new java.util.ArrayList(); l.add(owner); l.add(n); l.size()",
    value: Value::Int(2),
);

test_case!(
    interface_call_on_field,
    input: "items.size() + items.get(2).hashCode()",
    value: Value::Int(33),
);

test_case!(
    parse_int,
    input: "Integer.parseInt(\"12\") + 1",
    value: Value::Int(13),
);

test_case!(
    parse_int_failure_is_thrown,
    input: "Integer.parseInt(\"twelve\")",
    error: Error::Exception { .. },
);

#[test]
fn test_static_assignment_reaches_the_debuggee() {
    let mut debuggee = Debuggee::new();
    let result = debuggee.evaluate("TOTAL = TOTAL * 2").unwrap();
    assert_eq!(result.value, Value::Long(2_000));
    assert_eq!(debuggee.vm.static_value(SHOP, "TOTAL"), Some(&Value::Long(2_000)));
}

#[test]
fn test_field_assignment_reaches_the_debuggee() {
    let mut debuggee = Debuggee::new();
    debuggee.evaluate("this.count += n").unwrap();
    assert_eq!(debuggee.vm.field_value(&debuggee.this, "count"), Some(Value::Int(7)));
}

#[test]
fn test_array_element_assignment() {
    let mut debuggee = Debuggee::new();
    let result = debuggee.evaluate("prices[1] = n; prices[0] + prices[1]").unwrap();
    assert_eq!(result.value, Value::Double(5.5));
}

#[test]
fn test_invocation_can_be_disabled() {
    let mut debuggee = Debuggee::new();
    let expr = cases::engine()
        .compile("size() + n", &cases::checkout_context())
        .unwrap();
    let options = ExecutionOptions {
        allow_method_invocation: false,
        ..ExecutionOptions::default()
    };
    let result = expr.evaluate_with_options(&mut debuggee.vm, &debuggee.frame, &options);
    assert!(matches!(result, Err(Error::Runtime { .. })), "{:?}", result);

    let plain = cases::engine()
        .compile("n * 2", &cases::checkout_context())
        .unwrap();
    let result = plain
        .evaluate_with_options(&mut debuggee.vm, &debuggee.frame, &options)
        .unwrap();
    assert_eq!(result.value, Value::Int(8));
}
