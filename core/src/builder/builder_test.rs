use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::*;
use crate::casting::CastError;
use crate::evaluator::{
    self, BinaryOperation, CastTarget, EvaluatorNode, EvaluatorOptions, FieldTarget, FrameContext,
    Interrupt, LocalRef, NodeKind, Receiver,
};
use crate::parser;
use crate::remote::MockVm;
use crate::types::{ClassInfo, ClassPath, FieldInfo, LocalVariable, PrimitiveKind};
use crate::values::Value;

const THREAD: u64 = 1;
const FRAME: u64 = 0;

fn build_source(
    source: &str,
    context: &CompileContext,
    resolver: &dyn SymbolResolver,
) -> Result<BuiltFragment, BuildError> {
    let arena = Bump::new();
    let parsed = parser::parse(&arena, source)
        .unwrap_or_else(|e| panic!("parse error in {:?}: {:?}", source, e));
    build(&parsed, context, resolver)
}

fn build_ok(source: &str, context: &CompileContext, resolver: &dyn SymbolResolver) -> BuiltFragment {
    build_source(source, context, resolver)
        .unwrap_or_else(|e| panic!("build error in {:?}: {}", source, e))
}

fn build_error(source: &str, context: &CompileContext) -> BuildErrorKind {
    let class_path = ClassPath::with_builtins();
    match build_source(source, context, &class_path) {
        Ok(built) => panic!("{:?} built: {:?}", source, built.root),
        Err(e) => e.kind,
    }
}

fn result_type(source: &str) -> JavaType {
    let class_path = ClassPath::with_builtins();
    build_ok(source, &CompileContext::new(), &class_path).result_type
}

fn eval_in(vm: &mut MockVm, source: &str, context: &CompileContext) -> Result<Value, Interrupt> {
    let built = build_ok(source, context, vm.class_path());
    let frame = FrameContext::new(THREAD, FRAME);
    evaluator::run(vm, &frame, &EvaluatorOptions::default(), &built.root, None)
        .map(|outcome| outcome.value)
}

fn eval(source: &str) -> Value {
    let mut vm = MockVm::new();
    eval_in(&mut vm, source, &CompileContext::new())
        .unwrap_or_else(|e| panic!("{:?} failed: {:?}", source, e))
}

fn eval_text(source: &str) -> String {
    let mut vm = MockVm::new();
    let value = eval_in(&mut vm, source, &CompileContext::new())
        .unwrap_or_else(|e| panic!("{:?} failed: {:?}", source, e));
    let object = value.as_object().expect("a string object");
    vm.text(object).expect("string contents").to_string()
}

/// `com.example.Shop` with an inner `Shop$Cart` and an anonymous `Shop$1`
/// that captured a local of `Shop.run`.
fn shop_class_path() -> ClassPath {
    let mut class_path = ClassPath::with_builtins();
    class_path
        .add(
            ClassInfo::new("com.example.Shop")
                .field("name", JavaType::string())
                .field("count", JavaType::int())
                .static_field("TOTAL", JavaType::long())
                .method("size", vec![], JavaType::int())
                .static_method("create", vec![], JavaType::class("com.example.Shop")),
        )
        .add(
            ClassInfo::new("com.example.Shop$Cart")
                .inner_of("com.example.Shop")
                .field("items", JavaType::int())
                .constructor(vec![]),
        )
        .add(
            ClassInfo::new("com.example.Shop$1")
                .inner_of("com.example.Shop")
                .field("val$limit", JavaType::int()),
        )
        .add(
            ClassInfo::new("com.example.Special")
                .extends("com.example.Shop")
                .field("count", JavaType::long())
                .method("size", vec![], JavaType::int()),
        );
    class_path
}

// ============================================================================
// Typing and constant folding
// ============================================================================

#[test]
fn test_numeric_promotion() {
    assert_eq!(result_type("1 + 2"), JavaType::int());
    assert_eq!(result_type("1 + 2L"), JavaType::long());
    assert_eq!(result_type("1 / 2.0f"), JavaType::Primitive(PrimitiveKind::Float));
    assert_eq!(result_type("1 * 2.0"), JavaType::double());
    assert_eq!(result_type("'a' + 1"), JavaType::int());
    assert_eq!(result_type("(byte) 1 + (short) 2"), JavaType::int());
    assert_eq!(result_type("1L << 2"), JavaType::long());
    assert_eq!(result_type("1 << 2L"), JavaType::int());
    assert_eq!(result_type("true ^ false"), JavaType::boolean());
    assert_eq!(result_type("-'a'"), JavaType::int());
}

#[test]
fn test_arithmetic_values() {
    assert_eq!(eval("1 + 2 * 3"), Value::Int(7));
    assert_eq!(eval("7 / 2"), Value::Int(3));
    assert_eq!(eval("-7 % 3"), Value::Int(-1));
    assert_eq!(eval("1 / 2.0"), Value::Double(0.5));
    assert_eq!(eval("'a' + 1"), Value::Int(98));
    assert_eq!(eval("(byte) 200"), Value::Byte(-56));
    assert_eq!(eval("(char) 65"), Value::Char(65));
    assert_eq!(eval("-1 >>> 28"), Value::Int(15));
    assert_eq!(eval("Integer.MAX_VALUE + 1"), Value::Int(i32::MIN));
    assert_eq!(eval("-2147483648"), Value::Int(i32::MIN));
}

#[test]
fn test_conditional_types() {
    assert_eq!(result_type("true ? 1 : 2L"), JavaType::long());
    assert_eq!(result_type("true ? null : 1"), JavaType::class("java.lang.Integer"));
    assert_eq!(result_type("true ? \"a\" : null"), JavaType::string());
    assert_eq!(result_type("true ? 1 : \"a\""), JavaType::object());
    assert_eq!(result_type("false ? 'a' : 'b'"), JavaType::Primitive(PrimitiveKind::Char));
    assert_eq!(eval("false ? 1 : 2.5"), Value::Double(2.5));
}

#[test]
fn test_conditional_keeps_narrow_type_for_fitting_constant() {
    assert_eq!(result_type("true ? 'a' : 0"), JavaType::Primitive(PrimitiveKind::Char));
    assert_eq!(eval("true ? 'a' : 0"), Value::Char(97));
    assert_eq!(eval("false ? 'a' : 98"), Value::Char(98));
    assert_eq!(eval("byte b = 1; false ? b : 100"), Value::Byte(100));
    assert_eq!(eval("Character c = 'x'; true ? c : 0"), Value::Char(u16::from(b'x')));

    // Out of range or not a constant: binary numeric promotion applies.
    assert_eq!(result_type("true ? 'a' : -1"), JavaType::int());
    assert_eq!(eval("byte b = 1; true ? b : 200"), Value::Int(1));
    assert_eq!(result_type("int k = 0; true ? 'a' : k"), JavaType::int());
}

#[test]
fn test_constant_narrowing_in_declarations() {
    assert_eq!(eval("byte b = 10; b"), Value::Byte(10));
    assert_eq!(eval("char c = 'a' + 1; c"), Value::Char(98));
    assert_eq!(eval("short s = (short) 70000; s"), Value::Short(4464));
    assert!(matches!(
        build_error("byte b = 200;", &CompileContext::new()),
        BuildErrorKind::IncompatibleTypes(CastError::Incompatible { .. })
    ));
    assert!(matches!(
        build_error("int i = 1L;", &CompileContext::new()),
        BuildErrorKind::IncompatibleTypes(_)
    ));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval_text("\"a\" + 1 + 2"), "a12");
    assert_eq!(eval_text("1 + 2 + \"a\""), "3a");
    assert_eq!(eval_text("\"x\" + 'y' + true + null"), "xytruenull");
    assert_eq!(eval_text("String s = \"n=\"; s += 4; s"), "n=4");
}

#[test]
fn test_integer_literal_range() {
    assert_eq!(
        build_error("2147483648", &CompileContext::new()),
        BuildErrorKind::IntegerTooLarge("2147483648".to_string())
    );
    assert_eq!(eval("2147483648L"), Value::Long(2_147_483_648));
    assert_eq!(
        build_error("-(2147483648)", &CompileContext::new()),
        BuildErrorKind::IntegerTooLarge("2147483648".to_string())
    );
    assert_eq!(eval("- 2147483648"), Value::Int(i32::MIN));
}

// ============================================================================
// Assignment, compound assignment and increments
// ============================================================================

#[test]
fn test_compound_assignment_narrows_back() {
    assert_eq!(eval("byte b = 10; b += 300; b"), Value::Byte(54));
    assert_eq!(eval("int i = 10; i /= 2.5; i"), Value::Int(4));
    assert_eq!(eval("char c = 'a'; c++; c"), Value::Char(98));
    assert_eq!(eval("long l = 1; l <<= 40; l"), Value::Long(1 << 40));
}

#[test]
fn test_increments() {
    assert_eq!(eval("int i = 5; int j = i++ + ++i; j * 100 + i"), Value::Int(1207));
    assert_eq!(eval("int i = 5; i--"), Value::Int(5));
    assert_eq!(eval("int i = 5; --i"), Value::Int(4));
}

#[test]
fn test_compound_assignment_reads_target_through_slot() {
    let class_path = ClassPath::with_builtins();
    let built = build_ok("int[] a = {1}; a[0] += 2", &CompileContext::new(), &class_path);
    let NodeKind::Block { statements, .. } = &built.root.kind else {
        panic!("expected a block, got {:?}", built.root.kind);
    };
    let NodeKind::CompoundAssignment { target, operation } = &statements[1].kind else {
        panic!("expected a compound assignment, got {:?}", statements[1].kind);
    };
    assert!(matches!(target.kind, NodeKind::ArrayAccess { .. }));
    let mut slots = Vec::new();
    operation.walk(&mut |node| {
        if let NodeKind::Slot(n) = node.kind {
            slots.push(n);
        }
    });
    assert_eq!(slots, vec![0]);
}

#[test]
fn test_boxed_variables() {
    let mut vm = MockVm::new();
    let value = eval_in(&mut vm, "Integer x = 5; x++; x", &CompileContext::new()).unwrap();
    let object = value.as_object().expect("a boxed Integer");
    assert_eq!(object.runtime_type, "java.lang.Integer");
    assert_eq!(vm.field_value(object, "value"), Some(Value::Int(6)));

    assert_eq!(eval("Integer x = 5; x + 1"), Value::Int(6));
    assert_eq!(eval("Long l = 5L; long m = l * 2; m"), Value::Long(10));
}

#[test]
fn test_assignment_needs_a_variable() {
    assert_eq!(build_error("1 = 2", &CompileContext::new()), BuildErrorKind::NotAssignable);
    let context = CompileContext::new().label("last_result", JavaType::int());
    assert_eq!(build_error("last_result = 2", &context), BuildErrorKind::NotAssignable);
    assert_eq!(build_error("int[] a = {}; a.length = 2;", &CompileContext::new()), BuildErrorKind::NotAssignable);
}

// ============================================================================
// Comparisons
// ============================================================================

#[test]
fn test_equality_of_boxes_is_identity() {
    let class_path = ClassPath::with_builtins();
    let integer = JavaType::class("java.lang.Integer");
    let context = CompileContext::new()
        .local("a", integer.clone())
        .local("b", integer);

    let built = build_ok("a == b", &context, &class_path);
    assert!(matches!(
        built.root.kind,
        NodeKind::BinaryOp {
            operation: BinaryOperation::ReferenceEquality { negated: false },
            ..
        }
    ));

    let built = build_ok("a != 1", &context, &class_path);
    assert!(matches!(
        built.root.kind,
        NodeKind::BinaryOp {
            operation: BinaryOperation::Compare {
                kind: PrimitiveKind::Int,
                ..
            },
            ..
        }
    ));
}

#[test]
fn test_comparison_values() {
    assert_eq!(eval("1 < 2L"), Value::Boolean(true));
    assert_eq!(eval("'b' > 'a'"), Value::Boolean(true));
    assert_eq!(eval("1.0 == 1"), Value::Boolean(true));
    assert_eq!(eval("true != false"), Value::Boolean(true));
    assert_eq!(eval("null == null"), Value::Boolean(true));
    assert!(matches!(
        build_error("1 == true", &CompileContext::new()),
        BuildErrorKind::BadOperands { .. }
    ));
    assert!(matches!(
        build_error("\"a\" < \"b\"", &CompileContext::new()),
        BuildErrorKind::BadOperands { .. }
    ));
}

#[test]
fn test_operand_errors() {
    assert!(matches!(
        build_error("1 + true", &CompileContext::new()),
        BuildErrorKind::BadOperands { .. }
    ));
    assert!(matches!(
        build_error("1.5 & 2", &CompileContext::new()),
        BuildErrorKind::BadOperands { .. }
    ));
    assert!(matches!(
        build_error("!1", &CompileContext::new()),
        BuildErrorKind::BadOperand { .. }
    ));
    assert!(matches!(
        build_error("~1.5", &CompileContext::new()),
        BuildErrorKind::BadOperand { .. }
    ));
    assert!(matches!(
        build_error("if (1) {}", &CompileContext::new()),
        BuildErrorKind::UnexpectedType { .. }
    ));
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_frame_local_and_label() {
    let mut vm = MockVm::new();
    vm.set_local(THREAD, FRAME, "count", Value::Int(21));
    let context = CompileContext::new().local("count", JavaType::int());
    assert_eq!(eval_in(&mut vm, "count * 2", &context).unwrap(), Value::Int(42));

    let class_path = ClassPath::with_builtins();
    let context = CompileContext::new().label("obj_1", JavaType::string());
    let built = build_ok("obj_1", &context, &class_path);
    assert_eq!(built.root.kind, NodeKind::LabeledValue("obj_1".to_string()));
    assert_eq!(built.result_type, JavaType::string());
}

#[test]
fn test_fragment_variable_shadows_frame_local() {
    let class_path = ClassPath::with_builtins();
    let context = CompileContext::new().local("x", JavaType::int());
    let built = build_ok("String x = \"s\"; x", &context, &class_path);
    assert_eq!(built.result_type, JavaType::string());
    let NodeKind::Block { scope, statements, .. } = &built.root.kind else {
        panic!("expected a block");
    };
    assert_eq!(scope, &vec![("x".to_string(), Value::Null)]);
    assert_eq!(
        statements[1].kind,
        NodeKind::LocalVariableRef(LocalRef::Scoped("x".to_string()))
    );
}

#[test]
fn test_uncertain_local_falls_back_to_field() {
    let class_path = shop_class_path();
    let context = CompileContext::in_class("com.example.Shop")
        .with_local(LocalVariable::new("count", JavaType::int()).uncertain());
    let built = build_ok("count", &context, &class_path);
    let NodeKind::Fallback { name, field } = &built.root.kind else {
        panic!("expected a fallback, got {:?}", built.root.kind);
    };
    assert_eq!(name, "count");
    let field = field.as_ref().expect("a field to fall back on");
    assert!(matches!(
        &field.kind,
        NodeKind::FieldRef { field, .. } if field.name == "count"
    ));
}

#[test]
fn test_field_through_this() {
    let class_path = shop_class_path();
    let context = CompileContext::in_class("com.example.Shop");
    let built = build_ok("count + 1", &context, &class_path);
    assert_eq!(built.result_type, JavaType::int());

    let built = build_ok("TOTAL", &context, &class_path);
    assert!(matches!(
        built.root.kind,
        NodeKind::FieldRef {
            target: FieldTarget::Static,
            ..
        }
    ));

    let mut vm = MockVm::with_class_path(shop_class_path());
    let shop = vm.new_object("com.example.Shop");
    vm.set_field_value(&shop, "count", Value::Int(3));
    vm.set_this(THREAD, FRAME, shop);
    assert_eq!(eval_in(&mut vm, "this.count * count", &context).unwrap(), Value::Int(9));
}

#[test]
fn test_outer_field_from_inner_class() {
    let class_path = shop_class_path();
    let context = CompileContext::in_class("com.example.Shop$Cart");
    let built = build_ok("count + items", &context, &class_path);
    let NodeKind::BinaryOp { left, .. } = &built.root.kind else {
        panic!("expected a binary operation");
    };
    let NodeKind::FieldRef {
        target: FieldTarget::Instance(this),
        ..
    } = &left.kind
    else {
        panic!("expected an instance field, got {:?}", left.kind);
    };
    assert_eq!(
        this.kind,
        NodeKind::ThisRef {
            hops: vec![FieldInfo::outer_this("com.example.Shop$Cart", "com.example.Shop")]
        }
    );

    let built = build_ok("Shop.this.name", &context, &class_path);
    assert_eq!(built.result_type, JavaType::string());
}

#[test]
fn test_captured_local() {
    let class_path = shop_class_path();
    let context = CompileContext::in_class("com.example.Shop$1").with_local(
        LocalVariable::new("limit", JavaType::int()).declared_in("com.example.Shop"),
    );
    let built = build_ok("limit", &context, &class_path);
    assert!(matches!(
        &built.root.kind,
        NodeKind::FieldRef { field, .. } if field.name == "val$limit"
    ));

    let context = CompileContext::in_class("com.example.Shop$1").with_local(
        LocalVariable::new("other", JavaType::int()).declared_in("com.example.Shop"),
    );
    assert_eq!(
        build_source("other", &context, &class_path).unwrap_err().kind,
        BuildErrorKind::UnreachableLocal("other".to_string())
    );
}

#[test]
fn test_static_context() {
    let class_path = shop_class_path();
    let context = CompileContext::in_static_method("com.example.Shop");
    let kind = |source| build_source(source, &context, &class_path).unwrap_err().kind;
    assert_eq!(kind("this"), BuildErrorKind::NoThis);
    assert_eq!(kind("count"), BuildErrorKind::NotStatic("count".to_string()));
    assert_eq!(kind("size()"), BuildErrorKind::NotStatic("size".to_string()));
    assert!(build_source("TOTAL + create().count", &context, &class_path).is_ok());
}

#[test]
fn test_unresolved_names() {
    assert_eq!(
        build_error("nope + 1", &CompileContext::new()),
        BuildErrorKind::UnresolvedName("nope".to_string())
    );
    assert_eq!(
        build_error("(Nope) null", &CompileContext::new()),
        BuildErrorKind::UnknownType("Nope".to_string())
    );
    assert!(matches!(
        build_error("\"a\".nope", &CompileContext::new()),
        BuildErrorKind::UnknownField { .. }
    ));
    assert!(matches!(
        build_error("\"a\".nope()", &CompileContext::new()),
        BuildErrorKind::UnknownMethod { .. }
    ));
}

// ============================================================================
// Calls and instantiation
// ============================================================================

#[test]
fn test_overloads() {
    assert_eq!(eval("Math.max(1, 2L)"), Value::Long(2));
    assert_eq!(eval("Math.max(3, 2)"), Value::Int(3));
    assert_eq!(eval("java.lang.Math.abs(-2.5)"), Value::Double(2.5));
    assert_eq!(eval("Math.abs((byte) -4)"), Value::Int(4));
    assert!(matches!(
        build_error("Math.max(\"a\", 1)", &CompileContext::new()),
        BuildErrorKind::NoApplicableMethod { .. }
    ));
}

fn count_nodes(root: &EvaluatorNode, mut matches: impl FnMut(&NodeKind) -> bool) -> usize {
    let mut count = 0;
    root.walk(&mut |node| {
        if matches(&node.kind) {
            count += 1;
        }
    });
    count
}

fn is_primitive_cast(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::TypeCast { target: CastTarget::Primitive(_), .. })
}

fn is_checked_cast(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::TypeCast { target: CastTarget::Reference(_), .. })
}

fn is_boxing(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Boxing { .. })
}

#[test]
fn test_widening_wraps_only_the_narrower_operand() {
    let class_path = ClassPath::with_builtins();
    let built = build_ok("1 + 2L", &CompileContext::new(), &class_path);
    assert_eq!(count_nodes(&built.root, is_primitive_cast), 1);
    let NodeKind::BinaryOp { left, right, .. } = &built.root.kind else {
        panic!("expected a binary operation, got {:?}", built.root.kind);
    };
    let NodeKind::TypeCast { operand, target } = &left.kind else {
        panic!("expected the left operand widened, got {:?}", left.kind);
    };
    assert_eq!(target, &CastTarget::Primitive(PrimitiveKind::Long));
    assert!(matches!(operand.kind, NodeKind::Literal(_)));
    assert!(matches!(right.kind, NodeKind::Literal(_)));
}

#[test]
fn test_assignment_conversions_add_one_node() {
    let class_path = ClassPath::with_builtins();
    let context = CompileContext::new().local("n", JavaType::int());

    let built = build_ok("long l = n;", &context, &class_path);
    assert_eq!(count_nodes(&built.root, is_primitive_cast), 1);
    assert_eq!(count_nodes(&built.root, is_boxing), 0);

    let built = build_ok("Integer i = 5;", &context, &class_path);
    assert_eq!(count_nodes(&built.root, is_boxing), 1);
    assert_eq!(count_nodes(&built.root, is_primitive_cast), 0);
}

#[test]
fn test_reference_cast_is_checked_only_when_narrowing() {
    let class_path = ClassPath::with_builtins();
    let context = CompileContext::new()
        .local("s", JavaType::string())
        .local("o", JavaType::object());

    let built = build_ok("(Object) s", &context, &class_path);
    assert_eq!(count_nodes(&built.root, is_checked_cast), 0);

    let built = build_ok("(String) o", &context, &class_path);
    assert_eq!(count_nodes(&built.root, is_checked_cast), 1);
}

#[test]
fn test_varargs_are_packed() {
    let class_path = ClassPath::with_builtins();
    let built = build_ok("String.format(\"%d-%s\", 1, \"x\")", &CompileContext::new(), &class_path);
    let NodeKind::MethodCall { receiver, args, .. } = &built.root.kind else {
        panic!("expected a call");
    };
    assert!(matches!(receiver, Receiver::Static));
    assert_eq!(args.len(), 2);
    let NodeKind::ArrayInitializer { element, elements } = &args[1].kind else {
        panic!("expected a packed varargs array, got {:?}", args[1].kind);
    };
    assert_eq!(element, &JavaType::object());
    assert!(matches!(elements[0].kind, NodeKind::Boxing { kind: PrimitiveKind::Int, .. }));

    assert_eq!(eval_text("String.format(\"%d-%s\", 1, \"x\")"), "1-x");
}

#[test]
fn test_instance_calls() {
    assert_eq!(eval("\"hello\".length()"), Value::Int(5));
    assert_eq!(eval("\"hello\".charAt(1)"), Value::Char(u16::from(b'e')));
    assert_eq!(eval_text("new StringBuilder(\"a\").append(\"b\").toString()"), "ab");
}

#[test]
fn test_super_call_is_nonvirtual() {
    let class_path = shop_class_path();
    let context = CompileContext::in_class("com.example.Special");
    let built = build_ok("super.size()", &context, &class_path);
    let NodeKind::MethodCall {
        receiver,
        method,
        nonvirtual,
        ..
    } = &built.root.kind
    else {
        panic!("expected a call");
    };
    assert!(*nonvirtual);
    assert_eq!(method.declaring_class, "com.example.Shop");
    assert!(matches!(receiver, Receiver::Instance(this) if matches!(this.kind, NodeKind::SuperRef { .. })));

    let built = build_ok("super.count", &context, &class_path);
    assert_eq!(built.result_type, JavaType::int());
    let built = build_ok("count", &context, &class_path);
    assert_eq!(built.result_type, JavaType::long());
}

#[test]
fn test_inner_class_instantiation_takes_this() {
    let class_path = shop_class_path();
    let context = CompileContext::in_class("com.example.Shop");
    let built = build_ok("new Cart()", &context, &class_path);
    let NodeKind::NewInstance { outer, .. } = &built.root.kind else {
        panic!("expected an instantiation");
    };
    assert!(matches!(
        outer.as_deref().map(|node| &node.kind),
        Some(NodeKind::ThisRef { .. })
    ));

    let context = CompileContext::in_static_method("com.example.Shop");
    assert!(build_source("new Cart()", &context, &class_path).is_err());
    assert!(build_source("create().new Cart()", &context, &class_path).is_ok());
}

#[test]
fn test_instantiation_errors() {
    assert_eq!(
        build_error("new Object() { }", &CompileContext::new()),
        BuildErrorKind::Unsupported("anonymous class")
    );
    assert!(matches!(
        build_error("new java.util.List()", &CompileContext::new()),
        BuildErrorKind::NotInstantiable(_)
    ));
    assert_eq!(
        build_error("new int[2][3]", &CompileContext::new()),
        BuildErrorKind::Unsupported("multi-dimensional array creation")
    );
}

#[test]
fn test_arrays() {
    assert_eq!(eval("new int[3].length"), Value::Int(3));
    assert_eq!(eval("int[] a = {1, 2, 3}; a[1] + a.length"), Value::Int(5));
    assert_eq!(eval("long[] a = new long[] {1, 'a'}; a[1]"), Value::Long(97));
    assert_eq!(eval("int[][] m = {{1, 2}, {3}}; m[1][0]"), Value::Int(3));
    assert!(matches!(
        build_error("int[] a = {1}; a[1L]", &CompileContext::new()),
        BuildErrorKind::BadOperand { .. }
    ));
}

#[test]
fn test_casts_and_instanceof() {
    assert_eq!(eval("Object o = \"s\"; o instanceof String"), Value::Boolean(true));
    assert_eq!(eval("Object o = \"s\"; ((String) o).length()"), Value::Int(1));
    assert_eq!(eval("(int) 3.9"), Value::Int(3));
    assert_eq!(result_type("(Integer) 4"), JavaType::class("java.lang.Integer"));
    assert!(matches!(
        build_error("(boolean) 1", &CompileContext::new()),
        BuildErrorKind::IncompatibleTypes(_)
    ));
    assert!(matches!(
        build_error("\"s\" instanceof Integer", &CompileContext::new()),
        BuildErrorKind::IncompatibleTypes(_)
    ));
    assert_eq!(
        build_error("Object o = null; o instanceof String s", &CompileContext::new()),
        BuildErrorKind::Unsupported("pattern binding in `instanceof`")
    );
}

#[test]
fn test_class_literal() {
    assert_eq!(result_type("String.class"), JavaType::class("java.lang.Class"));
    assert_eq!(result_type("int.class"), JavaType::class("java.lang.Class"));
}

#[test]
fn test_unsupported_expressions() {
    assert_eq!(
        build_error("Object r = () -> {};", &CompileContext::new()),
        BuildErrorKind::Unsupported("lambda expression")
    );
    assert_eq!(
        build_error("Object f = String::valueOf;", &CompileContext::new()),
        BuildErrorKind::Unsupported("method reference")
    );
}

// ============================================================================
// Statements
// ============================================================================

#[test]
fn test_loops() {
    assert_eq!(
        eval("int s = 0; for (int i = 0; i < 5; i++) { s += i; } s"),
        Value::Int(10)
    );
    assert_eq!(eval("int n = 0; while (n < 7) n += 3; n"), Value::Int(9));
    assert_eq!(eval("int n = 10; do { n++; } while (n < 5); n"), Value::Int(11));
    assert_eq!(
        eval("int[] a = {1, 2, 3}; int s = 0; for (int v : a) s += v; s"),
        Value::Int(6)
    );
    assert_eq!(
        eval("long s = 0; for (var v : new int[] {4, 5}) { s += v; } s"),
        Value::Long(9)
    );
}

#[test]
fn test_labeled_jumps() {
    crate::test_utils::init_test_logging();
    let source = "int n = 0;
        outer: for (int i = 0; i < 3; i++) {
            for (int j = 0; j < 3; j++) {
                if (j == 1) continue outer;
                if (i == 2) break outer;
                n++;
            }
        }
        n";
    assert_eq!(eval(source), Value::Int(2));

    assert_eq!(eval("int n = 1; block: { if (n > 0) break block; n = 5; } n"), Value::Int(1));
}

#[test]
fn test_jump_errors() {
    let context = CompileContext::new();
    assert_eq!(build_error("break;", &context), BuildErrorKind::JumpOutsideLoop("break"));
    assert_eq!(
        build_error("while (true) { continue nowhere; }", &context),
        BuildErrorKind::UndefinedLabel("nowhere".to_string())
    );
    assert_eq!(
        build_error("b: { while (true) { continue b; } }", &context),
        BuildErrorKind::NotALoopLabel("b".to_string())
    );
    assert_eq!(
        build_error("a: while (true) { a: while (true) { } }", &context),
        BuildErrorKind::DuplicateLabel("a".to_string())
    );
}

#[test]
fn test_declarations() {
    let context = CompileContext::new();
    assert_eq!(
        build_error("int a = 1; int a = 2;", &context),
        BuildErrorKind::DuplicateVariable("a".to_string())
    );
    assert_eq!(
        build_error("int a = 1; { int a = 2; }", &context),
        BuildErrorKind::DuplicateVariable("a".to_string())
    );
    assert_eq!(eval("{ int a = 1; } { int a = 2; } 3"), Value::Int(3));
    assert_eq!(build_error("var v = null;", &context), BuildErrorKind::CannotInfer("v".to_string()));
    assert_eq!(build_error("var v;", &context), BuildErrorKind::CannotInfer("v".to_string()));
    assert_eq!(result_type("var v = 1L; v"), JavaType::long());
    assert_eq!(eval("int a, b = 2; a = b * 2; a + b"), Value::Int(6));
}

#[test]
fn test_try_catch_finally() {
    let source = "String s = \"ab\"; int r = 0;
        try { s.charAt(5); r = 100; }
        catch (IllegalStateException | IndexOutOfBoundsException e) { r += 1; }
        finally { r += 10; }
        r";
    assert_eq!(eval(source), Value::Int(11));

    assert!(matches!(
        build_error("try { } catch (String e) { }", &CompileContext::new()),
        BuildErrorKind::UnexpectedType { .. }
    ));
    assert!(matches!(
        build_error("throw 1;", &CompileContext::new()),
        BuildErrorKind::UnexpectedType { .. }
    ));
}

#[test]
fn test_multi_catch_variable_is_throwable() {
    let class_path = ClassPath::with_builtins();
    let built = build_ok(
        "try { } catch (IllegalStateException | IndexOutOfBoundsException e) { e.getMessage(); }",
        &CompileContext::new(),
        &class_path,
    );
    assert!(!built.is_expression);
    assert_eq!(built.result_type, JavaType::Void);
}

#[test]
fn test_unsupported_statements() {
    let context = CompileContext::new();
    assert_eq!(
        build_error("switch (1) { default: }", &context),
        BuildErrorKind::Unsupported("switch statement")
    );
    assert_eq!(
        build_error("synchronized (this) { }", &CompileContext::in_class("java.lang.Object")),
        BuildErrorKind::Unsupported("synchronized statement")
    );
}

#[test]
fn test_expression_fragments_keep_their_root() {
    let class_path = ClassPath::with_builtins();
    let context = CompileContext::new().local("x", JavaType::int());
    let built = build_ok("x", &context, &class_path);
    assert!(built.is_expression);
    assert_eq!(
        built.root.kind,
        NodeKind::LocalVariableRef(LocalRef::Frame("x".to_string()))
    );

    let built = build_ok("x;", &context, &class_path);
    assert!(!built.is_expression);
}
