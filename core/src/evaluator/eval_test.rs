use pretty_assertions::assert_eq;

use super::*;
use crate::parser::{BinaryOp, ComparisonOp, IncrementOp, Span};
use crate::remote::{MockVm, VmError};
use crate::types::{FieldInfo, JavaType, MethodInfo, PrimitiveKind};
use crate::values::Value;

const THREAD: u64 = 1;
const FRAME: u64 = 1;

fn node(kind: NodeKind) -> EvaluatorNode {
    EvaluatorNode::new(kind, Span(0..0))
}

fn boxed(kind: NodeKind) -> Box<EvaluatorNode> {
    Box::new(node(kind))
}

fn lit(value: impl Into<Value>) -> EvaluatorNode {
    node(NodeKind::Literal(Constant::Value(value.into())))
}

fn scoped(name: &str) -> EvaluatorNode {
    node(NodeKind::LocalVariableRef(LocalRef::Scoped(name.to_string())))
}

fn frame_local(name: &str) -> EvaluatorNode {
    node(NodeKind::LocalVariableRef(LocalRef::Frame(name.to_string())))
}

fn assign(target: EvaluatorNode, value: EvaluatorNode) -> EvaluatorNode {
    node(NodeKind::Assignment {
        target: Box::new(target),
        value: Box::new(value),
    })
}

fn int_op(op: BinaryOp, left: EvaluatorNode, right: EvaluatorNode) -> EvaluatorNode {
    node(NodeKind::BinaryOp {
        operation: BinaryOperation::Arithmetic {
            op,
            kind: PrimitiveKind::Int,
        },
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// `target += amount` on an int.
fn add_assign(target: EvaluatorNode, amount: i32) -> EvaluatorNode {
    node(NodeKind::CompoundAssignment {
        target: Box::new(target),
        operation: Box::new(int_op(BinaryOp::Add, node(NodeKind::Slot(0)), lit(amount))),
    })
}

fn block(scope: &[(&str, Value)], statements: Vec<EvaluatorNode>) -> EvaluatorNode {
    node(NodeKind::Block {
        label: None,
        scope: scope
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect(),
        statements,
    })
}

fn while_true(label: Option<&str>, body: EvaluatorNode) -> EvaluatorNode {
    node(NodeKind::While {
        label: label.map(str::to_string),
        cond: Box::new(lit(true)),
        body: Box::new(body),
    })
}

fn jump(jump: Jump, label: Option<&str>) -> EvaluatorNode {
    node(NodeKind::BreakContinue {
        jump,
        label: label.map(str::to_string),
    })
}

fn run_with(
    vm: &mut MockVm,
    options: &EvaluatorOptions,
    root: &EvaluatorNode,
) -> Result<Outcome, Interrupt> {
    let frame = FrameContext::new(THREAD, FRAME);
    run(vm, &frame, options, root, None)
}

fn eval_value(vm: &mut MockVm, root: &EvaluatorNode) -> Value {
    match run_with(vm, &EvaluatorOptions::default(), root) {
        Ok(outcome) => outcome.value,
        Err(interrupt) => panic!("evaluation failed: {interrupt:?}"),
    }
}

fn runtime_error(result: Result<Outcome, Interrupt>) -> ExecutionErrorKind {
    match result {
        Err(Interrupt::Error(error)) => error.kind,
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

#[test]
fn test_arithmetic_tree() {
    let mut vm = MockVm::new();
    let root = int_op(BinaryOp::Add, lit(1), lit(2));
    assert_eq!(eval_value(&mut vm, &root), Value::Int(3));
}

#[test]
fn test_block_value_is_last_statement() {
    let mut vm = MockVm::new();
    let root = block(
        &[("x", Value::Int(0))],
        vec![assign(scoped("x"), lit(4)), add_assign(scoped("x"), 3), scoped("x")],
    );
    assert_eq!(eval_value(&mut vm, &root), Value::Int(7));
}

#[test]
fn test_labeled_break_leaves_only_the_labeled_loop() {
    let mut vm = MockVm::new();
    // int count = 0;
    // outer: while (true) { while (true) { count += 1; break outer; } count = 100; }
    // count
    let inner = while_true(
        None,
        block(&[], vec![add_assign(scoped("count"), 1), jump(Jump::Break, Some("outer"))]),
    );
    let outer = while_true(
        Some("outer"),
        block(&[], vec![inner, assign(scoped("count"), lit(100))]),
    );
    let root = block(&[("count", Value::Int(0))], vec![outer, scoped("count")]);
    assert_eq!(eval_value(&mut vm, &root), Value::Int(1));
}

#[test]
fn test_unlabeled_break_leaves_the_innermost_loop() {
    let mut vm = MockVm::new();
    // int i = 0; while (i < 3) { i += 1; while (true) { break; } } i
    let outer = node(NodeKind::While {
        label: None,
        cond: boxed(NodeKind::BinaryOp {
            operation: BinaryOperation::Compare {
                op: ComparisonOp::Lt,
                kind: PrimitiveKind::Int,
            },
            left: Box::new(scoped("i")),
            right: Box::new(lit(3)),
        }),
        body: Box::new(block(
            &[],
            vec![add_assign(scoped("i"), 1), while_true(None, jump(Jump::Break, None))],
        )),
    });
    let root = block(&[("i", Value::Int(0))], vec![outer, scoped("i")]);
    assert_eq!(eval_value(&mut vm, &root), Value::Int(3));
}

#[test]
fn test_labeled_continue_skips_rest_of_outer_body() {
    let mut vm = MockVm::new();
    // int n = 0, hits = 0;
    // outer: while (n < 3) { n += 1; while (true) { continue outer; } hits += 1; }
    // hits
    let outer = node(NodeKind::While {
        label: Some("outer".to_string()),
        cond: boxed(NodeKind::BinaryOp {
            operation: BinaryOperation::Compare {
                op: ComparisonOp::Lt,
                kind: PrimitiveKind::Int,
            },
            left: Box::new(scoped("n")),
            right: Box::new(lit(3)),
        }),
        body: Box::new(block(
            &[],
            vec![
                add_assign(scoped("n"), 1),
                while_true(None, jump(Jump::Continue, Some("outer"))),
                add_assign(scoped("hits"), 1),
            ],
        )),
    });
    let root = block(
        &[("n", Value::Int(0)), ("hits", Value::Int(0))],
        vec![outer, scoped("hits")],
    );
    assert_eq!(eval_value(&mut vm, &root), Value::Int(0));
}

fn try_node(catch_type: &str, variable: &str) -> EvaluatorNode {
    // try { throw exc; } catch (<catch_type> e) { caught += 1; } finally { finals += 1; }
    node(NodeKind::Try {
        body: Box::new(block(&[], vec![node(NodeKind::Throw(Box::new(frame_local("exc"))))])),
        catches: vec![CatchNode {
            types: vec![JavaType::class(catch_type)],
            variable: variable.to_string(),
            body: block(&[], vec![add_assign(frame_local("caught"), 1)]),
        }],
        finally: Some(Box::new(block(&[], vec![add_assign(frame_local("finals"), 1)]))),
    })
}

fn exception_frame(vm: &mut MockVm, class: &str) {
    let exception = vm.new_throwable(class, Some("boom"));
    vm.set_local(THREAD, FRAME, "exc", Value::Object(exception));
    vm.set_local(THREAD, FRAME, "caught", Value::Int(0));
    vm.set_local(THREAD, FRAME, "finals", Value::Int(0));
}

#[test]
fn test_finally_runs_once_when_exception_is_caught() {
    let mut vm = MockVm::new();
    exception_frame(&mut vm, "java.lang.IllegalStateException");
    let root = try_node("java.lang.RuntimeException", "e");
    run_with(&mut vm, &EvaluatorOptions::default(), &root).unwrap();
    assert_eq!(vm.local(THREAD, FRAME, "caught"), Some(&Value::Int(1)));
    assert_eq!(vm.local(THREAD, FRAME, "finals"), Some(&Value::Int(1)));
}

#[test]
fn test_finally_runs_once_before_uncaught_exception_propagates() {
    let mut vm = MockVm::new();
    exception_frame(&mut vm, "java.lang.IllegalStateException");
    let root = try_node("java.lang.ArithmeticException", "e");
    let result = run_with(&mut vm, &EvaluatorOptions::default(), &root);
    let Err(Interrupt::Thrown { exception, .. }) = result else {
        panic!("expected the exception to propagate, got {result:?}");
    };
    assert_eq!(exception.runtime_type, "java.lang.IllegalStateException");
    assert_eq!(vm.local(THREAD, FRAME, "caught"), Some(&Value::Int(0)));
    assert_eq!(vm.local(THREAD, FRAME, "finals"), Some(&Value::Int(1)));
}

#[test]
fn test_finally_runs_once_on_normal_completion() {
    let mut vm = MockVm::new();
    vm.set_local(THREAD, FRAME, "finals", Value::Int(0));
    let root = node(NodeKind::Try {
        body: Box::new(lit(5)),
        catches: vec![],
        finally: Some(Box::new(add_assign(frame_local("finals"), 1))),
    });
    assert_eq!(eval_value(&mut vm, &root), Value::Int(5));
    assert_eq!(vm.local(THREAD, FRAME, "finals"), Some(&Value::Int(1)));
}

#[test]
fn test_catch_binds_the_exception() {
    let mut vm = MockVm::new();
    exception_frame(&mut vm, "java.lang.IllegalStateException");
    let root = node(NodeKind::Try {
        body: Box::new(node(NodeKind::Throw(Box::new(frame_local("exc"))))),
        catches: vec![CatchNode {
            types: vec![
                JavaType::class("java.lang.ArithmeticException"),
                JavaType::class("java.lang.IllegalStateException"),
            ],
            variable: "e".to_string(),
            body: scoped("e"),
        }],
        finally: None,
    });
    let value = eval_value(&mut vm, &root);
    assert_eq!(value, vm.local(THREAD, FRAME, "exc").cloned().unwrap());
}

#[test]
fn test_top_level_return_yields_value() {
    let mut vm = MockVm::new();
    let root = block(
        &[],
        vec![node(NodeKind::Return(Some(Box::new(lit(42))))), lit(0)],
    );
    assert_eq!(eval_value(&mut vm, &root), Value::Int(42));
}

#[test]
fn test_stray_break_is_an_error() {
    let mut vm = MockVm::new();
    let root = block(&[], vec![jump(Jump::Break, Some("nowhere"))]);
    let kind = runtime_error(run_with(&mut vm, &EvaluatorOptions::default(), &root));
    assert_eq!(
        kind,
        ExecutionErrorKind::Runtime(RuntimeError::StrayJump("break nowhere".to_string()))
    );
}

#[test]
fn test_stack_overflow() {
    let mut vm = MockVm::new();
    let mut root = lit(1);
    for _ in 0..10 {
        root = int_op(BinaryOp::Add, root, lit(1));
    }
    let options = EvaluatorOptions {
        max_depth: 5,
        ..EvaluatorOptions::default()
    };
    let kind = runtime_error(run_with(&mut vm, &options, &root));
    assert!(matches!(
        kind,
        ExecutionErrorKind::ResourceExceeded(ResourceExceededError::StackOverflow {
            max_depth: 5,
            ..
        })
    ));
}

#[test]
fn test_iteration_limit() {
    let mut vm = MockVm::new();
    let root = while_true(None, block(&[], vec![]));
    let options = EvaluatorOptions {
        max_iterations: Some(10),
        ..EvaluatorOptions::default()
    };
    let kind = runtime_error(run_with(&mut vm, &options, &root));
    assert_eq!(
        kind,
        ExecutionErrorKind::ResourceExceeded(ResourceExceededError::IterationLimit {
            max_iterations: 10
        })
    );
}

#[test]
fn test_division_by_zero_is_a_runtime_error() {
    let mut vm = MockVm::new();
    let root = int_op(BinaryOp::Div, lit(1), lit(0));
    let kind = runtime_error(run_with(&mut vm, &EvaluatorOptions::default(), &root));
    assert_eq!(kind, ExecutionErrorKind::Runtime(RuntimeError::DivisionByZero));
}

#[test]
fn test_boxing_round_trips_every_kind() {
    let samples = [
        Value::Boolean(true),
        Value::Byte(-7),
        Value::Short(300),
        Value::Char(0x263A),
        Value::Int(-123_456),
        Value::Long(1 << 40),
        Value::Float(1.5),
        Value::Double(-2.25),
    ];
    let mut vm = MockVm::new();
    for value in samples {
        let Some(kind) = value.primitive_kind() else {
            unreachable!()
        };
        let root = node(NodeKind::Unboxing {
            operand: boxed(NodeKind::Boxing {
                operand: Box::new(lit(value.clone())),
                kind,
            }),
            kind,
        });
        assert_eq!(eval_value(&mut vm, &root), value, "round trip of {kind}");
    }
}

#[test]
fn test_boxing_falls_back_to_constructor() {
    let mut class_path = crate::types::ClassPath::with_builtins();
    // An old runtime: Integer without valueOf(int).
    class_path.add(
        crate::types::ClassInfo::new("java.lang.Integer")
            .extends("java.lang.Number")
            .constructor(vec![JavaType::int()])
            .method("intValue", vec![], JavaType::int()),
    );
    let mut vm = MockVm::with_class_path(class_path);

    let root = node(NodeKind::Boxing {
        operand: Box::new(lit(9)),
        kind: PrimitiveKind::Int,
    });
    let value = eval_value(&mut vm, &root);
    let Value::Object(object) = value else {
        panic!("expected a boxed integer");
    };
    assert_eq!(object.runtime_type, "java.lang.Integer");
    assert_eq!(vm.field_value(&object, "value"), Some(Value::Int(9)));
    assert!(vm.invocations.iter().any(|call| call.contains("<init>(int)")));
}

#[test]
fn test_unboxing_null_is_a_null_pointer() {
    let mut vm = MockVm::new();
    let root = node(NodeKind::Unboxing {
        operand: Box::new(lit(Value::Null)),
        kind: PrimitiveKind::Int,
    });
    let kind = runtime_error(run_with(&mut vm, &EvaluatorOptions::default(), &root));
    assert!(matches!(
        kind,
        ExecutionErrorKind::Runtime(RuntimeError::NullPointer(_))
    ));
}

#[test]
fn test_string_concat_calls_to_string() {
    let mut vm = MockVm::new();
    let boxed_int = vm.new_boxed(Value::Int(5)).unwrap();
    vm.set_local(THREAD, FRAME, "n", Value::Object(boxed_int));
    let root = node(NodeKind::BinaryOp {
        operation: BinaryOperation::Concat,
        left: boxed(NodeKind::Literal(Constant::Str("n=".to_string()))),
        right: Box::new(frame_local("n")),
    });
    let Value::Object(string) = eval_value(&mut vm, &root) else {
        panic!("expected a string");
    };
    assert_eq!(vm.text(&string), Some("n=5"));
}

#[test]
fn test_pinned_references_released_after_run() {
    let mut vm = MockVm::new();
    let root = node(NodeKind::Literal(Constant::Str("kept".to_string())));
    let Value::Object(string) = eval_value(&mut vm, &root) else {
        panic!("expected a string");
    };
    assert_eq!(vm.disable_collection_calls, vec![string.id]);
    assert_eq!(vm.enable_collection_calls, vec![string.id]);
    assert!(!vm.is_collection_disabled(string.id));
}

#[test]
fn test_method_invocation_can_be_disabled() {
    let mut vm = MockVm::new();
    let root = node(NodeKind::MethodCall {
        receiver: Receiver::Static,
        method: MethodInfo::new_static(
            "java.lang.Math",
            "abs",
            vec![JavaType::int()],
            JavaType::int(),
        ),
        args: vec![lit(-3)],
        nonvirtual: false,
    });
    assert_eq!(eval_value(&mut vm, &root), Value::Int(3));

    let options = EvaluatorOptions {
        allow_method_invocation: false,
        ..EvaluatorOptions::default()
    };
    let kind = runtime_error(run_with(&mut vm, &options, &root));
    assert_eq!(kind, ExecutionErrorKind::Runtime(RuntimeError::InvocationDisabled));
}

#[test]
fn test_debuggee_exception_from_call_is_thrown() {
    let mut vm = MockVm::new();
    let string = vm.new_string("abc");
    vm.set_local(THREAD, FRAME, "s", Value::Object(string));
    let root = node(NodeKind::MethodCall {
        receiver: Receiver::Instance(Box::new(frame_local("s"))),
        method: MethodInfo::new(
            "java.lang.String",
            "charAt",
            vec![JavaType::int()],
            JavaType::Primitive(PrimitiveKind::Char),
        ),
        args: vec![lit(10)],
        nonvirtual: false,
    });
    let result = run_with(&mut vm, &EvaluatorOptions::default(), &root);
    let Err(Interrupt::Thrown { exception, .. }) = result else {
        panic!("expected a thrown exception, got {result:?}");
    };
    assert_eq!(exception.runtime_type, "java.lang.IndexOutOfBoundsException");
}

#[test]
fn test_array_index_is_evaluated_once_in_compound_assignment() {
    let mut vm = MockVm::new();
    let array = vm.new_array_of(&JavaType::int(), vec![Value::Int(1), Value::Int(2)]);
    vm.set_local(THREAD, FRAME, "a", Value::Object(array.clone()));
    // int i = 0; a[i++] += 5; i
    let index = node(NodeKind::PostfixOp {
        op: IncrementOp::Increment,
        target: Box::new(scoped("i")),
        operation: Box::new(int_op(BinaryOp::Add, node(NodeKind::Slot(0)), lit(1))),
    });
    let element = node(NodeKind::ArrayAccess {
        array: Box::new(frame_local("a")),
        index: Box::new(index),
    });
    let root = block(
        &[("i", Value::Int(0))],
        vec![add_assign(element, 5), scoped("i")],
    );
    assert_eq!(eval_value(&mut vm, &root), Value::Int(1));
    assert_eq!(vm.array_values(&array), Some(&[Value::Int(6), Value::Int(2)][..]));
}

#[test]
fn test_array_index_out_of_bounds() {
    let mut vm = MockVm::new();
    let array = vm.new_array_of(&JavaType::int(), vec![Value::Int(1)]);
    vm.set_local(THREAD, FRAME, "a", Value::Object(array));
    let root = node(NodeKind::ArrayAccess {
        array: Box::new(frame_local("a")),
        index: Box::new(lit(3)),
    });
    let kind = runtime_error(run_with(&mut vm, &EvaluatorOptions::default(), &root));
    assert_eq!(
        kind,
        ExecutionErrorKind::Runtime(RuntimeError::IndexOutOfBounds {
            index: 3,
            length: 1
        })
    );
}

#[test]
fn test_for_each_over_list_unboxes_elements() {
    let mut vm = MockVm::new();
    let items: Vec<Value> = [1, 2, 3]
        .into_iter()
        .map(|n| Value::Object(vm.new_boxed(Value::Int(n)).unwrap()))
        .collect();
    let list = vm.new_list(items);
    vm.set_local(THREAD, FRAME, "list", Value::Object(list));
    // int sum = 0; for (int n : list) sum += n; sum
    let for_each = node(NodeKind::ForEach {
        label: None,
        variable: "n".to_string(),
        iterable: Box::new(frame_local("list")),
        element: boxed(NodeKind::Unboxing {
            operand: boxed(NodeKind::TypeCast {
                operand: boxed(NodeKind::Slot(0)),
                target: CastTarget::Reference(JavaType::class("java.lang.Integer")),
            }),
            kind: PrimitiveKind::Int,
        }),
        body: Box::new(node(NodeKind::CompoundAssignment {
            target: Box::new(scoped("sum")),
            operation: Box::new(int_op(BinaryOp::Add, node(NodeKind::Slot(0)), scoped("n"))),
        })),
    });
    let root = block(&[("sum", Value::Int(0))], vec![for_each, scoped("sum")]);
    assert_eq!(eval_value(&mut vm, &root), Value::Int(6));
}

#[test]
fn test_for_each_over_array_with_labeled_break() {
    let mut vm = MockVm::new();
    let array = vm.new_array_of(
        &JavaType::int(),
        vec![Value::Int(4), Value::Int(5), Value::Int(6)],
    );
    vm.set_local(THREAD, FRAME, "a", Value::Object(array));
    // int last = 0; loop: for (int x : a) { last = x; if (x == 5) break loop; } last
    let body = block(
        &[],
        vec![
            assign(scoped("last"), scoped("x")),
            node(NodeKind::If {
                cond: boxed(NodeKind::BinaryOp {
                    operation: BinaryOperation::Compare {
                        op: ComparisonOp::Eq,
                        kind: PrimitiveKind::Int,
                    },
                    left: Box::new(scoped("x")),
                    right: Box::new(lit(5)),
                }),
                then_branch: Box::new(jump(Jump::Break, Some("loop"))),
                else_branch: None,
            }),
        ],
    );
    let for_each = node(NodeKind::ForEach {
        label: Some("loop".to_string()),
        variable: "x".to_string(),
        iterable: Box::new(frame_local("a")),
        element: boxed(NodeKind::Slot(0)),
        body: Box::new(body),
    });
    let root = block(&[("last", Value::Int(0))], vec![for_each, scoped("last")]);
    assert_eq!(eval_value(&mut vm, &root), Value::Int(5));
}

fn counter_class_path() -> crate::types::ClassPath {
    let mut class_path = crate::types::ClassPath::with_builtins();
    class_path.add(
        crate::types::ClassInfo::new("com.example.Counter").field("count", JavaType::int()),
    );
    class_path
}

#[test]
fn test_fallback_reads_field_when_local_is_absent() {
    let mut vm = MockVm::with_class_path(counter_class_path());
    let counter = vm.new_object("com.example.Counter");
    vm.set_field_value(&counter, "count", Value::Int(11));
    vm.set_this(THREAD, FRAME, counter);
    let field = FieldInfo::new("com.example.Counter", "count", JavaType::int());
    let root = node(NodeKind::Fallback {
        name: "count".to_string(),
        field: Some(boxed(NodeKind::FieldRef {
            target: FieldTarget::Instance(boxed(NodeKind::ThisRef { hops: vec![] })),
            field: field.clone(),
        })),
    });

    let frame = FrameContext::new(THREAD, FRAME);
    let outcome = run(
        &mut vm,
        &frame,
        &EvaluatorOptions::default(),
        &root,
        Some(&JavaType::int()),
    )
    .unwrap();
    assert_eq!(outcome.value, Value::Int(11));
    let Some(Modifier::Field { field: target, .. }) = outcome.modifier else {
        panic!("expected a field modifier, got {:?}", outcome.modifier);
    };
    assert_eq!(target, field);
}

#[test]
fn test_fallback_prefers_the_local() {
    let mut vm = MockVm::with_class_path(counter_class_path());
    let counter = vm.new_object("com.example.Counter");
    vm.set_this(THREAD, FRAME, counter);
    vm.set_local(THREAD, FRAME, "count", Value::Int(3));
    let root = node(NodeKind::Fallback {
        name: "count".to_string(),
        field: Some(boxed(NodeKind::FieldRef {
            target: FieldTarget::Instance(boxed(NodeKind::ThisRef { hops: vec![] })),
            field: FieldInfo::new("com.example.Counter", "count", JavaType::int()),
        })),
    });
    assert_eq!(eval_value(&mut vm, &root), Value::Int(3));
}

#[test]
fn test_local_root_yields_modifier() {
    let mut vm = MockVm::new();
    vm.set_local(THREAD, FRAME, "x", Value::Long(1));
    let frame = FrameContext::new(THREAD, FRAME);
    let outcome = run(
        &mut vm,
        &frame,
        &EvaluatorOptions::default(),
        &frame_local("x"),
        Some(&JavaType::long()),
    )
    .unwrap();
    let modifier = outcome.modifier.unwrap();
    modifier.set_value(&mut vm, Value::Int(9)).unwrap();
    assert_eq!(vm.local(THREAD, FRAME, "x"), Some(&Value::Long(9)));
}

#[test]
fn test_outer_instance_hops() {
    let mut class_path = crate::types::ClassPath::with_builtins();
    class_path.add(crate::types::ClassInfo::new("com.example.Outer"));
    class_path.add(crate::types::ClassInfo::new("com.example.Outer$Inner").inner_of("com.example.Outer"));
    let mut vm = MockVm::with_class_path(class_path);
    let outer = vm.new_object("com.example.Outer");
    let inner = vm.new_object("com.example.Outer$Inner");
    vm.set_field_value(&inner, "this$0", Value::Object(outer.clone()));
    vm.set_this(THREAD, FRAME, inner);
    let root = node(NodeKind::ThisRef {
        hops: vec![FieldInfo::outer_this("com.example.Outer$Inner", "com.example.Outer")],
    });
    assert_eq!(eval_value(&mut vm, &root), Value::Object(outer));
}

#[test]
fn test_disconnected_vm_is_an_error() {
    let mut vm = MockVm::new();
    vm.set_local(THREAD, FRAME, "x", Value::Int(1));
    vm.disconnect();
    let kind = runtime_error(run_with(&mut vm, &EvaluatorOptions::default(), &frame_local("x")));
    assert_eq!(
        kind,
        ExecutionErrorKind::Runtime(RuntimeError::Vm(VmError::Disconnected))
    );
}
