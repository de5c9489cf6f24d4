use bumpalo::Bump;
use pretty_assertions::assert_eq;

use crate::parser::{
    BinaryOp, ComparisonOp, Expr, IncrementOp, Literal, ParseErrorKind, Stmt, TypeExpr, UnaryOp,
    parse, parse_with_max_depth,
};
use crate::types::PrimitiveKind;

fn expr<'a>(arena: &'a Bump, source: &'a str) -> &'a Expr<'a> {
    let parsed = parse(arena, source)
        .unwrap_or_else(|e| panic!("Expression parsing failed: {}\n{}", source, e));
    parsed.as_expression().expect("single expression")
}

#[test]
fn test_simple_binary_expr() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "1 + 2"),
        Expr::Binary {
            op: BinaryOp::Add,
            left: &Expr::Literal(Literal::Int(1)),
            right: &Expr::Literal(Literal::Int(2)),
        }
    );
}

#[test]
fn test_integer_literals() {
    let arena = Bump::new();
    let cases: [(&str, Literal); 8] = [
        ("42", Literal::Int(42)),
        ("0x7fff_ffff", Literal::Int(i32::MAX as i64)),
        ("0xFFFFFFFF", Literal::Int(-1)),
        ("017", Literal::Int(15)),
        ("0b101", Literal::Int(5)),
        ("42L", Literal::Long(42)),
        ("-2147483648", Literal::Int(i32::MIN as i64)),
        ("-9223372036854775808L", Literal::Long(i64::MIN as i128)),
    ];
    for (source, expected) in cases {
        assert_eq!(*expr(&arena, source), Expr::Literal(expected), "{}", source);
    }
}

#[test]
fn test_min_value_folds_only_next_to_the_minus() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "- 2147483648"),
        Expr::Literal(Literal::Int(i32::MIN as i64))
    );
    assert_eq!(
        *expr(&arena, "-(2147483648)"),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: &Expr::Literal(Literal::Int(1 << 31)),
        }
    );
    assert_eq!(
        *expr(&arena, "-(9223372036854775808L)"),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand: &Expr::Literal(Literal::Long(1 << 63)),
        }
    );
}

#[test]
fn test_integer_literal_out_of_range() {
    let arena = Bump::new();
    let err = parse(&arena, "2147483649").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
    let err = parse(&arena, "0x1_0000_0000").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
    let err = parse(&arena, "09").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
}

#[test]
fn test_float_literals() {
    let arena = Bump::new();
    assert_eq!(*expr(&arena, "2.5"), Expr::Literal(Literal::Double(2.5)));
    assert_eq!(*expr(&arena, "1e3"), Expr::Literal(Literal::Double(1000.0)));
    assert_eq!(*expr(&arena, "1.5f"), Expr::Literal(Literal::Float(1.5)));
    assert_eq!(*expr(&arena, ".5"), Expr::Literal(Literal::Double(0.5)));
    assert_eq!(*expr(&arena, "3d"), Expr::Literal(Literal::Double(3.0)));
    let err = parse(&arena, "1e400").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidNumber { .. }));
}

#[test]
fn test_char_and_string_literals() {
    let arena = Bump::new();
    assert_eq!(*expr(&arena, "'a'"), Expr::Literal(Literal::Char(97)));
    assert_eq!(*expr(&arena, r"'\n'"), Expr::Literal(Literal::Char(10)));
    assert_eq!(*expr(&arena, r"'é'"), Expr::Literal(Literal::Char(0xe9)));
    assert_eq!(
        *expr(&arena, r#""a\tbA""#),
        Expr::Literal(Literal::Str("a\tbA"))
    );
    assert_eq!(
        *expr(&arena, r#""😀""#),
        Expr::Literal(Literal::Str("😀"))
    );
    let err = parse(&arena, r#""\q""#).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidEscape { .. }));
}

#[test]
fn test_method_calls_and_fields() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "a.b.c(1)"),
        Expr::Call {
            target: Some(&Expr::Field {
                target: &Expr::Ident("a"),
                name: "b",
            }),
            name: "c",
            args: &[&Expr::Literal(Literal::Int(1))],
        }
    );
    assert_eq!(
        *expr(&arena, "foo()"),
        Expr::Call {
            target: None,
            name: "foo",
            args: &[],
        }
    );
    assert_eq!(
        *expr(&arena, "super.m()"),
        Expr::Call {
            target: Some(&Expr::Super),
            name: "m",
            args: &[],
        }
    );
}

#[test]
fn test_this_and_class_literals() {
    let arena = Bump::new();
    assert_eq!(*expr(&arena, "this"), Expr::This(None));
    assert_eq!(*expr(&arena, "Outer.this"), Expr::This(Some("Outer")));
    assert_eq!(
        *expr(&arena, "int[].class"),
        Expr::ClassLiteral(&TypeExpr::Array(&TypeExpr::Primitive(PrimitiveKind::Int)))
    );
    assert_eq!(
        *expr(&arena, "java.lang.String.class"),
        Expr::ClassLiteral(&TypeExpr::Named("java.lang.String"))
    );
}

#[test]
fn test_cast_and_unary() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "(double) 5 / 2"),
        Expr::Binary {
            op: BinaryOp::Div,
            left: &Expr::Cast {
                ty: &TypeExpr::Primitive(PrimitiveKind::Double),
                expr: &Expr::Literal(Literal::Int(5)),
            },
            right: &Expr::Literal(Literal::Int(2)),
        }
    );
    assert_eq!(
        *expr(&arena, "(java.util.List<String>) o"),
        Expr::Cast {
            ty: &TypeExpr::Named("java.util.List"),
            expr: &Expr::Ident("o"),
        }
    );
    assert_eq!(
        *expr(&arena, "!-x"),
        Expr::Unary {
            op: UnaryOp::Not,
            operand: &Expr::Unary {
                op: UnaryOp::Neg,
                operand: &Expr::Ident("x"),
            },
        }
    );
    assert_eq!(
        *expr(&arena, "i++"),
        Expr::Increment {
            op: IncrementOp::Increment,
            prefix: false,
            target: &Expr::Ident("i"),
        }
    );
}

#[test]
fn test_compound_assignment() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "a >>>= 2"),
        Expr::Assign {
            op: Some(BinaryOp::UShr),
            target: &Expr::Ident("a"),
            value: &Expr::Literal(Literal::Int(2)),
        }
    );
}

#[test]
fn test_new_expressions() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "new java.util.ArrayList<>(4)"),
        Expr::New {
            outer: None,
            class: &TypeExpr::Named("java.util.ArrayList"),
            args: &[&Expr::Literal(Literal::Int(4))],
            has_body: false,
        }
    );
    assert_eq!(
        *expr(&arena, "new int[]{1}"),
        Expr::NewArray {
            ty: &TypeExpr::Array(&TypeExpr::Primitive(PrimitiveKind::Int)),
            dims: &[],
            init: Some(&Expr::ArrayInit(&[&Expr::Literal(Literal::Int(1))])),
        }
    );
    let Expr::NewArray { ty, dims, .. } = expr(&arena, "new int[2][3]") else {
        panic!("expected array creation");
    };
    assert_eq!(ty.rank(), 2);
    assert_eq!(dims.len(), 2);
    assert!(matches!(
        expr(&arena, "new Runnable() { public void run() {} }"),
        Expr::New { has_body: true, .. }
    ));
    assert!(matches!(
        expr(&arena, "outer.new Inner()"),
        Expr::New { outer: Some(_), .. }
    ));
}

#[test]
fn test_unsupported_forms_are_recognized() {
    let arena = Bump::new();
    assert_eq!(*expr(&arena, "x -> x + 1"), Expr::Lambda);
    assert!(matches!(expr(&arena, "String::valueOf"), Expr::MethodRef { .. }));
    assert!(matches!(
        expr(&arena, "o instanceof String s"),
        Expr::InstanceOf {
            binding: Some("s"),
            ..
        }
    ));
}

#[test]
fn test_statements_then_trailing_expression() {
    let arena = Bump::new();
    let parsed = parse(&arena, "int s = 0; for (int i = 0; i < 3; i++) s += i; s").unwrap();
    assert!(parsed.as_expression().is_none());
    let statements = parsed.fragment.statements;
    assert_eq!(statements.len(), 2);
    let Stmt::LocalVar { ty, declarators } = statements[0] else {
        panic!("expected declaration");
    };
    assert_eq!(**ty, TypeExpr::Primitive(PrimitiveKind::Int));
    assert_eq!(declarators[0].name, "s");
    assert!(matches!(statements[1], Stmt::For { .. }));
    assert_eq!(parsed.fragment.result, Some(&Expr::Ident("s")));
}

#[test]
fn test_try_statement() {
    let arena = Bump::new();
    let parsed = parse(
        &arena,
        "try { a(); } catch (IllegalStateException | RuntimeException e) { b(); } finally { c(); }",
    )
    .unwrap();
    let Stmt::Try {
        has_resources,
        catches,
        finally,
        ..
    } = parsed.fragment.statements[0]
    else {
        panic!("expected try");
    };
    assert!(!has_resources);
    assert_eq!(catches.len(), 1);
    assert_eq!(
        catches[0].types,
        &[
            TypeExpr::Named("IllegalStateException"),
            TypeExpr::Named("RuntimeException")
        ]
    );
    assert_eq!(catches[0].name, "e");
    assert!(finally.is_some());
}

#[test]
fn test_spans() {
    let arena = Bump::new();
    let parsed = parse(&arena, "a == b + c").unwrap();
    let root = parsed.as_expression().unwrap();
    assert_eq!(parsed.span_of(root).0, 0..10);
    let Expr::Comparison { op, right, .. } = root else {
        panic!("expected comparison");
    };
    assert_eq!(*op, ComparisonOp::Eq);
    assert_eq!(parsed.span_of(right).0, 5..10);
}

#[test]
fn test_comments_and_whitespace() {
    let arena = Bump::new();
    assert_eq!(
        *expr(&arena, "1 /* one */ + // two\n 2"),
        *expr(&arena, "1 + 2")
    );
}

#[test]
fn test_syntax_errors() {
    let arena = Bump::new();
    let err = parse(&arena, "1 +").unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));

    let err = parse(&arena, "foo(1, 2").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnclosedDelimiter { delimiter: '(' });
}

#[test]
fn test_max_depth() {
    let arena = Bump::new();
    let source = format!("{}1{}", "(".repeat(20), ")".repeat(20));
    assert!(parse_with_max_depth(&arena, &source, 50).is_ok());
    let err = parse_with_max_depth(&arena, &source, 10).unwrap_err();
    assert!(matches!(
        err.kind,
        ParseErrorKind::MaxDepthExceeded { max_depth: 10, .. }
    ));

    let source = "c ? ".repeat(20) + "1" + &" : 2".repeat(20);
    let err = parse_with_max_depth(&arena, &source, 10).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::MaxDepthExceeded { .. }));
}
