mod cases;

use cases::Debuggee;
use indoc::indoc;
use jeval::{Error, Value};
use pretty_assertions::assert_eq;

test_case!(
    counted_loop,
    input: "int s = 0; for (int i = 1; i <= n; i++) s += i; s",
    value: Value::Int(10),
);

test_case!(
    while_with_break,
    input: "int i = 0; while (true) { if (i * i > 50) break; i++; } i",
    value: Value::Int(8),
);

test_case!(
    do_while_runs_once,
    input: "int i = 10; do { i += n; } while (i < 5); i",
    value: Value::Int(14),
);

test_case!(
    continue_skips_rest_of_body,
    input: "int s = 0; for (int i = 0; i < 10; i++) { if (i % 2 == 0) continue; s += i; } s",
    value: Value::Int(25),
);

test_case!(
    for_each_over_array,
    input: "double t = 0; for (double p : prices) t += p; t",
    value: Value::Double(3.75),
);

test_case!(
    for_each_over_list,
    input: "int s = 0; for (Integer i : items) s += i; s",
    value: Value::Int(60),
);

test_case!(
    if_else,
    input: "int r; if (n > 3) r = 1; else r = 2; r",
    value: Value::Int(1),
);

test_case!(
    top_level_return,
    input: "if (n > 0) return \"pos\"; return \"neg\";",
    text: "pos",
);

test_case!(
    catch_debuggee_exception,
    input: "int r = 0; try { discount(2.0); } catch (IllegalArgumentException e) { r = 1; } r",
    value: Value::Int(1),
);

test_case!(
    catch_by_superclass,
    input: "String m = null; try { discount(2.0); } catch (RuntimeException e) { m = e.getMessage(); } m",
    text: "rate 2 above 1",
);

test_case!(
    catch_thrown_by_fragment,
    input: "int r = 0; try { throw new IllegalStateException(\"x\"); } catch (RuntimeException e) { r = 7; } r",
    value: Value::Int(7),
);

test_case!(
    uncaught_throw,
    input: "throw new IllegalStateException(\"boom\");",
    error: Error::Exception { .. },
);

test_case!(
    catch_does_not_match_other_exceptions,
    input: "try { discount(2.0); } catch (IllegalStateException e) { }",
    error: Error::Exception { .. },
);

#[test]
fn test_finally_runs_on_every_path() {
    let mut debuggee = Debuggee::new();
    let source = indoc! {r#"
        int log = 0;
        for (int i = 0; i < 3; i++) {
            try {
                if (i == 0) continue;
                if (i == 1) discount(5.0);
                log += 100;
            } catch (IllegalArgumentException e) {
                log += 10;
            } finally {
                log += 1;
            }
        }
        log
    "#};
    let result = debuggee.evaluate(source).unwrap();
    assert_eq!(result.value, Value::Int(113));
}

#[test]
fn test_nested_labeled_loops() {
    let mut debuggee = Debuggee::new();
    let source = indoc! {"
        int found = -1;
        search:
        for (int i = 0; i < n; i++) {
            for (int j = 0; j < n; j++) {
                if (i * j == 6) {
                    found = i * 10 + j;
                    break search;
                }
            }
        }
        found
    "};
    let result = debuggee.evaluate(source).unwrap();
    assert_eq!(result.value, Value::Int(23));
}

#[test]
fn test_fragment_variables_do_not_leak_between_evaluations() {
    let mut debuggee = Debuggee::new();
    let first = debuggee.evaluate("int tmp = n * 2; tmp").unwrap();
    assert_eq!(first.value, Value::Int(8));
    let second = debuggee.evaluate("tmp");
    assert!(matches!(second, Err(Error::Compilation { .. })));
}
