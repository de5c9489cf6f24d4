//! Shared fixture for the integration tests: a debuggee suspended in
//! `com.example.Shop.checkout(int n)`, and the `test_case!` macro.
#![allow(dead_code)]

use jeval::remote::MockVm;
use jeval::{
    ClassInfo, ClassPath, CompileContext, Engine, EngineOptions, Error, Evaluation, FrameContext,
    JavaType, LocalVariable, ObjectRef, Value,
};
use once_cell::sync::Lazy;

pub const THREAD: u64 = 1;
pub const FRAME: u64 = 0;

pub const SHOP: &str = "com.example.Shop";
pub const CART: &str = "com.example.Shop$Cart";
pub const LISTENER: &str = "com.example.Shop$1";

/// Builtins plus the classes of the suspended program.
pub static CLASS_PATH: Lazy<ClassPath> = Lazy::new(|| {
    let mut class_path = ClassPath::with_builtins();
    class_path
        .add(
            ClassInfo::new(SHOP)
                .field("owner", JavaType::string())
                .field("count", JavaType::int())
                .field("items", JavaType::class("java.util.List"))
                .field("prices", JavaType::array_of(JavaType::double()))
                .static_field("TOTAL", JavaType::long())
                .constructor(vec![])
                .method("size", vec![], JavaType::int())
                .method("discount", vec![JavaType::double()], JavaType::double())
                .static_method("create", vec![], JavaType::class(SHOP)),
        )
        .add(
            ClassInfo::new(CART)
                .inner_of(SHOP)
                .field("quantity", JavaType::int())
                .constructor(vec![])
                .method("total", vec![], JavaType::int()),
        )
        .add(
            ClassInfo::new(LISTENER)
                .inner_of(SHOP)
                .field("val$limit", JavaType::int()),
        );
    class_path
});

pub fn engine() -> Engine<ClassPath> {
    Engine::new(CLASS_PATH.clone(), EngineOptions::default())
}

/// Compile context of `Shop.checkout(int n)`, where `count` is a local that
/// is only assigned on some paths.
pub fn checkout_context() -> CompileContext {
    CompileContext::in_class(SHOP)
        .local("n", JavaType::int())
        .local("label", JavaType::string())
        .with_local(LocalVariable::new("count", JavaType::int()).uncertain())
}

/// A `MockVm` suspended in `Shop.checkout(4)` with a populated `this`.
pub struct Debuggee {
    pub vm: MockVm,
    pub frame: FrameContext,
    pub this: ObjectRef,
}

impl Debuggee {
    pub fn new() -> Self {
        let mut vm = MockVm::with_class_path(CLASS_PATH.clone());
        install_natives(&mut vm);

        let this = vm.new_object(SHOP);
        let owner = vm.new_string("ada");
        vm.set_field_value(&this, "owner", Value::Object(owner));
        vm.set_field_value(&this, "count", Value::Int(3));
        let boxed: Vec<Value> = [10, 20, 30]
            .into_iter()
            .map(|v| Value::Object(vm.new_boxed(Value::Int(v)).expect("int boxes")))
            .collect();
        let items = vm.new_list(boxed);
        vm.set_field_value(&this, "items", Value::Object(items));
        let prices = vm.new_array_of(&JavaType::double(), vec![Value::Double(1.5), Value::Double(2.25)]);
        vm.set_field_value(&this, "prices", Value::Object(prices));
        vm.set_static(SHOP, "TOTAL", Value::Long(1_000));

        vm.set_this(THREAD, FRAME, this.clone());
        vm.set_local(THREAD, FRAME, "n", Value::Int(4));
        let label = vm.new_string("total");
        vm.set_local(THREAD, FRAME, "label", Value::Object(label));

        Self {
            vm,
            frame: FrameContext::new(THREAD, FRAME),
            this,
        }
    }

    pub fn evaluate(&mut self, source: &str) -> Result<Evaluation, Error> {
        self.evaluate_in(source, &checkout_context())
    }

    pub fn evaluate_in(&mut self, source: &str, context: &CompileContext) -> Result<Evaluation, Error> {
        let expr = engine().compile(source, context)?;
        expr.evaluate(&mut self.vm, &self.frame)
    }

    /// `String.valueOf` of a result, as a debugger would show it.
    pub fn show(&mut self, value: &Value) -> String {
        self.vm.to_java_string(value).expect("string conversion")
    }
}

fn install_natives(vm: &mut MockVm) {
    vm.define_native(SHOP, "size", &[], |vm, this, _| {
        let this = this.expect("instance method");
        Ok(vm.field_value(this, "count").unwrap_or(Value::Int(0)))
    });
    vm.define_native(SHOP, "discount", &[JavaType::double()], |vm, _, args| {
        match args {
            [Value::Double(rate)] if *rate > 1.0 => Err(vm.throw(
                "java.lang.IllegalArgumentException",
                &format!("rate {} above 1", rate),
            )),
            [Value::Double(rate)] => Ok(Value::Double(100.0 * (1.0 - rate))),
            _ => Ok(Value::Double(0.0)),
        }
    });
    vm.define_native(SHOP, "create", &[], |vm, _, _| {
        let shop = vm.new_object(SHOP);
        Ok(Value::Object(shop))
    });
    vm.define_native(CART, "total", &[], |vm, this, _| {
        let this = this.expect("instance method");
        let quantity = vm.field_value(this, "quantity").unwrap_or(Value::Int(0));
        Ok(quantity)
    });
}

/// One evaluation against a fresh [`Debuggee`].
///
/// - `value:` compares the result value.
/// - `text:` compares the result converted with `String.valueOf`.
/// - `error:` matches the error against a pattern.
#[macro_export]
macro_rules! test_case {
    ($name:ident, input: $input:expr, value: $value:expr $(,)?) => {
        #[test]
        fn $name() {
            let mut debuggee = $crate::cases::Debuggee::new();
            let result = debuggee
                .evaluate($input)
                .unwrap_or_else(|e| panic!("{:?} failed: {:?}", $input, e));
            pretty_assertions::assert_eq!(result.value, $value);
        }
    };
    ($name:ident, input: $input:expr, text: $text:expr $(,)?) => {
        #[test]
        fn $name() {
            let mut debuggee = $crate::cases::Debuggee::new();
            let result = debuggee
                .evaluate($input)
                .unwrap_or_else(|e| panic!("{:?} failed: {:?}", $input, e));
            pretty_assertions::assert_eq!(debuggee.show(&result.value), $text);
        }
    };
    ($name:ident, input: $input:expr, error: $pattern:pat $(,)?) => {
        #[test]
        fn $name() {
            let mut debuggee = $crate::cases::Debuggee::new();
            match debuggee.evaluate($input) {
                Ok(result) => panic!("{:?} evaluated to {:?}", $input, result.value),
                Err(e) => assert!(matches!(e, $pattern), "unexpected error: {:?}", e),
            }
        }
    };
}
