//! JDK classes every debuggee has.
//!
//! Only members the evaluator or its tests touch are described.

use super::{
    JavaType, PrimitiveKind,
    java_type::{ITERABLE, ITERATOR, OBJECT, STRING, THROWABLE},
    symbols::ClassInfo,
};

pub const EXCEPTIONS: [(&str, &str); 10] = [
    ("java.lang.Exception", THROWABLE),
    ("java.lang.RuntimeException", "java.lang.Exception"),
    ("java.lang.IllegalArgumentException", "java.lang.RuntimeException"),
    ("java.lang.IllegalStateException", "java.lang.RuntimeException"),
    ("java.lang.ArithmeticException", "java.lang.RuntimeException"),
    ("java.lang.NullPointerException", "java.lang.RuntimeException"),
    ("java.lang.UnsupportedOperationException", "java.lang.RuntimeException"),
    ("java.lang.NumberFormatException", "java.lang.IllegalArgumentException"),
    ("java.lang.IndexOutOfBoundsException", "java.lang.RuntimeException"),
    ("java.util.NoSuchElementException", "java.lang.RuntimeException"),
];

pub const ARRAY_LIST_ITERATOR: &str = "java.util.ArrayList$Itr";

fn prim(kind: PrimitiveKind) -> JavaType {
    JavaType::Primitive(kind)
}

pub(crate) fn builtin_classes() -> Vec<ClassInfo> {
    let object = JavaType::object();
    let string = JavaType::string();

    let mut classes = vec![
        ClassInfo::new(OBJECT)
            .constructor(vec![])
            .method("toString", vec![], string.clone())
            .method("hashCode", vec![], JavaType::int())
            .method("equals", vec![object.clone()], JavaType::boolean())
            .method("getClass", vec![], JavaType::class("java.lang.Class")),
        ClassInfo::new("java.lang.Class").method("getName", vec![], string.clone()),
        ClassInfo::interface("java.lang.Comparable"),
        ClassInfo::interface("java.lang.CharSequence")
            .method("length", vec![], JavaType::int())
            .method("charAt", vec![JavaType::int()], prim(PrimitiveKind::Char)),
        ClassInfo::interface("java.io.Serializable"),
        ClassInfo::interface("java.lang.Cloneable"),
        ClassInfo::new(STRING)
            .implements("java.lang.CharSequence")
            .implements("java.lang.Comparable")
            .implements("java.io.Serializable")
            .constructor(vec![])
            .constructor(vec![string.clone()])
            .method("length", vec![], JavaType::int())
            .method("charAt", vec![JavaType::int()], prim(PrimitiveKind::Char))
            .method("isEmpty", vec![], JavaType::boolean())
            .method("concat", vec![string.clone()], string.clone())
            .method(
                "substring",
                vec![JavaType::int(), JavaType::int()],
                string.clone(),
            )
            .method("indexOf", vec![string.clone()], JavaType::int())
            .method("equals", vec![object.clone()], JavaType::boolean())
            .method("hashCode", vec![], JavaType::int())
            .method("toString", vec![], string.clone())
            .static_method("valueOf", vec![JavaType::int()], string.clone())
            .static_method("valueOf", vec![object.clone()], string.clone())
            .varargs_method(
                "format",
                vec![string.clone(), JavaType::array_of(object.clone())],
                string.clone(),
                true,
            ),
        ClassInfo::new("java.lang.StringBuilder")
            .implements("java.lang.CharSequence")
            .constructor(vec![])
            .constructor(vec![string.clone()])
            .method("length", vec![], JavaType::int())
            .method("toString", vec![], string.clone())
            .method(
                "append",
                vec![string.clone()],
                JavaType::class("java.lang.StringBuilder"),
            )
            .method(
                "append",
                vec![object.clone()],
                JavaType::class("java.lang.StringBuilder"),
            ),
        ClassInfo::new("java.lang.Number")
            .implements("java.io.Serializable")
            .method("intValue", vec![], JavaType::int())
            .method("longValue", vec![], JavaType::long())
            .method("floatValue", vec![], prim(PrimitiveKind::Float))
            .method("doubleValue", vec![], JavaType::double())
            .method("byteValue", vec![], prim(PrimitiveKind::Byte))
            .method("shortValue", vec![], prim(PrimitiveKind::Short)),
        ClassInfo::new("java.lang.Math")
            .static_field("PI", JavaType::double())
            .static_method("abs", vec![JavaType::int()], JavaType::int())
            .static_method("abs", vec![JavaType::long()], JavaType::long())
            .static_method("abs", vec![JavaType::double()], JavaType::double())
            .static_method(
                "max",
                vec![JavaType::int(), JavaType::int()],
                JavaType::int(),
            )
            .static_method(
                "max",
                vec![JavaType::long(), JavaType::long()],
                JavaType::long(),
            )
            .static_method(
                "max",
                vec![JavaType::double(), JavaType::double()],
                JavaType::double(),
            )
            .static_method(
                "min",
                vec![JavaType::int(), JavaType::int()],
                JavaType::int(),
            )
            .static_method(
                "min",
                vec![JavaType::double(), JavaType::double()],
                JavaType::double(),
            )
            .static_method("sqrt", vec![JavaType::double()], JavaType::double())
            .static_method(
                "pow",
                vec![JavaType::double(), JavaType::double()],
                JavaType::double(),
            ),
        ClassInfo::interface(ITERABLE).method("iterator", vec![], JavaType::class(ITERATOR)),
        ClassInfo::interface(ITERATOR)
            .method("hasNext", vec![], JavaType::boolean())
            .method("next", vec![], object.clone()),
        ClassInfo::interface("java.util.Collection")
            .implements(ITERABLE)
            .method("size", vec![], JavaType::int())
            .method("isEmpty", vec![], JavaType::boolean())
            .method("add", vec![object.clone()], JavaType::boolean())
            .method("contains", vec![object.clone()], JavaType::boolean()),
        ClassInfo::interface("java.util.List")
            .implements("java.util.Collection")
            .method("get", vec![JavaType::int()], object.clone()),
        ClassInfo::new("java.util.ArrayList")
            .implements("java.util.List")
            .constructor(vec![])
            .method("size", vec![], JavaType::int())
            .method("isEmpty", vec![], JavaType::boolean())
            .method("add", vec![object.clone()], JavaType::boolean())
            .method("get", vec![JavaType::int()], object.clone())
            .method("contains", vec![object.clone()], JavaType::boolean())
            .method("iterator", vec![], JavaType::class(ITERATOR)),
        ClassInfo::new(ARRAY_LIST_ITERATOR)
            .nested_in("java.util.ArrayList")
            .implements(ITERATOR)
            .method("hasNext", vec![], JavaType::boolean())
            .method("next", vec![], object.clone()),
        ClassInfo::new(THROWABLE)
            .implements("java.io.Serializable")
            .constructor(vec![])
            .constructor(vec![string.clone()])
            .method("getMessage", vec![], string.clone())
            .method("toString", vec![], string.clone()),
    ];

    for (name, superclass) in EXCEPTIONS {
        classes.push(
            ClassInfo::new(name)
                .extends(superclass)
                .constructor(vec![])
                .constructor(vec![string.clone()]),
        );
    }

    for kind in PrimitiveKind::ALL {
        classes.push(wrapper_class(kind));
    }

    classes
}

fn wrapper_class(kind: PrimitiveKind) -> ClassInfo {
    let this = JavaType::class(kind.wrapper_class());
    let mut class = ClassInfo::new(kind.wrapper_class())
        .implements("java.lang.Comparable")
        .constructor(vec![prim(kind)])
        .static_method("valueOf", vec![prim(kind)], this.clone())
        .method("toString", vec![], JavaType::string())
        .method("hashCode", vec![], JavaType::int())
        .method("equals", vec![JavaType::object()], JavaType::boolean());

    if kind.is_numeric() && kind != PrimitiveKind::Char {
        class = class.extends("java.lang.Number");
        for target in PrimitiveKind::ALL
            .into_iter()
            .filter(|k| k.is_numeric() && *k != PrimitiveKind::Char)
        {
            class = class.method(target.unbox_method(), vec![], prim(target));
        }
        class = class
            .static_field("MIN_VALUE", prim(kind))
            .static_field("MAX_VALUE", prim(kind));
    } else {
        class = class
            .implements("java.io.Serializable")
            .method(kind.unbox_method(), vec![], prim(kind));
    }

    match kind {
        PrimitiveKind::Int => class.static_method(
            "parseInt",
            vec![JavaType::string()],
            JavaType::int(),
        ),
        PrimitiveKind::Boolean => class
            .static_field("TRUE", this.clone())
            .static_field("FALSE", this),
        PrimitiveKind::Char => class
            .static_field("MIN_VALUE", prim(kind))
            .static_field("MAX_VALUE", prim(kind)),
        _ => class,
    }
}
