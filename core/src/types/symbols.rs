//! Static symbol information about the debuggee's classes.
//!
//! The builder never talks to the remote process: everything it needs to know
//! about classes, fields and methods comes through a [`SymbolResolver`].

use core::fmt;
use std::collections::VecDeque;

use hashbrown::HashSet;

use super::{JavaType, java_type::OBJECT, method_signature};

/// Name the compiler gives the field holding an inner class's enclosing instance.
pub const OUTER_THIS_FIELD: &str = "this$0";

/// Prefix of the fields holding locals captured by local and anonymous classes.
pub const CAPTURED_LOCAL_PREFIX: &str = "val$";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    pub declaring_class: String,
    pub name: String,
    pub ty: JavaType,
    pub is_static: bool,
}

impl FieldInfo {
    pub fn new(declaring_class: impl Into<String>, name: impl Into<String>, ty: JavaType) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            ty,
            is_static: false,
        }
    }

    pub fn new_static(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        ty: JavaType,
    ) -> Self {
        Self {
            is_static: true,
            ..Self::new(declaring_class, name, ty)
        }
    }

    /// The synthetic field of `class` that refers to its enclosing `outer` instance.
    pub fn outer_this(class: &str, outer: &str) -> Self {
        Self::new(class, OUTER_THIS_FIELD, JavaType::class(outer))
    }

    /// The synthetic field of `class` holding a copy of the captured local `name`.
    pub fn captured_local(class: &str, name: &str, ty: JavaType) -> Self {
        Self::new(class, format!("{}{}", CAPTURED_LOCAL_PREFIX, name), ty)
    }
}

impl fmt::Display for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_class, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodInfo {
    pub declaring_class: String,
    /// Method name; constructors are named `<init>`.
    pub name: String,
    pub params: Vec<JavaType>,
    pub return_type: JavaType,
    pub is_static: bool,
    pub is_varargs: bool,
}

impl MethodInfo {
    pub const CONSTRUCTOR: &'static str = "<init>";

    pub fn new(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        params: Vec<JavaType>,
        return_type: JavaType,
    ) -> Self {
        Self {
            declaring_class: declaring_class.into(),
            name: name.into(),
            params,
            return_type,
            is_static: false,
            is_varargs: false,
        }
    }

    pub fn new_static(
        declaring_class: impl Into<String>,
        name: impl Into<String>,
        params: Vec<JavaType>,
        return_type: JavaType,
    ) -> Self {
        Self {
            is_static: true,
            ..Self::new(declaring_class, name, params, return_type)
        }
    }

    pub fn constructor(declaring_class: impl Into<String>, params: Vec<JavaType>) -> Self {
        Self::new(declaring_class, Self::CONSTRUCTOR, params, JavaType::Void)
    }

    /// Mark the last parameter as a variable-arity parameter.
    pub fn with_varargs(mut self) -> Self {
        debug_assert!(matches!(self.params.last(), Some(JavaType::Array(_))));
        self.is_varargs = true;
        self
    }

    pub fn is_constructor(&self) -> bool {
        self.name == Self::CONSTRUCTOR
    }

    /// JNI signature, e.g. `(ILjava/lang/String;)V`.
    pub fn signature(&self) -> String {
        method_signature(&self.params, &self.return_type)
    }
}

impl fmt::Display for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.declaring_class, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if self.is_varargs && i + 1 == self.params.len() {
                if let Some(element) = param.element_type() {
                    write!(f, "{}...", element)?;
                    continue;
                }
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

/// Declared shape of one class or interface.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub name: String,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    /// Lexically enclosing class, for nested, local and anonymous classes.
    pub outer: Option<String>,
    /// Whether instances carry a reference to an enclosing instance.
    pub has_outer_instance: bool,
    pub is_interface: bool,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub constructors: Vec<MethodInfo>,
}

impl ClassInfo {
    /// A top-level class extending `java.lang.Object`.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let superclass = (name != OBJECT).then(|| OBJECT.to_string());
        Self {
            name,
            superclass,
            interfaces: Vec::new(),
            outer: None,
            has_outer_instance: false,
            is_interface: false,
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            superclass: None,
            is_interface: true,
            ..Self::new(name)
        }
    }

    pub fn extends(mut self, superclass: impl Into<String>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// An inner (non-static) class of `outer`.
    pub fn inner_of(mut self, outer: impl Into<String>) -> Self {
        self.outer = Some(outer.into());
        self.has_outer_instance = true;
        self
    }

    /// A static nested class of `outer`.
    pub fn nested_in(mut self, outer: impl Into<String>) -> Self {
        self.outer = Some(outer.into());
        self.has_outer_instance = false;
        self
    }

    pub fn field(mut self, name: &str, ty: JavaType) -> Self {
        self.fields.push(FieldInfo::new(&self.name, name, ty));
        self
    }

    pub fn static_field(mut self, name: &str, ty: JavaType) -> Self {
        self.fields.push(FieldInfo::new_static(&self.name, name, ty));
        self
    }

    pub fn method(mut self, name: &str, params: Vec<JavaType>, return_type: JavaType) -> Self {
        self.methods
            .push(MethodInfo::new(&self.name, name, params, return_type));
        self
    }

    pub fn static_method(
        mut self,
        name: &str,
        params: Vec<JavaType>,
        return_type: JavaType,
    ) -> Self {
        self.methods
            .push(MethodInfo::new_static(&self.name, name, params, return_type));
        self
    }

    /// Add a method whose last parameter is variable-arity.
    pub fn varargs_method(
        mut self,
        name: &str,
        params: Vec<JavaType>,
        return_type: JavaType,
        is_static: bool,
    ) -> Self {
        let mut method = MethodInfo::new(&self.name, name, params, return_type).with_varargs();
        method.is_static = is_static;
        self.methods.push(method);
        self
    }

    pub fn constructor(mut self, params: Vec<JavaType>) -> Self {
        self.constructors
            .push(MethodInfo::constructor(&self.name, params));
        self
    }

    /// Unqualified name, with the enclosing class prefix removed.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }
}

/// Strip package and enclosing-class prefixes: `a.b.Outer$Inner` → `Inner`.
pub fn simple_name(name: &str) -> &str {
    let start = name.rfind(['.', '$']).map_or(0, |i| i + 1);
    &name[start..]
}

/// Source of static knowledge about classes in the debuggee.
///
/// Implementors provide class lookup; member lookup through the type hierarchy
/// is provided on top of it.
pub trait SymbolResolver {
    /// Look up a class by fully qualified binary name.
    fn class(&self, name: &str) -> Option<&ClassInfo>;

    /// Resolve a name as written in source (simple, qualified, or nested with
    /// dots) to a fully qualified binary name.
    fn resolve_class_name(&self, name: &str) -> Option<String>;

    /// Find a field by name in `class`, its superclasses and its interfaces.
    fn find_field(&self, class: &str, name: &str) -> Option<FieldInfo> {
        let mut seen = HashSet::new();
        find_field_in(self, class, name, &mut seen)
    }

    /// Collect every method named `name` that is a member of `class`.
    ///
    /// Overridden methods only appear once, as declared by the most derived class.
    fn find_methods(&self, class: &str, name: &str) -> Vec<MethodInfo> {
        let mut found: Vec<MethodInfo> = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([class.to_string()]);
        let mut is_interface = false;
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(info) = self.class(&current) else {
                continue;
            };
            if current == class {
                is_interface = info.is_interface;
            }
            for method in info.methods.iter().filter(|m| m.name == name) {
                if !found.iter().any(|m| m.params == method.params) {
                    found.push(method.clone());
                }
            }
            queue.extend(info.superclass.iter().cloned());
            queue.extend(info.interfaces.iter().cloned());
        }
        if is_interface && !seen.contains(OBJECT) {
            if let Some(object) = self.class(OBJECT) {
                for method in object.methods.iter().filter(|m| m.name == name) {
                    if !found.iter().any(|m| m.params == method.params) {
                        found.push(method.clone());
                    }
                }
            }
        }
        found
    }

    fn constructors(&self, class: &str) -> Vec<MethodInfo> {
        self.class(class)
            .map(|info| info.constructors.clone())
            .unwrap_or_default()
    }

    /// Whether `sub` is `sup` or inherits from it (classes and interfaces).
    fn is_subclass(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == OBJECT {
            return true;
        }
        let mut seen = HashSet::new();
        let mut stack = vec![sub.to_string()];
        while let Some(current) = stack.pop() {
            if current == sup {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(info) = self.class(&current) {
                stack.extend(info.superclass.iter().cloned());
                stack.extend(info.interfaces.iter().cloned());
            }
        }
        false
    }

    /// Reference subtyping (JLS 4.10.2/4.10.3), identity included.
    fn is_subtype(&self, sub: &JavaType, sup: &JavaType) -> bool {
        if sub == sup {
            return true;
        }
        match (sub, sup) {
            (JavaType::Null, sup) => sup.is_reference(),
            (JavaType::Class(a), JavaType::Class(b)) => self.is_subclass(a, b),
            (JavaType::Array(_), JavaType::Class(b)) => {
                b == OBJECT || b == "java.lang.Cloneable" || b == "java.io.Serializable"
            }
            (JavaType::Array(a), JavaType::Array(b)) => match (a.as_ref(), b.as_ref()) {
                (JavaType::Primitive(x), JavaType::Primitive(y)) => x == y,
                (a, b) if a.is_reference() && b.is_reference() => self.is_subtype(a, b),
                _ => false,
            },
            _ => false,
        }
    }

    /// `class` followed by its lexically enclosing classes, innermost first.
    fn enclosing_chain(&self, class: &str) -> Vec<String> {
        let mut chain = vec![class.to_string()];
        let mut current = class.to_string();
        while let Some(outer) = self.class(&current).and_then(|info| info.outer.clone()) {
            if chain.contains(&outer) {
                break;
            }
            chain.push(outer.clone());
            current = outer;
        }
        chain
    }
}

fn find_field_in<R: SymbolResolver + ?Sized>(
    resolver: &R,
    class: &str,
    name: &str,
    seen: &mut HashSet<String>,
) -> Option<FieldInfo> {
    if !seen.insert(class.to_string()) {
        return None;
    }
    let info = resolver.class(class)?;
    if let Some(field) = info.fields.iter().find(|f| f.name == name) {
        return Some(field.clone());
    }
    for interface in &info.interfaces {
        if let Some(field) = find_field_in(resolver, interface, name, seen) {
            return Some(field);
        }
    }
    let superclass = info.superclass.as_deref()?;
    find_field_in(resolver, superclass, name, seen)
}
