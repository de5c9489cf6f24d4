//! In-memory [`SymbolResolver`].

use hashbrown::HashMap;

use super::{
    builtins,
    symbols::{ClassInfo, SymbolResolver, simple_name},
};

/// A set of classes known by name.
///
/// `with_builtins()` preloads the small part of the JDK that the evaluator
/// relies on (wrappers, `String`, exceptions, `Iterable`, ...).
#[derive(Debug, Clone, Default)]
pub struct ClassPath {
    classes: HashMap<String, ClassInfo>,
}

impl ClassPath {
    /// An empty class path.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut class_path = Self::new();
        for class in builtins::builtin_classes() {
            class_path.add(class);
        }
        class_path
    }

    /// Add or replace a class.
    pub fn add(&mut self, class: ClassInfo) -> &mut Self {
        self.classes.insert(class.name.clone(), class);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }
}

impl SymbolResolver for ClassPath {
    fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    fn resolve_class_name(&self, name: &str) -> Option<String> {
        if self.classes.contains_key(name) {
            return Some(name.to_string());
        }

        // `Outer.Inner` as written in source is `Outer$Inner` in binary form.
        let mut candidate = name.to_string();
        while let Some(dot) = candidate.rfind('.') {
            candidate.replace_range(dot..dot + 1, "$");
            if self.classes.contains_key(&candidate) {
                return Some(candidate);
            }
        }

        if !name.contains('.') {
            let implicit = format!("java.lang.{}", name);
            if self.classes.contains_key(&implicit) {
                return Some(implicit);
            }
        }

        let binary = name.replace('.', "$");
        let mut matches: Vec<&String> = self
            .classes
            .keys()
            .filter(|key| simple_name(key) == simple_name(name))
            .filter(|key| {
                key.strip_suffix(binary.as_str())
                    .is_some_and(|prefix| prefix.ends_with(['.', '$']))
            })
            .collect();
        matches.sort();
        matches.first().map(|name| (*name).clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JavaType;

    #[test]
    fn test_builtins_present() {
        let class_path = ClassPath::with_builtins();
        for name in [
            "java.lang.Object",
            "java.lang.String",
            "java.lang.Integer",
            "java.lang.Character",
            "java.util.ArrayList",
            "java.lang.RuntimeException",
        ] {
            assert!(class_path.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_resolve_class_names() {
        let mut class_path = ClassPath::with_builtins();
        class_path.add(ClassInfo::new("com.example.Outer"));
        class_path.add(ClassInfo::new("com.example.Outer$Inner").inner_of("com.example.Outer"));

        assert_eq!(
            class_path.resolve_class_name("String").as_deref(),
            Some("java.lang.String")
        );
        assert_eq!(
            class_path.resolve_class_name("java.util.List").as_deref(),
            Some("java.util.List")
        );
        assert_eq!(
            class_path.resolve_class_name("Outer").as_deref(),
            Some("com.example.Outer")
        );
        assert_eq!(
            class_path.resolve_class_name("Outer.Inner").as_deref(),
            Some("com.example.Outer$Inner")
        );
        assert_eq!(
            class_path
                .resolve_class_name("com.example.Outer.Inner")
                .as_deref(),
            Some("com.example.Outer$Inner")
        );
        assert_eq!(class_path.resolve_class_name("Nope"), None);
    }

    #[test]
    fn test_wrapper_factories_declared() {
        let class_path = ClassPath::with_builtins();
        let methods = class_path.find_methods("java.lang.Integer", "valueOf");
        assert!(methods.iter().any(|m| m.params == vec![JavaType::int()] && m.is_static));
    }
}
