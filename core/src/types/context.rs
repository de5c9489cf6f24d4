//! Static description of the suspended frame a fragment is compiled against.

use super::JavaType;

/// How sure the debugger is that a local is visible at the stopped location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// The local is live at the current bytecode index.
    #[default]
    Certain,
    /// The local may be out of scope or optimized away (e.g. missing debug
    /// info); resolution falls back to a same-named field when reading fails.
    Uncertain,
}

/// A local variable or parameter of some frame of the debuggee.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalVariable {
    pub name: String,
    pub ty: JavaType,
    /// Class whose method declares the local. `None` means the context class.
    ///
    /// A local declared by an enclosing class's method is only reachable when
    /// the context class captured it.
    pub declaring_class: Option<String>,
    pub availability: Availability,
}

impl LocalVariable {
    pub fn new(name: impl Into<String>, ty: JavaType) -> Self {
        Self {
            name: name.into(),
            ty,
            declaring_class: None,
            availability: Availability::Certain,
        }
    }

    pub fn declared_in(mut self, class: impl Into<String>) -> Self {
        self.declaring_class = Some(class.into());
        self
    }

    pub fn uncertain(mut self) -> Self {
        self.availability = Availability::Uncertain;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileContext {
    /// Class of the method the debuggee is stopped in.
    pub context_class: Option<String>,
    /// Whether that method is static (no `this`).
    pub is_static: bool,
    pub locals: Vec<LocalVariable>,
    /// Values the debugger injects by name before evaluation.
    pub labels: Vec<(String, JavaType)>,
}

impl CompileContext {
    /// A context with no class, as when evaluating detached from any frame.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_class(class: impl Into<String>) -> Self {
        Self {
            context_class: Some(class.into()),
            ..Self::default()
        }
    }

    pub fn in_static_method(class: impl Into<String>) -> Self {
        Self {
            is_static: true,
            ..Self::in_class(class)
        }
    }

    pub fn local(mut self, name: &str, ty: JavaType) -> Self {
        self.locals.push(LocalVariable::new(name, ty));
        self
    }

    pub fn with_local(mut self, local: LocalVariable) -> Self {
        self.locals.push(local);
        self
    }

    pub fn label(mut self, name: &str, ty: JavaType) -> Self {
        self.labels.push((name.to_string(), ty));
        self
    }

    pub fn find_local(&self, name: &str) -> Option<&LocalVariable> {
        self.locals.iter().rev().find(|local| local.name == name)
    }

    pub fn find_label(&self, name: &str) -> Option<&JavaType> {
        self.labels
            .iter()
            .rev()
            .find(|(label, _)| label == name)
            .map(|(_, ty)| ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_locals_shadow_earlier_ones() {
        let context = CompileContext::in_class("com.example.Main")
            .local("x", JavaType::int())
            .local("x", JavaType::long());
        assert_eq!(context.find_local("x").map(|l| &l.ty), Some(&JavaType::long()));
        assert!(context.find_local("y").is_none());
    }
}
