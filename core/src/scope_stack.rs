//! Chained scopes for variables declared inside an evaluated fragment.
//!
//! Every block, loop and catch clause that declares variables gets its own
//! [`Scope`]. Names are declared when the scope is pushed, with the default
//! value of their type, so reading a variable before its first assignment
//! yields that default instead of failing:
//! ```java
//! int total; for (int i = 0; i < 3; i++) total += i; total
//! ```

use hashbrown::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
struct Binding<T> {
    value: T,
    has_been_set: bool,
}

/// One lexical scope: name → (value, has been set).
#[derive(Debug, Clone, PartialEq)]
pub struct Scope<T> {
    bindings: HashMap<String, Binding<T>>,
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope declaring `names`, each pre-seeded with its initial value.
    pub fn with_defaults<I>(names: I) -> Result<Self, DuplicateError>
    where
        I: IntoIterator<Item = (String, T)>,
    {
        let mut scope = Self::new();
        for (name, value) in names {
            scope.declare(name, value)?;
        }
        Ok(scope)
    }

    /// Declare `name` with an initial value that does not count as set.
    pub fn declare(&mut self, name: impl Into<String>, initial: T) -> Result<(), DuplicateError> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(DuplicateError(name));
        }
        self.bindings.insert(
            name,
            Binding {
                value: initial,
                has_been_set: false,
            },
        );
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.bindings.get(name).map(|binding| &binding.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    fn set(&mut self, name: &str, value: T) {
        match self.bindings.get_mut(name) {
            Some(binding) => {
                binding.value = value;
                binding.has_been_set = true;
            }
            None => {
                self.bindings.insert(
                    name.to_string(),
                    Binding {
                        value,
                        has_been_set: true,
                    },
                );
            }
        }
    }
}

/// Scopes searched from innermost to outermost.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStack<T> {
    scopes: Vec<Scope<T>>,
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self { scopes: Vec::new() }
    }
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope<T>) {
        self.scopes.push(scope);
    }

    /// Pop the innermost scope and return it.
    pub fn pop(&mut self) -> Result<Scope<T>, PopError> {
        self.scopes.pop().ok_or(PopError::EmptyStack)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.lookup(name))
    }

    /// Whether the nearest binding of `name` has been assigned since it was
    /// declared. `None` if no scope declares it.
    pub fn has_been_set(&self, name: &str) -> Option<bool> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
            .map(|binding| binding.has_been_set)
    }

    /// Write `value` to the nearest scope declaring `name`, or declare it in
    /// the innermost scope if none does.
    pub fn assign(&mut self, name: &str, value: T) -> Result<(), BindError> {
        if let Some(scope) = self.scopes.iter_mut().rev().find(|s| s.contains(name)) {
            scope.set(name, value);
            return Ok(());
        }
        self.scopes
            .last_mut()
            .ok_or(BindError::NoScope)?
            .set(name, value);
        Ok(())
    }

    /// Declare `name` in the innermost scope.
    pub fn declare_in_current(&mut self, name: &str, initial: T) -> Result<(), BindError> {
        self.scopes
            .last_mut()
            .ok_or(BindError::NoScope)?
            .declare(name, initial)
            .map_err(|DuplicateError(name)| BindError::AlreadyDeclared(name))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("no scope to bind in")]
    NoScope,
    #[error("name '{0}' already declared in current scope")]
    AlreadyDeclared(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PopError {
    #[error("cannot pop from empty scope stack")]
    EmptyStack,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("duplicate name '{0}' in scope")]
pub struct DuplicateError(pub String);
