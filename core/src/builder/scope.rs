//! Static scopes and jump targets tracked while building.
//!
//! Scope frames live in an arena and point at their parent by index, so
//! entering and leaving a block is a push and a pop of the current index.

use crate::types::JavaType;
use crate::values::Value;

pub(super) type ScopeId = usize;

#[derive(Debug)]
struct ScopeFrame {
    parent: Option<ScopeId>,
    variables: Vec<(String, JavaType)>,
}

/// Variables declared by the fragment, one frame per block, loop header and
/// catch clause.
#[derive(Debug)]
pub(super) struct ScopeArena {
    frames: Vec<ScopeFrame>,
    current: ScopeId,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame {
                parent: None,
                variables: Vec::new(),
            }],
            current: 0,
        }
    }

    /// Open a frame nested in the current one.
    pub fn enter(&mut self) -> ScopeId {
        let id = self.frames.len();
        self.frames.push(ScopeFrame {
            parent: Some(self.current),
            variables: Vec::new(),
        });
        self.current = id;
        id
    }

    /// Close the current frame and return the variables it declared with
    /// their default values, for the runtime scope.
    pub fn leave(&mut self) -> Vec<(String, Value)> {
        let frame = &self.frames[self.current];
        let defaults = frame
            .variables
            .iter()
            .map(|(name, ty)| (name.clone(), ty.default_value()))
            .collect();
        self.current = frame.parent.unwrap_or(0);
        defaults
    }

    /// Declare `name` in the current frame. Fails if any enclosing frame of
    /// the fragment already declares it.
    pub fn declare(&mut self, name: &str, ty: JavaType) -> Result<(), ()> {
        if self.lookup(name).is_some() {
            return Err(());
        }
        self.frames[self.current]
            .variables
            .push((name.to_string(), ty));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&JavaType> {
        let mut id = Some(self.current);
        while let Some(current) = id {
            let frame = &self.frames[current];
            if let Some((_, ty)) = frame.variables.iter().find(|(n, _)| n == name) {
                return Some(ty);
            }
            id = frame.parent;
        }
        None
    }

    /// Defaults of the root frame, for the fragment's outermost block.
    pub fn root_defaults(&self) -> Vec<(String, Value)> {
        self.frames[0]
            .variables
            .iter()
            .map(|(name, ty)| (name.clone(), ty.default_value()))
            .collect()
    }
}

/// A statement `break`/`continue` may target.
#[derive(Debug, Clone)]
pub(super) struct JumpTarget {
    pub label: Option<String>,
    pub is_loop: bool,
}

#[derive(Debug, Default)]
pub(super) struct JumpTargets {
    stack: Vec<JumpTarget>,
}

impl JumpTargets {
    pub fn push(&mut self, target: JumpTarget) {
        self.stack.push(target);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.stack.iter().any(|t| t.label.as_deref() == Some(label))
    }

    pub fn in_loop(&self) -> bool {
        self.stack.iter().any(|t| t.is_loop)
    }

    /// The innermost target carrying `label`.
    pub fn find(&self, label: &str) -> Option<&JumpTarget> {
        self.stack
            .iter()
            .rev()
            .find(|t| t.label.as_deref() == Some(label))
    }
}
