//! The evaluator tree produced by the builder.
//!
//! Nodes are immutable once built. Everything an evaluation changes (fragment
//! locals, compound-assignment slots, pinned references) lives in the
//! [`ExecutionContext`](super::ExecutionContext), so one tree can be evaluated
//! any number of times against different frames.

use crate::parser::{BinaryOp, ComparisonOp, IncrementOp, Span, UnaryOp};
use crate::types::{FieldInfo, JavaType, MethodInfo, PrimitiveKind};
use crate::values::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorNode {
    pub kind: NodeKind,
    pub span: Span,
}

impl EvaluatorNode {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Whether evaluating this node can produce a settable location.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::LocalVariableRef(_)
                | NodeKind::FieldRef { .. }
                | NodeKind::ArrayAccess { .. }
                | NodeKind::Fallback { .. }
        )
    }

    /// Visit this node and every node below it, parents first.
    pub fn walk(&self, f: &mut dyn FnMut(&EvaluatorNode)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    fn children(&self) -> Vec<&EvaluatorNode> {
        let mut out: Vec<&EvaluatorNode> = Vec::new();
        match &self.kind {
            NodeKind::Literal(_)
            | NodeKind::LocalVariableRef(_)
            | NodeKind::ThisRef { .. }
            | NodeKind::SuperRef { .. }
            | NodeKind::TypeRef(_)
            | NodeKind::BreakContinue { .. }
            | NodeKind::LabeledValue(_)
            | NodeKind::Slot(_) => {}
            NodeKind::FieldRef { target, .. } => {
                if let FieldTarget::Instance(object) = target {
                    out.push(object);
                }
            }
            NodeKind::Fallback { field, .. } => out.extend(field.as_deref()),
            NodeKind::Assignment { target, value } => out.extend([&**target, &**value]),
            NodeKind::CompoundAssignment { target, operation }
            | NodeKind::PostfixOp {
                target, operation, ..
            } => out.extend([&**target, &**operation]),
            NodeKind::BinaryOp { left, right, .. } | NodeKind::Logical { left, right, .. } => {
                out.extend([&**left, &**right])
            }
            NodeKind::UnaryOp { operand, .. }
            | NodeKind::InstanceOf { operand, .. }
            | NodeKind::TypeCast { operand, .. }
            | NodeKind::Boxing { operand, .. }
            | NodeKind::Unboxing { operand, .. }
            | NodeKind::ArrayLength(operand)
            | NodeKind::Throw(operand) => out.push(operand),
            NodeKind::Conditional {
                cond,
                then_branch,
                else_branch,
            } => out.extend([&**cond, &**then_branch, &**else_branch]),
            NodeKind::NewArray { length, .. } => out.push(length),
            NodeKind::ArrayInitializer { elements, .. } | NodeKind::Block { statements: elements, .. } => {
                out.extend(elements.iter())
            }
            NodeKind::NewInstance { outer, args, .. } => {
                out.extend(outer.as_deref());
                out.extend(args.iter());
            }
            NodeKind::ArrayAccess { array, index } => out.extend([&**array, &**index]),
            NodeKind::MethodCall { receiver, args, .. } => {
                if let Receiver::Instance(object) = receiver {
                    out.push(object);
                }
                out.extend(args.iter());
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.extend([&**cond, &**then_branch]);
                out.extend(else_branch.as_deref());
            }
            NodeKind::While { cond, body, .. } | NodeKind::DoWhile { body, cond, .. } => {
                out.extend([&**cond, &**body])
            }
            NodeKind::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                out.extend(init.iter());
                out.extend(cond.as_deref());
                out.extend(update.iter());
                out.push(body);
            }
            NodeKind::ForEach {
                iterable,
                element,
                body,
                ..
            } => out.extend([&**iterable, &**element, &**body]),
            NodeKind::Return(value) => out.extend(value.as_deref()),
            NodeKind::Try {
                body,
                catches,
                finally,
            } => {
                out.push(body);
                out.extend(catches.iter().map(|c| &c.body));
                out.extend(finally.as_deref());
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// A primitive or `null`.
    Value(Value),
    /// A string literal, mirrored into the debuggee when evaluated.
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalRef {
    /// A variable declared by the fragment itself.
    Scoped(String),
    /// A local variable or parameter of the suspended frame.
    Frame(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldTarget {
    Static,
    Instance(Box<EvaluatorNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Receiver {
    Static,
    Instance(Box<EvaluatorNode>),
}

/// Operand-typed operation selected at build time. Operands have already been
/// coerced to `kind`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOperation {
    /// `+ - * / %` and `& | ^` on integral, floating or boolean operands.
    Arithmetic { op: BinaryOp, kind: PrimitiveKind },
    /// Shifts; the left operand is `kind`, the right one is `int` or `long`.
    Shift { op: BinaryOp, kind: PrimitiveKind },
    Compare { op: ComparisonOp, kind: PrimitiveKind },
    /// `==`/`!=` between references: identity, never unboxed.
    ReferenceEquality { negated: bool },
    /// String `+`.
    Concat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CastTarget {
    Primitive(PrimitiveKind),
    /// Checked reference conversion.
    Reference(JavaType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jump {
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchNode {
    /// One entry per alternative of a multi-catch.
    pub types: Vec<JavaType>,
    pub variable: String,
    pub body: EvaluatorNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal(Constant),
    LocalVariableRef(LocalRef),
    FieldRef {
        target: FieldTarget,
        field: FieldInfo,
    },
    /// `this`, reached through `hops` enclosing-instance fields.
    ThisRef {
        hops: Vec<FieldInfo>,
    },
    /// `super` as a call receiver; evaluates like `this`.
    SuperRef {
        hops: Vec<FieldInfo>,
    },
    /// The `Class` object of a type (class literals).
    TypeRef(JavaType),
    Assignment {
        target: Box<EvaluatorNode>,
        value: Box<EvaluatorNode>,
    },
    /// `target op= value` and prefix `++`/`--`. `operation` reads the current
    /// value of the target through a [`NodeKind::Slot`].
    CompoundAssignment {
        target: Box<EvaluatorNode>,
        operation: Box<EvaluatorNode>,
    },
    BinaryOp {
        operation: BinaryOperation,
        left: Box<EvaluatorNode>,
        right: Box<EvaluatorNode>,
    },
    /// Short-circuit `&&` and `||`.
    Logical {
        op: LogicalOp,
        left: Box<EvaluatorNode>,
        right: Box<EvaluatorNode>,
    },
    UnaryOp {
        op: UnaryOp,
        kind: PrimitiveKind,
        operand: Box<EvaluatorNode>,
    },
    Conditional {
        cond: Box<EvaluatorNode>,
        then_branch: Box<EvaluatorNode>,
        else_branch: Box<EvaluatorNode>,
    },
    InstanceOf {
        operand: Box<EvaluatorNode>,
        ty: JavaType,
    },
    TypeCast {
        operand: Box<EvaluatorNode>,
        target: CastTarget,
    },
    Boxing {
        operand: Box<EvaluatorNode>,
        kind: PrimitiveKind,
    },
    Unboxing {
        operand: Box<EvaluatorNode>,
        kind: PrimitiveKind,
    },
    NewArray {
        element: JavaType,
        length: Box<EvaluatorNode>,
    },
    ArrayInitializer {
        element: JavaType,
        elements: Vec<EvaluatorNode>,
    },
    NewInstance {
        constructor: MethodInfo,
        /// Enclosing instance of an inner class.
        outer: Option<Box<EvaluatorNode>>,
        args: Vec<EvaluatorNode>,
    },
    ArrayAccess {
        array: Box<EvaluatorNode>,
        index: Box<EvaluatorNode>,
    },
    ArrayLength(Box<EvaluatorNode>),
    MethodCall {
        receiver: Receiver,
        method: MethodInfo,
        args: Vec<EvaluatorNode>,
        /// Run the implementation of `method.declaring_class` (`super.m()`).
        nonvirtual: bool,
    },
    /// Statements in a new scope declaring `scope` with initial values. The
    /// value is that of the last statement executed.
    Block {
        label: Option<String>,
        scope: Vec<(String, Value)>,
        statements: Vec<EvaluatorNode>,
    },
    If {
        cond: Box<EvaluatorNode>,
        then_branch: Box<EvaluatorNode>,
        else_branch: Option<Box<EvaluatorNode>>,
    },
    While {
        label: Option<String>,
        cond: Box<EvaluatorNode>,
        body: Box<EvaluatorNode>,
    },
    DoWhile {
        label: Option<String>,
        body: Box<EvaluatorNode>,
        cond: Box<EvaluatorNode>,
    },
    For {
        label: Option<String>,
        scope: Vec<(String, Value)>,
        init: Vec<EvaluatorNode>,
        cond: Option<Box<EvaluatorNode>>,
        update: Vec<EvaluatorNode>,
        body: Box<EvaluatorNode>,
    },
    /// Enhanced `for` over an array or an `Iterable`. `element` converts the
    /// raw element, read through a [`NodeKind::Slot`], to the variable's type.
    ForEach {
        label: Option<String>,
        variable: String,
        iterable: Box<EvaluatorNode>,
        element: Box<EvaluatorNode>,
        body: Box<EvaluatorNode>,
    },
    Return(Option<Box<EvaluatorNode>>),
    Throw(Box<EvaluatorNode>),
    Try {
        body: Box<EvaluatorNode>,
        catches: Vec<CatchNode>,
        finally: Option<Box<EvaluatorNode>>,
    },
    BreakContinue {
        jump: Jump,
        label: Option<String>,
    },
    /// `target++` / `target--`: writes `operation` and yields the old value.
    PostfixOp {
        op: IncrementOp,
        target: Box<EvaluatorNode>,
        operation: Box<EvaluatorNode>,
    },
    /// A value injected by the debugger under a name.
    LabeledValue(String),
    /// A local the debugger may not be able to read; if reading it fails, the
    /// same-named field is used instead.
    Fallback {
        name: String,
        field: Option<Box<EvaluatorNode>>,
    },
    /// Value stored by the enclosing compound assignment, postfix operation or
    /// enhanced `for` at nesting level `n`. Slots are only live while the
    /// conversion that reads them runs, never across a loop body.
    Slot(usize),
}
