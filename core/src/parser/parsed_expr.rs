use crate::parser::{
    BinaryOp, BoolOp, ComparisonOp, IncrementOp, Span, UnaryOp, syntax::AnnotatedSource,
};
use crate::types::PrimitiveKind;

/// A parsed code fragment together with the source spans of its nodes.
#[derive(Debug)]
pub struct ParsedFragment<'a> {
    pub fragment: &'a Fragment<'a>,
    pub ann: &'a AnnotatedSource<'a, Expr<'a>>,
    pub stmt_ann: &'a AnnotatedSource<'a, Stmt<'a>>,
}

impl<'a> ParsedFragment<'a> {
    pub fn source(&self) -> &'a str {
        self.ann.source
    }

    pub fn span_of(&self, expr: &Expr<'a>) -> Span {
        self.ann.span_of(expr).unwrap_or_default()
    }

    pub fn stmt_span(&self, stmt: &Stmt<'a>) -> Span {
        self.stmt_ann.span_of(stmt).unwrap_or_default()
    }

    /// The fragment's only expression, when it has no statements.
    pub fn as_expression(&self) -> Option<&'a Expr<'a>> {
        match self.fragment.statements {
            [] => self.fragment.result,
            _ => None,
        }
    }
}

/// Statements followed by an optional trailing expression without `;`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<'a> {
    pub statements: &'a [&'a Stmt<'a>],
    pub result: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt<'a> {
    Expr(&'a Expr<'a>),
    LocalVar {
        ty: &'a TypeExpr<'a>,
        declarators: &'a [Declarator<'a>],
    },
    Block(&'a [&'a Stmt<'a>]),
    If {
        cond: &'a Expr<'a>,
        then_branch: &'a Stmt<'a>,
        else_branch: Option<&'a Stmt<'a>>,
    },
    While {
        cond: &'a Expr<'a>,
        body: &'a Stmt<'a>,
    },
    DoWhile {
        body: &'a Stmt<'a>,
        cond: &'a Expr<'a>,
    },
    For {
        init: &'a [&'a Stmt<'a>],
        cond: Option<&'a Expr<'a>>,
        update: &'a [&'a Expr<'a>],
        body: &'a Stmt<'a>,
    },
    ForEach {
        ty: &'a TypeExpr<'a>,
        name: &'a str,
        iterable: &'a Expr<'a>,
        body: &'a Stmt<'a>,
    },
    Labeled {
        label: &'a str,
        body: &'a Stmt<'a>,
    },
    Break(Option<&'a str>),
    Continue(Option<&'a str>),
    Return(Option<&'a Expr<'a>>),
    Throw(&'a Expr<'a>),
    Try {
        has_resources: bool,
        body: &'a [&'a Stmt<'a>],
        catches: &'a [CatchClause<'a>],
        finally: Option<&'a [&'a Stmt<'a>]>,
    },
    Empty,
    Switch,
    Synchronized,
    LocalClass(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declarator<'a> {
    pub name: &'a str,
    /// C-style brackets after the name: `int a[]`.
    pub dims: usize,
    pub init: Option<&'a Expr<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause<'a> {
    /// One entry per alternative of a multi-catch.
    pub types: &'a [TypeExpr<'a>],
    pub name: &'a str,
    pub body: &'a [&'a Stmt<'a>],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr<'a> {
    Literal(Literal<'a>),
    Ident(&'a str),
    /// `this`, or `Outer.this` with the qualifier as written.
    This(Option<&'a str>),
    /// `super`; only valid as the target of a field access or call.
    Super,
    Field {
        target: &'a Expr<'a>,
        name: &'a str,
    },
    Call {
        target: Option<&'a Expr<'a>>,
        name: &'a str,
        args: &'a [&'a Expr<'a>],
    },
    New {
        /// Enclosing instance of `outer.new Inner()`.
        outer: Option<&'a Expr<'a>>,
        class: &'a TypeExpr<'a>,
        args: &'a [&'a Expr<'a>],
        has_body: bool,
    },
    NewArray {
        /// The array type being created (`int[]` for `new int[3]`).
        ty: &'a TypeExpr<'a>,
        dims: &'a [&'a Expr<'a>],
        init: Option<&'a Expr<'a>>,
    },
    ArrayInit(&'a [&'a Expr<'a>]),
    Index {
        target: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        operand: &'a Expr<'a>,
    },
    Increment {
        op: IncrementOp,
        prefix: bool,
        target: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Boolean {
        op: BoolOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Comparison {
        op: ComparisonOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Conditional {
        cond: &'a Expr<'a>,
        then_branch: &'a Expr<'a>,
        else_branch: &'a Expr<'a>,
    },
    /// `target = value`, or a compound assignment when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
    },
    Cast {
        ty: &'a TypeExpr<'a>,
        expr: &'a Expr<'a>,
    },
    InstanceOf {
        expr: &'a Expr<'a>,
        ty: &'a TypeExpr<'a>,
        binding: Option<&'a str>,
    },
    ClassLiteral(&'a TypeExpr<'a>),
    Lambda,
    MethodRef {
        target: &'a Expr<'a>,
        name: &'a str,
    },
}

impl<'a> Expr<'a> {
    pub fn as_ptr(&self) -> *const Self {
        self as *const _
    }

    /// The dotted name `a.b.c` this expression spells, if it is only
    /// identifiers and field selections.
    pub fn as_path(&self) -> Option<String> {
        match self {
            Expr::Ident(name) => Some(name.to_string()),
            Expr::Field { target, name } => {
                let mut path = target.as_path()?;
                path.push('.');
                path.push_str(name);
                Some(path)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal<'a> {
    /// An `int` literal. Decimal literals reach `2^31` so that
    /// `-2147483648` can be folded; anything else out of range is rejected
    /// when compiled.
    Int(i64),
    Long(i128),
    Float(f32),
    Double(f64),
    Char(u16),
    Str(&'a str),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr<'a> {
    Primitive(PrimitiveKind),
    Void,
    /// A class name as written (`String`, `java.util.List`, `Outer.Inner`).
    Named(&'a str),
    Array(&'a TypeExpr<'a>),
}

impl<'a> TypeExpr<'a> {
    /// Number of array dimensions.
    pub fn rank(&self) -> usize {
        match self {
            TypeExpr::Array(element) => 1 + element.rank(),
            _ => 0,
        }
    }
}

impl core::fmt::Display for TypeExpr<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TypeExpr::Primitive(kind) => write!(f, "{}", kind),
            TypeExpr::Void => write!(f, "void"),
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Array(element) => write!(f, "{}[]", element),
        }
    }
}
