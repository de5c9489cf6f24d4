mod parsed_expr;
pub mod parser;
mod syntax;
pub mod error;

// Re-export the parser and rule enum for external use
pub use parser::JavaParser;
pub use parser::Rule;
pub use parser::{DEFAULT_MAX_DEPTH, parse, parse_with_max_depth};

pub use parsed_expr::{
    CatchClause, Declarator, Expr, Fragment, Literal, ParsedFragment, Stmt, TypeExpr,
};
pub use syntax::AnnotatedSource;
pub use syntax::{BinaryOp, BoolOp, ComparisonOp, IncrementOp, Span, UnaryOp};
pub use error::{ParseError, ParseErrorKind};

#[cfg(test)]
mod parse_test;
