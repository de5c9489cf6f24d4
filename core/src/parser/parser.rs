use core::cell::Cell;

use bumpalo::Bump;
use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;

use crate::parser::error::convert_pest_error;
use crate::parser::{
    AnnotatedSource, BinaryOp, BoolOp, CatchClause, ComparisonOp, Declarator, Expr, Fragment,
    IncrementOp, Literal, ParseError, ParseErrorKind, ParsedFragment, Span, Stmt, TypeExpr,
    UnaryOp,
};
use crate::types::PrimitiveKind;

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        // (lowest precedence)
        .op(Op::infix(Rule::assign_op, Assoc::Right))      // `=`, `+=`, ...
        .op(Op::infix(Rule::ternary_op, Assoc::Right))     // `? :`
        .op(Op::infix(Rule::or_op, Assoc::Left))           // `||`
        .op(Op::infix(Rule::and_op, Assoc::Left))          // `&&`
        .op(Op::infix(Rule::bit_or, Assoc::Left))          // `|`
        .op(Op::infix(Rule::bit_xor, Assoc::Left))         // `^`
        .op(Op::infix(Rule::bit_and, Assoc::Left))         // `&`
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left)
        )                                                  // `==`, `!=`
        .op(
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left) |
            Op::postfix(Rule::instanceof_op)
        )                                                  // `<`, `>`, `<=`, `>=`, `instanceof`
        .op(
            Op::infix(Rule::shl, Assoc::Left) |
            Op::infix(Rule::shr, Assoc::Left) |
            Op::infix(Rule::ushr, Assoc::Left)
        )                                                  // `<<`, `>>`, `>>>`
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                  // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::rem, Assoc::Left)
        )                                                  // `*`, `/`, `%`
        .op(
            Op::prefix(Rule::cast_op) |
            Op::prefix(Rule::pre_inc) |
            Op::prefix(Rule::pre_dec) |
            Op::prefix(Rule::plus) |
            Op::prefix(Rule::minus) |
            Op::prefix(Rule::not) |
            Op::prefix(Rule::bit_not)
        )                                                  // `(T)`, `++`, `--`, `+`, `-`, `!`, `~`

        // Postfix operators.
        .op(
            Op::postfix(Rule::post_inc) |
            Op::postfix(Rule::post_dec) |
            Op::postfix(Rule::index_op) |
            Op::postfix(Rule::call_op) |
            Op::postfix(Rule::field_op) |
            Op::postfix(Rule::qualified_new_op) |
            Op::postfix(Rule::method_ref_op)
        )                                                  // `++`, `--`, `[]`, `.m()`, `.f`, `.new`, `::`
        // (highest precedence)
        ;
}

#[derive(Parser)]
#[grammar = "parser/java.pest"]
pub struct JavaParser;

/// Nesting limit used by [`parse`].
pub const DEFAULT_MAX_DEPTH: usize = 500;

pub fn parse<'a>(arena: &'a Bump, source: &'a str) -> Result<ParsedFragment<'a>, ParseError> {
    parse_with_max_depth(arena, source, DEFAULT_MAX_DEPTH)
}

/// Parse a code fragment, failing if brackets or expressions nest deeper than
/// `max_depth`.
pub fn parse_with_max_depth<'a>(
    arena: &'a Bump,
    source: &'a str,
    max_depth: usize,
) -> Result<ParsedFragment<'a>, ParseError> {
    check_bracket_depth(source, max_depth)?;

    let mut pairs =
        JavaParser::parse(Rule::fragment, source).map_err(|e| convert_pest_error(e, source))?;
    let pair = pairs.next().ok_or_else(|| {
        ParseError::new(
            ParseErrorKind::Other {
                message: "empty parse result".to_string(),
            },
            Span(0..source.len()),
        )
    })?;

    let builder = TreeBuilder {
        arena,
        ann: arena.alloc(AnnotatedSource::new(arena, source)),
        stmt_ann: arena.alloc(AnnotatedSource::new(arena, source)),
        depth: Cell::new(0),
        max_depth,
    };
    let fragment = builder.fragment(pair)?;
    Ok(ParsedFragment {
        fragment: arena.alloc(fragment),
        ann: builder.ann,
        stmt_ann: builder.stmt_ann,
    })
}

/// Reject pathological bracket nesting before pest recurses into it.
fn check_bracket_depth(source: &str, max_depth: usize) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, c) in source.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' | '{' => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::new(
                        ParseErrorKind::MaxDepthExceeded { depth, max_depth },
                        Span(offset..offset + 1),
                    ));
                }
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

type ParseResult<T> = Result<T, ParseError>;

/// Turns pest pairs into the arena tree, recording spans as it goes.
struct TreeBuilder<'a> {
    arena: &'a Bump,
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
    stmt_ann: &'a AnnotatedSource<'a, Stmt<'a>>,
    depth: Cell<usize>,
    max_depth: usize,
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_abstract
            | Rule::kw_break
            | Rule::kw_catch
            | Rule::kw_class
            | Rule::kw_continue
            | Rule::kw_do
            | Rule::kw_else
            | Rule::kw_enum
            | Rule::kw_extends
            | Rule::kw_final
            | Rule::kw_finally
            | Rule::kw_for
            | Rule::kw_if
            | Rule::kw_instanceof
            | Rule::kw_interface
            | Rule::kw_new
            | Rule::kw_return
            | Rule::kw_static
            | Rule::kw_super
            | Rule::kw_switch
            | Rule::kw_synchronized
            | Rule::kw_this
            | Rule::kw_throw
            | Rule::kw_try
            | Rule::kw_void
            | Rule::kw_while
    )
}

/// Children of `pair` without keyword tokens.
fn significant<'a>(pair: Pair<'a, Rule>) -> impl Iterator<Item = Pair<'a, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn malformed(pair: &Pair<'_, Rule>) -> ParseError {
    ParseError::new(
        ParseErrorKind::Other {
            message: format!("malformed {:?}", pair.as_rule()),
        },
        pair.as_span().into(),
    )
}

fn next_child<'a>(
    children: &mut impl Iterator<Item = Pair<'a, Rule>>,
    parent: &Pair<'a, Rule>,
) -> ParseResult<Pair<'a, Rule>> {
    children.next().ok_or_else(|| malformed(parent))
}

fn primitive_kind(pair: &Pair<'_, Rule>) -> ParseResult<PrimitiveKind> {
    PrimitiveKind::from_name(pair.as_str()).ok_or_else(|| malformed(pair))
}

fn dims_count(pair: &Pair<'_, Rule>) -> usize {
    pair.as_str().matches('[').count()
}

impl<'a> TreeBuilder<'a> {
    fn expr(&self, kind: Expr<'a>, span: Span) -> &'a Expr<'a> {
        let expr = self.arena.alloc(kind);
        self.ann.add_span(expr, span);
        expr
    }

    fn stmt(&self, kind: Stmt<'a>, span: Span) -> &'a Stmt<'a> {
        let stmt = self.arena.alloc(kind);
        self.stmt_ann.add_span(stmt, span);
        stmt
    }

    fn alloc_type(&self, ty: TypeExpr<'a>) -> &'a TypeExpr<'a> {
        self.arena.alloc(ty)
    }

    fn slice<T: Copy>(&self, items: &[T]) -> &'a [T] {
        self.arena.alloc_slice_copy(items)
    }

    fn span_of(&self, expr: &Expr<'a>) -> Span {
        self.ann.span_of(expr).unwrap_or_default()
    }

    /// Whether only whitespace separates the prefix operator `op` from `operand`.
    fn directly_follows(&self, op: &Pair<'a, Rule>, operand: &Expr<'a>) -> bool {
        let start = op.as_span().end();
        let end = self.span_of(operand).0.start;
        self.ann
            .source
            .get(start..end)
            .is_some_and(|gap| gap.chars().all(char::is_whitespace))
    }

    fn nested<T>(&self, span: &Span, f: impl FnOnce() -> ParseResult<T>) -> ParseResult<T> {
        let depth = self.depth.get() + 1;
        if depth > self.max_depth {
            return Err(ParseError::new(
                ParseErrorKind::MaxDepthExceeded {
                    depth,
                    max_depth: self.max_depth,
                },
                span.clone(),
            ));
        }
        self.depth.set(depth);
        let result = f();
        self.depth.set(depth - 1);
        result
    }

    fn fragment(&self, pair: Pair<'a, Rule>) -> ParseResult<Fragment<'a>> {
        let mut statements = Vec::new();
        let mut result = None;
        for child in pair.into_inner() {
            match child.as_rule() {
                Rule::expression => result = Some(self.expression(child)?),
                Rule::EOI => {}
                _ => statements.push(self.block_statement(child)?),
            }
        }
        Ok(Fragment {
            statements: self.slice(&statements),
            result,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expression(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a Expr<'a>> {
        let span = Span::from(pair.as_span());
        self.nested(&span, || {
            PRATT_PARSER
                .map_primary(|primary| self.primary(primary))
                .map_prefix(|op, rhs| self.prefix(op, rhs?))
                .map_infix(|lhs, op, rhs| self.infix(lhs?, op, rhs?))
                .map_postfix(|lhs, op| self.postfix(lhs?, op))
                .parse(pair.into_inner())
        })
    }

    fn expressions(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a [&'a Expr<'a>]> {
        let exprs = pair
            .into_inner()
            .map(|p| self.expression(p))
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(self.slice(&exprs))
    }

    fn prefix(&self, op: Pair<'a, Rule>, operand: &'a Expr<'a>) -> ParseResult<&'a Expr<'a>> {
        let span = Span::combine(&op.as_span().into(), &self.span_of(operand));
        let unary = |op| Expr::Unary { op, operand };
        let expr = match op.as_rule() {
            Rule::cast_op => {
                let mut children = op.clone().into_inner();
                let ty = next_child(&mut children, &op)?;
                let ty = match ty.as_rule() {
                    Rule::primitive_type => {
                        self.alloc_type(TypeExpr::Primitive(primitive_kind(&ty)?))
                    }
                    _ => self.type_expr(ty)?,
                };
                Expr::Cast { ty, expr: operand }
            }
            Rule::pre_inc => Expr::Increment {
                op: IncrementOp::Increment,
                prefix: true,
                target: operand,
            },
            Rule::pre_dec => Expr::Increment {
                op: IncrementOp::Decrement,
                prefix: true,
                target: operand,
            },
            Rule::plus => unary(UnaryOp::Plus),
            // `-2147483648` and `-9223372036854775808L` are only legal negated.
            // A parenthesized literal is not the operand of the minus token.
            Rule::minus if !self.directly_follows(&op, operand) => unary(UnaryOp::Neg),
            Rule::minus => match operand {
                Expr::Literal(Literal::Int(value)) if *value == 1 << 31 => {
                    Expr::Literal(Literal::Int(-value))
                }
                Expr::Literal(Literal::Long(value)) if *value == 1 << 63 => {
                    Expr::Literal(Literal::Long(-value))
                }
                _ => unary(UnaryOp::Neg),
            },
            Rule::not => unary(UnaryOp::Not),
            Rule::bit_not => unary(UnaryOp::BitNot),
            _ => return Err(malformed(&op)),
        };
        Ok(self.expr(expr, span))
    }

    fn infix(
        &self,
        left: &'a Expr<'a>,
        op: Pair<'a, Rule>,
        right: &'a Expr<'a>,
    ) -> ParseResult<&'a Expr<'a>> {
        let span = Span::combine(&self.span_of(left), &self.span_of(right));
        let binary = |op| Expr::Binary { op, left, right };
        let comparison = |op| Expr::Comparison { op, left, right };
        let expr = match op.as_rule() {
            Rule::assign_op => {
                let compound = match op.as_str() {
                    "=" => None,
                    "+=" => Some(BinaryOp::Add),
                    "-=" => Some(BinaryOp::Sub),
                    "*=" => Some(BinaryOp::Mul),
                    "/=" => Some(BinaryOp::Div),
                    "%=" => Some(BinaryOp::Rem),
                    "&=" => Some(BinaryOp::BitAnd),
                    "|=" => Some(BinaryOp::BitOr),
                    "^=" => Some(BinaryOp::BitXor),
                    "<<=" => Some(BinaryOp::Shl),
                    ">>=" => Some(BinaryOp::Shr),
                    ">>>=" => Some(BinaryOp::UShr),
                    _ => return Err(malformed(&op)),
                };
                Expr::Assign {
                    op: compound,
                    target: left,
                    value: right,
                }
            }
            Rule::ternary_op => {
                let mut children = op.clone().into_inner();
                let then_branch = self.expression(next_child(&mut children, &op)?)?;
                Expr::Conditional {
                    cond: left,
                    then_branch,
                    else_branch: right,
                }
            }
            Rule::or_op => Expr::Boolean {
                op: BoolOp::Or,
                left,
                right,
            },
            Rule::and_op => Expr::Boolean {
                op: BoolOp::And,
                left,
                right,
            },
            Rule::bit_or => binary(BinaryOp::BitOr),
            Rule::bit_xor => binary(BinaryOp::BitXor),
            Rule::bit_and => binary(BinaryOp::BitAnd),
            Rule::eq => comparison(ComparisonOp::Eq),
            Rule::ne => comparison(ComparisonOp::Neq),
            Rule::lt => comparison(ComparisonOp::Lt),
            Rule::gt => comparison(ComparisonOp::Gt),
            Rule::le => comparison(ComparisonOp::Le),
            Rule::ge => comparison(ComparisonOp::Ge),
            Rule::shl => binary(BinaryOp::Shl),
            Rule::shr => binary(BinaryOp::Shr),
            Rule::ushr => binary(BinaryOp::UShr),
            Rule::add => binary(BinaryOp::Add),
            Rule::sub => binary(BinaryOp::Sub),
            Rule::mul => binary(BinaryOp::Mul),
            Rule::div => binary(BinaryOp::Div),
            Rule::rem => binary(BinaryOp::Rem),
            _ => return Err(malformed(&op)),
        };
        Ok(self.expr(expr, span))
    }

    fn postfix(&self, target: &'a Expr<'a>, op: Pair<'a, Rule>) -> ParseResult<&'a Expr<'a>> {
        let span = Span::new(self.span_of(target).0.start, op.as_span().end());
        let expr = match op.as_rule() {
            Rule::post_inc => Expr::Increment {
                op: IncrementOp::Increment,
                prefix: false,
                target,
            },
            Rule::post_dec => Expr::Increment {
                op: IncrementOp::Decrement,
                prefix: false,
                target,
            },
            Rule::index_op => {
                let mut children = op.clone().into_inner();
                let index = self.expression(next_child(&mut children, &op)?)?;
                Expr::Index { target, index }
            }
            Rule::call_op => {
                let mut children = op.clone().into_inner().filter(|p| p.as_rule() != Rule::type_args);
                let name = next_child(&mut children, &op)?.as_str();
                let args = self.expressions(next_child(&mut children, &op)?)?;
                Expr::Call {
                    target: Some(target),
                    name,
                    args,
                }
            }
            Rule::field_op => {
                let mut children = op.clone().into_inner();
                let name = next_child(&mut children, &op)?.as_str();
                Expr::Field { target, name }
            }
            Rule::qualified_new_op => {
                let mut children = op.clone().into_inner();
                let new = next_child(&mut children, &op)?;
                return self.new_expression(new, Some(target), span);
            }
            Rule::method_ref_op => {
                let mut children = op.clone().into_inner();
                let name = next_child(&mut children, &op)?.as_str();
                Expr::MethodRef { target, name }
            }
            Rule::instanceof_op => {
                let mut ty = None;
                let mut binding = None;
                for child in significant(op.clone()) {
                    match child.as_rule() {
                        Rule::type_expr => ty = Some(self.type_expr(child)?),
                        Rule::identifier => binding = Some(child.as_str()),
                        _ => return Err(malformed(&child)),
                    }
                }
                Expr::InstanceOf {
                    expr: target,
                    ty: ty.ok_or_else(|| malformed(&op))?,
                    binding,
                }
            }
            _ => return Err(malformed(&op)),
        };
        Ok(self.expr(expr, span))
    }

    fn primary(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a Expr<'a>> {
        let span = Span::from(pair.as_span());
        let expr = match pair.as_rule() {
            Rule::lambda => Expr::Lambda,
            Rule::integer_literal => Expr::Literal(self.integer(&pair)?),
            Rule::float_literal => Expr::Literal(self.float(&pair)?),
            Rule::char_literal => Expr::Literal(self.char_literal(&pair)?),
            Rule::string_literal => {
                let text = pair.as_str();
                let units = unescape(&text[1..text.len() - 1], &span)?;
                let value = String::from_utf16_lossy(&units);
                Expr::Literal(Literal::Str(self.arena.alloc_str(&value)))
            }
            Rule::boolean_literal => Expr::Literal(Literal::Bool(pair.as_str() == "true")),
            Rule::null_literal => Expr::Literal(Literal::Null),
            Rule::class_literal => Expr::ClassLiteral(self.class_literal(pair)?),
            Rule::qualified_this => {
                let names: Vec<&str> = significant(pair).map(|p| p.as_str()).collect();
                Expr::This(Some(self.arena.alloc_str(&names.join("."))))
            }
            Rule::paren => {
                let mut children = pair.clone().into_inner();
                return self.expression(next_child(&mut children, &pair)?);
            }
            Rule::this_expr => Expr::This(None),
            Rule::super_expr => Expr::Super,
            Rule::new_expr => return self.new_expression(pair, None, span),
            Rule::method_call => {
                let mut children = pair.clone().into_inner();
                let name = next_child(&mut children, &pair)?.as_str();
                let args = self.expressions(next_child(&mut children, &pair)?)?;
                Expr::Call {
                    target: None,
                    name,
                    args,
                }
            }
            Rule::identifier => Expr::Ident(pair.as_str()),
            _ => return Err(malformed(&pair)),
        };
        Ok(self.expr(expr, span))
    }

    fn new_expression(
        &self,
        pair: Pair<'a, Rule>,
        outer: Option<&'a Expr<'a>>,
        span: Span,
    ) -> ParseResult<&'a Expr<'a>> {
        let mut base = None;
        let mut dims = Vec::new();
        let mut rank = 0;
        let mut is_array = false;
        let mut init = None;
        let mut args: &'a [&'a Expr<'a>] = &[];
        let mut has_body = false;

        for child in significant(pair.clone()) {
            match child.as_rule() {
                Rule::type_args => {}
                Rule::primitive_type => {
                    base = Some(TypeExpr::Primitive(primitive_kind(&child)?));
                }
                Rule::class_type => base = Some(TypeExpr::Named(self.class_name(child))),
                Rule::dim_exprs => {
                    is_array = true;
                    for dim in child.into_inner() {
                        match dim.as_rule() {
                            Rule::expression => {
                                dims.push(self.expression(dim)?);
                                rank += 1;
                            }
                            _ => rank += dims_count(&dim),
                        }
                    }
                }
                Rule::dims => {
                    is_array = true;
                    rank += dims_count(&child);
                }
                Rule::array_init => init = Some(self.array_init(child)?),
                Rule::arguments => args = self.expressions(child)?,
                Rule::class_body => has_body = true,
                _ => return Err(malformed(&child)),
            }
        }

        let mut ty = self.alloc_type(base.ok_or_else(|| malformed(&pair))?);
        let expr = if is_array {
            if outer.is_some() {
                return Err(malformed(&pair));
            }
            for _ in 0..rank {
                ty = self.alloc_type(TypeExpr::Array(ty));
            }
            Expr::NewArray {
                ty,
                dims: self.slice(&dims),
                init,
            }
        } else {
            Expr::New {
                outer,
                class: ty,
                args,
                has_body,
            }
        };
        Ok(self.expr(expr, span))
    }

    fn array_init(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a Expr<'a>> {
        let span = Span::from(pair.as_span());
        let elements = pair
            .into_inner()
            .map(|element| match element.as_rule() {
                Rule::array_init => self.array_init(element),
                _ => self.expression(element),
            })
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(self.expr(
            Expr::ArrayInit(self.slice(&elements)),
            span,
        ))
    }

    fn var_init(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a Expr<'a>> {
        match pair.as_rule() {
            Rule::array_init => self.array_init(pair),
            _ => self.expression(pair),
        }
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    fn integer(&self, pair: &Pair<'a, Rule>) -> ParseResult<Literal<'a>> {
        let text = pair.as_str();
        let invalid = |reason: &str| {
            ParseError::new(
                ParseErrorKind::InvalidNumber {
                    text: text.to_string(),
                    reason: reason.to_string(),
                },
                pair.as_span().into(),
            )
        };

        let (body, is_long) = match text.strip_suffix(['l', 'L']) {
            Some(body) => (body, true),
            None => (text, false),
        };
        let cleaned: String = body.chars().filter(|c| *c != '_').collect();
        let (radix, digits) = if let Some(hex) = cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
        {
            (16, hex)
        } else if let Some(bin) = cleaned
            .strip_prefix("0b")
            .or_else(|| cleaned.strip_prefix("0B"))
        {
            (2, bin)
        } else if cleaned.len() > 1 && cleaned.starts_with('0') {
            (8, &cleaned[1..])
        } else {
            (10, cleaned.as_str())
        };

        let value = u128::from_str_radix(digits, radix).map_err(|_| invalid("malformed digits"))?;
        let literal = match (is_long, radix) {
            (true, 10) if value <= 1 << 63 => Literal::Long(value as i128),
            (true, 10) => return Err(invalid("long number too large")),
            (true, _) => {
                let bits = u64::try_from(value).map_err(|_| invalid("long number too large"))?;
                Literal::Long(bits as i64 as i128)
            }
            (false, 10) if value <= 1 << 31 => Literal::Int(value as i64),
            (false, 10) => return Err(invalid("integer number too large")),
            (false, _) => {
                let bits = u32::try_from(value).map_err(|_| invalid("integer number too large"))?;
                Literal::Int(bits as i32 as i64)
            }
        };
        Ok(literal)
    }

    fn float(&self, pair: &Pair<'a, Rule>) -> ParseResult<Literal<'a>> {
        let text = pair.as_str();
        let invalid = |reason: &str| {
            ParseError::new(
                ParseErrorKind::InvalidNumber {
                    text: text.to_string(),
                    reason: reason.to_string(),
                },
                pair.as_span().into(),
            )
        };

        let cleaned: String = text.chars().filter(|c| *c != '_').collect();
        let (body, is_float) = match cleaned.strip_suffix(['f', 'F']) {
            Some(body) => (body, true),
            None => (cleaned.strip_suffix(['d', 'D']).unwrap_or(&cleaned), false),
        };
        if is_float {
            let value: f32 = body.parse().map_err(|_| invalid("malformed float"))?;
            if value.is_infinite() {
                return Err(invalid("floating-point number too large"));
            }
            Ok(Literal::Float(value))
        } else {
            let value: f64 = body.parse().map_err(|_| invalid("malformed double"))?;
            if value.is_infinite() {
                return Err(invalid("floating-point number too large"));
            }
            Ok(Literal::Double(value))
        }
    }

    fn char_literal(&self, pair: &Pair<'a, Rule>) -> ParseResult<Literal<'a>> {
        let text = pair.as_str();
        let span = Span::from(pair.as_span());
        match unescape(&text[1..text.len() - 1], &span)?.as_slice() {
            [unit] => Ok(Literal::Char(*unit)),
            _ => Err(ParseError::new(
                ParseErrorKind::Other {
                    message: "character literal must be a single UTF-16 code unit".to_string(),
                },
                span,
            )),
        }
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    /// Dotted class name with type arguments erased.
    fn class_name(&self, pair: Pair<'a, Rule>) -> &'a str {
        let names: Vec<&'a str> = pair
            .into_inner()
            .filter(|p| p.as_rule() == Rule::identifier)
            .map(|p| p.as_str())
            .collect();
        match names.as_slice() {
            [single] => single,
            _ => self.arena.alloc_str(&names.join(".")),
        }
    }

    fn type_expr(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a TypeExpr<'a>> {
        let mut ty: Option<&'a TypeExpr<'a>> = None;
        for child in pair.clone().into_inner() {
            match child.as_rule() {
                Rule::primitive_type => {
                    ty = Some(self.alloc_type(TypeExpr::Primitive(primitive_kind(&child)?)));
                }
                Rule::class_type => {
                    ty = Some(self.alloc_type(TypeExpr::Named(self.class_name(child))));
                }
                Rule::dims => {
                    let mut array = ty.ok_or_else(|| malformed(&pair))?;
                    for _ in 0..dims_count(&child) {
                        array = self.alloc_type(TypeExpr::Array(array));
                    }
                    ty = Some(array);
                }
                _ => return Err(malformed(&child)),
            }
        }
        ty.ok_or_else(|| malformed(&pair))
    }

    fn class_literal(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a TypeExpr<'a>> {
        let mut ty: Option<&'a TypeExpr<'a>> = None;
        for child in pair.clone().into_inner() {
            match child.as_rule() {
                Rule::primitive_type => {
                    ty = Some(self.alloc_type(TypeExpr::Primitive(primitive_kind(&child)?)));
                }
                Rule::kw_void => ty = Some(self.alloc_type(TypeExpr::Void)),
                Rule::class_type => {
                    ty = Some(self.alloc_type(TypeExpr::Named(self.class_name(child))));
                }
                Rule::dims => {
                    let mut array = ty.ok_or_else(|| malformed(&pair))?;
                    for _ in 0..dims_count(&child) {
                        array = self.alloc_type(TypeExpr::Array(array));
                    }
                    ty = Some(array);
                }
                Rule::kw_class => {}
                _ => return Err(malformed(&child)),
            }
        }
        ty.ok_or_else(|| malformed(&pair))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn block(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a [&'a Stmt<'a>]> {
        let statements = pair
            .into_inner()
            .map(|p| self.block_statement(p))
            .collect::<ParseResult<Vec<_>>>()?;
        Ok(self.slice(&statements))
    }

    fn block_statement(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a Stmt<'a>> {
        let span = Span::from(pair.as_span());
        self.nested(&span, || {
            let stmt = self.statement_kind(pair)?;
            Ok(self.stmt(stmt, span.clone()))
        })
    }

    fn statement_kind(&self, pair: Pair<'a, Rule>) -> ParseResult<Stmt<'a>> {
        let rule = pair.as_rule();
        let mut children = significant(pair.clone());
        let stmt = match rule {
            Rule::local_class_decl => {
                let name = children
                    .find(|p| p.as_rule() == Rule::identifier)
                    .ok_or_else(|| malformed(&pair))?;
                Stmt::LocalClass(name.as_str())
            }
            Rule::local_var_decl => self.local_var(pair)?,
            Rule::block => Stmt::Block(self.block(pair)?),
            Rule::if_stmt => {
                let cond = self.expression(next_child(&mut children, &pair)?)?;
                let then_branch = self.block_statement(next_child(&mut children, &pair)?)?;
                let else_branch = children.next().map(|p| self.block_statement(p)).transpose()?;
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                }
            }
            Rule::while_stmt => {
                let cond = self.expression(next_child(&mut children, &pair)?)?;
                let body = self.block_statement(next_child(&mut children, &pair)?)?;
                Stmt::While { cond, body }
            }
            Rule::do_stmt => {
                let body = self.block_statement(next_child(&mut children, &pair)?)?;
                let cond = self.expression(next_child(&mut children, &pair)?)?;
                Stmt::DoWhile { body, cond }
            }
            Rule::for_stmt => {
                let mut init: &'a [&'a Stmt<'a>] = &[];
                let mut cond = None;
                let mut update: &'a [&'a Expr<'a>] = &[];
                let mut body = None;
                for child in children {
                    match child.as_rule() {
                        Rule::for_init => init = self.for_init(child)?,
                        Rule::for_cond => {
                            let mut inner = child.clone().into_inner();
                            cond = Some(self.expression(next_child(&mut inner, &child)?)?);
                        }
                        Rule::for_update => update = self.expressions(child)?,
                        _ => body = Some(self.block_statement(child)?),
                    }
                }
                Stmt::For {
                    init,
                    cond,
                    update,
                    body: body.ok_or_else(|| malformed(&pair))?,
                }
            }
            Rule::for_each_stmt => {
                let ty = self.type_expr(next_child(&mut children, &pair)?)?;
                let name = next_child(&mut children, &pair)?.as_str();
                let iterable = self.expression(next_child(&mut children, &pair)?)?;
                let body = self.block_statement(next_child(&mut children, &pair)?)?;
                Stmt::ForEach {
                    ty,
                    name,
                    iterable,
                    body,
                }
            }
            Rule::try_stmt => {
                let mut has_resources = false;
                let mut body: &'a [&'a Stmt<'a>] = &[];
                let mut catches = Vec::new();
                let mut finally = None;
                for child in children {
                    match child.as_rule() {
                        Rule::resources => has_resources = true,
                        Rule::block => body = self.block(child)?,
                        Rule::catch_clause => catches.push(self.catch_clause(child)?),
                        Rule::finally_clause => {
                            let mut inner = significant(child.clone());
                            finally = Some(self.block(next_child(&mut inner, &child)?)?);
                        }
                        _ => return Err(malformed(&child)),
                    }
                }
                Stmt::Try {
                    has_resources,
                    body,
                    catches: self.arena.alloc_slice_fill_iter(catches),
                    finally,
                }
            }
            Rule::switch_stmt => Stmt::Switch,
            Rule::synchronized_stmt => Stmt::Synchronized,
            Rule::return_stmt => {
                Stmt::Return(children.next().map(|p| self.expression(p)).transpose()?)
            }
            Rule::break_stmt => Stmt::Break(children.next().map(|p| p.as_str())),
            Rule::continue_stmt => Stmt::Continue(children.next().map(|p| p.as_str())),
            Rule::throw_stmt => Stmt::Throw(self.expression(next_child(&mut children, &pair)?)?),
            Rule::labeled_stmt => {
                let label = next_child(&mut children, &pair)?.as_str();
                let body = self.block_statement(next_child(&mut children, &pair)?)?;
                Stmt::Labeled { label, body }
            }
            Rule::empty_stmt => Stmt::Empty,
            Rule::expression_stmt => {
                Stmt::Expr(self.expression(next_child(&mut children, &pair)?)?)
            }
            _ => return Err(malformed(&pair)),
        };
        Ok(stmt)
    }

    fn local_var(&self, pair: Pair<'a, Rule>) -> ParseResult<Stmt<'a>> {
        let mut ty = None;
        let mut declarators = Vec::new();
        for child in significant(pair.clone()) {
            match child.as_rule() {
                Rule::type_expr => ty = Some(self.type_expr(child)?),
                Rule::declarator => {
                    let mut name = None;
                    let mut dims = 0;
                    let mut init = None;
                    for part in child.clone().into_inner() {
                        match part.as_rule() {
                            Rule::identifier => name = Some(part.as_str()),
                            Rule::dims => dims = dims_count(&part),
                            _ => init = Some(self.var_init(part)?),
                        }
                    }
                    declarators.push(Declarator {
                        name: name.ok_or_else(|| malformed(&child))?,
                        dims,
                        init,
                    });
                }
                _ => return Err(malformed(&child)),
            }
        }
        Ok(Stmt::LocalVar {
            ty: ty.ok_or_else(|| malformed(&pair))?,
            declarators: self.arena.alloc_slice_fill_iter(declarators),
        })
    }

    fn for_init(&self, pair: Pair<'a, Rule>) -> ParseResult<&'a [&'a Stmt<'a>]> {
        let mut statements = Vec::new();
        for child in pair.into_inner() {
            let span = Span::from(child.as_span());
            let stmt = match child.as_rule() {
                Rule::local_var_decl => self.local_var(child)?,
                _ => Stmt::Expr(self.expression(child)?),
            };
            statements.push(self.stmt(stmt, span));
        }
        Ok(self.slice(&statements))
    }

    fn catch_clause(&self, pair: Pair<'a, Rule>) -> ParseResult<CatchClause<'a>> {
        let mut types = Vec::new();
        let mut name = None;
        let mut body: &'a [&'a Stmt<'a>] = &[];
        for child in significant(pair.clone()) {
            match child.as_rule() {
                Rule::catch_type => {
                    for alternative in child.into_inner() {
                        types.push(TypeExpr::Named(self.class_name(alternative)));
                    }
                }
                Rule::identifier => name = Some(child.as_str()),
                Rule::block => body = self.block(child)?,
                _ => return Err(malformed(&child)),
            }
        }
        Ok(CatchClause {
            types: self.arena.alloc_slice_fill_iter(types),
            name: name.ok_or_else(|| malformed(&pair))?,
            body,
        })
    }
}

/// Decode Java escape sequences into UTF-16 code units.
fn unescape(text: &str, span: &Span) -> ParseResult<Vec<u16>> {
    let invalid = |escape: &str| {
        ParseError::new(
            ParseErrorKind::InvalidEscape {
                text: escape.to_string(),
            },
            span.clone(),
        )
    };

    let mut units = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buffer = [0u16; 2];
            units.extend_from_slice(c.encode_utf16(&mut buffer));
            continue;
        }
        let Some(escape) = chars.next() else {
            return Err(invalid("\\"));
        };
        let unit = match escape {
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0A,
            'f' => 0x0C,
            'r' => 0x0D,
            's' => 0x20,
            '"' => 0x22,
            '\'' => 0x27,
            '\\' => 0x5C,
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(invalid(&format!("\\u{}", hex)));
                }
                u16::from_str_radix(&hex, 16).map_err(|_| invalid(&format!("\\u{}", hex)))?
            }
            '0'..='7' => {
                // Up to three octal digits, the first at most `3` when three.
                let max_len = if escape <= '3' { 3 } else { 2 };
                let mut value = escape as u16 - '0' as u16;
                for _ in 1..max_len {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            value = value * 8 + (*d as u16 - '0' as u16);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                value
            }
            other => return Err(invalid(&format!("\\{}", other))),
        };
        units.push(unit);
    }
    Ok(units)
}
