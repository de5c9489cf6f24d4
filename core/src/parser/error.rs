use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::parser::{Rule, Span};

/// Parser error with the location it was detected at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Specific kinds of parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unclosed delimiter '{delimiter}'")]
    UnclosedDelimiter { delimiter: char },
    #[error("invalid number literal '{text}': {reason}")]
    InvalidNumber { text: String, reason: String },
    #[error("invalid escape sequence '{text}'")]
    InvalidEscape { text: String },
    #[error("expression nesting depth exceeds maximum of {max_depth} levels")]
    MaxDepthExceeded { depth: usize, max_depth: usize },
    /// Catch-all for pest errors we don't specifically handle.
    #[error("{message}")]
    Other { message: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Convert to a Diagnostic for API boundary
    pub fn to_diagnostic(&self) -> Diagnostic {
        let (code, help) = match &self.kind {
            ParseErrorKind::UnexpectedToken { .. } => ("P001", vec![]),
            ParseErrorKind::UnclosedDelimiter { .. } => (
                "P002",
                vec!["Add the missing closing delimiter".to_string()],
            ),
            ParseErrorKind::InvalidNumber { .. } => {
                ("P003", vec!["Check the number format".to_string()])
            }
            ParseErrorKind::InvalidEscape { .. } => (
                "P005",
                vec![r#"Valid escapes are \b \t \n \f \r \s \" \' \\, octal and \uXXXX"#.to_string()],
            ),
            ParseErrorKind::MaxDepthExceeded { .. } => (
                "P004",
                vec!["Reduce nesting or simplify the expression".to_string()],
            ),
            ParseErrorKind::Other { .. } => ("P999", vec![]),
        };

        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone(),
            related: Vec::new(),
            help,
            code: Some(code.to_string()),
        }
    }
}

/// Convert Pest error to human-readable ParseError
pub fn convert_pest_error(err: pest::error::Error<Rule>, source: &str) -> ParseError {
    use pest::error::ErrorVariant;

    let span = match err.location {
        pest::error::InputLocation::Pos(pos) => Span(pos..pos),
        pest::error::InputLocation::Span((start, end)) => Span(start..end),
    };

    let kind = match err.variant {
        ErrorVariant::ParsingError {
            positives,
            negatives,
        } => {
            if let Some(delimiter) = unclosed_delimiter(source, span.0.start) {
                if span.0.start >= source.trim_end().len() {
                    return ParseError::new(ParseErrorKind::UnclosedDelimiter { delimiter }, span);
                }
            }
            ParseErrorKind::UnexpectedToken {
                expected: format_expected_rules(&positives),
                found: format_found(&negatives, source, span.0.start),
            }
        }
        ErrorVariant::CustomError { message } => ParseErrorKind::Other { message },
    };

    ParseError::new(kind, span)
}

/// The innermost bracket still open at `pos`, ignoring string and char
/// literals.
fn unclosed_delimiter(source: &str, pos: usize) -> Option<char> {
    let mut open = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in source[..pos.min(source.len())].chars() {
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
            '(' | '[' | '{' => open.push(c),
            ')' | ']' | '}' => {
                open.pop();
            }
            _ => {}
        }
    }
    open.pop()
}

/// Format expected rules in a human-readable way
fn format_expected_rules(rules: &[Rule]) -> String {
    if rules.is_empty() {
        return "something else".to_string();
    }

    let mut concepts: Vec<&str> = Vec::new();
    for rule in rules {
        let concept = match rule {
            Rule::integer_literal
            | Rule::float_literal
            | Rule::char_literal
            | Rule::string_literal
            | Rule::boolean_literal
            | Rule::null_literal => "literal",
            Rule::identifier => "identifier",
            Rule::type_expr | Rule::primitive_type | Rule::class_type => "type",
            Rule::EOI => "end of input",
            Rule::block => "block",
            Rule::arguments => "arguments",
            Rule::kw_while => "'while'",
            Rule::kw_catch | Rule::kw_finally | Rule::finally_clause | Rule::catch_clause => {
                "'catch' or 'finally'"
            }
            _ if is_operator(*rule) => "operator",
            _ => "expression",
        };
        if !concepts.contains(&concept) {
            concepts.push(concept);
        }
    }

    match concepts.split_last() {
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} or {}", rest.join(", "), last),
        None => "something else".to_string(),
    }
}

fn is_operator(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::assign_op
            | Rule::ternary_op
            | Rule::or_op
            | Rule::and_op
            | Rule::bit_or
            | Rule::bit_xor
            | Rule::bit_and
            | Rule::eq
            | Rule::ne
            | Rule::le
            | Rule::ge
            | Rule::lt
            | Rule::gt
            | Rule::shl
            | Rule::shr
            | Rule::ushr
            | Rule::add
            | Rule::sub
            | Rule::mul
            | Rule::div
            | Rule::rem
            | Rule::post_inc
            | Rule::post_dec
            | Rule::index_op
            | Rule::call_op
            | Rule::field_op
            | Rule::qualified_new_op
            | Rule::method_ref_op
            | Rule::instanceof_op
    )
}

/// Describe what the parser stopped on.
fn format_found(negatives: &[Rule], source: &str, pos: usize) -> String {
    if let Some(rule) = negatives.first() {
        return format!("{:?}", rule);
    }
    match source.get(pos..).and_then(|rest| rest.chars().next()) {
        None => "end of input".to_string(),
        Some(c) => format!("'{}'", c),
    }
}
