//! Type-checks a parsed fragment and lowers it to an evaluator tree.
//!
//! Every implicit conversion of the source (promotion, boxing, unboxing,
//! assignment narrowing) becomes an explicit node, so the evaluator never
//! consults static types.

use tracing::{debug, trace};

use super::BuiltFragment;
use super::error::{BuildError, BuildErrorKind};
use super::overload::{self, Phase, Selection};
use super::scope::{JumpTarget, JumpTargets, ScopeArena};
use crate::casting::{
    ConversionContext, ConversionStep, cast_primitive, fits_constant, plan_conversion,
};
use crate::evaluator::{
    BinaryOperation, CastTarget, CatchNode, Constant, EvaluatorNode, FieldTarget, Jump, LocalRef,
    LogicalOp, NodeKind, Receiver,
};
use crate::parser::{
    BinaryOp, BoolOp, CatchClause, ComparisonOp, Declarator, Expr, IncrementOp, Literal,
    ParsedFragment, Span, Stmt, TypeExpr, UnaryOp,
};
use crate::types::{
    Availability, CAPTURED_LOCAL_PREFIX, CLASS, CompileContext, FieldInfo, ITERABLE, JavaType,
    LocalVariable, MethodInfo, OBJECT, PrimitiveKind, SymbolResolver, THROWABLE, promotion,
};
use crate::values::Value;

type BuildResult<T> = Result<T, BuildError>;

fn error(kind: impl Into<BuildErrorKind>, span: &Span) -> BuildError {
    BuildError::new(kind, span.clone())
}

fn node(kind: NodeKind, span: &Span) -> EvaluatorNode {
    EvaluatorNode::new(kind, span.clone())
}

/// A built expression and its static type.
#[derive(Debug, Clone)]
struct Typed {
    node: EvaluatorNode,
    ty: JavaType,
    /// Value of a constant expression of type `int` or narrower.
    constant: Option<i32>,
}

impl Typed {
    fn new(kind: NodeKind, ty: JavaType, span: &Span) -> Self {
        Self {
            node: node(kind, span),
            ty,
            constant: None,
        }
    }

    fn with_constant(mut self, constant: Option<i32>) -> Self {
        self.constant = constant;
        self
    }
}

/// What the left of a `.` denotes.
enum Qualifier {
    Value(Typed),
    Type(JavaType),
}

/// Where a method call takes its receiver from.
enum CallSite {
    /// Unqualified; `this` of the enclosing class `level` steps out.
    Implicit(usize),
    Super,
    Type,
    Value(Box<EvaluatorNode>),
}

pub(super) struct Builder<'r, 'a> {
    resolver: &'r dyn SymbolResolver,
    context: &'r CompileContext,
    parsed: &'r ParsedFragment<'a>,
    scopes: ScopeArena,
    jumps: JumpTargets,
    /// Slots live where the node being built will run.
    slot_depth: usize,
}

impl<'r, 'a> Builder<'r, 'a> {
    pub fn new(
        parsed: &'r ParsedFragment<'a>,
        context: &'r CompileContext,
        resolver: &'r dyn SymbolResolver,
    ) -> Self {
        Self {
            resolver,
            context,
            parsed,
            scopes: ScopeArena::new(),
            jumps: JumpTargets::default(),
            slot_depth: 0,
        }
    }

    pub fn build(mut self) -> BuildResult<BuiltFragment> {
        if let Some(expr) = self.parsed.as_expression() {
            let typed = self.expr(expr)?;
            debug!(ty = %typed.ty, "built expression");
            return Ok(BuiltFragment {
                root: typed.node,
                result_type: typed.ty,
                is_expression: true,
            });
        }

        let fragment = self.parsed.fragment;
        let mut statements = Vec::with_capacity(fragment.statements.len() + 1);
        for &stmt in fragment.statements {
            self.statement_into(stmt, &mut statements)?;
        }
        let mut result_type = JavaType::Void;
        if let Some(result) = fragment.result {
            let typed = self.expr(result)?;
            result_type = typed.ty;
            statements.push(typed.node);
        }
        debug!(statements = statements.len(), ty = %result_type, "built fragment");

        let span = Span::new(0, self.parsed.source().len());
        let root = node(
            NodeKind::Block {
                label: None,
                scope: self.scopes.root_defaults(),
                statements,
            },
            &span,
        );
        Ok(BuiltFragment {
            root,
            result_type,
            is_expression: false,
        })
    }

    // --- Types and conversions ---

    fn resolve_type(&self, ty: &TypeExpr<'a>, span: &Span) -> BuildResult<JavaType> {
        match ty {
            TypeExpr::Primitive(kind) => Ok(JavaType::Primitive(*kind)),
            TypeExpr::Void => Ok(JavaType::Void),
            TypeExpr::Named(name) => self
                .resolver
                .resolve_class_name(name)
                .map(JavaType::Class)
                .ok_or_else(|| error(BuildErrorKind::UnknownType(name.to_string()), span)),
            TypeExpr::Array(element) => Ok(JavaType::array_of(self.resolve_type(element, span)?)),
        }
    }

    /// `var` in a declaration, unless a class is actually called that.
    fn is_var(&self, ty: &TypeExpr<'a>) -> bool {
        matches!(ty, TypeExpr::Named("var")) && self.resolver.resolve_class_name("var").is_none()
    }

    /// Wrap `value` in the nodes converting it to `to`.
    fn convert(
        &self,
        value: Typed,
        to: &JavaType,
        context: ConversionContext,
    ) -> BuildResult<EvaluatorNode> {
        let span = value.node.span.clone();
        let steps =
            plan_conversion(&value.ty, to, context, self.resolver).map_err(|e| error(e, &span))?;
        let mut current = value.node;
        for step in steps {
            let operand = Box::new(current);
            let kind = match step {
                ConversionStep::Primitive(kind) => NodeKind::TypeCast {
                    operand,
                    target: CastTarget::Primitive(kind),
                },
                ConversionStep::Box(kind) => {
                    self.check_boxing_factory(kind, &span)?;
                    NodeKind::Boxing { operand, kind }
                }
                ConversionStep::Unbox(kind) => NodeKind::Unboxing { operand, kind },
                ConversionStep::CheckCast(ty) => NodeKind::TypeCast {
                    operand,
                    target: CastTarget::Reference(ty),
                },
            };
            current = node(kind, &span);
        }
        Ok(current)
    }

    /// Boxing calls `valueOf` or, failing that, a constructor of the wrapper.
    fn check_boxing_factory(&self, kind: PrimitiveKind, span: &Span) -> BuildResult<()> {
        let wrapper = kind.wrapper_class();
        let param = [JavaType::Primitive(kind)];
        let found = self.resolver.class(wrapper).is_some_and(|info| {
            info.methods
                .iter()
                .any(|m| m.is_static && m.name == "valueOf" && m.params == param)
                || info.constructors.iter().any(|c| c.params == param)
        });
        if found {
            Ok(())
        } else {
            Err(error(BuildErrorKind::NoBoxingFactory { kind, wrapper }, span))
        }
    }

    fn condition(&self, value: Typed) -> BuildResult<EvaluatorNode> {
        if value.ty.primitive_or_unboxed() != Some(PrimitiveKind::Boolean) {
            return Err(error(
                BuildErrorKind::UnexpectedType {
                    expected: "boolean".to_string(),
                    found: value.ty,
                },
                &value.node.span,
            ));
        }
        self.convert(value, &JavaType::boolean(), ConversionContext::Loose)
    }

    /// Array dimensions and indices undergo unary promotion and must be `int`.
    fn index_operand(&self, value: Typed, op: &str) -> BuildResult<EvaluatorNode> {
        match value
            .ty
            .primitive_or_unboxed()
            .and_then(promotion::unary_numeric_promotion)
        {
            Some(PrimitiveKind::Int) => {
                self.convert(value, &JavaType::int(), ConversionContext::Loose)
            }
            _ => Err(error(
                BuildErrorKind::BadOperand {
                    op: op.to_string(),
                    operand: value.ty,
                },
                &value.node.span,
            )),
        }
    }

    /// Narrow the result of a compound operation back to the variable's type.
    fn assign_back(&self, result: Typed, ty: &JavaType) -> BuildResult<EvaluatorNode> {
        match ty.unboxed() {
            Some(kind) => {
                let span = result.node.span.clone();
                let primitive =
                    self.convert(result, &JavaType::Primitive(kind), ConversionContext::Cast)?;
                self.check_boxing_factory(kind, &span)?;
                Ok(node(
                    NodeKind::Boxing {
                        operand: Box::new(primitive),
                        kind,
                    },
                    &span,
                ))
            }
            None => self.convert(result, ty, ConversionContext::Cast),
        }
    }

    fn with_slot<T>(
        &mut self,
        build: impl FnOnce(&mut Self, usize) -> BuildResult<T>,
    ) -> BuildResult<T> {
        let slot = self.slot_depth;
        self.slot_depth += 1;
        let result = build(self, slot);
        self.slot_depth = slot;
        result
    }

    // --- Names ---

    /// The context class and its lexically enclosing classes.
    fn chain(&self) -> Vec<String> {
        self.context
            .context_class
            .as_deref()
            .map(|class| self.resolver.enclosing_chain(class))
            .unwrap_or_default()
    }

    fn field_in_chain(&self, name: &str) -> Option<(usize, FieldInfo)> {
        self.chain().iter().enumerate().find_map(|(level, class)| {
            self.resolver
                .find_field(class, name)
                .map(|field| (level, field))
        })
    }

    fn is_variable(&self, name: &str) -> bool {
        self.context.find_label(name).is_some()
            || self.scopes.lookup(name).is_some()
            || self.context.find_local(name).is_some()
            || self.field_in_chain(name).is_some()
    }

    /// Outer-instance fields leading from `this` to the instance of the class
    /// `level` steps out.
    fn hops(&self, level: usize, span: &Span) -> BuildResult<Vec<FieldInfo>> {
        if self.context.is_static || self.context.context_class.is_none() {
            return Err(error(BuildErrorKind::NoThis, span));
        }
        let chain = self.chain();
        let mut hops = Vec::with_capacity(level);
        for pair in chain.windows(2).take(level) {
            let (inner, outer) = (&pair[0], &pair[1]);
            if !self
                .resolver
                .class(inner)
                .is_some_and(|info| info.has_outer_instance)
            {
                return Err(error(BuildErrorKind::NoEnclosingInstance(inner.clone()), span));
            }
            hops.push(FieldInfo::outer_this(inner, outer));
        }
        Ok(hops)
    }

    fn this_at(&self, level: usize, span: &Span) -> BuildResult<EvaluatorNode> {
        Ok(node(
            NodeKind::ThisRef {
                hops: self.hops(level, span)?,
            },
            span,
        ))
    }

    fn this(&self, qualifier: Option<&str>, span: &Span) -> BuildResult<Typed> {
        let chain = self.chain();
        let level = match qualifier {
            None => 0,
            Some(name) => {
                let class = self
                    .resolver
                    .resolve_class_name(name)
                    .ok_or_else(|| error(BuildErrorKind::UnknownType(name.to_string()), span))?;
                chain
                    .iter()
                    .position(|c| *c == class)
                    .ok_or_else(|| error(BuildErrorKind::NoEnclosingInstance(class), span))?
            }
        };
        let ty = chain
            .get(level)
            .cloned()
            .map(JavaType::Class)
            .ok_or_else(|| error(BuildErrorKind::NoThis, span))?;
        Ok(Typed {
            node: self.this_at(level, span)?,
            ty,
            constant: None,
        })
    }

    fn ident(&self, name: &str, span: &Span) -> BuildResult<Typed> {
        if let Some(ty) = self.context.find_label(name) {
            return Ok(Typed::new(
                NodeKind::LabeledValue(name.to_string()),
                ty.clone(),
                span,
            ));
        }
        if let Some(ty) = self.scopes.lookup(name) {
            return Ok(Typed::new(
                NodeKind::LocalVariableRef(LocalRef::Scoped(name.to_string())),
                ty.clone(),
                span,
            ));
        }
        if let Some(local) = self.context.find_local(name) {
            return self.frame_local(local, span);
        }
        if let Some((level, field)) = self.field_in_chain(name) {
            trace!(name, level, "name resolved to a field");
            return self.field_from_this(level, field, span);
        }
        Err(error(BuildErrorKind::UnresolvedName(name.to_string()), span))
    }

    fn frame_local(&self, local: &LocalVariable, span: &Span) -> BuildResult<Typed> {
        let foreign = match (
            local.declaring_class.as_deref(),
            self.context.context_class.as_deref(),
        ) {
            (Some(declaring), Some(context)) => declaring != context,
            _ => false,
        };
        if foreign {
            return self.captured_local(local, span);
        }
        let kind = match local.availability {
            Availability::Certain => NodeKind::LocalVariableRef(LocalRef::Frame(local.name.clone())),
            Availability::Uncertain => {
                let field = self
                    .field_in_chain(&local.name)
                    .and_then(|(level, field)| self.field_from_this(level, field, span).ok())
                    .map(|typed| Box::new(typed.node));
                NodeKind::Fallback {
                    name: local.name.clone(),
                    field,
                }
            }
        };
        Ok(Typed::new(kind, local.ty.clone(), span))
    }

    /// A local of an enclosing method, read through the copy a local or
    /// anonymous class keeps of it.
    fn captured_local(&self, local: &LocalVariable, span: &Span) -> BuildResult<Typed> {
        let captured = format!("{}{}", CAPTURED_LOCAL_PREFIX, local.name);
        for (level, class) in self.chain().iter().enumerate() {
            if Some(class.as_str()) == local.declaring_class.as_deref() {
                break;
            }
            if let Some(field) = self.resolver.find_field(class, &captured) {
                let mut typed = self.field_from_this(level, field, span)?;
                typed.ty = local.ty.clone();
                return Ok(typed);
            }
        }
        trace!(name = %local.name, "local of an enclosing method was not captured");
        Err(error(
            BuildErrorKind::UnreachableLocal(local.name.clone()),
            span,
        ))
    }

    fn field_from_this(&self, level: usize, field: FieldInfo, span: &Span) -> BuildResult<Typed> {
        let ty = field.ty.clone();
        let target = if field.is_static {
            FieldTarget::Static
        } else if self.context.is_static {
            return Err(error(BuildErrorKind::NotStatic(field.name), span));
        } else {
            FieldTarget::Instance(Box::new(self.this_at(level, span)?))
        };
        Ok(Typed::new(NodeKind::FieldRef { target, field }, ty, span))
    }

    fn superclass(&self, span: &Span) -> BuildResult<String> {
        let class = self
            .context
            .context_class
            .as_deref()
            .ok_or_else(|| error(BuildErrorKind::NoThis, span))?;
        self.resolver
            .class(class)
            .and_then(|info| info.superclass.clone())
            .ok_or_else(|| error(BuildErrorKind::UnknownType(format!("superclass of {}", class)), span))
    }

    fn super_ref(&self, span: &Span) -> BuildResult<EvaluatorNode> {
        Ok(node(
            NodeKind::SuperRef {
                hops: self.hops(0, span)?,
            },
            span,
        ))
    }

    /// `expr` as a dotted class name, unless it starts with a variable.
    fn type_path(&self, expr: &Expr<'a>) -> Option<String> {
        let path = expr.as_path()?;
        let head = path.split('.').next()?;
        if self.is_variable(head) {
            return None;
        }
        self.resolver.resolve_class_name(&path)
    }

    fn qualifier(&mut self, expr: &'a Expr<'a>) -> BuildResult<Qualifier> {
        let span = self.parsed.span_of(expr);
        match expr {
            Expr::Ident(name) if !self.is_variable(name) => self
                .resolver
                .resolve_class_name(name)
                .map(|class| Qualifier::Type(JavaType::Class(class)))
                .ok_or_else(|| error(BuildErrorKind::UnresolvedName(name.to_string()), &span)),
            Expr::Field { target, name } => {
                if let Some(class) = self.type_path(expr) {
                    return Ok(Qualifier::Type(JavaType::Class(class)));
                }
                if let Expr::Super = target {
                    return self.super_field(name, &span).map(Qualifier::Value);
                }
                let target = self.qualifier(target)?;
                self.member(target, name, &span).map(Qualifier::Value)
            }
            _ => self.expr(expr).map(Qualifier::Value),
        }
    }

    fn member(&self, target: Qualifier, name: &str, span: &Span) -> BuildResult<Typed> {
        let unknown = |class: &str| {
            error(
                BuildErrorKind::UnknownField {
                    class: class.to_string(),
                    field: name.to_string(),
                },
                span,
            )
        };
        match target {
            Qualifier::Type(ty) => {
                let class = ty.class_name().unwrap_or_default();
                let field = self
                    .resolver
                    .find_field(class, name)
                    .ok_or_else(|| unknown(class))?;
                if !field.is_static {
                    return Err(error(BuildErrorKind::NotStatic(field.name), span));
                }
                let ty = field.ty.clone();
                Ok(Typed::new(
                    NodeKind::FieldRef {
                        target: FieldTarget::Static,
                        field,
                    },
                    ty,
                    span,
                ))
            }
            Qualifier::Value(value) => match &value.ty {
                JavaType::Array(_) if name == "length" => Ok(Typed::new(
                    NodeKind::ArrayLength(Box::new(value.node)),
                    JavaType::int(),
                    span,
                )),
                JavaType::Class(class) => {
                    let field = self
                        .resolver
                        .find_field(class, name)
                        .ok_or_else(|| unknown(class))?;
                    let ty = field.ty.clone();
                    let target = if field.is_static {
                        FieldTarget::Static
                    } else {
                        FieldTarget::Instance(Box::new(value.node))
                    };
                    Ok(Typed::new(NodeKind::FieldRef { target, field }, ty, span))
                }
                other => Err(unknown(&other.to_string())),
            },
        }
    }

    fn super_field(&self, name: &str, span: &Span) -> BuildResult<Typed> {
        let superclass = self.superclass(span)?;
        let field = self.resolver.find_field(&superclass, name).ok_or_else(|| {
            error(
                BuildErrorKind::UnknownField {
                    class: superclass.clone(),
                    field: name.to_string(),
                },
                span,
            )
        })?;
        let ty = field.ty.clone();
        let target = if field.is_static {
            FieldTarget::Static
        } else {
            FieldTarget::Instance(Box::new(self.super_ref(span)?))
        };
        Ok(Typed::new(NodeKind::FieldRef { target, field }, ty, span))
    }

    // --- Expressions ---

    fn expr(&mut self, expr: &'a Expr<'a>) -> BuildResult<Typed> {
        let span = self.parsed.span_of(expr);
        match expr {
            Expr::Literal(literal) => self.literal(literal, &span),
            Expr::Ident(name) => self.ident(name, &span),
            Expr::This(qualifier) => self.this(*qualifier, &span),
            Expr::Super => Err(error(
                BuildErrorKind::Unsupported("bare `super` reference"),
                &span,
            )),
            Expr::Field { .. } => match self.qualifier(expr)? {
                Qualifier::Value(typed) => Ok(typed),
                Qualifier::Type(ty) => Err(error(
                    BuildErrorKind::UnexpectedType {
                        expected: "a value".to_string(),
                        found: ty,
                    },
                    &span,
                )),
            },
            Expr::Call { target, name, args } => self.call(*target, name, args, &span),
            Expr::New {
                outer,
                class,
                args,
                has_body,
            } => self.new_instance(*outer, class, args, *has_body, &span),
            Expr::NewArray { ty, dims, init } => self.new_array(ty, dims, *init, &span),
            Expr::ArrayInit(_) => Err(error(
                BuildErrorKind::Unsupported("array initializer outside of a declaration"),
                &span,
            )),
            Expr::Index { target, index } => self.index(target, index, &span),
            Expr::Unary { op, operand } => self.unary(*op, operand, &span),
            Expr::Increment { op, prefix, target } => self.increment(*op, *prefix, target, &span),
            Expr::Binary { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                self.binary(*op, left, right, &span)
            }
            Expr::Boolean { op, left, right } => self.logical(*op, left, right, &span),
            Expr::Comparison { op, left, right } => {
                let left = self.expr(left)?;
                let right = self.expr(right)?;
                self.comparison(*op, left, right, &span)
            }
            Expr::Conditional {
                cond,
                then_branch,
                else_branch,
            } => self.conditional(cond, then_branch, else_branch, &span),
            Expr::Assign {
                op: None,
                target,
                value,
            } => self.assign(target, value, &span),
            Expr::Assign {
                op: Some(op),
                target,
                value,
            } => self.compound_assign(*op, target, value, &span),
            Expr::Cast { ty, expr: operand } => self.cast(ty, operand, &span),
            Expr::InstanceOf {
                expr: operand,
                ty,
                binding,
            } => self.instance_of(operand, ty, *binding, &span),
            Expr::ClassLiteral(ty) => {
                let ty = self.resolve_type(ty, &span)?;
                Ok(Typed::new(NodeKind::TypeRef(ty), JavaType::class(CLASS), &span))
            }
            Expr::Lambda => Err(error(
                BuildErrorKind::Unsupported("lambda expression"),
                &span,
            )),
            Expr::MethodRef { .. } => Err(error(
                BuildErrorKind::Unsupported("method reference"),
                &span,
            )),
        }
    }

    fn literal(&self, literal: &Literal<'a>, span: &Span) -> BuildResult<Typed> {
        let too_large = |text: String| error(BuildErrorKind::IntegerTooLarge(text), span);
        let (value, ty, constant) = match *literal {
            Literal::Int(v) => {
                let v = i32::try_from(v).map_err(|_| too_large(v.to_string()))?;
                (Value::Int(v), JavaType::int(), Some(v))
            }
            Literal::Long(v) => {
                let v = i64::try_from(v).map_err(|_| too_large(format!("{}L", v)))?;
                (Value::Long(v), JavaType::long(), None)
            }
            Literal::Float(v) => (
                Value::Float(v),
                JavaType::Primitive(PrimitiveKind::Float),
                None,
            ),
            Literal::Double(v) => (Value::Double(v), JavaType::double(), None),
            Literal::Char(c) => (
                Value::Char(c),
                JavaType::Primitive(PrimitiveKind::Char),
                Some(i32::from(c)),
            ),
            Literal::Bool(b) => (Value::Boolean(b), JavaType::boolean(), None),
            Literal::Null => (Value::Null, JavaType::Null, None),
            Literal::Str(s) => {
                return Ok(Typed::new(
                    NodeKind::Literal(Constant::Str(s.to_string())),
                    JavaType::string(),
                    span,
                ));
            }
        };
        Ok(Typed::new(NodeKind::Literal(Constant::Value(value)), ty, span).with_constant(constant))
    }

    fn arguments(&mut self, args: &'a [&'a Expr<'a>]) -> BuildResult<Vec<Typed>> {
        args.iter().map(|&arg| self.expr(arg)).collect()
    }

    fn select(
        &self,
        candidates: &[MethodInfo],
        args: &[Typed],
        what: String,
        class: &str,
        span: &Span,
    ) -> BuildResult<Selection> {
        let types: Vec<JavaType> = args.iter().map(|arg| arg.ty.clone()).collect();
        overload::select(candidates, &types, self.resolver).ok_or_else(|| {
            let args = types
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            error(
                BuildErrorKind::NoApplicableMethod {
                    what,
                    class: class.to_string(),
                    args,
                },
                span,
            )
        })
    }

    /// Convert arguments to the selected parameters, packing a variable arity
    /// tail into an array.
    fn pack_arguments(
        &self,
        selection: &Selection,
        args: Vec<Typed>,
        span: &Span,
    ) -> BuildResult<Vec<EvaluatorNode>> {
        let fixed = selection.fixed_arity();
        let mut nodes = Vec::with_capacity(fixed + 1);
        let mut tail = Vec::new();
        for (index, arg) in args.into_iter().enumerate() {
            let converted =
                self.convert(arg, selection.param_type(index), ConversionContext::Loose)?;
            if index < fixed {
                nodes.push(converted);
            } else {
                tail.push(converted);
            }
        }
        if selection.phase == Phase::VariableArity {
            nodes.push(node(
                NodeKind::ArrayInitializer {
                    element: selection.param_type(fixed).clone(),
                    elements: tail,
                },
                span,
            ));
        }
        Ok(nodes)
    }

    fn call(
        &mut self,
        target: Option<&'a Expr<'a>>,
        name: &str,
        args: &'a [&'a Expr<'a>],
        span: &Span,
    ) -> BuildResult<Typed> {
        let unknown = |class: String| {
            error(
                BuildErrorKind::UnknownMethod {
                    class,
                    name: name.to_string(),
                },
                span,
            )
        };
        let (class, site) = match target {
            None => {
                let chain = self.chain();
                let level = chain
                    .iter()
                    .position(|class| !self.resolver.find_methods(class, name).is_empty())
                    .ok_or_else(|| {
                        unknown(chain.first().cloned().unwrap_or_else(|| OBJECT.to_string()))
                    })?;
                (chain[level].clone(), CallSite::Implicit(level))
            }
            Some(Expr::Super) => (self.superclass(span)?, CallSite::Super),
            Some(target) => match self.qualifier(target)? {
                Qualifier::Type(ty) => (
                    ty.class_name().unwrap_or_default().to_string(),
                    CallSite::Type,
                ),
                Qualifier::Value(value) => {
                    let class = match &value.ty {
                        JavaType::Class(class) => class.clone(),
                        JavaType::Array(_) => OBJECT.to_string(),
                        other => {
                            return Err(error(
                                BuildErrorKind::UnexpectedType {
                                    expected: "an object".to_string(),
                                    found: other.clone(),
                                },
                                span,
                            ));
                        }
                    };
                    (class, CallSite::Value(Box::new(value.node)))
                }
            },
        };

        let candidates = self.resolver.find_methods(&class, name);
        if candidates.is_empty() {
            return Err(unknown(class));
        }
        let args = self.arguments(args)?;
        let selection = self.select(&candidates, &args, format!("method `{}`", name), &class, span)?;
        let args = self.pack_arguments(&selection, args, span)?;
        let method = selection.method;

        let nonvirtual = matches!(site, CallSite::Super);
        let receiver = if method.is_static {
            Receiver::Static
        } else {
            match site {
                CallSite::Implicit(_) | CallSite::Type if self.context.is_static => {
                    return Err(error(BuildErrorKind::NotStatic(method.name), span));
                }
                CallSite::Implicit(level) => Receiver::Instance(Box::new(self.this_at(level, span)?)),
                CallSite::Super => Receiver::Instance(Box::new(self.super_ref(span)?)),
                CallSite::Type => {
                    return Err(error(BuildErrorKind::NotStatic(method.name), span));
                }
                CallSite::Value(object) => Receiver::Instance(object),
            }
        };
        trace!(method = %method, nonvirtual, "call resolved");
        let ty = method.return_type.clone();
        Ok(Typed::new(
            NodeKind::MethodCall {
                receiver,
                method,
                args,
                nonvirtual,
            },
            ty,
            span,
        ))
    }

    fn new_instance(
        &mut self,
        outer: Option<&'a Expr<'a>>,
        class: &TypeExpr<'a>,
        args: &'a [&'a Expr<'a>],
        has_body: bool,
        span: &Span,
    ) -> BuildResult<Typed> {
        if has_body {
            return Err(error(BuildErrorKind::Unsupported("anonymous class"), span));
        }
        let outer = outer.map(|outer| self.expr(outer)).transpose()?;
        // `outer.new Inner()` names `Inner` as a member of the outer instance's class.
        let nested = match (&outer, class) {
            (Some(outer), TypeExpr::Named(name)) => outer
                .ty
                .class_name()
                .map(|outer| format!("{}${}", outer, name))
                .filter(|nested| self.resolver.class(nested).is_some()),
            _ => None,
        };
        let ty = match nested {
            Some(nested) => JavaType::Class(nested),
            None => self.resolve_type(class, span)?,
        };
        let name = match ty {
            JavaType::Class(name) => name,
            other => {
                return Err(error(
                    BuildErrorKind::UnexpectedType {
                        expected: "a class".to_string(),
                        found: other,
                    },
                    span,
                ));
            }
        };
        let (is_interface, has_outer_instance, outer_class) = match self.resolver.class(&name) {
            Some(info) => (info.is_interface, info.has_outer_instance, info.outer.clone()),
            None => return Err(error(BuildErrorKind::UnknownType(name), span)),
        };
        if is_interface {
            return Err(error(BuildErrorKind::NotInstantiable(name), span));
        }

        let outer = match (outer, has_outer_instance) {
            (Some(outer), true) => {
                let outer_ty = JavaType::Class(outer_class.unwrap_or_else(|| OBJECT.to_string()));
                Some(Box::new(self.convert(outer, &outer_ty, ConversionContext::Loose)?))
            }
            (Some(_), false) => {
                return Err(error(BuildErrorKind::NoEnclosingInstance(name), span));
            }
            (None, true) => {
                let no_outer = || error(BuildErrorKind::NoEnclosingInstance(name.clone()), span);
                let outer_class = outer_class.ok_or_else(no_outer)?;
                let level = self
                    .chain()
                    .iter()
                    .position(|class| self.resolver.is_subclass(class, &outer_class))
                    .ok_or_else(no_outer)?;
                Some(Box::new(self.this_at(level, span)?))
            }
            (None, false) => None,
        };

        let args = self.arguments(args)?;
        let mut candidates = self.resolver.constructors(&name);
        if candidates.is_empty() {
            candidates.push(MethodInfo::constructor(name.clone(), Vec::new()));
        }
        let selection = self.select(&candidates, &args, "constructor".to_string(), &name, span)?;
        let args = self.pack_arguments(&selection, args, span)?;
        Ok(Typed::new(
            NodeKind::NewInstance {
                constructor: selection.method,
                outer,
                args,
            },
            JavaType::Class(name),
            span,
        ))
    }

    fn new_array(
        &mut self,
        ty: &TypeExpr<'a>,
        dims: &'a [&'a Expr<'a>],
        init: Option<&'a Expr<'a>>,
        span: &Span,
    ) -> BuildResult<Typed> {
        let array_ty = self.resolve_type(ty, span)?;
        match (dims, init) {
            ([dim], None) if ty.rank() == 1 => {
                let element = self.element_of(&array_ty, span)?;
                let length = self.expr(dim)?;
                let length = self.index_operand(length, "array dimension")?;
                Ok(Typed::new(
                    NodeKind::NewArray {
                        element,
                        length: Box::new(length),
                    },
                    array_ty,
                    span,
                ))
            }
            ([], Some(init)) => self.array_initializer(init, &array_ty),
            _ => Err(error(
                BuildErrorKind::Unsupported("multi-dimensional array creation"),
                span,
            )),
        }
    }

    fn element_of(&self, array_ty: &JavaType, span: &Span) -> BuildResult<JavaType> {
        array_ty.element_type().cloned().ok_or_else(|| {
            error(
                BuildErrorKind::UnexpectedType {
                    expected: "an array type".to_string(),
                    found: array_ty.clone(),
                },
                span,
            )
        })
    }

    fn array_initializer(&mut self, init: &'a Expr<'a>, array_ty: &JavaType) -> BuildResult<Typed> {
        let span = self.parsed.span_of(init);
        let element = self.element_of(array_ty, &span)?;
        let Expr::ArrayInit(items) = init else {
            let value = self.expr(init)?;
            let node = self.convert(value, array_ty, ConversionContext::Assignment { constant: None })?;
            return Ok(Typed {
                node,
                ty: array_ty.clone(),
                constant: None,
            });
        };
        let mut elements = Vec::with_capacity(items.len());
        for &item in items.iter() {
            let built = if matches!(item, Expr::ArrayInit(_)) {
                self.array_initializer(item, &element)?.node
            } else {
                let value = self.expr(item)?;
                let constant = value.constant;
                self.convert(value, &element, ConversionContext::Assignment { constant })?
            };
            elements.push(built);
        }
        Ok(Typed::new(
            NodeKind::ArrayInitializer { element, elements },
            array_ty.clone(),
            &span,
        ))
    }

    fn index(&mut self, target: &'a Expr<'a>, index: &'a Expr<'a>, span: &Span) -> BuildResult<Typed> {
        let array = self.expr(target)?;
        let element = match &array.ty {
            JavaType::Array(element) => (**element).clone(),
            other => {
                return Err(error(
                    BuildErrorKind::UnexpectedType {
                        expected: "an array".to_string(),
                        found: other.clone(),
                    },
                    span,
                ));
            }
        };
        let index = self.expr(index)?;
        let index = self.index_operand(index, "[]")?;
        Ok(Typed::new(
            NodeKind::ArrayAccess {
                array: Box::new(array.node),
                index: Box::new(index),
            },
            element,
            span,
        ))
    }

    fn unary(&mut self, op: UnaryOp, operand: &'a Expr<'a>, span: &Span) -> BuildResult<Typed> {
        let operand = self.expr(operand)?;
        let source = operand.ty.primitive_or_unboxed();
        let kind = match op {
            UnaryOp::Not => source.filter(|kind| *kind == PrimitiveKind::Boolean),
            UnaryOp::BitNot => source
                .filter(|kind| kind.is_integral())
                .and_then(promotion::unary_numeric_promotion),
            UnaryOp::Plus | UnaryOp::Neg => source.and_then(promotion::unary_numeric_promotion),
        };
        let Some(kind) = kind else {
            return Err(error(
                BuildErrorKind::BadOperand {
                    op: op.to_string(),
                    operand: operand.ty,
                },
                span,
            ));
        };
        let constant = match (kind, operand.constant) {
            (PrimitiveKind::Int, Some(c)) => match op {
                UnaryOp::Plus => Some(c),
                UnaryOp::Neg => Some(c.wrapping_neg()),
                UnaryOp::BitNot => Some(!c),
                UnaryOp::Not => None,
            },
            _ => None,
        };
        let operand = self.convert(operand, &JavaType::Primitive(kind), ConversionContext::Loose)?;
        Ok(Typed::new(
            NodeKind::UnaryOp {
                op,
                kind,
                operand: Box::new(operand),
            },
            JavaType::Primitive(kind),
            span,
        )
        .with_constant(constant))
    }

    fn require_variable(&self, target: &Typed, span: &Span) -> BuildResult<()> {
        if target.node.is_lvalue() {
            Ok(())
        } else {
            Err(error(BuildErrorKind::NotAssignable, span))
        }
    }

    fn increment(
        &mut self,
        op: IncrementOp,
        prefix: bool,
        target: &'a Expr<'a>,
        span: &Span,
    ) -> BuildResult<Typed> {
        let target = self.expr(target)?;
        self.require_variable(&target, span)?;
        if target.ty.numeric_kind().is_none() {
            return Err(error(
                BuildErrorKind::BadOperand {
                    op: op.to_string(),
                    operand: target.ty,
                },
                span,
            ));
        }
        let ty = target.ty.clone();
        let operation = self.with_slot(|builder, slot| {
            let current = Typed::new(NodeKind::Slot(slot), ty.clone(), span);
            let one = Typed::new(
                NodeKind::Literal(Constant::Value(Value::Int(1))),
                JavaType::int(),
                span,
            )
            .with_constant(Some(1));
            let result = builder.binary(op.binary_op(), current, one, span)?;
            builder.assign_back(result, &ty)
        })?;
        let target = Box::new(target.node);
        let operation = Box::new(operation);
        let kind = if prefix {
            NodeKind::CompoundAssignment { target, operation }
        } else {
            NodeKind::PostfixOp {
                op,
                target,
                operation,
            }
        };
        Ok(Typed::new(kind, ty, span))
    }

    fn binary(&self, op: BinaryOp, left: Typed, right: Typed, span: &Span) -> BuildResult<Typed> {
        let bad = |left: &Typed, right: &Typed| {
            error(
                BuildErrorKind::BadOperands {
                    op: op.to_string(),
                    left: left.ty.clone(),
                    right: right.ty.clone(),
                },
                span,
            )
        };

        if op == BinaryOp::Add && (left.ty.is_string() || right.ty.is_string()) {
            if left.ty == JavaType::Void || right.ty == JavaType::Void {
                return Err(bad(&left, &right));
            }
            return Ok(Typed::new(
                NodeKind::BinaryOp {
                    operation: BinaryOperation::Concat,
                    left: Box::new(left.node),
                    right: Box::new(right.node),
                },
                JavaType::string(),
                span,
            ));
        }

        let (lk, rk) = (left.ty.primitive_or_unboxed(), right.ty.primitive_or_unboxed());
        let both_boolean = lk == Some(PrimitiveKind::Boolean) && rk == Some(PrimitiveKind::Boolean);
        let (operation, left_kind, right_kind, result) = if op.is_shift() {
            let promote = |kind: Option<PrimitiveKind>| {
                kind.filter(|k| k.is_integral())
                    .and_then(promotion::unary_numeric_promotion)
            };
            match (promote(lk), promote(rk)) {
                (Some(l), Some(r)) => (BinaryOperation::Shift { op, kind: l }, l, r, l),
                _ => return Err(bad(&left, &right)),
            }
        } else if op.is_bitwise() && both_boolean {
            let kind = PrimitiveKind::Boolean;
            (BinaryOperation::Arithmetic { op, kind }, kind, kind, kind)
        } else {
            let kind = match (lk, rk) {
                (Some(l), Some(r)) if !op.is_bitwise() || (l.is_integral() && r.is_integral()) => {
                    promotion::binary_numeric_promotion(l, r)
                }
                _ => None,
            };
            match kind {
                Some(kind) => (BinaryOperation::Arithmetic { op, kind }, kind, kind, kind),
                None => return Err(bad(&left, &right)),
            }
        };

        let constant = match (result, left.constant, right.constant) {
            (PrimitiveKind::Int, Some(a), Some(b)) => fold_int(op, a, b),
            _ => None,
        };
        let left = self.convert(left, &JavaType::Primitive(left_kind), ConversionContext::Loose)?;
        let right = self.convert(right, &JavaType::Primitive(right_kind), ConversionContext::Loose)?;
        Ok(Typed::new(
            NodeKind::BinaryOp {
                operation,
                left: Box::new(left),
                right: Box::new(right),
            },
            JavaType::Primitive(result),
            span,
        )
        .with_constant(constant))
    }

    fn comparison(
        &self,
        op: ComparisonOp,
        left: Typed,
        right: Typed,
        span: &Span,
    ) -> BuildResult<Typed> {
        let bad = |left: &Typed, right: &Typed| {
            error(
                BuildErrorKind::BadOperands {
                    op: op.to_string(),
                    left: left.ty.clone(),
                    right: right.ty.clone(),
                },
                span,
            )
        };
        let primitive_side = left.ty.as_primitive().is_some() || right.ty.as_primitive().is_some();

        // Two references compare by identity, even when both are boxes.
        if op.is_equality() && !primitive_side {
            if !(left.ty.is_reference() && right.ty.is_reference()) {
                return Err(bad(&left, &right));
            }
            return Ok(Typed::new(
                NodeKind::BinaryOp {
                    operation: BinaryOperation::ReferenceEquality {
                        negated: op == ComparisonOp::Neq,
                    },
                    left: Box::new(left.node),
                    right: Box::new(right.node),
                },
                JavaType::boolean(),
                span,
            ));
        }

        let (lk, rk) = (left.ty.primitive_or_unboxed(), right.ty.primitive_or_unboxed());
        let kind = match (lk, rk) {
            (Some(PrimitiveKind::Boolean), Some(PrimitiveKind::Boolean)) if op.is_equality() => {
                Some(PrimitiveKind::Boolean)
            }
            (Some(l), Some(r)) => promotion::binary_numeric_promotion(l, r),
            _ => None,
        };
        let Some(kind) = kind else {
            return Err(bad(&left, &right));
        };
        let left = self.convert(left, &JavaType::Primitive(kind), ConversionContext::Loose)?;
        let right = self.convert(right, &JavaType::Primitive(kind), ConversionContext::Loose)?;
        Ok(Typed::new(
            NodeKind::BinaryOp {
                operation: BinaryOperation::Compare { op, kind },
                left: Box::new(left),
                right: Box::new(right),
            },
            JavaType::boolean(),
            span,
        ))
    }

    fn logical(
        &mut self,
        op: BoolOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        span: &Span,
    ) -> BuildResult<Typed> {
        let left = self.expr(left)?;
        let left = self.condition(left)?;
        let right = self.expr(right)?;
        let right = self.condition(right)?;
        let op = match op {
            BoolOp::And => LogicalOp::And,
            BoolOp::Or => LogicalOp::Or,
        };
        Ok(Typed::new(
            NodeKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            JavaType::boolean(),
            span,
        ))
    }

    /// Type of `c ? a : b`, with generic types erased.
    fn unify(&self, a: &JavaType, b: &JavaType) -> Option<JavaType> {
        if a == b {
            return (*a != JavaType::Void).then(|| a.clone());
        }
        match (a, b) {
            (JavaType::Void, _) | (_, JavaType::Void) => return None,
            (JavaType::Null, JavaType::Primitive(kind)) | (JavaType::Primitive(kind), JavaType::Null) => {
                return JavaType::Primitive(*kind).boxed();
            }
            (JavaType::Null, other) | (other, JavaType::Null) => return Some(other.clone()),
            _ => {}
        }
        match (a.primitive_or_unboxed(), b.primitive_or_unboxed()) {
            (Some(x), Some(y)) if x == y => return Some(JavaType::Primitive(x)),
            (Some(x), Some(y)) => {
                if let Some(kind) = promotion::binary_numeric_promotion(x, y) {
                    return Some(JavaType::Primitive(kind));
                }
            }
            _ => {}
        }
        if a.as_primitive().is_some() || b.as_primitive().is_some() {
            return Some(JavaType::object());
        }
        if self.resolver.is_subtype(a, b) {
            Some(b.clone())
        } else if self.resolver.is_subtype(b, a) {
            Some(a.clone())
        } else {
            Some(JavaType::object())
        }
    }

    fn conditional(
        &mut self,
        cond: &'a Expr<'a>,
        then_branch: &'a Expr<'a>,
        else_branch: &'a Expr<'a>,
        span: &Span,
    ) -> BuildResult<Typed> {
        let cond = self.expr(cond)?;
        let cond = self.condition(cond)?;
        let then_branch = self.expr(then_branch)?;
        let else_branch = self.expr(else_branch)?;
        let (ty, then_context, else_context) = match narrowed_conditional(&then_branch, &else_branch) {
            Some(ty) => (
                ty,
                ConversionContext::Assignment {
                    constant: then_branch.constant,
                },
                ConversionContext::Assignment {
                    constant: else_branch.constant,
                },
            ),
            None => match self.unify(&then_branch.ty, &else_branch.ty) {
                Some(ty) => (ty, ConversionContext::Loose, ConversionContext::Loose),
                None => {
                    return Err(error(
                        BuildErrorKind::BadOperands {
                            op: "?:".to_string(),
                            left: then_branch.ty,
                            right: else_branch.ty,
                        },
                        span,
                    ));
                }
            },
        };
        let then_branch = self.convert(then_branch, &ty, then_context)?;
        let else_branch = self.convert(else_branch, &ty, else_context)?;
        Ok(Typed::new(
            NodeKind::Conditional {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            ty,
            span,
        ))
    }

    fn assign(&mut self, target: &'a Expr<'a>, value: &'a Expr<'a>, span: &Span) -> BuildResult<Typed> {
        let target = self.expr(target)?;
        self.require_variable(&target, span)?;
        let value = self.expr(value)?;
        let constant = value.constant;
        let value = self.convert(value, &target.ty, ConversionContext::Assignment { constant })?;
        Ok(Typed::new(
            NodeKind::Assignment {
                target: Box::new(target.node),
                value: Box::new(value),
            },
            target.ty,
            span,
        ))
    }

    fn compound_assign(
        &mut self,
        op: BinaryOp,
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
        span: &Span,
    ) -> BuildResult<Typed> {
        let target = self.expr(target)?;
        self.require_variable(&target, span)?;
        let ty = target.ty.clone();
        let operation = self.with_slot(|builder, slot| {
            let current = Typed::new(NodeKind::Slot(slot), ty.clone(), span);
            let value = builder.expr(value)?;
            let result = builder.binary(op, current, value, span)?;
            builder.assign_back(result, &ty)
        })?;
        Ok(Typed::new(
            NodeKind::CompoundAssignment {
                target: Box::new(target.node),
                operation: Box::new(operation),
            },
            ty,
            span,
        ))
    }

    fn cast(&mut self, ty: &TypeExpr<'a>, operand: &'a Expr<'a>, span: &Span) -> BuildResult<Typed> {
        let target = self.resolve_type(ty, span)?;
        let value = self.expr(operand)?;
        let constant = match (value.constant, target.as_primitive()) {
            (
                Some(c),
                Some(kind @ (PrimitiveKind::Int | PrimitiveKind::Short | PrimitiveKind::Char | PrimitiveKind::Byte)),
            ) => cast_primitive(&Value::Int(c), kind)
                .ok()
                .and_then(|v| v.as_integral())
                .and_then(|v| i32::try_from(v).ok()),
            _ => None,
        };
        let node = self.convert(value, &target, ConversionContext::Cast)?;
        Ok(Typed {
            node,
            ty: target,
            constant,
        })
    }

    fn instance_of(
        &mut self,
        operand: &'a Expr<'a>,
        ty: &TypeExpr<'a>,
        binding: Option<&str>,
        span: &Span,
    ) -> BuildResult<Typed> {
        if binding.is_some() {
            return Err(error(
                BuildErrorKind::Unsupported("pattern binding in `instanceof`"),
                span,
            ));
        }
        let value = self.expr(operand)?;
        let target = self.resolve_type(ty, span)?;
        if !value.ty.is_reference() || !matches!(target, JavaType::Class(_) | JavaType::Array(_)) {
            return Err(error(
                BuildErrorKind::BadOperands {
                    op: "instanceof".to_string(),
                    left: value.ty,
                    right: target,
                },
                span,
            ));
        }
        plan_conversion(&value.ty, &target, ConversionContext::Cast, self.resolver)
            .map_err(|e| error(e, span))?;
        Ok(Typed::new(
            NodeKind::InstanceOf {
                operand: Box::new(value.node),
                ty: target,
            },
            JavaType::boolean(),
            span,
        ))
    }

    // --- Statements ---

    /// Build `stmt` into `out`; declarations without initializer add nothing.
    fn statement_into(&mut self, stmt: &'a Stmt<'a>, out: &mut Vec<EvaluatorNode>) -> BuildResult<()> {
        match stmt {
            Stmt::Empty => {}
            Stmt::LocalVar { ty, declarators } => {
                let span = self.parsed.stmt_span(stmt);
                for declarator in declarators.iter() {
                    out.extend(self.declare(ty, declarator, &span)?);
                }
            }
            _ => out.push(self.statement(stmt)?),
        }
        Ok(())
    }

    fn statement(&mut self, stmt: &'a Stmt<'a>) -> BuildResult<EvaluatorNode> {
        let span = self.parsed.stmt_span(stmt);
        let kind = match stmt {
            Stmt::Expr(expr) => return Ok(self.expr(expr)?.node),
            Stmt::LocalVar { .. } => return self.body(stmt),
            Stmt::Block(statements) => return self.block(statements, None, &span),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.expr(cond)?;
                let cond = self.condition(cond)?;
                let then_branch = self.body(then_branch)?;
                let else_branch = match else_branch {
                    Some(branch) => Some(Box::new(self.body(branch)?)),
                    None => None,
                };
                NodeKind::If {
                    cond: Box::new(cond),
                    then_branch: Box::new(then_branch),
                    else_branch,
                }
            }
            Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::ForEach { .. } => {
                return self.loop_statement(stmt, None);
            }
            Stmt::Labeled { label, body } => return self.labeled(label, body, &span),
            Stmt::Break(label) => {
                self.check_jump(Jump::Break, *label, &span)?;
                NodeKind::BreakContinue {
                    jump: Jump::Break,
                    label: label.map(String::from),
                }
            }
            Stmt::Continue(label) => {
                self.check_jump(Jump::Continue, *label, &span)?;
                NodeKind::BreakContinue {
                    jump: Jump::Continue,
                    label: label.map(String::from),
                }
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => Some(Box::new(self.expr(value)?.node)),
                    None => None,
                };
                NodeKind::Return(value)
            }
            Stmt::Throw(expr) => {
                let value = self.expr(expr)?;
                if !self
                    .resolver
                    .is_subtype(&value.ty, &JavaType::class(THROWABLE))
                {
                    return Err(error(
                        BuildErrorKind::UnexpectedType {
                            expected: THROWABLE.to_string(),
                            found: value.ty,
                        },
                        &span,
                    ));
                }
                NodeKind::Throw(Box::new(value.node))
            }
            Stmt::Try {
                has_resources,
                body,
                catches,
                finally,
            } => self.try_statement(*has_resources, body, catches, *finally, &span)?,
            Stmt::Empty => NodeKind::Block {
                label: None,
                scope: Vec::new(),
                statements: Vec::new(),
            },
            Stmt::Switch => {
                return Err(error(BuildErrorKind::Unsupported("switch statement"), &span));
            }
            Stmt::Synchronized => {
                return Err(error(
                    BuildErrorKind::Unsupported("synchronized statement"),
                    &span,
                ));
            }
            Stmt::LocalClass(_) => {
                return Err(error(
                    BuildErrorKind::Unsupported("local class declaration"),
                    &span,
                ));
            }
        };
        Ok(node(kind, &span))
    }

    /// A statement in the body of an `if` or a loop. A lone declaration gets
    /// a block of its own.
    fn body(&mut self, stmt: &'a Stmt<'a>) -> BuildResult<EvaluatorNode> {
        if !matches!(stmt, Stmt::LocalVar { .. }) {
            return self.statement(stmt);
        }
        let span = self.parsed.stmt_span(stmt);
        self.scopes.enter();
        let mut statements = Vec::new();
        self.statement_into(stmt, &mut statements)?;
        let scope = self.scopes.leave();
        Ok(node(
            NodeKind::Block {
                label: None,
                scope,
                statements,
            },
            &span,
        ))
    }

    fn block(
        &mut self,
        statements: &'a [&'a Stmt<'a>],
        label: Option<String>,
        span: &Span,
    ) -> BuildResult<EvaluatorNode> {
        self.scopes.enter();
        let mut nodes = Vec::with_capacity(statements.len());
        for &stmt in statements {
            self.statement_into(stmt, &mut nodes)?;
        }
        let scope = self.scopes.leave();
        Ok(node(
            NodeKind::Block {
                label,
                scope,
                statements: nodes,
            },
            span,
        ))
    }

    fn declare(
        &mut self,
        ty: &'a TypeExpr<'a>,
        declarator: &'a Declarator<'a>,
        span: &Span,
    ) -> BuildResult<Option<EvaluatorNode>> {
        let name = declarator.name;
        let cannot_infer = || error(BuildErrorKind::CannotInfer(name.to_string()), span);
        let (var_ty, init) = if self.is_var(ty) {
            let init = match declarator.init {
                Some(init) if declarator.dims == 0 && !matches!(init, Expr::ArrayInit(_)) => init,
                _ => return Err(cannot_infer()),
            };
            let value = self.expr(init)?;
            if matches!(value.ty, JavaType::Null | JavaType::Void) {
                return Err(cannot_infer());
            }
            (value.ty, Some(value.node))
        } else {
            let mut var_ty = self.resolve_type(ty, span)?;
            for _ in 0..declarator.dims {
                var_ty = JavaType::array_of(var_ty);
            }
            let init = match declarator.init {
                None => None,
                Some(init) if matches!(init, Expr::ArrayInit(_)) => {
                    Some(self.array_initializer(init, &var_ty)?.node)
                }
                Some(init) => {
                    let value = self.expr(init)?;
                    let constant = value.constant;
                    Some(self.convert(value, &var_ty, ConversionContext::Assignment { constant })?)
                }
            };
            (var_ty, init)
        };

        trace!(name, ty = %var_ty, "fragment variable declared");
        if self.scopes.declare(name, var_ty).is_err() {
            return Err(error(BuildErrorKind::DuplicateVariable(name.to_string()), span));
        }
        Ok(init.map(|value| {
            node(
                NodeKind::Assignment {
                    target: Box::new(node(
                        NodeKind::LocalVariableRef(LocalRef::Scoped(name.to_string())),
                        span,
                    )),
                    value: Box::new(value),
                },
                span,
            )
        }))
    }

    fn loop_body(&mut self, body: &'a Stmt<'a>, label: Option<&str>) -> BuildResult<EvaluatorNode> {
        self.jumps.push(JumpTarget {
            label: label.map(String::from),
            is_loop: true,
        });
        let body = self.body(body);
        self.jumps.pop();
        body
    }

    fn loop_statement(&mut self, stmt: &'a Stmt<'a>, label: Option<&str>) -> BuildResult<EvaluatorNode> {
        let span = self.parsed.stmt_span(stmt);
        let kind = match stmt {
            Stmt::While { cond, body } => {
                let cond = self.expr(cond)?;
                let cond = self.condition(cond)?;
                let body = self.loop_body(body, label)?;
                NodeKind::While {
                    label: label.map(String::from),
                    cond: Box::new(cond),
                    body: Box::new(body),
                }
            }
            Stmt::DoWhile { body, cond } => {
                let body = self.loop_body(body, label)?;
                let cond = self.expr(cond)?;
                let cond = self.condition(cond)?;
                NodeKind::DoWhile {
                    label: label.map(String::from),
                    body: Box::new(body),
                    cond: Box::new(cond),
                }
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                self.scopes.enter();
                let mut init_nodes = Vec::with_capacity(init.len());
                for &stmt in init.iter() {
                    self.statement_into(stmt, &mut init_nodes)?;
                }
                let cond = match cond {
                    Some(cond) => {
                        let cond = self.expr(cond)?;
                        Some(Box::new(self.condition(cond)?))
                    }
                    None => None,
                };
                let mut updates = Vec::with_capacity(update.len());
                for &expr in update.iter() {
                    updates.push(self.expr(expr)?.node);
                }
                let body = self.loop_body(body, label)?;
                let scope = self.scopes.leave();
                NodeKind::For {
                    label: label.map(String::from),
                    scope,
                    init: init_nodes,
                    cond,
                    update: updates,
                    body: Box::new(body),
                }
            }
            Stmt::ForEach {
                ty,
                name,
                iterable,
                body,
            } => self.for_each(ty, name, iterable, body, label, &span)?,
            _ => return self.statement(stmt),
        };
        Ok(node(kind, &span))
    }

    fn for_each(
        &mut self,
        ty: &'a TypeExpr<'a>,
        name: &str,
        iterable: &'a Expr<'a>,
        body: &'a Stmt<'a>,
        label: Option<&str>,
        span: &Span,
    ) -> BuildResult<NodeKind> {
        let iterable = self.expr(iterable)?;
        // Iterator elements are erased to Object and checked on the way out.
        let (raw, context) = match &iterable.ty {
            JavaType::Array(element) => (
                (**element).clone(),
                ConversionContext::Assignment { constant: None },
            ),
            JavaType::Class(class) if self.resolver.is_subclass(class, ITERABLE) => {
                (JavaType::object(), ConversionContext::Cast)
            }
            other => {
                return Err(error(
                    BuildErrorKind::UnexpectedType {
                        expected: format!("an array or {}", ITERABLE),
                        found: other.clone(),
                    },
                    span,
                ));
            }
        };
        let var_ty = if self.is_var(ty) {
            raw.clone()
        } else {
            self.resolve_type(ty, span)?
        };
        let element = self.with_slot(|builder, slot| {
            builder.convert(Typed::new(NodeKind::Slot(slot), raw, span), &var_ty, context)
        })?;

        self.scopes.enter();
        if self.scopes.declare(name, var_ty).is_err() {
            return Err(error(BuildErrorKind::DuplicateVariable(name.to_string()), span));
        }
        let body = self.loop_body(body, label);
        self.scopes.leave();
        Ok(NodeKind::ForEach {
            label: label.map(String::from),
            variable: name.to_string(),
            iterable: Box::new(iterable.node),
            element: Box::new(element),
            body: Box::new(body?),
        })
    }

    fn labeled(&mut self, label: &str, body: &'a Stmt<'a>, span: &Span) -> BuildResult<EvaluatorNode> {
        if self.jumps.has_label(label) {
            return Err(error(BuildErrorKind::DuplicateLabel(label.to_string()), span));
        }
        match body {
            Stmt::While { .. } | Stmt::DoWhile { .. } | Stmt::For { .. } | Stmt::ForEach { .. } => {
                self.loop_statement(body, Some(label))
            }
            _ => {
                self.jumps.push(JumpTarget {
                    label: Some(label.to_string()),
                    is_loop: false,
                });
                let inner = self.body(body);
                self.jumps.pop();
                Ok(node(
                    NodeKind::Block {
                        label: Some(label.to_string()),
                        scope: Vec::new(),
                        statements: vec![inner?],
                    },
                    span,
                ))
            }
        }
    }

    fn check_jump(&self, jump: Jump, label: Option<&str>, span: &Span) -> BuildResult<()> {
        let keyword = match jump {
            Jump::Break => "break",
            Jump::Continue => "continue",
        };
        match label {
            None if self.jumps.in_loop() => Ok(()),
            None => Err(error(BuildErrorKind::JumpOutsideLoop(keyword), span)),
            Some(label) => match self.jumps.find(label) {
                None => Err(error(BuildErrorKind::UndefinedLabel(label.to_string()), span)),
                Some(target) if jump == Jump::Continue && !target.is_loop => Err(error(
                    BuildErrorKind::NotALoopLabel(label.to_string()),
                    span,
                )),
                Some(_) => Ok(()),
            },
        }
    }

    fn try_statement(
        &mut self,
        has_resources: bool,
        body: &'a [&'a Stmt<'a>],
        catches: &'a [CatchClause<'a>],
        finally: Option<&'a [&'a Stmt<'a>]>,
        span: &Span,
    ) -> BuildResult<NodeKind> {
        if has_resources {
            return Err(error(
                BuildErrorKind::Unsupported("try-with-resources statement"),
                span,
            ));
        }
        let body = self.block(body, None, span)?;
        let mut clauses = Vec::with_capacity(catches.len());
        for clause in catches {
            clauses.push(self.catch_clause(clause, span)?);
        }
        let finally = match finally {
            Some(statements) => Some(Box::new(self.block(statements, None, span)?)),
            None => None,
        };
        Ok(NodeKind::Try {
            body: Box::new(body),
            catches: clauses,
            finally,
        })
    }

    fn catch_clause(&mut self, clause: &'a CatchClause<'a>, span: &Span) -> BuildResult<CatchNode> {
        let throwable = JavaType::class(THROWABLE);
        let mut types = Vec::with_capacity(clause.types.len());
        for ty in clause.types {
            let ty = self.resolve_type(ty, span)?;
            if !self.resolver.is_subtype(&ty, &throwable) {
                return Err(error(
                    BuildErrorKind::UnexpectedType {
                        expected: THROWABLE.to_string(),
                        found: ty,
                    },
                    span,
                ));
            }
            types.push(ty);
        }
        // A multi-catch variable is typed by the common supertype of the
        // alternatives; Throwable stands in for it.
        let variable_ty = match types.as_slice() {
            [single] => single.clone(),
            _ => throwable,
        };
        self.scopes.enter();
        if self.scopes.declare(clause.name, variable_ty).is_err() {
            return Err(error(
                BuildErrorKind::DuplicateVariable(clause.name.to_string()),
                span,
            ));
        }
        let body = self.block(clause.body, None, span);
        self.scopes.leave();
        Ok(CatchNode {
            types,
            variable: clause.name.to_string(),
            body: body?,
        })
    }
}

/// Fold an `int` operation on two constants; division by zero is left to
/// run time.
fn fold_int(op: BinaryOp, a: i32, b: i32) -> Option<i32> {
    match op {
        BinaryOp::Add => Some(a.wrapping_add(b)),
        BinaryOp::Sub => Some(a.wrapping_sub(b)),
        BinaryOp::Mul => Some(a.wrapping_mul(b)),
        BinaryOp::Div => (b != 0).then(|| a.wrapping_div(b)),
        BinaryOp::Rem => (b != 0).then(|| a.wrapping_rem(b)),
        BinaryOp::Shl => Some(a.wrapping_shl(b as u32)),
        BinaryOp::Shr => Some(a.wrapping_shr(b as u32)),
        BinaryOp::UShr => Some((a as u32).wrapping_shr(b as u32) as i32),
        BinaryOp::BitAnd => Some(a & b),
        BinaryOp::BitOr => Some(a | b),
        BinaryOp::BitXor => Some(a ^ b),
    }
}

/// `c ? 'a' : 0` keeps the `byte`, `short` or `char` operand's type when the
/// other operand is an `int` constant representable in it.
fn narrowed_conditional(a: &Typed, b: &Typed) -> Option<JavaType> {
    let narrow = |operand: &Typed, constant: &Typed| {
        let kind = operand.ty.primitive_or_unboxed()?;
        (constant.ty == JavaType::int() && fits_constant(PrimitiveKind::Int, kind, constant.constant))
            .then_some(JavaType::Primitive(kind))
    };
    narrow(a, b).or_else(|| narrow(b, a))
}
