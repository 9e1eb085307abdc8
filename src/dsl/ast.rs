//! AST for relationship queries.
//!
//! A query is a boolean expression over attribute references qualified by
//! `this` (the declaring object) or an object type name. Every node carries
//! its source span so that binding errors can point back into the query
//! text. `Display` renders a node back into canonical query text; the
//! reverse-relationship synthesizer relies on that rendering being
//! re-parseable.

use serde::Serialize;
use std::fmt;

use super::span::{Span, Spanned};

/// The qualifier of an attribute reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Owner {
    /// `this.attr`
    This,
    /// `Type.attr`
    Type(String),
}

impl Owner {
    pub fn is_this(&self) -> bool {
        matches!(self, Owner::This)
    }

    pub fn type_name(&self) -> Option<&str> {
        match self {
            Owner::This => None,
            Owner::Type(name) => Some(name),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::This => write!(f, "this"),
            Owner::Type(name) => write!(f, "{}", name),
        }
    }
}

/// A qualified attribute reference (`this.customerId`, `Customer.id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeRef {
    pub owner: Owner,
    pub attribute: String,
}

impl AttributeRef {
    pub fn new(owner: Owner, attribute: impl Into<String>) -> Self {
        Self {
            owner,
            attribute: attribute.into(),
        }
    }

    pub fn this(attribute: impl Into<String>) -> Self {
        Self::new(Owner::This, attribute)
    }

    pub fn of(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::new(Owner::Type(type_name.into()), attribute)
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.attribute)
    }
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    String(String),
    /// Numeric text as written; interpretation depends on the bound attribute.
    Number(String),
    Boolean(bool),
    /// `{name}`: a value supplied when the relationship is navigated.
    Param(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) if s.contains('"') => write!(f, "'{}'", s),
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Param(p) => write!(f, "{{{}}}", p),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelOp {
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
}

impl RelOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            RelOp::Eq => "=",
            RelOp::NotEq => "!=",
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::LtEq => "<=",
            RelOp::GtEq => ">=",
        }
    }

    /// The operator that keeps the comparison true when its operands swap sides.
    pub fn flipped(&self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Eq,
            RelOp::NotEq => RelOp::NotEq,
            RelOp::Lt => RelOp::Gt,
            RelOp::Gt => RelOp::Lt,
            RelOp::LtEq => RelOp::GtEq,
            RelOp::GtEq => RelOp::LtEq,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operand {
    Attribute(AttributeRef),
    Literal(Literal),
}

impl Operand {
    pub fn as_attribute(&self) -> Option<&AttributeRef> {
        match self {
            Operand::Attribute(r) => Some(r),
            Operand::Literal(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Attribute(r) => write!(f, "{}", r),
            Operand::Literal(l) => write!(f, "{}", l),
        }
    }
}

/// A query expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// `left op right`
    Compare {
        left: Spanned<Operand>,
        op: RelOp,
        right: Spanned<Operand>,
    },
    /// `attr in (v, ...)` / `attr not in (v, ...)`
    In {
        attribute: Spanned<AttributeRef>,
        negated: bool,
        values: Vec<Spanned<Literal>>,
    },
    /// `attr is null` / `attr is not null`
    IsNull {
        attribute: Spanned<AttributeRef>,
        negated: bool,
    },
    /// `attr equalsEdgePoint`: matches the open edge of a validity interval.
    EqualsEdgePoint { attribute: Spanned<AttributeRef> },
    And(Vec<Spanned<Expr>>),
    Or(Vec<Spanned<Expr>>),
}

impl Expr {
    /// Top-level conjuncts; a non-`And` expression is its own single conjunct.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(items) => items.iter().flat_map(|i| i.value.conjuncts()).collect(),
            other => vec![other],
        }
    }

    /// Visit every attribute reference, with its span, in source order.
    pub fn for_each_ref<'a>(&'a self, f: &mut impl FnMut(&'a AttributeRef, &'a Span)) {
        match self {
            Expr::Compare { left, right, .. } => {
                for side in [left, right] {
                    if let Operand::Attribute(r) = &side.value {
                        f(r, &side.span);
                    }
                }
            }
            Expr::In { attribute, .. }
            | Expr::IsNull { attribute, .. }
            | Expr::EqualsEdgePoint { attribute } => f(&attribute.value, &attribute.span),
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.value.for_each_ref(f);
                }
            }
        }
    }

    /// All attribute references, cloned, in source order.
    pub fn refs(&self) -> Vec<AttributeRef> {
        let mut out = Vec::new();
        self.for_each_ref(&mut |r, _| out.push(r.clone()));
        out
    }

    /// All `{param}` names, in source order.
    pub fn params(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_params(&mut out);
        out
    }

    fn collect_params(&self, out: &mut Vec<String>) {
        fn push(l: &Literal, out: &mut Vec<String>) {
            if let Literal::Param(p) = l {
                out.push(p.clone());
            }
        }
        match self {
            Expr::Compare { left, right, .. } => {
                for side in [&left.value, &right.value] {
                    if let Operand::Literal(l) = side {
                        push(l, out);
                    }
                }
            }
            Expr::In { values, .. } => values.iter().for_each(|v| push(&v.value, out)),
            Expr::IsNull { .. } | Expr::EqualsEdgePoint { .. } => {}
            Expr::And(items) | Expr::Or(items) => {
                for item in items {
                    item.value.collect_params(out);
                }
            }
        }
    }

    /// Rebuild the expression with every attribute reference rewritten.
    pub fn map_refs(&self, f: &mut impl FnMut(&AttributeRef) -> AttributeRef) -> Expr {
        let map_operand = |o: &Spanned<Operand>, f: &mut dyn FnMut(&AttributeRef) -> AttributeRef| {
            let value = match &o.value {
                Operand::Attribute(r) => Operand::Attribute(f(r)),
                Operand::Literal(l) => Operand::Literal(l.clone()),
            };
            Spanned::new(value, o.span.clone())
        };
        match self {
            Expr::Compare { left, op, right } => Expr::Compare {
                left: map_operand(left, &mut *f),
                op: *op,
                right: map_operand(right, &mut *f),
            },
            Expr::In {
                attribute,
                negated,
                values,
            } => Expr::In {
                attribute: Spanned::new(f(&attribute.value), attribute.span.clone()),
                negated: *negated,
                values: values.clone(),
            },
            Expr::IsNull { attribute, negated } => Expr::IsNull {
                attribute: Spanned::new(f(&attribute.value), attribute.span.clone()),
                negated: *negated,
            },
            Expr::EqualsEdgePoint { attribute } => Expr::EqualsEdgePoint {
                attribute: Spanned::new(f(&attribute.value), attribute.span.clone()),
            },
            Expr::And(items) => Expr::And(
                items
                    .iter()
                    .map(|i| Spanned::new(i.value.map_refs(f), i.span.clone()))
                    .collect(),
            ),
            Expr::Or(items) => Expr::Or(
                items
                    .iter()
                    .map(|i| Spanned::new(i.value.map_refs(f), i.span.clone()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { left, op, right } => write!(f, "{} {} {}", left.value, op, right.value),
            Expr::In {
                attribute,
                negated,
                values,
            } => {
                let list: Vec<String> = values.iter().map(|v| v.value.to_string()).collect();
                let kw = if *negated { "not in" } else { "in" };
                write!(f, "{} {} ({})", attribute.value, kw, list.join(", "))
            }
            Expr::IsNull { attribute, negated } => {
                let kw = if *negated { "is not null" } else { "is null" };
                write!(f, "{} {}", attribute.value, kw)
            }
            Expr::EqualsEdgePoint { attribute } => write!(f, "{} equalsEdgePoint", attribute.value),
            Expr::And(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|i| match &i.value {
                        Expr::Or(_) => format!("({})", i.value),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "{}", parts.join(" and "))
            }
            Expr::Or(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.value.to_string()).collect();
                write!(f, "{}", parts.join(" or "))
            }
        }
    }
}
