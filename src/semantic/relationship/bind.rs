//! Reference binding for relationship queries.
//!
//! Every attribute reference is checked against the object it names:
//! `this` is the declaring object, the related type name is the related
//! object, and any other type name must be a known object (a third object
//! joined in). Binding also enforces the structural rules a join must
//! satisfy before it can be classified.

use std::collections::BTreeSet;

use crate::dsl::{AttributeRef, Expr, Literal, Operand, Owner, RelOp, Spanned};
use crate::model::types::SemanticType;
use crate::semantic::context::ResolutionContext;
use crate::semantic::object::{Field, ObjectType};

/// Which object a reference resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role<'a> {
    This,
    Related,
    Other(&'a str),
}

/// Role of an owner as seen from a relationship declared towards `related`.
pub fn role_of<'a>(owner: &'a Owner, related: &str) -> Role<'a> {
    match owner {
        Owner::This => Role::This,
        Owner::Type(t) if t == related => Role::Related,
        Owner::Type(t) => Role::Other(t),
    }
}

pub struct Binder<'a> {
    ctx: &'a ResolutionContext,
    this: &'a ObjectType,
    related: &'a ObjectType,
    errors: Vec<String>,
}

impl<'a> Binder<'a> {
    pub fn new(ctx: &'a ResolutionContext, this: &'a ObjectType, related: &'a ObjectType) -> Self {
        Self {
            ctx,
            this,
            related,
            errors: Vec::new(),
        }
    }

    /// Bind `expr`, returning every problem found.
    pub fn bind(mut self, expr: &Expr) -> Vec<String> {
        let refs = expr.refs();
        let mut mentions_this = false;
        let mut mentions_related = false;
        for r in &refs {
            match role_of(&r.owner, &self.related.name) {
                Role::This => mentions_this = true,
                Role::Related => mentions_related = true,
                Role::Other(_) => {}
            }
        }
        if !mentions_this {
            self.errors
                .push("relationship query does not have any relational expression involving 'this'".to_string());
        }
        if !mentions_related {
            self.errors.push(format!(
                "relationship query does not have any relational expression involving the related object: {}",
                self.related.name
            ));
        }

        let mut reported = BTreeSet::new();
        for r in &refs {
            if let Err(message) = self.resolve(r) {
                if reported.insert(message.clone()) {
                    self.errors.push(message);
                }
            }
        }

        self.check(expr);
        self.errors
    }

    fn object_for(&self, owner: &Owner) -> Result<&'a ObjectType, String> {
        match role_of(owner, &self.related.name) {
            Role::This => Ok(self.this),
            Role::Related => Ok(self.related),
            Role::Other(name) => self
                .ctx
                .lookup(name)
                .map(|id| self.ctx.object(id))
                .ok_or_else(|| {
                    format!(
                        "object {} in relationship query is not defined; it may be missing from the schema manifest",
                        name
                    )
                }),
        }
    }

    fn resolve(&self, r: &AttributeRef) -> Result<Field<'a>, String> {
        let object = self.object_for(&r.owner)?;
        object.field(&r.attribute).ok_or_else(|| {
            format!(
                "attribute {} in relationship query does not exist in {}; it may be missing from the schema manifest",
                r.attribute, object.name
            )
        })
    }

    fn ty(&self, r: &AttributeRef) -> Option<SemanticType> {
        self.resolve(r).ok().map(|f| f.ty())
    }

    fn check(&mut self, expr: &Expr) {
        match expr {
            Expr::Compare { left, op, right } => self.check_compare(left, *op, right),
            Expr::In { attribute, values, .. } => {
                for value in values {
                    self.check_literal(&attribute.value, &value.value);
                }
            }
            Expr::IsNull { .. } => {}
            Expr::EqualsEdgePoint { attribute } => {
                if !self.resolve(&attribute.value).is_ok_and(|f| f.is_as_of()) {
                    self.errors.push(format!(
                        "equalsEdgePoint can only be used with as of attributes: {}",
                        attribute.value
                    ));
                }
            }
            Expr::And(items) => {
                for item in items {
                    self.check(&item.value);
                }
            }
            Expr::Or(items) => {
                self.check_or(expr);
                for item in items {
                    self.check(&item.value);
                }
            }
        }
    }

    fn check_compare(&mut self, left: &Spanned<Operand>, op: RelOp, right: &Spanned<Operand>) {
        match (&left.value, &right.value) {
            (Operand::Attribute(l), Operand::Attribute(r)) => {
                if op == RelOp::Eq {
                    if let (Some(lt), Some(rt)) = (self.ty(l), self.ty(r)) {
                        if lt != rt {
                            self.errors.push(format!(
                                "cannot join {} ({}) to {} ({}): types differ",
                                l, lt, r, rt
                            ));
                        }
                    }
                }
            }
            (Operand::Attribute(a), Operand::Literal(lit)) | (Operand::Literal(lit), Operand::Attribute(a)) => {
                self.check_literal(a, lit);
            }
            (Operand::Literal(_), Operand::Literal(_)) => self.errors.push(format!(
                "comparison {} {} {} does not reference any attribute",
                left.value, op, right.value
            )),
        }
    }

    fn check_literal(&mut self, attribute: &AttributeRef, literal: &Literal) {
        let Some(ty) = self.ty(attribute) else {
            return;
        };
        let compatible = match literal {
            Literal::Param(_) => true,
            Literal::Boolean(_) => ty == SemanticType::Boolean,
            Literal::Number(_) => matches!(
                ty,
                SemanticType::Byte
                    | SemanticType::Short
                    | SemanticType::Int
                    | SemanticType::Long
                    | SemanticType::Float
                    | SemanticType::Double
                    | SemanticType::Decimal
            ),
            Literal::String(_) => matches!(ty, SemanticType::String | SemanticType::Char) || ty.is_temporal(),
        };
        if !compatible {
            self.errors.push(format!(
                "literal {} cannot be compared with {} of type {}",
                literal, attribute, ty
            ));
        }
    }

    /// An `or` must constrain a single object and must not join attributes.
    fn check_or(&mut self, expr: &Expr) {
        let mut owners = BTreeSet::new();
        expr.for_each_ref(&mut |r, _| {
            owners.insert(r.owner.clone());
        });
        let mut joins = false;
        check_no_joins(expr, &mut joins);
        if owners.len() > 1 || joins {
            self.errors.push(format!(
                "an 'or' expression must constrain a single object and cannot join attributes: ({})",
                expr
            ));
        }
    }
}

fn check_no_joins(expr: &Expr, joins: &mut bool) {
    match expr {
        Expr::Compare { left, right, .. } => {
            if left.value.as_attribute().is_some() && right.value.as_attribute().is_some() {
                *joins = true;
            }
        }
        Expr::And(items) | Expr::Or(items) => items.iter().for_each(|i| check_no_joins(&i.value, joins)),
        Expr::In { .. } | Expr::IsNull { .. } | Expr::EqualsEdgePoint { .. } => {}
    }
}
