//! Join predicates in the shape the emitter consumes.
//!
//! A relationship query is flattened into its top-level conjuncts and
//! split into equality terms between the two objects, range terms on a
//! single attribute, and whatever is left over as a residual filter.

use serde::Serialize;

use crate::dsl::{AttributeRef, Expr, Operand, RelOp, Spanned};
use crate::semantic::relationship::bind::{role_of, Role};
use crate::semantic::relationship::EqualityPair;

/// `attribute op bound`, with the attribute always on the left.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeTerm {
    pub attribute: AttributeRef,
    pub op: RelOp,
    pub bound: Operand,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinPredicate {
    pub equalities: Vec<EqualityPair>,
    pub ranges: Vec<RangeTerm>,
    pub residual: Option<Expr>,
}

fn is_range(op: RelOp) -> bool {
    matches!(op, RelOp::Lt | RelOp::Gt | RelOp::LtEq | RelOp::GtEq)
}

impl JoinPredicate {
    /// Split `expr`, a query declared towards the object named `related`.
    pub fn build(expr: &Expr, related: &str) -> Self {
        let mut equalities = Vec::new();
        let mut ranges = Vec::new();
        let mut residual: Vec<Spanned<Expr>> = Vec::new();

        for conjunct in expr.conjuncts() {
            if let Expr::Compare { left, op, right } = conjunct {
                match (&left.value, *op, &right.value) {
                    (Operand::Attribute(l), RelOp::Eq, Operand::Attribute(r)) => {
                        let pair = match (role_of(&l.owner, related), role_of(&r.owner, related)) {
                            (Role::This, Role::Related) => Some((l, r)),
                            (Role::Related, Role::This) => Some((r, l)),
                            _ => None,
                        };
                        if let Some((this, other)) = pair {
                            equalities.push(EqualityPair {
                                this_attribute: this.attribute.clone(),
                                related_attribute: other.attribute.clone(),
                            });
                            continue;
                        }
                    }
                    (Operand::Attribute(a), op, bound) if is_range(op) && bound.as_attribute().is_none() => {
                        ranges.push(RangeTerm {
                            attribute: a.clone(),
                            op,
                            bound: bound.clone(),
                        });
                        continue;
                    }
                    (bound, op, Operand::Attribute(a)) if is_range(op) && bound.as_attribute().is_none() => {
                        ranges.push(RangeTerm {
                            attribute: a.clone(),
                            op: op.flipped(),
                            bound: bound.clone(),
                        });
                        continue;
                    }
                    _ => {}
                }
            }
            residual.push(Spanned::detached(conjunct.clone()));
        }

        let residual = match residual.len() {
            0 => None,
            1 => residual.pop().map(|s| s.value),
            _ => Some(Expr::And(residual)),
        };
        Self {
            equalities,
            ranges,
            residual,
        }
    }
}
