//! Join classification.
//!
//! A bound query is split into top-level conjuncts. An `=` between a
//! `this` attribute and a related attribute is an equality pair; an
//! `equalsEdgePoint` is neutral; everything else is a filter.

use std::collections::BTreeSet;

use crate::dsl::{Expr, Operand, RelOp};

use super::bind::{role_of, Role};
use super::{EqualityPair, IndexResolution, JoinAnalysis};

pub fn classify(expr: &Expr, related: &str) -> JoinAnalysis {
    let mut third_objects = BTreeSet::new();
    expr.for_each_ref(&mut |r, _| {
        if let Role::Other(name) = role_of(&r.owner, related) {
            third_objects.insert(name.to_string());
        }
    });

    let mut equality_pairs = Vec::new();
    let mut has_filters = false;
    for conjunct in expr.conjuncts() {
        match conjunct {
            Expr::Compare {
                left,
                op: RelOp::Eq,
                right,
            } => match equality_pair(&left.value, &right.value, related) {
                Some(pair) => {
                    if !equality_pairs.contains(&pair) {
                        equality_pairs.push(pair);
                    }
                }
                None => has_filters = true,
            },
            Expr::EqualsEdgePoint { .. } => {}
            _ => has_filters = true,
        }
    }

    let has_parameters = !expr.params().is_empty();
    let depends_only_on_from_to = third_objects.is_empty();
    JoinAnalysis {
        depends_only_on_from_to,
        third_objects: third_objects.into_iter().collect(),
        pure_equality: !has_filters && !equality_pairs.is_empty(),
        equality_pairs,
        has_filters,
        has_parameters,
        cacheable: depends_only_on_from_to && !has_parameters,
        index_resolution: IndexResolution::Scan,
    }
}

fn equality_pair(left: &Operand, right: &Operand, related: &str) -> Option<EqualityPair> {
    let (l, r) = (left.as_attribute()?, right.as_attribute()?);
    match (role_of(&l.owner, related), role_of(&r.owner, related)) {
        (Role::This, Role::Related) => Some(EqualityPair {
            this_attribute: l.attribute.clone(),
            related_attribute: r.attribute.clone(),
        }),
        (Role::Related, Role::This) => Some(EqualityPair {
            this_attribute: r.attribute.clone(),
            related_attribute: l.attribute.clone(),
        }),
        _ => None,
    }
}
