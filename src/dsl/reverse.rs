//! Role swap for reverse relationships.
//!
//! A relationship declared on `From` towards `Related` is navigated
//! backwards by rewriting its query from the related object's point of
//! view: references owned by the declaring object (`this.x`) become
//! `From.x`, references owned by the related type (`Related.x`) become
//! `this.x`, and references to any third object are left untouched.

use super::ast::{AttributeRef, Expr, Owner};

/// Rewrite `expr` so that it reads from the related object's side.
pub fn swap_roles(expr: &Expr, from_type: &str, related_type: &str) -> Expr {
    expr.map_refs(&mut |r| swap_ref(r, from_type, related_type))
}

/// Render the reverse query text for `expr`.
///
/// The output is canonical query text and re-parses to an expression
/// structurally equal to [`swap_roles`] (ignoring spans).
pub fn reverse_text(expr: &Expr, from_type: &str, related_type: &str) -> String {
    swap_roles(expr, from_type, related_type).to_string()
}

fn swap_ref(r: &AttributeRef, from_type: &str, related_type: &str) -> AttributeRef {
    match &r.owner {
        Owner::This => AttributeRef::of(from_type, r.attribute.clone()),
        Owner::Type(t) if t == related_type => AttributeRef::this(r.attribute.clone()),
        Owner::Type(_) => r.clone(),
    }
}
