//! ForeignKeyDerive pass.
//!
//! Foreign keys are derived, never declared:
//!
//! - a relationship that is not from-many and joins on the full primary
//!   key of the declaring object gives the related object a key back to it;
//! - a to-one relationship that resolves through the related primary key
//!   gives the declaring object a key to the related object;
//! - a table-per-class subclass gets a key to its superclass table.
//!
//! Dated targets never get foreign keys (their primary key is not unique
//! over time), and a relationship declared with `foreign_key = false` is
//! skipped.

use serde::Serialize;

use crate::model::types::SuperclassKind;

use super::context::{ObjectId, ResolutionContext};
use super::object::ObjectType;
use super::relationship::{IndexResolution, Relationship};

/// A derived foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub name: String,
    pub target: String,
    pub target_table: String,
    /// (local column, target column), in target primary key order.
    pub columns: Vec<(String, String)>,
}

/// Pair every plain primary key attribute of `target` with the attribute
/// of `owner` joined to it. `None` unless the whole key is covered.
fn key_columns(
    owner: &ObjectType,
    target: &ObjectType,
    pairs: &[(String, String)],
) -> Option<Vec<(String, String)>> {
    let pk = target.plain_key(&target.primary_key_names());
    if pk.is_empty() {
        return None;
    }
    pk.iter()
        .map(|target_attr| {
            let (owner_attr, _) = pairs.iter().find(|(_, t)| t == target_attr)?;
            let local = owner.attribute(owner_attr)?.column.clone()?;
            let remote = target.attribute(target_attr)?.column.clone()?;
            Some((local, remote))
        })
        .collect()
}

/// Key on `rel.related` pointing back at the declaring object.
fn back_reference(ctx: &ResolutionContext, rel: &Relationship) -> Option<(ObjectId, ObjectId, Vec<(String, String)>)> {
    if rel.cardinality.is_from_many() || rel.is_reverse {
        return None;
    }
    let (this, related) = (ctx.object(rel.from), ctx.object(rel.related));
    let joined: Vec<String> = this.plain_key(&rel.this_attributes());
    let pk = this.plain_key(&this.primary_key_names());
    if pk.is_empty() || joined.len() != pk.len() || !pk.iter().all(|a| joined.contains(a)) {
        return None;
    }
    let pairs: Vec<(String, String)> = rel
        .analysis
        .equality_pairs
        .iter()
        .map(|p| (p.related_attribute.clone(), p.this_attribute.clone()))
        .collect();
    key_columns(related, this, &pairs).map(|c| (rel.related, rel.from, c))
}

/// Key on the declaring object pointing at `rel.related`.
fn forward_reference(ctx: &ResolutionContext, rel: &Relationship) -> Option<(ObjectId, ObjectId, Vec<(String, String)>)> {
    if rel.cardinality.is_to_many() || rel.analysis.index_resolution != IndexResolution::PrimaryKey {
        return None;
    }
    let (this, related) = (ctx.object(rel.from), ctx.object(rel.related));
    let pairs: Vec<(String, String)> = rel
        .analysis
        .equality_pairs
        .iter()
        .map(|p| (p.this_attribute.clone(), p.related_attribute.clone()))
        .collect();
    key_columns(this, related, &pairs).map(|c| (rel.from, rel.related, c))
}

fn superclass_reference(ctx: &ResolutionContext, id: ObjectId) -> Option<(ObjectId, ObjectId, Vec<(String, String)>)> {
    let object = ctx.object(id);
    let parent_id = object.superclass?;
    let parent = ctx.object(parent_id);
    if object.superclass_kind != SuperclassKind::TablePerClass || object.table == parent.table {
        return None;
    }
    let pairs: Vec<(String, String)> = parent
        .primary_key_names()
        .into_iter()
        .map(|n| (n.clone(), n))
        .collect();
    key_columns(object, parent, &pairs).map(|c| (id, parent_id, c))
}

fn add_foreign_key(ctx: &mut ResolutionContext, owner: ObjectId, target: ObjectId, columns: Vec<(String, String)>) {
    let (target_name, target_table, dated) = {
        let t = ctx.object(target);
        (t.name.clone(), t.table.clone(), t.is_dated())
    };
    if dated {
        return;
    }
    let object = ctx.object_mut(owner);
    if object
        .foreign_keys
        .iter()
        .any(|fk| fk.target == target_name && fk.columns == columns)
    {
        return;
    }
    let name = format!("{}_fk{}", object.table, object.foreign_keys.len());
    tracing::debug!(object = %object.name, foreign_key = %name, target = %target_name, "derived foreign key");
    object.foreign_keys.push(ForeignKey {
        name,
        target: target_name,
        target_table,
        columns,
    });
}

/// ForeignKeyDerive for the relationships declared on (or installed on) `id`.
pub fn derive_foreign_keys(ctx: &mut ResolutionContext, id: ObjectId) {
    let mut keys = Vec::new();
    keys.extend(superclass_reference(ctx, id));
    for rel in ctx.object(id).relationships.iter().filter(|r| r.foreign_key) {
        keys.extend(back_reference(ctx, rel));
        keys.extend(forward_reference(ctx, rel));
    }
    for (owner, target, columns) in keys {
        add_foreign_key(ctx, owner, target, columns);
    }
}
