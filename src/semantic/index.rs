//! Index resolution.
//!
//! Three sources feed an object's logical index list:
//!
//! 1. The primary key, always first, named `primaryKey`.
//! 2. Declared indices, checked and linked to the primary key or an earlier
//!    index when they cover the same attribute set.
//! 3. Relationship-implied indices, added by the relationship pass on the
//!    related side of pure equality joins.
//!
//! At freeze the logical list is reduced to a prefix-free physical set
//! with deterministic names (see [`prefix_free`]).

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::context::{ObjectId, ResolutionContext};
use super::object::{Field, ObjectType};

/// Name of the primary key index.
pub const PRIMARY_KEY_INDEX: &str = "primaryKey";

/// Where an index came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IndexOrigin {
    PrimaryKey,
    Declared,
    /// Implied by the named relationship of another object.
    Relationship(String),
}

/// A logical index over attribute names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Index {
    pub name: String,
    pub attributes: Vec<String>,
    pub unique: bool,
    pub primary_key: bool,
    /// Covers the same attributes as the primary key.
    pub same_as_pk: bool,
    /// Earlier index covering the same attributes.
    pub same_index: Option<String>,
    pub origin: IndexOrigin,
}

impl Index {
    /// Not backed by its own physical index.
    pub fn is_redundant(&self) -> bool {
        self.same_as_pk || self.same_index.is_some()
    }
}

/// A physical index over column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhysicalIndex {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
    pub primary_key: bool,
    /// The logical index this was built from.
    pub logical: String,
}

/// Attribute set ignoring validity-interval and source attributes.
fn bare_set(object: &ObjectType, names: &[String]) -> BTreeSet<String> {
    object.plain_key(names).into_iter().collect()
}

/// IndexResolve pass: primary key plus declared indices.
pub fn resolve_indices(ctx: &mut ResolutionContext, id: ObjectId) -> Vec<String> {
    let object = ctx.object(id);
    let class = object.name.as_str();
    let mut errors = Vec::new();
    let mut indices: Vec<Index> = Vec::new();
    let source = object.source_attribute().map(|s| s.name.clone());

    let mut pk = object.primary_key_names();
    if !pk.is_empty() {
        pk.extend(source.clone());
        indices.push(Index {
            name: PRIMARY_KEY_INDEX.to_string(),
            attributes: pk.clone(),
            unique: true,
            primary_key: true,
            same_as_pk: false,
            same_index: None,
            origin: IndexOrigin::PrimaryKey,
        });
    }
    let pk_set = bare_set(object, &pk);

    for raw in &object.raw.indices {
        let mut ok = true;
        let mut seen = HashSet::new();
        let mut attributes = Vec::with_capacity(raw.attributes.len() + 1);
        for name in &raw.attributes {
            match object.field(name) {
                None => {
                    errors.push(format!("Could not resolve attribute {} for index {}", name, raw.name));
                    ok = false;
                }
                Some(Field::AsOf(_)) => {
                    errors.push(format!(
                        "Index '{}': AsOfAttributes ({}) are not allowed in an Index for dated objects",
                        raw.name, name
                    ));
                    ok = false;
                }
                Some(Field::Attribute(a)) if a.is_as_of_bound() => {
                    errors.push(format!(
                        "Index '{}': AsOfAttributes ({}) are not allowed in an Index for dated objects",
                        raw.name, name
                    ));
                    ok = false;
                }
                Some(Field::Attribute(_)) => {}
            }
            if !seen.insert(name.as_str()) {
                errors.push(format!("Index '{}': Attribute '{}' is duplicated", raw.name, name));
                ok = false;
            }
            attributes.push(name.clone());
        }
        if indices.iter().any(|i| i.name == raw.name) {
            errors.push(format!("duplicate index name {} in {}", raw.name, class));
            ok = false;
        }
        if !ok {
            continue;
        }
        if raw.unique {
            if let Some(source) = &source {
                if !attributes.contains(source) {
                    attributes.push(source.clone());
                }
            }
        }

        let set = bare_set(object, &attributes);
        let same_as_pk = !pk_set.is_empty() && set == pk_set;
        let same_index = if same_as_pk {
            Some(PRIMARY_KEY_INDEX.to_string())
        } else {
            indices
                .iter()
                .filter(|i| !i.primary_key && !i.is_redundant())
                .find(|i| bare_set(object, &i.attributes) == set && (i.unique || !raw.unique))
                .map(|i| i.name.clone())
        };
        indices.push(Index {
            name: raw.name.clone(),
            attributes,
            unique: raw.unique,
            primary_key: false,
            same_as_pk,
            same_index,
            origin: IndexOrigin::Declared,
        });
    }

    ctx.object_mut(id).indices = indices;
    errors
}

/// Add the index implied by `relationship` over `attributes` of `object`,
/// unless an existing index already covers the same attribute set.
///
/// Returns the name of the new index.
pub fn add_implied_index(object: &mut ObjectType, relationship: &str, attributes: &[String]) -> Option<String> {
    let mut bare: Vec<String> = object.plain_key(attributes);
    bare.sort();
    bare.dedup();
    if bare.is_empty() {
        return None;
    }
    let set: BTreeSet<String> = bare.iter().cloned().collect();
    if object.indices.iter().any(|i| bare_set(object, &i.attributes) == set) {
        return None;
    }

    let base = format!("{}Index", relationship);
    let mut name = base.clone();
    let mut n = 1;
    while object.index(&name).is_some() {
        name = format!("{}{}", base, n);
        n += 1;
    }
    object.indices.push(Index {
        name: name.clone(),
        attributes: bare,
        unique: false,
        primary_key: false,
        same_as_pk: false,
        same_index: None,
        origin: IndexOrigin::Relationship(relationship.to_string()),
    });
    Some(name)
}

fn columns_of(object: &ObjectType, attributes: &[String]) -> Vec<String> {
    attributes
        .iter()
        .filter_map(|n| object.attribute(n).and_then(|a| a.column.clone()))
        .collect()
}

fn is_prefix(short: &[String], long: &[String]) -> bool {
    short.len() <= long.len() && long[..short.len()] == *short
}

/// Reduce the logical indices of `object` to a prefix-free physical set.
///
/// The primary key (plus every as-of "to" column) is kept first as
/// `<table>_pk`. Unique indices, with the "to" columns appended, come next
/// in ascending column count and are always kept unless an index already
/// kept is a prefix of them, in which case their constraint is implied.
/// The remaining non-unique indices are ordered by descending column count
/// and then by column sequence, and kept only when no kept index is a
/// prefix of them and they are not a prefix of a kept index. Kept indices
/// are named `<table>_idx0`, `<table>_idx1`, ... in acceptance order.
pub fn prefix_free(object: &ObjectType) -> Vec<PhysicalIndex> {
    let to_columns: Vec<String> = object.as_of_attributes.iter().map(|a| a.to_column.clone()).collect();
    let mut kept: Vec<PhysicalIndex> = Vec::new();

    if let Some(pk) = object.primary_key_index() {
        let mut columns = columns_of(object, &pk.attributes);
        columns.extend(to_columns.iter().cloned());
        kept.push(PhysicalIndex {
            name: format!("{}_pk", object.table),
            columns,
            unique: true,
            primary_key: true,
            logical: pk.name.clone(),
        });
    }

    let (mut unique, mut others): (Vec<(Vec<String>, &Index)>, Vec<(Vec<String>, &Index)>) = object
        .indices
        .iter()
        .filter(|i| !i.primary_key && !i.is_redundant())
        .map(|i| {
            let mut columns = columns_of(object, &i.attributes);
            if i.unique {
                columns.extend(to_columns.iter().cloned());
            }
            (columns, i)
        })
        .filter(|(columns, _)| !columns.is_empty())
        .partition(|(_, i)| i.unique);
    unique.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    others.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut next = 0;
    let mut accept = |kept: &mut Vec<PhysicalIndex>, columns: Vec<String>, index: &Index| {
        kept.push(PhysicalIndex {
            name: format!("{}_idx{}", object.table, next),
            columns,
            unique: index.unique,
            primary_key: false,
            logical: index.name.clone(),
        });
        next += 1;
    };

    for (columns, index) in unique {
        if kept.iter().any(|k| is_prefix(&k.columns, &columns)) {
            continue;
        }
        accept(&mut kept, columns, index);
    }
    for (columns, index) in others {
        let clashes = kept
            .iter()
            .any(|k| is_prefix(&columns, &k.columns) || is_prefix(&k.columns, &columns));
        if clashes {
            continue;
        }
        accept(&mut kept, columns, index);
    }
    kept
}
