//! Attribute ownership.
//!
//! A relationship with a setter writes the join attributes on one side
//! when it is navigated and assigned. Those attributes are "owned" by the
//! relationship. When several relationships could own the same attribute,
//! a dependent relationship wins, then the shorter name, then the
//! lexicographically smaller name.

use std::collections::BTreeMap;

use crate::model::types::Cardinality;
use crate::semantic::attribute::RelationshipRef;
use crate::semantic::context::{ObjectId, ResolutionContext};
use crate::semantic::object::ObjectType;

use super::Relationship;

/// Which side of a relationship has its join attributes written.
fn owned_side(rel: &Relationship) -> Option<(ObjectId, Vec<String>)> {
    if !rel.has_setter || rel.analysis.has_filters || !rel.analysis.depends_only_on_from_to {
        return None;
    }
    let pairs = &rel.analysis.equality_pairs;
    match rel.cardinality {
        Cardinality::OneToMany => Some((rel.related, pairs.iter().map(|p| p.related_attribute.clone()).collect())),
        Cardinality::OneToOne if !rel.is_reverse => {
            Some((rel.related, pairs.iter().map(|p| p.related_attribute.clone()).collect()))
        }
        Cardinality::ManyToOne | Cardinality::OneToOne => {
            Some((rel.from, pairs.iter().map(|p| p.this_attribute.clone()).collect()))
        }
        Cardinality::ManyToMany => None,
    }
}

fn can_be_owned(object: &ObjectType, attribute: &str) -> bool {
    object
        .attribute(attribute)
        .is_some_and(|a| !a.is_source() && !a.is_as_of_bound())
}

fn precedes(a: &RelationshipRef, b: &RelationshipRef) -> bool {
    let key = |r: &RelationshipRef| (!r.related_is_dependent, r.relationship.len(), r.relationship.clone());
    key(a) < key(b)
}

/// Pick an owner for every attribute some relationship writes.
pub fn assign_owners(ctx: &mut ResolutionContext) {
    let mut owners: BTreeMap<(ObjectId, String), RelationshipRef> = BTreeMap::new();

    for object in ctx.objects() {
        for rel in &object.relationships {
            let Some((target, attributes)) = owned_side(rel) else {
                continue;
            };
            let candidate = RelationshipRef {
                object: object.name.clone(),
                relationship: rel.name.clone(),
                related_is_dependent: rel.related_is_dependent,
            };
            for attribute in attributes {
                if !can_be_owned(ctx.object(target), &attribute) {
                    continue;
                }
                owners
                    .entry((target, attribute))
                    .and_modify(|current| {
                        if precedes(&candidate, current) {
                            *current = candidate.clone();
                        }
                    })
                    .or_insert_with(|| candidate.clone());
            }
        }
    }

    for ((id, attribute), owner) in owners {
        tracing::trace!(
            object = %ctx.object(id).name,
            attribute = %attribute,
            relationship = %owner.relationship,
            "attribute owner"
        );
        if let Some(attr) = ctx.object_mut(id).attribute_mut(&attribute) {
            attr.owning_relationship = Some(owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(name: &str, dependent: bool) -> RelationshipRef {
        RelationshipRef {
            object: "Order".into(),
            relationship: name.into(),
            related_is_dependent: dependent,
        }
    }

    #[test]
    fn test_tie_break() {
        assert!(precedes(&owner("items", true), &owner("a", false)));
        assert!(precedes(&owner("ab", false), &owner("abc", false)));
        assert!(precedes(&owner("ab", false), &owner("ac", false)));
        assert!(!precedes(&owner("ac", false), &owner("ab", false)));
    }
}
