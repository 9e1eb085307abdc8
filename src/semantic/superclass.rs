//! SuperclassResolve pass.
//!
//! Runs in hierarchy-depth order, so the superclass is already complete
//! when a subclass is merged with it. The merged attribute list keeps the
//! superclass order (an overriding attribute takes the superclass slot)
//! followed by attributes only the subclass declares; nullable ordinals
//! are reassigned over the merged list, so inherited attributes keep their
//! superclass positions.

use crate::model::types::SuperclassKind;

use super::attribute::{assign_nullable_ordinals, merge_with_superclass, AttributeKind};
use super::context::{ObjectId, ResolutionContext};
use super::object::RelationshipSource;

pub fn resolve_superclass(ctx: &mut ResolutionContext, id: ObjectId) -> Vec<String> {
    let Some(super_id) = ctx.object(id).superclass else {
        return Vec::new();
    };
    let parent = ctx.object(super_id).clone();
    let object = ctx.object(id);
    let class = object.name.clone();
    let mut errors = Vec::new();

    if object.kind != parent.kind {
        errors.push(format!(
            "{} is {:?} but its superclass {} is {:?}",
            class, object.kind, parent.name, parent.kind
        ));
    }
    if object.superclass_kind != parent.superclass_kind && parent.superclass.is_some() {
        errors.push(format!(
            "{} uses {:?} mapping but its superclass {} uses {:?}",
            class, object.superclass_kind, parent.name, parent.superclass_kind
        ));
    }

    if let (Some(source), Some(own)) = (parent.source_attribute(), object.raw.source_attribute.as_ref()) {
        errors.push(format!(
            "source attribute {} of {} cannot be overridden by {} in {}",
            source.name, parent.name, own.name, class
        ));
    }
    for as_of in &object.as_of_attributes {
        if parent.as_of_attribute(&as_of.name).is_some() {
            errors.push(format!(
                "as of attribute {} in {} is already defined in superclass {}",
                as_of.name, class, parent.name
            ));
        }
    }

    // Attributes the subclass declared, minus anything the superclass owns
    // outright (its source attribute and as-of bounds).
    let own: Vec<_> = object
        .attributes
        .iter()
        .filter(|a| match &a.kind {
            AttributeKind::Source => parent.source_attribute().is_none(),
            AttributeKind::AsOfBound { as_of, .. } => parent.as_of_attribute(as_of).is_none(),
            AttributeKind::Scalar | AttributeKind::Embedded { .. } => true,
        })
        .cloned()
        .collect();

    let mut merged = Vec::with_capacity(parent.attributes.len() + own.len());
    for super_attr in &parent.attributes {
        match own.iter().find(|a| a.name == super_attr.name) {
            Some(_) if super_attr.is_source() => {
                errors.push(format!(
                    "source attribute {} of {} cannot be overridden in {}",
                    super_attr.name, parent.name, class
                ));
                let mut inherited = super_attr.clone();
                inherited.inherited = true;
                merged.push(inherited);
            }
            Some(sub_attr) => {
                let mut attr = sub_attr.clone();
                let raw = object.raw.attributes.iter().find(|r| r.name == attr.name);
                errors.extend(merge_with_superclass(&mut attr, raw, super_attr));
                merged.push(attr);
            }
            None => {
                let mut inherited = super_attr.clone();
                inherited.inherited = true;
                inherited.owning_relationship = None;
                merged.push(inherited);
            }
        }
    }
    for attr in own {
        if parent.attribute(&attr.name).is_none() {
            merged.push(attr);
        }
    }
    assign_nullable_ordinals(&mut merged);

    let mut as_of_attributes: Vec<_> = parent
        .as_of_attributes
        .iter()
        .map(|a| {
            let mut a = a.clone();
            a.inherited = true;
            a
        })
        .collect();
    as_of_attributes.extend(
        object
            .as_of_attributes
            .iter()
            .filter(|a| parent.as_of_attribute(&a.name).is_none())
            .cloned(),
    );

    let mut embedded_values = parent.embedded_values.clone();
    embedded_values.extend(
        object
            .embedded_values
            .iter()
            .filter(|e| !parent.embedded_values.iter().any(|p| p.nested_name == e.nested_name))
            .cloned(),
    );

    let mut relationship_sources: Vec<RelationshipSource> = parent
        .relationship_sources
        .iter()
        .filter(|p| !object.relationship_sources.iter().any(|r| r.raw.name == p.raw.name))
        .map(|p| RelationshipSource {
            raw: p.raw.clone(),
            inherited: true,
        })
        .collect();
    relationship_sources.extend(object.relationship_sources.iter().cloned());

    let inherit_null_init = object.raw.initialize_primitives_to_null.is_none();

    let object = ctx.object_mut(id);
    object.attributes = merged;
    object.as_of_attributes = as_of_attributes;
    object.embedded_values = embedded_values;
    object.relationship_sources = relationship_sources;
    if inherit_null_init {
        object.initialize_primitives_to_null = parent.initialize_primitives_to_null;
    }
    if parent.superclass_kind == SuperclassKind::TableForAllSubclasses {
        object.table = parent.table.clone();
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationSettings;
    use crate::model::raw::{RawAsOfAttribute, RawAttribute, RawObject, RawSchema, RawSourceAttribute};
    use crate::model::types::{ObjectKind, SemanticType};
    use crate::semantic::attribute::resolve_attributes;

    fn pk(name: &str, ty: SemanticType) -> RawAttribute {
        let mut a = RawAttribute::new(name, ty);
        a.primary_key = true;
        a
    }

    fn nullable(name: &str, ty: SemanticType) -> RawAttribute {
        let mut a = RawAttribute::new(name, ty);
        a.nullable = Some(true);
        a
    }

    fn prepare(objects: Vec<RawObject>) -> ResolutionContext {
        let mut ctx = ResolutionContext::new(
            RawSchema {
                objects,
                ..Default::default()
            },
            GenerationSettings::default(),
        );
        for id in ctx.processing_order() {
            let resolved = resolve_attributes(&ctx.object(id).raw).unwrap();
            let object = ctx.object_mut(id);
            object.attributes = resolved.attributes;
            object.as_of_attributes = resolved.as_of_attributes;
        }
        ctx
    }

    fn account() -> RawObject {
        RawObject {
            name: "Account".into(),
            attributes: vec![
                pk("id", SemanticType::Long),
                nullable("balance", SemanticType::Double),
                RawAttribute {
                    trim: Some(true),
                    ..RawAttribute::new("owner", SemanticType::String)
                },
            ],
            relationships: vec![crate::model::raw::RawRelationship {
                name: "branch".into(),
                related: "Branch".into(),
                query: "this.branchId = Branch.id".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_order_and_inherited_properties() {
        let savings = RawObject {
            name: "Savings".into(),
            superclass: Some("Account".into()),
            attributes: vec![
                nullable("rate", SemanticType::Double),
                RawAttribute::new("owner", SemanticType::String),
            ],
            ..Default::default()
        };
        let mut ctx = prepare(vec![account(), savings]);
        let id = ctx.lookup("Savings").unwrap();
        let errors = resolve_superclass(&mut ctx, id);
        assert!(errors.is_empty(), "{:?}", errors);

        let object = ctx.object(id);
        let names: Vec<&str> = object.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "balance", "owner", "rate"]);
        assert!(object.attribute("owner").unwrap().trim);
        assert!(object.attribute("balance").unwrap().inherited);
        assert!(!object.attribute("owner").unwrap().inherited);
        assert_eq!(object.attribute("balance").unwrap().nullable_ordinal, Some(0));
        assert_eq!(object.attribute("rate").unwrap().nullable_ordinal, Some(1));
        assert!(object.relationship_sources[0].inherited);
    }

    #[test]
    fn test_type_and_pk_disagreement() {
        let savings = RawObject {
            name: "Savings".into(),
            superclass: Some("Account".into()),
            attributes: vec![RawAttribute::new("id", SemanticType::Int)],
            ..Default::default()
        };
        let mut ctx = prepare(vec![account(), savings]);
        let errors = resolve_superclass(&mut ctx, ObjectId(1));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("java type for attribute 'id' does not match"));
        assert_eq!(errors[1], "attribute 'id' is a primaryKey in superclass");
    }

    #[test]
    fn test_source_override_and_kind_mismatch() {
        let mut base = account();
        base.source_attribute = Some(RawSourceAttribute {
            name: "region".into(),
            ty: SemanticType::String,
        });
        let savings = RawObject {
            name: "Savings".into(),
            kind: ObjectKind::ReadOnly,
            superclass: Some("Account".into()),
            source_attribute: Some(RawSourceAttribute {
                name: "zone".into(),
                ty: SemanticType::Int,
            }),
            ..Default::default()
        };
        let mut ctx = prepare(vec![base, savings]);
        let errors = resolve_superclass(&mut ctx, ObjectId(1));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("ReadOnly"));
        assert!(errors[1].contains("cannot be overridden"));
        let object = ctx.object(ObjectId(1));
        assert_eq!(object.source_attribute().unwrap().name, "region");
    }

    #[test]
    fn test_as_of_attributes_are_inherited() {
        let mut base = account();
        base.as_of_attributes.push(RawAsOfAttribute {
            name: "businessDate".into(),
            from_column: "FROM_Z".into(),
            to_column: "THRU_Z".into(),
            ..Default::default()
        });
        let savings = RawObject {
            name: "Savings".into(),
            superclass: Some("Account".into()),
            superclass_kind: SuperclassKind::TableForAllSubclasses,
            ..Default::default()
        };
        base.superclass_kind = SuperclassKind::TableForAllSubclasses;
        let mut ctx = prepare(vec![base, savings]);
        assert!(resolve_superclass(&mut ctx, ObjectId(1)).is_empty());
        let object = ctx.object(ObjectId(1));
        assert!(object.as_of_attribute("businessDate").unwrap().inherited);
        assert!(object.attribute("businessDateTo").is_some());
        assert_eq!(object.table, "ACCOUNT");
    }
}
