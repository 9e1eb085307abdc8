//! The frozen model handed to the emitter.
//!
//! [`freeze`] runs once, after every validation pass has succeeded. It
//! computes every derived fact (null-bit layouts, off-heap records,
//! prefix-free physical indices, accessor names and join predicates) and
//! copies them into plain owned values. A [`ResolvedModel`] is never
//! mutated afterwards and can be shared freely between threads.

pub mod accessors;
pub mod predicate;

use std::collections::HashMap;

use serde::Serialize;

use crate::model::types::{ObjectKind, SemanticType, SuperclassKind};
use crate::semantic::attribute::{AsOfAttribute, Attribute};
use crate::semantic::context::ResolutionContext;
use crate::semantic::embedded::EmbeddedValue;
use crate::semantic::error::Warning;
use crate::semantic::foreign_keys::ForeignKey;
use crate::semantic::index::{prefix_free, Index, PhysicalIndex};
use crate::semantic::layout::{
    fingerprint, off_heap_layout, on_heap_layout, LayoutError, OffHeapField, OffHeapLayout, OnHeapLayout,
};
use crate::semantic::object::ObjectType;
use crate::semantic::relationship::Relationship;

pub use accessors::{Accessors, NullBitExpr};
pub use predicate::{JoinPredicate, RangeTerm};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedAttribute {
    #[serde(flatten)]
    pub attribute: Attribute,
    pub accessors: Accessors,
    /// Null flag expressions for nullable primitives.
    pub null_check: Option<NullBitExpr>,
    /// Shadow flag expressions for mutable primary keys.
    pub shadow_null_check: Option<NullBitExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRelationship {
    #[serde(flatten)]
    pub relationship: Relationship,
    pub predicate: JoinPredicate,
    pub reverse_predicate: Option<JoinPredicate>,
    /// Attributes on either side this relationship writes when assigned.
    pub owned_attributes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedObject {
    pub name: String,
    pub package: String,
    pub qualified_name: String,
    pub kind: ObjectKind,
    pub table: String,
    pub superclass: Option<String>,
    pub superclass_kind: SuperclassKind,
    pub is_abstract: bool,
    pub attributes: Vec<ResolvedAttribute>,
    pub as_of_attributes: Vec<AsOfAttribute>,
    pub embedded_values: Vec<EmbeddedValue>,
    pub relationships: Vec<ResolvedRelationship>,
    /// Logical indices, primary key first.
    pub indices: Vec<Index>,
    pub physical_indices: Vec<PhysicalIndex>,
    pub foreign_keys: Vec<ForeignKey>,
    pub initialize_primitives_to_null: bool,
    pub on_heap: OnHeapLayout,
    pub off_heap: Option<OffHeapLayout>,
    /// Fingerprint of the on-heap layout.
    pub layout_fingerprint: String,
}

impl ResolvedObject {
    pub fn attribute(&self, name: &str) -> Option<&ResolvedAttribute> {
        self.attributes.iter().find(|a| a.attribute.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&ResolvedRelationship> {
        self.relationships.iter().find(|r| r.relationship.name == name)
    }

    pub fn is_dated(&self) -> bool {
        !self.as_of_attributes.is_empty()
    }
}

/// The immutable output of a successful compilation.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedModel {
    objects: Vec<ResolvedObject>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
    warnings: Vec<Warning>,
}

impl ResolvedModel {
    /// Objects in (hierarchy depth, name) order.
    pub fn objects(&self) -> &[ResolvedObject] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&ResolvedObject> {
        self.by_name.get(name).map(|&i| &self.objects[i])
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}

// ============================================================================
// Freeze
// ============================================================================

/// Off-heap records need fixed-width, non-composite attributes and only
/// pay off for dated objects.
fn wants_off_heap(object: &ObjectType) -> bool {
    object.off_heap_requested
        && object.is_dated()
        && !object.attributes.iter().any(|a| {
            a.is_embedded() || matches!(a.ty, SemanticType::Decimal | SemanticType::ByteArray)
        })
}

fn freeze_attributes(object: &ObjectType) -> Result<(Vec<Attribute>, OnHeapLayout, Option<OffHeapLayout>), LayoutError> {
    let mut attributes = object.attributes.clone();

    let mut nullable: Vec<&Attribute> = attributes.iter().filter(|a| a.nullable_ordinal.is_some()).collect();
    nullable.sort_by_key(|a| a.nullable_ordinal);
    let nullable_names: Vec<String> = nullable.iter().map(|a| a.name.clone()).collect();
    let mutable_pk: Vec<String> = nullable
        .iter()
        .filter(|a| a.mutable_primary_key)
        .map(|a| a.name.clone())
        .collect();
    let on_heap = on_heap_layout(&nullable_names, &mutable_pk, object.initialize_primitives_to_null);

    let off_heap = if wants_off_heap(object) {
        let fields: Vec<OffHeapField> = attributes
            .iter()
            .map(|a| OffHeapField {
                name: a.name.clone(),
                ty: a.ty,
                primary_key: a.primary_key,
                nullable: a.nullable,
                is_source: a.is_source(),
            })
            .collect();
        Some(off_heap_layout(&fields, object.is_dated())?)
    } else {
        None
    };

    for attr in &mut attributes {
        attr.null_bit = on_heap.bit(&attr.name);
        attr.shadow_null_bit = on_heap.shadow_bit(&attr.name);
        attr.off_heap = off_heap.as_ref().and_then(|l| l.slot(&attr.name));
    }
    Ok((attributes, on_heap, off_heap))
}

fn owned_by(ctx: &ResolutionContext, rel: &Relationship) -> Vec<String> {
    let mut owned = Vec::new();
    for id in [rel.from, rel.related] {
        for attr in &ctx.object(id).attributes {
            if let Some(owner) = &attr.owning_relationship {
                if owner.object == rel.from_name && owner.relationship == rel.name {
                    owned.push(format!("{}.{}", ctx.object(id).name, attr.name));
                }
            }
        }
        if rel.from == rel.related {
            break;
        }
    }
    owned
}

fn freeze_relationship(ctx: &ResolutionContext, rel: &Relationship) -> ResolvedRelationship {
    ResolvedRelationship {
        predicate: JoinPredicate::build(&rel.ast.value, &rel.related_name),
        reverse_predicate: rel
            .reverse_ast
            .as_ref()
            .map(|ast| JoinPredicate::build(&ast.value, &rel.from_name)),
        owned_attributes: owned_by(ctx, rel),
        relationship: rel.clone(),
    }
}

fn freeze_object(ctx: &ResolutionContext, object: &ObjectType) -> Result<ResolvedObject, LayoutError> {
    let (attributes, on_heap, off_heap) = freeze_attributes(object)?;
    let attributes = attributes
        .into_iter()
        .map(|attribute| ResolvedAttribute {
            accessors: Accessors::for_attribute(&attribute),
            null_check: attribute.null_bit.map(NullBitExpr::new),
            shadow_null_check: attribute.shadow_null_bit.map(NullBitExpr::new),
            attribute,
        })
        .collect();
    let layout_fingerprint = fingerprint(&on_heap)?;

    Ok(ResolvedObject {
        name: object.name.clone(),
        package: object.package.clone(),
        qualified_name: object.qualified_name(),
        kind: object.kind,
        table: object.table.clone(),
        superclass: object.superclass.map(|id| ctx.object(id).name.clone()),
        superclass_kind: object.superclass_kind,
        is_abstract: object.is_abstract,
        attributes,
        as_of_attributes: object.as_of_attributes.clone(),
        embedded_values: object.embedded_values.clone(),
        relationships: object
            .relationships
            .iter()
            .map(|r| freeze_relationship(ctx, r))
            .collect(),
        indices: object.indices.clone(),
        physical_indices: prefix_free(object),
        foreign_keys: object.foreign_keys.clone(),
        initialize_primitives_to_null: object.initialize_primitives_to_null,
        on_heap,
        off_heap,
        layout_fingerprint,
    })
}

/// Compute every derived fact and produce the immutable model.
pub fn freeze(ctx: &ResolutionContext, warnings: Vec<Warning>) -> Result<ResolvedModel, LayoutError> {
    let mut objects = Vec::with_capacity(ctx.len());
    let mut by_name = HashMap::new();
    for id in ctx.processing_order() {
        let object = freeze_object(ctx, ctx.object(id))?;
        tracing::debug!(
            object = %object.name,
            holders = object.on_heap.holders.len(),
            off_heap = object.off_heap.is_some(),
            indices = object.physical_indices.len(),
            "froze object"
        );
        by_name.insert(object.name.clone(), objects.len());
        objects.push(object);
    }
    Ok(ResolvedModel {
        objects,
        by_name,
        warnings,
    })
}
