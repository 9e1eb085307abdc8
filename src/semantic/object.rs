//! The object type under resolution.

use crate::model::raw::{RawObject, RawRelationship};
use crate::model::types::{ObjectKind, SemanticType, SuperclassKind};

use super::attribute::{AsOfAttribute, Attribute};
use super::context::ObjectId;
use super::embedded::EmbeddedValue;
use super::foreign_keys::ForeignKey;
use super::index::Index;
use super::relationship::Relationship;

/// A relationship declaration waiting for the RelationshipCheck pass.
#[derive(Debug, Clone)]
pub struct RelationshipSource {
    pub raw: RawRelationship,
    /// Copied from the superclass.
    pub inherited: bool,
}

/// Something a query can name on an object: a stored attribute or a
/// validity-interval dimension.
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    Attribute(&'a Attribute),
    AsOf(&'a AsOfAttribute),
}

impl Field<'_> {
    pub fn ty(&self) -> SemanticType {
        match self {
            Field::Attribute(a) => a.ty,
            Field::AsOf(_) => SemanticType::Timestamp,
        }
    }

    pub fn is_as_of(&self) -> bool {
        matches!(self, Field::AsOf(_))
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Field::Attribute(a) if a.is_source())
    }
}

/// A persistent object type.
///
/// Created empty from its raw record and filled in pass by pass. After a
/// successful run it is frozen into a [`crate::resolved::ResolvedObject`].
#[derive(Debug, Clone)]
pub struct ObjectType {
    pub id: ObjectId,
    pub name: String,
    pub package: String,
    pub kind: ObjectKind,
    pub table: String,
    pub superclass: Option<ObjectId>,
    pub superclass_kind: SuperclassKind,
    pub is_abstract: bool,
    /// Number of superclasses above this object.
    pub depth: usize,
    pub attributes: Vec<Attribute>,
    pub as_of_attributes: Vec<AsOfAttribute>,
    pub embedded_values: Vec<EmbeddedValue>,
    pub relationship_sources: Vec<RelationshipSource>,
    pub relationships: Vec<Relationship>,
    pub indices: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub interfaces: Vec<String>,
    pub initialize_primitives_to_null: bool,
    pub off_heap_requested: bool,
    /// The record this object was built from.
    pub raw: RawObject,
}

impl ObjectType {
    pub fn new(id: ObjectId, raw: RawObject, table: String) -> Self {
        Self {
            id,
            name: raw.name.clone(),
            package: raw.package.clone(),
            kind: raw.kind,
            table,
            superclass: None,
            superclass_kind: raw.superclass_kind,
            is_abstract: raw.is_abstract,
            depth: 0,
            attributes: Vec::new(),
            as_of_attributes: Vec::new(),
            embedded_values: Vec::new(),
            relationship_sources: raw
                .relationships
                .iter()
                .map(|r| RelationshipSource {
                    raw: r.clone(),
                    inherited: false,
                })
                .collect(),
            relationships: Vec::new(),
            indices: Vec::new(),
            foreign_keys: Vec::new(),
            interfaces: raw.interfaces.clone(),
            initialize_primitives_to_null: false,
            off_heap_requested: false,
            raw,
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    pub fn as_of_attribute(&self, name: &str) -> Option<&AsOfAttribute> {
        self.as_of_attributes.iter().find(|a| a.name == name)
    }

    /// Look up a name as a query would see it.
    pub fn field(&self, name: &str) -> Option<Field<'_>> {
        self.as_of_attribute(name)
            .map(Field::AsOf)
            .or_else(|| self.attribute(name).map(Field::Attribute))
    }

    pub fn primary_key(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter().filter(|a| a.primary_key)
    }

    pub fn primary_key_names(&self) -> Vec<String> {
        self.primary_key().map(|a| a.name.clone()).collect()
    }

    pub fn source_attribute(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is_source())
    }

    pub fn is_dated(&self) -> bool {
        !self.as_of_attributes.is_empty()
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indices.iter().find(|i| i.name == name)
    }

    pub fn primary_key_index(&self) -> Option<&Index> {
        self.indices.iter().find(|i| i.primary_key)
    }

    /// The subset of `names` that are neither source attributes nor
    /// validity-interval names or bounds.
    pub fn plain_key(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter(|n| match self.field(n) {
                Some(Field::Attribute(a)) => !a.is_source() && !a.is_as_of_bound(),
                Some(Field::AsOf(_)) | None => false,
            })
            .cloned()
            .collect()
    }
}
