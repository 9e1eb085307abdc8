//! Raw schema records as produced by ingestion.
//!
//! These are already syntax-checked (numbers parsed, enums recognized) but
//! not cross-referenced. Optional properties stay `Option` so that
//! "not declared" can be told apart from "declared false": a subclass
//! inherits undeclared properties from its superclass attribute.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::types::{Cardinality, ObjectKind, SemanticType, SuperclassKind, TimezoneConversion};

/// Error loading a schema manifest.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read schema file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON schema: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse TOML schema: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unsupported schema file extension: {0}")]
    UnsupportedFormat(String),
}

/// The full input: every object, embedded value type, enumeration and interface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSchema {
    pub objects: Vec<RawObject>,
    pub embedded_value_types: Vec<RawEmbeddedValueType>,
    pub enumerations: Vec<RawEnumeration>,
    pub interfaces: Vec<RawInterface>,
}

impl RawSchema {
    /// Load a schema manifest, choosing the format from the file extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("toml") => Self::from_toml(&content),
            other => Err(LoadError::UnsupportedFormat(other.unwrap_or("").to_string())),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }
}

/// A persistent object type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawObject {
    pub name: String,
    pub package: String,
    pub kind: ObjectKind,
    /// Physical table; derived from the class name when absent.
    pub table: Option<String>,
    pub superclass: Option<String>,
    pub superclass_kind: SuperclassKind,
    #[serde(rename = "abstract")]
    pub is_abstract: bool,
    pub attributes: Vec<RawAttribute>,
    pub as_of_attributes: Vec<RawAsOfAttribute>,
    pub source_attribute: Option<RawSourceAttribute>,
    pub relationships: Vec<RawRelationship>,
    pub indices: Vec<RawIndex>,
    pub embedded_values: Vec<RawEmbeddedValue>,
    pub interfaces: Vec<String>,
    pub initialize_primitives_to_null: Option<bool>,
    /// Per-object override of the off-heap setting.
    pub off_heap: Option<bool>,
}

/// A scalar attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Option<SemanticType>,
    pub column: Option<String>,
    pub nullable: Option<bool>,
    pub primary_key: bool,
    pub mutable_primary_key: bool,
    pub poolable: Option<bool>,
    pub trim: Option<bool>,
    pub timezone: Option<TimezoneConversion>,
    pub default_if_null: Option<String>,
    pub max_length: Option<u32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub optimistic_lock: bool,
    pub identity: bool,
    pub set_as_string: bool,
    pub read_only: bool,
    /// Name of an enumeration this attribute stores.
    pub enumeration: Option<String>,
}

impl RawAttribute {
    pub fn new(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            ..Default::default()
        }
    }
}

/// A validity-interval attribute (one bitemporal dimension).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawAsOfAttribute {
    pub name: String,
    pub from_column: String,
    pub to_column: String,
    pub processing_date: Option<bool>,
    pub to_is_inclusive: bool,
    pub infinity_date: Option<String>,
    pub timezone: Option<TimezoneConversion>,
    pub poolable: Option<bool>,
}

/// The shard/partition key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSourceAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
}

/// A relationship declared on an object.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRelationship {
    pub name: String,
    pub related: String,
    pub cardinality: Option<Cardinality>,
    pub query: String,
    pub reverse_name: Option<String>,
    pub related_is_dependent: bool,
    /// `attr asc, other desc`
    pub order_by: Option<String>,
    /// `int id, String code`
    pub parameters: Option<String>,
    pub foreign_key: Option<bool>,
    pub direct_reference: Option<bool>,
    /// Whether navigation writes back into the related object.
    pub has_setter: Option<bool>,
}

/// A declared index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawIndex {
    pub name: String,
    pub attributes: Vec<String>,
    pub unique: bool,
}

/// An embedded value used by an object: `name` of type `type_name`,
/// with columns mapped by dotted attribute path (`city`, `geo.lat`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEmbeddedValue {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub mappings: Vec<RawEmbeddedMapping>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEmbeddedMapping {
    pub attribute: String,
    pub column: String,
}

/// Definition of an embedded value type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEmbeddedValueType {
    pub name: String,
    pub package: String,
    pub attributes: Vec<RawAttribute>,
    /// Nested embedded values (name and type only; columns come from the owner).
    pub nested: Vec<RawNestedValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawNestedValue {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// A named enumeration stored through an Int or String attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEnumeration {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
    #[serde(default)]
    pub members: Vec<String>,
}

/// An interface a set of objects must conform to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawInterface {
    pub name: String,
    pub package: String,
    pub super_interfaces: Vec<String>,
    pub attributes: Vec<RawInterfaceAttribute>,
    pub as_of_attributes: Vec<String>,
    pub source_attribute: Option<RawSourceAttribute>,
    pub relationships: Vec<RawInterfaceRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInterfaceAttribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SemanticType,
    #[serde(default)]
    pub primary_key: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInterfaceRelationship {
    pub name: String,
    /// Related object or interface name.
    pub related: String,
    pub cardinality: Cardinality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_schema() {
        let json = r#"{
            "objects": [{
                "name": "Order",
                "package": "com.acme.sales",
                "attributes": [
                    {"name": "id", "type": "int", "primary_key": true},
                    {"name": "customerId", "type": "int"},
                    {"name": "total", "type": "decimal", "precision": 12, "scale": 2}
                ],
                "relationships": [{
                    "name": "customer",
                    "related": "Customer",
                    "cardinality": "many-to-one",
                    "query": "this.customerId = Customer.id",
                    "reverse_name": "orders"
                }]
            }]
        }"#;
        let schema = RawSchema::from_json(json).unwrap();
        assert_eq!(schema.objects.len(), 1);
        let order = &schema.objects[0];
        assert_eq!(order.kind, ObjectKind::Transactional);
        assert_eq!(order.attributes[2].precision, Some(12));
        assert_eq!(order.attributes[1].nullable, None);
        assert_eq!(order.relationships[0].cardinality, Some(Cardinality::ManyToOne));
        assert_eq!(order.relationships[0].reverse_name.as_deref(), Some("orders"));
    }

    #[test]
    fn test_parse_toml_schema() {
        let toml = r#"
[[objects]]
name = "Balance"
package = "com.acme.ledger"
kind = "read_only"

[[objects.attributes]]
name = "accountId"
type = "long"
primary_key = true

[[objects.as_of_attributes]]
name = "businessDate"
from_column = "FROM_Z"
to_column = "THRU_Z"

[objects.source_attribute]
name = "region"
type = "string"
"#;
        let schema = RawSchema::from_toml(toml).unwrap();
        let balance = &schema.objects[0];
        assert_eq!(balance.kind, ObjectKind::ReadOnly);
        assert_eq!(balance.as_of_attributes[0].to_column, "THRU_Z");
        assert_eq!(balance.source_attribute.as_ref().unwrap().ty, SemanticType::String);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let json = r#"{"objects": [{"name": "A", "attributes": [{"name": "x", "type": "uuid"}]}]}"#;
        assert!(RawSchema::from_json(json).is_err());
    }
}
