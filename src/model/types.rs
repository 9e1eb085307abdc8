//! Closed set of attribute types and small enums shared by raw and resolved models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of an attribute.
///
/// The set is closed: every consumer matches it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    #[serde(alias = "bool")]
    Boolean,
    Byte,
    Short,
    Char,
    #[serde(alias = "integer")]
    Int,
    Long,
    Float,
    Double,
    String,
    #[serde(alias = "byte[]", alias = "bytes")]
    ByteArray,
    Date,
    Time,
    Timestamp,
    #[serde(alias = "bigdecimal")]
    Decimal,
}

impl SemanticType {
    /// Parse a type name as written in schema manifests.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "boolean" | "bool" => Some(SemanticType::Boolean),
            "byte" => Some(SemanticType::Byte),
            "short" => Some(SemanticType::Short),
            "char" => Some(SemanticType::Char),
            "int" | "integer" => Some(SemanticType::Int),
            "long" => Some(SemanticType::Long),
            "float" => Some(SemanticType::Float),
            "double" => Some(SemanticType::Double),
            "string" => Some(SemanticType::String),
            "byte[]" | "bytes" | "byte_array" => Some(SemanticType::ByteArray),
            "date" => Some(SemanticType::Date),
            "time" => Some(SemanticType::Time),
            "timestamp" => Some(SemanticType::Timestamp),
            "decimal" | "bigdecimal" => Some(SemanticType::Decimal),
            _ => None,
        }
    }

    /// Value types stored without an object reference; they need a separate
    /// null flag when nullable.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SemanticType::Boolean
                | SemanticType::Byte
                | SemanticType::Short
                | SemanticType::Char
                | SemanticType::Int
                | SemanticType::Long
                | SemanticType::Float
                | SemanticType::Double
        )
    }

    /// Whether a nullable attribute of this type takes a null bit.
    ///
    /// Booleans are stored tri-state and never take one.
    pub fn needs_null_bit(&self) -> bool {
        self.is_primitive() && *self != SemanticType::Boolean
    }

    pub fn can_be_pooled(&self) -> bool {
        matches!(self, SemanticType::String | SemanticType::Timestamp)
    }

    pub fn can_be_trimmed(&self) -> bool {
        matches!(self, SemanticType::String)
    }

    pub fn can_be_set_as_string(&self) -> bool {
        matches!(self, SemanticType::Date | SemanticType::Timestamp)
    }

    /// Types allowed for optimistic locking.
    pub fn can_be_version(&self) -> bool {
        matches!(
            self,
            SemanticType::Int | SemanticType::Long | SemanticType::Timestamp
        )
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            SemanticType::Date | SemanticType::Time | SemanticType::Timestamp
        )
    }

    /// Width in the compact off-heap record, `None` for variable-width types.
    ///
    /// Strings are stored as a 4-byte index into a shared string pool;
    /// temporal values as 8-byte epoch offsets.
    pub fn off_heap_size(&self) -> Option<u32> {
        match self {
            SemanticType::Boolean | SemanticType::Byte => Some(1),
            SemanticType::Short | SemanticType::Char => Some(2),
            SemanticType::Int | SemanticType::Float => Some(4),
            SemanticType::Long | SemanticType::Double => Some(8),
            SemanticType::String => Some(4),
            SemanticType::Date | SemanticType::Time | SemanticType::Timestamp => Some(8),
            SemanticType::ByteArray | SemanticType::Decimal => None,
        }
    }

    /// Name used in emitted accessors and diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            SemanticType::Boolean => "boolean",
            SemanticType::Byte => "byte",
            SemanticType::Short => "short",
            SemanticType::Char => "char",
            SemanticType::Int => "int",
            SemanticType::Long => "long",
            SemanticType::Float => "float",
            SemanticType::Double => "double",
            SemanticType::String => "String",
            SemanticType::ByteArray => "byte[]",
            SemanticType::Date => "Date",
            SemanticType::Time => "Time",
            SemanticType::Timestamp => "Timestamp",
            SemanticType::Decimal => "BigDecimal",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Lifecycle kind of a persistent object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    #[default]
    Transactional,
    ReadOnly,
    Temporary,
}

/// How a subclass maps onto tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuperclassKind {
    /// Every class in the hierarchy has a table holding only the attributes it
    /// declares; subclass rows join their superclass row on the primary key.
    #[default]
    TablePerClass,
    /// Only concrete subclasses have tables, each holding all inherited attributes.
    TablePerSubclass,
    /// The whole hierarchy shares one table.
    TableForAllSubclasses,
}

/// Relationship cardinality, read from the declaring object's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cardinality {
    #[serde(alias = "one_to_one")]
    OneToOne,
    #[serde(alias = "one_to_many")]
    OneToMany,
    #[serde(alias = "many_to_one")]
    ManyToOne,
    #[serde(alias = "many_to_many")]
    ManyToMany,
}

impl Cardinality {
    /// Cardinality of the same edge read from the related object's side.
    pub fn reverse(&self) -> Cardinality {
        match self {
            Cardinality::OneToOne => Cardinality::OneToOne,
            Cardinality::OneToMany => Cardinality::ManyToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            Cardinality::ManyToMany => Cardinality::ManyToMany,
        }
    }

    pub fn is_to_many(&self) -> bool {
        matches!(self, Cardinality::OneToMany | Cardinality::ManyToMany)
    }

    pub fn is_from_many(&self) -> bool {
        matches!(self, Cardinality::ManyToOne | Cardinality::ManyToMany)
    }

    pub fn is_to_one(&self) -> bool {
        !self.is_to_many()
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Cardinality::OneToOne => "one-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::ManyToMany => "many-to-many",
        };
        write!(f, "{}", s)
    }
}

/// Timezone handling for temporal attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimezoneConversion {
    #[default]
    None,
    ConvertToUtc,
    ConvertToDatabaseTimezone,
}
