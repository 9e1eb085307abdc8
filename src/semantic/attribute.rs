//! Attribute model and the AttributeResolve pass.
//!
//! Turns raw attribute records into typed [`Attribute`]s, checks the
//! per-attribute and per-object rules, expands validity-interval
//! attributes into their from/to bounds, and assigns each nullable
//! primitive its ordinal in declaration order.

use inflector::Inflector;
use serde::Serialize;

use crate::model::raw::{RawAsOfAttribute, RawAttribute, RawObject, RawSourceAttribute};
use crate::model::types::{ObjectKind, SemanticType, TimezoneConversion};

// ============================================================================
// Types
// ============================================================================

/// Which edge of a validity interval an [`AttributeKind::AsOfBound`] stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntervalEdge {
    From,
    To,
}

/// What an attribute is, beyond its scalar type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AttributeKind {
    /// A plain column.
    Scalar,
    /// The shard/partition key; has no column.
    Source,
    /// One edge of a validity interval.
    AsOfBound { as_of: String, edge: IntervalEdge },
    /// A leaf of an embedded value, flattened onto the owning object.
    Embedded { path: Vec<String>, short_name: String },
}

/// On-heap null flag position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NullBit {
    /// Index of the `isNullBits<N>` holder.
    pub holder: usize,
    /// Bit position inside the holder, 0..64.
    pub position: u32,
}

/// Off-heap placement of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OffHeapSlot {
    pub offset: u32,
    pub size: u32,
    /// (byte offset of the 32-bit null word, bit position) for nullable primitives.
    pub null_bit: Option<(u32, u32)>,
}

/// Reference to a relationship that owns an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipRef {
    pub object: String,
    pub relationship: String,
    pub related_is_dependent: bool,
}

/// A resolved scalar attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
    pub ty: SemanticType,
    /// `None` only for the source attribute.
    pub column: Option<String>,
    pub nullable: bool,
    pub primary_key: bool,
    pub mutable_primary_key: bool,
    pub poolable: bool,
    pub trim: bool,
    pub timezone: TimezoneConversion,
    pub default_if_null: Option<String>,
    pub max_length: Option<u32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub optimistic_lock: bool,
    pub identity: bool,
    pub set_as_string: bool,
    pub read_only: bool,
    pub enumeration: Option<String>,
    /// Copied from the superclass rather than declared here.
    pub inherited: bool,
    pub owning_relationship: Option<RelationshipRef>,
    /// Position in the nullable-primitive list, in declaration order.
    pub nullable_ordinal: Option<usize>,
    pub null_bit: Option<NullBit>,
    /// Second flag for the pre-update value of a mutable primary key.
    pub shadow_null_bit: Option<NullBit>,
    pub off_heap: Option<OffHeapSlot>,
}

impl Attribute {
    fn blank(name: String, kind: AttributeKind, ty: SemanticType) -> Self {
        Self {
            name,
            kind,
            ty,
            column: None,
            nullable: false,
            primary_key: false,
            mutable_primary_key: false,
            poolable: false,
            trim: false,
            timezone: TimezoneConversion::None,
            default_if_null: None,
            max_length: None,
            precision: None,
            scale: None,
            optimistic_lock: false,
            identity: false,
            set_as_string: false,
            read_only: false,
            enumeration: None,
            inherited: false,
            owning_relationship: None,
            nullable_ordinal: None,
            null_bit: None,
            shadow_null_bit: None,
            off_heap: None,
        }
    }

    /// Build an attribute from its raw record. The type must already be known.
    pub fn from_raw(raw: &RawAttribute, ty: SemanticType, kind: AttributeKind) -> Self {
        let mut attr = Self::blank(raw.name.clone(), kind, ty);
        attr.column = Some(raw.column.clone().unwrap_or_else(|| default_column_name(&raw.name)));
        attr.primary_key = raw.primary_key;
        attr.nullable = raw.nullable.unwrap_or(!raw.primary_key && !ty.is_primitive());
        attr.mutable_primary_key = raw.mutable_primary_key;
        attr.poolable = raw.poolable.unwrap_or(false);
        attr.trim = raw.trim.unwrap_or(false);
        attr.timezone = raw.timezone.unwrap_or_default();
        attr.default_if_null = raw.default_if_null.clone();
        attr.max_length = raw.max_length;
        attr.precision = raw.precision;
        attr.scale = raw.scale;
        attr.optimistic_lock = raw.optimistic_lock;
        attr.identity = raw.identity;
        attr.set_as_string = raw.set_as_string;
        attr.read_only = raw.read_only;
        attr.enumeration = raw.enumeration.clone();
        attr
    }

    pub fn source(raw: &RawSourceAttribute) -> Self {
        let mut attr = Self::blank(raw.name.clone(), AttributeKind::Source, raw.ty);
        attr.poolable = raw.ty.can_be_pooled();
        attr
    }

    pub fn is_source(&self) -> bool {
        matches!(self.kind, AttributeKind::Source)
    }

    pub fn is_as_of_bound(&self) -> bool {
        matches!(self.kind, AttributeKind::AsOfBound { .. })
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.kind, AttributeKind::Embedded { .. })
    }

    /// Nullable primitive that takes an on-heap null bit.
    pub fn takes_null_bit(&self) -> bool {
        self.nullable && self.ty.needs_null_bit()
    }
}

/// One bitemporal dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AsOfAttribute {
    pub name: String,
    pub from_column: String,
    pub to_column: String,
    pub processing_date: bool,
    pub to_is_inclusive: bool,
    pub infinity_date: Option<String>,
    pub timezone: TimezoneConversion,
    pub poolable: bool,
    pub inherited: bool,
}

impl AsOfAttribute {
    pub fn from_raw(raw: &RawAsOfAttribute) -> Self {
        Self {
            name: raw.name.clone(),
            from_column: raw.from_column.clone(),
            to_column: raw.to_column.clone(),
            processing_date: raw
                .processing_date
                .unwrap_or(raw.name == PROCESSING_DATE_NAME),
            to_is_inclusive: raw.to_is_inclusive,
            infinity_date: raw.infinity_date.clone(),
            timezone: raw.timezone.unwrap_or_default(),
            poolable: raw.poolable.unwrap_or(true),
            inherited: false,
        }
    }

    pub fn from_name(&self) -> String {
        format!("{}From", self.name)
    }

    pub fn to_name(&self) -> String {
        format!("{}To", self.name)
    }

    /// The two timestamp attributes this dimension stores.
    pub fn bounds(&self) -> [Attribute; 2] {
        let make = |name: String, column: &str, edge: IntervalEdge| {
            let mut attr = Attribute::blank(
                name,
                AttributeKind::AsOfBound {
                    as_of: self.name.clone(),
                    edge,
                },
                SemanticType::Timestamp,
            );
            attr.column = Some(column.to_string());
            attr.poolable = self.poolable;
            attr.timezone = self.timezone;
            attr.inherited = self.inherited;
            attr
        };
        [
            make(self.from_name(), &self.from_column, IntervalEdge::From),
            make(self.to_name(), &self.to_column, IntervalEdge::To),
        ]
    }
}

/// As-of attributes with this name are the processing-time dimension
/// unless declared otherwise.
pub const PROCESSING_DATE_NAME: &str = "processingDate";

/// Default column for an attribute: `customerId` -> `CUSTOMER_ID`.
pub fn default_column_name(attribute: &str) -> String {
    attribute.to_snake_case().to_uppercase()
}

// ============================================================================
// AttributeResolve pass
// ============================================================================

/// Output of resolving one object's attributes.
#[derive(Debug, Default)]
pub struct ResolvedAttributes {
    pub attributes: Vec<Attribute>,
    pub as_of_attributes: Vec<AsOfAttribute>,
}

/// Resolve and check the attributes an object declares itself.
///
/// Superclass attributes are merged later by the SuperclassResolve pass.
pub fn resolve_attributes(raw: &RawObject) -> Result<ResolvedAttributes, Vec<String>> {
    let (resolved, errors) = collect_attributes(raw);
    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(errors)
    }
}

/// Like [`resolve_attributes`], but keeps every attribute that could be
/// built alongside the errors. Only attributes without a type are left out.
pub fn collect_attributes(raw: &RawObject) -> (ResolvedAttributes, Vec<String>) {
    let mut errors = Vec::new();
    let mut out = ResolvedAttributes::default();
    let class = raw.name.as_str();

    for raw_attr in &raw.attributes {
        let Some(ty) = raw_attr.ty else {
            errors.push(format!("attribute '{}' in {} does not declare a type", raw_attr.name, class));
            continue;
        };
        let attr = Attribute::from_raw(raw_attr, ty, AttributeKind::Scalar);
        errors.extend(check_attribute(&attr, raw_attr, class));
        out.attributes.push(attr);
    }

    if let Some(source) = &raw.source_attribute {
        if !matches!(source.ty, SemanticType::Int | SemanticType::String) {
            errors.push(format!(
                "source attribute '{}' in {} must be int or String, not {}",
                source.name, class, source.ty
            ));
        }
        out.attributes.push(Attribute::source(source));
    }

    for raw_as_of in &raw.as_of_attributes {
        if raw_as_of.from_column.is_empty() || raw_as_of.to_column.is_empty() {
            errors.push(format!(
                "as of attribute '{}' in {} must declare both from and to columns",
                raw_as_of.name, class
            ));
        }
        let as_of = AsOfAttribute::from_raw(raw_as_of);
        out.attributes.extend(as_of.bounds());
        out.as_of_attributes.push(as_of);
    }

    errors.extend(check_object_rules(raw, &out));
    assign_nullable_ordinals(&mut out.attributes);
    (out, errors)
}

/// Per-attribute rules.
pub fn check_attribute(attr: &Attribute, raw: &RawAttribute, class: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let name = &attr.name;

    if attr.poolable && !attr.ty.can_be_pooled() {
        errors.push(format!(
            "{} cannot pool attribute {} only String and Timestamp attributes can be pooled",
            class, name
        ));
    }
    if attr.trim && !attr.ty.can_be_trimmed() {
        errors.push(format!(
            "{} cannot trim attribute {} only String attributes can be trimmed",
            class, name
        ));
    }
    if attr.set_as_string && !attr.ty.can_be_set_as_string() {
        errors.push(format!(
            "{} setAsString for attribute {} can only be used with Date or Timestamp attributes",
            class, name
        ));
    }
    if let Some(max_length) = attr.max_length {
        if attr.ty != SemanticType::String {
            errors.push(format!(
                "{} maxLength for attribute {} can only be used with String attributes",
                class, name
            ));
        } else if max_length == 0 {
            errors.push(format!("{} maxLength for attribute {} must be positive", class, name));
        }
    }
    if attr.ty == SemanticType::Decimal {
        errors.extend(check_decimal(attr, class));
    }
    if attr.mutable_primary_key && !attr.primary_key {
        errors.push(format!(
            "{} attribute {} is declared mutablePrimaryKey but is not a primaryKey",
            class, name
        ));
    }
    if attr.primary_key && raw.nullable == Some(true) {
        errors.push(format!("{} primary key attribute {} cannot be nullable", class, name));
    }
    if attr.optimistic_lock && !attr.ty.can_be_version() {
        errors.push(format!(
            "{} attribute {} cannot be used for optimistic locking; only int, long and Timestamp attributes can",
            class, name
        ));
    }
    errors
}

/// Decimal precision/scale bounds; one message per violated bound.
fn check_decimal(attr: &Attribute, class: &str) -> Vec<String> {
    let (Some(precision), Some(scale)) = (attr.precision, attr.scale) else {
        return vec![format!(
            "BigDecimal attribute '{}' in {} must specify precision and scale.",
            attr.name, class
        )];
    };
    let mut errors = Vec::new();
    if scale < 0 {
        errors.push(format!(
            "Invalid scale value {}. BigDecimal attribute '{}' in {} must specify a non-negative scale value.",
            scale, attr.name, class
        ));
    }
    if precision < 1 {
        errors.push(format!(
            "Invalid precision value {}. BigDecimal attribute '{}' in {} must specify a precision > 1.",
            precision, attr.name, class
        ));
    } else if scale > precision {
        errors.push(format!(
            "Invalid scale value {}. BigDecimal attribute '{}' in {} must specify a scale < precision.",
            scale, attr.name, class
        ));
    }
    errors
}

/// Rules spanning several attributes of one object.
fn check_object_rules(raw: &RawObject, resolved: &ResolvedAttributes) -> Vec<String> {
    let mut errors = Vec::new();
    let class = raw.name.as_str();
    let dated = !resolved.as_of_attributes.is_empty();

    let locks: Vec<&str> = resolved
        .attributes
        .iter()
        .filter(|a| a.optimistic_lock)
        .map(|a| a.name.as_str())
        .collect();
    if locks.len() > 1 {
        errors.push(format!(
            "{} can only have one optimistic lock attribute, found: {}",
            class,
            locks.join(", ")
        ));
    }

    for attr in &resolved.attributes {
        if attr.identity && dated {
            errors.push(format!(
                "{} attribute {} is an identity column; identity cannot be combined with as of attributes",
                class, attr.name
            ));
        }
        if attr.mutable_primary_key && dated {
            errors.push(format!(
                "{} attribute {}: mutable primary keys are not supported for dated objects",
                class, attr.name
            ));
        }
        if attr.mutable_primary_key && raw.kind == ObjectKind::ReadOnly {
            errors.push(format!(
                "{} attribute {}: mutable primary keys are not supported for read-only objects",
                class, attr.name
            ));
        }
    }
    errors
}

/// Number every nullable primitive in declaration order.
pub fn assign_nullable_ordinals(attributes: &mut [Attribute]) {
    let mut next = 0;
    for attr in attributes.iter_mut() {
        if attr.takes_null_bit() {
            attr.nullable_ordinal = Some(next);
            next += 1;
        } else {
            attr.nullable_ordinal = None;
        }
    }
}

// ============================================================================
// Superclass agreement
// ============================================================================

/// Check a subclass attribute against the superclass attribute of the same
/// name, and copy over every optional property the subclass left unset.
pub fn merge_with_superclass(
    attr: &mut Attribute,
    raw: Option<&RawAttribute>,
    super_attr: &Attribute,
) -> Vec<String> {
    let mut errors = Vec::new();
    if attr.ty != super_attr.ty {
        errors.push(format!(
            "java type for attribute '{}' does not match java type for same attribute in superclass '{}'",
            attr.name, super_attr.name
        ));
    }
    if attr.primary_key != super_attr.primary_key {
        if super_attr.primary_key {
            errors.push(format!("attribute '{}' is a primaryKey in superclass", attr.name));
        } else {
            errors.push(format!("attribute '{}' is not a primaryKey in superclass", attr.name));
        }
    }

    let Some(raw) = raw else {
        return errors;
    };
    if raw.column.is_none() {
        attr.column = super_attr.column.clone();
    }
    if raw.nullable.is_none() {
        attr.nullable = super_attr.nullable;
    }
    if raw.trim.is_none() {
        attr.trim = super_attr.trim;
    }
    if raw.poolable.is_none() {
        attr.poolable = super_attr.poolable;
    }
    if raw.timezone.is_none() {
        attr.timezone = super_attr.timezone;
    }
    if raw.default_if_null.is_none() {
        attr.default_if_null = super_attr.default_if_null.clone();
    }
    errors
}
