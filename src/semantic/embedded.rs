//! EmbeddedValueResolve pass.
//!
//! An embedded value is a composite stored in the owning object's table.
//! Each leaf attribute of the (possibly nested) value type is flattened onto
//! the owner under the name `nestedName + UpperFirst(leaf)`, where
//! `nestedName` is the lower-first concatenation of the path, e.g.
//! `address.geo.lat` becomes `addressGeoLat`.

use std::collections::HashSet;

use serde::Serialize;

use crate::model::raw::{RawEmbeddedMapping, RawEmbeddedValue};

use super::attribute::{assign_nullable_ordinals, check_attribute, Attribute, AttributeKind};
use super::context::{ObjectId, ResolutionContext};
use super::naming::{lower_first, upper_first};

/// One embedded value (top level or nested) on an object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedValue {
    /// Name on its parent.
    pub name: String,
    pub type_name: String,
    /// Ancestor names followed by this value's name.
    pub path: Vec<String>,
    pub nested_name: String,
    /// `getAddress().getGeo()`
    pub getter_chain: String,
    /// Flattened attribute names stored directly in this value.
    pub attributes: Vec<String>,
    /// Nested names of the values embedded in this one.
    pub children: Vec<String>,
}

impl EmbeddedValue {
    pub fn ancestors(&self) -> &[String] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    pub fn is_root(&self) -> bool {
        self.path.len() == 1
    }
}

pub fn nested_name(path: &[String]) -> String {
    lower_first(&path.iter().map(|p| upper_first(p)).collect::<String>())
}

struct Flattener<'a> {
    ctx: &'a ResolutionContext,
    owner: &'a str,
    root: &'a RawEmbeddedValue,
    used_mappings: HashSet<&'a str>,
    values: Vec<EmbeddedValue>,
    attributes: Vec<Attribute>,
    errors: Vec<String>,
}

impl<'a> Flattener<'a> {
    fn mapping(&self, path: &str) -> Option<&'a RawEmbeddedMapping> {
        self.root.mappings.iter().find(|m| m.attribute == path)
    }

    /// Flatten `type_name` found at `path`; `types` is the stack of value
    /// types currently being expanded.
    fn flatten(&mut self, type_name: &str, path: Vec<String>, types: &mut Vec<String>) -> String {
        let nested = nested_name(&path);
        let getter_chain = path
            .iter()
            .map(|p| format!("get{}()", upper_first(p)))
            .collect::<Vec<_>>()
            .join(".");

        let Some(value_type) = self.ctx.embedded_type(type_name) else {
            self.errors.push(format!(
                "embedded value {} in {} has unknown type {}; it may be missing from the schema manifest",
                path.join("."),
                self.owner,
                type_name
            ));
            return nested;
        };
        if types.iter().any(|t| t == type_name) {
            self.errors.push(format!(
                "embedded value type {} contains itself: {} -> {}",
                type_name,
                types.join(" -> "),
                type_name
            ));
            return nested;
        }
        types.push(type_name.to_string());

        let mut value = EmbeddedValue {
            name: path.last().cloned().unwrap_or_default(),
            type_name: type_name.to_string(),
            path: path.clone(),
            nested_name: nested.clone(),
            getter_chain,
            attributes: Vec::new(),
            children: Vec::new(),
        };

        for raw_attr in &value_type.attributes {
            let mapping_path = path[1..]
                .iter()
                .chain(std::iter::once(&raw_attr.name))
                .cloned()
                .collect::<Vec<_>>()
                .join(".");
            let Some(ty) = raw_attr.ty else {
                self.errors.push(format!(
                    "attribute '{}' of embedded value type {} does not declare a type",
                    raw_attr.name, type_name
                ));
                continue;
            };
            let flat_name = format!("{}{}", nested, upper_first(&raw_attr.name));
            let mut attr = Attribute::from_raw(
                raw_attr,
                ty,
                AttributeKind::Embedded {
                    path: path.clone(),
                    short_name: raw_attr.name.clone(),
                },
            );
            attr.name = flat_name.clone();
            match self.mapping(&mapping_path) {
                Some(mapping) => {
                    self.used_mappings.insert(mapping.attribute.as_str());
                    attr.column = Some(mapping.column.clone());
                }
                None => self.errors.push(format!(
                    "embedded value {} in {} has no column mapping for attribute {}",
                    self.root.name, self.owner, mapping_path
                )),
            }
            self.errors.extend(check_attribute(&attr, raw_attr, type_name));
            value.attributes.push(flat_name);
            self.attributes.push(attr);
        }

        let slot = self.values.len();
        self.values.push(value);
        for nested_value in &value_type.nested {
            let mut child_path = path.clone();
            child_path.push(nested_value.name.clone());
            let child = self.flatten(&nested_value.type_name, child_path, types);
            self.values[slot].children.push(child);
        }

        types.pop();
        nested
    }
}

/// Resolve the embedded values an object declares and flatten their
/// attributes onto it.
pub fn resolve_embedded_values(ctx: &mut ResolutionContext, id: ObjectId) -> Vec<String> {
    let object = ctx.object(id);
    if object.raw.embedded_values.is_empty() {
        return Vec::new();
    }

    let mut values = Vec::new();
    let mut attributes = Vec::new();
    let mut errors = Vec::new();
    for root in &object.raw.embedded_values {
        let mut flattener = Flattener {
            ctx,
            owner: &object.name,
            root,
            used_mappings: HashSet::new(),
            values: Vec::new(),
            attributes: Vec::new(),
            errors: Vec::new(),
        };
        flattener.flatten(&root.type_name, vec![root.name.clone()], &mut Vec::new());
        for mapping in &root.mappings {
            if !flattener.used_mappings.contains(mapping.attribute.as_str()) {
                flattener.errors.push(format!(
                    "embedded value {} in {} maps unknown attribute {}",
                    root.name, object.name, mapping.attribute
                ));
            }
        }
        values.extend(flattener.values);
        attributes.extend(flattener.attributes);
        errors.extend(flattener.errors);
    }

    let mut taken: HashSet<&str> = object.attributes.iter().map(|a| a.name.as_str()).collect();
    for attr in &attributes {
        if !taken.insert(attr.name.as_str()) {
            errors.push(format!(
                "embedded attribute {} clashes with another attribute in {}",
                attr.name, object.name
            ));
        }
    }

    let object = ctx.object_mut(id);
    object.embedded_values = values;
    object.attributes.extend(attributes);
    assign_nullable_ordinals(&mut object.attributes);
    errors
}
