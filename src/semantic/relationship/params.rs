//! Relationship parameter lists and order-by clauses.

use std::collections::HashSet;

use crate::model::types::SemanticType;
use crate::semantic::naming::is_identifier;
use crate::semantic::object::{Field, ObjectType};

use super::{OrderBy, Parameter, SortDirection};

/// Parameters parsed from a declaration like `int id, String code`.
#[derive(Debug, Default)]
pub struct ParameterCheck {
    pub parameters: Vec<Parameter>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Parse the declared parameter list and check it against the `{name}`
/// placeholders `used` in the query.
pub fn check_parameters(declared: Option<&str>, used: &[String]) -> ParameterCheck {
    let mut out = ParameterCheck::default();
    let mut seen = HashSet::new();

    for item in declared.unwrap_or("").split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parts: Vec<&str> = item.split_whitespace().collect();
        let [ty, name] = parts.as_slice() else {
            out.errors.push(format!(
                "malformed parameter '{}': expected '<type> <name>'",
                item
            ));
            continue;
        };
        let Some(ty) = SemanticType::from_str(ty) else {
            out.errors.push(format!("unknown type {} for parameter {}", ty, name));
            continue;
        };
        if name.starts_with('_') || !is_identifier(name) {
            out.errors.push(format!(
                "parameter name {} must be an identifier not starting with '_'",
                name
            ));
            continue;
        }
        if !seen.insert(name.to_string()) {
            out.errors.push(format!("duplicate parameter {}", name));
            continue;
        }
        out.parameters.push(Parameter {
            ty,
            name: name.to_string(),
        });
    }

    let mut reported = HashSet::new();
    for name in used {
        if !seen.contains(name) && reported.insert(name.as_str()) {
            out.errors.push(format!("parameter {{{}}} is used but not declared", name));
        }
    }
    for p in &out.parameters {
        if !used.contains(&p.name) {
            out.warnings.push(format!("parameter {} is declared but never used", p.name));
        }
    }
    out
}

/// Resolve `attr asc, other desc` against the related object.
pub fn resolve_order_by(text: Option<&str>, related: &ObjectType) -> Result<Vec<OrderBy>, Vec<String>> {
    let mut order = Vec::new();
    let mut errors = Vec::new();
    for item in text.unwrap_or("").split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let parts: Vec<&str> = item.split_whitespace().collect();
        let (attribute, direction) = match parts.as_slice() {
            [attribute] => (*attribute, SortDirection::Asc),
            [attribute, dir] if dir.eq_ignore_ascii_case("asc") => (*attribute, SortDirection::Asc),
            [attribute, dir] if dir.eq_ignore_ascii_case("desc") => (*attribute, SortDirection::Desc),
            _ => {
                errors.push(format!("malformed orderBy item '{}'", item));
                continue;
            }
        };
        match related.field(attribute) {
            Some(Field::Attribute(_)) => order.push(OrderBy {
                attribute: attribute.to_string(),
                direction,
            }),
            Some(Field::AsOf(_)) | None => errors.push(format!(
                "orderBy attribute {} is not an attribute of {}",
                attribute, related.name
            )),
        }
    }
    if errors.is_empty() {
        Ok(order)
    } else {
        Err(errors)
    }
}
