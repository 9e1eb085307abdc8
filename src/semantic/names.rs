//! NameCheck pass: naming conventions and uniqueness inside one object.

use std::collections::HashSet;

use super::attribute::default_column_name;
use super::context::{ObjectId, ResolutionContext};
use super::naming::is_identifier;

pub fn check_names(ctx: &ResolutionContext, id: ObjectId) -> Vec<String> {
    let object = ctx.object(id);
    let raw = &object.raw;
    let class = raw.name.as_str();
    let mut errors: Vec<String> = ctx.registration_errors(id).to_vec();

    if !is_identifier(class) || !class.starts_with(|c: char| c.is_ascii_uppercase()) {
        errors.push(format!("class name {} must be an identifier starting with an uppercase letter", class));
    }
    if !ctx.settings().ignore_package_naming_convention
        && raw.package.chars().any(|c| c.is_ascii_uppercase())
    {
        errors.push(format!("package name {} of {} must be lowercase", raw.package, class));
    }

    let mut names: Vec<&str> = raw.attributes.iter().map(|a| a.name.as_str()).collect();
    names.extend(raw.as_of_attributes.iter().map(|a| a.name.as_str()));
    names.extend(raw.source_attribute.iter().map(|s| s.name.as_str()));
    names.extend(raw.embedded_values.iter().map(|e| e.name.as_str()));
    names.extend(raw.relationships.iter().map(|r| r.name.as_str()));

    let mut seen = HashSet::new();
    for name in names {
        if !is_identifier(name) || !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            errors.push(format!(
                "attribute name {} in {} must be an identifier starting with a lowercase letter",
                name, class
            ));
        }
        if !seen.insert(name) {
            errors.push(format!("duplicate attribute name {} in {}", name, class));
        }
    }

    let mut columns: Vec<(String, &str)> = raw
        .attributes
        .iter()
        .map(|a| {
            let column = a.column.clone().unwrap_or_else(|| default_column_name(&a.name));
            (column, a.name.as_str())
        })
        .collect();
    for as_of in &raw.as_of_attributes {
        columns.push((as_of.from_column.clone(), as_of.name.as_str()));
        columns.push((as_of.to_column.clone(), as_of.name.as_str()));
    }
    let mut seen_columns = HashSet::new();
    for (column, attribute) in &columns {
        if column.is_empty() {
            continue;
        }
        if !seen_columns.insert(column.to_uppercase()) {
            errors.push(format!(
                "duplicate column name {} for attribute {} in {}",
                column, attribute, class
            ));
        }
    }

    errors
}
