//! InterfaceResolve pass.
//!
//! An interface lists attributes, validity-interval names, a source
//! attribute and relationships that every implementing object must
//! provide. Super-interfaces are flattened first; a cycle in the
//! super-interface graph is reported once per implementing object.

use std::collections::BTreeSet;

use crate::model::raw::RawInterface;

use super::context::{ObjectId, ResolutionContext};
use super::object::ObjectType;

/// `name` plus every interface it extends, in discovery order.
pub fn flatten_interfaces<'a>(ctx: &'a ResolutionContext, name: &str) -> Result<Vec<&'a RawInterface>, String> {
    let Some(root) = ctx.interface(name) else {
        return Err(format!(
            "interface {} is not defined; it may be missing from the schema manifest",
            name
        ));
    };
    let mut all = vec![root];
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    seen.insert(root.name.as_str());
    let mut stack: Vec<&RawInterface> = vec![root];
    while let Some(current) = stack.pop() {
        for super_name in &current.super_interfaces {
            let Some(parent) = ctx.interface(super_name) else {
                return Err(format!(
                    "super interface {} of {} is not defined; it may be missing from the schema manifest",
                    super_name, current.name
                ));
            };
            if !seen.insert(parent.name.as_str()) {
                return Err(format!(
                    "Circular dependency between SuperInterface : {} and  {}",
                    parent.name, root.name
                ));
            }
            all.push(parent);
            stack.push(parent);
        }
    }
    Ok(all)
}

/// Whether `object` implements `interface`, directly or through a super-interface.
fn implements(ctx: &ResolutionContext, object: &ObjectType, interface: &str) -> bool {
    object.interfaces.iter().any(|declared| {
        flatten_interfaces(ctx, declared).is_ok_and(|all| all.iter().any(|i| i.name == interface))
    })
}

fn check_interface(ctx: &ResolutionContext, object: &ObjectType, interface: &RawInterface, errors: &mut Vec<String>) {
    let class = &object.name;
    for required in &interface.attributes {
        match object.attribute(&required.name) {
            None => errors.push(format!(
                "{} must define attribute {} required by interface {}",
                class, required.name, interface.name
            )),
            Some(attr) => {
                if attr.ty != required.ty {
                    errors.push(format!(
                        "attribute {} in {} is {} but interface {} declares it as {}",
                        attr.name, class, attr.ty, interface.name, required.ty
                    ));
                }
                if required.primary_key && !attr.primary_key {
                    errors.push(format!(
                        "attribute {} in {} must be a primary key as declared by interface {}",
                        attr.name, class, interface.name
                    ));
                }
            }
        }
    }

    for as_of in &interface.as_of_attributes {
        if object.as_of_attribute(as_of).is_none() {
            errors.push(format!(
                "{} must define as of attribute {} required by interface {}",
                class, as_of, interface.name
            ));
        }
    }

    if let Some(required) = &interface.source_attribute {
        match object.source_attribute() {
            Some(source) if source.name == required.name && source.ty == required.ty => {}
            _ => errors.push(format!(
                "{} must define source attribute {} of type {} required by interface {}",
                class, required.name, required.ty, interface.name
            )),
        }
    }

    for required in &interface.relationships {
        let Some(rel) = object.relationship(&required.name) else {
            errors.push(format!(
                "{} must define relationship {} required by interface {}",
                class, required.name, interface.name
            ));
            continue;
        };
        let related = ctx.object(rel.related);
        if related.name != required.related && !implements(ctx, related, &required.related) {
            errors.push(format!(
                "relationship {} in {} points to {} which is neither {} nor an implementation of it",
                rel.name, class, related.name, required.related
            ));
        }
        if rel.cardinality != required.cardinality {
            errors.push(format!(
                "relationship {} in {} is {} but interface {} declares it as {}",
                rel.name, class, rel.cardinality, interface.name, required.cardinality
            ));
        }
    }
}

pub fn resolve_interfaces(ctx: &ResolutionContext, id: ObjectId) -> Vec<String> {
    let object = ctx.object(id);
    let mut errors = Vec::new();
    for name in &object.interfaces {
        match flatten_interfaces(ctx, name) {
            Ok(all) => {
                for interface in all {
                    check_interface(ctx, object, interface, &mut errors);
                }
            }
            Err(e) => errors.push(e),
        }
    }
    errors
}
