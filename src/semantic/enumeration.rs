//! EnumerationResolve pass.

use crate::model::types::SemanticType;

use super::context::{ObjectId, ResolutionContext};

/// Check every attribute that stores an enumeration.
pub fn resolve_enumerations(ctx: &ResolutionContext, id: ObjectId) -> Vec<String> {
    let object = ctx.object(id);
    let mut errors = Vec::new();

    for attr in &object.attributes {
        let Some(name) = &attr.enumeration else {
            continue;
        };
        let Some(enumeration) = ctx.enumeration(name) else {
            errors.push(format!(
                "attribute {} in {} uses unknown enumeration {}; it may be missing from the schema manifest",
                attr.name, object.name, name
            ));
            continue;
        };
        if !matches!(enumeration.ty, SemanticType::Int | SemanticType::String) {
            errors.push(format!(
                "enumeration {} must be stored as int or String, not {}",
                enumeration.name, enumeration.ty
            ));
        } else if attr.ty != enumeration.ty {
            errors.push(format!(
                "attribute {} in {} is {} but enumeration {} is stored as {}",
                attr.name, object.name, attr.ty, enumeration.name, enumeration.ty
            ));
        }
        if enumeration.members.is_empty() {
            errors.push(format!("enumeration {} has no members", enumeration.name));
        }
    }
    errors
}
