//! PostValidate pass: whole-object checks that need every earlier pass done.

use crate::model::types::SuperclassKind;

use super::context::{ObjectId, ResolutionContext};

pub fn post_validate(ctx: &ResolutionContext, id: ObjectId) -> Vec<String> {
    let object = ctx.object(id);
    let mut errors = Vec::new();

    let pk_exempt = object.is_abstract && object.superclass_kind == SuperclassKind::TablePerSubclass;
    if object.primary_key().next().is_none() && !pk_exempt {
        errors.push("No primary key defined!".to_string());
    }

    match object.as_of_attributes.len() {
        0 | 1 => {}
        2 => {
            let processing = object.as_of_attributes.iter().filter(|a| a.processing_date).count();
            if processing != 1 {
                errors.push(format!(
                    "object {} has two as of attributes; exactly one of them must be the processing date",
                    object.name
                ));
            }
        }
        _ => errors.push(format!(
            "Cannot have more than two as of attributes in object {}",
            object.name
        )),
    }
    errors
}
