//! Identifier helpers shared by the passes and the emitter contract.

use crate::model::types::SemanticType;

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `isActive` for booleans, `getName` otherwise.
pub fn getter_name(attribute: &str, ty: SemanticType) -> String {
    match ty {
        SemanticType::Boolean => format!("is{}", upper_first(attribute)),
        _ => format!("get{}", upper_first(attribute)),
    }
}

pub fn setter_name(attribute: &str) -> String {
    format!("set{}", upper_first(attribute))
}

/// Java-style identifier: letter or `_` first, then letters, digits or `_`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
