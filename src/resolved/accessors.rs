//! Accessor names and null-bit expressions handed to the emitter.

use serde::Serialize;

use crate::semantic::attribute::{Attribute, AttributeKind, NullBit};
use crate::semantic::layout::{holder_name, HolderWidth, NullBitsHolder};
use crate::semantic::naming::{getter_name, setter_name, upper_first};

/// `get<Name>` / `is<Name>` and `set<Name>`, chained through the owning
/// embedded values for flattened attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accessors {
    pub getter: String,
    pub setter: String,
}

impl Accessors {
    pub fn for_attribute(attr: &Attribute) -> Self {
        match &attr.kind {
            AttributeKind::Embedded { path, short_name } => {
                let chain: Vec<String> = path.iter().map(|p| format!("get{}()", upper_first(p))).collect();
                let chain = chain.join(".");
                Self {
                    getter: format!("{}.{}", chain, getter_name(short_name, attr.ty)),
                    setter: format!("{}.{}", chain, setter_name(short_name)),
                }
            }
            AttributeKind::Scalar | AttributeKind::Source | AttributeKind::AsOfBound { .. } => Self {
                getter: getter_name(&attr.name, attr.ty),
                setter: setter_name(&attr.name),
            },
        }
    }
}

/// Expressions that test, set and clear one on-heap null flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NullBitExpr {
    pub holder: String,
    pub mask: String,
    pub test: String,
    pub set: String,
    pub clear: String,
}

/// `1`, `1 << k`, or `1L << k` once the shift reaches the sign bit of an int.
pub fn mask(position: u32) -> String {
    match position {
        0 => "1".to_string(),
        1..=30 => format!("1 << {}", position),
        _ => format!("1L << {}", position),
    }
}

impl NullBitExpr {
    pub fn new(bit: NullBit) -> Self {
        let holder = holder_name(bit.holder);
        let mask = mask(bit.position);
        Self {
            test: format!("({} & {}) != 0", holder, mask),
            set: format!("{} |= {}", holder, mask),
            clear: format!("{} &= ~({})", holder, mask),
            holder,
            mask,
        }
    }
}

/// Initializer for a holder field, cast down for the narrow widths.
pub fn holder_initializer(holder: &NullBitsHolder) -> String {
    match (holder.width, holder.initial) {
        (_, 0) => "0".to_string(),
        (HolderWidth::Byte, v) => format!("(byte) {:#x}", v),
        (HolderWidth::Short, v) => format!("(short) {:#x}", v),
        (HolderWidth::Int, v) => format!("{:#x}", v),
        (HolderWidth::Long, v) => format!("{:#x}L", v),
    }
}
