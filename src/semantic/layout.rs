//! Null-bit and byte-offset layout.
//!
//! # On-heap
//!
//! Nullable primitives (booleans excluded) take one bit each in a run of
//! `isNullBits<N>` holder fields. Bit `i` lives in holder `i / 64` at
//! position `i % 64`; each holder is only as wide as the bits it carries.
//! Mutable primary keys carry a second "shadow" flag for their pre-update
//! value, allocated after the first space.
//!
//! # Off-heap
//!
//! A compact fixed-offset record: optional 4-byte data-version slot, then
//! the null words (32 bits each), then every field in (source, primary
//! key, name) order. The record size is rounded up to an even byte count.
//!
//! Both layouts are pure functions of their ordered input.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::model::types::SemanticType;

use super::attribute::{NullBit, OffHeapSlot};

/// Bits per on-heap holder.
pub const HOLDER_BITS: usize = 64;
/// Bits per off-heap null word.
pub const OFF_HEAP_WORD_BITS: u32 = 32;
/// Size of the data-version slot reserved for dated objects.
pub const DATA_VERSION_SIZE: u32 = 4;

/// Error computing a layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("attribute {attribute} of type {ty} has no fixed off-heap width")]
    UnsupportedType { attribute: String, ty: SemanticType },

    #[error("Failed to fingerprint layout: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

// ============================================================================
// On-heap
// ============================================================================

/// Primitive type of a null-bits holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HolderWidth {
    Byte,
    Short,
    Int,
    Long,
}

impl HolderWidth {
    /// Narrowest holder for `bits` used bits.
    ///
    /// A holder using exactly 32 bits is a `long`: its top flag would sit in
    /// the sign bit of an `int` mask.
    pub fn for_bits(bits: usize) -> Self {
        match bits {
            0..=8 => HolderWidth::Byte,
            9..=16 => HolderWidth::Short,
            17..=31 => HolderWidth::Int,
            _ => HolderWidth::Long,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HolderWidth::Byte => "byte",
            HolderWidth::Short => "short",
            HolderWidth::Int => "int",
            HolderWidth::Long => "long",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NullBitsHolder {
    pub name: String,
    pub width: HolderWidth,
    pub bits_used: usize,
    /// Value the holder starts with.
    pub initial: u64,
}

/// Result of [`on_heap_layout`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OnHeapLayout {
    pub holders: Vec<NullBitsHolder>,
    /// Attribute name and its bit, in input order.
    pub bits: Vec<(String, NullBit)>,
    /// Shadow flags of mutable primary keys.
    pub shadow_bits: Vec<(String, NullBit)>,
}

impl OnHeapLayout {
    pub fn bit(&self, attribute: &str) -> Option<NullBit> {
        self.bits.iter().find(|(n, _)| n == attribute).map(|(_, b)| *b)
    }

    pub fn shadow_bit(&self, attribute: &str) -> Option<NullBit> {
        self.shadow_bits.iter().find(|(n, _)| n == attribute).map(|(_, b)| *b)
    }
}

pub fn holder_name(index: usize) -> String {
    format!("isNullBits{}", index)
}

fn bit_at(index: usize) -> NullBit {
    NullBit {
        holder: index / HOLDER_BITS,
        position: (index % HOLDER_BITS) as u32,
    }
}

/// Assign on-heap null bits.
///
/// `nullable` is every nullable primitive in declaration order;
/// `mutable_pk_nullable` the subset that are mutable primary keys, which
/// get their shadow bits after the first `nullable.len()` bits.
pub fn on_heap_layout(nullable: &[String], mutable_pk_nullable: &[String], init_null: bool) -> OnHeapLayout {
    let first = nullable.len();
    let total = first + mutable_pk_nullable.len();

    let bits = nullable
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), bit_at(i)))
        .collect();
    let shadow_bits = mutable_pk_nullable
        .iter()
        .enumerate()
        .map(|(j, n)| (n.clone(), bit_at(first + j)))
        .collect();

    let holders = (0..total.div_ceil(HOLDER_BITS))
        .map(|h| {
            let bits_used = (total - h * HOLDER_BITS).min(HOLDER_BITS);
            let initial = match (init_null, bits_used) {
                (false, _) => 0,
                (true, HOLDER_BITS) => u64::MAX,
                (true, used) => (1u64 << used) - 1,
            };
            NullBitsHolder {
                name: holder_name(h),
                width: HolderWidth::for_bits(bits_used),
                bits_used,
                initial,
            }
        })
        .collect();

    OnHeapLayout {
        holders,
        bits,
        shadow_bits,
    }
}

// ============================================================================
// Off-heap
// ============================================================================

/// Input to [`off_heap_layout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffHeapField {
    pub name: String,
    pub ty: SemanticType,
    pub primary_key: bool,
    pub nullable: bool,
    pub is_source: bool,
}

/// Result of [`off_heap_layout`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OffHeapLayout {
    pub data_version_offset: Option<u32>,
    /// Offset of the first null word.
    pub null_bits_offset: u32,
    pub null_words: u32,
    /// Fields in layout order.
    pub slots: Vec<(String, OffHeapSlot)>,
    /// Record size in bytes, always even.
    pub size: u32,
    /// SHA-256 over the rest of the layout.
    pub fingerprint: String,
}

impl OffHeapLayout {
    pub fn slot(&self, attribute: &str) -> Option<OffHeapSlot> {
        self.slots.iter().find(|(n, _)| n == attribute).map(|(_, s)| *s)
    }
}

/// SHA-256 of the JSON rendering of `value`, as lowercase hex.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Lay out a compact record. The result does not depend on the order of
/// `fields`.
pub fn off_heap_layout(fields: &[OffHeapField], has_as_of: bool) -> Result<OffHeapLayout, LayoutError> {
    let mut ordered: Vec<&OffHeapField> = fields.iter().collect();
    ordered.sort_by(|a, b| {
        b.is_source
            .cmp(&a.is_source)
            .then_with(|| b.primary_key.cmp(&a.primary_key))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut offset = 0u32;
    let data_version_offset = if has_as_of {
        offset += DATA_VERSION_SIZE;
        Some(0)
    } else {
        None
    };

    let null_count = ordered
        .iter()
        .filter(|f| f.nullable && f.ty.needs_null_bit())
        .count() as u32;
    let null_words = null_count.div_ceil(OFF_HEAP_WORD_BITS);
    let null_bits_offset = offset;
    offset += null_words * 4;

    let mut slots = Vec::with_capacity(ordered.len());
    let mut next_bit = 0u32;
    for field in ordered {
        let size = field.ty.off_heap_size().ok_or_else(|| LayoutError::UnsupportedType {
            attribute: field.name.clone(),
            ty: field.ty,
        })?;
        let null_bit = if field.nullable && field.ty.needs_null_bit() {
            let word = next_bit / OFF_HEAP_WORD_BITS;
            let bit = (null_bits_offset + word * 4, next_bit % OFF_HEAP_WORD_BITS);
            next_bit += 1;
            Some(bit)
        } else {
            None
        };
        slots.push((
            field.name.clone(),
            OffHeapSlot {
                offset,
                size,
                null_bit,
            },
        ));
        offset += size;
    }

    let mut layout = OffHeapLayout {
        data_version_offset,
        null_bits_offset,
        null_words,
        slots,
        size: offset + offset % 2,
        fingerprint: String::new(),
    };
    layout.fingerprint = fingerprint(&layout)?;
    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn field(name: &str, ty: SemanticType, primary_key: bool, nullable: bool) -> OffHeapField {
        OffHeapField {
            name: name.into(),
            ty,
            primary_key,
            nullable,
            is_source: false,
        }
    }

    #[test]
    fn test_seventy_nullables_use_two_holders() {
        let layout = on_heap_layout(&names("a", 70), &[], false);
        assert_eq!(layout.holders.len(), 2);
        assert_eq!(layout.holders[0].width, HolderWidth::Long);
        assert_eq!(layout.holders[1].bits_used, 6);
        assert_eq!(layout.holders[1].width, HolderWidth::Byte);
        assert_eq!(layout.bit("a0"), Some(NullBit { holder: 0, position: 0 }));
        assert_eq!(layout.bit("a64"), Some(NullBit { holder: 1, position: 0 }));
        assert_eq!(layout.bit("a69"), Some(NullBit { holder: 1, position: 5 }));
    }

    #[test]
    fn test_holder_width_thresholds() {
        assert_eq!(HolderWidth::for_bits(8), HolderWidth::Byte);
        assert_eq!(HolderWidth::for_bits(9), HolderWidth::Short);
        assert_eq!(HolderWidth::for_bits(16), HolderWidth::Short);
        assert_eq!(HolderWidth::for_bits(31), HolderWidth::Int);
        assert_eq!(HolderWidth::for_bits(32), HolderWidth::Long);
    }

    #[test]
    fn test_shadow_bits_follow_first_space() {
        let layout = on_heap_layout(&names("a", 3), &["a1".to_string()], true);
        assert_eq!(layout.shadow_bit("a1"), Some(NullBit { holder: 0, position: 3 }));
        assert_eq!(layout.holders[0].bits_used, 4);
        assert_eq!(layout.holders[0].initial, 0b1111);
    }

    #[test]
    fn test_appending_keeps_existing_bits() {
        let before = on_heap_layout(&names("a", 64), &[], false);
        let after = on_heap_layout(&names("a", 65), &[], false);
        assert_eq!(before.bits[..], after.bits[..64]);
        assert_eq!(after.holders.len(), 2);
    }

    #[test]
    fn test_empty_layout() {
        let layout = on_heap_layout(&[], &[], true);
        assert!(layout.holders.is_empty());
    }

    #[test]
    fn test_off_heap_order_and_offsets() {
        let fields = vec![
            field("quantity", SemanticType::Int, false, true),
            field("amount", SemanticType::Double, false, false),
            field("id", SemanticType::Long, true, false),
            field("code", SemanticType::String, false, false),
            field("flag", SemanticType::Boolean, false, true),
            OffHeapField {
                is_source: true,
                ..field("region", SemanticType::Char, false, false)
            },
        ];
        let layout = off_heap_layout(&fields, true).unwrap();
        let order: Vec<&str> = layout.slots.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(order, vec!["region", "id", "amount", "code", "flag", "quantity"]);

        assert_eq!(layout.data_version_offset, Some(0));
        assert_eq!(layout.null_bits_offset, 4);
        assert_eq!(layout.null_words, 1);
        assert_eq!(layout.slot("region").unwrap().offset, 8);
        assert_eq!(layout.slot("id").unwrap().offset, 10);
        assert_eq!(layout.slot("amount").unwrap().offset, 18);
        assert_eq!(layout.slot("code").unwrap().offset, 26);
        assert_eq!(layout.slot("flag").unwrap().offset, 30);
        assert_eq!(layout.slot("flag").unwrap().null_bit, None);
        assert_eq!(layout.slot("quantity").unwrap().offset, 31);
        assert_eq!(layout.slot("quantity").unwrap().null_bit, Some((4, 0)));
        assert_eq!(layout.size, 36);
    }

    #[test]
    fn test_off_heap_is_order_independent() {
        let mut fields = vec![
            field("b", SemanticType::Int, false, true),
            field("a", SemanticType::Short, false, true),
            field("id", SemanticType::Int, true, false),
        ];
        let first = off_heap_layout(&fields, false).unwrap();
        fields.reverse();
        let second = off_heap_layout(&fields, false).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.fingerprint.len(), 64);
    }

    #[test]
    fn test_off_heap_rejects_variable_width() {
        let fields = vec![field("price", SemanticType::Decimal, false, false)];
        assert!(matches!(
            off_heap_layout(&fields, false),
            Err(LayoutError::UnsupportedType { .. })
        ));
    }
}
