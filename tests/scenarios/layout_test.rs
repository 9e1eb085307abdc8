//! Null-bit and off-heap layouts through the whole pipeline.

use insta::assert_snapshot;
use objmeta::compile::{compile_schema, CompileError, CompileOptions};
use objmeta::model::raw::{RawAsOfAttribute, RawAttribute, RawObject, RawSchema};
use objmeta::model::SemanticType;
use objmeta::resolved::accessors::holder_initializer;
use objmeta::semantic::layout::{on_heap_layout, HolderWidth};

fn pk(name: &str) -> RawAttribute {
    RawAttribute {
        primary_key: true,
        ..RawAttribute::new(name, SemanticType::Int)
    }
}

fn nullable(name: &str, ty: SemanticType) -> RawAttribute {
    RawAttribute {
        nullable: Some(true),
        ..RawAttribute::new(name, ty)
    }
}

fn schema(objects: Vec<RawObject>) -> RawSchema {
    RawSchema {
        objects,
        ..Default::default()
    }
}

fn wide_object() -> RawObject {
    let mut attributes = vec![pk("id"), nullable("flag", SemanticType::Boolean)];
    attributes.extend((0..70).map(|i| nullable(&format!("value{:02}", i), SemanticType::Long)));
    RawObject {
        name: "Wide".into(),
        package: "com.acme.metrics".into(),
        attributes,
        ..Default::default()
    }
}

// ============================================================================
// On-heap
// ============================================================================

#[test]
fn test_seventy_nullable_primitives() {
    let model = compile_schema(schema(vec![wide_object()]), CompileOptions::default()).unwrap();
    let wide = model.object("Wide").unwrap();

    let holders: Vec<String> = wide
        .on_heap
        .holders
        .iter()
        .map(|h| format!("{} {} = {} ({} bits)", h.width.type_name(), h.name, holder_initializer(h), h.bits_used))
        .collect();
    assert_snapshot!(holders.join("\n"), @r"
    long isNullBits0 = 0 (64 bits)
    byte isNullBits1 = 0 (6 bits)
    ");

    // booleans never take a bit
    assert!(wide.attribute("flag").unwrap().null_check.is_none());

    let last_of_first = wide.attribute("value63").unwrap().null_check.as_ref().unwrap();
    assert_eq!(last_of_first.holder, "isNullBits0");
    assert_eq!(last_of_first.mask, "1L << 63");

    let first_of_second = wide.attribute("value64").unwrap().null_check.as_ref().unwrap();
    assert_eq!(first_of_second.holder, "isNullBits1");
    assert_eq!(first_of_second.test, "(isNullBits1 & 1) != 0");
}

#[test]
fn test_initialize_primitives_to_null() {
    let options = CompileOptions::default().with_initialize_primitives_to_null(true);
    let model = compile_schema(schema(vec![wide_object()]), options).unwrap();
    let holders = &model.object("Wide").unwrap().on_heap.holders;
    assert_eq!(holders[0].initial, u64::MAX);
    assert_eq!(holder_initializer(&holders[1]), "(byte) 0x3f");
}

#[test]
fn test_appending_keeps_existing_bits() {
    let before: Vec<String> = (0..40).map(|i| format!("a{}", i)).collect();
    let mut after = before.clone();
    after.push("extra".to_string());

    let small = on_heap_layout(&before, &[], false);
    let large = on_heap_layout(&after, &[], false);
    for name in &before {
        assert_eq!(small.bit(name), large.bit(name), "{name}");
    }
    assert_eq!(large.holders[0].width, HolderWidth::Long);
}

#[test]
fn test_layout_is_deterministic() {
    let first = compile_schema(schema(vec![wide_object()]), CompileOptions::default()).unwrap();
    let second = compile_schema(schema(vec![wide_object()]), CompileOptions::default()).unwrap();
    assert_eq!(
        first.object("Wide").unwrap().layout_fingerprint,
        second.object("Wide").unwrap().layout_fingerprint
    );
}

// ============================================================================
// Decimal bounds
// ============================================================================

#[test]
fn test_decimal_scale_above_precision_fails() {
    let price = RawAttribute {
        precision: Some(4),
        scale: Some(6),
        ..RawAttribute::new("price", SemanticType::Decimal)
    };
    let product = RawObject {
        name: "Product".into(),
        package: "com.acme.catalog".into(),
        attributes: vec![pk("id"), price],
        ..Default::default()
    };

    let err = compile_schema(schema(vec![product]), CompileOptions::default()).unwrap_err();
    let CompileError::Validation { report, error_count, .. } = err else {
        panic!("expected validation failure");
    };
    assert_eq!(error_count, 1);
    assert_eq!(
        report.get("Product").unwrap().errors,
        vec!["Invalid scale value 6. BigDecimal attribute 'price' in Product must specify a scale < precision."]
    );
}

// ============================================================================
// Off-heap
// ============================================================================

fn dated(extra: Vec<RawAttribute>) -> RawObject {
    let mut attributes = vec![pk("id"), nullable("qty", SemanticType::Int)];
    attributes.extend(extra);
    RawObject {
        name: "Position".into(),
        package: "com.acme.risk".into(),
        attributes,
        as_of_attributes: vec![RawAsOfAttribute {
            name: "businessDate".into(),
            from_column: "FROM_Z".into(),
            to_column: "THRU_Z".into(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn test_off_heap_record() {
    let options = CompileOptions::default().with_off_heap(true);
    let model = compile_schema(schema(vec![dated(vec![])]), options).unwrap();
    let position = model.object("Position").unwrap();
    let layout = position.off_heap.as_ref().expect("dated object qualifies");

    assert_eq!(layout.data_version_offset, Some(0));
    assert_eq!(layout.null_words, 1);
    let slots: Vec<String> = layout
        .slots
        .iter()
        .map(|(name, slot)| format!("{} @{} +{}", name, slot.offset, slot.size))
        .collect();
    assert_snapshot!(slots.join("\n"), @r"
    id @8 +4
    businessDateFrom @12 +8
    businessDateTo @20 +8
    qty @28 +4
    ");
    assert_eq!(layout.size, 32);

    let qty = position.attribute("qty").unwrap();
    assert_eq!(qty.attribute.off_heap.unwrap().null_bit, Some((4, 0)));
    assert_eq!(position.physical_indices[0].columns, vec!["ID", "THRU_Z"]);
}

#[test]
fn test_off_heap_skipped_for_decimal() {
    let amount = RawAttribute {
        precision: Some(18),
        scale: Some(2),
        ..RawAttribute::new("amount", SemanticType::Decimal)
    };
    let options = CompileOptions::default().with_off_heap(true);
    let model = compile_schema(schema(vec![dated(vec![amount])]), options).unwrap();
    assert!(model.object("Position").unwrap().off_heap.is_none());
}

#[test]
fn test_off_heap_needs_as_of_attributes() {
    let options = CompileOptions::default().with_off_heap(true);
    let model = compile_schema(schema(vec![wide_object()]), options).unwrap();
    assert!(model.object("Wide").unwrap().off_heap.is_none());
}
