//! Index usability against a dated, sharded target whose primary key and
//! unique indices carry implicit source and as-of columns.

use objmeta::compile::{compile_schema, CompileOptions};
use objmeta::model::raw::{RawAsOfAttribute, RawAttribute, RawIndex, RawObject, RawRelationship, RawSchema, RawSourceAttribute};
use objmeta::model::{Cardinality, SemanticType};
use objmeta::semantic::IndexResolution;
use objmeta::ResolvedModel;

fn pk(name: &str) -> RawAttribute {
    RawAttribute {
        primary_key: true,
        ..RawAttribute::new(name, SemanticType::Int)
    }
}

fn to_one(name: &str, query: &str) -> RawRelationship {
    RawRelationship {
        name: name.into(),
        related: "Product".into(),
        cardinality: Some(Cardinality::ManyToOne),
        query: query.into(),
        ..Default::default()
    }
}

fn product() -> RawObject {
    RawObject {
        name: "Product".into(),
        package: "com.acme.catalog".into(),
        attributes: vec![
            pk("id"),
            RawAttribute::new("code", SemanticType::String),
            RawAttribute::new("sku", SemanticType::String),
        ],
        as_of_attributes: vec![RawAsOfAttribute {
            name: "businessDate".into(),
            from_column: "FROM_Z".into(),
            to_column: "THRU_Z".into(),
            ..Default::default()
        }],
        source_attribute: Some(RawSourceAttribute {
            name: "region".into(),
            ty: SemanticType::String,
        }),
        indices: vec![RawIndex {
            name: "bySku".into(),
            attributes: vec!["sku".into()],
            unique: true,
        }],
        ..Default::default()
    }
}

fn line() -> RawObject {
    RawObject {
        name: "Line".into(),
        package: "com.acme.catalog".into(),
        attributes: vec![
            pk("id"),
            RawAttribute::new("productId", SemanticType::Int),
            RawAttribute::new("code", SemanticType::String),
            RawAttribute::new("sku", SemanticType::String),
        ],
        relationships: vec![
            to_one(
                "product",
                "this.productId = Product.id and Product.businessDate equalsEdgePoint",
            ),
            to_one(
                "superset",
                "this.productId = Product.id and this.code = Product.code and Product.businessDate equalsEdgePoint",
            ),
            to_one("skuProduct", "this.sku = Product.sku and Product.businessDate equalsEdgePoint"),
        ],
        ..Default::default()
    }
}

fn compile() -> ResolvedModel {
    let schema = RawSchema {
        objects: vec![product(), line()],
        ..Default::default()
    };
    match compile_schema(schema, CompileOptions::default()) {
        Ok(model) => model,
        Err(e) => panic!("{e}"),
    }
}

fn resolution(model: &ResolvedModel, relationship: &str) -> IndexResolution {
    let line = model.object("Line").unwrap();
    line.relationship(relationship)
        .unwrap()
        .relationship
        .analysis
        .index_resolution
        .clone()
}

#[test]
fn test_declared_key_resolves_through_primary_key() {
    let model = compile();
    assert_eq!(resolution(&model, "product"), IndexResolution::PrimaryKey);
}

#[test]
fn test_key_plus_extra_attribute_is_a_scan() {
    let model = compile();
    assert_eq!(resolution(&model, "superset"), IndexResolution::Scan);
    assert!(model.warnings().iter().any(|w| w.object == "Line"
        && w.message
            == "Relationship superset in object Line is declared as -to-one, but does not match a unique index in Product"));
}

#[test]
fn test_unique_index_ignores_implicit_columns() {
    let model = compile();
    assert_eq!(resolution(&model, "skuProduct"), IndexResolution::UniqueIndex("bySku".into()));
    assert!(!model
        .warnings()
        .iter()
        .any(|w| w.message.starts_with("Relationship product ") || w.message.starts_with("Relationship skuProduct ")));
}
