//! Every independent problem in a schema is reported by a single run.

use objmeta::compile::{compile_schema, CompileError, CompileOptions};
use objmeta::config::GenerationSettings;
use objmeta::model::raw::{RawAttribute, RawIndex, RawObject, RawRelationship, RawSchema};
use objmeta::model::{Cardinality, SemanticType};
use objmeta::semantic::{ErrorReport, ResolutionContext};
use objmeta::validation::validate;

fn pk(name: &str) -> RawAttribute {
    RawAttribute {
        primary_key: true,
        ..RawAttribute::new(name, SemanticType::Int)
    }
}

fn object(name: &str, attributes: Vec<RawAttribute>) -> RawObject {
    RawObject {
        name: name.into(),
        package: "com.acme.ledger".into(),
        attributes,
        ..Default::default()
    }
}

fn rel(name: &str, related: &str, query: &str) -> RawRelationship {
    RawRelationship {
        name: name.into(),
        related: related.into(),
        cardinality: Some(Cardinality::ManyToOne),
        query: query.into(),
        ..Default::default()
    }
}

fn broken_schema() -> RawSchema {
    let account = object("Account", vec![RawAttribute::new("code", SemanticType::String)]);

    let mut book = object(
        "Book",
        vec![pk("id"), RawAttribute::new("name", SemanticType::String), RawAttribute::new("name", SemanticType::String)],
    );
    book.indices.push(RawIndex {
        name: "byMissing".into(),
        attributes: vec!["missing".into()],
        unique: false,
    });

    let mut client = object("Client", vec![pk("id"), RawAttribute::new("bookId", SemanticType::Int)]);
    client.relationships.push(rel("ghost", "Ghost", "this.bookId = Ghost.id"));
    client.relationships.push(rel("book", "Book", "this.bookId = = Book.id"));

    let deal = object(
        "Deal",
        vec![
            pk("id"),
            RawAttribute {
                precision: Some(3),
                scale: Some(5),
                ..RawAttribute::new("rate", SemanticType::Decimal)
            },
        ],
    );

    let mut entity = object("Entity", vec![pk("id")]);
    entity.package = "com.Acme.ledger".into();

    let fine = object("Fine", vec![pk("id")]);

    RawSchema {
        objects: vec![account, book, client, deal, entity, fine],
        ..Default::default()
    }
}

fn report() -> ErrorReport {
    match compile_schema(broken_schema(), CompileOptions::default()) {
        Err(CompileError::Validation { report, .. }) => report,
        Err(other) => panic!("expected validation failure, got {other}"),
        Ok(_) => panic!("broken schema compiled"),
    }
}

#[test]
fn test_all_objects_reported() {
    let report = report();
    let failed: Vec<&str> = report.iter().map(|o| o.object.as_str()).collect();
    assert_eq!(failed, vec!["Account", "Book", "Client", "Deal", "Entity"]);
    assert!(report.get("Fine").is_none());
}

#[test]
fn test_object_level_errors() {
    let report = report();

    assert_eq!(report.get("Account").unwrap().errors, vec!["No primary key defined!"]);
    assert_eq!(
        report.get("Book").unwrap().errors,
        vec![
            "duplicate attribute name name in Book",
            "duplicate column name NAME for attribute name in Book",
            "Could not resolve attribute missing for index byMissing",
        ]
    );
    assert_eq!(
        report.get("Deal").unwrap().errors,
        vec!["Invalid scale value 5. BigDecimal attribute 'rate' in Deal must specify a scale < precision."]
    );
    assert_eq!(
        report.get("Entity").unwrap().errors,
        vec!["package name com.Acme.ledger of Entity must be lowercase"]
    );
}

#[test]
fn test_relationship_errors_keyed_by_name() {
    let report = report();
    let client = report.get("Client").unwrap();
    assert!(client.errors.is_empty());
    assert_eq!(
        client.relationship_errors["ghost"],
        vec!["related object Ghost of relationship ghost is not defined; it may be missing from the schema manifest"]
    );
    assert!(client.relationship_errors["book"][0].starts_with("cannot parse query 'this.bookId = = Book.id'"));
}

#[test]
fn test_counts_match_messages() {
    let err = compile_schema(broken_schema(), CompileOptions::default()).unwrap_err();
    let CompileError::Validation {
        object_count,
        error_count,
        report,
    } = err
    else {
        panic!("expected validation failure");
    };
    assert_eq!(object_count, 5);
    assert_eq!(error_count, report.messages().len());
    assert!(report.to_string().contains("Errors in Deal:"));
}

#[test]
fn test_validator_reports_without_compiling() {
    let mut ctx = ResolutionContext::new(broken_schema(), GenerationSettings::default());
    let validation = validate(&mut ctx);
    assert!(!validation.is_ok());
    assert!(validation.warnings.is_empty());
    assert_eq!(validation.report.object_count(), 5);
}

#[test]
fn test_attribute_errors_do_not_hide_other_problems() {
    let mut customer = object(
        "Customer",
        vec![
            pk("id"),
            RawAttribute {
                precision: Some(3),
                scale: Some(5),
                ..RawAttribute::new("rate", SemanticType::Decimal)
            },
        ],
    );
    customer.indices.push(RawIndex {
        name: "byMissing".into(),
        attributes: vec!["missing".into()],
        unique: false,
    });
    customer.relationships.push(rel("bad", "Ghost", "this.id = Ghost.id"));

    let mut order = object("Order", vec![pk("id"), RawAttribute::new("customerId", SemanticType::Int)]);
    order.relationships.push(rel("customer", "Customer", "this.customerId = Customer.id"));

    let schema = RawSchema {
        objects: vec![customer, order],
        ..Default::default()
    };
    let report = match compile_schema(schema, CompileOptions::default()) {
        Err(CompileError::Validation { report, .. }) => report,
        Err(other) => panic!("expected validation failure, got {other}"),
        Ok(_) => panic!("broken schema compiled"),
    };

    let customer = report.get("Customer").unwrap();
    assert_eq!(
        customer.errors,
        vec![
            "Invalid scale value 5. BigDecimal attribute 'rate' in Customer must specify a scale < precision.",
            "Could not resolve attribute missing for index byMissing",
        ]
    );
    assert_eq!(
        customer.relationship_errors["bad"],
        vec!["related object Ghost of relationship bad is not defined; it may be missing from the schema manifest"]
    );
    assert!(report.get("Order").is_none(), "{}", report);
}
