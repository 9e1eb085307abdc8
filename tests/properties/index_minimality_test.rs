//! The physical index set is prefix-free and still covers every logical
//! index, either directly or through a unique prefix that makes it
//! redundant.

use objmeta::compile::{compile_schema, CompileOptions};
use objmeta::model::raw::{RawAttribute, RawIndex, RawObject, RawSchema};
use objmeta::model::SemanticType;
use objmeta::ResolvedObject;

const ATTRIBUTES: [&str; 4] = ["account", "book", "desk", "trader"];

/// Every ordered selection of 1 to 3 distinct attributes.
fn sequences() -> Vec<Vec<&'static str>> {
    let mut out: Vec<Vec<&'static str>> = ATTRIBUTES.iter().map(|a| vec![*a]).collect();
    for _ in 0..2 {
        let longer: Vec<Vec<&'static str>> = out
            .iter()
            .filter(|s| s.len() == out.iter().map(Vec::len).max().unwrap_or(0))
            .flat_map(|s| {
                ATTRIBUTES
                    .iter()
                    .filter(|a| !s.contains(a))
                    .map(|a| {
                        let mut next = s.clone();
                        next.push(*a);
                        next
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        out.extend(longer);
    }
    out
}

/// Deterministic index sets drawn from [`sequences`].
fn index_sets() -> Vec<Vec<RawIndex>> {
    let pool = sequences();
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };
    (0..200)
        .map(|_| {
            let count = 1 + (next() % 6) as usize;
            (0..count)
                .map(|i| {
                    let attrs = &pool[(next() % pool.len() as u64) as usize];
                    RawIndex {
                        name: format!("idx{}", i),
                        attributes: attrs.iter().map(|a| a.to_string()).collect(),
                        unique: next() % 4 == 0,
                    }
                })
                .collect()
        })
        .collect()
}

fn trade(indices: Vec<RawIndex>) -> RawObject {
    let mut attributes = vec![RawAttribute {
        primary_key: true,
        ..RawAttribute::new("id", SemanticType::Long)
    }];
    attributes.extend(ATTRIBUTES.iter().map(|a| RawAttribute::new(*a, SemanticType::String)));
    RawObject {
        name: "Trade".into(),
        package: "com.acme.trading".into(),
        attributes,
        indices,
        ..Default::default()
    }
}

fn compile(indices: Vec<RawIndex>) -> ResolvedObject {
    let schema = RawSchema {
        objects: vec![trade(indices)],
        ..Default::default()
    };
    let model = compile_schema(schema, CompileOptions::default()).unwrap();
    model.object("Trade").unwrap().clone()
}

fn is_prefix(short: &[String], long: &[String]) -> bool {
    short.len() <= long.len() && long[..short.len()] == *short
}

fn logical_columns(object: &ResolvedObject, attributes: &[String]) -> Vec<String> {
    attributes
        .iter()
        .map(|a| object.attribute(a).unwrap().attribute.column.clone().unwrap())
        .collect()
}

#[test]
fn test_no_physical_index_is_a_prefix_of_another() {
    for indices in index_sets() {
        let object = compile(indices);
        let physical = &object.physical_indices;
        for (i, a) in physical.iter().enumerate() {
            for (j, b) in physical.iter().enumerate() {
                if i != j {
                    assert!(
                        !is_prefix(&a.columns, &b.columns),
                        "{} {:?} is a prefix of {} {:?}",
                        a.name,
                        a.columns,
                        b.name,
                        b.columns
                    );
                }
            }
        }
    }
}

#[test]
fn test_every_logical_index_is_covered() {
    for indices in index_sets() {
        let object = compile(indices);
        for index in object.indices.iter().filter(|i| !i.is_redundant()) {
            let columns = logical_columns(&object, &index.attributes);
            let covered = object.physical_indices.iter().any(|p| {
                is_prefix(&columns, &p.columns) || (p.unique && is_prefix(&p.columns, &columns))
            });
            assert!(
                covered,
                "{} {:?} not covered by {:?}",
                index.name,
                columns,
                object.physical_indices
            );
        }
    }
}

#[test]
fn test_every_unique_constraint_is_kept() {
    for indices in index_sets() {
        let object = compile(indices);
        for index in object.indices.iter().filter(|i| i.unique && !i.is_redundant()) {
            let columns = logical_columns(&object, &index.attributes);
            assert!(
                object
                    .physical_indices
                    .iter()
                    .any(|p| p.unique && is_prefix(&p.columns, &columns)),
                "unique {} {:?} lost from {:?}",
                index.name,
                columns,
                object.physical_indices
            );
        }
    }
}

#[test]
fn test_primary_key_first_and_names_sequential() {
    for indices in index_sets() {
        let object = compile(indices);
        let physical = &object.physical_indices;
        assert_eq!(physical[0].name, "TRADE_pk");
        assert!(physical[0].primary_key);
        for (n, p) in physical.iter().skip(1).enumerate() {
            assert_eq!(p.name, format!("TRADE_idx{}", n));
        }
    }
}
