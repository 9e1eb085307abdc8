//! Order / Customer / OrderItem: reverse installation, ownership, implied
//! indices and foreign keys through the whole pipeline.

use objmeta::compile::{compile_schema, CompileOptions};
use objmeta::model::{Cardinality, RawSchema};
use objmeta::semantic::IndexResolution;
use objmeta::ResolvedModel;

const MANIFEST: &str = r#"{
    "objects": [
        {
            "name": "Order",
            "package": "com.acme.sales",
            "attributes": [
                { "name": "id", "type": "int", "primary_key": true },
                { "name": "customerId", "type": "int" },
                { "name": "placedAt", "type": "timestamp" },
                { "name": "discount", "type": "double", "nullable": true }
            ],
            "relationships": [
                {
                    "name": "customer",
                    "related": "Customer",
                    "cardinality": "many-to-one",
                    "query": "this.customerId = Customer.id",
                    "reverse_name": "orders"
                },
                {
                    "name": "items",
                    "related": "OrderItem",
                    "cardinality": "one-to-many",
                    "query": "this.id = OrderItem.orderId",
                    "related_is_dependent": true,
                    "order_by": "position desc"
                }
            ]
        },
        {
            "name": "Customer",
            "package": "com.acme.sales",
            "attributes": [
                { "name": "id", "type": "int", "primary_key": true },
                { "name": "name", "type": "string", "max_length": 64 }
            ]
        },
        {
            "name": "OrderItem",
            "package": "com.acme.sales",
            "attributes": [
                { "name": "id", "type": "int", "primary_key": true },
                { "name": "orderId", "type": "int" },
                { "name": "position", "type": "int" },
                { "name": "quantity", "type": "int", "nullable": true }
            ]
        }
    ]
}"#;

fn compile() -> ResolvedModel {
    let schema = RawSchema::from_json(MANIFEST).expect("manifest should load");
    match compile_schema(schema, CompileOptions::default()) {
        Ok(model) => model,
        Err(e) => panic!("{e}"),
    }
}

#[test]
fn test_objects_in_processing_order() {
    let model = compile();
    let names: Vec<&str> = model.objects().iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["Customer", "Order", "OrderItem"]);
    assert!(model.warnings().is_empty(), "{:?}", model.warnings());
}

#[test]
fn test_reverse_relationship_installed_on_customer() {
    let model = compile();
    let customer = model.object("Customer").unwrap();
    let orders = customer.relationship("orders").expect("reverse installed");

    assert!(orders.relationship.is_reverse);
    assert_eq!(orders.relationship.cardinality, Cardinality::OneToMany);
    assert_eq!(orders.relationship.query, "Order.customerId = this.id");
    assert!(!orders.relationship.has_setter);
    assert!(orders.owned_attributes.is_empty());

    assert_eq!(orders.predicate.equalities.len(), 1);
    assert_eq!(orders.predicate.equalities[0].this_attribute, "id");
    assert_eq!(orders.predicate.equalities[0].related_attribute, "customerId");
}

#[test]
fn test_many_to_one_resolves_through_primary_key() {
    let model = compile();
    let order = model.object("Order").unwrap();
    let customer = order.relationship("customer").unwrap();

    assert_eq!(customer.relationship.analysis.index_resolution, IndexResolution::PrimaryKey);
    assert!(customer.relationship.analysis.pure_equality);
    assert_eq!(customer.owned_attributes, vec!["Order.customerId"]);

    let reverse = customer.reverse_predicate.as_ref().unwrap();
    assert_eq!(reverse.equalities[0].this_attribute, "id");
    assert!(reverse.residual.is_none());
}

#[test]
fn test_dependent_items_own_order_id() {
    let model = compile();
    let order = model.object("Order").unwrap();
    let items = order.relationship("items").unwrap();

    assert!(items.relationship.related_is_dependent);
    assert_eq!(items.owned_attributes, vec!["OrderItem.orderId"]);
    assert_eq!(items.relationship.order_by[0].attribute, "position");

    let item = model.object("OrderItem").unwrap();
    let order_id = item.attribute("orderId").unwrap();
    let owner = order_id.attribute.owning_relationship.as_ref().unwrap();
    assert_eq!((owner.object.as_str(), owner.relationship.as_str()), ("Order", "items"));
}

#[test]
fn test_implied_indices_become_physical() {
    let model = compile();

    let order = model.object("Order").unwrap();
    let physical: Vec<(&str, Vec<&str>)> = order
        .physical_indices
        .iter()
        .map(|p| (p.name.as_str(), p.columns.iter().map(String::as_str).collect()))
        .collect();
    assert_eq!(
        physical,
        vec![("ORDER_pk", vec!["ID"]), ("ORDER_idx0", vec!["CUSTOMER_ID"])]
    );
    assert_eq!(order.physical_indices[1].logical, "ordersIndex");

    let item = model.object("OrderItem").unwrap();
    assert!(item.indices.iter().any(|i| i.name == "itemsIndex"));
    assert_eq!(item.physical_indices[1].columns, vec!["ORDER_ID"]);
}

#[test]
fn test_foreign_keys() {
    let model = compile();

    let order = model.object("Order").unwrap();
    assert_eq!(order.foreign_keys.len(), 1);
    assert_eq!(order.foreign_keys[0].name, "ORDER_fk0");
    assert_eq!(order.foreign_keys[0].target_table, "CUSTOMER");
    assert_eq!(
        order.foreign_keys[0].columns,
        vec![("CUSTOMER_ID".to_string(), "ID".to_string())]
    );

    let item = model.object("OrderItem").unwrap();
    assert_eq!(item.foreign_keys.len(), 1);
    assert_eq!(item.foreign_keys[0].target, "Order");

    assert!(model.object("Customer").unwrap().foreign_keys.is_empty());
}

#[test]
fn test_accessors_and_null_bits() {
    let model = compile();
    let order = model.object("Order").unwrap();

    assert_eq!(order.on_heap.holders.len(), 1);
    assert_eq!(order.on_heap.holders[0].bits_used, 1);

    let discount = order.attribute("discount").unwrap();
    assert_eq!(discount.accessors.getter, "getDiscount");
    assert_eq!(discount.null_check.as_ref().unwrap().test, "(isNullBits0 & 1) != 0");
    assert!(order.attribute("placedAt").unwrap().null_check.is_none());
    assert!(order.off_heap.is_none());
}

#[test]
fn test_model_serializes() {
    let model = compile();
    let json = serde_json::to_value(&model).unwrap();
    assert_eq!(json["objects"].as_array().unwrap().len(), 3);
    assert_eq!(json["objects"][1]["name"], "Order");
}
