//! Erased invocation through the registry, the way the dispatcher drives it.

use colloquy_core::FeaturedParts;
use colloquy_tools::catalog::{InMemoryCatalog, Work, WorkCategory, WorkPart};
use colloquy_tools::inventory::InventoryStore;
use colloquy_tools::{catalog_registry, inventory_registry, ToolLookup, ToolRegistry};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

fn seeded_registry() -> ToolRegistry {
    let store = InventoryStore::new();
    store.seed_sample_inventory();
    inventory_registry(store).expect("registry should build")
}

async fn invoke(registry: &ToolRegistry, name: &str, input: Value) -> Value {
    match registry.lookup(name) {
        ToolLookup::Found(tool) => tool
            .invoke_json(input)
            .await
            .expect("invocation should succeed")
            .result()
            .clone(),
        ToolLookup::Unknown { name } => panic!("tool {} should be registered", name),
    }
}

#[tokio::test]
async fn every_inventory_result_carries_success_flag() {
    let registry = seeded_registry();
    let calls = [
        ("list_items", json!({"category": "books"})),
        ("get_item_details", json!({"item_id": 1})),
        ("create_item", json!({"name": "Ektara"})),
        ("update_item", json!({"item_name": "Ektara", "price": 35})),
        ("record_transaction", json!({"item_name": "Ektara", "transaction_type": "sale"})),
        ("inventory_analytics", json!({})),
    ];

    for (name, input) in calls {
        let result = invoke(&registry, name, input).await;
        assert!(result.get("success").and_then(Value::as_bool).is_some(), "{}: {}", name, result);
    }
}

#[tokio::test]
async fn failed_sale_leaves_outcome_formattable() {
    let registry = seeded_registry();
    let ToolLookup::Found(tool) = registry.lookup("record_transaction") else {
        panic!("record_transaction should be registered");
    };
    let outcome = tool
        .invoke_json(json!({"item_name": "Gitanjali", "transaction_type": "sale", "quantity": 500}))
        .await
        .expect("domain failures are not faults");
    assert_eq!(outcome.result()["success"], false);
    let segments = outcome.format();
    assert_eq!(
        segments[0].text,
        "\n\nError: Insufficient stock: 25 available, 500 requested\n\n"
    );
}

#[tokio::test]
async fn catalog_registry_reads_works() {
    let catalog = InMemoryCatalog::from_works(vec![Work {
        id: 1,
        title: "Kabuliwala".to_string(),
        category: WorkCategory::ShortStories,
        date_created: None,
        parts: vec![WorkPart {
            part_number: 1,
            content: "My five years' old daughter Mini".to_string(),
        }],
    }]);
    let registry = catalog_registry(Arc::new(catalog), FeaturedParts::default())
        .expect("registry should build");

    let listing = invoke(&registry, "list_works", json!({"category": "short-stories"})).await;
    assert_eq!(listing["count"], 1);
    assert_eq!(listing["works"][0]["title"], "Kabuliwala");

    let content = invoke(&registry, "get_work_content", json!({"title": "kabuli"})).await;
    assert_eq!(content["found"], true);
    assert_eq!(content["work"]["parts"][0]["part_number"], 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unregistered_names_are_unknown(name in "[a-z_]{1,24}") {
        let registry = seeded_registry();
        let known = registry.names().contains(&name.as_str());
        match registry.lookup(&name) {
            ToolLookup::Found(tool) => {
                prop_assert!(known);
                prop_assert_eq!(tool.spec().name(), name.as_str());
            }
            ToolLookup::Unknown { name: unknown } => {
                prop_assert!(!known);
                prop_assert_eq!(unknown, name);
            }
        }
    }
}
