//! Colloquy Tools - Tool Registry and Domain Tools
//!
//! Tools are typed ([`Tool`]) and erased behind [`DynTool`] for the
//! registry. Each tool owns its input schema, its handler and the formatter
//! that turns its structured result into output segments.

pub mod catalog;
pub mod inventory;
mod registry;
mod reply;
mod schema;
mod tool;

pub use registry::{ToolLookup, ToolRegistry};
pub use reply::ToolReply;
pub use schema::{FieldKind, FieldSpec, InputSchema};
pub use tool::{DynTool, Tool, ToolId, ToolOutcome, ToolSpec};

use catalog::{Catalog, GetWorkContentTool, ListWorksTool};
use colloquy_core::{FeaturedParts, ToolError};
use inventory::{
    CreateItemTool, GetItemDetailsTool, InventoryAnalyticsTool, InventoryStore, ListItemsTool,
    RecordTransactionTool, UpdateItemTool,
};
use std::sync::Arc;

/// Tools for the literary catalog assistant.
pub fn catalog_registry(
    catalog: Arc<dyn Catalog>,
    featured: FeaturedParts,
) -> Result<ToolRegistry, ToolError> {
    ToolRegistry::new()
        .with(ListWorksTool::new(Arc::clone(&catalog)))?
        .with(GetWorkContentTool::new(catalog, featured))
}

/// Tools for the inventory assistant.
pub fn inventory_registry(store: InventoryStore) -> Result<ToolRegistry, ToolError> {
    ToolRegistry::new()
        .with(ListItemsTool::new(store.clone()))?
        .with(GetItemDetailsTool::new(store.clone()))?
        .with(CreateItemTool::new(store.clone()))?
        .with(UpdateItemTool::new(store.clone()))?
        .with(RecordTransactionTool::new(store.clone()))?
        .with(InventoryAnalyticsTool::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::InMemoryCatalog;

    #[test]
    fn test_profile_registries() {
        let catalog = catalog_registry(Arc::new(InMemoryCatalog::new()), FeaturedParts::default())
            .expect("catalog registry");
        assert_eq!(catalog.names(), vec!["list_works", "get_work_content"]);

        let inventory = inventory_registry(InventoryStore::new()).expect("inventory registry");
        assert_eq!(inventory.len(), 6);
        assert!(matches!(inventory.lookup("list_works"), ToolLookup::Unknown { .. }));
        for spec in inventory.specs() {
            assert_eq!(spec.json_schema()["type"], "object");
        }
    }
}
