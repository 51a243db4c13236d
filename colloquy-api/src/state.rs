//! Shared application state
//!
//! One assembler serves both assistants; each profile carries its own tool
//! registry. The inventory store is shared by the inventory tools and the
//! direct inventory endpoints, so both see the same stock.

use colloquy_engine::{AssistantProfile, ResponseAssembler};
use colloquy_llm::UsageTracker;
use colloquy_storage::TranscriptStore;
use colloquy_tools::catalog::Catalog;
use colloquy_tools::inventory::InventoryStore;
use colloquy_tools::{catalog_registry, inventory_registry};
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiResult;

#[derive(Debug, Clone)]
pub struct AppState {
    pub assembler: ResponseAssembler,
    pub catalog_profile: AssistantProfile,
    pub inventory_profile: AssistantProfile,
    pub inventory: InventoryStore,
    /// Token counters of the model provider, when it keeps them.
    pub model_usage: Option<Arc<UsageTracker>>,
    pub start_time: Instant,
}

impl AppState {
    /// Build both assistant profiles around one assembler.
    pub fn new(
        assembler: ResponseAssembler,
        catalog: Arc<dyn Catalog>,
        inventory: InventoryStore,
    ) -> ApiResult<Self> {
        let featured = assembler.config().featured_parts.clone();
        let catalog_tools = catalog_registry(catalog, featured)?;
        let inventory_tools = inventory_registry(inventory.clone())?;

        Ok(Self {
            assembler,
            catalog_profile: AssistantProfile::catalog(Arc::new(catalog_tools)),
            inventory_profile: AssistantProfile::inventory(Arc::new(inventory_tools)),
            inventory,
            model_usage: None,
            start_time: Instant::now(),
        })
    }

    /// Report the provider's token usage from the readiness endpoint.
    pub fn with_model_usage(mut self, usage: Arc<UsageTracker>) -> Self {
        self.model_usage = Some(usage);
        self
    }

    pub fn store(&self) -> &Arc<dyn TranscriptStore> {
        self.assembler.store()
    }
}
