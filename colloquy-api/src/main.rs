//! Colloquy API Server Entry Point
//!
//! Loads configuration, opens the transcript store, builds both assistants
//! and serves until ctrl-c.

use std::sync::Arc;

use colloquy_api::telemetry::init_tracing;
use colloquy_api::{create_api_router, ApiConfig, ApiError, ApiResult, AppState};
use colloquy_core::EngineConfig;
use colloquy_engine::ResponseAssembler;
use colloquy_llm::{AnthropicConfig, AnthropicProvider};
use colloquy_storage::{LmdbTranscriptStore, StorageConfig, TranscriptStore};
use colloquy_tools::catalog::{Catalog, InMemoryCatalog};
use colloquy_tools::inventory::InventoryStore;

#[tokio::main]
async fn main() -> ApiResult<()> {
    let api_config = ApiConfig::from_env()?;
    init_tracing(api_config.log_format)?;

    let engine_config = EngineConfig::from_env()?;
    let provider = AnthropicProvider::new(&AnthropicConfig::from_env()?);
    let model_usage = provider.usage();

    let storage_config = StorageConfig::from_env()?;
    let store = LmdbTranscriptStore::open(&storage_config).map_err(|e| {
        ApiError::internal_error(format!("Failed to open transcript store: {}", e))
    })?;
    store.initialize().await?;
    tracing::info!(path = %storage_config.path.display(), "transcript store ready");

    let catalog: Arc<dyn Catalog> = match &api_config.catalog_path {
        Some(path) => {
            let catalog = InMemoryCatalog::from_json_file(path)?;
            tracing::info!(path = %path.display(), works = catalog.len(), "catalog loaded");
            Arc::new(catalog)
        }
        None => {
            tracing::warn!("COLLOQUY_CATALOG_PATH not set; catalog is empty");
            Arc::new(InMemoryCatalog::new())
        }
    };

    let inventory = InventoryStore::new();
    if api_config.seed_inventory {
        inventory.seed_sample_inventory();
    }

    let assembler = ResponseAssembler::new(Arc::new(provider), Arc::new(store), engine_config);
    let state = AppState::new(assembler, catalog, inventory)?.with_model_usage(model_usage);
    let app = create_api_router(state, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting colloquy API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
