//! Inventory Routes
//!
//! A natural-language endpoint backed by the inventory assistant, plus
//! direct endpoints over the same [`InventoryStore`] the assistant's tools
//! use. Domain failures answer `{success: false, error}`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use colloquy_tools::inventory::{InventoryError, ItemFilter, ItemId, ItemRef, NewItem};
use std::sync::Arc;

use crate::error::ApiError;
use crate::routes::chat::buffered_turn;
use crate::state::AppState;
use crate::types::{
    AnalyticsQuery, AnalyticsResponse, ChatRequest, CreateItemRequest, CreateItemResponse,
    InitializeResponse, InventoryFailure, ItemListQuery, ItemResponse, ItemsResponse,
    TransactionRequest, TransactionResponse, UpdateItemRequest, UpdateItemResponse,
};

// ============================================================================
// REJECTION
// ============================================================================

/// Why an inventory request failed.
#[derive(Debug)]
pub enum InventoryRejection {
    /// A domain outcome reported to the caller as `{success: false, error}`.
    Failure(StatusCode, String),
    /// Anything else, reported as a regular API error.
    Api(ApiError),
}

impl InventoryRejection {
    fn bad_request(error: impl Into<String>) -> Self {
        InventoryRejection::Failure(StatusCode::BAD_REQUEST, error.into())
    }
}

impl From<InventoryError> for InventoryRejection {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::Unavailable { reason } => {
                tracing::error!(%reason, "inventory store unavailable");
                InventoryRejection::Api(ApiError::service_unavailable("Inventory is unavailable"))
            }
            InventoryError::ItemIdNotFound { .. } => {
                InventoryRejection::Failure(StatusCode::NOT_FOUND, err.to_string())
            }
            other => InventoryRejection::bad_request(other.to_string()),
        }
    }
}

impl From<ApiError> for InventoryRejection {
    fn from(err: ApiError) -> Self {
        InventoryRejection::Api(err)
    }
}

impl IntoResponse for InventoryRejection {
    fn into_response(self) -> Response {
        match self {
            InventoryRejection::Failure(status, error) => {
                (status, Json(InventoryFailure::new(error))).into_response()
            }
            InventoryRejection::Api(err) => err.into_response(),
        }
    }
}

type InventoryResult<T> = Result<T, InventoryRejection>;

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/inventory/query - Ask the inventory assistant
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/inventory/query",
    tag = "Inventory",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = crate::types::ChatResponse),
        (status = 400, description = "Missing message", body = ApiError),
        (status = 502, description = "Model provider failed", body = ApiError),
    ),
))]
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> InventoryResult<impl IntoResponse> {
    let response = buffered_turn(&state, &state.inventory_profile, request).await?;
    Ok(Json(response))
}

/// POST /api/inventory/initialize - Load the sample inventory
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/inventory/initialize",
    tag = "Inventory",
    responses(
        (status = 200, description = "Seeding report", body = InitializeResponse),
    ),
))]
pub async fn initialize(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(InitializeResponse::from(state.inventory.seed_sample_inventory()))
}

/// GET /api/inventory/items - List items
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/inventory/items",
    tag = "Inventory",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Matching items", body = ItemsResponse),
        (status = 400, description = "Invalid filter", body = InventoryFailure),
    ),
))]
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ItemListQuery>,
) -> InventoryResult<impl IntoResponse> {
    let items = state.inventory.list(&ItemFilter::from(query))?;
    Ok(Json(ItemsResponse {
        success: true,
        count: items.len(),
        items,
    }))
}

/// GET /api/inventory/items/{id} - Get one item
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(("id" = u64, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item details", body = ItemResponse),
        (status = 404, description = "No such item", body = InventoryFailure),
    ),
))]
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> InventoryResult<impl IntoResponse> {
    match state.inventory.find(&ItemRef::by_id(id))? {
        Some(item) => Ok(Json(ItemResponse {
            success: true,
            item,
        })),
        None => Err(InventoryError::ItemIdNotFound { id }.into()),
    }
}

/// POST /api/inventory/items - Create an item
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/inventory/items",
    tag = "Inventory",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = CreateItemResponse),
        (status = 400, description = "Name missing", body = InventoryFailure),
    ),
))]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateItemRequest>,
) -> InventoryResult<impl IntoResponse> {
    let item = state.inventory.create(NewItem::from(request))?;
    tracing::info!(item_id = item.id, name = %item.name, "inventory item created");
    Ok((
        StatusCode::CREATED,
        Json(CreateItemResponse {
            success: true,
            item_id: item.id,
            message: format!("Item '{}' created successfully", item.name),
        }),
    ))
}

/// PUT /api/inventory/items/{id} - Update an item
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/api/inventory/items/{id}",
    tag = "Inventory",
    params(("id" = u64, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = UpdateItemResponse),
        (status = 400, description = "Nothing to update", body = InventoryFailure),
        (status = 404, description = "No such item", body = InventoryFailure),
    ),
))]
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
    Json(request): Json<UpdateItemRequest>,
) -> InventoryResult<impl IntoResponse> {
    let item = state.inventory.update(&ItemRef::by_id(id), request.into())?;
    tracing::info!(item_id = item.id, "inventory item updated");
    Ok(Json(UpdateItemResponse {
        success: true,
        message: "Item updated successfully".to_string(),
    }))
}

/// POST /api/inventory/transactions - Record a sale or purchase
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/inventory/transactions",
    tag = "Inventory",
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction recorded", body = TransactionResponse),
        (status = 400, description = "Unknown item, bad type or insufficient stock", body = InventoryFailure),
    ),
))]
pub async fn record_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransactionRequest>,
) -> InventoryResult<impl IntoResponse> {
    let target = request.target();
    if target.id.is_none() && target.name.as_deref().map_or(true, |n| n.trim().is_empty()) {
        return Err(InventoryError::MissingIdentifier.into());
    }
    let kind = request.kind().ok_or_else(|| {
        InventoryRejection::bad_request("Transaction type must be 'sale' or 'purchase'")
    })?;

    let receipt = state
        .inventory
        .record_transaction(&target, kind, request.quantity)?;
    tracing::info!(
        item_id = receipt.transaction.item_id,
        transaction_type = kind.as_str(),
        quantity = receipt.transaction.quantity,
        new_stock = receipt.new_stock,
        "inventory transaction recorded"
    );
    Ok(Json(TransactionResponse::from(receipt)))
}

/// GET /api/inventory/analytics - Stock value and activity summary
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/inventory/analytics",
    tag = "Inventory",
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Analytics report", body = AnalyticsResponse),
    ),
))]
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsQuery>,
) -> InventoryResult<impl IntoResponse> {
    let analytics = state
        .inventory
        .analytics(query.category.as_deref(), query.period.unwrap_or_default())?;
    Ok(Json(AnalyticsResponse {
        success: true,
        analytics,
    }))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(query))
        .route("/initialize", post(initialize))
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", get(get_item).put(update_item))
        .route("/transactions", post(record_transaction))
        .route("/analytics", get(analytics))
        .with_state(state)
}
