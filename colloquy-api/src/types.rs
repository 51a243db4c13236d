//! Request and response bodies of the HTTP API.
//!
//! Field names follow the camelCase wire format the web client speaks.

use colloquy_core::{
    ColloquyResult, ConversationId, Message, OutputSegment, ToolCallRecord,
    ValidationError,
};
use colloquy_engine::{TurnRequest, TurnResponse};
use colloquy_tools::inventory::{
    AnalyticsPeriod, InventoryAnalytics, Item, ItemFilter, ItemId, ItemRef, ItemUpdate, NewItem,
    SeedReport, SortField, SortOrder, TransactionReceipt, TransactionType,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// CHAT
// ============================================================================

/// A user message for an assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Existing conversation to continue. A new id is generated when absent.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

impl ChatRequest {
    /// Validate the message and conversation id and build the engine request.
    pub fn into_turn(self) -> ColloquyResult<TurnRequest> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "message".to_string(),
            }
            .into());
        }
        let conversation_id = match self.conversation_id {
            Some(raw) if !raw.trim().is_empty() => ConversationId::new(raw)?,
            _ => ConversationId::generate(),
        };
        Ok(TurnRequest::new(self.message).in_conversation(conversation_id))
    }
}

/// Result of a non-streaming turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub conversation_id: ConversationId,
    pub speakable_chunks: Vec<OutputSegment>,
}

impl From<TurnResponse> for ChatResponse {
    fn from(turn: TurnResponse) -> Self {
        Self {
            response: turn.response,
            conversation_id: turn.conversation_id,
            speakable_chunks: turn.speakable_chunks,
        }
    }
}

/// One server-sent event of a streamed turn: either a chunk or an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speakable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub conversation_id: ConversationId,
}

// ============================================================================
// CONVERSATIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessagesResponse {
    pub conversation_id: ConversationId,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ConversationToolCallsResponse {
    pub conversation_id: ConversationId,
    pub tool_calls: Vec<ToolCallRecord>,
}

// ============================================================================
// INVENTORY
// ============================================================================

/// Failure body of the inventory endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct InventoryFailure {
    pub success: bool,
    pub error: String,
}

impl InventoryFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct InitializeResponse {
    pub success: bool,
    pub message: String,
    pub items_added: usize,
    pub items_failed: usize,
}

impl From<SeedReport> for InitializeResponse {
    fn from(report: SeedReport) -> Self {
        Self {
            success: report.items_failed == 0,
            message: format!(
                "Sample inventory initialized: {} items added, {} failed",
                report.items_added, report.items_failed
            ),
            items_added: report.items_added,
            items_failed: report.items_failed,
        }
    }
}

/// Query parameters of `GET /api/inventory/items`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(rename_all = "camelCase")]
pub struct ItemListQuery {
    /// Category to list; `all` or absent lists every category
    pub category: Option<String>,
    /// One of `name`, `price`, `stock`, `category`
    #[cfg_attr(feature = "openapi", param(value_type = Option<String>))]
    pub sort_by: Option<SortField>,
    /// `ASC` or `DESC`
    #[cfg_attr(feature = "openapi", param(value_type = Option<String>))]
    pub order: Option<SortOrder>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
}

impl From<ItemListQuery> for ItemFilter {
    fn from(query: ItemListQuery) -> Self {
        ItemFilter {
            category: query.category,
            sort_by: query.sort_by,
            order: query.order.unwrap_or_default(),
            min_price: query.min_price,
            max_price: query.max_price,
            min_stock: query.min_stock,
            max_stock: query.max_stock,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemsResponse {
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<Object>))]
    pub items: Vec<Item>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ItemResponse {
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub item: Item,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateItemRequest {
    #[serde(default)]
    pub name: String,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub description: Option<String>,
}

impl From<CreateItemRequest> for NewItem {
    fn from(request: CreateItemRequest) -> Self {
        let defaults = NewItem::named(request.name);
        NewItem {
            category: request.category.unwrap_or(defaults.category),
            price: request.price.unwrap_or(defaults.price),
            stock: request.stock.unwrap_or(defaults.stock),
            description: request.description.unwrap_or(defaults.description),
            name: defaults.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct CreateItemResponse {
    pub success: bool,
    pub item_id: ItemId,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub description: Option<String>,
}

impl From<UpdateItemRequest> for ItemUpdate {
    fn from(request: UpdateItemRequest) -> Self {
        ItemUpdate {
            name: request.name,
            category: request.category,
            price: request.price,
            stock: request.stock,
            description: request.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateItemResponse {
    pub success: bool,
    pub message: String,
}

fn default_quantity() -> i64 {
    1
}

/// Body of `POST /api/inventory/transactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TransactionRequest {
    pub item_id: Option<ItemId>,
    pub item_name: Option<String>,
    /// `sale` or `purchase`
    #[serde(default)]
    pub transaction_type: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

impl TransactionRequest {
    pub fn kind(&self) -> Option<TransactionType> {
        match self.transaction_type.trim().to_lowercase().as_str() {
            "sale" => Some(TransactionType::Sale),
            "purchase" => Some(TransactionType::Purchase),
            _ => None,
        }
    }

    pub fn target(&self) -> ItemRef {
        ItemRef {
            id: self.item_id,
            name: self.item_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub success: bool,
    pub message: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String))]
    pub transaction_type: TransactionType,
    pub previous_stock: i64,
    pub new_stock: i64,
}

impl From<TransactionReceipt> for TransactionResponse {
    fn from(receipt: TransactionReceipt) -> Self {
        let kind = receipt.transaction.transaction_type;
        Self {
            success: true,
            message: format!(
                "{} of {} item(s) recorded successfully",
                kind.title(),
                receipt.transaction.quantity
            ),
            transaction_type: kind,
            previous_stock: receipt.previous_stock,
            new_stock: receipt.new_stock,
        }
    }
}

/// Query parameters of `GET /api/inventory/analytics`.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct AnalyticsQuery {
    pub category: Option<String>,
    /// `all`, `day`, `week` or `month`
    #[cfg_attr(feature = "openapi", param(value_type = Option<String>))]
    pub period: Option<AnalyticsPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AnalyticsResponse {
    pub success: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub analytics: InventoryAnalytics,
}
