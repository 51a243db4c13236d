use super::store::{
    AnalyticsPeriod, InventoryAnalytics, InventoryError, InventoryStore, Item, ItemFilter, ItemId,
    ItemRef, ItemUpdate, NewItem, TransactionType,
};
use crate::reply::ToolReply;
use crate::schema::{FieldSpec, InputSchema};
use crate::tool::{Tool, ToolId, ToolSpec};
use async_trait::async_trait;
use colloquy_core::{OutputSegment, ToolError};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Turn a store result into a reply. Domain errors become failed replies;
/// an unavailable store is a tool fault.
fn reply<T, B>(
    tool: ToolId,
    result: Result<T, InventoryError>,
    body: impl FnOnce(T) -> B,
) -> Result<ToolReply<B>, ToolError> {
    match result {
        Ok(value) => Ok(ToolReply::ok(body(value))),
        Err(InventoryError::Unavailable { reason }) => Err(ToolError::Failed {
            tool: tool.as_str().to_string(),
            reason,
        }),
        Err(e) => Ok(ToolReply::failure(e.to_string())),
    }
}

fn failure_segments(error: &str) -> Vec<OutputSegment> {
    vec![OutputSegment::speakable(format!("\n\nError: {}\n\n", error))]
}

fn message_segment(message: &str) -> OutputSegment {
    OutputSegment::speakable(format!("\n\n{}\n\n", message))
}

fn target_fields(schema: InputSchema, verb: &'static str) -> InputSchema {
    let (id_doc, name_doc) = match verb {
        "update" => (
            "ID of the item to update",
            "Name of the item to update (alternative to item_id)",
        ),
        "retrieve" => ("ID of the item to retrieve", "Name of the item to retrieve"),
        _ => ("ID of the item", "Name of the item (alternative to item_id)"),
    };
    schema
        .field("item_id", FieldSpec::integer(id_doc))
        .field("item_name", FieldSpec::string(name_doc))
}

// ============================================================================
// LIST ITEMS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListFilters {
    pub category: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemsListing {
    pub items: Vec<Item>,
    pub count: usize,
    pub filters: ListFilters,
}

pub struct ListItemsTool {
    store: InventoryStore,
}

impl ListItemsTool {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListItemsTool {
    type Input = ItemFilter;
    type Output = ToolReply<ItemsListing>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::ListItems,
            description: "Lists items in the inventory with support for filtering and sorting.",
            input_schema: InputSchema::new()
                .field(
                    "category",
                    FieldSpec::string("Category of items to list (e.g., 'books', 'merchandise', 'all')"),
                )
                .field(
                    "sort_by",
                    FieldSpec::string("Field to sort by (e.g., 'name', 'price', 'stock')")
                        .one_of(&["name", "price", "stock", "category"]),
                )
                .field(
                    "order",
                    FieldSpec::string("Sort order ('ASC' or 'DESC')")
                        .one_of(&["ASC", "DESC"])
                        .default_value(json!("ASC")),
                )
                .field("min_price", FieldSpec::number("Minimum price filter"))
                .field("max_price", FieldSpec::number("Maximum price filter"))
                .field("min_stock", FieldSpec::integer("Minimum stock filter"))
                .field("max_stock", FieldSpec::integer("Maximum stock filter")),
        }
    }

    async fn invoke(&self, filter: ItemFilter) -> Result<Self::Output, ToolError> {
        let filters = ListFilters {
            category: filter.category_filter().unwrap_or("all").to_string(),
            min_price: filter.min_price,
            max_price: filter.max_price,
            min_stock: filter.min_stock,
            max_stock: filter.max_stock,
        };
        reply(ToolId::ListItems, self.store.list(&filter), |items| ItemsListing {
            count: items.len(),
            items,
            filters,
        })
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(format_listing, failure_segments)
    }
}

fn format_listing(listing: &ItemsListing) -> Vec<OutputSegment> {
    if listing.items.is_empty() {
        return vec![OutputSegment::speakable(
            "\n\nNo items found matching your criteria.\n\n",
        )];
    }

    let mut intro = format!("\n\nFound {} items", listing.count);
    if listing.filters.category != "all" {
        intro.push_str(&format!(" in the '{}' category", listing.filters.category));
    }
    intro.push_str(":\n\n");

    let mut segments = vec![OutputSegment::speakable(intro)];
    segments.extend(listing.items.iter().map(|item| {
        OutputSegment::speakable(format!(
            "• {} - ${:.2} - Stock: {} - Category: {}\n",
            item.name, item.price, item.stock, item.category
        ))
    }));
    segments
}

// ============================================================================
// GET ITEM DETAILS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemTargetInput {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub item_name: Option<String>,
}

impl ItemTargetInput {
    fn to_ref(&self) -> ItemRef {
        ItemRef {
            id: self.item_id,
            name: self.item_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDetails {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct GetItemDetailsTool {
    store: InventoryStore,
}

impl GetItemDetailsTool {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetItemDetailsTool {
    type Input = ItemTargetInput;
    type Output = ToolReply<ItemDetails>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::GetItemDetails,
            description: "Retrieves detailed information about a specific inventory item.",
            input_schema: target_fields(InputSchema::new(), "retrieve"),
        }
    }

    async fn invoke(&self, input: ItemTargetInput) -> Result<Self::Output, ToolError> {
        reply(
            ToolId::GetItemDetails,
            self.store.find(&input.to_ref()),
            |found| match found {
                Some(item) => ItemDetails {
                    found: true,
                    item: Some(item),
                    message: None,
                },
                None => ItemDetails {
                    found: false,
                    item: None,
                    message: Some("Item not found".to_string()),
                },
            },
        )
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(
            |details| match &details.item {
                Some(item) => vec![OutputSegment::speakable(item_details_text(item))],
                None => vec![OutputSegment::speakable("\n\nItem not found.\n\n")],
            },
            failure_segments,
        )
    }
}

fn item_details_text(item: &Item) -> String {
    let mut text = format!(
        "\n\nItem Details:\n\nName: {}\nCategory: {}\nPrice: ${:.2}\nStock: {}\n",
        item.name, item.category, item.price, item.stock
    );
    if !item.description.is_empty() {
        text.push_str(&format!("Description: {}\n", item.description));
    }
    text
}

// ============================================================================
// CREATE ITEM
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateItemInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CreateItemInput> for NewItem {
    fn from(input: CreateItemInput) -> Self {
        let defaults = NewItem::named(input.name);
        NewItem {
            category: input.category.unwrap_or(defaults.category),
            price: input.price.unwrap_or(defaults.price),
            stock: input.stock.unwrap_or(defaults.stock),
            description: input.description.unwrap_or(defaults.description),
            name: defaults.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedItem {
    pub item_id: ItemId,
    pub message: String,
}

pub struct CreateItemTool {
    store: InventoryStore,
}

impl CreateItemTool {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateItemTool {
    type Input = CreateItemInput;
    type Output = ToolReply<CreatedItem>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::CreateItem,
            description: "Creates a new item in the inventory.",
            input_schema: InputSchema::new()
                .field("name", FieldSpec::string("Name of the item").required())
                .field(
                    "category",
                    FieldSpec::string("Category of the item").default_value(json!("uncategorized")),
                )
                .field("price", FieldSpec::number("Price of the item").default_value(json!(0)))
                .field("stock", FieldSpec::integer("Stock quantity").default_value(json!(0)))
                .field(
                    "description",
                    FieldSpec::string("Optional description of the item").default_value(json!("")),
                ),
        }
    }

    async fn invoke(&self, input: CreateItemInput) -> Result<Self::Output, ToolError> {
        reply(ToolId::CreateItem, self.store.create(input.into()), |item| {
            CreatedItem {
                item_id: item.id,
                message: format!("Item '{}' created successfully", item.name),
            }
        })
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(|created| vec![message_segment(&created.message)], failure_segments)
    }
}

// ============================================================================
// UPDATE ITEM
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateItemInput {
    #[serde(flatten)]
    pub target: ItemTargetInput,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

impl UpdateItemInput {
    fn changes(self) -> ItemUpdate {
        ItemUpdate {
            name: self.name,
            category: self.category,
            price: self.price,
            stock: self.stock,
            description: self.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdatedItem {
    pub item: Item,
    pub message: String,
}

pub struct UpdateItemTool {
    store: InventoryStore,
}

impl UpdateItemTool {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateItemTool {
    type Input = UpdateItemInput;
    type Output = ToolReply<UpdatedItem>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::UpdateItem,
            description: "Updates an existing item in the inventory.",
            input_schema: target_fields(InputSchema::new(), "update")
                .field("name", FieldSpec::string("New name for the item"))
                .field("category", FieldSpec::string("New category for the item"))
                .field("price", FieldSpec::number("New price for the item"))
                .field("stock", FieldSpec::integer("New stock quantity"))
                .field("description", FieldSpec::string("New description for the item")),
        }
    }

    async fn invoke(&self, input: UpdateItemInput) -> Result<Self::Output, ToolError> {
        let target = input.target.to_ref();
        reply(
            ToolId::UpdateItem,
            self.store.update(&target, input.changes()),
            |item| UpdatedItem {
                item,
                message: "Item updated successfully".to_string(),
            },
        )
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(|updated| vec![message_segment(&updated.message)], failure_segments)
    }
}

// ============================================================================
// RECORD TRANSACTION
// ============================================================================

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordTransactionInput {
    #[serde(flatten)]
    pub target: ItemTargetInput,
    #[serde(default)]
    pub transaction_type: TransactionType,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecorded {
    pub transaction_type: TransactionType,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub message: String,
}

pub struct RecordTransactionTool {
    store: InventoryStore,
}

impl RecordTransactionTool {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RecordTransactionTool {
    type Input = RecordTransactionInput;
    type Output = ToolReply<TransactionRecorded>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::RecordTransaction,
            description: "Records a sale or purchase transaction.",
            input_schema: target_fields(InputSchema::new(), "transaction")
                .field(
                    "transaction_type",
                    FieldSpec::string("Type of transaction ('sale' or 'purchase')")
                        .one_of(&["sale", "purchase"])
                        .default_value(json!("sale")),
                )
                .field(
                    "quantity",
                    FieldSpec::integer("Quantity of items in the transaction")
                        .default_value(json!(1)),
                ),
        }
    }

    async fn invoke(&self, input: RecordTransactionInput) -> Result<Self::Output, ToolError> {
        let result = self.store.record_transaction(
            &input.target.to_ref(),
            input.transaction_type,
            input.quantity,
        );
        reply(ToolId::RecordTransaction, result, |receipt| {
            let kind = receipt.transaction.transaction_type;
            TransactionRecorded {
                transaction_type: kind,
                previous_stock: receipt.previous_stock,
                new_stock: receipt.new_stock,
                message: format!(
                    "{} of {} item(s) recorded successfully",
                    kind.title(),
                    receipt.transaction.quantity
                ),
            }
        })
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(
            |recorded| {
                vec![
                    message_segment(&recorded.message),
                    OutputSegment::speakable(format!(
                        "Transaction Type: {}\nPrevious Stock: {}\nNew Stock: {}\n",
                        recorded.transaction_type.title(),
                        recorded.previous_stock,
                        recorded.new_stock
                    )),
                ]
            },
            failure_segments,
        )
    }
}

// ============================================================================
// ANALYTICS
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsInput {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub period: Option<AnalyticsPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub analytics: InventoryAnalytics,
}

pub struct InventoryAnalyticsTool {
    store: InventoryStore,
}

impl InventoryAnalyticsTool {
    pub fn new(store: InventoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for InventoryAnalyticsTool {
    type Input = AnalyticsInput;
    type Output = ToolReply<AnalyticsReport>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            id: ToolId::InventoryAnalytics,
            description: "Summarizes the inventory: total value, top items by value, low stock items and recent transactions.",
            input_schema: InputSchema::new()
                .field("category", FieldSpec::string("Restrict item figures to one category"))
                .field(
                    "period",
                    FieldSpec::string("Time period for recent transactions")
                        .one_of(&["all", "day", "week", "month"])
                        .default_value(json!("all")),
                ),
        }
    }

    async fn invoke(&self, input: AnalyticsInput) -> Result<Self::Output, ToolError> {
        let category = input
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));
        reply(
            ToolId::InventoryAnalytics,
            self.store
                .analytics(category, input.period.unwrap_or_default()),
            |analytics| AnalyticsReport { analytics },
        )
    }

    fn format(output: &Self::Output) -> Vec<OutputSegment> {
        output.format_with(|report| format_analytics(&report.analytics), failure_segments)
    }
}

fn format_analytics(analytics: &InventoryAnalytics) -> Vec<OutputSegment> {
    let mut segments = vec![OutputSegment::speakable(format!(
        "\n\nInventory Analytics:\n\nTotal Inventory Value: ${:.2}\nTotal Items: {}\n\n",
        analytics.total_value, analytics.item_count
    ))];

    if !analytics.top_items_by_value.is_empty() {
        segments.push(OutputSegment::speakable("Top Items by Value:\n"));
        segments.extend(analytics.top_items_by_value.iter().map(|item| {
            OutputSegment::speakable(format!(
                "• {} - ${:.2} (Stock: {})\n",
                item.name, item.value, item.stock
            ))
        }));
        segments.push(OutputSegment::display("\n"));
    }

    if !analytics.low_stock_items.is_empty() {
        segments.push(OutputSegment::speakable("Items with Low Stock:\n"));
        segments.extend(analytics.low_stock_items.iter().map(|item| {
            OutputSegment::speakable(format!("• {} - Stock: {}\n", item.name, item.stock))
        }));
        segments.push(OutputSegment::display("\n"));
    }
    segments
}
