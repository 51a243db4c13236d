//! Shop inventory: items, stock transactions and the tools over them.

mod store;
mod tools;

pub use store::{
    AnalyticsPeriod, InventoryAnalytics, InventoryError, InventoryStore, Item, ItemFilter, ItemId,
    ItemRef, ItemUpdate, NewItem, SeedReport, SortField, SortOrder, Transaction,
    TransactionId, TransactionReceipt, TransactionType, ValuedItem, LOW_STOCK_THRESHOLD,
};
pub use tools::{
    AnalyticsInput, AnalyticsReport, CreateItemInput, CreateItemTool, CreatedItem,
    GetItemDetailsTool, InventoryAnalyticsTool, ItemDetails, ItemTargetInput, ItemsListing,
    ListFilters, ListItemsTool, RecordTransactionInput, RecordTransactionTool,
    TransactionRecorded, UpdateItemInput, UpdateItemTool, UpdatedItem,
};
