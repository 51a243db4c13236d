//! In-memory inventory store
//!
//! Items and transactions behind a single lock so a stock check and the
//! matching stock update happen atomically.

use chrono::{Duration, Months, Utc};
use colloquy_core::Timestamp;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

pub type ItemId = u64;
pub type TransactionId = u64;

/// Stock level below which an item is reported as low.
pub const LOW_STOCK_THRESHOLD: i64 = 10;
const TOP_ITEMS_LIMIT: usize = 5;
const RECENT_TRANSACTIONS_LIMIT: usize = 10;

// ============================================================================
// ERRORS
// ============================================================================

/// Inventory failures. Everything except `Unavailable` is a domain outcome
/// reported back to the user.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InventoryError {
    #[error("Either item_id or item_name must be provided")]
    MissingIdentifier,

    #[error("Item not found: {name}")]
    ItemNotFound { name: String },

    #[error("Item with ID {id} not found")]
    ItemIdNotFound { id: ItemId },

    #[error("Item name is required")]
    NameRequired,

    #[error("No update fields provided")]
    NoUpdateFields,

    #[error("Insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("Quantity must be positive, got {quantity}")]
    InvalidQuantity { quantity: i64 },

    #[error("Inventory store unavailable: {reason}")]
    Unavailable { reason: String },
}

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub description: String,
    pub created_at: Timestamp,
}

impl Item {
    pub fn value(&self) -> f64 {
        self.price * self.stock as f64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    #[default]
    Sale,
    Purchase,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Sale => "sale",
            TransactionType::Purchase => "purchase",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            TransactionType::Sale => "Sale",
            TransactionType::Purchase => "Purchase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub item_id: ItemId,
    pub item_name: String,
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub transaction_date: Timestamp,
}

/// Identifies an item by id, or by a case-insensitive name fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemRef {
    pub id: Option<ItemId>,
    pub name: Option<String>,
}

impl ItemRef {
    pub fn by_id(id: ItemId) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Name,
    Price,
    Stock,
    Category,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub category: Option<String>,
    pub sort_by: Option<SortField>,
    #[serde(default)]
    pub order: SortOrder,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_stock: Option<i64>,
    pub max_stock: Option<i64>,
}

impl ItemFilter {
    /// Category to filter on; `"all"` and blanks mean no filter.
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    }

    fn matches(&self, item: &Item) -> bool {
        self.category_filter()
            .map_or(true, |c| item.category.eq_ignore_ascii_case(c))
            && self.min_price.map_or(true, |min| item.price >= min)
            && self.max_price.map_or(true, |max| item.price <= max)
            && self.min_stock.map_or(true, |min| item.stock >= min)
            && self.max_stock.map_or(true, |max| item.stock <= max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub description: String,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: "uncategorized".to_string(),
            price: 0.0,
            stock: 0,
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub description: Option<String>,
}

impl ItemUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    pub previous_stock: i64,
    pub new_stock: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsPeriod {
    #[default]
    All,
    Day,
    Week,
    Month,
}

impl AnalyticsPeriod {
    fn includes(&self, date: Timestamp, now: Timestamp) -> bool {
        let today = now.date_naive();
        match self {
            AnalyticsPeriod::All => true,
            AnalyticsPeriod::Day => date.date_naive() == today,
            AnalyticsPeriod::Week => date.date_naive() >= today - Duration::days(7),
            AnalyticsPeriod::Month => today
                .checked_sub_months(Months::new(1))
                .map_or(true, |start| date.date_naive() >= start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuedItem {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub price: f64,
    pub stock: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAnalytics {
    pub total_value: f64,
    pub item_count: usize,
    pub top_items_by_value: Vec<ValuedItem>,
    pub low_stock_items: Vec<Item>,
    pub recent_transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub items_added: usize,
    pub items_failed: usize,
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Debug, Default)]
struct InventoryState {
    items: BTreeMap<ItemId, Item>,
    transactions: Vec<Transaction>,
    next_item_id: ItemId,
    next_transaction_id: TransactionId,
}

impl InventoryState {
    fn resolve(&self, target: &ItemRef) -> Result<ItemId, InventoryError> {
        if let Some(id) = target.id.filter(|id| *id != 0) {
            return if self.items.contains_key(&id) {
                Ok(id)
            } else {
                Err(InventoryError::ItemIdNotFound { id })
            };
        }
        let name = target
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or(InventoryError::MissingIdentifier)?;
        self.find_by_name(name)
            .map(|item| item.id)
            .ok_or_else(|| InventoryError::ItemNotFound {
                name: name.to_string(),
            })
    }

    fn find_by_name(&self, fragment: &str) -> Option<&Item> {
        let needle = fragment.to_lowercase();
        self.items
            .values()
            .find(|item| item.name.to_lowercase().contains(&needle))
    }
}

/// Shared handle to the inventory. Clones see the same data.
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    state: Arc<RwLock<InventoryState>>,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&InventoryState) -> T) -> Result<T, InventoryError> {
        let state = self.state.read().map_err(|_| InventoryError::Unavailable {
            reason: "lock poisoned".to_string(),
        })?;
        Ok(f(&state))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut InventoryState) -> Result<T, InventoryError>,
    ) -> Result<T, InventoryError> {
        let mut state = self.state.write().map_err(|_| InventoryError::Unavailable {
            reason: "lock poisoned".to_string(),
        })?;
        f(&mut state)
    }

    pub fn list(&self, filter: &ItemFilter) -> Result<Vec<Item>, InventoryError> {
        let mut items = self.read(|state| {
            state
                .items
                .values()
                .filter(|item| filter.matches(item))
                .cloned()
                .collect::<Vec<_>>()
        })?;

        if let Some(field) = filter.sort_by {
            items.sort_by(|a, b| {
                let ordering = match field {
                    SortField::Name => a.name.cmp(&b.name),
                    SortField::Category => a.category.cmp(&b.category),
                    SortField::Stock => a.stock.cmp(&b.stock),
                    SortField::Price => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
                };
                match filter.order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }
        Ok(items)
    }

    /// Look up one item. Unknown ids and names are `Ok(None)`.
    pub fn find(&self, target: &ItemRef) -> Result<Option<Item>, InventoryError> {
        if target.id.filter(|id| *id != 0).is_none()
            && target.name.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            return Err(InventoryError::MissingIdentifier);
        }
        self.read(|state| match state.resolve(target) {
            Ok(id) => state.items.get(&id).cloned(),
            Err(_) => None,
        })
    }

    pub fn create(&self, new_item: NewItem) -> Result<Item, InventoryError> {
        if new_item.name.trim().is_empty() {
            return Err(InventoryError::NameRequired);
        }
        self.write(|state| {
            state.next_item_id += 1;
            let item = Item {
                id: state.next_item_id,
                name: new_item.name,
                category: new_item.category,
                price: new_item.price,
                stock: new_item.stock,
                description: new_item.description,
                created_at: Utc::now(),
            };
            state.items.insert(item.id, item.clone());
            Ok(item)
        })
    }

    pub fn update(&self, target: &ItemRef, update: ItemUpdate) -> Result<Item, InventoryError> {
        self.write(|state| {
            let id = state.resolve(target)?;
            if update.is_empty() {
                return Err(InventoryError::NoUpdateFields);
            }
            let item = state
                .items
                .get_mut(&id)
                .ok_or(InventoryError::ItemIdNotFound { id })?;
            if let Some(name) = update.name {
                item.name = name;
            }
            if let Some(category) = update.category {
                item.category = category;
            }
            if let Some(price) = update.price {
                item.price = price;
            }
            if let Some(stock) = update.stock {
                item.stock = stock;
            }
            if let Some(description) = update.description {
                item.description = description;
            }
            Ok(item.clone())
        })
    }

    /// Record a sale or purchase and adjust stock in one step.
    pub fn record_transaction(
        &self,
        target: &ItemRef,
        transaction_type: TransactionType,
        quantity: i64,
    ) -> Result<TransactionReceipt, InventoryError> {
        if quantity <= 0 {
            return Err(InventoryError::InvalidQuantity { quantity });
        }
        self.write(|state| {
            let id = state.resolve(target)?;
            let item = state
                .items
                .get_mut(&id)
                .ok_or(InventoryError::ItemIdNotFound { id })?;

            let previous_stock = item.stock;
            let new_stock = match transaction_type {
                TransactionType::Sale if previous_stock < quantity => {
                    return Err(InventoryError::InsufficientStock {
                        available: previous_stock,
                        requested: quantity,
                    });
                }
                TransactionType::Sale => previous_stock - quantity,
                TransactionType::Purchase => previous_stock + quantity,
            };
            item.stock = new_stock;
            let item_name = item.name.clone();

            state.next_transaction_id += 1;
            let transaction = Transaction {
                id: state.next_transaction_id,
                item_id: id,
                item_name,
                transaction_type,
                quantity,
                transaction_date: Utc::now(),
            };
            state.transactions.push(transaction.clone());

            Ok(TransactionReceipt {
                transaction,
                previous_stock,
                new_stock,
            })
        })
    }

    pub fn analytics(
        &self,
        category: Option<&str>,
        period: AnalyticsPeriod,
    ) -> Result<InventoryAnalytics, InventoryError> {
        self.analytics_at(category, period, Utc::now())
    }

    fn analytics_at(
        &self,
        category: Option<&str>,
        period: AnalyticsPeriod,
        now: Timestamp,
    ) -> Result<InventoryAnalytics, InventoryError> {
        let filter = ItemFilter {
            category: category.map(str::to_string),
            ..ItemFilter::default()
        };

        self.read(|state| {
            let items: Vec<&Item> = state.items.values().filter(|i| filter.matches(i)).collect();

            let mut valued: Vec<ValuedItem> = items
                .iter()
                .map(|item| ValuedItem {
                    id: item.id,
                    name: item.name.clone(),
                    category: item.category.clone(),
                    price: item.price,
                    stock: item.stock,
                    value: item.value(),
                })
                .collect();
            valued.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
            valued.truncate(TOP_ITEMS_LIMIT);

            let mut low_stock: Vec<Item> = items
                .iter()
                .filter(|item| item.stock < LOW_STOCK_THRESHOLD)
                .map(|item| (*item).clone())
                .collect();
            low_stock.sort_by_key(|item| item.stock);

            let recent: Vec<Transaction> = state
                .transactions
                .iter()
                .rev()
                .filter(|t| period.includes(t.transaction_date, now))
                .take(RECENT_TRANSACTIONS_LIMIT)
                .cloned()
                .collect();

            InventoryAnalytics {
                total_value: items.iter().map(|item| item.value()).sum(),
                item_count: items.len(),
                top_items_by_value: valued,
                low_stock_items: low_stock,
                recent_transactions: recent,
            }
        })
    }

    /// Populate the store with the demo catalogue of shop items.
    pub fn seed_sample_inventory(&self) -> SeedReport {
        let samples = [
            ("Collected Poems of Tagore", "books", 24.99, 15, "Complete collection of Rabindranath Tagore's poems"),
            ("Gitanjali", "books", 12.99, 30, "Song offerings by Rabindranath Tagore"),
            ("The Home and the World", "books", 14.99, 20, "Novel by Rabindranath Tagore"),
            ("Tagore Portrait T-Shirt", "clothing", 19.99, 50, "T-shirt with Tagore's portrait"),
            ("Tagore Quote Mug", "merchandise", 9.99, 35, "Coffee mug with famous Tagore quotes"),
            ("Handcrafted Bengali Pen", "stationery", 7.99, 40, "Traditional Bengali-style handcrafted pen"),
            ("Tagore's Music CD", "music", 15.99, 25, "CD featuring Rabindra Sangeet"),
            ("Santiniketan Art Print", "art", 29.99, 10, "Art print inspired by Tagore's Santiniketan style"),
        ];

        let mut report = SeedReport {
            items_added: 0,
            items_failed: 0,
        };
        for (name, category, price, stock, description) in samples {
            let result = self.create(NewItem {
                name: name.to_string(),
                category: category.to_string(),
                price,
                stock,
                description: description.to_string(),
            });
            match result {
                Ok(_) => report.items_added += 1,
                Err(e) => {
                    tracing::error!(item = name, error = %e, "failed to add sample item");
                    report.items_failed += 1;
                }
            }
        }

        let transactions = [
            ("Gitanjali", TransactionType::Sale, 5),
            ("Tagore Quote Mug", TransactionType::Sale, 3),
            ("Collected Poems of Tagore", TransactionType::Purchase, 10),
        ];
        for (name, kind, quantity) in transactions {
            if let Err(e) = self.record_transaction(&ItemRef::by_name(name), kind, quantity) {
                tracing::warn!(item = name, error = %e, "failed to record sample transaction");
            }
        }

        tracing::info!(
            items_added = report.items_added,
            items_failed = report.items_failed,
            "sample inventory initialized"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn seeded() -> InventoryStore {
        let store = InventoryStore::new();
        store.seed_sample_inventory();
        store
    }

    #[test]
    fn test_seed_applies_sample_transactions() {
        let store = InventoryStore::new();
        let report = store.seed_sample_inventory();
        assert_eq!(report, SeedReport { items_added: 8, items_failed: 0 });

        let gitanjali = store
            .find(&ItemRef::by_name("gitanjali"))
            .expect("lookup")
            .expect("item exists");
        assert_eq!(gitanjali.stock, 25);
        let poems = store
            .find(&ItemRef::by_name("Collected Poems"))
            .expect("lookup")
            .expect("item exists");
        assert_eq!(poems.stock, 25);
    }

    #[test]
    fn test_list_filters_and_sorts() {
        let store = seeded();
        let books = store
            .list(&ItemFilter {
                category: Some("books".to_string()),
                sort_by: Some(SortField::Price),
                order: SortOrder::Desc,
                ..ItemFilter::default()
            })
            .expect("list");
        let names: Vec<_> = books.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Collected Poems of Tagore", "The Home and the World", "Gitanjali"]
        );

        let cheap = store
            .list(&ItemFilter {
                max_price: Some(10.0),
                ..ItemFilter::default()
            })
            .expect("list");
        assert_eq!(cheap.len(), 2);

        let all = store
            .list(&ItemFilter {
                category: Some("all".to_string()),
                ..ItemFilter::default()
            })
            .expect("list");
        assert_eq!(all.len(), 8);
    }

    #[test]
    fn test_sale_beyond_stock_is_rejected_without_change() {
        let store = seeded();
        let err = store
            .record_transaction(&ItemRef::by_name("Santiniketan"), TransactionType::Sale, 11)
            .expect_err("sale must fail");
        assert_eq!(err.to_string(), "Insufficient stock: 10 available, 11 requested");

        let print = store
            .find(&ItemRef::by_name("Santiniketan"))
            .expect("lookup")
            .expect("item");
        assert_eq!(print.stock, 10);
    }

    #[test]
    fn test_update_requires_fields_and_target() {
        let store = seeded();
        assert_eq!(
            store.update(&ItemRef::default(), ItemUpdate::default()),
            Err(InventoryError::MissingIdentifier)
        );
        assert_eq!(
            store.update(&ItemRef::by_name("Gitanjali"), ItemUpdate::default()),
            Err(InventoryError::NoUpdateFields)
        );
        assert_eq!(
            store.update(
                &ItemRef::by_name("Lamp"),
                ItemUpdate {
                    price: Some(1.0),
                    ..ItemUpdate::default()
                }
            ),
            Err(InventoryError::ItemNotFound {
                name: "Lamp".to_string()
            })
        );

        let updated = store
            .update(
                &ItemRef::by_id(2),
                ItemUpdate {
                    price: Some(13.5),
                    ..ItemUpdate::default()
                },
            )
            .expect("update");
        assert_eq!(updated.name, "Gitanjali");
        assert_eq!(updated.price, 13.5);
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let store = InventoryStore::new();
        assert_eq!(
            store.create(NewItem::named("   ")),
            Err(InventoryError::NameRequired)
        );
        let item = store.create(NewItem::named("Lamp")).expect("create");
        assert_eq!(item.category, "uncategorized");
        assert_eq!(item.stock, 0);
    }

    #[test]
    fn test_analytics() {
        let store = seeded();
        let analytics = store.analytics(None, AnalyticsPeriod::All).expect("analytics");
        assert_eq!(analytics.item_count, 8);
        assert_eq!(analytics.top_items_by_value.len(), 5);
        assert_eq!(analytics.top_items_by_value[0].name, "Tagore Portrait T-Shirt");
        // The art print sits exactly at the threshold, which is not low.
        assert!(analytics.low_stock_items.is_empty());
        assert_eq!(analytics.recent_transactions.len(), 3);
        assert_eq!(
            analytics.recent_transactions[0].item_name,
            "Collected Poems of Tagore"
        );

        let books = store
            .analytics(Some("books"), AnalyticsPeriod::Day)
            .expect("analytics");
        assert_eq!(books.item_count, 3);
        let expected = 24.99 * 25.0 + 12.99 * 25.0 + 14.99 * 20.0;
        assert!((books.total_value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_period_excludes_old_transactions() {
        let store = seeded();
        let later = Utc::now() + Duration::days(40);
        let analytics = store
            .analytics_at(None, AnalyticsPeriod::Month, later)
            .expect("analytics");
        assert!(analytics.recent_transactions.is_empty());
        let analytics = store
            .analytics_at(None, AnalyticsPeriod::All, later)
            .expect("analytics");
        assert_eq!(analytics.recent_transactions.len(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_stock_never_negative(ops in prop::collection::vec((any::<bool>(), 1i64..20), 0..40)) {
            let store = InventoryStore::new();
            let mut item = NewItem::named("Widget");
            item.stock = 5;
            store.create(item).expect("create");

            let mut expected = 5i64;
            for (is_sale, quantity) in ops {
                let kind = if is_sale { TransactionType::Sale } else { TransactionType::Purchase };
                let result = store.record_transaction(&ItemRef::by_id(1), kind, quantity);
                match (kind, result) {
                    (TransactionType::Sale, Ok(receipt)) => {
                        prop_assert!(expected >= quantity);
                        expected -= quantity;
                        prop_assert_eq!(receipt.new_stock, expected);
                    }
                    (TransactionType::Sale, Err(InventoryError::InsufficientStock { available, .. })) => {
                        prop_assert!(expected < quantity);
                        prop_assert_eq!(available, expected);
                    }
                    (TransactionType::Purchase, Ok(receipt)) => {
                        expected += quantity;
                        prop_assert_eq!(receipt.new_stock, expected);
                    }
                    (_, other) => prop_assert!(false, "unexpected result {:?}", other),
                }
            }
            let stock = store.find(&ItemRef::by_id(1)).expect("lookup").expect("item").stock;
            prop_assert_eq!(stock, expected);
            prop_assert!(stock >= 0);
        }
    }
}
