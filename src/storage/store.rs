use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::catalog::{Category, MenuItem, MenuItemPatch, NewCategory, NewMenuItem};
use crate::domain::identity::Identity;
use crate::domain::order::{Order, OrderDraft, OrderFilter, OrderNumber, OrderStatus};

// ============================================================================
// Store Traits - Persistence seams for the order core
// ============================================================================
//
// Implemented by PgStore (sqlx / PostgreSQL) and MemoryStore (tests, local
// runs without a database). Both must give the same guarantees:
//
// 1. insert_order writes the order and all its items or nothing
// 2. order numbers are unique; a duplicate surfaces as StorageError::Conflict
// 3. update_status only applies when the stored status is still `expected`
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// A write pointed at a row that does not exist (e.g. a category id).
    #[error("Referenced row missing: {0}")]
    MissingReference(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Outcome of a compare-and-set status write.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    Updated(Order),
    NotFound,
    /// Someone changed the status first; carries what is stored now.
    Stale(OrderStatus),
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active categories by sort order, then name.
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    async fn create_category(&self, category: NewCategory) -> Result<Category, StorageError>;

    /// Active menu items, optionally restricted to one category.
    async fn list_menu_items(&self, category_id: Option<Uuid>) -> Result<Vec<MenuItem>, StorageError>;

    async fn get_menu_item(&self, id: Uuid) -> Result<Option<MenuItem>, StorageError>;

    /// Every requested item that exists, active or not.
    async fn get_menu_items(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, StorageError>;

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, StorageError>;

    async fn update_menu_item(&self, id: Uuid, patch: MenuItemPatch) -> Result<Option<MenuItem>, StorageError>;

    /// Soft delete. Returns false when the item does not exist.
    async fn deactivate_menu_item(&self, id: Uuid) -> Result<bool, StorageError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist the order and its items atomically under `order_number`.
    async fn insert_order(&self, draft: &OrderDraft, order_number: &OrderNumber) -> Result<Order, StorageError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StorageError>;

    /// Newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError>;

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StorageError>;
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn get_identity(&self, id: &str) -> Result<Option<Identity>, StorageError>;
}
