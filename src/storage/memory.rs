use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::{CatalogStore, IdentityStore, OrderStore, StatusUpdate, StorageError};
use crate::domain::catalog::{Category, MenuItem, MenuItemPatch, NewCategory, NewMenuItem};
use crate::domain::identity::Identity;
use crate::domain::order::{Order, OrderDraft, OrderFilter, OrderNumber, OrderStatus};

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Same contract as PgStore, backed by maps behind one async mutex. Every
// write happens under a single lock acquisition, which is what makes the
// order + items insert atomic here.
//
// ============================================================================

#[derive(Default)]
struct Inner {
    categories: Vec<Category>,
    menu_items: HashMap<Uuid, MenuItem>,
    orders: Vec<Order>,
    identities: HashMap<String, Identity>,
}

impl Inner {
    /// Mirrors the menu_items.category_id foreign key.
    fn check_category(&self, category_id: Option<Uuid>) -> Result<(), StorageError> {
        match category_id {
            Some(id) if !self.categories.iter().any(|c| c.id == id) => {
                Err(StorageError::MissingReference(format!("category {id}")))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_identity(&self, identity: Identity) {
        let mut inner = self.inner.lock().await;
        inner.identities.insert(identity.id.clone(), identity);
    }

    pub async fn order_count(&self) -> usize {
        self.inner.lock().await.orders.len()
    }

    pub async fn order_item_count(&self) -> usize {
        self.inner.lock().await.orders.iter().map(|o| o.items.len()).sum()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let inner = self.inner.lock().await;
        let mut categories: Vec<_> = inner.categories.iter().filter(|c| c.is_active).cloned().collect();
        categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.categories.iter().any(|c| c.slug == category.slug) {
            return Err(StorageError::Conflict(format!("category slug {}", category.slug)));
        }

        let now = Utc::now();
        let created = Category {
            id: Uuid::new_v4(),
            name: category.name,
            emoji: category.emoji,
            slug: category.slug,
            description: category.description,
            is_active: true,
            sort_order: category.sort_order,
            created_at: now,
            updated_at: now,
        };
        inner.categories.push(created.clone());
        Ok(created)
    }

    async fn list_menu_items(&self, category_id: Option<Uuid>) -> Result<Vec<MenuItem>, StorageError> {
        let inner = self.inner.lock().await;
        let mut items: Vec<_> = inner
            .menu_items
            .values()
            .filter(|item| item.is_active)
            .filter(|item| category_id.is_none() || item.category_id == category_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn get_menu_item(&self, id: Uuid) -> Result<Option<MenuItem>, StorageError> {
        Ok(self.inner.lock().await.menu_items.get(&id).cloned())
    }

    async fn get_menu_items(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(ids.iter().filter_map(|id| inner.menu_items.get(id).cloned()).collect())
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, StorageError> {
        let mut inner = self.inner.lock().await;
        inner.check_category(item.category_id)?;

        let now = Utc::now();
        let created = MenuItem {
            id: Uuid::new_v4(),
            name: item.name,
            description: item.description,
            price: item.price,
            category_id: item.category_id,
            image_url: item.image_url,
            is_active: true,
            is_popular: item.is_popular,
            preparation_minutes: item.preparation_minutes,
            sort_order: item.sort_order,
            created_at: now,
            updated_at: now,
        };

        inner.menu_items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_menu_item(&self, id: Uuid, patch: MenuItemPatch) -> Result<Option<MenuItem>, StorageError> {
        let mut inner = self.inner.lock().await;
        if inner.menu_items.contains_key(&id) {
            inner.check_category(patch.category_id)?;
        }
        Ok(inner.menu_items.get_mut(&id).map(|item| {
            patch.apply(item, Utc::now());
            item.clone()
        }))
    }

    async fn deactivate_menu_item(&self, id: Uuid) -> Result<bool, StorageError> {
        let mut inner = self.inner.lock().await;
        match inner.menu_items.get_mut(&id) {
            Some(item) => {
                item.is_active = false;
                item.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, draft: &OrderDraft, order_number: &OrderNumber) -> Result<Order, StorageError> {
        let mut inner = self.inner.lock().await;

        if inner.orders.iter().any(|o| &o.order_number == order_number) {
            return Err(StorageError::Conflict(format!("order number {order_number}")));
        }

        let order = draft.clone().into_order(order_number.clone());
        inner.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StorageError> {
        let inner = self.inner.lock().await;
        Ok(inner.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError> {
        let inner = self.inner.lock().await;
        let mut orders: Vec<_> = inner
            .orders
            .iter()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StorageError> {
        let mut inner = self.inner.lock().await;

        let Some(order) = inner.orders.iter_mut().find(|o| o.id == id) else {
            return Ok(StatusUpdate::NotFound);
        };

        if order.status != expected {
            return Ok(StatusUpdate::Stale(order.status));
        }

        order.status = next;
        order.updated_at = updated_at;
        Ok(StatusUpdate::Updated(order.clone()))
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn get_identity(&self, id: &str) -> Result<Option<Identity>, StorageError> {
        Ok(self.inner.lock().await.identities.get(id).cloned())
    }
}
