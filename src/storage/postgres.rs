use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::store::{CatalogStore, IdentityStore, OrderStore, StatusUpdate, StorageError};
use crate::domain::catalog::{Category, MenuItem, MenuItemPatch, NewCategory, NewMenuItem};
use crate::domain::identity::Identity;
use crate::domain::order::{
    ChannelRef, Order, OrderDraft, OrderFilter, OrderItem, OrderNumber, OrderStatus, Owner,
};

// ============================================================================
// PostgreSQL Store
// ============================================================================
//
// Order placement is the one multi-row write: the order row and every item
// row go through a single transaction. Dropping the transaction without
// commit (early return on error, cancelled future) rolls it back.
//
// ============================================================================

const ORDER_COLUMNS: &str = "id, order_number, owner_kind, owner_id, status, subtotal, delivery_fee, \
     total, customer_notes, notification_channel, created_at, updated_at";

const MENU_ITEM_COLUMNS: &str = "id, name, description, price, category_id, image_url, is_active, \
     is_popular, preparation_minutes, sort_order, created_at, updated_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn load_items(&self, order_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<OrderItem>>, StorageError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, order_id, menu_item_id, menu_item_name, quantity, price, special_instructions, created_at
             FROM order_items
             WHERE order_id = ANY($1)
             ORDER BY order_id, position",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn attach_items(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, StorageError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.load_items(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }
}

/// One column of the owner list, for pairing with UNNEST.
fn owner_column(filter: &OrderFilter, f: impl Fn(&Owner) -> String) -> Option<Vec<String>> {
    filter.owners.as_ref().map(|owners| owners.iter().map(f).collect())
}

fn map_write_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(ref db) = err {
        if db.is_unique_violation() {
            return StorageError::Conflict(db.constraint().unwrap_or("unique constraint").to_string());
        }
        if db.is_foreign_key_violation() {
            return StorageError::MissingReference(db.constraint().unwrap_or("foreign key").to_string());
        }
    }
    StorageError::Database(err)
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    owner_kind: String,
    owner_id: String,
    status: String,
    subtotal: Decimal,
    delivery_fee: Decimal,
    total: Decimal,
    customer_notes: Option<String>,
    notification_channel: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, StorageError> {
        let owner = match self.owner_kind.as_str() {
            "account" => Owner::Account(self.owner_id),
            "channel" => Owner::Channel(self.owner_id),
            other => return Err(StorageError::Corrupt(format!("order {} has owner kind {other}", self.id))),
        };
        let status = self
            .status
            .parse::<OrderStatus>()
            .map_err(|e| StorageError::Corrupt(format!("order {}: {e}", self.id)))?;

        Ok(Order {
            id: self.id,
            order_number: OrderNumber(self.order_number),
            owner,
            status,
            subtotal: self.subtotal,
            delivery_fee: self.delivery_fee,
            total: self.total,
            customer_notes: self.customer_notes,
            notification_channel: self.notification_channel.map(ChannelRef),
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    menu_item_id: Uuid,
    menu_item_name: String,
    quantity: i32,
    price: Decimal,
    special_instructions: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            menu_item_id: row.menu_item_id,
            menu_item_name: row.menu_item_name,
            quantity: row.quantity,
            price: row.price,
            special_instructions: row.special_instructions,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        let categories = sqlx::query_as(
            "SELECT id, name, emoji, slug, description, is_active, sort_order, created_at, updated_at
             FROM categories
             WHERE is_active
             ORDER BY sort_order, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, StorageError> {
        let now = Utc::now();
        sqlx::query_as(
            "INSERT INTO categories (id, name, emoji, slug, description, is_active, sort_order, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, TRUE, $6, $7, $7)
             RETURNING id, name, emoji, slug, description, is_active, sort_order, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(category.name)
        .bind(category.emoji)
        .bind(category.slug)
        .bind(category.description)
        .bind(category.sort_order)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn list_menu_items(&self, category_id: Option<Uuid>) -> Result<Vec<MenuItem>, StorageError> {
        let items = sqlx::query_as(&format!(
            "SELECT {MENU_ITEM_COLUMNS} FROM menu_items
             WHERE is_active AND ($1::uuid IS NULL OR category_id = $1)
             ORDER BY sort_order, name"
        ))
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn get_menu_item(&self, id: Uuid) -> Result<Option<MenuItem>, StorageError> {
        let item = sqlx::query_as(&format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    async fn get_menu_items(&self, ids: &[Uuid]) -> Result<Vec<MenuItem>, StorageError> {
        let items = sqlx::query_as(&format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, StorageError> {
        let now = Utc::now();
        sqlx::query_as(&format!(
            "INSERT INTO menu_items ({MENU_ITEM_COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, TRUE, $7, $8, $9, $10, $10)
             RETURNING {MENU_ITEM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(item.name)
        .bind(item.description)
        .bind(item.price)
        .bind(item.category_id)
        .bind(item.image_url)
        .bind(item.is_popular)
        .bind(item.preparation_minutes)
        .bind(item.sort_order)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn update_menu_item(&self, id: Uuid, patch: MenuItemPatch) -> Result<Option<MenuItem>, StorageError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<MenuItem> =
            sqlx::query_as(&format!("SELECT {MENU_ITEM_COLUMNS} FROM menu_items WHERE id = $1 FOR UPDATE"))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(mut item) = current else {
            return Ok(None);
        };
        patch.apply(&mut item, Utc::now());

        sqlx::query(
            "UPDATE menu_items
             SET name = $2, description = $3, price = $4, category_id = $5, image_url = $6,
                 is_active = $7, is_popular = $8, preparation_minutes = $9, sort_order = $10, updated_at = $11
             WHERE id = $1",
        )
        .bind(item.id)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(item.category_id)
        .bind(&item.image_url)
        .bind(item.is_active)
        .bind(item.is_popular)
        .bind(item.preparation_minutes)
        .bind(item.sort_order)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await?;
        Ok(Some(item))
    }

    async fn deactivate_menu_item(&self, id: Uuid) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE menu_items SET is_active = FALSE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Orders
// ============================================================================

#[async_trait]
impl OrderStore for PgStore {
    async fn insert_order(&self, draft: &OrderDraft, order_number: &OrderNumber) -> Result<Order, StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO orders ({ORDER_COLUMNS})
             VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7, $8, $9, $10, $10)"
        ))
        .bind(draft.id)
        .bind(order_number.as_str())
        .bind(draft.owner.kind())
        .bind(draft.owner.id())
        .bind(draft.totals.subtotal)
        .bind(draft.totals.delivery_fee)
        .bind(draft.totals.total)
        .bind(&draft.customer_notes)
        .bind(draft.notification_channel.as_ref().map(|c| c.as_str()))
        .bind(draft.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if !draft.lines.is_empty() {
            let mut insert: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO order_items (id, order_id, position, menu_item_id, menu_item_name, quantity, \
                 price, special_instructions, created_at) ",
            );
            insert.push_values(draft.lines.iter().enumerate(), |mut row, (position, line)| {
                row.push_bind(line.id)
                    .push_bind(draft.id)
                    .push_bind(position as i32)
                    .push_bind(line.menu_item_id)
                    .push_bind(&line.menu_item_name)
                    .push_bind(line.quantity)
                    .push_bind(line.price)
                    .push_bind(&line.special_instructions)
                    .push_bind(draft.created_at);
            });
            insert.build().execute(&mut *tx).await.map_err(map_write_error)?;
        }

        tx.commit().await?;

        tracing::debug!(
            order_id = %draft.id,
            order_number = %order_number,
            item_count = draft.lines.len(),
            "Order and items committed"
        );

        Ok(draft.clone().into_order(order_number.clone()))
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, StorageError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.attach_items(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StorageError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::varchar IS NULL OR status = $1)
               AND ($2::text[] IS NULL
                    OR (owner_kind, owner_id) IN (SELECT * FROM UNNEST($2::text[], $3::text[])))
             ORDER BY created_at DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(owner_column(filter, |o| o.kind().to_string()))
        .bind(owner_column(filter, |o| o.id().to_string()))
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(rows).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        expected: OrderStatus,
        next: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StorageError> {
        let updated: Option<OrderRow> = sqlx::query_as(&format!(
            "UPDATE orders SET status = $3, updated_at = $4
             WHERE id = $1 AND status = $2
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            let order = self.attach_items(vec![row]).await?.pop();
            return Ok(order.map_or(StatusUpdate::NotFound, StatusUpdate::Updated));
        }

        let current: Option<(String,)> = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match current {
            None => Ok(StatusUpdate::NotFound),
            Some((status,)) => {
                let status = status
                    .parse::<OrderStatus>()
                    .map_err(|e| StorageError::Corrupt(format!("order {id}: {e}")))?;
                Ok(StatusUpdate::Stale(status))
            }
        }
    }
}

// ============================================================================
// Identity
// ============================================================================

#[async_trait]
impl IdentityStore for PgStore {
    async fn get_identity(&self, id: &str) -> Result<Option<Identity>, StorageError> {
        let identity = sqlx::query_as(
            "SELECT id, email, first_name, last_name, telegram_user_id, is_admin FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(identity)
    }
}

// Query behavior (transaction rollback, unique violations, compare-and-set)
// needs a live PostgreSQL instance; the shared contract is exercised against
// MemoryStore in the command handler tests.
