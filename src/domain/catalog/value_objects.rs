use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Catalog Value Objects
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_popular: bool,
    pub preparation_minutes: Option<i32>,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the cart keeps of a menu item: enough to display and price a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl From<&MenuItem> for MenuItemSnapshot {
    fn from(item: &MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            price: item.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    pub name: String,
    pub emoji: Option<String>,
    pub slug: String,
    pub description: Option<String>,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_popular: bool,
    pub preparation_minutes: Option<i32>,
    pub sort_order: i32,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_popular: Option<bool>,
    pub preparation_minutes: Option<i32>,
    pub sort_order: Option<i32>,
}

impl MenuItemPatch {
    pub fn apply(&self, item: &mut MenuItem, now: DateTime<Utc>) {
        if let Some(ref name) = self.name {
            item.name = name.clone();
        }
        if let Some(ref description) = self.description {
            item.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(category_id) = self.category_id {
            item.category_id = Some(category_id);
        }
        if let Some(ref image_url) = self.image_url {
            item.image_url = Some(image_url.clone());
        }
        if let Some(is_active) = self.is_active {
            item.is_active = is_active;
        }
        if let Some(is_popular) = self.is_popular {
            item.is_popular = is_popular;
        }
        if let Some(minutes) = self.preparation_minutes {
            item.preparation_minutes = Some(minutes);
        }
        if let Some(sort_order) = self.sort_order {
            item.sort_order = sort_order;
        }
        item.updated_at = now;
    }
}
