use uuid::Uuid;

use super::value_objects::{ChannelRef, OrderStatus, Owner};
use crate::domain::pricing::Totals;

// ============================================================================
// Order Commands - Represent user intent
// ============================================================================

/// One requested line of a new order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineRequest {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub owner: Owner,
    pub items: Vec<OrderLineRequest>,
    pub customer_notes: Option<String>,
    pub notification_channel: Option<ChannelRef>,
    /// Amounts the client displayed. Only compared, never persisted.
    pub quoted_totals: Option<Totals>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetStatus {
    pub order_id: Uuid,
    pub status: OrderStatus,
}
