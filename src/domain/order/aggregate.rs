use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commands::PlaceOrder;
use super::errors::OrderError;
use super::value_objects::{ChannelRef, Order, OrderItem, OrderNumber, OrderStatus, Owner};
use crate::domain::catalog::MenuItem;
use crate::domain::pricing::{DeliveryPolicy, Totals};

// ============================================================================
// Order Aggregate - Domain Logic
// ============================================================================
//
// Placement turns a PlaceOrder command plus the catalog prices read for it
// into an OrderDraft: everything the store needs to write in one
// transaction except the order number, which is assigned per attempt.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DraftLine {
    pub id: Uuid,
    pub menu_item_id: Uuid,
    pub menu_item_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub id: Uuid,
    pub owner: Owner,
    pub totals: Totals,
    pub customer_notes: Option<String>,
    pub notification_channel: Option<ChannelRef>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<DraftLine>,
}

impl OrderDraft {
    /// Validate business rules that need no catalog access.
    pub fn validate(command: &PlaceOrder) -> Result<(), OrderError> {
        if command.items.is_empty() {
            return Err(OrderError::EmptyItems);
        }

        for line in &command.items {
            if line.quantity <= 0 {
                return Err(OrderError::InvalidQuantity(line.quantity));
            }
        }

        Ok(())
    }

    /// Price every line at the given catalog prices.
    ///
    /// `catalog` must hold whatever the catalog returned for the requested ids;
    /// a missing entry means the item does not exist.
    pub fn price(
        command: &PlaceOrder,
        catalog: &HashMap<Uuid, MenuItem>,
        policy: &DeliveryPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        Self::validate(command)?;

        let mut lines = Vec::with_capacity(command.items.len());
        for requested in &command.items {
            let item = catalog
                .get(&requested.menu_item_id)
                .ok_or(OrderError::UnknownMenuItem(requested.menu_item_id))?;

            if !item.is_active {
                return Err(OrderError::InactiveMenuItem(item.id));
            }

            lines.push(DraftLine {
                id: Uuid::new_v4(),
                menu_item_id: item.id,
                menu_item_name: item.name.clone(),
                quantity: requested.quantity,
                price: item.price,
                special_instructions: requested.special_instructions.clone(),
            });
        }

        let totals = Totals::compute(lines.iter().map(|l| (l.price, l.quantity)), policy)
            .filter(Totals::within_limits)
            .ok_or(OrderError::AmountOutOfRange)?;

        Ok(Self {
            id: Uuid::now_v7(),
            owner: command.owner.clone(),
            totals,
            customer_notes: command.customer_notes.clone(),
            notification_channel: command.notification_channel.clone(),
            created_at: now,
            lines,
        })
    }

    /// The order as it reads back once persisted under `order_number`.
    pub fn into_order(self, order_number: OrderNumber) -> Order {
        let order_id = self.id;
        let created_at = self.created_at;

        Order {
            id: order_id,
            order_number,
            owner: self.owner,
            status: OrderStatus::Pending,
            subtotal: self.totals.subtotal,
            delivery_fee: self.totals.delivery_fee,
            total: self.totals.total,
            customer_notes: self.customer_notes,
            notification_channel: self.notification_channel,
            created_at,
            updated_at: created_at,
            items: self
                .lines
                .into_iter()
                .map(|line| OrderItem {
                    id: line.id,
                    order_id,
                    menu_item_id: line.menu_item_id,
                    menu_item_name: line.menu_item_name,
                    quantity: line.quantity,
                    price: line.price,
                    special_instructions: line.special_instructions,
                    created_at,
                })
                .collect(),
        }
    }
}

/// How strictly status changes follow the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Forward moves (skips allowed) and cancellation of non-terminal orders.
    #[default]
    ForwardOnly,
    /// Any status from any status.
    Permissive,
}

impl TransitionPolicy {
    pub fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::ForwardOnly if from.can_advance_to(to) => Ok(()),
            TransitionPolicy::ForwardOnly => Err(OrderError::InvalidTransition { from, to }),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward_only" | "strict" => Ok(TransitionPolicy::ForwardOnly),
            "permissive" => Ok(TransitionPolicy::Permissive),
            other => Err(format!("expected forward_only or permissive, got {other}")),
        }
    }
}

impl Order {
    /// Apply a status change in memory. Returns the previous status.
    pub fn transition_to(
        &mut self,
        next: OrderStatus,
        policy: TransitionPolicy,
        now: DateTime<Utc>,
    ) -> Result<OrderStatus, OrderError> {
        policy.check(self.status, next)?;

        let previous = self.status;
        self.status = next;
        self.updated_at = now;
        Ok(previous)
    }
}
