use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::payloads::{OrderLinePayload, PlaceOrderRequest, QuotedTotals, MAX_LINES, MAX_QUANTITY};
use crate::domain::catalog::MenuItemSnapshot;
use crate::domain::pricing::{max_amount, DeliveryPolicy, Totals};

// ============================================================================
// Cart - client-side order in progress
// ============================================================================
//
// Lines are keyed by menu item: adding an item already in the cart bumps the
// quantity of its existing line. Prices are the snapshot taken when the line
// was created; the server reprices at checkout anyway.
//
// The cart holds to the same limits the order endpoint enforces (quantity
// per line, number of lines, price range), so a checkout request built from
// it is always accepted on shape.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: u64,
    pub menu_item: MenuItemSnapshot,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.menu_item.price.saturating_mul(Decimal::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    lines: Vec<CartLine>,
    /// Last line id handed out; ids only move forward.
    #[serde(default)]
    last_line_id: u64,
    #[serde(skip)]
    policy: DeliveryPolicy,
}

impl Cart {
    pub fn new(policy: DeliveryPolicy) -> Self {
        Self {
            lines: Vec::new(),
            last_line_id: 0,
            policy,
        }
    }

    pub fn set_policy(&mut self, policy: DeliveryPolicy) {
        self.policy = policy;
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Millisecond timestamp, bumped past the previous id when two lines
    /// are created within the same millisecond.
    fn next_line_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last_line_id = now.max(self.last_line_id + 1);
        self.last_line_id
    }

    /// Add `quantity` of an item. Returns the id of the line that holds it.
    /// Line quantities are capped at `MAX_QUANTITY`. Non-positive quantities,
    /// out-of-range prices and a new line past `MAX_LINES` are ignored.
    pub fn add_item(&mut self, item: MenuItemSnapshot, quantity: i32, note: Option<String>) -> Option<u64> {
        if quantity <= 0 || !price_in_range(item.price) {
            return None;
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.menu_item.id == item.id) {
            line.quantity = line.quantity.saturating_add(quantity).min(MAX_QUANTITY);
            if note.is_some() {
                line.note = note;
            }
            return Some(line.id);
        }

        if self.lines.len() >= MAX_LINES {
            tracing::debug!(lines = self.lines.len(), "Cart is full, item not added");
            return None;
        }

        let id = self.next_line_id();
        self.lines.push(CartLine {
            id,
            menu_item: item,
            quantity: quantity.min(MAX_QUANTITY),
            note,
        });
        Some(id)
    }

    /// Set a line's quantity, capped at `MAX_QUANTITY`; zero or less removes
    /// it. Returns false for an unknown line.
    pub fn update_quantity(&mut self, line_id: u64, quantity: i32) -> bool {
        if quantity <= 0 {
            return self.remove_item(line_id);
        }
        match self.lines.iter_mut().find(|l| l.id == line_id) {
            Some(line) => {
                line.quantity = quantity.min(MAX_QUANTITY);
                true
            }
            None => false,
        }
    }

    /// Bring a cart read from storage back within limits: drops lines with a
    /// bad price or quantity, caps quantities and the number of lines.
    pub fn enforce_limits(&mut self) {
        let before = self.lines.len();
        self.lines
            .retain(|line| line.quantity > 0 && price_in_range(line.menu_item.price));
        self.lines.truncate(MAX_LINES);
        for line in &mut self.lines {
            line.quantity = line.quantity.min(MAX_QUANTITY);
        }
        if self.lines.len() != before {
            tracing::warn!(dropped = before - self.lines.len(), "Dropped cart lines outside limits");
        }
    }

    pub fn remove_item(&mut self, line_id: u64) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn totals(&self) -> Totals {
        let subtotal = self
            .lines
            .iter()
            .fold(Decimal::ZERO, |sum, line| sum.saturating_add(line.line_total()));
        Totals::from_subtotal(subtotal, &self.policy)
    }

    pub fn subtotal(&self) -> Decimal {
        self.totals().subtotal
    }

    pub fn delivery_fee(&self) -> Decimal {
        self.totals().delivery_fee
    }

    pub fn total(&self) -> Decimal {
        self.totals().total
    }

    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn contains(&self, menu_item_id: Uuid) -> bool {
        self.lines.iter().any(|l| l.menu_item.id == menu_item_id)
    }

    /// Body for `POST /api/orders`, quoting the amounts the cart displayed.
    pub fn checkout_request(&self, customer_notes: Option<String>) -> PlaceOrderRequest {
        let totals = self.totals();
        PlaceOrderRequest {
            items: self
                .lines
                .iter()
                .map(|line| OrderLinePayload {
                    menu_item_id: line.menu_item.id,
                    quantity: line.quantity,
                    special_instructions: line.note.clone(),
                })
                .collect(),
            customer_notes,
            quoted: Some(QuotedTotals {
                subtotal: totals.subtotal,
                delivery_fee: totals.delivery_fee,
                total: totals.total,
            }),
        }
    }
}

fn price_in_range(price: Decimal) -> bool {
    !price.is_sign_negative() && price <= max_amount()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(name: &str, cents: i64) -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price: Decimal::new(cents, 2),
        }
    }

    #[test]
    fn test_add_merges_same_item() {
        let mut cart = Cart::default();
        let burger = snapshot("Durger King Classic", 899);

        let first = cart.add_item(burger.clone(), 1, Some("no pickles".into())).unwrap();
        let second = cart.add_item(burger.clone(), 2, None).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[0].note.as_deref(), Some("no pickles"));

        cart.add_item(burger, 1, Some("extra cheese".into()));
        assert_eq!(cart.lines()[0].note.as_deref(), Some("extra cheese"));
    }

    #[test]
    fn test_line_ids_unique_within_same_millisecond() {
        let mut cart = Cart::default();
        let ids: Vec<_> = (0..20)
            .map(|i| cart.add_item(snapshot(&format!("item {i}"), 100), 1, None).unwrap())
            .collect();

        let mut sorted = ids.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_update_quantity_and_remove() {
        let mut cart = Cart::default();
        let line = cart.add_item(snapshot("French Fries", 399), 1, None).unwrap();

        assert!(cart.update_quantity(line, 4));
        assert_eq!(cart.item_count(), 4);

        assert!(cart.update_quantity(line, 0));
        assert!(cart.is_empty());
        assert!(!cart.update_quantity(line, 2));
        assert!(!cart.remove_item(line));
    }

    #[test]
    fn test_totals_follow_delivery_tier() {
        let mut cart = Cart::default();
        cart.add_item(snapshot("Durger King Classic", 899), 2, None);
        cart.add_item(snapshot("French Fries", 399), 1, None);

        assert_eq!(cart.subtotal(), Decimal::new(2197, 2));
        assert_eq!(cart.delivery_fee(), Decimal::new(299, 2));
        assert_eq!(cart.total(), Decimal::new(2496, 2));

        cart.add_item(snapshot("Coca-Cola", 303), 1, None);
        assert_eq!(cart.subtotal(), Decimal::new(2500, 2));
        assert_eq!(cart.delivery_fee(), Decimal::ZERO);
        assert_eq!(cart.total(), Decimal::new(2500, 2));
    }

    #[test]
    fn test_checkout_request_carries_lines_and_quote() {
        let mut cart = Cart::default();
        let burger = snapshot("Durger King Classic", 899);
        cart.add_item(burger.clone(), 2, Some("well done".into()));

        let request = cart.checkout_request(Some("Ring twice".into()));
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].menu_item_id, burger.id);
        assert_eq!(request.items[0].special_instructions.as_deref(), Some("well done"));
        assert_eq!(request.quoted.unwrap().total, Decimal::new(2097, 2));

        // Serializes to the shape the API accepts.
        let json = serde_json::to_value(&request).unwrap();
        assert!(json["items"][0].get("menuItemId").is_some());
        assert_eq!(json["customerNotes"], "Ring twice");
    }

    #[test]
    fn test_quantities_capped_at_order_limit() {
        let mut cart = Cart::default();
        let burger = snapshot("Durger King Classic", 899);

        let line = cart.add_item(burger.clone(), 60, None).unwrap();
        cart.add_item(burger.clone(), 60, None);
        assert_eq!(cart.lines()[0].quantity, MAX_QUANTITY);

        cart.add_item(burger.clone(), i32::MAX, None);
        assert_eq!(cart.lines()[0].quantity, MAX_QUANTITY);

        assert!(cart.update_quantity(line, 500));
        assert_eq!(cart.lines()[0].quantity, MAX_QUANTITY);

        let command = cart.checkout_request(None).into_command("user-1", None).unwrap();
        assert_eq!(command.items[0].quantity, MAX_QUANTITY);
    }

    #[test]
    fn test_line_count_and_price_limits() {
        let mut cart = Cart::default();
        for i in 0..MAX_LINES {
            assert!(cart.add_item(snapshot(&format!("item {i}"), 100), 1, None).is_some());
        }
        assert!(cart.add_item(snapshot("one too many", 100), 1, None).is_none());
        assert_eq!(cart.lines().len(), MAX_LINES);

        let mut cart = Cart::default();
        let absurd = MenuItemSnapshot {
            price: Decimal::MAX,
            ..snapshot("Gold Leaf Burger", 0)
        };
        assert!(cart.add_item(absurd, 2, None).is_none());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_enforce_limits_repairs_stored_cart() {
        let mut cart = Cart::default();
        cart.add_item(snapshot("French Fries", 399), 1, None);
        cart.lines[0].quantity = 1_000;
        cart.lines.push(CartLine {
            id: 99,
            menu_item: MenuItemSnapshot {
                price: Decimal::MAX,
                ..snapshot("Gold Leaf Burger", 0)
            },
            quantity: 2,
            note: None,
        });

        cart.enforce_limits();

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, MAX_QUANTITY);
        assert!(cart.checkout_request(None).into_command("user-1", None).is_ok());
    }
}
