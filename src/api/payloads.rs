use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ApiError;
use crate::domain::catalog::{MenuItemPatch, NewCategory, NewMenuItem};
use crate::domain::order::{ChannelRef, OrderLineRequest, OrderStatus, Owner, PlaceOrder};
use crate::domain::pricing::{max_amount, Totals};

// ============================================================================
// Request Payloads
// ============================================================================
//
// Typed request bodies. Unknown fields are rejected by serde; range and
// length rules are checked here, before any store is touched.
//
// ============================================================================

pub const MAX_QUANTITY: i32 = 99;
pub const MAX_LINES: usize = 50;
pub const MAX_NOTE_CHARS: usize = 500;
const MAX_NAME_CHARS: usize = 200;

fn invalid(message: impl Into<String>) -> ApiError {
    ApiError::Validation(message.into())
}

fn check_note(field: &str, note: &Option<String>) -> Result<(), ApiError> {
    match note {
        Some(text) if text.chars().count() > MAX_NOTE_CHARS => {
            Err(invalid(format!("{field} must be at most {MAX_NOTE_CHARS} characters")))
        }
        _ => Ok(()),
    }
}

fn check_name(field: &str, name: &str) -> Result<(), ApiError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(invalid(format!("{field} must be 1 to {MAX_NAME_CHARS} characters")));
    }
    Ok(())
}

fn check_money(field: &str, amount: Decimal) -> Result<(), ApiError> {
    if amount.is_sign_negative() || amount.scale() > 2 {
        return Err(invalid(format!("{field} must be a non-negative amount with at most 2 decimals")));
    }
    if amount > max_amount() {
        return Err(invalid(format!("{field} must be at most {}", max_amount())));
    }
    Ok(())
}

/// Blank strings count as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderLinePayload {
    pub menu_item_id: Uuid,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// Amounts the client showed at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QuotedTotals {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderLinePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quoted: Option<QuotedTotals>,
}

/// Body of `POST /api/orders/telegram`. The sender is whoever signed
/// `initData`; the body cannot name another user or chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TelegramOrderRequest {
    pub init_data: String,
    pub items: Vec<OrderLinePayload>,
    #[serde(default)]
    pub customer_notes: Option<String>,
    #[serde(default)]
    pub quoted: Option<QuotedTotals>,
}

fn validate_lines(items: &[OrderLinePayload]) -> Result<Vec<OrderLineRequest>, ApiError> {
    if items.is_empty() {
        return Err(invalid("Order items cannot be empty"));
    }
    if items.len() > MAX_LINES {
        return Err(invalid(format!("An order can have at most {MAX_LINES} lines")));
    }

    items
        .iter()
        .map(|line| {
            if !(1..=MAX_QUANTITY).contains(&line.quantity) {
                return Err(invalid(format!(
                    "quantity for {} must be between 1 and {MAX_QUANTITY}",
                    line.menu_item_id
                )));
            }
            check_note("specialInstructions", &line.special_instructions)?;
            Ok(OrderLineRequest {
                menu_item_id: line.menu_item_id,
                quantity: line.quantity,
                special_instructions: non_blank(line.special_instructions.clone()),
            })
        })
        .collect()
}

fn validate_quoted(quoted: Option<QuotedTotals>) -> Result<Option<Totals>, ApiError> {
    let Some(q) = quoted else {
        return Ok(None);
    };
    check_money("quoted.subtotal", q.subtotal)?;
    check_money("quoted.deliveryFee", q.delivery_fee)?;
    check_money("quoted.total", q.total)?;
    Ok(Some(Totals {
        subtotal: q.subtotal,
        delivery_fee: q.delivery_fee,
        total: q.total,
    }))
}

impl PlaceOrderRequest {
    /// `linked_chat` is the caller's linked Telegram id, the only chat an
    /// account order notifies.
    pub fn into_command(self, user_id: &str, linked_chat: Option<String>) -> Result<PlaceOrder, ApiError> {
        let items = validate_lines(&self.items)?;
        check_note("customerNotes", &self.customer_notes)?;

        Ok(PlaceOrder {
            owner: Owner::Account(user_id.to_string()),
            items,
            customer_notes: non_blank(self.customer_notes),
            notification_channel: non_blank(linked_chat).map(ChannelRef),
            quoted_totals: validate_quoted(self.quoted)?,
        })
    }
}

impl TelegramOrderRequest {
    /// `telegram_user_id` comes from verified `initData`.
    pub fn into_command(self, telegram_user_id: String) -> Result<PlaceOrder, ApiError> {
        let items = validate_lines(&self.items)?;
        check_note("customerNotes", &self.customer_notes)?;

        Ok(PlaceOrder {
            owner: Owner::Channel(telegram_user_id.clone()),
            items,
            customer_notes: non_blank(self.customer_notes),
            notification_channel: Some(ChannelRef(telegram_user_id)),
            quoted_totals: validate_quoted(self.quoted)?,
        })
    }
}

/// Body of `PUT /api/orders/{id}/status`. The label is parsed separately so
/// an unknown status reads as a validation error, not a JSON error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusRequest {
    pub status: String,
}

impl StatusRequest {
    pub fn parse(&self) -> Result<OrderStatus, ApiError> {
        self.status.parse().map_err(|e: crate::domain::order::UnknownStatus| invalid(e.to_string()))
    }
}

/// Query string of `GET /api/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderListQuery {
    pub status: Option<String>,
}

impl OrderListQuery {
    pub fn parse(&self) -> Result<Option<OrderStatus>, ApiError> {
        match non_blank(self.status.clone()) {
            // "all" is what the dashboard sends for no filter
            Some(label) if label == "all" => Ok(None),
            Some(label) => label
                .parse()
                .map(Some)
                .map_err(|e: crate::domain::order::UnknownStatus| invalid(e.to_string())),
            None => Ok(None),
        }
    }
}

/// Query string of `GET /api/menu`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MenuQuery {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

impl CategoryRequest {
    pub fn validate(self) -> Result<NewCategory, ApiError> {
        check_name("name", &self.name)?;
        let slug = self.slug.trim().to_ascii_lowercase();
        if slug.is_empty() || !slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(invalid("slug must be lowercase letters, digits and dashes"));
        }
        check_note("description", &self.description)?;

        Ok(NewCategory {
            name: self.name.trim().to_string(),
            emoji: non_blank(self.emoji),
            slug,
            description: non_blank(self.description),
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MenuItemRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub preparation_minutes: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
}

fn check_minutes(minutes: Option<i32>) -> Result<(), ApiError> {
    match minutes {
        Some(m) if !(0..=600).contains(&m) => Err(invalid("preparationMinutes must be between 0 and 600")),
        _ => Ok(()),
    }
}

impl MenuItemRequest {
    pub fn validate(self) -> Result<NewMenuItem, ApiError> {
        check_name("name", &self.name)?;
        check_money("price", self.price)?;
        check_note("description", &self.description)?;
        check_minutes(self.preparation_minutes)?;

        Ok(NewMenuItem {
            name: self.name.trim().to_string(),
            description: non_blank(self.description),
            price: self.price,
            category_id: self.category_id,
            image_url: non_blank(self.image_url),
            is_popular: self.is_popular,
            preparation_minutes: self.preparation_minutes,
            sort_order: self.sort_order,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MenuItemPatchRequest {
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

impl MenuItemPatchRequest {
    pub fn validate(self) -> Result<MenuItemPatch, ApiError> {
        if let Some(ref name) = self.name {
            check_name("name", name)?;
        }
        if let Some(price) = self.price {
            check_money("price", price)?;
        }
        check_note("description", &self.description)?;
        check_minutes(self.preparation_minutes)?;

        Ok(MenuItemPatch {
            name: self.name.map(|n| n.trim().to_string()),
            description: self.description,
            price: self.price,
            category_id: self.category_id,
            image_url: self.image_url,
            is_active: self.is_active,
            is_popular: self.is_popular,
            preparation_minutes: self.preparation_minutes,
            sort_order: self.sort_order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32) -> OrderLinePayload {
        OrderLinePayload {
            menu_item_id: Uuid::new_v4(),
            quantity,
            special_instructions: None,
        }
    }

    fn request(items: Vec<OrderLinePayload>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            items,
            customer_notes: None,
            quoted: None,
        }
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r#"{"items":[],"userId":"someone-else"}"#;
        assert!(serde_json::from_str::<PlaceOrderRequest>(json).is_err());
    }

    #[test]
    fn test_camel_case_body_parses() {
        let id = Uuid::new_v4();
        let json = format!(
            r#"{{"items":[{{"menuItemId":"{id}","quantity":2,"specialInstructions":"no onions"}}],
                "customerNotes":"Ring twice","quoted":{{"subtotal":"17.98","deliveryFee":"2.99","total":"20.97"}}}}"#
        );
        let parsed: PlaceOrderRequest = serde_json::from_str(&json).unwrap();
        let command = parsed.into_command("user-1", None).unwrap();

        assert_eq!(command.items[0].menu_item_id, id);
        assert_eq!(command.items[0].special_instructions.as_deref(), Some("no onions"));
        assert_eq!(command.quoted_totals.unwrap().total, Decimal::new(2097, 2));
        assert!(command.owner.is_account("user-1"));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(request(vec![line(0)]).into_command("u", None).is_err());
        assert!(request(vec![line(100)]).into_command("u", None).is_err());
        assert!(request(vec![line(99)]).into_command("u", None).is_ok());
    }

    #[test]
    fn test_line_and_note_limits() {
        let too_many: Vec<_> = (0..=MAX_LINES).map(|_| line(1)).collect();
        assert!(request(too_many).into_command("u", None).is_err());

        let mut long_note = request(vec![line(1)]);
        long_note.customer_notes = Some("x".repeat(MAX_NOTE_CHARS + 1));
        assert!(matches!(long_note.into_command("u", None), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_channel_defaults() {
        let command = request(vec![line(1)]).into_command("u", Some("1001".into())).unwrap();
        assert_eq!(command.notification_channel, Some(ChannelRef("1001".into())));

        let command = request(vec![line(1)]).into_command("u", None).unwrap();
        assert_eq!(command.notification_channel, None);

        let telegram = TelegramOrderRequest {
            init_data: String::new(),
            items: vec![line(1)],
            customer_notes: None,
            quoted: None,
        };
        let command = telegram.into_command("424242".into()).unwrap();
        assert_eq!(command.owner, Owner::Channel("424242".into()));
        assert_eq!(command.notification_channel, Some(ChannelRef("424242".into())));
    }

    #[test]
    fn test_body_cannot_pick_notification_chat() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"items":[{{"menuItemId":"{id}","quantity":1}}],"telegramChatId":"666"}}"#);
        assert!(serde_json::from_str::<PlaceOrderRequest>(&json).is_err());

        let json = format!(
            r#"{{"initData":"","telegramUserId":"666","chatId":"666","items":[{{"menuItemId":"{id}","quantity":1}}]}}"#
        );
        assert!(serde_json::from_str::<TelegramOrderRequest>(&json).is_err());
    }

    #[test]
    fn test_status_and_filter_parsing() {
        let status = StatusRequest { status: "delivered".into() };
        assert_eq!(status.parse().unwrap(), OrderStatus::Completed);
        assert!(StatusRequest { status: "lost".into() }.parse().is_err());

        assert_eq!(OrderListQuery { status: Some("all".into()) }.parse().unwrap(), None);
        assert_eq!(OrderListQuery { status: Some("ready".into()) }.parse().unwrap(), Some(OrderStatus::Ready));
    }

    #[test]
    fn test_menu_item_price_rules() {
        let item = MenuItemRequest {
            name: "Onion Rings".into(),
            description: None,
            price: "4.499".parse().unwrap(),
            category_id: None,
            image_url: None,
            is_popular: false,
            preparation_minutes: None,
            sort_order: 0,
        };
        assert!(item.clone().validate().is_err());

        let item = MenuItemRequest { price: "-1.00".parse().unwrap(), ..item };
        assert!(item.clone().validate().is_err());

        let item = MenuItemRequest { price: Decimal::MAX, ..item };
        assert!(item.clone().validate().is_err());

        let item = MenuItemRequest { price: "100000000.00".parse().unwrap(), ..item };
        assert!(item.clone().validate().is_err());

        let item = MenuItemRequest { price: "99999999.99".parse().unwrap(), ..item };
        assert!(item.clone().validate().is_ok());

        let patch = MenuItemPatchRequest { price: Some(Decimal::MAX), ..Default::default() };
        assert!(matches!(patch.validate(), Err(ApiError::Validation(_))));

        let item = MenuItemRequest { price: "4.49".parse().unwrap(), ..item };
        assert_eq!(item.validate().unwrap().price, Decimal::new(449, 2));
    }
}
