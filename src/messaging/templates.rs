use crate::domain::order::OrderNumber;

/// Emoji and display title for a status label. Labels outside the current
/// lifecycle (`confirmed`) still render, since older orders may carry them.
pub fn status_heading(status: &str) -> (&'static str, &'static str) {
    match status {
        "pending" => ("⏳", "Order Received"),
        "confirmed" => ("✅", "Order Confirmed"),
        "preparing" => ("👨‍🍳", "Being Prepared"),
        "ready" => ("🍽️", "Ready for Pickup"),
        "completed" | "delivered" => ("📦", "Delivered"),
        "cancelled" => ("❌", "Cancelled"),
        _ => ("📋", "Status Changed"),
    }
}

fn status_body(status: &str) -> Option<&'static str> {
    match status {
        "confirmed" => Some("🍳 Your order has been confirmed and we're preparing it now!"),
        "preparing" => Some("👨‍🍳 Our chefs are preparing your delicious meal!"),
        "ready" => Some("🍽️ Your order is ready! Come pick it up or delivery is on the way!"),
        "completed" | "delivered" => Some("📦 Your order has been delivered! Enjoy your meal!"),
        "cancelled" => Some("❌ Your order has been cancelled. Contact us if this is unexpected."),
        _ => None,
    }
}

/// Render the chat message sent when an order moves to `status`.
pub fn message_for(order_number: &OrderNumber, status: &str) -> String {
    let (emoji, title) = status_heading(status);

    let mut message = format!("{emoji} Order Update!\n\nOrder #{order_number}\nStatus: {title}\n");
    match status_body(status) {
        Some(body) => {
            message.push('\n');
            message.push_str(body);
        }
        None if title == "Status Changed" => {
            message.push_str(&format!("\nYour order status changed to \"{status}\"."));
        }
        None => {}
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number() -> OrderNumber {
        OrderNumber("DK123456".to_string())
    }

    #[test]
    fn test_ready_message() {
        let message = message_for(&number(), "ready");
        assert!(message.starts_with("🍽️ Order Update!"));
        assert!(message.contains("Order #DK123456"));
        assert!(message.contains("Status: Ready for Pickup"));
        assert!(message.contains("delivery is on the way"));
    }

    #[test]
    fn test_completed_and_delivered_share_template() {
        assert_eq!(message_for(&number(), "completed"), message_for(&number(), "delivered"));
        assert!(message_for(&number(), "completed").contains("Enjoy your meal"));
    }

    #[test]
    fn test_pending_has_no_body() {
        let message = message_for(&number(), "pending");
        assert!(message.contains("Status: Order Received"));
        assert!(message.ends_with("Order Received\n"));
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let message = message_for(&number(), "on_hold");
        assert!(message.starts_with("📋"));
        assert!(message.contains("Status Changed"));
        assert!(message.contains("\"on_hold\""));
    }
}
