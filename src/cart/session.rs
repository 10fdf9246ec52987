use std::sync::Arc;

use rust_decimal::Decimal;

use super::model::{Cart, CartLine};
use super::store::{CartError, CartStore};
use crate::api::payloads::PlaceOrderRequest;
use crate::domain::catalog::MenuItemSnapshot;
use crate::domain::pricing::DeliveryPolicy;

/// A cart bound to its store: loaded once, saved after every change.
pub struct CartSession<S: CartStore + ?Sized> {
    cart: Cart,
    store: Arc<S>,
}

impl<S: CartStore + ?Sized> CartSession<S> {
    pub async fn open(store: Arc<S>, policy: DeliveryPolicy) -> Result<Self, CartError> {
        let mut cart = store.load().await?.unwrap_or_default();
        cart.set_policy(policy);
        cart.enforce_limits();

        tracing::debug!(lines = cart.lines().len(), "Cart loaded");
        Ok(Self { cart, store })
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn subtotal(&self) -> Decimal {
        self.cart.subtotal()
    }

    pub fn delivery_fee(&self) -> Decimal {
        self.cart.delivery_fee()
    }

    pub fn total(&self) -> Decimal {
        self.cart.total()
    }

    pub fn item_count(&self) -> i32 {
        self.cart.item_count()
    }

    pub async fn add_item(
        &mut self,
        item: MenuItemSnapshot,
        quantity: i32,
        note: Option<String>,
    ) -> Result<Option<u64>, CartError> {
        let line = self.cart.add_item(item, quantity, note);
        self.store.save(&self.cart).await?;
        Ok(line)
    }

    pub async fn update_quantity(&mut self, line_id: u64, quantity: i32) -> Result<bool, CartError> {
        let changed = self.cart.update_quantity(line_id, quantity);
        self.store.save(&self.cart).await?;
        Ok(changed)
    }

    pub async fn remove_item(&mut self, line_id: u64) -> Result<bool, CartError> {
        let removed = self.cart.remove_item(line_id);
        self.store.save(&self.cart).await?;
        Ok(removed)
    }

    pub async fn clear(&mut self) -> Result<(), CartError> {
        self.cart.clear();
        self.store.save(&self.cart).await
    }

    pub fn checkout_request(&self, customer_notes: Option<String>) -> PlaceOrderRequest {
        self.cart.checkout_request(customer_notes)
    }

    /// Call once the server has accepted the order.
    pub async fn complete_checkout(&mut self) -> Result<(), CartError> {
        tracing::info!(items = self.cart.item_count(), "Checkout complete, clearing cart");
        self.clear().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::store::{JsonFileCartStore, MemoryCartStore};
    use uuid::Uuid;

    fn burger() -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: Uuid::new_v4(),
            name: "Durger King Classic".to_string(),
            price: Decimal::new(899, 2),
        }
    }

    #[tokio::test]
    async fn test_cart_survives_reopen() {
        let store = Arc::new(MemoryCartStore::new());

        let mut session = CartSession::open(store.clone(), DeliveryPolicy::default()).await.unwrap();
        session.add_item(burger(), 2, None).await.unwrap();
        drop(session);

        let reopened = CartSession::open(store, DeliveryPolicy::default()).await.unwrap();
        assert_eq!(reopened.item_count(), 2);
        assert_eq!(reopened.total(), Decimal::new(2097, 2));
    }

    #[tokio::test]
    async fn test_json_file_store_round_trip() {
        let path = std::env::temp_dir().join(format!("durger-cart-{}.json", Uuid::new_v4()));
        let store = Arc::new(JsonFileCartStore::new(&path));

        let mut session = CartSession::open(store.clone(), DeliveryPolicy::default()).await.unwrap();
        assert!(session.lines().is_empty());

        let line = session.add_item(burger(), 1, Some("no onions".into())).await.unwrap().unwrap();
        session.update_quantity(line, 3).await.unwrap();

        let reopened = CartSession::open(store.clone(), DeliveryPolicy::default()).await.unwrap();
        assert_eq!(reopened.lines().len(), 1);
        assert_eq!(reopened.lines()[0].quantity, 3);
        assert_eq!(reopened.lines()[0].note.as_deref(), Some("no onions"));

        // Line ids keep moving forward after a reload.
        let mut reopened = reopened;
        let next = reopened.add_item(MenuItemSnapshot { id: Uuid::new_v4(), ..burger() }, 1, None).await.unwrap();
        assert!(next.unwrap() > line);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_complete_checkout_clears_and_persists() {
        let store = Arc::new(MemoryCartStore::new());
        let mut session = CartSession::open(store.clone(), DeliveryPolicy::default()).await.unwrap();
        session.add_item(burger(), 1, None).await.unwrap();

        let request = session.checkout_request(None);
        assert_eq!(request.items.len(), 1);

        session.complete_checkout().await.unwrap();
        assert!(session.lines().is_empty());

        let saved = store.load().await.unwrap().unwrap();
        assert!(saved.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("durger-cart-{}.json", Uuid::new_v4()));
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let result = CartSession::open(Arc::new(JsonFileCartStore::new(&path)), DeliveryPolicy::default()).await;
        assert!(matches!(result, Err(CartError::Format(_))));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
