use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use super::aggregate::{OrderDraft, TransitionPolicy};
use super::commands::{PlaceOrder, SetStatus};
use super::errors::OrderError;
use super::order_number::OrderNumberGenerator;
use super::value_objects::{Order, OrderFilter};
use crate::domain::catalog::MenuItem;
use crate::domain::pricing::DeliveryPolicy;
use crate::messaging::StatusNotifier;
use crate::metrics::Metrics;
use crate::storage::{CatalogStore, OrderStore, StatusUpdate};
use crate::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Order Command Handler
// ============================================================================
//
// Placement:   PlaceOrder → catalog lookup → OrderDraft → number → store
// Transitions: SetStatus → load → policy check → compare-and-set → notify
//
// The notifier runs only after the new status is stored and cannot fail the
// command.
//
// ============================================================================

pub struct OrderCommandHandler {
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    notifier: Arc<dyn StatusNotifier>,
    numbers: Arc<OrderNumberGenerator>,
    pricing: DeliveryPolicy,
    transitions: TransitionPolicy,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
}

impl OrderCommandHandler {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        orders: Arc<dyn OrderStore>,
        notifier: Arc<dyn StatusNotifier>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            orders,
            notifier,
            numbers: Arc::new(OrderNumberGenerator::new()),
            pricing: DeliveryPolicy::default(),
            transitions: TransitionPolicy::default(),
            retry: RetryConfig::order_number(),
            metrics,
        }
    }

    pub fn with_pricing(mut self, pricing: DeliveryPolicy) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_transitions(mut self, transitions: TransitionPolicy) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn with_numbers(mut self, numbers: Arc<OrderNumberGenerator>) -> Self {
        self.numbers = numbers;
        self
    }

    pub fn pricing(&self) -> &DeliveryPolicy {
        &self.pricing
    }

    /// Validate, price and persist a new order.
    pub async fn place_order(&self, command: PlaceOrder) -> Result<Order, OrderError> {
        let started = Instant::now();
        let result = self.try_place_order(&command).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(order) => {
                self.metrics.record_order_created(elapsed);
                tracing::info!(
                    order_id = %order.id,
                    order_number = %order.order_number,
                    owner_kind = order.owner.kind(),
                    item_count = order.items.len(),
                    total = %order.total,
                    "Order placed"
                );
            }
            Err(e) => {
                self.metrics.record_order_failure(e.kind(), elapsed);
                tracing::warn!(
                    owner_kind = command.owner.kind(),
                    kind = e.kind(),
                    error = %e,
                    "Order placement rejected"
                );
            }
        }

        result
    }

    async fn try_place_order(&self, command: &PlaceOrder) -> Result<Order, OrderError> {
        OrderDraft::validate(command)?;

        let ids: Vec<Uuid> = command.items.iter().map(|line| line.menu_item_id).collect();
        let catalog: HashMap<Uuid, MenuItem> = self
            .catalog
            .get_menu_items(&ids)
            .await?
            .into_iter()
            .map(|item| (item.id, item))
            .collect();

        let draft = OrderDraft::price(command, &catalog, &self.pricing, Utc::now())?;

        if let Some(quoted) = &command.quoted_totals {
            if !quoted.matches(&draft.totals) {
                self.metrics.total_mismatches.inc();
                tracing::warn!(
                    order_id = %draft.id,
                    quoted_total = %quoted.total,
                    computed_total = %draft.totals.total,
                    "Client total differs from catalog prices, using server amounts"
                );
            }
        }

        let draft = &draft;
        retry_on_transient(&self.retry, |attempt| {
            let number = self.numbers.next();
            async move {
                if attempt > 1 {
                    self.metrics.order_number_conflicts.inc();
                    tracing::debug!(order_number = %number, attempt, "Retrying with fresh order number");
                }
                self.orders.insert_order(draft, &number).await.map_err(OrderError::from)
            }
        })
        .await
        .into_result()
    }

    /// Move an order to a new status and notify its channel, if any.
    pub async fn set_status(&self, command: SetStatus) -> Result<Order, OrderError> {
        let mut changed = self
            .orders
            .get_order(command.order_id)
            .await?
            .ok_or(OrderError::NotFound(command.order_id))?;

        let previous = changed.transition_to(command.status, self.transitions, Utc::now())?;

        let order = match self
            .orders
            .update_status(changed.id, previous, changed.status, changed.updated_at)
            .await?
        {
            StatusUpdate::Updated(order) => order,
            StatusUpdate::NotFound => return Err(OrderError::NotFound(command.order_id)),
            StatusUpdate::Stale(actual) => {
                return Err(OrderError::Conflict(format!(
                    "order {} is now {actual}, expected {previous}",
                    command.order_id
                )));
            }
        };

        self.metrics.record_status_transition(previous.as_str(), order.status.as_str());
        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            from = %previous,
            to = %order.status,
            "Order status changed"
        );

        if let Some(channel) = &order.notification_channel {
            self.notifier.notify(channel, &order.order_number, order.status).await;
        }

        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders.list_orders(filter).await?)
    }
}
