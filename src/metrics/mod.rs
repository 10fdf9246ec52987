mod server;

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

pub use server::{health_handler, start_metrics_server};

use crate::utils::CircuitState;

// ============================================================================
// Metrics Module - Prometheus metrics for the ordering backend
// ============================================================================
//
// Covers:
// - Order placement (created, failures by kind, latency)
// - Order number collisions and client total mismatches
// - Status transitions by from/to label
// - Telegram notifications and the transport's circuit breaker
//
// Scraped from /metrics on the metrics port.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Order placement
    pub orders_created: IntCounter,
    pub order_failures: IntCounterVec,
    pub order_creation_duration: Histogram,
    pub order_number_conflicts: IntCounter,
    pub total_mismatches: IntCounter,

    // Status lifecycle
    pub status_transitions: IntCounterVec,

    // Notifications
    pub notifications_sent: IntCounter,
    pub notifications_failed: IntCounterVec,
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_created = IntCounter::new("orders_created_total", "Orders persisted")?;
        registry.register(Box::new(orders_created.clone()))?;

        let order_failures = IntCounterVec::new(
            Opts::new("order_creation_failures_total", "Order placements that failed"),
            &["kind"],
        )?;
        registry.register(Box::new(order_failures.clone()))?;

        let order_creation_duration = Histogram::with_opts(
            HistogramOpts::new("order_creation_duration_seconds", "Order placement duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;
        registry.register(Box::new(order_creation_duration.clone()))?;

        let order_number_conflicts = IntCounter::new(
            "order_number_conflicts_total",
            "Order number collisions resolved by retrying",
        )?;
        registry.register(Box::new(order_number_conflicts.clone()))?;

        let total_mismatches = IntCounter::new(
            "order_total_mismatches_total",
            "Client-quoted totals that disagreed with the server computation",
        )?;
        registry.register(Box::new(total_mismatches.clone()))?;

        let status_transitions = IntCounterVec::new(
            Opts::new("order_status_transitions_total", "Applied order status changes"),
            &["from", "to"],
        )?;
        registry.register(Box::new(status_transitions.clone()))?;

        let notifications_sent = IntCounter::new("notifications_sent_total", "Status notifications delivered")?;
        registry.register(Box::new(notifications_sent.clone()))?;

        let notifications_failed = IntCounterVec::new(
            Opts::new("notifications_failed_total", "Status notifications that could not be delivered"),
            &["reason"],
        )?;
        registry.register(Box::new(notifications_failed.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "telegram_circuit_breaker_state",
            "Telegram circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            orders_created,
            order_failures,
            order_creation_duration,
            order_number_conflicts,
            total_mismatches,
            status_transitions,
            notifications_sent,
            notifications_failed,
            circuit_breaker_state,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_order_created(&self, duration_secs: f64) {
        self.orders_created.inc();
        self.order_creation_duration.observe(duration_secs);
    }

    pub fn record_order_failure(&self, kind: &str, duration_secs: f64) {
        self.order_failures.with_label_values(&[kind]).inc();
        self.order_creation_duration.observe(duration_secs);
    }

    pub fn record_status_transition(&self, from: &str, to: &str) {
        self.status_transitions.with_label_values(&[from, to]).inc();
    }

    pub fn record_notification(&self, outcome: Result<(), &str>) {
        match outcome {
            Ok(()) => self.notifications_sent.inc(),
            Err(reason) => self.notifications_failed.with_label_values(&[reason]).inc(),
        }
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        let value = match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        self.circuit_breaker_state.set(value);
    }
}
