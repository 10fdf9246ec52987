pub mod api;
pub mod cart;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use actix_web::web;

use api::{AppState, InitDataVerifier};
use config::Config;
use domain::order::OrderCommandHandler;
use messaging::{LogOnlySender, MessageSender, NotificationDispatcher, TelegramClient};
use metrics::Metrics;
use storage::{CatalogStore, IdentityStore, MemoryStore, OrderStore, PgStore};

/// Wire stores, notifier and the order handler from configuration.
pub async fn build_state(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<web::Data<AppState>> {
    let (catalog, orders, identities): (Arc<dyn CatalogStore>, Arc<dyn OrderStore>, Arc<dyn IdentityStore>) =
        match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to PostgreSQL...");
                let store = Arc::new(PgStore::connect(url, config.database_max_connections).await?);
                store.migrate().await?;
                if config.demo_admin_id.is_some() {
                    tracing::warn!("DEMO_ADMIN_ID ignored with a database; provision admins in the users table");
                }
                (
                    store.clone() as Arc<dyn CatalogStore>,
                    store.clone() as Arc<dyn OrderStore>,
                    store as Arc<dyn IdentityStore>,
                )
            }
            None => {
                let store = Arc::new(MemoryStore::new());
                storage::seed_demo_catalog(&store).await?;
                if let Some(admin_id) = &config.demo_admin_id {
                    storage::seed_admin(&store, admin_id).await;
                }
                (
                    store.clone() as Arc<dyn CatalogStore>,
                    store.clone() as Arc<dyn OrderStore>,
                    store as Arc<dyn IdentityStore>,
                )
            }
        };

    let sender: Arc<dyn MessageSender> = match &config.telegram {
        Some(telegram) => {
            tracing::info!(api_base = %telegram.api_base, "Telegram notifications enabled");
            Arc::new(TelegramClient::new(&telegram.api_base, &telegram.bot_token)?)
        }
        None => Arc::new(LogOnlySender),
    };
    let telegram_auth = match &config.telegram {
        Some(telegram) => Some(InitDataVerifier::new(&telegram.bot_token)?),
        None => {
            tracing::warn!("No bot token, Mini App orders will be refused");
            None
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(sender, metrics.clone()));

    let handler = OrderCommandHandler::new(catalog.clone(), orders, dispatcher, metrics)
        .with_pricing(config.delivery)
        .with_transitions(config.status_policy);

    tracing::info!(
        delivery_fee = %config.delivery.fee,
        free_delivery_threshold = %config.delivery.free_threshold,
        status_policy = ?config.status_policy,
        "Order core ready"
    );

    Ok(web::Data::new(AppState {
        catalog,
        identities,
        orders: Arc::new(handler),
        telegram_auth,
    }))
}
