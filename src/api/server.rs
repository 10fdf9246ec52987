use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};

use super::error::ApiError;
use super::telegram_auth::InitDataVerifier;
use super::{catalog, orders};
use crate::domain::order::OrderCommandHandler;
use crate::metrics::health_handler;
use crate::storage::{CatalogStore, IdentityStore};

/// Shared handles for every request handler.
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub identities: Arc<dyn IdentityStore>,
    pub orders: Arc<OrderCommandHandler>,
    /// `None` when no bot token is configured; Mini App orders are refused.
    pub telegram_auth: Option<InitDataVerifier>,
}

/// Route table plus extractor configs that turn malformed input into
/// `validation` errors instead of actix's plain-text defaults.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(64 * 1024)
            .error_handler(|err, _| ApiError::Validation(err.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, _| ApiError::Validation(err.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|err, _| ApiError::Validation(err.to_string()).into()))
    .route("/health", web::get().to(health_handler))
    .service(
        web::scope("/api")
            .service(
                web::resource("/categories")
                    .route(web::get().to(catalog::list_categories))
                    .route(web::post().to(catalog::create_category)),
            )
            .service(
                web::resource("/menu")
                    .route(web::get().to(catalog::list_menu))
                    .route(web::post().to(catalog::create_menu_item)),
            )
            .service(
                web::resource("/menu/{id}")
                    .route(web::get().to(catalog::get_menu_item))
                    .route(web::put().to(catalog::update_menu_item))
                    .route(web::delete().to(catalog::delete_menu_item)),
            )
            .service(
                web::resource("/orders")
                    .route(web::get().to(orders::list_orders))
                    .route(web::post().to(orders::place_order)),
            )
            .service(web::resource("/orders/telegram").route(web::post().to(orders::place_telegram_order)))
            .service(web::resource("/orders/{id}").route(web::get().to(orders::get_order)))
            .service(web::resource("/orders/{id}/status").route(web::put().to(orders::set_status))),
    );
}

pub async fn start_api_server(state: web::Data<AppState>, host: String, port: u16) -> std::io::Result<()> {
    tracing::info!("🍔 Starting API server on http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
