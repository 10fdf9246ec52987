use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use super::auth::{authenticate, require_admin, verify_init_data};
use super::error::ApiError;
use super::payloads::{OrderListQuery, PlaceOrderRequest, StatusRequest, TelegramOrderRequest};
use super::server::AppState;
use crate::domain::identity::Identity;
use crate::domain::order::{Order, OrderFilter, Owner, SetStatus};

fn can_view(identity: &Identity, order: &Order) -> bool {
    if identity.is_admin || order.owner.is_account(&identity.id) {
        return true;
    }
    matches!(
        (&order.owner, &identity.telegram_user_id),
        (Owner::Channel(owner), Some(linked)) if owner == linked
    )
}

/// Admins see every order (optionally by status); everyone else sees their
/// own, including Mini App orders from their linked Telegram id.
pub async fn list_orders(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, ApiError> {
    let identity = authenticate(&req, state.identities.as_ref()).await?;

    let filter = if identity.is_admin {
        OrderFilter::default()
    } else {
        OrderFilter::visible_to(&identity.id, identity.telegram_user_id.as_deref())
    };
    let filter = filter.with_status(query.parse()?);

    let orders = state.orders.list_orders(&filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

pub async fn get_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let identity = authenticate(&req, state.identities.as_ref()).await?;
    let order = state.orders.get_order(path.into_inner()).await?;

    if !can_view(&identity, &order) {
        return Err(ApiError::Authorization("Access denied".to_string()));
    }
    Ok(HttpResponse::Ok().json(order))
}

pub async fn place_order(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let identity = authenticate(&req, state.identities.as_ref()).await?;
    let command = body
        .into_inner()
        .into_command(&identity.id, identity.telegram_user_id.clone())?;

    let order = state.orders.place_order(command).await?;
    Ok(HttpResponse::Created().json(order))
}

/// Orders from the Telegram Mini App, owned by the Telegram user who signed
/// `initData`.
pub async fn place_telegram_order(
    state: web::Data<AppState>,
    body: web::Json<TelegramOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let telegram_user_id = verify_init_data(state.telegram_auth.as_ref(), &body.init_data)?;
    let command = body.into_command(telegram_user_id)?;
    let order = state.orders.place_order(command).await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn set_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<StatusRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, state.identities.as_ref()).await?;
    let command = SetStatus {
        order_id: path.into_inner(),
        status: body.parse()?,
    };

    tracing::debug!(order_id = %command.order_id, status = %command.status, admin = %admin.id, "Status change requested");
    let order = state.orders.set_status(command).await?;
    Ok(HttpResponse::Ok().json(order))
}
