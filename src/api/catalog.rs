use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;

use super::auth::require_admin;
use super::error::ApiError;
use super::payloads::{CategoryRequest, MenuItemPatchRequest, MenuItemRequest, MenuQuery};
use super::server::AppState;

pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let categories = state.catalog.list_categories().await?;
    Ok(HttpResponse::Ok().json(categories))
}

pub async fn create_category(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, state.identities.as_ref()).await?;
    let category = state.catalog.create_category(body.into_inner().validate()?).await?;

    tracing::info!(category_id = %category.id, slug = %category.slug, admin = %admin.id, "Category created");
    Ok(HttpResponse::Created().json(category))
}

pub async fn list_menu(state: web::Data<AppState>, query: web::Query<MenuQuery>) -> Result<HttpResponse, ApiError> {
    let items = state.catalog.list_menu_items(query.category_id).await?;
    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_menu_item(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    match state.catalog.get_menu_item(id).await? {
        Some(item) => Ok(HttpResponse::Ok().json(item)),
        None => Err(ApiError::NotFound(format!("Menu item not found: {id}"))),
    }
}

pub async fn create_menu_item(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<MenuItemRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, state.identities.as_ref()).await?;
    let item = state.catalog.create_menu_item(body.into_inner().validate()?).await?;

    tracing::info!(menu_item_id = %item.id, price = %item.price, admin = %admin.id, "Menu item created");
    Ok(HttpResponse::Created().json(item))
}

pub async fn update_menu_item(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<MenuItemPatchRequest>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, state.identities.as_ref()).await?;
    let id = path.into_inner();
    let patch = body.into_inner().validate()?;

    match state.catalog.update_menu_item(id, patch).await? {
        Some(item) => {
            tracing::info!(menu_item_id = %id, price = %item.price, active = item.is_active, admin = %admin.id, "Menu item updated");
            Ok(HttpResponse::Ok().json(item))
        }
        None => Err(ApiError::NotFound(format!("Menu item not found: {id}"))),
    }
}

/// Soft delete: the item leaves the menu but stays resolvable for old orders.
pub async fn delete_menu_item(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&req, state.identities.as_ref()).await?;
    let id = path.into_inner();

    if !state.catalog.deactivate_menu_item(id).await? {
        return Err(ApiError::NotFound(format!("Menu item not found: {id}")));
    }

    tracing::info!(menu_item_id = %id, admin = %admin.id, "Menu item deactivated");
    Ok(HttpResponse::NoContent().finish())
}
