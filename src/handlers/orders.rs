use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderItemView, OrderStatus, OrderView};
use crate::domain::user::Role;
use crate::errors::AppError;
use crate::state::AppState;

use super::user_id;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Unit price captured at checkout, e.g. "9.99"
    pub price: String,
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(item: OrderItemView) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name,
            quantity: item.quantity,
            price: item.price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total_price: String,
    pub shipping_address: String,
    pub phone: String,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status.to_string(),
            total_price: order.total_price.to_string(),
            shipping_address: order.shipping_address,
            phone: order.phone,
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            items: order.items.into_iter().map(OrderItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// One of `pending`, `processing`, `shipped`, `delivered`, `cancelled`.
    pub status: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /checkout
///
/// Turns the caller's cart into a pending order and empties the cart, in a
/// single database transaction.
#[utoipa::path(
    post,
    path = "/checkout",
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 401, description = "Caller is not signed in"),
        (status = 404, description = "A cart line refers to an inactive product"),
        (status = 409, description = "Cart is empty"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn checkout(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let user_id = user_id(&req)?;

    let order = web::block(move || state.checkout.checkout(user_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order with its items", body = OrderResponse),
        (status = 401, description = "Caller is not signed in"),
        (status = 404, description = "Order not found for this caller"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let user_id = user_id(&req)?;
    let id = path.into_inner();

    let order = web::block(move || state.checkout.get_order(user_id, id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/status
///
/// Staff only.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order after the change", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Caller is not signed in"),
        (status = 403, description = "Caller is not staff"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed from the current status"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let caller = user_id(&req)?;
    let id = path.into_inner();
    let status: OrderStatus = body.status.trim().parse()?;

    let order = web::block(move || {
        let role = match state.users.get_user(caller) {
            Ok(user) => user.role,
            Err(DomainError::NotFound) => return Err(AppError::Unauthorized),
            Err(e) => return Err(e.into()),
        };
        if role != Role::Staff {
            return Err(AppError::Forbidden);
        }
        state.checkout.update_status(id, status).map_err(AppError::from)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
