use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::{CartTarget, CartUpdate};
use crate::domain::cart::{CartLine, CartSnapshot, Identity, LineUpdate, QuantityUpdate};
use crate::domain::errors::DomainError;
use crate::domain::ports::SessionCartRepository;
use crate::errors::AppError;
use crate::state::AppState;

use super::identity;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    /// Reference to pass back to update or remove the line.
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: String,
    pub quantity: i32,
    pub line_total: String,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            item_id: line.item_id,
            product_id: line.product.id,
            name: line.product.name,
            unit_price: line.product.price.to_string(),
            quantity: line.quantity,
            line_total: line.line_total.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub lines: Vec<CartLineResponse>,
    pub line_count: usize,
    pub subtotal: String,
}

impl From<CartSnapshot> for CartResponse {
    fn from(snapshot: CartSnapshot) -> Self {
        Self {
            line_count: snapshot.line_count(),
            subtotal: snapshot.subtotal.to_string(),
            lines: snapshot.lines.into_iter().map(CartLineResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddToCartResponse {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemoveFromCartResponse {
    pub removed: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    /// `inc` or `dec`; takes precedence over `quantity`.
    pub action: Option<String>,
    /// New absolute quantity as text; zero or less removes the line.
    pub quantity: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UpdateCartItemResponse {
    /// One of `updated`, `removed`, `missing`.
    pub outcome: String,
    pub quantity: Option<i32>,
}

impl From<LineUpdate> for UpdateCartItemResponse {
    fn from(update: LineUpdate) -> Self {
        match update {
            LineUpdate::Updated(q) => Self {
                outcome: "updated".to_string(),
                quantity: Some(q),
            },
            LineUpdate::Removed => Self {
                outcome: "removed".to_string(),
                quantity: None,
            },
            LineUpdate::Missing => Self {
                outcome: "missing".to_string(),
                quantity: None,
            },
        }
    }
}

// ── Session plumbing ─────────────────────────────────────────────────────────

/// Runs a cart mutation for the caller. For anonymous callers the session
/// cart is read, changed and written back under the session's lock.
async fn mutate<T, F>(
    state: web::Data<AppState>,
    identity: Identity,
    op: F,
) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&AppState, CartTarget<'_>) -> Result<CartUpdate<T>, DomainError> + Send + 'static,
{
    web::block(move || -> Result<T, DomainError> {
        let state = state.get_ref();
        match identity {
            Identity::User(user_id) => Ok(op(state, CartTarget::User(user_id))?.result),
            Identity::Anonymous(key) => state.sessions.update(&key, |cart| {
                let update = op(state, CartTarget::Session(cart))?;
                Ok((update.result, update.session))
            }),
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(AppError::from)
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Current cart with line totals and subtotal", body = CartResponse),
        (status = 401, description = "No caller identity"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn get_cart(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse, AppError> {
    let identity = identity(&req)?;

    let snapshot = web::block(move || match identity {
        Identity::User(user_id) => state.carts.snapshot(CartTarget::User(user_id)),
        Identity::Anonymous(key) => {
            let cart = state.sessions.load(&key)?;
            state.carts.snapshot(CartTarget::Session(&cart))
        }
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(snapshot)))
}

/// POST /cart/items/{product_id}
///
/// Adds one unit of the product, creating the line if needed.
#[utoipa::path(
    post,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Line quantity after the add", body = AddToCartResponse),
        (status = 401, description = "No caller identity"),
        (status = 404, description = "Product missing or inactive"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let identity = identity(&req)?;
    let product_id = path.into_inner();

    let quantity = mutate(state, identity, move |s, target| {
        s.carts.add(target, product_id)
    })
    .await?;

    Ok(HttpResponse::Ok().json(AddToCartResponse {
        product_id,
        quantity,
    }))
}

/// DELETE /cart/items/{item_id}
///
/// `item_id` is the cart line id for signed-in users and the product id for
/// anonymous sessions. Removing an absent line is not an error.
#[utoipa::path(
    delete,
    path = "/cart/items/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart line reference"),
    ),
    responses(
        (status = 200, description = "Whether a line was removed", body = RemoveFromCartResponse),
        (status = 401, description = "No caller identity"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn remove_from_cart(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let identity = identity(&req)?;
    let item_id = path.into_inner();

    let removed = mutate(state, identity, move |s, target| s.carts.remove(target, item_id)).await?;

    Ok(HttpResponse::Ok().json(RemoveFromCartResponse { removed }))
}

/// PATCH /cart/items/{item_id}
#[utoipa::path(
    patch,
    path = "/cart/items/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart line reference"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Outcome of the change", body = UpdateCartItemResponse),
        (status = 400, description = "Quantity is not a number"),
        (status = 401, description = "No caller identity"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "cart"
)]
pub async fn update_cart_item(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    let identity = identity(&req)?;
    let item_id = path.into_inner();
    let body = body.into_inner();
    let update = QuantityUpdate::parse(body.action.as_deref(), body.quantity.as_deref())?;

    let outcome = mutate(state, identity, move |s, target| {
        s.carts.set_quantity(target, item_id, update)
    })
    .await?;

    Ok(HttpResponse::Ok().json(UpdateCartItemResponse::from(outcome)))
}
