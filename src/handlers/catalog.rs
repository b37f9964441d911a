use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::catalog::{page_window, Category, Product, ProductFilter};
use crate::errors::AppError;
use crate::state::AppState;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub stock: i32,
    pub created_at: String,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id,
            seller_id: p.seller_id,
            category_id: p.category_id,
            name: p.name,
            description: p.description,
            price: p.price.to_string(),
            stock: p.stock,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            description: c.description,
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Only products of this category.
    pub category: Option<Uuid>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListProductsResponse {
    pub items: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /products
///
/// Active products, newest first.
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Paginated list of active products", body = ListProductsResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let (page, limit, _) = page_window(params.page, params.limit);
    let filter = ProductFilter {
        category_id: params.category,
    };

    let result = web::block(move || state.catalog.list_products(&filter, page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListProductsResponse {
        items: result.items.into_iter().map(ProductResponse::from).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found or inactive"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let product = web::block(move || state.catalog.get_product(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// GET /categories
#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Active categories by name", body = [CategoryResponse]),
        (status = 500, description = "Internal server error"),
    ),
    tag = "catalog"
)]
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let categories = web::block(move || state.catalog.list_categories())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<CategoryResponse> = categories.into_iter().map(CategoryResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
