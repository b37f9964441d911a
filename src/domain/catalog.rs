use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Only active products may be put in a cart or ordered.
    pub fn is_available(&self) -> bool {
        self.is_active
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total: i64,
}

pub const MAX_PAGE_SIZE: i64 = 100;

/// Normalises 1-based paging input, returning `(page, limit, offset)`.
pub fn page_window(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}
