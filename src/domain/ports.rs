use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::cart::{CartLine, LineUpdate, MergeReport, QuantityUpdate, SessionCart};
use super::catalog::{Category, NewCategory, NewProduct, Product, ProductFilter, ProductPage};
use super::errors::DomainError;
use super::order::{OrderStatus, OrderView};
use super::user::{NewUser, UserView};

pub trait CatalogRepository: Send + Sync + 'static {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    /// Products with the given ids; unknown ids are left out.
    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
    /// Active products, newest first.
    fn list_products(
        &self,
        filter: &ProductFilter,
        page: i64,
        limit: i64,
    ) -> Result<ProductPage, DomainError>;
    fn list_categories(&self) -> Result<Vec<Category>, DomainError>;
    fn create_category(&self, category: NewCategory) -> Result<Category, DomainError>;
    fn create_product(&self, product: NewProduct) -> Result<Product, DomainError>;
    fn update_price(&self, id: Uuid, price: BigDecimal) -> Result<Product, DomainError>;
    fn set_active(&self, id: Uuid, is_active: bool) -> Result<Product, DomainError>;
}

/// Storage for anonymous session carts.
pub trait SessionCartRepository: Send + Sync + 'static {
    /// The stored cart, or an empty one for an unknown session.
    fn load(&self, session_key: &str) -> Result<SessionCart, DomainError>;
    /// Runs `change` on the stored cart while holding the session's lock and
    /// stores the cart it hands back, if any. Merges of the same session wait
    /// for it, so a drained cart is never written back.
    fn update<T, F>(&self, session_key: &str, change: F) -> Result<T, DomainError>
    where
        F: FnOnce(&SessionCart) -> Result<(T, Option<SessionCart>), DomainError>;
}

/// Persisted per-user cart lines.
///
/// Quantity changes are single read-modify-write statements so that
/// concurrent requests on the same line never lose an update.
pub trait CartRepository: Send + Sync + 'static {
    /// Adds `quantity` to the user's line for `product_id`, creating it if
    /// needed, and returns the resulting quantity.
    fn add(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<i32, DomainError>;
    /// Returns whether a line was deleted.
    fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, DomainError>;
    fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        update: QuantityUpdate,
    ) -> Result<LineUpdate, DomainError>;
    /// The user's lines with their current product, oldest first.
    fn lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, DomainError>;
    /// Drains the session cart into the user's cart in one transaction.
    fn merge_session(&self, session_key: &str, user_id: Uuid) -> Result<MergeReport, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Converts the user's cart into an order and empties the cart, all in
    /// one transaction.
    fn checkout(&self, user_id: Uuid) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError>;
}

pub trait UserRepository: Send + Sync + 'static {
    /// Creates the user and its profile together.
    fn create(&self, user: NewUser) -> Result<UserView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError>;
}
