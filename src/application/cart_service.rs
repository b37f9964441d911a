use uuid::Uuid;

use crate::domain::cart::{
    session_snapshot, CartSnapshot, LineUpdate, QuantityUpdate, SessionCart,
};
use crate::domain::catalog::Product;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogRepository};

/// The cart an operation applies to.
///
/// Session carts are plain values: the caller loads them from the session
/// store, passes them in, and persists the [`CartUpdate::session`] it gets
/// back.
#[derive(Debug, Clone, Copy)]
pub enum CartTarget<'a> {
    Session(&'a SessionCart),
    User(Uuid),
}

/// Result of a cart mutation, plus the new session cart when the target was
/// a session.
#[derive(Debug, Clone)]
pub struct CartUpdate<T> {
    pub result: T,
    pub session: Option<SessionCart>,
}

impl<T> CartUpdate<T> {
    fn persisted(result: T) -> Self {
        Self {
            result,
            session: None,
        }
    }

    fn session(result: T, cart: SessionCart) -> Self {
        Self {
            result,
            session: Some(cart),
        }
    }
}

pub struct CartService<C, P> {
    carts: C,
    catalog: P,
}

impl<C: CartRepository, P: CatalogRepository> CartService<C, P> {
    pub fn new(carts: C, catalog: P) -> Self {
        Self { carts, catalog }
    }

    fn available_product(&self, product_id: Uuid) -> Result<Product, DomainError> {
        self.catalog
            .find_product(product_id)?
            .filter(Product::is_available)
            .ok_or(DomainError::ProductUnavailable(product_id))
    }

    /// Puts one more unit of the product in the cart and returns the line's
    /// new quantity.
    pub fn add(&self, target: CartTarget<'_>, product_id: Uuid) -> Result<CartUpdate<i32>, DomainError> {
        let product = self.available_product(product_id)?;

        match target {
            CartTarget::User(user_id) => {
                let quantity = self.carts.add(user_id, product.id, 1)?;
                Ok(CartUpdate::persisted(quantity))
            }
            CartTarget::Session(cart) => {
                let mut cart = cart.clone();
                let quantity = cart.add(product.id);
                Ok(CartUpdate::session(quantity, cart))
            }
        }
    }

    /// Deletes the line whatever its quantity. Returns whether it existed.
    pub fn remove(&self, target: CartTarget<'_>, item_id: Uuid) -> Result<CartUpdate<bool>, DomainError> {
        match target {
            CartTarget::User(user_id) => {
                let removed = self.carts.remove(user_id, item_id)?;
                Ok(CartUpdate::persisted(removed))
            }
            CartTarget::Session(cart) => {
                let mut cart = cart.clone();
                let removed = cart.remove(item_id);
                Ok(CartUpdate::session(removed, cart))
            }
        }
    }

    pub fn set_quantity(
        &self,
        target: CartTarget<'_>,
        item_id: Uuid,
        update: QuantityUpdate,
    ) -> Result<CartUpdate<LineUpdate>, DomainError> {
        match target {
            CartTarget::User(user_id) => {
                let outcome = self.carts.update_quantity(user_id, item_id, update)?;
                Ok(CartUpdate::persisted(outcome))
            }
            CartTarget::Session(cart) => {
                let mut cart = cart.clone();
                let outcome = cart.apply(item_id, update);
                Ok(CartUpdate::session(outcome, cart))
            }
        }
    }

    pub fn snapshot(&self, target: CartTarget<'_>) -> Result<CartSnapshot, DomainError> {
        match target {
            CartTarget::User(user_id) => Ok(CartSnapshot::from_lines(self.carts.lines(user_id)?)),
            CartTarget::Session(cart) => {
                let products = self.catalog.find_products(&cart.product_ids())?;
                Ok(session_snapshot(cart, &products))
            }
        }
    }
}
