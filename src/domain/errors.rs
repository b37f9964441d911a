use thiserror::Error;
use uuid::Uuid;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Product {0} is unavailable")]
    ProductUnavailable(Uuid),
    #[error("Invalid quantity: {0:?}")]
    InvalidQuantity(String),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Internal error: {0}")]
    Internal(String),
}
