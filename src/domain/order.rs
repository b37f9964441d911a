use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::cart::{CartLine, CartSnapshot};
use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Orders move forward one step at a time; they can be cancelled until
    /// they ship. Delivered and cancelled are terminal.
    pub fn can_transition_to(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Processing, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::InvalidInput(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// Address and phone frozen onto an order when it is placed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShippingDetails {
    pub address: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct OrderItemDraft {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

/// Everything needed to insert an order, computed from the cart at
/// checkout time with the live catalog prices.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub total_price: BigDecimal,
    pub shipping: ShippingDetails,
    pub items: Vec<OrderItemDraft>,
}

pub fn draft_order(lines: Vec<CartLine>, shipping: ShippingDetails) -> Result<OrderDraft, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::EmptyCart);
    }
    if let Some(line) = lines.iter().find(|l| !l.product.is_available()) {
        return Err(DomainError::ProductUnavailable(line.product.id));
    }

    let snapshot = CartSnapshot::from_lines(lines);
    let items = snapshot
        .lines
        .into_iter()
        .map(|line| OrderItemDraft {
            product_id: line.product.id,
            product_name: line.product.name,
            quantity: line.quantity,
            price: line.product.price,
        })
        .collect();

    Ok(OrderDraft {
        total_price: snapshot.subtotal,
        shipping,
        items,
    })
}

#[derive(Debug, Clone)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_price: BigDecimal,
    pub status: OrderStatus,
    pub shipping_address: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
}
