//! Cart aggregate: the anonymous session basket, persisted cart lines and the
//! pure rules shared by both (quantity updates, snapshots, merge planning).

use std::collections::{BTreeMap, HashMap};

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::Product;
use super::errors::DomainError;

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Anonymous visitor, identified by its session key.
    Anonymous(String),
    /// Authenticated user.
    User(Uuid),
}

/// Anonymous basket stored in the visitor's session.
///
/// Keys are product ids in their string form. The map is loaded as-is from
/// the session store, so a key may point at a product that no longer exists
/// or is not even a valid id; readers skip such entries instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCart {
    lines: BTreeMap<String, i32>,
}

impl SessionCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn quantity_of(&self, product_id: Uuid) -> Option<i32> {
        self.lines.get(&product_id.to_string()).copied()
    }

    /// Raw entries, stale ones included.
    pub fn entries(&self) -> impl Iterator<Item = (&str, i32)> {
        self.lines.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Entries whose key parses as a product id and whose quantity is positive.
    pub fn resolvable(&self) -> impl Iterator<Item = (Uuid, i32)> + '_ {
        self.lines.iter().filter_map(|(k, v)| {
            let id = Uuid::parse_str(k).ok()?;
            (*v >= 1).then_some((id, *v))
        })
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.resolvable().map(|(id, _)| id).collect()
    }

    pub fn add(&mut self, product_id: Uuid) -> i32 {
        let quantity = self.lines.entry(product_id.to_string()).or_insert(0);
        *quantity = quantity.saturating_add(1).max(1);
        *quantity
    }

    pub fn remove(&mut self, product_id: Uuid) -> bool {
        self.lines.remove(&product_id.to_string()).is_some()
    }

    pub fn apply(&mut self, product_id: Uuid, update: QuantityUpdate) -> LineUpdate {
        let key = product_id.to_string();
        let Some(current) = self.lines.get(&key).copied() else {
            return LineUpdate::Missing;
        };

        match update.resolve(current) {
            Some(quantity) => {
                self.lines.insert(key, quantity);
                LineUpdate::Updated(quantity)
            }
            None => {
                self.lines.remove(&key);
                LineUpdate::Removed
            }
        }
    }
}

/// A requested change to the quantity of an existing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    Increment,
    Decrement,
    Set(i32),
}

impl QuantityUpdate {
    /// Parses the `action` / `quantity` pair submitted by the cart form.
    ///
    /// A recognised action wins over the quantity field.
    pub fn parse(action: Option<&str>, quantity: Option<&str>) -> Result<Self, DomainError> {
        match action.map(str::trim) {
            Some("inc" | "increment") => return Ok(Self::Increment),
            Some("dec" | "decrement") => return Ok(Self::Decrement),
            _ => {}
        }

        let raw = quantity.unwrap_or_default();
        raw.trim()
            .parse::<i32>()
            .map(Self::Set)
            .map_err(|_| DomainError::InvalidQuantity(raw.to_string()))
    }

    /// Quantity after applying the update to `current`; `None` means the
    /// line must be deleted.
    pub fn resolve(self, current: i32) -> Option<i32> {
        let next = match self {
            Self::Increment => current.saturating_add(1),
            Self::Decrement => current - 1,
            Self::Set(value) => value,
        };
        (next >= 1).then_some(next)
    }
}

/// Outcome of a quantity change on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineUpdate {
    Updated(i32),
    Removed,
    /// No such line; nothing changed.
    Missing,
}

/// One priced line of a cart snapshot.
///
/// `item_id` is the cart row id for persisted carts and the product id for
/// session carts, i.e. the reference the caller passes back to mutate it.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item_id: Uuid,
    pub product: Product,
    pub quantity: i32,
    pub line_total: BigDecimal,
}

impl CartLine {
    pub fn new(item_id: Uuid, product: Product, quantity: i32) -> Self {
        let line_total = &product.price * BigDecimal::from(quantity);
        Self {
            item_id,
            product,
            quantity,
            line_total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub subtotal: BigDecimal,
}

impl CartSnapshot {
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let subtotal = lines
            .iter()
            .fold(BigDecimal::zero(), |acc, line| acc + &line.line_total);
        Self { lines, subtotal }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

fn index_products(products: &[Product]) -> HashMap<Uuid, &Product> {
    products.iter().map(|p| (p.id, p)).collect()
}

/// Prices a session cart against the catalog, skipping missing or inactive
/// products.
pub fn session_snapshot(cart: &SessionCart, products: &[Product]) -> CartSnapshot {
    let by_id = index_products(products);
    let lines = cart
        .resolvable()
        .filter_map(|(id, quantity)| {
            let product = by_id.get(&id).filter(|p| p.is_available())?;
            Some(CartLine::new(id, (*product).clone(), quantity))
        })
        .collect();
    CartSnapshot::from_lines(lines)
}

/// Lines of a session cart that can be merged into a persisted cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergePlan {
    pub lines: Vec<(Uuid, i32)>,
    pub skipped: usize,
}

pub fn plan_merge(cart: &SessionCart, products: &[Product]) -> MergePlan {
    let by_id = index_products(products);
    let mut plan = MergePlan::default();
    for (key, quantity) in cart.entries() {
        let resolved = Uuid::parse_str(key)
            .ok()
            .filter(|id| quantity >= 1 && by_id.get(id).is_some_and(|p| p.is_available()));
        match resolved {
            Some(id) => plan.lines.push((id, quantity)),
            None => {
                log::debug!("skipping stale session cart entry {key}");
                plan.skipped += 1;
            }
        }
    }
    plan
}

/// Result of draining a session cart into a user's persisted cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub merged: usize,
    pub skipped: usize,
}
