use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{
    plan_merge, CartLine, LineUpdate, MergeReport, QuantityUpdate, SessionCart,
};
use crate::domain::catalog::Product;
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, SessionCartRepository};
use crate::schema::{cart_items, cart_sessions, products};

use super::models::{CartItemRow, CartSessionRow, NewCartItemRow, ProductRow};

/// Adds `quantity` to the (user, product) line in a single upsert statement.
fn upsert_line(
    conn: &mut PgConnection,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> QueryResult<i32> {
    diesel::insert_into(cart_items::table)
        .values(&NewCartItemRow {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
        })
        .on_conflict((cart_items::user_id, cart_items::product_id))
        .do_update()
        .set(cart_items::quantity.eq(cart_items::quantity + excluded(cart_items::quantity)))
        .returning(cart_items::quantity)
        .get_result(conn)
}

/// The user's lines joined with their current product row, oldest first.
pub(super) fn load_lines(conn: &mut PgConnection, user_id: Uuid) -> QueryResult<Vec<CartLine>> {
    let rows: Vec<(CartItemRow, ProductRow)> = cart_items::table
        .inner_join(products::table)
        .filter(cart_items::user_id.eq(user_id))
        .order((cart_items::added_at.asc(), cart_items::id.asc()))
        .select((CartItemRow::as_select(), ProductRow::as_select()))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(item, product)| CartLine::new(item.id, product.into(), item.quantity))
        .collect())
}

fn decode_session(session_key: &str, stored: Value) -> SessionCart {
    serde_json::from_value(stored).unwrap_or_else(|e| {
        log::warn!("discarding unreadable cart of session {session_key}: {e}");
        SessionCart::new()
    })
}

fn write_session(conn: &mut PgConnection, session_key: &str, cart: &SessionCart) -> Result<(), DomainError> {
    let payload =
        serde_json::to_value(cart).map_err(|e| DomainError::Internal(e.to_string()))?;

    diesel::insert_into(cart_sessions::table)
        .values(&CartSessionRow {
            session_key: session_key.to_string(),
            cart: payload,
            updated_at: Utc::now(),
        })
        .on_conflict(cart_sessions::session_key)
        .do_update()
        .set((
            cart_sessions::cart.eq(excluded(cart_sessions::cart)),
            cart_sessions::updated_at.eq(excluded(cart_sessions::updated_at)),
        ))
        .execute(conn)?;

    Ok(())
}

// ── Persisted carts ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn add(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<i32, DomainError> {
        if quantity < 1 {
            return Err(DomainError::InvalidQuantity(quantity.to_string()));
        }
        let mut conn = self.pool.get()?;

        Ok(upsert_line(&mut conn, user_id, product_id, quantity)?)
    }

    fn remove(&self, user_id: Uuid, item_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::id.eq(item_id))
                .filter(cart_items::user_id.eq(user_id)),
        )
        .execute(&mut conn)?;

        Ok(deleted > 0)
    }

    fn update_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        update: QuantityUpdate,
    ) -> Result<LineUpdate, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let line = || {
                cart_items::table
                    .filter(cart_items::id.eq(item_id))
                    .filter(cart_items::user_id.eq(user_id))
            };
            let updated = |q: Option<i32>| q.map_or(LineUpdate::Missing, LineUpdate::Updated);
            let removed = |n: usize| if n > 0 { LineUpdate::Removed } else { LineUpdate::Missing };

            let outcome = match update {
                QuantityUpdate::Increment => updated(
                    diesel::update(line())
                        .set(cart_items::quantity.eq(cart_items::quantity + 1))
                        .returning(cart_items::quantity)
                        .get_result(conn)
                        .optional()?,
                ),
                QuantityUpdate::Decrement => {
                    let reduced = diesel::update(line().filter(cart_items::quantity.gt(1)))
                        .set(cart_items::quantity.eq(cart_items::quantity - 1))
                        .returning(cart_items::quantity)
                        .get_result(conn)
                        .optional()?;
                    match reduced {
                        Some(quantity) => LineUpdate::Updated(quantity),
                        None => removed(
                            diesel::delete(line().filter(cart_items::quantity.le(1)))
                                .execute(conn)?,
                        ),
                    }
                }
                QuantityUpdate::Set(quantity) if quantity >= 1 => updated(
                    diesel::update(line())
                        .set(cart_items::quantity.eq(quantity))
                        .returning(cart_items::quantity)
                        .get_result(conn)
                        .optional()?,
                ),
                QuantityUpdate::Set(_) => removed(diesel::delete(line()).execute(conn)?),
            };

            Ok(outcome)
        })
    }

    fn lines(&self, user_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let mut conn = self.pool.get()?;

        Ok(load_lines(&mut conn, user_id)?)
    }

    fn merge_session(&self, session_key: &str, user_id: Uuid) -> Result<MergeReport, DomainError> {
        let mut conn = self.pool.get()?;

        let report = conn.transaction::<_, DomainError, _>(|conn| {
            // Locking the session row makes a concurrent duplicate merge wait
            // for this one and then see the drained cart.
            let stored: Option<Value> = cart_sessions::table
                .find(session_key)
                .select(cart_sessions::cart)
                .for_update()
                .first(conn)
                .optional()?;

            let Some(stored) = stored else {
                return Ok(MergeReport::default());
            };
            let cart = decode_session(session_key, stored);

            let products: Vec<Product> = products::table
                .filter(products::id.eq_any(cart.product_ids()))
                .select(ProductRow::as_select())
                .load::<ProductRow>(conn)?
                .into_iter()
                .map(Product::from)
                .collect();

            let plan = plan_merge(&cart, &products);
            for &(product_id, quantity) in &plan.lines {
                upsert_line(conn, user_id, product_id, quantity)?;
            }

            write_session(conn, session_key, &SessionCart::new())?;

            Ok(MergeReport {
                merged: plan.lines.len(),
                skipped: plan.skipped,
            })
        })?;

        log::info!(
            "merged session cart into user {user_id}: {} line(s) merged, {} skipped",
            report.merged,
            report.skipped
        );

        Ok(report)
    }
}

// ── Session carts ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselSessionCartRepository {
    pool: DbPool,
}

impl DieselSessionCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SessionCartRepository for DieselSessionCartRepository {
    fn load(&self, session_key: &str) -> Result<SessionCart, DomainError> {
        let mut conn = self.pool.get()?;

        let stored: Option<Value> = cart_sessions::table
            .find(session_key)
            .select(cart_sessions::cart)
            .first(&mut conn)
            .optional()?;

        Ok(stored
            .map(|value| decode_session(session_key, value))
            .unwrap_or_default())
    }

    fn update<T, F>(&self, session_key: &str, change: F) -> Result<T, DomainError>
    where
        F: FnOnce(&SessionCart) -> Result<(T, Option<SessionCart>), DomainError>,
    {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // A missing session gets an empty row first so there is always a
            // row to lock; merge_session locks the same row.
            diesel::insert_into(cart_sessions::table)
                .values(&CartSessionRow {
                    session_key: session_key.to_string(),
                    cart: Value::Object(Default::default()),
                    updated_at: Utc::now(),
                })
                .on_conflict_do_nothing()
                .execute(conn)?;

            let stored: Value = cart_sessions::table
                .find(session_key)
                .select(cart_sessions::cart)
                .for_update()
                .first(conn)?;
            let cart = decode_session(session_key, stored);

            let (result, updated) = change(&cart)?;
            if let Some(updated) = updated {
                write_session(conn, session_key, &updated)?;
            }
            Ok(result)
        })
    }
}
