use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{draft_order, OrderItemView, OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;
use crate::domain::user::Profile;
use crate::schema::{cart_items, order_items, orders, profiles};

use super::cart_repo::load_lines;
use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow, ProfileRow};

fn to_view(order: OrderRow, items: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    Ok(OrderView {
        id: order.id,
        user_id: order.user_id,
        total_price: order.total_price,
        status: order.status.parse()?,
        shipping_address: order.shipping_address,
        phone: order.phone,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items: items
            .into_iter()
            .map(|i| OrderItemView {
                id: i.id,
                product_id: i.product_id,
                product_name: i.product_name,
                quantity: i.quantity,
                price: i.price,
            })
            .collect(),
    })
}

fn load_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderView>, DomainError> {
    let order = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first::<OrderRow>(conn)
        .optional()?;

    let Some(order) = order else {
        return Ok(None);
    };

    let items = OrderItemRow::belonging_to(&order)
        .select(OrderItemRow::as_select())
        .order(order_items::product_name.asc())
        .load::<OrderItemRow>(conn)?;

    to_view(order, items).map(Some)
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn checkout(&self, user_id: Uuid) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Lock the cart rows so a concurrent checkout of the same cart
            //    waits and then finds it empty. Only these rows are ordered
            //    and deleted; a line added meanwhile stays in the cart.
            let locked: Vec<Uuid> = cart_items::table
                .filter(cart_items::user_id.eq(user_id))
                .select(cart_items::id)
                .for_update()
                .load(conn)?;

            let mut lines = load_lines(conn, user_id)?;
            lines.retain(|line| locked.contains(&line.item_id));
            let profile: Profile = profiles::table
                .find(user_id)
                .select(ProfileRow::as_select())
                .first::<ProfileRow>(conn)
                .optional()?
                .map(Profile::from)
                .unwrap_or_default();

            // 2. Price the cart with the live catalog prices.
            let draft = draft_order(lines, profile.shipping_details())?;

            // 3. Insert the order
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    user_id,
                    total_price: draft.total_price,
                    status: OrderStatus::Pending.as_str().to_string(),
                    shipping_address: draft.shipping.address,
                    phone: draft.shipping.phone,
                })
                .execute(conn)?;

            // 4. Insert order items with frozen unit prices
            let new_items: Vec<NewOrderItemRow> = draft
                .items
                .into_iter()
                .map(|item| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)?;

            // 5. Empty the cart
            diesel::delete(cart_items::table.filter(cart_items::id.eq_any(&locked)))
                .execute(conn)?;

            load_order(conn, order_id)?.ok_or(DomainError::NotFound)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        load_order(&mut conn, id)
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let current: String = orders::table
                .find(id)
                .select(orders::status)
                .for_update()
                .first(conn)?;
            let current: OrderStatus = current.parse()?;

            if !current.can_transition_to(status) {
                return Err(DomainError::InvalidTransition {
                    from: current,
                    to: status,
                });
            }

            diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .execute(conn)?;

            load_order(conn, id)?.ok_or(DomainError::NotFound)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use diesel::connection::SimpleConnection;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::order::OrderStatus;
    use crate::domain::ports::{CartRepository, CatalogRepository, OrderRepository};
    use crate::domain::user::{Profile, Role};
    use crate::infrastructure::test_support::{create_product, create_user, decimal, setup_db};
    use crate::infrastructure::{DieselCartRepository, DieselCatalogRepository};
    use crate::schema::{orders, products};

    #[tokio::test]
    async fn checkout_on_empty_cart_creates_nothing() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());

        let err = repo.checkout(client.id).expect_err("checkout should fail");

        assert!(matches!(err, DomainError::EmptyCart));
        let mut conn = pool.get().expect("Failed to get connection");
        let count: i64 = orders::table
            .count()
            .get_result(&mut conn)
            .expect("count failed");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn checkout_converts_cart_into_order() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let cart = DieselCartRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(
            &pool,
            "client1",
            Role::Client,
            Profile {
                phone: "0102030405".to_string(),
                address: "12 rue des Jardins".to_string(),
                city: "Abidjan".to_string(),
                ..Profile::default()
            },
        );
        let product = create_product(&pool, seller.id, "1000.00", true);
        cart.add(client.id, product.id, 2).expect("add failed");

        let order = repo.checkout(client.id).expect("checkout failed");

        assert_eq!(order.user_id, client.id);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, decimal("2000.00"));
        assert_eq!(order.shipping_address, "12 rue des Jardins, Abidjan");
        assert_eq!(order.phone, "0102030405");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].price, decimal("1000.00"));
        assert_eq!(order.items[0].quantity, 2);
        assert!(cart.lines(client.id).expect("lines failed").is_empty());
    }

    #[tokio::test]
    async fn second_checkout_finds_an_empty_cart() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let cart = DieselCartRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());
        let product = create_product(&pool, seller.id, "3.00", true);
        cart.add(client.id, product.id, 1).expect("add failed");

        repo.checkout(client.id).expect("first checkout failed");

        assert!(matches!(
            repo.checkout(client.id),
            Err(DomainError::EmptyCart)
        ));
    }

    #[tokio::test]
    async fn order_prices_survive_catalog_changes() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let cart = DieselCartRepository::new(pool.clone());
        let catalog = DieselCatalogRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());
        let product = create_product(&pool, seller.id, "1000.00", true);
        cart.add(client.id, product.id, 1).expect("add failed");
        let order = repo.checkout(client.id).expect("checkout failed");

        catalog
            .update_price(product.id, decimal("1500.00"))
            .expect("update price failed");

        let reloaded = repo
            .find_by_id(order.id)
            .expect("find failed")
            .expect("order should exist");
        assert_eq!(reloaded.items[0].price, decimal("1000.00"));
        assert_eq!(reloaded.total_price, decimal("1000.00"));
    }

    #[tokio::test]
    async fn checkout_with_inactive_product_changes_nothing() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let cart = DieselCartRepository::new(pool.clone());
        let catalog = DieselCatalogRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());
        let product = create_product(&pool, seller.id, "7.00", true);
        cart.add(client.id, product.id, 1).expect("add failed");
        catalog.set_active(product.id, false).expect("deactivate failed");

        let err = repo.checkout(client.id).expect_err("checkout should fail");

        assert!(matches!(err, DomainError::ProductUnavailable(id) if id == product.id));
        assert_eq!(cart.lines(client.id).expect("lines failed").len(), 1);
    }

    #[tokio::test]
    async fn ordered_products_cannot_be_deleted() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let cart = DieselCartRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());
        let product = create_product(&pool, seller.id, "7.00", true);
        cart.add(client.id, product.id, 1).expect("add failed");
        repo.checkout(client.id).expect("checkout failed");

        let mut conn = pool.get().expect("Failed to get connection");
        let result = diesel::delete(products::table.find(product.id)).execute(&mut conn);

        assert!(result.is_err(), "order items must keep their product");
    }

    #[tokio::test]
    async fn update_status_follows_the_lifecycle() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());
        let cart = DieselCartRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());
        let product = create_product(&pool, seller.id, "7.00", true);
        cart.add(client.id, product.id, 1).expect("add failed");
        let order = repo.checkout(client.id).expect("checkout failed");

        let processing = repo
            .update_status(order.id, OrderStatus::Processing)
            .expect("update failed");
        assert_eq!(processing.status, OrderStatus::Processing);

        assert!(matches!(
            repo.update_status(order.id, OrderStatus::Delivered),
            Err(DomainError::InvalidTransition { .. })
        ));
        assert!(matches!(
            repo.update_status(Uuid::new_v4(), OrderStatus::Cancelled),
            Err(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn line_added_during_checkout_stays_in_the_cart() {
        let (_container, pool) = setup_db().await;
        let cart = DieselCartRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let client = create_user(&pool, "client1", Role::Client, Profile::default());
        let ordered = create_product(&pool, seller.id, "10.00", true);
        let late = create_product(&pool, seller.id, "4.00", true);
        cart.add(client.id, ordered.id, 1).expect("add failed");

        // Hold checkout open between locking the cart and emptying it.
        pool.get()
            .expect("Failed to get connection")
            .batch_execute(
                "CREATE FUNCTION slow_order_insert() RETURNS trigger AS $$
                 BEGIN PERFORM pg_sleep(1); RETURN NEW; END $$ LANGUAGE plpgsql;
                 CREATE TRIGGER slow_orders BEFORE INSERT ON orders
                 FOR EACH ROW EXECUTE FUNCTION slow_order_insert();",
            )
            .expect("trigger setup failed");

        let repo = DieselOrderRepository::new(pool.clone());
        let buyer = client.id;
        let checkout = thread::spawn(move || repo.checkout(buyer));
        thread::sleep(Duration::from_millis(300));
        cart.add(client.id, late.id, 1).expect("add failed");
        let order = checkout
            .join()
            .expect("thread panicked")
            .expect("checkout failed");

        let in_order = order.items.iter().any(|i| i.product_id == late.id);
        let in_cart = cart
            .lines(client.id)
            .expect("lines failed")
            .iter()
            .any(|l| l.product.id == late.id);
        assert!(in_order != in_cart, "the late line must be ordered or kept, exactly once");
        assert!(order.items.iter().any(|i| i.product_id == ordered.id));
    }
}
