use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::{OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;

pub struct CheckoutService<R> {
    repo: R,
}

impl<R: OrderRepository> CheckoutService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn checkout(&self, user_id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.repo.checkout(user_id)?;
        log::info!(
            "order {} placed by user {user_id}: {} item(s), total {}",
            order.id,
            order.items.len(),
            order.total_price
        );
        Ok(order)
    }

    /// An order is only visible to the user who placed it.
    pub fn get_order(&self, user_id: Uuid, id: Uuid) -> Result<OrderView, DomainError> {
        self.repo
            .find_by_id(id)?
            .filter(|order| order.user_id == user_id)
            .ok_or(DomainError::NotFound)
    }

    pub fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        let order = self.repo.update_status(id, status)?;
        log::info!("order {id} is now {status}");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use uuid::Uuid;

    use super::CheckoutService;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{OrderStatus, OrderView};
    use crate::domain::ports::OrderRepository;

    #[derive(Default)]
    struct FakeOrders {
        orders: Mutex<HashMap<Uuid, OrderView>>,
    }

    impl FakeOrders {
        fn insert(&self, user_id: Uuid) -> Uuid {
            let order = OrderView {
                id: Uuid::new_v4(),
                user_id,
                total_price: BigDecimal::from(2000),
                status: OrderStatus::Pending,
                shipping_address: String::new(),
                phone: String::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                items: vec![],
            };
            let id = order.id;
            self.orders.lock().expect("lock poisoned").insert(id, order);
            id
        }
    }

    impl OrderRepository for FakeOrders {
        fn checkout(&self, _: Uuid) -> Result<OrderView, DomainError> {
            Err(DomainError::EmptyCart)
        }

        fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
            Ok(self.orders.lock().expect("lock poisoned").get(&id).cloned())
        }

        fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
            let mut orders = self.orders.lock().expect("lock poisoned");
            let order = orders.get_mut(&id).ok_or(DomainError::NotFound)?;
            order.status = status;
            Ok(order.clone())
        }
    }

    #[test]
    fn get_order_hides_other_users_orders() {
        let repo = FakeOrders::default();
        let owner = Uuid::new_v4();
        let id = repo.insert(owner);
        let service = CheckoutService::new(repo);

        assert_eq!(service.get_order(owner, id).expect("get failed").id, id);
        assert!(matches!(
            service.get_order(Uuid::new_v4(), id),
            Err(DomainError::NotFound)
        ));
    }

    #[test]
    fn checkout_errors_pass_through() {
        let service = CheckoutService::new(FakeOrders::default());

        assert!(matches!(
            service.checkout(Uuid::new_v4()),
            Err(DomainError::EmptyCart)
        ));
    }
}
