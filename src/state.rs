use crate::application::{CartService, CatalogService, CheckoutService, MergeService, UserService};
use crate::db::DbPool;
use crate::infrastructure::{
    DieselCartRepository, DieselCatalogRepository, DieselOrderRepository,
    DieselSessionCartRepository, DieselUserRepository,
};

/// Services shared by every request handler.
pub struct AppState {
    pub catalog: CatalogService<DieselCatalogRepository>,
    pub carts: CartService<DieselCartRepository, DieselCatalogRepository>,
    pub sessions: DieselSessionCartRepository,
    pub merges: MergeService<DieselCartRepository>,
    pub checkout: CheckoutService<DieselOrderRepository>,
    pub users: UserService<DieselUserRepository>,
}

impl AppState {
    pub fn new(pool: DbPool) -> Self {
        let catalog = DieselCatalogRepository::new(pool.clone());
        let carts = DieselCartRepository::new(pool.clone());
        Self {
            catalog: CatalogService::new(catalog.clone()),
            carts: CartService::new(carts.clone(), catalog),
            sessions: DieselSessionCartRepository::new(pool.clone()),
            merges: MergeService::new(carts),
            checkout: CheckoutService::new(DieselOrderRepository::new(pool.clone())),
            users: UserService::new(DieselUserRepository::new(pool)),
        }
    }
}
