use uuid::Uuid;

use crate::domain::catalog::{Category, Product, ProductFilter, ProductPage};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;

pub struct CatalogService<R> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list_products(
        &self,
        filter: &ProductFilter,
        page: i64,
        limit: i64,
    ) -> Result<ProductPage, DomainError> {
        self.repo.list_products(filter, page, limit)
    }

    /// Inactive products are hidden from shoppers.
    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.repo
            .find_product(id)?
            .filter(Product::is_available)
            .ok_or(DomainError::NotFound)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.repo.list_categories()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::CatalogService;
    use crate::application::cart_service::fakes::FakeCatalog;
    use crate::domain::errors::DomainError;

    #[test]
    fn get_product_hides_inactive_products() {
        let catalog = FakeCatalog::default();
        let active = catalog.with_product(10, true);
        let inactive = catalog.with_product(10, false);
        let service = CatalogService::new(catalog);

        assert_eq!(service.get_product(active.id).expect("get failed").id, active.id);
        assert!(matches!(
            service.get_product(inactive.id),
            Err(DomainError::NotFound)
        ));
        assert!(matches!(
            service.get_product(Uuid::new_v4()),
            Err(DomainError::NotFound)
        ));
    }
}
