use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{
    page_window, Category, NewCategory, NewProduct, Product, ProductFilter, ProductPage,
};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::{categories, products};

use super::models::{CategoryRow, NewCategoryRow, NewProductRow, ProductRow};

#[derive(Clone)]
pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn active_products(filter: &ProductFilter) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table
        .filter(products::is_active.eq(true))
        .into_boxed();
    if let Some(category_id) = filter.category_id {
        query = query.filter(products::category_id.eq(category_id));
    }
    query
}

impl CatalogRepository for DieselCatalogRepository {
    fn find_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first::<ProductRow>(&mut conn)
            .optional()?;

        Ok(row.map(Product::from))
    }

    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let mut conn = self.pool.get()?;

        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load::<ProductRow>(&mut conn)?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    fn list_products(
        &self,
        filter: &ProductFilter,
        page: i64,
        limit: i64,
    ) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;
        let (_, limit, offset) = page_window(page, limit);

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = active_products(filter).count().get_result(conn)?;

            let rows = active_products(filter)
                .select(ProductRow::as_select())
                .order((products::created_at.desc(), products::id))
                .limit(limit)
                .offset(offset)
                .load::<ProductRow>(conn)?;

            Ok(ProductPage {
                items: rows.into_iter().map(Product::from).collect(),
                total,
            })
        })
    }

    fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = categories::table
            .filter(categories::is_active.eq(true))
            .select(CategoryRow::as_select())
            .order(categories::name.asc())
            .load::<CategoryRow>(&mut conn)?;

        Ok(rows.into_iter().map(Category::from).collect())
    }

    fn create_category(&self, category: NewCategory) -> Result<Category, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(categories::table)
            .values(&NewCategoryRow {
                id: Uuid::new_v4(),
                name: category.name,
                slug: category.slug,
                description: category.description,
            })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }

    fn create_product(&self, product: NewProduct) -> Result<Product, DomainError> {
        if product.price < BigDecimal::from(0) || product.stock < 0 {
            return Err(DomainError::InvalidInput(
                "price and stock must not be negative".to_string(),
            ));
        }
        let mut conn = self.pool.get()?;

        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                seller_id: product.seller_id,
                category_id: product.category_id,
                name: product.name,
                description: product.description,
                price: product.price,
                stock: product.stock,
                is_active: product.is_active,
            })
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }

    fn update_price(&self, id: Uuid, price: BigDecimal) -> Result<Product, DomainError> {
        if price < BigDecimal::from(0) {
            return Err(DomainError::InvalidInput(
                "price must not be negative".to_string(),
            ));
        }
        let mut conn = self.pool.get()?;

        let row = diesel::update(products::table.find(id))
            .set((products::price.eq(price), products::updated_at.eq(Utc::now())))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }

    fn set_active(&self, id: Uuid, is_active: bool) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        let row = diesel::update(products::table.find(id))
            .set((
                products::is_active.eq(is_active),
                products::updated_at.eq(Utc::now()),
            ))
            .returning(ProductRow::as_returning())
            .get_result(&mut conn)?;

        Ok(row.into())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DieselCatalogRepository;
    use crate::domain::catalog::{NewCategory, NewProduct, ProductFilter};
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CatalogRepository;
    use crate::domain::user::{Profile, Role};
    use crate::infrastructure::test_support::{create_product, create_user, decimal, setup_db};

    #[tokio::test]
    async fn list_products_hides_inactive_and_paginates() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());

        for _ in 0..5 {
            create_product(&pool, seller.id, "9.99", true);
        }
        let hidden = create_product(&pool, seller.id, "500.00", false);

        let page1 = repo
            .list_products(&ProductFilter::default(), 1, 3)
            .expect("list page 1 failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);

        let page2 = repo
            .list_products(&ProductFilter::default(), 2, 3)
            .expect("list page 2 failed");
        assert_eq!(page2.items.len(), 2);
        assert!(page1
            .items
            .iter()
            .chain(page2.items.iter())
            .all(|p| p.id != hidden.id));
    }

    #[tokio::test]
    async fn list_products_filters_by_category() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let category = repo
            .create_category(NewCategory {
                name: "Maison & Décoration".to_string(),
                slug: "maison-decoration".to_string(),
                description: String::new(),
            })
            .expect("create category failed");

        create_product(&pool, seller.id, "1.00", true);
        let in_category = repo
            .create_product(NewProduct {
                seller_id: seller.id,
                category_id: Some(category.id),
                name: "Table".to_string(),
                description: String::new(),
                price: decimal("120.00"),
                stock: 3,
                is_active: true,
            })
            .expect("create product failed");

        let filter = ProductFilter {
            category_id: Some(category.id),
        };
        let page = repo.list_products(&filter, 1, 20).expect("list failed");

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, in_category.id);
        assert_eq!(
            repo.list_categories().expect("categories").len(),
            1,
            "one active category"
        );
    }

    #[tokio::test]
    async fn find_products_ignores_unknown_ids() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let product = create_product(&pool, seller.id, "3.50", true);

        let found = repo
            .find_products(&[product.id, Uuid::new_v4()])
            .expect("find failed");

        assert_eq!(found.len(), 1);
        assert!(repo
            .find_product(Uuid::new_v4())
            .expect("find should not error")
            .is_none());
    }

    #[tokio::test]
    async fn update_price_and_active_flag() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCatalogRepository::new(pool.clone());
        let seller = create_user(&pool, "seller1", Role::Seller, Profile::default());
        let product = create_product(&pool, seller.id, "10.00", true);

        let repriced = repo
            .update_price(product.id, decimal("12.50"))
            .expect("update price failed");
        assert_eq!(repriced.price, decimal("12.50"));

        let hidden = repo.set_active(product.id, false).expect("set active failed");
        assert!(!hidden.is_active);

        assert!(matches!(
            repo.update_price(product.id, decimal("-1")),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            repo.set_active(Uuid::new_v4(), true),
            Err(DomainError::NotFound)
        ));
    }
}
