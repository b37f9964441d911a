pub mod cart_repo;
pub mod catalog_repo;
pub mod models;
pub mod order_repo;
pub mod user_repo;

#[cfg(test)]
pub(crate) mod test_support;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::errors::DomainError;

pub use cart_repo::{DieselCartRepository, DieselSessionCartRepository};
pub use catalog_repo::DieselCatalogRepository;
pub use order_repo::DieselOrderRepository;
pub use user_repo::DieselUserRepository;

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => DomainError::NotFound,
            DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::ForeignKeyViolation,
                info,
            ) => DomainError::InvalidInput(info.message().to_string()),
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}
