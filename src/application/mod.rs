pub mod cart_service;
pub mod catalog_service;
pub mod checkout_service;
pub mod merge_service;
pub mod user_service;

pub use cart_service::{CartService, CartTarget, CartUpdate};
pub use catalog_service::CatalogService;
pub use checkout_service::CheckoutService;
pub use merge_service::MergeService;
pub use user_service::UserService;
