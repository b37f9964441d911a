pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;
pub mod state;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};

use crate::domain::errors::DomainError;
use crate::state::AppState;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::catalog::list_categories,
        handlers::users::create_user,
        handlers::cart::get_cart,
        handlers::cart::add_to_cart,
        handlers::cart::remove_from_cart,
        handlers::cart::update_cart_item,
        handlers::sessions::merge_session,
        handlers::orders::checkout,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
    ),
    components(schemas(
        handlers::catalog::ProductResponse,
        handlers::catalog::CategoryResponse,
        handlers::catalog::ListProductsResponse,
        handlers::users::CreateUserRequest,
        handlers::users::ProfileBody,
        handlers::users::UserResponse,
        handlers::cart::CartResponse,
        handlers::cart::CartLineResponse,
        handlers::cart::AddToCartResponse,
        handlers::cart::RemoveFromCartResponse,
        handlers::cart::UpdateCartItemRequest,
        handlers::cart::UpdateCartItemResponse,
        handlers::sessions::MergeSessionRequest,
        handlers::sessions::MergeSessionResponse,
        handlers::orders::OrderResponse,
        handlers::orders::OrderItemResponse,
        handlers::orders::UpdateOrderStatusRequest,
    )),
    tags(
        (name = "catalog", description = "Active products and categories"),
        (name = "users", description = "Accounts and profiles"),
        (name = "cart", description = "Session and user carts"),
        (name = "orders", description = "Checkout and order lifecycle"),
    )
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), DomainError> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| DomainError::Internal(format!("migrations failed: {e}")))?;
    Ok(())
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(AppState::new(pool));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .service(
                web::scope("/products")
                    .route("", web::get().to(handlers::catalog::list_products))
                    .route("/{id}", web::get().to(handlers::catalog::get_product)),
            )
            .route("/categories", web::get().to(handlers::catalog::list_categories))
            .route("/users", web::post().to(handlers::users::create_user))
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::get_cart))
                    .route("/items/{id}", web::post().to(handlers::cart::add_to_cart))
                    .route("/items/{id}", web::delete().to(handlers::cart::remove_from_cart))
                    .route("/items/{id}", web::patch().to(handlers::cart::update_cart_item)),
            )
            .route(
                "/sessions/{session_key}/merge",
                web::post().to(handlers::sessions::merge_session),
            )
            .route("/checkout", web::post().to(handlers::orders::checkout))
            .service(
                web::scope("/orders")
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/status", web::patch().to(handlers::orders::update_order_status)),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
