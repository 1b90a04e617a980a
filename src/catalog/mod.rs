//! Product catalog, basket, blog and news routes.
//!
//! Products, blogs and news are read through the driver-level audited
//! collection; baskets go through the schema-level audited
//! [`Model`](crate::store::Model).

pub mod basket;
pub mod posts;
pub mod products;
pub mod seed;

pub use basket::{BasketItem, CurrentUser};
pub use seed::{load_seed, SeedError};

use axum::Router;

use crate::http::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/products", products::routes())
        .nest("/api/baskets", basket::routes())
        .nest("/api/blogs", posts::routes(&posts::BLOGS))
        .nest("/api/news", posts::routes(&posts::NEWS))
}
