use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod dishes;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod profiles;
pub mod restaurants;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/profiles", profiles::router())
        .nest("/restaurants", restaurants::router())
        .nest("/dishes", dishes::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
}
