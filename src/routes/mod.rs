pub mod auth;
pub mod doc;
pub mod health;
pub mod params;
pub mod products;

use axum::Router;

use crate::state::AppState;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .merge(auth::router())
}
