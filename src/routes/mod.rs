use axum::Router;

use crate::AppState;

mod error;
mod health;
mod root;

pub use error::ApiError;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(root::router())
        .merge(health::router())
        .with_state(state)
}
