use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

// ---

#[derive(Debug, Serialize)]
struct RootResponse {
    message: String,
    version: String,
    documentation: String,
    health: &'static str,
}

/// Handle `GET /`: basic information about the API.
async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    // ---
    let app = &state.config.app;
    Json(RootResponse {
        message: format!("{} Backend API", app.name),
        version: app.version.clone(),
        documentation: state.config.docs.docs_url.clone(),
        health: "/health",
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(root))
}
