use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Service banner with the crate version.
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "CardNinja API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
