pub mod health;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use crate::admin::handlers as admin;
use crate::catalog::handlers as catalog;
use crate::chat::handlers as chat;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        // Catalog API
        .route("/api/categories", get(catalog::handle_categories))
        .route("/api/cards", get(catalog::handle_all_cards))
        .route("/api/cards/status", get(catalog::handle_cards_status))
        .route("/api/cards/reload", post(catalog::handle_reload_cards))
        .route(
            "/api/cards/:category_id",
            get(catalog::handle_cards_for_category),
        )
        // Chat API
        .route("/api/chat/new", post(chat::handle_new_session))
        .route("/api/chat", post(chat::handle_chat))
        .route("/api/health", get(chat::handle_health))
        .route("/api/llm-status", get(chat::handle_llm_status))
        // Admin API
        .route("/api/admin/verify", post(admin::handle_verify))
        .route(
            "/api/admin/card-sources",
            post(admin::handle_get_card_sources),
        )
        .route(
            "/api/admin/card-sources/update",
            post(admin::handle_update_card_sources),
        )
        .with_state(state)
}

/// CORS restricted to the configured origins. Unparseable origins are skipped.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
