//! Axum route handlers for categories and cards.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::catalog::categories::Category;
use crate::catalog::models::CreditCard;
use crate::catalog::ranker::{top_cards_for_category, DEFAULT_TOP_N};
use crate::catalog::store::CardsStatus;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct CategoryCardsResponse {
    pub category_id: String,
    pub cards: Vec<CreditCard>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub count: usize,
    pub last_updated: Option<String>,
}

/// GET /api/categories
pub async fn handle_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.categories.all().to_vec())
}

/// GET /api/cards
pub async fn handle_all_cards(State(state): State<AppState>) -> Json<Vec<CreditCard>> {
    let catalog = state.cards.current().await;
    Json(catalog.cards().to_vec())
}

/// GET /api/cards/status
pub async fn handle_cards_status(State(state): State<AppState>) -> Json<CardsStatus> {
    Json(state.cards.status().await)
}

/// POST /api/cards/reload
pub async fn handle_reload_cards(
    State(state): State<AppState>,
) -> Result<Json<ReloadResponse>, AppError> {
    let catalog = state.cards.reload().await?;
    Ok(Json(ReloadResponse {
        success: true,
        count: catalog.len(),
        last_updated: catalog.last_updated().map(str::to_string),
    }))
}

/// GET /api/cards/:category_id?limit=N
///
/// Unknown category ids are not an error: every card ranks at the default rate.
pub async fn handle_cards_for_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Json<CategoryCardsResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_TOP_N);
    let catalog = state.cards.current().await;
    let cards = top_cards_for_category(catalog.cards(), &category_id, limit)
        .into_iter()
        .cloned()
        .collect();

    Json(CategoryCardsResponse { category_id, cards })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{sample_cards, test_state, StubModel};

    fn ids(cards: &[CreditCard]) -> Vec<&str> {
        cards.iter().map(|c| c.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_categories_in_matching_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), sample_cards(), &[]);

        let Json(categories) = handle_categories(State(state)).await;
        assert_eq!(categories.len(), 10);
        assert_eq!(categories[0].id, "dining");
        assert_eq!(categories.last().unwrap().id, "other");
    }

    #[tokio::test]
    async fn test_cards_for_category_defaults_to_three() {
        let dir = tempfile::tempdir().unwrap();
        let mut cards = sample_cards();
        cards.push(CreditCard::new("extra", "Extra", "Bank").with_rate("dining", 2.0));
        let state = test_state(dir.path(), StubModel::answering("ok"), cards, &[]);

        let Json(resp) = handle_cards_for_category(
            State(state),
            Path("dining".to_string()),
            Query(LimitQuery { limit: None }),
        )
        .await;

        assert_eq!(resp.category_id, "dining");
        assert_eq!(ids(&resp.cards), vec!["gold", "savor", "extra"]);
    }

    #[tokio::test]
    async fn test_cards_for_category_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), sample_cards(), &[]);

        let Json(resp) = handle_cards_for_category(
            State(state),
            Path("other".to_string()),
            Query(LimitQuery { limit: Some(1) }),
        )
        .await;

        assert_eq!(ids(&resp.cards), vec!["flat"]);
    }

    #[tokio::test]
    async fn test_reload_reads_cards_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), Vec::new(), &[]);
        std::fs::write(
            state.config.cards_file(),
            r#"{"last_updated": "2025-01-15", "cards": [{"id": "x", "name": "X", "issuer": "Y"}]}"#,
        )
        .unwrap();

        let Json(resp) = handle_reload_cards(State(state.clone())).await.unwrap();
        assert!(resp.success);
        assert_eq!(resp.count, 1);
        assert_eq!(resp.last_updated.as_deref(), Some("2025-01-15"));

        let Json(status) = handle_cards_status(State(state)).await;
        assert!(status.has_data);
        assert_eq!(status.count, 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_cards() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), sample_cards(), &[]);
        std::fs::write(state.config.cards_file(), "{not json").unwrap();

        let err = handle_reload_cards(State(state.clone())).await.unwrap_err();
        assert!(matches!(err, AppError::Store(_)));

        let Json(cards) = handle_all_cards(State(state)).await;
        assert_eq!(ids(&cards), vec!["gold", "savor", "flat"]);
    }
}
