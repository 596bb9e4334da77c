use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::catalog::ranker::best_card_for_query;
use crate::chat::fallback::fallback_reply;
use crate::chat::prompts::build_context;
use crate::chat::sessions::{new_session_id, Role};
use crate::errors::AppError;
use crate::llm_client::ChatTurn;
use crate::state::AppState;

/// Assistant name shown while the model is unreachable.
const FALLBACK_ASSISTANT: &str = "IntelliAgent";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Option<Vec<ChatTurn>>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CardRecommendation {
    pub card_name: String,
    pub issuer: String,
    pub cashback: f64,
    pub category: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub card_recommendation: Option<CardRecommendation>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub message: String,
}

/// POST /api/chat/new
pub async fn handle_new_session(
    State(state): State<AppState>,
) -> Result<Json<NewSessionResponse>, AppError> {
    let session_id = new_session_id();
    state
        .sessions
        .start(&session_id)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    info!("Started chat session {session_id}");
    Ok(Json(NewSessionResponse {
        session_id,
        message: "New session started".to_string(),
    }))
}

/// POST /api/chat
pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let message = req.message.as_str();

    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(new_session_id);
    let model_label = state.model_label();
    log_turn(&state, &session_id, Role::User, message, &model_label).await;

    let catalog = state.cards.current().await;
    let cards = catalog.cards();
    let recommendation = best_card_for_query(&state.categories, cards, message);
    let context = build_context(&recommendation, &state.categories, cards, message);
    let history = req.conversation_history.unwrap_or_default();

    let response = match state.llm.chat(&context, &history, message).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("LLM unavailable ({e}); answering from card data");
            fallback_reply(&state.categories, cards, message)
        }
    };

    log_turn(&state, &session_id, Role::Assistant, &response, &model_label).await;

    let card_recommendation = recommendation.card.map(|card| CardRecommendation {
        card_name: card.name.clone(),
        issuer: card.issuer.clone(),
        cashback: recommendation.cashback,
        category: recommendation.category.name.clone(),
    });

    Ok(Json(ChatResponse {
        response,
        card_recommendation,
        session_id,
    }))
}

/// Chat keeps answering when the session log cannot be written.
async fn log_turn(state: &AppState, session_id: &str, role: Role, content: &str, model: &str) {
    if let Err(e) = state.sessions.append(session_id, role, content, model).await {
        warn!("Failed to record chat turn for session {session_id}: {e}");
    }
}

/// GET /api/health
pub async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    let llm = state.llm.health().await;
    Json(json!({
        "api": "healthy",
        "llm": llm,
    }))
}

/// GET /api/llm-status
pub async fn handle_llm_status(State(state): State<AppState>) -> Json<Value> {
    let health = state.llm.health().await;
    if health.is_healthy() {
        Json(json!({
            "available": true,
            "name": state.llm.model(),
            "provider": state.llm.provider().as_str(),
        }))
    } else {
        Json(json!({
            "available": false,
            "name": FALLBACK_ASSISTANT,
            "provider": "fallback",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::prompts::OFF_TOPIC_REPLY;
    use crate::chat::sessions::SessionLogFile;
    use crate::state::test_support::{sample_cards, test_state, StubModel};

    fn request(message: &str, session_id: Option<&str>) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.to_string(),
            conversation_history: None,
            session_id: session_id.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_chat_uses_model_reply_and_recommends_card() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(
            dir.path(),
            StubModel::answering("Use the Amex Gold Card."),
            sample_cards(),
            &[],
        );

        let Json(resp) = handle_chat(State(state), request("best card for dinner", Some("abc12345")))
            .await
            .unwrap();

        assert_eq!(resp.response, "Use the Amex Gold Card.");
        assert_eq!(resp.session_id, "abc12345");
        assert_eq!(
            resp.card_recommendation,
            Some(CardRecommendation {
                card_name: "Gold Card".to_string(),
                issuer: "Amex".to_string(),
                cashback: 4.0,
                category: "Dining".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_chat_falls_back_when_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::failing(), sample_cards(), &[]);

        let Json(resp) = handle_chat(State(state), request("best card for dinner", None))
            .await
            .unwrap();

        assert!(resp
            .response
            .starts_with("For **Dining** purchases, I recommend the **Amex Gold Card**"));
        assert_eq!(resp.session_id.len(), 8);
    }

    #[tokio::test]
    async fn test_off_topic_fallback_has_no_effect_on_recommendation() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::failing(), sample_cards(), &[]);

        let Json(resp) = handle_chat(State(state), request("tell me a joke", None))
            .await
            .unwrap();

        assert_eq!(resp.response, OFF_TOPIC_REPLY);
        // "other" still has a best card: the flat-rate card.
        assert_eq!(resp.card_recommendation.unwrap().card_name, "Double Cash");
    }

    #[tokio::test]
    async fn test_chat_without_cards_has_no_recommendation() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), Vec::new(), &[]);

        let Json(resp) = handle_chat(State(state), request("card for gas", None))
            .await
            .unwrap();

        assert!(resp.card_recommendation.is_none());
    }

    #[tokio::test]
    async fn test_empty_message_resolves_to_other() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::failing(), sample_cards(), &[]);

        let Json(resp) = handle_chat(State(state), request("", None)).await.unwrap();

        assert_eq!(resp.response, OFF_TOPIC_REPLY);
        let rec = resp.card_recommendation.unwrap();
        assert_eq!(rec.category, "Other");
        assert_eq!(rec.card_name, "Double Cash");
    }

    #[tokio::test]
    async fn test_chat_logs_both_turns() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("Savor."), sample_cards(), &[]);

        let Json(resp) = handle_chat(State(state.clone()), request("concert tickets", Some("s1")))
            .await
            .unwrap();
        assert_eq!(resp.response, "Savor.");

        let log: SessionLogFile = state.sessions.read().await.unwrap();
        let session = &log.sessions["s1"];
        assert_eq!(session.model.as_deref(), Some("ollama/stub"));
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "concert tickets");
        assert_eq!(session.messages[1].content, "Savor.");
    }

    #[tokio::test]
    async fn test_unwritable_log_does_not_fail_chat() {
        let dir = tempfile::tempdir().unwrap();
        // A file where the data directory should be makes every log write fail.
        let blocker = dir.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let state = test_state(&blocker, StubModel::answering("ok"), sample_cards(), &[]);

        let result = handle_chat(State(state), request("card for gas", None)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), sample_cards(), &[]);

        let Json(resp) = handle_new_session(State(state.clone())).await.unwrap();
        assert_eq!(resp.message, "New session started");

        let log = state.sessions.read().await.unwrap();
        assert!(log.sessions.contains_key(&resp.session_id));
    }

    #[tokio::test]
    async fn test_llm_status_reports_fallback_when_unhealthy() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::failing(), sample_cards(), &[]);

        let Json(body) = handle_llm_status(State(state)).await;
        assert_eq!(
            body,
            json!({"available": false, "name": "IntelliAgent", "provider": "fallback"})
        );
    }

    #[tokio::test]
    async fn test_health_reports_model_status() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path(), StubModel::answering("ok"), sample_cards(), &[]);

        let Json(body) = handle_health(State(state)).await;
        assert_eq!(body["api"], "healthy");
        assert_eq!(body["llm"]["status"], "healthy");
        assert_eq!(body["llm"]["current_model"], "stub");
    }
}
