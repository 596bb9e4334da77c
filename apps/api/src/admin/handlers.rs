use std::path::Path;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AdminAuthRequest {
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CardSourcesUpdateRequest {
    pub password: String,
    pub content: Value,
}

#[derive(Debug, Serialize)]
pub struct AdminMessage {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CardSourcesResponse {
    pub success: bool,
    pub content: Value,
}

/// Admin access requires a configured password; with none set every request is denied.
fn authorize(config: &Config, password: &str) -> Result<(), AppError> {
    match config.admin_password.as_deref() {
        Some(expected) if expected == password => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/admin/verify
pub async fn handle_verify(
    State(state): State<AppState>,
    Json(req): Json<AdminAuthRequest>,
) -> Result<Json<AdminMessage>, AppError> {
    authorize(&state.config, &req.password)?;
    Ok(Json(AdminMessage {
        success: true,
        message: "Access granted".to_string(),
    }))
}

/// POST /api/admin/card-sources
pub async fn handle_get_card_sources(
    State(state): State<AppState>,
    Json(req): Json<AdminAuthRequest>,
) -> Result<Json<CardSourcesResponse>, AppError> {
    authorize(&state.config, &req.password)?;

    let path = state.config.card_sources_file();
    let raw = match tokio::fs::read_to_string(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("Card sources file not found".to_string()))
        }
        Err(e) => {
            return Err(AppError::Storage(format!(
                "Failed to read card sources: {e}"
            )))
        }
    };

    let content = serde_json::from_str(&raw)
        .map_err(|e| AppError::Storage(format!("Failed to read card sources: {e}")))?;

    Ok(Json(CardSourcesResponse {
        success: true,
        content,
    }))
}

/// POST /api/admin/card-sources/update
///
/// The previous file is copied to `card_sources.json.backup` before being replaced.
pub async fn handle_update_card_sources(
    State(state): State<AppState>,
    Json(req): Json<CardSourcesUpdateRequest>,
) -> Result<Json<AdminMessage>, AppError> {
    authorize(&state.config, &req.password)?;

    let count = req
        .content
        .get("cards")
        .and_then(Value::as_array)
        .map(Vec::len)
        .ok_or_else(|| AppError::Validation("Invalid format: missing 'cards' array".to_string()))?;

    let path = state.config.card_sources_file();
    write_with_backup(&path, &req.content)
        .await
        .map_err(|e| AppError::Storage(format!("Failed to update card sources: {e}")))?;

    info!("Card sources updated ({count} cards)");
    Ok(Json(AdminMessage {
        success: true,
        message: format!("Card sources updated ({count} cards)"),
    }))
}

async fn write_with_backup(path: &Path, content: &Value) -> anyhow::Result<()> {
    if tokio::fs::try_exists(path).await? {
        tokio::fs::copy(path, path.with_extension("json.backup")).await?;
    } else if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_string_pretty(content)?;
    tokio::fs::write(path, body).await?;
    Ok(())
}
