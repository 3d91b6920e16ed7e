use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::error::AppError;

/// Liveness plus a database ping.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.ping().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "db": "ok",
    })))
}
