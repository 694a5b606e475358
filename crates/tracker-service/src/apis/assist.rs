//! Drafting helpers for the admin.

use super::{api_error, auth::Admin};
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	response::Json,
};
use tracker_types::{truncate_id, APIError, AssistResponse};

/// POST /api/admin/orders/{id}/assist/update
pub async fn draft_update(
	_admin: Admin,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<AssistResponse>, APIError> {
	let text = state.engine.draft_client_update(&id).await.map_err(|e| {
		tracing::warn!(order_id = %truncate_id(&id), error = %e, "Drafting client update failed");
		api_error(e)
	})?;
	Ok(Json(AssistResponse { text }))
}

/// POST /api/admin/orders/{id}/assist/plan
pub async fn work_plan(
	_admin: Admin,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<AssistResponse>, APIError> {
	let text = state.engine.suggest_work_plan(&id).await.map_err(|e| {
		tracing::warn!(order_id = %truncate_id(&id), error = %e, "Work plan suggestion failed");
		api_error(e)
	})?;
	Ok(Json(AssistResponse { text }))
}
