//! Admin login and logout.

use super::{api_error, auth::BearerToken};
use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use tracker_types::{APIError, LoginRequest, LoginResponse};

/// POST /api/session
pub async fn login(
	State(state): State<AppState>,
	Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, APIError> {
	let session = state.engine.login(&request.password).await.map_err(api_error)?;
	Ok(Json(LoginResponse {
		token: session.token,
		artist_id: session.artist_id,
		expires_at: session.expires_at,
	}))
}

/// DELETE /api/session
///
/// Always succeeds; an unknown token is simply already logged out.
pub async fn logout(State(state): State<AppState>, BearerToken(token): BearerToken) -> StatusCode {
	state.engine.logout(&token).await;
	StatusCode::NO_CONTENT
}
