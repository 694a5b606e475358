//! Image uploads.

use super::{api_error, auth::Admin};
use crate::server::AppState;
use axum::{
	body::Bytes,
	extract::{Query, State},
	response::Json,
};
use tracker_types::{APIError, UploadQuery, UploadResponse};

/// POST /api/admin/uploads?filename=
///
/// The request body is the raw image file.
pub async fn upload_image(
	_admin: Admin,
	State(state): State<AppState>,
	Query(query): Query<UploadQuery>,
	body: Bytes,
) -> Result<Json<UploadResponse>, APIError> {
	if body.is_empty() {
		return Err(APIError::bad_request("EMPTY_UPLOAD", "Request body is empty"));
	}
	let url = state
		.engine
		.upload_image(&query.filename, body.to_vec())
		.await
		.map_err(|e| {
			tracing::warn!(filename = %query.filename, error = %e, "Upload failed");
			api_error(e)
		})?;
	Ok(Json(UploadResponse { url }))
}
