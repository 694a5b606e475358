//! Catalog endpoints.

use super::{api_error, auth::Admin};
use crate::server::AppState;
use axum::{extract::State, response::Json};
use serde::Serialize;
use tracker_types::{APIError, Catalog};

/// The merged catalog plus the order categories should be rendered in.
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
	pub categories: Vec<String>,
	pub options: Catalog,
}

impl From<&Catalog> for CatalogResponse {
	fn from(catalog: &Catalog) -> Self {
		Self {
			categories: catalog.categories().into_iter().map(String::from).collect(),
			options: catalog.clone(),
		}
	}
}

/// GET /api/catalog
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
	Json(CatalogResponse::from(state.engine.catalog().as_ref()))
}

/// PUT /api/admin/catalog
///
/// Replaces the whole stored document and reports the outcome directly.
pub async fn save_catalog(
	_admin: Admin,
	State(state): State<AppState>,
	Json(catalog): Json<Catalog>,
) -> Result<Json<CatalogResponse>, APIError> {
	state.engine.save_catalog(catalog).await.map_err(|e| {
		tracing::error!(error = %e, "Catalog save failed");
		api_error(e)
	})?;
	Ok(Json(CatalogResponse::from(state.engine.catalog().as_ref())))
}
