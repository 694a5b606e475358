//! Order endpoints: public intake and search, admin management.

use super::{api_error, auth::Admin};
use crate::server::AppState;
use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	response::Json,
};
use tracker_types::{
	AcceptedResponse, APIError, DeleteResponse, IntakeRequest, ManualOrderRequest, Order,
	OrderPatch, OrderProgress, OrderQuery, OrderStats, OrdersResponse,
};

fn listing(orders: Vec<Order>) -> Json<OrdersResponse> {
	let total = orders.len();
	Json(OrdersResponse { orders, total })
}

/// POST /api/orders
pub async fn submit_order(
	State(state): State<AppState>,
	Json(request): Json<IntakeRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), APIError> {
	state.engine.submit_intake(&request).await.map_err(|e| {
		tracing::warn!(error = %e, "Intake submission rejected");
		api_error(e)
	})?;
	Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

/// GET /api/orders
pub async fn search_orders(
	State(state): State<AppState>,
	Query(query): Query<OrderQuery>,
) -> Result<Json<OrdersResponse>, APIError> {
	let orders = state.engine.list_orders(&query, false).map_err(api_error)?;
	Ok(listing(orders))
}

/// GET /api/orders/{id}/progress
pub async fn get_progress(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<OrderProgress>, APIError> {
	state.engine.progress(&id).map(Json).map_err(api_error)
}

/// GET /api/admin/orders
pub async fn list_orders(
	_admin: Admin,
	State(state): State<AppState>,
	Query(query): Query<OrderQuery>,
) -> Result<Json<OrdersResponse>, APIError> {
	let orders = state.engine.list_orders(&query, true).map_err(api_error)?;
	Ok(listing(orders))
}

/// GET /api/admin/stats
pub async fn get_stats(_admin: Admin, State(state): State<AppState>) -> Json<OrderStats> {
	Json(state.engine.stats())
}

/// POST /api/admin/orders
pub async fn create_order(
	admin: Admin,
	State(state): State<AppState>,
	Json(request): Json<ManualOrderRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), APIError> {
	state
		.engine
		.create_manual(&admin.artist_id, &request)
		.await
		.map_err(api_error)?;
	Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { accepted: true })))
}

/// PATCH /api/admin/orders/{id}
pub async fn update_order(
	_admin: Admin,
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(patch): Json<OrderPatch>,
) -> Result<Json<Order>, APIError> {
	state
		.engine
		.update_order(&id, &patch)
		.await
		.map(Json)
		.map_err(api_error)
}

/// POST /api/admin/orders/{id}/advance
pub async fn advance_order(
	_admin: Admin,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	state.engine.advance(&id).await.map(Json).map_err(api_error)
}

/// POST /api/admin/orders/{id}/retreat
pub async fn retreat_order(
	_admin: Admin,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Order>, APIError> {
	state.engine.retreat(&id).await.map(Json).map_err(api_error)
}

/// DELETE /api/admin/orders/{id}
pub async fn delete_order(
	_admin: Admin,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, APIError> {
	state
		.engine
		.request_delete(&id)
		.await
		.map(Json)
		.map_err(api_error)
}
