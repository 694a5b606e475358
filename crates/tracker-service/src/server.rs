//! HTTP server for the commission tracker API.
//!
//! Public routes serve the catalog, intake form and order search. Routes
//! under `/api/admin` require a bearer token issued by `POST /api/session`.

use crate::apis;
use axum::{
	extract::{DefaultBodyLimit, State},
	http::{HeaderName, HeaderValue, Method},
	response::Json,
	routing::{get, patch, post, put},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};
use tracker_config::{ApiConfig, CorsConfig};
use tracker_core::TrackerEngine;
use tracker_types::HealthResponse;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<TrackerEngine>,
}

/// Builds the CORS layer. Without a `[api.cors]` section every origin is
/// allowed.
fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origin = if cors.allowed_origins.iter().any(|o| o == "*") {
		AllowOrigin::any()
	} else {
		AllowOrigin::list(
			cors.allowed_origins
				.iter()
				.filter_map(|o| HeaderValue::from_str(o).ok()),
		)
	};
	let mut layer = CorsLayer::new().allow_origin(origin);

	if cors.allowed_methods.is_empty() {
		layer = layer.allow_methods(Any);
	} else {
		layer = layer.allow_methods(
			cors.allowed_methods
				.iter()
				.filter_map(|m| m.parse::<Method>().ok())
				.collect::<Vec<_>>(),
		);
	}
	if cors.allowed_headers.is_empty() {
		layer.allow_headers(Any)
	} else {
		layer.allow_headers(
			cors.allowed_headers
				.iter()
				.filter_map(|h| h.parse::<HeaderName>().ok())
				.collect::<Vec<_>>(),
		)
	}
}

/// Assembles the router with every route and middleware layer.
pub fn build_router(api_config: &ApiConfig, engine: Arc<TrackerEngine>) -> Router {
	let state = AppState { engine };

	let admin = Router::new()
		.route(
			"/orders",
			get(apis::orders::list_orders).post(apis::orders::create_order),
		)
		.route(
			"/orders/{id}",
			patch(apis::orders::update_order).delete(apis::orders::delete_order),
		)
		.route("/orders/{id}/advance", post(apis::orders::advance_order))
		.route("/orders/{id}/retreat", post(apis::orders::retreat_order))
		.route("/orders/{id}/assist/update", post(apis::assist::draft_update))
		.route("/orders/{id}/assist/plan", post(apis::assist::work_plan))
		.route("/stats", get(apis::orders::get_stats))
		.route("/catalog", put(apis::catalog::save_catalog))
		.route("/uploads", post(apis::media::upload_image));

	let api = Router::new()
		.route("/health", get(handle_health))
		.route("/catalog", get(apis::catalog::get_catalog))
		.route(
			"/orders",
			get(apis::orders::search_orders).post(apis::orders::submit_order),
		)
		.route("/orders/{id}/progress", get(apis::orders::get_progress))
		.route(
			"/session",
			post(apis::session::login).delete(apis::session::logout),
		)
		.nest("/admin", admin);

	Router::new()
		.nest("/api", api)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(cors_layer(api_config.cors.as_ref())),
		)
		.layer(DefaultBodyLimit::max(api_config.max_request_size))
		.with_state(state)
}

/// Binds the configured address and serves until the task is dropped.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<TrackerEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(&api_config, engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Commission tracker API listening on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// GET /api/health
async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "ok".to_string(),
		tracker_id: state.engine.config().tracker.id.clone(),
		orders: state.engine.orders().list().len(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory_registry::build_tracker_from_config;
	use axum::body::{to_bytes, Body};
	use axum::http::{header, Request, StatusCode};
	use serde_json::{json, Value};
	use tower::ServiceExt;
	use tracker_config::builders::ConfigBuilder;

	async fn app() -> (Router, Arc<TrackerEngine>) {
		let config = ConfigBuilder::new()
			.admin_password("hunter2")
			.with_mock_assist()
			.with_memory_media()
			.build();
		let engine = Arc::new(build_tracker_from_config(config).unwrap());
		engine.initialize().await.unwrap();
		let api_config: ApiConfig = toml::from_str("enabled = true").unwrap();
		(build_router(&api_config, engine.clone()), engine)
	}

	async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, body)
	}

	fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
		let mut builder = Request::builder()
			.method(method)
			.uri(uri)
			.header(header::CONTENT_TYPE, "application/json");
		if let Some(token) = token {
			builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		builder.body(Body::from(body.to_string())).unwrap()
	}

	fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
		let mut builder = Request::builder().uri(uri);
		if let Some(token) = token {
			builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
		}
		builder.body(Body::empty()).unwrap()
	}

	async fn login(app: &Router) -> String {
		let (status, body) = send(
			app,
			json_request("POST", "/api/session", json!({ "password": "hunter2" }), None),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		body["token"].as_str().unwrap().to_string()
	}

	#[tokio::test]
	async fn test_health_and_catalog() {
		let (app, engine) = app().await;
		let (status, body) = send(&app, get_request("/api/health", None)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["orders"], 4);

		let (status, body) = send(&app, get_request("/api/catalog", None)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["categories"][0], "正方形");
		assert!(body["options"]["雙色磚"].is_array());
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_intake_then_public_search() {
		let (app, engine) = app().await;
		let intake = json!({
			"category": "正方形",
			"variant": "10x10cm正方形",
			"addons": [],
			"clientName": "阿月",
			"contact": "@moon"
		});
		let (status, body) = send(&app, json_request("POST", "/api/orders", intake, None)).await;
		assert_eq!(status, StatusCode::ACCEPTED);
		assert_eq!(body["accepted"], true);

		let (_, body) = send(&app, get_request("/api/orders", None)).await;
		assert_eq!(body["total"], 0);

		let uri = format!("/api/orders?search={}", "%E9%98%BF%E6%9C%88");
		let (status, body) = send(&app, get_request(&uri, None)).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["total"], 1);
		assert_eq!(body["orders"][0]["status"], "queued");
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_intake_without_contact_is_rejected() {
		let (app, engine) = app().await;
		let intake = json!({
			"category": "正方形",
			"variant": "10x10cm正方形",
			"clientName": "阿月"
		});
		let (status, body) = send(&app, json_request("POST", "/api/orders", intake, None)).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "MISSING_FIELD");
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_admin_routes_require_session() {
		let (app, engine) = app().await;
		let (status, _) = send(&app, get_request("/api/admin/stats", None)).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		let (status, _) = send(&app, get_request("/api/admin/stats", Some("forged"))).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);

		let (status, _) = send(
			&app,
			json_request("POST", "/api/session", json!({ "password": "wrong" }), None),
		)
		.await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);

		let token = login(&app).await;
		let (status, body) = send(&app, get_request("/api/admin/stats", Some(&token))).await;
		assert_eq!(status, StatusCode::OK);
		assert!(body["queue"].is_number());

		let logout = Request::builder()
			.method("DELETE")
			.uri("/api/session")
			.header(header::AUTHORIZATION, format!("Bearer {}", token))
			.body(Body::empty())
			.unwrap();
		let (status, _) = send(&app, logout).await;
		assert_eq!(status, StatusCode::NO_CONTENT);
		let (status, _) = send(&app, get_request("/api/admin/stats", Some(&token))).await;
		assert_eq!(status, StatusCode::UNAUTHORIZED);
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_admin_edits_and_two_step_delete() {
		let (app, engine) = app().await;
		let token = login(&app).await;

		let (status, body) = send(
			&app,
			json_request("PATCH", "/api/admin/orders/c-101", json!({ "price": 999 }), Some(&token)),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["price"], 999);

		let (status, body) = send(
			&app,
			json_request("POST", "/api/admin/orders/c-101/advance", json!({}), Some(&token)),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["status"], "completed");

		let (_, body) = send(
			&app,
			json_request("DELETE", "/api/admin/orders/c-101", json!({}), Some(&token)),
		)
		.await;
		assert_eq!(body["state"], "armed");
		let (_, body) = send(
			&app,
			json_request("DELETE", "/api/admin/orders/c-101", json!({}), Some(&token)),
		)
		.await;
		assert_eq!(body["state"], "deleted");

		let (status, _) = send(&app, get_request("/api/orders/c-101/progress", None)).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_manual_entry_and_assist() {
		let (app, engine) = app().await;
		let token = login(&app).await;

		let (status, _) = send(
			&app,
			json_request(
				"POST",
				"/api/admin/orders",
				json!({ "clientName": "", "title": "" }),
				Some(&token),
			),
		)
		.await;
		assert_eq!(status, StatusCode::ACCEPTED);

		let uri = format!("/api/admin/orders?search={}", "%E5%8C%BF%E5%90%8D");
		let (_, body) = send(&app, get_request(&uri, Some(&token))).await;
		assert_eq!(body["total"], 1);
		assert_eq!(body["orders"][0]["status"], "in discussion");

		let (status, body) = send(
			&app,
			json_request("POST", "/api/admin/orders/c-102/assist/plan", json!({}), Some(&token)),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert!(!body["text"].as_str().unwrap().is_empty());
		engine.shutdown().await.unwrap();
	}

	#[tokio::test]
	async fn test_upload_rejects_non_image() {
		let (app, engine) = app().await;
		let token = login(&app).await;
		let request = Request::builder()
			.method("POST")
			.uri("/api/admin/uploads?filename=cover.png")
			.header(header::AUTHORIZATION, format!("Bearer {}", token))
			.body(Body::from("not an image"))
			.unwrap();
		let (status, body) = send(&app, request).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "UNSUPPORTED_IMAGE");
		engine.shutdown().await.unwrap();
	}

	#[test]
	fn test_cors_layer_accepts_config() {
		let cors = CorsConfig {
			allowed_origins: vec!["https://shop.example".into()],
			allowed_headers: vec!["authorization".into()],
			allowed_methods: vec!["GET".into(), "POST".into()],
		};
		let _ = cors_layer(Some(&cors));
		let _ = cors_layer(None);
	}
}
