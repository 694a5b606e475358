//! API types for the commission tracker HTTP API.
//!
//! This module defines the request and response bodies of the public and
//! admin endpoints together with the structured error type returned by every
//! handler.

use crate::{Order, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A catalog variant plus the chosen add-on names, in selection order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantSelection {
	pub category: String,
	pub variant: String,
	#[serde(default)]
	pub addons: Vec<String>,
}

/// Public intake form submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRequest {
	#[serde(flatten)]
	pub selection: VariantSelection,
	pub client_name: String,
	#[serde(default)]
	pub contact: Option<String>,
	#[serde(default)]
	pub notes: Option<String>,
}

/// Admin manual entry.
///
/// When `selection` is present the price and description are composed from
/// the catalog unless explicitly given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualOrderRequest {
	#[serde(default)]
	pub client_name: String,
	#[serde(default)]
	pub contact: Option<String>,
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(rename = "type", default)]
	pub order_type: Option<crate::OrderType>,
	#[serde(default)]
	pub price: Option<u32>,
	#[serde(default)]
	pub status: Option<OrderStatus>,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default)]
	pub thumbnail_url: Option<String>,
	#[serde(default)]
	pub selection: Option<VariantSelection>,
}

/// Acknowledgement of an accepted submission.
///
/// The order identifier is not returned; the order shows up in the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
	pub accepted: bool,
}

/// Search parameters for order listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
	/// Case-insensitive term matched against client name, title and id.
	#[serde(default)]
	pub search: Option<String>,
	/// `All` or one of the canonical status names.
	#[serde(default)]
	pub status: Option<String>,
}

/// Status filter of an order listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
	#[default]
	All,
	Only(OrderStatus),
}

impl OrderQuery {
	/// Parses the status parameter. Empty or `All` means no filter.
	pub fn status_filter(&self) -> Result<StatusFilter, String> {
		match self.status.as_deref().map(str::trim) {
			None | Some("") => Ok(StatusFilter::All),
			Some(s) if s.eq_ignore_ascii_case("all") => Ok(StatusFilter::All),
			Some(s) => s.parse().map(StatusFilter::Only),
		}
	}

	pub fn search_term(&self) -> &str {
		self.search.as_deref().map(str::trim).unwrap_or_default()
	}
}

/// Order listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdersResponse {
	pub orders: Vec<Order>,
	pub total: usize,
}

/// Rendering state of one lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
	Completed,
	Current,
	Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStep {
	pub status: OrderStatus,
	pub state: StepState,
}

/// Progress of an order through the lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProgress {
	pub order_id: String,
	pub status: OrderStatus,
	/// Share of the progress track to fill, in `0.0..=1.0`.
	pub fraction: f64,
	pub steps: Vec<ProgressStep>,
	pub can_advance: bool,
	pub can_retreat: bool,
}

/// Admin dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
	/// In discussion, deposit paid or queued.
	pub queue: usize,
	/// In production.
	pub active: usize,
	/// Completed or shipped.
	pub done: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
	pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
	pub token: String,
	pub artist_id: String,
	pub expires_at: DateTime<Utc>,
}

/// Outcome of a delete request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum DeleteResponse {
	/// Confirmation armed; repeat the request before it expires.
	Armed {
		order_id: String,
		expires_in_ms: u64,
	},
	/// Order permanently removed.
	Deleted { order_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistResponse {
	pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadQuery {
	pub filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
	pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub status: String,
	pub tracker_id: String,
	pub orders: usize,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed input (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Missing or expired admin session (401)
	Unauthorized { message: String },
	/// Unknown order, variant or category (404)
	NotFound { error_type: String, message: String },
	/// Conflicting catalog edit (409)
	Conflict { error_type: String, message: String },
	/// Input understood but rejected (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Backend unreachable or misconfigured (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	pub fn bad_request(error_type: &str, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type: error_type.to_string(),
			message: message.into(),
			details: None,
		}
	}

	pub fn not_found(error_type: &str, message: impl Into<String>) -> Self {
		APIError::NotFound {
			error_type: error_type.to_string(),
			message: message.into(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		APIError::InternalServerError {
			error_type: "INTERNAL_ERROR".to_string(),
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthorized { .. } => 401,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details, retry_after) = match self {
			APIError::BadRequest {
				error_type,
				message,
				details,
			}
			| APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type.as_str(), message, details.clone(), None),
			APIError::Unauthorized { message } => ("UNAUTHORIZED", message, None, None),
			APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type.as_str(), message, None, None),
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => (error_type.as_str(), message, None, *retry_after),
		};
		ErrorResponse {
			error: error.to_string(),
			message: message.clone(),
			details,
			retry_after,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			}
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			}
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_filter_parsing() {
		let q = |s: Option<&str>| OrderQuery {
			search: None,
			status: s.map(String::from),
		};
		assert_eq!(q(None).status_filter(), Ok(StatusFilter::All));
		assert_eq!(q(Some("All")).status_filter(), Ok(StatusFilter::All));
		assert_eq!(
			q(Some("queued")).status_filter(),
			Ok(StatusFilter::Only(OrderStatus::Queued))
		);
		assert!(q(Some("lost")).status_filter().is_err());
	}

	#[test]
	fn test_intake_request_flattens_selection() {
		let json = r#"{
			"category": "正方形", "variant": "10x10cm正方形",
			"addons": ["特殊亮片"], "clientName": "小星"
		}"#;
		let req: IntakeRequest = serde_json::from_str(json).unwrap();
		assert_eq!(req.selection.variant, "10x10cm正方形");
		assert_eq!(req.selection.addons, vec!["特殊亮片"]);
		assert!(req.notes.is_none());
	}

	#[test]
	fn test_error_response_shape() {
		let err = APIError::ServiceUnavailable {
			error_type: "STORAGE_UNAVAILABLE".into(),
			message: "offline".into(),
			retry_after: Some(5),
		};
		assert_eq!(err.status_code(), 503);
		let value = serde_json::to_value(err.to_error_response()).unwrap();
		assert_eq!(value["error"], "STORAGE_UNAVAILABLE");
		assert_eq!(value["retryAfter"], 5);

		let unauthorized = APIError::Unauthorized {
			message: "session expired".into(),
		};
		assert_eq!(unauthorized.to_error_response().error, "UNAUTHORIZED");
	}

	#[test]
	fn test_delete_response_is_tagged() {
		let value = serde_json::to_value(DeleteResponse::Armed {
			order_id: "c-1".into(),
			expires_in_ms: 3000,
		})
		.unwrap();
		assert_eq!(value["state"], "armed");
		assert_eq!(value["orderId"], "c-1");
	}
}
