//! HTTP handlers for the tracker API.
//!
//! Each submodule owns one resource. Engine errors are translated into
//! `APIError` here so every handler reports failures the same way.

pub mod assist;
pub mod auth;
pub mod catalog;
pub mod media;
pub mod orders;
pub mod session;

use tracker_assist::AssistError;
use tracker_core::handlers::SubmissionError;
use tracker_core::{CatalogStoreError, OrderStoreError, TrackerError};
use tracker_media::MediaError;
use tracker_types::{APIError, CatalogError};

/// Seconds a client should wait before retrying after a storage outage.
const STORAGE_RETRY_AFTER: u64 = 5;

fn storage_unavailable(message: String) -> APIError {
	APIError::ServiceUnavailable {
		error_type: "STORAGE_UNAVAILABLE".into(),
		message,
		retry_after: Some(STORAGE_RETRY_AFTER),
	}
}

fn permission_denied(message: String) -> APIError {
	APIError::ServiceUnavailable {
		error_type: "STORAGE_PERMISSION_DENIED".into(),
		message: format!(
			"{}. Check the access rules of the storage backend",
			message
		),
		retry_after: None,
	}
}

fn order_store_error(err: OrderStoreError) -> APIError {
	match err {
		OrderStoreError::NotFound(id) => {
			APIError::not_found("ORDER_NOT_FOUND", format!("Order not found: {}", id))
		},
		OrderStoreError::PermissionDenied(msg) => permission_denied(msg),
		OrderStoreError::Unavailable(msg) => storage_unavailable(msg),
		OrderStoreError::Storage(msg) => APIError::internal(msg),
	}
}

fn unprocessable(error_type: &str, message: String) -> APIError {
	APIError::UnprocessableEntity {
		error_type: error_type.into(),
		message,
		details: None,
	}
}

/// Maps an engine failure onto its HTTP error.
pub fn api_error(err: TrackerError) -> APIError {
	match err {
		TrackerError::Orders(e) => order_store_error(e),
		TrackerError::Catalog(e) => match e {
			CatalogStoreError::PermissionDenied(msg) => permission_denied(msg),
			CatalogStoreError::Unavailable(msg) => storage_unavailable(msg),
			CatalogStoreError::Storage(msg) => APIError::internal(msg),
		},
		TrackerError::CatalogEdit(e) => match e {
			CatalogError::DuplicateVariant { .. } => APIError::Conflict {
				error_type: "DUPLICATE_VARIANT".into(),
				message: e.to_string(),
			},
			CatalogError::CategoryNotFound(_) | CatalogError::VariantNotFound { .. } => {
				APIError::not_found("CATALOG_ENTRY_NOT_FOUND", e.to_string())
			},
			CatalogError::AddonOutOfRange { .. } | CatalogError::EmptyName => {
				unprocessable("INVALID_CATALOG_EDIT", e.to_string())
			},
		},
		TrackerError::Auth(e) => APIError::Unauthorized {
			message: e.to_string(),
		},
		TrackerError::Submission(e) => match e {
			SubmissionError::MissingClientName | SubmissionError::MissingContact => {
				unprocessable("MISSING_FIELD", e.to_string())
			},
			SubmissionError::UnknownVariant { .. } => {
				APIError::not_found("VARIANT_NOT_FOUND", e.to_string())
			},
			SubmissionError::UnknownAddon { .. } => unprocessable("UNKNOWN_ADDON", e.to_string()),
			SubmissionError::Store(e) => order_store_error(e),
		},
		TrackerError::Assist(e) => match e {
			AssistError::Configuration(_) => APIError::ServiceUnavailable {
				error_type: "ASSIST_NOT_CONFIGURED".into(),
				message: e.to_string(),
				retry_after: None,
			},
			AssistError::Network(_) | AssistError::Unavailable(_) => APIError::ServiceUnavailable {
				error_type: "ASSIST_UNAVAILABLE".into(),
				message: e.to_string(),
				retry_after: None,
			},
			AssistError::Internal(msg) => APIError::internal(msg),
		},
		TrackerError::Media(e) => match e {
			MediaError::UnsupportedFormat(_) => unprocessable("UNSUPPORTED_IMAGE", e.to_string()),
			MediaError::Timeout(_) => unprocessable("IMAGE_TIMEOUT", e.to_string()),
			MediaError::Encode(msg) => APIError::internal(msg),
			MediaError::Store(_) | MediaError::Configuration(_) => APIError::ServiceUnavailable {
				error_type: "MEDIA_UNAVAILABLE".into(),
				message: e.to_string(),
				retry_after: None,
			},
		},
		TrackerError::Invalid(msg) => APIError::bad_request("INVALID_REQUEST", msg),
		TrackerError::NotConfigured(component) => APIError::ServiceUnavailable {
			error_type: "NOT_CONFIGURED".into(),
			message: format!("{} is not configured on this tracker", component),
			retry_after: None,
		},
	}
}
