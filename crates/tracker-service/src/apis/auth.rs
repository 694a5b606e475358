//! Bearer-token extractors for admin routes.

use crate::server::AppState;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use tracker_types::APIError;

/// Raw bearer token from the `Authorization` header, unverified.
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.headers
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "))
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.map(|token| BearerToken(token.to_string()))
			.ok_or_else(|| APIError::Unauthorized {
				message: "Missing bearer token".into(),
			})
	}
}

/// A verified admin session. Handlers taking this only run for a live token.
pub struct Admin {
	pub artist_id: String,
}

impl FromRequestParts<AppState> for Admin {
	type Rejection = APIError;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
		let artist_id = state
			.engine
			.verify(&token)
			.await
			.map_err(super::api_error)?;
		Ok(Admin { artist_id })
	}
}
