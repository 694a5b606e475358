//! Admin session authority.
//!
//! The admin password is checked here, never by the caller. A successful
//! login yields an opaque bearer token that unlocks the admin operations
//! until it expires or is logged out.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracker_types::{truncate_id, SecretString};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
	#[error("Invalid admin password")]
	InvalidPassword,
	#[error("Unknown or revoked session token")]
	InvalidToken,
	#[error("Session expired, log in again")]
	Expired,
}

/// An issued admin session.
#[derive(Debug, Clone)]
pub struct AdminSession {
	pub token: String,
	pub artist_id: String,
	pub expires_at: DateTime<Utc>,
}

struct SessionEntry {
	artist_id: String,
	deadline: Instant,
}

pub struct AdminAuth {
	password: SecretString,
	ttl: Duration,
	artist_id: String,
	sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl AdminAuth {
	pub fn new(password: SecretString, ttl: Duration, artist_id: impl Into<String>) -> Self {
		Self {
			password,
			ttl,
			artist_id: artist_id.into(),
			sessions: RwLock::new(HashMap::new()),
		}
	}

	/// Verifies `password` and opens a session tagged with the configured
	/// artist.
	pub async fn login(&self, password: &str) -> Result<AdminSession, AuthError> {
		if !self.password.matches(password) {
			tracing::warn!("Rejected admin login");
			return Err(AuthError::InvalidPassword);
		}

		let token = uuid::Uuid::new_v4().simple().to_string();
		let expires_at = Utc::now()
			+ chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(12));

		let mut sessions = self.sessions.write().await;
		// Expired entries are only otherwise removed when presented.
		let now = Instant::now();
		sessions.retain(|_, entry| entry.deadline > now);
		sessions.insert(
			token.clone(),
			SessionEntry {
				artist_id: self.artist_id.clone(),
				deadline: now + self.ttl,
			},
		);
		tracing::info!(session = %truncate_id(&token), artist_id = %self.artist_id, "Admin logged in");

		Ok(AdminSession {
			token,
			artist_id: self.artist_id.clone(),
			expires_at,
		})
	}

	/// Returns the artist bound to `token` if the session is still valid.
	pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
		{
			let sessions = self.sessions.read().await;
			match sessions.get(token) {
				None => return Err(AuthError::InvalidToken),
				Some(entry) if entry.deadline > Instant::now() => {
					return Ok(entry.artist_id.clone())
				},
				Some(_) => {},
			}
		}
		self.sessions.write().await.remove(token);
		tracing::debug!(session = %truncate_id(token), "Admin session expired");
		Err(AuthError::Expired)
	}

	/// Drops the session. Returns whether the token was known.
	pub async fn logout(&self, token: &str) -> bool {
		let removed = self.sessions.write().await.remove(token).is_some();
		if removed {
			tracing::info!(session = %truncate_id(token), "Admin logged out");
		}
		removed
	}

	pub async fn active_sessions(&self) -> usize {
		let now = Instant::now();
		self.sessions
			.read()
			.await
			.values()
			.filter(|entry| entry.deadline > now)
			.count()
	}
}
