//! Wrapper for secrets such as the admin password and API keys.
//!
//! The inner string is zeroed on drop and never printed: `Debug`, `Display`
//! and `Serialize` all emit a redaction marker.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that zeroes its memory on drop and redacts itself in output.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Returns the secret. Callers must not log or persist the result.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	/// Runs `f` with the secret, keeping the exposure scoped.
	pub fn with_exposed<F, R>(&self, f: F) -> R
	where
		F: FnOnce(&str) -> R,
	{
		f(&self.0)
	}

	/// Compares against a candidate without short-circuiting on the first
	/// differing byte.
	pub fn matches(&self, candidate: &str) -> bool {
		let a = self.0.as_bytes();
		let b = candidate.as_bytes();
		let mut diff = a.len() ^ b.len();
		for (i, byte) in b.iter().enumerate() {
			let expected = a.get(i).copied().unwrap_or(0);
			diff |= (expected ^ byte) as usize;
		}
		diff == 0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.matches(other.expose_secret())
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_secret_is_redacted_everywhere() {
		let secret = SecretString::from("mochi-2024");
		assert_eq!(format!("{:?}", secret), "SecretString(***REDACTED***)");
		assert_eq!(secret.to_string(), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&secret).unwrap(),
			"\"***REDACTED***\""
		);
		assert_eq!(secret.expose_secret(), "mochi-2024");
	}

	#[test]
	fn test_matches() {
		let secret = SecretString::from("mochi-2024");
		assert!(secret.matches("mochi-2024"));
		assert!(!secret.matches("mochi-2025"));
		assert!(!secret.matches("mochi"));
		assert!(!secret.matches("mochi-2024-extra"));
		assert!(!secret.matches(""));
	}

	#[test]
	fn test_deserialize_from_toml() {
		#[derive(Deserialize)]
		struct Auth {
			admin_password: SecretString,
		}
		let auth: Auth = toml::from_str("admin_password = \"hunter2\"").unwrap();
		assert_eq!(auth.admin_password.len(), 7);
		assert!(auth.admin_password.matches("hunter2"));
	}
}
