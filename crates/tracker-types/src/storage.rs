//! Collection names used by the document storage.

use std::str::FromStr;

/// Document collections known to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// One document per order, keyed by order id.
	Commissions,
	/// The catalog, stored as a single document.
	ProductOptions,
}

/// Document id of the catalog inside [`StorageKey::ProductOptions`].
pub const CATALOG_DOCUMENT_ID: &str = "singleton";

impl StorageKey {
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Commissions => "commissions",
			StorageKey::ProductOptions => "product_options",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Commissions, Self::ProductOptions].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all().find(|k| k.as_str() == s).ok_or(())
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
