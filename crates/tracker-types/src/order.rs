//! Commission order types for the tracker.
//!
//! This module defines the order document as it is persisted in the
//! `commissions` collection, the fixed seven-step lifecycle status, the
//! order type labels, and the payloads used to create and patch orders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single customer commission tracked through its lifecycle.
///
/// Field names follow the camelCase document shape stored in the backend so
/// documents written by earlier clients deserialize unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Identifier assigned by the store on creation.
	pub id: String,
	/// Tag of the artist that owns this commission.
	#[serde(default = "default_artist_id")]
	pub artist_id: String,
	/// Display name of the client.
	pub client_name: String,
	/// Optional contact handle (e.g. "line:123456").
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contact: Option<String>,
	/// Short title shown on the order card.
	pub title: String,
	/// Free-text description of the commission.
	pub description: String,
	/// Order type label.
	#[serde(rename = "type")]
	pub order_type: OrderType,
	/// Price in whole currency units.
	pub price: u32,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Date the order was created.
	pub date_added: NaiveDate,
	/// Date of the last status or field mutation.
	pub last_updated: NaiveDate,
	/// Optional free-text notes from the client.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Optional thumbnail image URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_url: Option<String>,
}

fn default_artist_id() -> String {
	"Unknown".to_string()
}

impl Order {
	/// Builds a full order from a creation payload, stamping both dates with `today`.
	pub fn from_new(id: impl Into<String>, new: NewOrder, today: NaiveDate) -> Self {
		Self {
			id: id.into(),
			artist_id: new.artist_id,
			client_name: new.client_name,
			contact: new.contact,
			title: new.title,
			description: new.description,
			order_type: new.order_type,
			price: new.price,
			status: new.status,
			date_added: today,
			last_updated: today,
			notes: new.notes,
			thumbnail_url: new.thumbnail_url,
		}
	}
}

/// Lifecycle status of a commission.
///
/// The variants form a total order from [`OrderStatus::Applying`] (initial)
/// to [`OrderStatus::Shipped`] (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderStatus {
	#[serde(rename = "applying")]
	Applying,
	#[serde(rename = "in discussion")]
	InDiscussion,
	#[serde(rename = "deposit paid")]
	DepositPaid,
	#[serde(rename = "queued")]
	Queued,
	#[serde(rename = "in production")]
	InProduction,
	#[serde(rename = "completed")]
	Completed,
	#[serde(rename = "shipped")]
	Shipped,
}

impl OrderStatus {
	/// All statuses in lifecycle order.
	pub const ALL: [OrderStatus; 7] = [
		OrderStatus::Applying,
		OrderStatus::InDiscussion,
		OrderStatus::DepositPaid,
		OrderStatus::Queued,
		OrderStatus::InProduction,
		OrderStatus::Completed,
		OrderStatus::Shipped,
	];

	/// Zero-based position of this status in the lifecycle.
	pub fn index(self) -> usize {
		self as usize
	}

	/// Returns the status at `index`, if any.
	pub fn from_index(index: usize) -> Option<Self> {
		Self::ALL.get(index).copied()
	}

	/// The following status, or `None` at the terminal status.
	pub fn next(self) -> Option<Self> {
		Self::from_index(self.index() + 1)
	}

	/// The preceding status, or `None` at the initial status.
	pub fn previous(self) -> Option<Self> {
		self.index().checked_sub(1).and_then(Self::from_index)
	}

	pub fn is_initial(self) -> bool {
		self == OrderStatus::Applying
	}

	pub fn is_terminal(self) -> bool {
		self == OrderStatus::Shipped
	}

	/// Returns the canonical string form stored in documents.
	pub fn as_str(self) -> &'static str {
		match self {
			OrderStatus::Applying => "applying",
			OrderStatus::InDiscussion => "in discussion",
			OrderStatus::DepositPaid => "deposit paid",
			OrderStatus::Queued => "queued",
			OrderStatus::InProduction => "in production",
			OrderStatus::Completed => "completed",
			OrderStatus::Shipped => "shipped",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| format!("Unknown order status: {}", s))
	}
}

/// Order type labels used by the shop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
	/// Hanging charm / keychain.
	#[default]
	#[serde(rename = "流麻吊飾")]
	Charm,
	/// Display stand.
	#[serde(rename = "流麻立牌")]
	Stand,
	/// Brick.
	#[serde(rename = "流麻磚")]
	Brick,
	/// Anything else.
	#[serde(rename = "其他客製")]
	Custom,
}

impl OrderType {
	pub const ALL: [OrderType; 4] = [
		OrderType::Charm,
		OrderType::Stand,
		OrderType::Brick,
		OrderType::Custom,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			OrderType::Charm => "流麻吊飾",
			OrderType::Stand => "流麻立牌",
			OrderType::Brick => "流麻磚",
			OrderType::Custom => "其他客製",
		}
	}
}

impl fmt::Display for OrderType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|t| t.as_str() == s.trim())
			.ok_or_else(|| format!("Unknown order type: {}", s))
	}
}

/// Payload for creating a new order.
///
/// The identifier and both dates are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
	pub artist_id: String,
	pub client_name: String,
	#[serde(default)]
	pub contact: Option<String>,
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(rename = "type", default)]
	pub order_type: OrderType,
	#[serde(default)]
	pub price: u32,
	pub status: OrderStatus,
	#[serde(default)]
	pub notes: Option<String>,
	#[serde(default)]
	pub thumbnail_url: Option<String>,
}

/// Partial update of an order's fields.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub client_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub contact: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
	pub order_type: Option<OrderType>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<OrderStatus>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thumbnail_url: Option<String>,
}

impl OrderPatch {
	/// Patch that only changes the status.
	pub fn status(status: OrderStatus) -> Self {
		Self {
			status: Some(status),
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}

	/// Applies the set fields to `order`. Dates are left to the caller.
	pub fn apply(&self, order: &mut Order) {
		if let Some(client_name) = &self.client_name {
			order.client_name = client_name.clone();
		}
		if let Some(contact) = &self.contact {
			order.contact = Some(contact.clone());
		}
		if let Some(title) = &self.title {
			order.title = title.clone();
		}
		if let Some(description) = &self.description {
			order.description = description.clone();
		}
		if let Some(order_type) = self.order_type {
			order.order_type = order_type;
		}
		if let Some(price) = self.price {
			order.price = price;
		}
		if let Some(status) = self.status {
			order.status = status;
		}
		if let Some(notes) = &self.notes {
			order.notes = Some(notes.clone());
		}
		if let Some(thumbnail_url) = &self.thumbnail_url {
			order.thumbnail_url = Some(thumbnail_url.clone());
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Order {
		Order::from_new(
			"c-1",
			NewOrder {
				artist_id: "肉圓".into(),
				client_name: "小星".into(),
				contact: None,
				title: "吊飾".into(),
				description: "雙層".into(),
				order_type: OrderType::Charm,
				price: 850,
				status: OrderStatus::Queued,
				notes: None,
				thumbnail_url: None,
			},
			NaiveDate::from_ymd_opt(2023, 10, 25).unwrap(),
		)
	}

	#[test]
	fn test_status_neighbours() {
		assert_eq!(OrderStatus::Applying.previous(), None);
		assert_eq!(OrderStatus::Applying.next(), Some(OrderStatus::InDiscussion));
		assert_eq!(OrderStatus::Completed.next(), Some(OrderStatus::Shipped));
		assert_eq!(OrderStatus::Shipped.next(), None);
		for (i, status) in OrderStatus::ALL.iter().enumerate() {
			assert_eq!(status.index(), i);
		}
	}

	#[test]
	fn test_status_serde_uses_canonical_names() {
		let json = serde_json::to_string(&OrderStatus::InDiscussion).unwrap();
		assert_eq!(json, "\"in discussion\"");
		let parsed: OrderStatus = serde_json::from_str("\"deposit paid\"").unwrap();
		assert_eq!(parsed, OrderStatus::DepositPaid);
		assert_eq!("In Production".parse::<OrderStatus>(), Ok(OrderStatus::InProduction));
		assert!("cancelled".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_order_type_defaults_to_charm() {
		assert_eq!(OrderType::default(), OrderType::Charm);
		assert_eq!(
			serde_json::to_string(&OrderType::default()).unwrap(),
			"\"流麻吊飾\""
		);
	}

	#[test]
	fn test_order_document_shape() {
		let order = sample();
		let value = serde_json::to_value(&order).unwrap();
		assert_eq!(value["clientName"], "小星");
		assert_eq!(value["type"], "流麻吊飾");
		assert_eq!(value["dateAdded"], "2023-10-25");
		assert!(value.get("contact").is_none());

		let back: Order = serde_json::from_value(value).unwrap();
		assert_eq!(back, order);
	}

	#[test]
	fn test_missing_artist_id_defaults() {
		let json = r#"{
			"id": "c-9", "clientName": "Momo", "title": "t", "description": "d",
			"type": "流麻磚", "price": 1500, "status": "queued",
			"dateAdded": "2023-11-01", "lastUpdated": "2023-11-01"
		}"#;
		let order: Order = serde_json::from_str(json).unwrap();
		assert_eq!(order.artist_id, "Unknown");
		assert_eq!(order.order_type, OrderType::Brick);
	}

	#[test]
	fn test_patch_preserves_untouched_fields() {
		let mut order = sample();
		let patch = OrderPatch {
			price: Some(990),
			description: Some("改成三層".into()),
			..OrderPatch::default()
		};
		patch.apply(&mut order);
		assert_eq!(order.price, 990);
		assert_eq!(order.description, "改成三層");
		assert_eq!(order.client_name, "小星");
		assert_eq!(order.status, OrderStatus::Queued);
		assert!(OrderPatch::default().is_empty());
		assert!(!patch.is_empty());
	}
}
