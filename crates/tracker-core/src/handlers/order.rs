//! Order submission.
//!
//! Public intake and admin manual entry both end in `OrderStore::create`,
//! but compose the order differently: intake always derives title, price,
//! description and type from the chosen variant, while manual entry only
//! pre-fills what the admin left blank.

use crate::composer::{
	infer_intake_type, AddonPicker, infer_quick_add_type, intake_description, intake_title,
	quick_add_description, total_price,
};
use crate::stores::{CatalogStore, OrderStore, OrderStoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use tracker_types::{
	Catalog, IntakeRequest, ManualOrderRequest, NewOrder, OrderStatus, OrderType, ProductVariant,
	VariantSelection,
};

/// Client name used when the admin leaves it blank.
pub const DEFAULT_CLIENT_NAME: &str = "匿名委託人";
/// Title used when the admin leaves it blank.
pub const DEFAULT_TITLE: &str = "未命名訂單";

#[derive(Debug, Error)]
pub enum SubmissionError {
	#[error("Client name is required")]
	MissingClientName,
	#[error("Contact is required")]
	MissingContact,
	#[error("Variant '{variant}' not found in category '{category}'")]
	UnknownVariant { category: String, variant: String },
	#[error("Add-on '{addon}' is not offered for variant '{variant}'")]
	UnknownAddon { variant: String, addon: String },
	#[error(transparent)]
	Store(#[from] OrderStoreError),
}

fn non_empty(value: Option<&str>) -> Option<String> {
	value
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
}

/// Resolves a selection against the catalog. Add-ons must belong to the
/// variant; repeats are dropped keeping the first occurrence.
fn resolve<'a>(
	catalog: &'a Catalog,
	selection: &VariantSelection,
) -> Result<(&'a ProductVariant, Vec<String>), SubmissionError> {
	let variant = catalog
		.variant(&selection.category, &selection.variant)
		.ok_or_else(|| SubmissionError::UnknownVariant {
			category: selection.category.clone(),
			variant: selection.variant.clone(),
		})?;

	let mut picker = AddonPicker::new(variant);
	for name in &selection.addons {
		if picker.selected().contains(name) {
			continue;
		}
		if !picker.toggle(name) {
			return Err(SubmissionError::UnknownAddon {
				variant: variant.name.clone(),
				addon: name.clone(),
			});
		}
	}
	Ok((variant, picker.confirm()))
}

/// Builds the order for a public intake submission. Intake orders start
/// out queued.
pub fn intake_order(
	catalog: &Catalog,
	request: &IntakeRequest,
	artist_id: &str,
) -> Result<NewOrder, SubmissionError> {
	let client_name =
		non_empty(Some(&request.client_name)).ok_or(SubmissionError::MissingClientName)?;
	let contact = non_empty(request.contact.as_deref()).ok_or(SubmissionError::MissingContact)?;
	let (variant, addons) = resolve(catalog, &request.selection)?;
	let notes = non_empty(request.notes.as_deref());

	Ok(NewOrder {
		artist_id: artist_id.to_string(),
		title: intake_title(variant, &client_name),
		client_name,
		contact: Some(contact),
		description: intake_description(variant, &addons, notes.as_deref()),
		order_type: infer_intake_type(variant, &addons),
		price: total_price(variant, &addons),
		status: OrderStatus::Queued,
		notes,
		thumbnail_url: None,
	})
}

/// Builds the order for an admin manual entry. Fields the admin filled in
/// win over values derived from the optional variant selection.
pub fn manual_order(
	catalog: &Catalog,
	request: &ManualOrderRequest,
	artist_id: &str,
) -> Result<NewOrder, SubmissionError> {
	let mut description = String::new();
	let mut price = 0;
	let mut inferred_type = None;
	if let Some(selection) = &request.selection {
		let (variant, addons) = resolve(catalog, selection)?;
		description = quick_add_description(variant, &addons);
		price = total_price(variant, &addons);
		inferred_type = infer_quick_add_type(&addons);
	}

	Ok(NewOrder {
		artist_id: artist_id.to_string(),
		client_name: non_empty(Some(&request.client_name))
			.unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string()),
		contact: non_empty(request.contact.as_deref()),
		title: non_empty(Some(&request.title)).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
		description: request.description.clone().unwrap_or(description),
		order_type: request
			.order_type
			.or(inferred_type)
			.unwrap_or(OrderType::Charm),
		price: request.price.unwrap_or(price),
		status: request.status.unwrap_or(OrderStatus::InDiscussion),
		notes: non_empty(request.notes.as_deref()),
		thumbnail_url: non_empty(request.thumbnail_url.as_deref()),
	})
}

/// Submits new orders against the live catalog.
pub struct OrderHandler {
	orders: Arc<OrderStore>,
	catalog: Arc<CatalogStore>,
	artist_id: String,
}

impl OrderHandler {
	pub fn new(orders: Arc<OrderStore>, catalog: Arc<CatalogStore>, artist_id: String) -> Self {
		Self {
			orders,
			catalog,
			artist_id,
		}
	}

	#[instrument(skip_all, fields(category = %request.selection.category, variant = %request.selection.variant))]
	pub async fn submit_intake(&self, request: &IntakeRequest) -> Result<(), SubmissionError> {
		let order = intake_order(&self.catalog.current(), request, &self.artist_id)?;
		self.orders.create(order).await?;
		Ok(())
	}

	/// Creates an order on behalf of the signed-in artist.
	#[instrument(skip_all, fields(artist_id = %artist_id))]
	pub async fn create_manual(
		&self,
		artist_id: &str,
		request: &ManualOrderRequest,
	) -> Result<(), SubmissionError> {
		let order = manual_order(&self.catalog.current(), request, artist_id)?;
		self.orders.create(order).await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::composer::TAG_ADDON;
	use crate::samples::default_catalog;

	fn selection(category: &str, variant: &str, addons: &[&str]) -> VariantSelection {
		VariantSelection {
			category: category.into(),
			variant: variant.into(),
			addons: addons.iter().map(|a| a.to_string()).collect(),
		}
	}

	fn intake(addons: &[&str]) -> IntakeRequest {
		IntakeRequest {
			selection: selection("正方形", "10x10cm正方形", addons),
			client_name: " 小星 ".into(),
			contact: Some("line:123456".into()),
			notes: Some("想要粉色".into()),
		}
	}

	#[test]
	fn test_intake_composes_from_variant() {
		let order = intake_order(default_catalog(), &intake(&["特殊亮片", TAG_ADDON]), "肉圓").unwrap();
		assert_eq!(order.client_name, "小星");
		assert_eq!(order.title, "10x10cm正方形 - 小星");
		assert_eq!(order.price, 190);
		assert_eq!(order.order_type, OrderType::Charm);
		assert_eq!(order.status, OrderStatus::Queued);
		assert!(order.description.contains("特殊亮片 (+30元)"));
		assert!(order.description.ends_with("---客戶備註---\n想要粉色"));
		assert_eq!(order.notes.as_deref(), Some("想要粉色"));
	}

	#[test]
	fn test_repeated_addon_counts_once() {
		let order = intake_order(
			default_catalog(),
			&intake(&["特殊亮片", TAG_ADDON, "特殊亮片"]),
			"肉圓",
		)
		.unwrap();
		assert_eq!(order.price, 190);
		assert_eq!(order.description.matches("特殊亮片").count(), 1);
	}

	#[test]
	fn test_intake_requires_name_and_contact() {
		let mut request = intake(&[]);
		request.client_name = "  ".into();
		assert!(matches!(
			intake_order(default_catalog(), &request, "肉圓"),
			Err(SubmissionError::MissingClientName)
		));

		let mut request = intake(&[]);
		request.contact = None;
		assert!(matches!(
			intake_order(default_catalog(), &request, "肉圓"),
			Err(SubmissionError::MissingContact)
		));
	}

	#[test]
	fn test_unknown_selection_is_rejected() {
		let mut request = intake(&["磁吸款"]);
		assert!(matches!(
			intake_order(default_catalog(), &request, "肉圓"),
			Err(SubmissionError::UnknownAddon { .. })
		));

		request.selection = selection("正方形", "不存在", &[]);
		assert!(matches!(
			intake_order(default_catalog(), &request, "肉圓"),
			Err(SubmissionError::UnknownVariant { .. })
		));
	}

	#[test]
	fn test_manual_entry_defaults() {
		let order = manual_order(default_catalog(), &ManualOrderRequest::default(), "肉圓").unwrap();
		assert_eq!(order.client_name, DEFAULT_CLIENT_NAME);
		assert_eq!(order.title, DEFAULT_TITLE);
		assert_eq!(order.status, OrderStatus::InDiscussion);
		assert_eq!(order.order_type, OrderType::Charm);
		assert_eq!(order.price, 0);
		assert_eq!(order.artist_id, "肉圓");
	}

	#[test]
	fn test_manual_entry_quick_add_prefills_blank_fields() {
		let request = ManualOrderRequest {
			client_name: "阿光".into(),
			selection: Some(selection("正方形", "10x10cm正方形", &["PET膠帶"])),
			..Default::default()
		};
		let order = manual_order(default_catalog(), &request, "肉圓").unwrap();
		assert_eq!(order.price, 140);
		assert_eq!(order.description, "選擇規格: 10x10cm正方形\n加價購: PET膠帶 (+20元)\n");

		let overridden = ManualOrderRequest {
			price: Some(99),
			order_type: Some(OrderType::Brick),
			..request
		};
		let order = manual_order(default_catalog(), &overridden, "肉圓").unwrap();
		assert_eq!(order.price, 99);
		assert_eq!(order.order_type, OrderType::Brick);
	}
}
