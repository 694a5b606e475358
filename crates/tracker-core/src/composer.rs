//! Price and description composition for catalog selections.
//!
//! A selection is one variant plus an ordered list of add-on names. Pricing
//! ignores order; descriptions list add-ons in the order they were picked.

use tracker_types::{OrderType, ProductVariant};

/// Add-on that turns an order into a display stand.
pub const STAND_ADDON: &str = "立牌款式";
/// Add-on that turns an order into a hanging charm.
pub const TAG_ADDON: &str = "吊牌款式";
/// Variant-name token that marks a brick.
pub const BRICK_TOKEN: &str = "磚";

/// Text used when the client left no notes.
const NO_NOTES: &str = "無";

/// Base price plus the price of every selected add-on found on the variant.
/// Unknown names add nothing.
pub fn total_price(variant: &ProductVariant, selected: &[String]) -> u32 {
	selected.iter().fold(variant.price, |total, name| {
		total.saturating_add(addon_price(variant, name))
	})
}

fn addon_price(variant: &ProductVariant, name: &str) -> u32 {
	variant.addon(name).map(|a| a.price).unwrap_or(0)
}

/// `name (+price元), ...` in selection order.
fn addon_line(variant: &ProductVariant, selected: &[String]) -> String {
	selected
		.iter()
		.map(|name| format!("{} (+{}元)", name, addon_price(variant, name)))
		.collect::<Vec<_>>()
		.join(", ")
}

/// Description pre-filled by the admin quick-add picker.
pub fn quick_add_description(variant: &ProductVariant, selected: &[String]) -> String {
	let mut description = format!("選擇規格: {}\n", variant.name);
	if !selected.is_empty() {
		description.push_str(&format!("加價購: {}\n", addon_line(variant, selected)));
	}
	description
}

/// Description of an order submitted through the public intake form. The
/// client's notes are appended after a separator.
pub fn intake_description(
	variant: &ProductVariant,
	selected: &[String],
	notes: Option<&str>,
) -> String {
	let mut description = format!("[客戶委託單]\n規格: {}\n", variant.name);
	if !selected.is_empty() {
		description.push_str(&format!("加價項目: {}\n", addon_line(variant, selected)));
	}
	let notes = notes.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(NO_NOTES);
	description.push_str(&format!("\n---客戶備註---\n{}", notes));
	description
}

/// Title of an intake order.
pub fn intake_title(variant: &ProductVariant, client_name: &str) -> String {
	format!("{} - {}", variant.name, client_name)
}

/// Order type implied by the selected add-ons on the admin quick-add path.
/// `None` leaves the type to the admin.
pub fn infer_quick_add_type(selected: &[String]) -> Option<OrderType> {
	if selected.iter().any(|a| a == STAND_ADDON) {
		Some(OrderType::Stand)
	} else if selected.iter().any(|a| a == TAG_ADDON) {
		Some(OrderType::Charm)
	} else {
		None
	}
}

/// Order type of an intake submission. Falls back to the variant name and
/// finally to a custom order.
pub fn infer_intake_type(variant: &ProductVariant, selected: &[String]) -> OrderType {
	infer_quick_add_type(selected).unwrap_or_else(|| {
		if variant.name.to_lowercase().contains(BRICK_TOKEN) {
			OrderType::Brick
		} else {
			OrderType::Custom
		}
	})
}

/// State of the add-on picker for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
	/// The variant offers no add-ons; the picker can be confirmed as is.
	NoAddonsAvailable,
	Choosing,
}

/// Ordered add-on selection for a single variant.
///
/// Toggling appends a name at the end or removes it. Picking a different
/// variant starts a new picker.
#[derive(Debug, Clone)]
pub struct AddonPicker<'a> {
	variant: &'a ProductVariant,
	selected: Vec<String>,
}

impl<'a> AddonPicker<'a> {
	pub fn new(variant: &'a ProductVariant) -> Self {
		Self {
			variant,
			selected: Vec::new(),
		}
	}

	pub fn state(&self) -> PickerState {
		if self.variant.addons.is_empty() {
			PickerState::NoAddonsAvailable
		} else {
			PickerState::Choosing
		}
	}

	/// Toggles `name`. Returns false if the variant has no such add-on.
	pub fn toggle(&mut self, name: &str) -> bool {
		if !self.variant.has_addon(name) {
			return false;
		}
		match self.selected.iter().position(|s| s == name) {
			Some(pos) => {
				self.selected.remove(pos);
			},
			None => self.selected.push(name.to_string()),
		}
		true
	}

	pub fn selected(&self) -> &[String] {
		&self.selected
	}

	/// Running add-on total shown on the confirm button.
	pub fn addon_total(&self) -> u32 {
		total_price(self.variant, &self.selected) - self.variant.price
	}

	/// Confirms the picker and returns the selection.
	pub fn confirm(self) -> Vec<String> {
		self.selected
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tracker_types::Addon;

	fn square() -> ProductVariant {
		ProductVariant::new("10x10cm正方形", 120).with_addons(vec![
			Addon::new("特殊亮片", 30),
			Addon::new("PET膠帶", 20),
			Addon::new(TAG_ADDON, 40),
			Addon::new(STAND_ADDON, 60),
		])
	}

	fn names(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_total_price_sums_known_addons() {
		let v = square();
		assert_eq!(total_price(&v, &[]), 120);
		assert_eq!(total_price(&v, &names(&["特殊亮片", TAG_ADDON])), 190);
		assert_eq!(total_price(&v, &names(&[TAG_ADDON, "特殊亮片"])), 190);
		assert_eq!(total_price(&v, &names(&["特殊亮片", "不存在"])), 150);
	}

	#[test]
	fn test_quick_add_description() {
		let v = square();
		assert_eq!(quick_add_description(&v, &[]), "選擇規格: 10x10cm正方形\n");
		assert_eq!(
			quick_add_description(&v, &names(&[TAG_ADDON, "特殊亮片"])),
			"選擇規格: 10x10cm正方形\n加價購: 吊牌款式 (+40元), 特殊亮片 (+30元)\n"
		);
	}

	#[test]
	fn test_intake_description_and_title() {
		let v = square();
		assert_eq!(
			intake_description(&v, &names(&["PET膠帶"]), Some("想要藍色")),
			"[客戶委託單]\n規格: 10x10cm正方形\n加價項目: PET膠帶 (+20元)\n\n---客戶備註---\n想要藍色"
		);
		assert_eq!(
			intake_description(&v, &[], None),
			"[客戶委託單]\n規格: 10x10cm正方形\n\n---客戶備註---\n無"
		);
		assert!(intake_description(&v, &[], Some("  ")).ends_with("無"));
		assert_eq!(intake_title(&v, "小星"), "10x10cm正方形 - 小星");
	}

	#[test]
	fn test_type_inference_paths_differ() {
		let brick = ProductVariant::new("58mm徽章磚", 200);
		assert_eq!(infer_quick_add_type(&[]), None);
		assert_eq!(infer_intake_type(&brick, &[]), OrderType::Brick);
		assert_eq!(infer_intake_type(&square(), &[]), OrderType::Custom);

		let both = names(&[TAG_ADDON, STAND_ADDON]);
		assert_eq!(infer_quick_add_type(&both), Some(OrderType::Stand));
		assert_eq!(infer_intake_type(&brick, &names(&[TAG_ADDON])), OrderType::Charm);
	}

	#[test]
	fn test_picker_toggle_keeps_selection_order() {
		let v = square();
		let mut picker = AddonPicker::new(&v);
		assert_eq!(picker.state(), PickerState::Choosing);
		assert!(picker.toggle("PET膠帶"));
		assert!(picker.toggle("特殊亮片"));
		assert!(picker.toggle(TAG_ADDON));
		assert!(picker.toggle("PET膠帶"));
		assert!(!picker.toggle("磁吸款"));
		assert_eq!(picker.addon_total(), 70);
		assert_eq!(picker.confirm(), names(&["特殊亮片", TAG_ADDON]));
	}

	#[test]
	fn test_picker_without_addons_is_confirmable() {
		let v = ProductVariant::new("通行證", 170);
		let picker = AddonPicker::new(&v);
		assert_eq!(picker.state(), PickerState::NoAddonsAvailable);
		assert_eq!(picker.addon_total(), 0);
		assert!(picker.confirm().is_empty());
	}
}
