//! Product catalog types.
//!
//! The catalog maps a category label to an ordered list of purchasable
//! variants. It is stored as a single whole document, so the serialized form
//! is exactly the category map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Render order of the built-in categories.
pub const CATEGORY_ORDER: [&str; 6] = ["正方形", "長方形", "圓形", "異形", "徽章磚", "雙色磚"];

/// Errors raised while editing a catalog.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
	#[error("Variant '{name}' already exists in category '{category}'")]
	DuplicateVariant { category: String, name: String },
	#[error("Category not found: {0}")]
	CategoryNotFound(String),
	#[error("Variant '{name}' not found in category '{category}'")]
	VariantNotFound { category: String, name: String },
	#[error("Add-on index {index} out of range for variant '{variant}'")]
	AddonOutOfRange { variant: String, index: usize },
	#[error("Name must not be empty")]
	EmptyName,
}

/// A priced modifier attached to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
	pub name: String,
	pub price: u32,
}

impl Addon {
	pub fn new(name: impl Into<String>, price: u32) -> Self {
		Self {
			name: name.into(),
			price,
		}
	}
}

/// One purchasable base configuration within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
	/// Natural key within the category.
	pub name: String,
	/// Base price.
	pub price: u32,
	/// Optional preview image URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub img: Option<String>,
	/// Ordered add-ons available for this variant.
	#[serde(default)]
	pub addons: Vec<Addon>,
}

impl ProductVariant {
	pub fn new(name: impl Into<String>, price: u32) -> Self {
		Self {
			name: name.into(),
			price,
			img: None,
			addons: Vec::new(),
		}
	}

	pub fn with_img(mut self, img: impl Into<String>) -> Self {
		self.img = Some(img.into());
		self
	}

	pub fn with_addons(mut self, addons: Vec<Addon>) -> Self {
		self.addons = addons;
		self
	}

	/// Finds an add-on by exact name.
	pub fn addon(&self, name: &str) -> Option<&Addon> {
		self.addons.iter().find(|a| a.name == name)
	}

	pub fn has_addon(&self, name: &str) -> bool {
		self.addon(name).is_some()
	}
}

/// Category label to ordered variant list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(BTreeMap<String, Vec<ProductVariant>>);

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Variants of a category, if the category exists.
	pub fn category(&self, category: &str) -> Option<&[ProductVariant]> {
		self.0.get(category).map(Vec::as_slice)
	}

	/// Replaces the full variant list of a category.
	pub fn set_category(&mut self, category: impl Into<String>, variants: Vec<ProductVariant>) {
		self.0.insert(category.into(), variants);
	}

	pub fn variant(&self, category: &str, name: &str) -> Option<&ProductVariant> {
		self.0.get(category)?.iter().find(|v| v.name == name)
	}

	/// Categories in render order: known categories first in their fixed
	/// order, then any others alphabetically.
	pub fn categories(&self) -> Vec<&str> {
		let mut out: Vec<&str> = CATEGORY_ORDER
			.iter()
			.copied()
			.filter(|c| self.0.contains_key(*c))
			.collect();
		out.extend(
			self.0
				.keys()
				.map(String::as_str)
				.filter(|c| !CATEGORY_ORDER.contains(c)),
		);
		out
	}

	/// `(category, variants)` pairs in render order.
	pub fn iter_ordered(&self) -> impl Iterator<Item = (&str, &[ProductVariant])> {
		self.categories()
			.into_iter()
			.filter_map(|c| self.0.get(c).map(|v| (c, v.as_slice())))
	}

	/// Adds categories present in `defaults` but missing here. Existing
	/// categories are never touched.
	pub fn merge_defaults(&mut self, defaults: &Catalog) {
		for (category, variants) in &defaults.0 {
			self.0
				.entry(category.clone())
				.or_insert_with(|| variants.clone());
		}
	}

	/// Appends a variant; names must be unique within the category.
	pub fn add_variant(
		&mut self,
		category: &str,
		variant: ProductVariant,
	) -> Result<(), CatalogError> {
		if variant.name.trim().is_empty() {
			return Err(CatalogError::EmptyName);
		}
		let variants = self.0.entry(category.to_string()).or_default();
		if variants.iter().any(|v| v.name == variant.name) {
			return Err(CatalogError::DuplicateVariant {
				category: category.to_string(),
				name: variant.name,
			});
		}
		variants.push(variant);
		Ok(())
	}

	/// Replaces the variant currently named `name`. Renames are allowed and
	/// not checked for uniqueness.
	pub fn update_variant(
		&mut self,
		category: &str,
		name: &str,
		updated: ProductVariant,
	) -> Result<(), CatalogError> {
		let slot = self.variant_mut(category, name)?;
		*slot = updated;
		Ok(())
	}

	/// Removes a variant, returning it.
	pub fn remove_variant(
		&mut self,
		category: &str,
		name: &str,
	) -> Result<ProductVariant, CatalogError> {
		let variants = self
			.0
			.get_mut(category)
			.ok_or_else(|| CatalogError::CategoryNotFound(category.to_string()))?;
		let pos = variants
			.iter()
			.position(|v| v.name == name)
			.ok_or_else(|| CatalogError::VariantNotFound {
				category: category.to_string(),
				name: name.to_string(),
			})?;
		Ok(variants.remove(pos))
	}

	pub fn add_addon(
		&mut self,
		category: &str,
		variant: &str,
		addon: Addon,
	) -> Result<(), CatalogError> {
		if addon.name.trim().is_empty() {
			return Err(CatalogError::EmptyName);
		}
		self.variant_mut(category, variant)?.addons.push(addon);
		Ok(())
	}

	pub fn update_addon(
		&mut self,
		category: &str,
		variant: &str,
		index: usize,
		addon: Addon,
	) -> Result<(), CatalogError> {
		let v = self.variant_mut(category, variant)?;
		let slot = v
			.addons
			.get_mut(index)
			.ok_or_else(|| CatalogError::AddonOutOfRange {
				variant: variant.to_string(),
				index,
			})?;
		*slot = addon;
		Ok(())
	}

	pub fn remove_addon(
		&mut self,
		category: &str,
		variant: &str,
		index: usize,
	) -> Result<Addon, CatalogError> {
		let v = self.variant_mut(category, variant)?;
		if index >= v.addons.len() {
			return Err(CatalogError::AddonOutOfRange {
				variant: variant.to_string(),
				index,
			});
		}
		Ok(v.addons.remove(index))
	}

	fn variant_mut(
		&mut self,
		category: &str,
		name: &str,
	) -> Result<&mut ProductVariant, CatalogError> {
		let variants = self
			.0
			.get_mut(category)
			.ok_or_else(|| CatalogError::CategoryNotFound(category.to_string()))?;
		variants
			.iter_mut()
			.find(|v| v.name == name)
			.ok_or_else(|| CatalogError::VariantNotFound {
				category: category.to_string(),
				name: name.to_string(),
			})
	}
}

impl FromIterator<(String, Vec<ProductVariant>)> for Catalog {
	fn from_iter<I: IntoIterator<Item = (String, Vec<ProductVariant>)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}
