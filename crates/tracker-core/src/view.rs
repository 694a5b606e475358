//! View state, order filtering and dashboard figures.
//!
//! `ViewDescriptor` replaces loose mode flags with one value: which screen
//! is shown and whether an admin session is attached. Filtering and stats
//! are pure functions over an order snapshot.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracker_types::{Order, OrderStats, OrderStatus, StatusFilter};

/// How long an armed delete waits for its confirmation.
pub const DELETE_CONFIRM_WINDOW: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppView {
	#[default]
	Home,
	Tracker,
	OrderForm,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
	#[default]
	Public,
	Admin { token: String },
}

impl Role {
	pub fn is_admin(&self) -> bool {
		matches!(self, Role::Admin { .. })
	}
}

/// Current screen, role and list filters of one client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewDescriptor {
	pub view: AppView,
	pub role: Role,
	pub search: String,
	pub filter: StatusFilter,
}

impl ViewDescriptor {
	/// Back to the landing page as a public visitor with filters cleared.
	pub fn navigate_home(&mut self) {
		*self = Self::default();
	}

	pub fn open(&mut self, view: AppView) {
		self.view = view;
	}

	/// Attaches an admin session and switches to the tracker.
	pub fn enter_admin(&mut self, token: impl Into<String>) {
		self.role = Role::Admin {
			token: token.into(),
		};
		self.view = AppView::Tracker;
	}

	/// Drops the admin session. The current screen is kept.
	pub fn leave_admin(&mut self) {
		self.role = Role::Public;
	}

	pub fn visible<'a>(&self, orders: &'a [Order]) -> Vec<&'a Order> {
		visible_orders(orders, self.role.is_admin(), &self.search, self.filter)
	}
}

/// True when the term occurs in the client name, title or id, ignoring case.
/// An empty term matches everything.
pub fn matches_search(order: &Order, term: &str) -> bool {
	let term = term.trim().to_lowercase();
	if term.is_empty() {
		return true;
	}
	[&order.client_name, &order.title, &order.id]
		.iter()
		.any(|field| field.to_lowercase().contains(&term))
}

pub fn matches_filter(order: &Order, filter: StatusFilter) -> bool {
	match filter {
		StatusFilter::All => true,
		StatusFilter::Only(status) => order.status == status,
	}
}

/// Orders shown in the tracker list.
///
/// Public visitors see nothing until they type a search term; admins see
/// every order matching the term and filter.
pub fn visible_orders<'a>(
	orders: &'a [Order],
	is_admin: bool,
	term: &str,
	filter: StatusFilter,
) -> Vec<&'a Order> {
	if !is_admin && term.trim().is_empty() {
		return Vec::new();
	}
	orders
		.iter()
		.filter(|o| matches_search(o, term) && matches_filter(o, filter))
		.collect()
}

/// Dashboard counts over every order, independent of any filter.
pub fn order_stats(orders: &[Order]) -> OrderStats {
	orders
		.iter()
		.fold(OrderStats::default(), |mut stats, order| {
			match order.status {
				OrderStatus::InDiscussion | OrderStatus::DepositPaid | OrderStatus::Queued => {
					stats.queue += 1
				},
				OrderStatus::InProduction => stats.active += 1,
				OrderStatus::Completed | OrderStatus::Shipped => stats.done += 1,
				OrderStatus::Applying => {},
			}
			stats
		})
}

/// Outcome of a delete request against the confirmation guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
	/// First request; repeat within the window to delete.
	Armed { expires_in: Duration },
	Confirmed,
}

/// Two-step delete guard. Each order is armed independently and reverts
/// on its own after the window passes.
pub struct DeleteConfirmation {
	window: Duration,
	armed: Mutex<HashMap<String, Instant>>,
}

impl Default for DeleteConfirmation {
	fn default() -> Self {
		Self::new(DELETE_CONFIRM_WINDOW)
	}
}

impl DeleteConfirmation {
	pub fn new(window: Duration) -> Self {
		Self {
			window,
			armed: Mutex::new(HashMap::new()),
		}
	}

	pub async fn request(&self, order_id: &str) -> DeleteDecision {
		let now = Instant::now();
		let mut armed = self.armed.lock().await;
		armed.retain(|_, deadline| *deadline > now);
		if armed.remove(order_id).is_some() {
			return DeleteDecision::Confirmed;
		}
		armed.insert(order_id.to_string(), now + self.window);
		DeleteDecision::Armed {
			expires_in: self.window,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::samples::sample_orders;

	#[test]
	fn test_public_search_requires_term() {
		let orders = sample_orders();
		assert!(visible_orders(&orders, false, "", StatusFilter::All).is_empty());
		assert!(visible_orders(&orders, false, "   ", StatusFilter::All).is_empty());
		assert_eq!(visible_orders(&orders, true, "", StatusFilter::All).len(), 4);
	}

	#[test]
	fn test_search_matches_client_title_and_id_case_insensitively() {
		let orders = sample_orders();
		let hits = visible_orders(&orders, false, "小星", StatusFilter::All);
		assert!(!hits.is_empty());
		assert!(hits.iter().all(|o| o.client_name.contains("小星")));

		let by_id = visible_orders(&orders, false, "C-102", StatusFilter::All);
		assert_eq!(by_id.len(), 1);
		assert_eq!(by_id[0].id, "c-102");
	}

	#[test]
	fn test_status_filter_applies_for_admin() {
		let orders = sample_orders();
		let status = orders[0].status;
		let hits = visible_orders(&orders, true, "", StatusFilter::Only(status));
		assert!(hits.iter().all(|o| o.status == status));
		assert!(!hits.is_empty());
	}

	#[test]
	fn test_stats_cover_all_orders() {
		let orders = sample_orders();
		let stats = order_stats(&orders);
		let applying = orders
			.iter()
			.filter(|o| o.status == OrderStatus::Applying)
			.count();
		assert_eq!(stats.queue + stats.active + stats.done + applying, orders.len());
	}

	#[test]
	fn test_view_descriptor_transitions() {
		let mut view = ViewDescriptor::default();
		view.open(AppView::OrderForm);
		view.enter_admin("tok");
		assert_eq!(view.view, AppView::Tracker);
		assert!(view.role.is_admin());

		view.search = "小星".into();
		view.filter = StatusFilter::Only(OrderStatus::Queued);
		view.leave_admin();
		assert_eq!(view.view, AppView::Tracker);
		assert_eq!(view.search, "小星");

		view.enter_admin("tok");
		view.navigate_home();
		assert_eq!(view, ViewDescriptor::default());
	}

	#[tokio::test(start_paused = true)]
	async fn test_delete_confirmation_window() {
		let guard = DeleteConfirmation::default();
		assert!(matches!(
			guard.request("c-1").await,
			DeleteDecision::Armed { .. }
		));
		// Orders are armed independently.
		assert!(matches!(
			guard.request("c-2").await,
			DeleteDecision::Armed { .. }
		));
		assert_eq!(guard.request("c-1").await, DeleteDecision::Confirmed);

		tokio::time::advance(Duration::from_millis(3001)).await;
		assert!(matches!(
			guard.request("c-2").await,
			DeleteDecision::Armed { .. }
		));
	}
}
