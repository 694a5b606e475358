//! Order lifecycle state machine.
//!
//! The seven statuses form a line. An order moves one step at a time in
//! either direction; stepping past either end does nothing.

use chrono::NaiveDate;
use tracker_types::{Order, OrderProgress, OrderStatus, ProgressStep, StepState};

/// Direction of a single lifecycle step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
	Advance,
	Retreat,
}

impl Transition {
	/// Status reached from `from`, or `None` at the matching end of the line.
	pub fn target(self, from: OrderStatus) -> Option<OrderStatus> {
		match self {
			Transition::Advance => from.next(),
			Transition::Retreat => from.previous(),
		}
	}
}

/// Applies `transition` to `order` and stamps `last_updated` with `today`.
///
/// Returns the previous status when the order moved, `None` when the step
/// was a guarded no-op. A no-op leaves the order untouched.
pub fn apply_transition(
	order: &mut Order,
	transition: Transition,
	today: NaiveDate,
) -> Option<OrderStatus> {
	let target = transition.target(order.status)?;
	let previous = order.status;
	order.status = target;
	order.last_updated = today;
	Some(previous)
}

/// Transitions available from `status`.
pub fn available_transitions(status: OrderStatus) -> Vec<Transition> {
	[Transition::Retreat, Transition::Advance]
		.into_iter()
		.filter(|t| t.target(status).is_some())
		.collect()
}

/// Fraction of the progress track to fill for `status`.
pub fn progress_fraction(status: OrderStatus) -> f64 {
	let last = (OrderStatus::ALL.len() - 1) as f64;
	status.index() as f64 / last
}

/// Render state of step `step` while the order is at `current`.
pub fn step_state(step: OrderStatus, current: OrderStatus) -> StepState {
	if step == current {
		StepState::Current
	} else if step.index() < current.index() {
		StepState::Completed
	} else {
		StepState::Pending
	}
}

pub fn progress(order: &Order) -> OrderProgress {
	let current = order.status;
	OrderProgress {
		order_id: order.id.clone(),
		status: current,
		fraction: progress_fraction(current),
		steps: OrderStatus::ALL
			.iter()
			.map(|&status| ProgressStep {
				status,
				state: step_state(status, current),
			})
			.collect(),
		can_advance: !current.is_terminal(),
		can_retreat: !current.is_initial(),
	}
}
