//! Order lifecycle state machine and progress rendering.

pub mod lifecycle;

pub use lifecycle::{
	apply_transition, available_transitions, progress, progress_fraction, step_state, Transition,
};
