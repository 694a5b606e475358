//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every backend module (storage, assist, media) exposes a `Registry` type
/// implementing this trait so the binary can map configuration names to
/// factory functions without hard-coding them.
pub trait ImplementationRegistry {
	/// Key of this implementation under `<section>.implementations` in the
	/// configuration file, e.g. `"file"` for `storage.implementations.file`.
	const NAME: &'static str;

	/// Factory function type of the owning module.
	type Factory;

	fn factory() -> Self::Factory;
}
