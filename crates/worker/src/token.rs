use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic generation clock shared between an owner and its async work.
///
/// The owner advances the clock whenever the state that in-flight work was
/// started against is replaced; completions compare the generation they
/// captured with [`GenerationClock::current`] to decide whether their result
/// still applies.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	current: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a new generation clock at generation 0.
	pub fn new() -> Self {
		Self::default()
	}

	/// Moves to the next generation and returns it.
	pub fn advance(&self) -> u64 {
		self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
	}

	/// Returns the live generation.
	pub fn current(&self) -> u64 {
		self.current.load(Ordering::Acquire)
	}

	/// Returns true when `generation` is still the live generation.
	pub fn is_current(&self, generation: u64) -> bool {
		self.current() == generation
	}
}
