//! Context tokens.
//!
//! A [`ContextToken`] names "the context this work was started for". The
//! owner replaces the live token whenever the context changes; tokens are
//! never merged or reused, so comparing a captured token with the live one is
//! enough to recognise a result that no longer applies.

use casement_worker::GenerationClock;

/// Opaque identity of one context activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextToken(u64);

impl ContextToken {
	pub const fn generation(self) -> u64 {
		self.0
	}
}

/// Issues [`ContextToken`]s and holds the live one.
///
/// Clones share the live token, so a completion running on another task can
/// check staleness without access to the owner.
#[derive(Debug, Clone, Default)]
pub struct ContextClock {
	clock: GenerationClock,
}

impl ContextClock {
	pub fn new() -> Self {
		Self::default()
	}

	/// The live token.
	pub fn current(&self) -> ContextToken {
		ContextToken(self.clock.current())
	}

	/// Replaces the live token; every previously issued token becomes stale.
	pub fn advance(&self) -> ContextToken {
		ContextToken(self.clock.advance())
	}

	pub fn is_current(&self, token: ContextToken) -> bool {
		self.clock.is_current(token.0)
	}
}
