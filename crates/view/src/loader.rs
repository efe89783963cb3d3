//! Single-shot async loads that are dropped when their context goes away.
//!
//! There is no cancellation of the underlying request. The loader captures a
//! [`ContextToken`] at dispatch and, when the operation resolves, checks it
//! against the live token of its [`ContextClock`]. A mismatch is the normal
//! outcome of a user moving on quickly, so it is discarded silently.
//!
//! `on_complete` usually marshals the result onto the presentation context;
//! the token travels with it so the consumer can repeat the check at apply
//! time, which closes the window between this check and the apply.

use std::future::Future;

use casement_worker::TaskClass;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::token::{ContextClock, ContextToken};

/// Dispatches loads guarded by one [`ContextClock`].
#[derive(Debug, Clone)]
pub struct StaleGuardedLoader {
	name: &'static str,
	clock: ContextClock,
}

impl StaleGuardedLoader {
	pub fn new(name: &'static str, clock: ContextClock) -> Self {
		Self { name, clock }
	}

	pub fn clock(&self) -> &ContextClock {
		&self.clock
	}

	/// Runs `operation` and hands its output to `on_complete` only if `token`
	/// is still live when it resolves.
	///
	/// The returned handle resolves to whether `on_complete` ran.
	pub fn load<F, R, C>(&self, token: ContextToken, operation: F, on_complete: C) -> JoinHandle<bool>
	where
		F: Future<Output = R> + Send + 'static,
		R: Send + 'static,
		C: FnOnce(R) + Send + 'static,
	{
		let clock = self.clock.clone();
		let name = self.name;
		trace!(loader = name, token = token.generation(), "view.load.dispatch");
		casement_worker::spawn(TaskClass::Background, async move {
			let output = operation.await;
			if !clock.is_current(token) {
				trace!(
					loader = name,
					token = token.generation(),
					live = clock.current().generation(),
					"view.load.stale"
				);
				return false;
			}
			on_complete(output);
			true
		})
	}

	/// [`Self::load`] against the live token. Returns the captured token.
	pub fn load_current<F, R, C>(&self, operation: F, on_complete: C) -> ContextToken
	where
		F: Future<Output = R> + Send + 'static,
		R: Send + 'static,
		C: FnOnce(R) + Send + 'static,
	{
		let token = self.clock.current();
		drop(self.load(token, operation, on_complete));
		token
	}
}
