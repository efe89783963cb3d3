//! Sliding-window debounce built on the single-slot [`Mailbox`].
//!
//! Producers call [`DebounceEmitter::emit`] from any thread. Each emission is
//! stamped and replaces whatever is waiting in the slot. A dedicated task
//! waits until `window` has elapsed since the most recent emission and then
//! hands the last payload to the delivery callback exactly once. Every new
//! emission inside the window restarts the wait.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::TaskClass;
use crate::mailbox::{Mailbox, MailboxReceiver, MailboxSender};

struct Stamped<E> {
	at: Instant,
	event: E,
}

/// Cloneable producer side of a [`DebouncedTrigger`].
pub struct DebounceEmitter<E> {
	tx: MailboxSender<Stamped<E>>,
}

impl<E> Clone for DebounceEmitter<E> {
	fn clone(&self) -> Self {
		Self { tx: self.tx.clone() }
	}
}

impl<E> DebounceEmitter<E> {
	/// Records one event. Returns `false` once the trigger has been closed.
	pub fn emit(&self, event: E) -> bool {
		self.tx
			.send(Stamped {
				at: Instant::now(),
				event,
			})
			.is_ok()
	}
}

/// Coalesces bursts of events into one delayed delivery of the last payload.
///
/// Dropping the trigger closes it; an undelivered payload is discarded.
pub struct DebouncedTrigger<E> {
	emitter: DebounceEmitter<E>,
	window: Duration,
	task: JoinHandle<()>,
}

impl<E> DebouncedTrigger<E>
where
	E: Send + 'static,
{
	/// Spawns the coalescing task. `deliver` runs on that task, once per
	/// quiet period, and is expected to marshal the payload onward.
	pub fn spawn<F>(class: TaskClass, window: Duration, deliver: F) -> Self
	where
		F: FnMut(E) + Send + 'static,
	{
		let mailbox = Mailbox::new();
		let rx = mailbox.receiver();
		let task = crate::spawn(class, run(rx, window, deliver));
		Self {
			emitter: DebounceEmitter { tx: mailbox.sender() },
			window,
			task,
		}
	}
}

impl<E> DebouncedTrigger<E> {
	/// Records one event.
	pub fn emit(&self, event: E) -> bool {
		self.emitter.emit(event)
	}

	/// Returns a cloneable emitter for producers on other threads.
	pub fn emitter(&self) -> DebounceEmitter<E> {
		self.emitter.clone()
	}

	/// Returns the quiet window.
	pub fn window(&self) -> Duration {
		self.window
	}

	/// Stops the trigger. Pending and future emissions are dropped.
	pub fn close(&self) {
		self.emitter.tx.close();
	}

	/// Returns true once the coalescing task has exited.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}
}

impl<E> Drop for DebouncedTrigger<E> {
	fn drop(&mut self) {
		self.close();
	}
}

async fn run<E, F>(rx: MailboxReceiver<Stamped<E>>, window: Duration, mut deliver: F)
where
	F: FnMut(E),
{
	while let Some(mut latest) = rx.recv().await {
		loop {
			match tokio::time::timeout_at(latest.at + window, rx.recv()).await {
				Ok(Some(newer)) => latest = newer,
				Ok(None) => {
					tracing::trace!("worker.debounce.closed_with_pending");
					return;
				}
				Err(_) => {
					deliver(latest.event);
					break;
				}
			}
		}
	}
	tracing::trace!("worker.debounce.closed");
}
