use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Outcome from enqueueing a mailbox message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxSendOutcome {
	/// The slot was empty and now holds the message.
	Enqueued,
	/// A queued message was replaced by the newer one.
	Coalesced,
}

/// Mailbox send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxSendError {
	/// Mailbox is closed.
	Closed,
}

struct MailboxState<T> {
	slot: Option<T>,
	closed: bool,
}

struct MailboxInner<T> {
	state: Mutex<MailboxState<T>>,
	notify_recv: Notify,
}

/// Multi-producer mailbox sender.
pub struct MailboxSender<T> {
	inner: Arc<MailboxInner<T>>,
}

/// Mailbox receiver.
pub struct MailboxReceiver<T> {
	inner: Arc<MailboxInner<T>>,
}

/// Thread-safe single-slot mailbox where the latest message wins.
///
/// Sending never blocks and never waits on an async lock, so producers on
/// arbitrary threads (including completion callbacks outside any runtime)
/// can post into it.
pub struct Mailbox<T> {
	inner: Arc<MailboxInner<T>>,
}

impl<T> Clone for MailboxSender<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Clone for MailboxReceiver<T> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> Default for Mailbox<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Mailbox<T> {
	/// Creates an empty open mailbox.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(MailboxInner {
				state: Mutex::new(MailboxState { slot: None, closed: false }),
				notify_recv: Notify::new(),
			}),
		}
	}

	/// Returns a sender handle.
	pub fn sender(&self) -> MailboxSender<T> {
		MailboxSender {
			inner: Arc::clone(&self.inner),
		}
	}

	/// Returns a receiver handle.
	pub fn receiver(&self) -> MailboxReceiver<T> {
		MailboxReceiver {
			inner: Arc::clone(&self.inner),
		}
	}
}

impl<T> MailboxSender<T> {
	/// Closes the mailbox. Any queued message is discarded and receivers
	/// return `None`.
	pub fn close(&self) {
		let mut state = self.inner.state.lock();
		state.closed = true;
		let discarded = state.slot.take();
		drop(state);
		drop(discarded);
		self.inner.notify_recv.notify_waiters();
	}

	/// Places `msg` in the slot, replacing whatever was queued.
	pub fn send(&self, msg: T) -> Result<MailboxSendOutcome, MailboxSendError> {
		let mut state = self.inner.state.lock();
		if state.closed {
			return Err(MailboxSendError::Closed);
		}
		let replaced = state.slot.replace(msg);
		drop(state);
		self.inner.notify_recv.notify_one();
		match replaced {
			Some(_) => Ok(MailboxSendOutcome::Coalesced),
			None => Ok(MailboxSendOutcome::Enqueued),
		}
	}

	/// Returns true once the mailbox has been closed.
	pub fn is_closed(&self) -> bool {
		self.inner.state.lock().closed
	}
}

impl<T> MailboxReceiver<T> {
	/// Receives the queued message. Returns `None` once the mailbox is closed.
	pub async fn recv(&self) -> Option<T> {
		loop {
			// Register before checking state to avoid a lost wakeup between
			// the check and the await.
			let notified = self.inner.notify_recv.notified();
			{
				let mut state = self.inner.state.lock();
				if state.closed {
					return None;
				}
				if let Some(msg) = state.slot.take() {
					return Some(msg);
				}
			}
			notified.await;
		}
	}

	/// Returns true when a message is waiting in the slot.
	pub fn has_pending(&self) -> bool {
		self.inner.state.lock().slot.is_some()
	}
}
