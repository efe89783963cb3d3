//! User-visible notifications.
//!
//! The view reports problems the user can fix (malformed patterns or column
//! documents) through a [`NotificationSink`]. Presentation layers own toast
//! lifecycle and rendering; [`NotificationCenter`] is a queue they can drain.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Severity level of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
	/// Informational message (default).
	#[default]
	Info,
	/// Warning message.
	Warning,
	/// Error message.
	Error,
}

/// One user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
	pub message: String,
	pub level: Level,
}

impl Notification {
	pub fn new(message: impl Into<String>, level: Level) -> Self {
		Self {
			message: message.into(),
			level,
		}
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Self::new(message, Level::Warning)
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self::new(message, Level::Error)
	}
}

/// Receiver of user-visible notifications.
pub trait NotificationSink: Send + Sync {
	fn notify(&self, notification: Notification);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardNotifications;

impl NotificationSink for DiscardNotifications {
	fn notify(&self, _notification: Notification) {}
}

/// Thread-safe notification queue for presentation layers.
#[derive(Debug, Default)]
pub struct NotificationCenter {
	pending: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.lock().is_empty()
	}

	pub fn len(&self) -> usize {
		self.pending.lock().len()
	}

	pub fn push(&self, notification: Notification) {
		self.pending.lock().push_back(notification);
	}

	pub fn take_pending(&self) -> Vec<Notification> {
		self.pending.lock().drain(..).collect()
	}
}

impl NotificationSink for NotificationCenter {
	fn notify(&self, notification: Notification) {
		self.push(notification);
	}
}
