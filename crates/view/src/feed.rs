//! Change-feed subscriptions.
//!
//! [`ChangeFeedSubscriptions`] holds at most one binding. Binding always
//! tears down the previous binding first: its forwarding task is cancelled
//! and its debounce slot closed, so nothing it had coalesced is delivered.
//! Refreshes that were already handed off carry the [`SubscriptionHandle`]
//! they came from; consumers drop them unless [`ChangeFeedSubscriptions::is_current`]
//! still holds.

use std::sync::Arc;
use std::time::Duration;

use casement_worker::{DebouncedTrigger, GenerationClock, TaskClass};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::source::RefreshMode;
use crate::store::DataSource;

/// One external change notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeNotice {
	/// Key of the changed item, when the feed knows it.
	pub key: Option<String>,
}

impl ChangeNotice {
	pub fn for_key(key: impl Into<String>) -> Self {
		Self { key: Some(key.into()) }
	}
}

/// External notification stream for one data-source instance.
pub trait ChangeFeed: Send + Sync {
	fn subscribe(&self) -> broadcast::Receiver<ChangeNotice>;
}

/// Produces the change feed for a data source, if it has one.
pub type ChangeFeedFactory = Arc<dyn Fn(&DataSource) -> Option<Arc<dyn ChangeFeed>> + Send + Sync>;

/// In-process [`ChangeFeed`] backed by a broadcast channel.
#[derive(Debug, Clone)]
pub struct MemoryFeed {
	tx: broadcast::Sender<ChangeNotice>,
}

impl Default for MemoryFeed {
	fn default() -> Self {
		Self::new(64)
	}
}

impl MemoryFeed {
	pub fn new(capacity: usize) -> Self {
		let (tx, _) = broadcast::channel(capacity);
		Self { tx }
	}

	/// Publishes a notice. Returns the number of live subscribers.
	pub fn publish(&self, notice: ChangeNotice) -> usize {
		self.tx.send(notice).unwrap_or(0)
	}

	pub fn subscriber_count(&self) -> usize {
		self.tx.receiver_count()
	}
}

impl ChangeFeed for MemoryFeed {
	fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
		self.tx.subscribe()
	}
}

/// Identity of one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
	pub const fn generation(self) -> u64 {
		self.0
	}
}

/// Coalesced change delivery, tagged with the binding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRefresh {
	pub handle: SubscriptionHandle,
	pub mode: RefreshMode,
	/// Last notice of the coalesced burst.
	pub notice: ChangeNotice,
}

struct Binding {
	handle: SubscriptionHandle,
	cancel: CancellationToken,
	trigger: DebouncedTrigger<ChangeNotice>,
	task: JoinHandle<()>,
}

impl Binding {
	fn handle(&self) -> SubscriptionHandle {
		self.handle
	}

	fn teardown(self) {
		self.cancel.cancel();
		self.trigger.close();
		self.task.abort();
	}
}

/// Owner of the single active change-feed binding.
pub struct ChangeFeedSubscriptions {
	clock: GenerationClock,
	window: Duration,
	active: Option<Binding>,
}

impl ChangeFeedSubscriptions {
	/// `window` is the debounce applied to bursts of notices.
	pub fn new(window: Duration) -> Self {
		Self {
			clock: GenerationClock::new(),
			window,
			active: None,
		}
	}

	/// Unbinds any current subscription, then subscribes to `feed`.
	///
	/// `deliver` runs once per quiet period with a
	/// [`RefreshMode::PermitStaleWhileRefreshing`] refresh.
	pub fn bind<F>(&mut self, feed: &dyn ChangeFeed, mut deliver: F) -> SubscriptionHandle
	where
		F: FnMut(FeedRefresh) + Send + 'static,
	{
		self.unbind_current();

		let handle = SubscriptionHandle(self.clock.advance());
		let cancel = CancellationToken::new();

		let trigger = DebouncedTrigger::spawn(TaskClass::Interactive, self.window, move |notice| {
			deliver(FeedRefresh {
				handle,
				mode: RefreshMode::PermitStaleWhileRefreshing,
				notice,
			});
		});
		let emitter = trigger.emitter();
		let mut rx = feed.subscribe();
		let stop = cancel.clone();
		let task = casement_worker::spawn(TaskClass::Background, async move {
			loop {
				let notice = tokio::select! {
					biased;
					_ = stop.cancelled() => break,
					msg = rx.recv() => match msg {
						Ok(notice) => notice,
						Err(RecvError::Lagged(missed)) => {
							trace!(missed, "view.feed.lagged");
							ChangeNotice::default()
						}
						Err(RecvError::Closed) => break,
					},
				};
				if !emitter.emit(notice) {
					break;
				}
			}
			trace!(handle = handle.0, "view.feed.forwarder_exit");
		});

		debug!(handle = handle.0, "view.feed.bind");
		self.active = Some(Binding {
			handle,
			cancel,
			trigger,
			task,
		});
		handle
	}

	/// Unbinds `handle` if it is the active binding.
	pub fn unbind(&mut self, handle: SubscriptionHandle) -> bool {
		if !self.is_current(handle) {
			return false;
		}
		self.unbind_current().is_some()
	}

	/// Unbinds whatever is bound.
	pub fn unbind_current(&mut self) -> Option<SubscriptionHandle> {
		let binding = self.active.take()?;
		let handle = binding.handle();
		binding.teardown();
		debug!(handle = handle.0, "view.feed.unbind");
		Some(handle)
	}

	pub fn is_current(&self, handle: SubscriptionHandle) -> bool {
		self.active.as_ref().is_some_and(|b| b.handle() == handle)
	}

	pub fn current(&self) -> Option<SubscriptionHandle> {
		self.active.as_ref().map(Binding::handle)
	}

	pub fn is_bound(&self) -> bool {
		self.active.is_some()
	}
}

impl Drop for ChangeFeedSubscriptions {
	fn drop(&mut self) {
		self.unbind_current();
	}
}
