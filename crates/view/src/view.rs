//! Public handle to a running view.
//!
//! [`WindowedView::spawn`] starts the presentation task, which owns the
//! [`WindowedViewController`] and applies [`ViewCommand`]s one at a time in
//! the order they were sent. Every method on the handle only enqueues; state
//! is read back through [`ViewSnapshot`]s or query replies.

use std::sync::Arc;

use casement_worker::TaskClass;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::ViewConfig;
use crate::controller::{ViewCommand, ViewQuery, ViewSnapshot, WindowedViewController};
use crate::error::{Result, ViewError};
use crate::feed::ChangeFeedFactory;
use crate::item::ViewItem;
use crate::notify::{DiscardNotifications, NotificationSink};
use crate::schema::{ColumnDefinition, ColumnSchema, ColumnSuggester, FrequencySuggester};
use crate::source::{DisplayDensity, WindowSource};
use crate::store::DataSource;

/// Configures and spawns a [`WindowedView`].
pub struct WindowedViewBuilder<T> {
	config: ViewConfig,
	notifications: Arc<dyn NotificationSink>,
	suggester: Option<Arc<dyn ColumnSuggester<T>>>,
}

impl<T: ViewItem> Default for WindowedViewBuilder<T> {
	fn default() -> Self {
		Self {
			config: ViewConfig::default(),
			notifications: Arc::new(DiscardNotifications),
			suggester: None,
		}
	}
}

impl<T: ViewItem> WindowedViewBuilder<T> {
	pub fn config(mut self, config: ViewConfig) -> Self {
		self.config = config;
		self
	}

	pub fn notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
		self.notifications = sink;
		self
	}

	/// Replaces the default [`FrequencySuggester`].
	pub fn suggester(mut self, suggester: Arc<dyn ColumnSuggester<T>>) -> Self {
		self.suggester = Some(suggester);
		self
	}

	/// Validates the configuration, attaches to `window` and starts the
	/// presentation task.
	pub fn spawn(self, window: Arc<dyn WindowSource<T>>) -> Result<WindowedView<T>> {
		self.config.validate()?;
		let suggester = self
			.suggester
			.unwrap_or_else(|| Arc::new(FrequencySuggester::new(self.config.max_suggested_columns)));
		let (tx, rx) = mpsc::unbounded_channel();
		let (controller, snapshot) = WindowedViewController::new(self.config, window, suggester, self.notifications, tx.clone());
		let task = casement_worker::spawn(TaskClass::Interactive, run(controller, rx));
		debug!("view.spawn");
		Ok(WindowedView {
			commands: tx,
			snapshot,
			task: Some(task),
		})
	}
}

async fn run<T: ViewItem>(mut controller: WindowedViewController<T>, mut rx: mpsc::UnboundedReceiver<ViewCommand<T>>) {
	while let Some(command) = rx.recv().await {
		if controller.handle(command).is_break() {
			break;
		}
	}
	trace!("view.loop.exit");
}

/// Handle to a running windowed view.
///
/// Dropping the handle shuts the presentation task down.
pub struct WindowedView<T: ViewItem> {
	commands: mpsc::UnboundedSender<ViewCommand<T>>,
	snapshot: watch::Receiver<ViewSnapshot>,
	task: Option<JoinHandle<()>>,
}

impl<T: ViewItem> WindowedView<T> {
	pub fn builder() -> WindowedViewBuilder<T> {
		WindowedViewBuilder::default()
	}

	/// Spawns a view with default settings.
	pub fn spawn(window: Arc<dyn WindowSource<T>>) -> Result<Self> {
		Self::builder().spawn(window)
	}

	fn send(&self, command: ViewCommand<T>) -> Result<()> {
		self.commands.send(command).map_err(|_| ViewError::Closed)
	}

	async fn query<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> ViewQuery<T>) -> Result<R> {
		let (tx, rx) = oneshot::channel();
		self.send(ViewCommand::Query(make(tx)))?;
		rx.await.map_err(|_| ViewError::Closed)
	}

	/// The view became visible.
	pub fn activate(&self) -> Result<()> {
		self.send(ViewCommand::Activate)
	}

	/// The view was hidden. Stops listening for changes.
	pub fn deactivate(&self) -> Result<()> {
		self.send(ViewCommand::Deactivate)
	}

	/// `None` selects the configured default context.
	pub fn set_context(&self, context: Option<&str>) -> Result<()> {
		self.send(ViewCommand::SetContext(context.map(str::to_string)))
	}

	pub fn set_data_source(&self, source: Option<DataSource>) -> Result<()> {
		self.send(ViewCommand::SetDataSource(source))
	}

	pub fn set_change_feed_factory(&self, factory: Option<ChangeFeedFactory>) -> Result<()> {
		self.send(ViewCommand::SetChangeFeedFactory(factory))
	}

	/// Property paths the current context wants shown first.
	pub fn set_context_priority_properties(&self, properties: Vec<String>) -> Result<()> {
		self.send(ViewCommand::SetContextPriorityProperties(properties))
	}

	pub fn set_display_density(&self, density: DisplayDensity) -> Result<()> {
		self.send(ViewCommand::SetDisplayDensity(density))
	}

	/// Installs user-edited columns for the current context.
	pub fn set_columns(&self, schema: ColumnSchema) -> Result<()> {
		self.send(ViewCommand::SetColumns(schema))
	}

	pub fn set_header(&self, header: impl Into<String>) -> Result<()> {
		self.send(ViewCommand::SetHeader(header.into()))
	}

	/// Asks the backing window for `start..start + count`.
	pub fn fetch_range(&self, start: usize, count: usize) -> Result<()> {
		self.send(ViewCommand::FetchRange { start, count })
	}

	/// Realized recent items in window order.
	pub async fn sample(&self) -> Result<Vec<T>> {
		self.query(ViewQuery::Sample).await
	}

	pub async fn all_suggestions(&self) -> Result<Vec<ColumnDefinition>> {
		self.query(ViewQuery::AllSuggestions).await
	}

	pub async fn current_suggestion(&self) -> Result<ColumnSchema> {
		self.query(ViewQuery::CurrentSuggestion).await
	}

	/// Latest published state.
	pub fn snapshot(&self) -> ViewSnapshot {
		self.snapshot.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
		self.snapshot.clone()
	}

	/// Stops the presentation task and waits for it to exit.
	pub async fn shutdown(mut self) {
		let _ = self.commands.send(ViewCommand::Shutdown);
		if let Some(task) = self.task.take() {
			let _ = task.await;
		}
	}
}

impl<T: ViewItem> Drop for WindowedView<T> {
	fn drop(&mut self) {
		let _ = self.commands.send(ViewCommand::Shutdown);
	}
}
