//! The windowed-view controller.
//!
//! [`WindowedViewController`] owns every piece of mutable view state and is
//! driven exclusively by [`ViewCommand`]s applied in delivery order on the
//! presentation task. Producers (the backing window, change feeds, async
//! document loads) never touch the state directly: they marshal a command
//! onto the same channel. Results of async work carry the token they were
//! started under and are re-checked here before they are applied.

use std::collections::{HashMap, HashSet};
use std::ops::ControlFlow;
use std::sync::Arc;

use casement_worker::{DebouncedTrigger, TaskClass};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, trace, warn};

use crate::config::ViewConfig;
use crate::error::{Result, ViewError};
use crate::feed::{ChangeFeedFactory, ChangeFeedSubscriptions, FeedRefresh};
use crate::item::{RealizedItem, ViewItem};
use crate::loader::StaleGuardedLoader;
use crate::notify::{Notification, NotificationSink};
use crate::recency::RecencyBuffer;
use crate::schema::{ColumnDefinition, ColumnSchema, ColumnSetDocument, ColumnSuggester, ColumnsModel, ColumnsSource, HintDocument, SchemaCoordinator};
use crate::source::{DisplayDensity, RealizedRange, RefreshMode, WindowEvents, WindowSource};
use crate::store::DataSource;
use crate::token::{ContextClock, ContextToken};

/// Requests answered from the presentation task.
pub enum ViewQuery<T> {
	/// Realized recent items, ordered by window index.
	Sample(oneshot::Sender<Vec<T>>),
	/// Every column the recent items could be shown with.
	AllSuggestions(oneshot::Sender<Vec<ColumnDefinition>>),
	/// What automatic inference would pick right now.
	CurrentSuggestion(oneshot::Sender<ColumnSchema>),
}

/// Everything the presentation task can be asked to do.
pub enum ViewCommand<T> {
	Activate,
	Deactivate,
	/// `None` selects the configured default context.
	SetContext(Option<String>),
	SetDataSource(Option<DataSource>),
	SetChangeFeedFactory(Option<ChangeFeedFactory>),
	SetContextPriorityProperties(Vec<String>),
	SetDisplayDensity(DisplayDensity),
	SetColumns(ColumnSchema),
	SetHeader(String),
	FetchRange { start: usize, count: usize },
	/// Coalesced realization report from the backing window.
	RangeRealized(RealizedRange),
	CountChanged(usize),
	/// Coalesced change-feed notification.
	SourceChanged(FeedRefresh),
	PriorityHintsLoaded {
		token: ContextToken,
		key: String,
		result: Result<Option<Value>>,
	},
	DefaultColumnsLoaded {
		token: ContextToken,
		key: String,
		result: Result<Option<Value>>,
	},
	Query(ViewQuery<T>),
	Shutdown,
}

/// Activation state of the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
	#[default]
	Inactive,
	/// Active; the window was (re)filled and no batch has been realized yet.
	AwaitingFirstWindow,
	/// Active with at least one realized batch since the last blocking refresh.
	Stable,
}

impl Lifecycle {
	pub const fn is_active(self) -> bool {
		!matches!(self, Self::Inactive)
	}
}

/// Published view state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
	pub lifecycle: Lifecycle,
	pub context: String,
	pub data_source: Option<String>,
	pub columns: ColumnsModel,
	pub documents_have_id: bool,
	pub density: DisplayDensity,
	pub export_enabled: bool,
	pub header: String,
	pub total_count: usize,
	/// Bumped whenever the set of recent items changes.
	pub recent_revision: u64,
}

type CacheKey = (String, String);

/// State machine behind [`crate::WindowedView`].
pub struct WindowedViewController<T: ViewItem> {
	config: ViewConfig,
	window: Arc<dyn WindowSource<T>>,
	commands: mpsc::UnboundedSender<ViewCommand<T>>,
	notifications: Arc<dyn NotificationSink>,
	recent: RecencyBuffer<T>,
	schema: SchemaCoordinator<T>,
	columns: ColumnsModel,
	column_cache: HashMap<CacheKey, ColumnsModel>,
	/// Cache entries whose default column document has not been applied or
	/// ruled out yet.
	unresolved_defaults: HashSet<CacheKey>,
	context: String,
	data_source: Option<DataSource>,
	feed_factory: Option<ChangeFeedFactory>,
	subscriptions: ChangeFeedSubscriptions,
	/// Guards loads tied to the (data source, context) pair.
	context_loads: StaleGuardedLoader,
	/// Guards loads tied to the data source only.
	source_loads: StaleGuardedLoader,
	lifecycle: Lifecycle,
	density: DisplayDensity,
	documents_have_id: bool,
	header: String,
	recent_revision: u64,
	snapshot: watch::Sender<ViewSnapshot>,
	_realized: DebouncedTrigger<RealizedRange>,
}

impl<T: ViewItem> WindowedViewController<T> {
	/// Builds the controller and attaches it to `window`. Realization reports
	/// are debounced and, like count changes, marshalled onto `commands`.
	pub fn new(
		config: ViewConfig,
		window: Arc<dyn WindowSource<T>>,
		suggester: Arc<dyn ColumnSuggester<T>>,
		notifications: Arc<dyn NotificationSink>,
		commands: mpsc::UnboundedSender<ViewCommand<T>>,
	) -> (Self, watch::Receiver<ViewSnapshot>) {
		let realized = {
			let tx = commands.clone();
			DebouncedTrigger::spawn(TaskClass::Interactive, config.realize_debounce(), move |range| {
				let _ = tx.send(ViewCommand::RangeRealized(range));
			})
		};
		let count_tx = commands.clone();
		window.attach(WindowEvents::new(
			realized.emitter(),
			Arc::new(move |total| {
				let _ = count_tx.send(ViewCommand::CountChanged(total));
			}),
		));

		let context = config.default_context.clone();
		let header = config.header.clone();
		let initial = ViewSnapshot {
			lifecycle: Lifecycle::Inactive,
			context: context.clone(),
			data_source: None,
			columns: ColumnsModel::default(),
			documents_have_id: false,
			density: DisplayDensity::default(),
			export_enabled: DisplayDensity::default().export_enabled(),
			header: header.clone(),
			total_count: window.total_count(),
			recent_revision: 0,
		};
		let (snapshot, snapshot_rx) = watch::channel(initial);

		let controller = Self {
			recent: RecencyBuffer::new(config.recent_capacity),
			schema: SchemaCoordinator::new(suggester, Arc::clone(&notifications)),
			subscriptions: ChangeFeedSubscriptions::new(config.change_debounce()),
			context_loads: StaleGuardedLoader::new("default_columns", ContextClock::new()),
			source_loads: StaleGuardedLoader::new("priority_hints", ContextClock::new()),
			config,
			window,
			commands,
			notifications,
			columns: ColumnsModel::default(),
			column_cache: HashMap::new(),
			unresolved_defaults: HashSet::new(),
			context,
			data_source: None,
			feed_factory: None,
			lifecycle: Lifecycle::Inactive,
			density: DisplayDensity::default(),
			documents_have_id: false,
			header,
			recent_revision: 0,
			snapshot,
			_realized: realized,
		};
		(controller, snapshot_rx)
	}

	/// Applies one command. Breaks on shutdown.
	pub fn handle(&mut self, command: ViewCommand<T>) -> ControlFlow<()> {
		match command {
			ViewCommand::Activate => self.activate(),
			ViewCommand::Deactivate => self.deactivate(),
			ViewCommand::SetContext(context) => self.set_context(context),
			ViewCommand::SetDataSource(source) => self.set_data_source(source),
			ViewCommand::SetChangeFeedFactory(factory) => {
				self.feed_factory = factory;
				self.observe_source_changes();
			}
			ViewCommand::SetContextPriorityProperties(properties) => self.set_context_priority_properties(properties),
			ViewCommand::SetDisplayDensity(density) => self.set_display_density(density),
			ViewCommand::SetColumns(schema) => {
				debug!(context = %self.context, columns = schema.len(), "view.columns.user_edit");
				self.replace_columns(ColumnsModel::user(schema));
			}
			ViewCommand::SetHeader(header) => self.header = header,
			ViewCommand::FetchRange { start, count } => self.window.fetch_range(start, count),
			ViewCommand::RangeRealized(range) => self.range_realized(range),
			ViewCommand::CountChanged(total) => self.count_changed(total),
			ViewCommand::SourceChanged(refresh) => self.source_changed(refresh),
			ViewCommand::PriorityHintsLoaded { token, key, result } => self.priority_hints_loaded(token, &key, result),
			ViewCommand::DefaultColumnsLoaded { token, key, result } => self.default_columns_loaded(token, &key, result),
			ViewCommand::Query(query) => self.answer(query),
			ViewCommand::Shutdown => {
				self.subscriptions.unbind_current();
				debug!("view.shutdown");
				return ControlFlow::Break(());
			}
		}
		self.publish();
		ControlFlow::Continue(())
	}

	pub fn lifecycle(&self) -> Lifecycle {
		self.lifecycle
	}

	pub fn context(&self) -> &str {
		&self.context
	}

	pub fn columns(&self) -> &ColumnsModel {
		&self.columns
	}

	pub fn recent(&self) -> &RecencyBuffer<T> {
		&self.recent
	}

	pub fn is_feed_bound(&self) -> bool {
		self.subscriptions.is_bound()
	}

	fn activate(&mut self) {
		if self.lifecycle.is_active() {
			return;
		}
		debug!(context = %self.context, "view.activate");
		self.lifecycle = Lifecycle::AwaitingFirstWindow;
		self.update_column_set();
		self.begin_load_priority_hints();
		self.observe_source_changes();
		self.refresh_blocking();
		self.apply_density();
	}

	fn deactivate(&mut self) {
		if !self.lifecycle.is_active() {
			return;
		}
		debug!(context = %self.context, "view.deactivate");
		self.subscriptions.unbind_current();
		self.lifecycle = Lifecycle::Inactive;
	}

	fn set_context(&mut self, context: Option<String>) {
		let context = context.unwrap_or_else(|| self.config.default_context.clone());
		if context == self.context {
			return;
		}
		let token = self.context_loads.clock().advance();
		debug!(from = %self.context, to = %context, token = token.generation(), "view.context.switch");
		self.context = context;
		if !self.lifecycle.is_active() {
			return;
		}
		self.subscriptions.unbind_current();
		self.update_column_set();
		self.observe_source_changes();
		self.refresh_blocking();
	}

	fn set_data_source(&mut self, source: Option<DataSource>) {
		self.source_loads.clock().advance();
		self.context_loads.clock().advance();
		self.schema.clear_global_hints();
		debug!(source = source.as_ref().map(DataSource::name), "view.source.switch");
		self.data_source = source;
		if !self.lifecycle.is_active() {
			return;
		}
		self.begin_load_priority_hints();
		self.update_column_set();
		self.observe_source_changes();
		self.refresh_blocking();
	}

	fn set_context_priority_properties(&mut self, properties: Vec<String>) {
		self.schema.set_context_properties(&properties);
		self.update_column_set();
		self.reevaluate();
	}

	fn set_display_density(&mut self, density: DisplayDensity) {
		self.density = density;
		self.apply_density();
	}

	fn apply_density(&self) {
		self.window.set_detail_level(self.density.detail_level());
	}

	fn refresh_blocking(&mut self) {
		self.lifecycle = Lifecycle::AwaitingFirstWindow;
		self.window.refresh(RefreshMode::BlockUntilFresh);
	}

	fn cache_key(&self) -> CacheKey {
		let source = self.data_source.as_ref().map(DataSource::name).unwrap_or_default();
		(source.to_string(), self.context.clone())
	}

	/// Restores the cached column set of the current (source, context), or
	/// starts a fresh automatic one and looks for a configured default.
	///
	/// A restored entry whose default load was abandoned by an earlier switch
	/// asks for the document again.
	fn update_column_set(&mut self) {
		if !self.lifecycle.is_active() {
			return;
		}
		let key = self.cache_key();
		if let Some(cached) = self.column_cache.get(&key) {
			trace!(source = %key.0, context = %key.1, "view.columns.restore");
			self.columns = cached.clone();
		} else {
			self.columns = ColumnsModel::default();
			self.column_cache.insert(key.clone(), ColumnsModel::default());
			self.unresolved_defaults.insert(key.clone());
		}
		if self.unresolved_defaults.contains(&key) {
			self.try_load_default_columns();
		}
	}

	/// Replaces the active column set and its cache entry.
	fn replace_columns(&mut self, columns: ColumnsModel) {
		self.column_cache.insert(self.cache_key(), columns.clone());
		self.columns = columns;
	}

	fn try_load_default_columns(&self) {
		let Some(source) = &self.data_source else {
			return;
		};
		let key = self.config.column_set_key(&self.context);
		let token = self.context_loads.clock().current();
		let store = Arc::clone(source.store());
		let tx = self.commands.clone();
		let lookup = key.clone();
		drop(self.context_loads.load(token, async move { store.get(&lookup).await }, move |result| {
			let _ = tx.send(ViewCommand::DefaultColumnsLoaded { token, key, result });
		}));
	}

	fn begin_load_priority_hints(&self) {
		let Some(source) = &self.data_source else {
			return;
		};
		let key = self.config.priority_columns_key.clone();
		let token = self.source_loads.clock().current();
		let store = Arc::clone(source.store());
		let tx = self.commands.clone();
		let lookup = key.clone();
		drop(self.source_loads.load(token, async move { store.get(&lookup).await }, move |result| {
			let _ = tx.send(ViewCommand::PriorityHintsLoaded { token, key, result });
		}));
	}

	fn default_columns_loaded(&mut self, token: ContextToken, key: &str, result: Result<Option<Value>>) {
		if !self.context_loads.clock().is_current(token) {
			trace!(key, token = token.generation(), "view.columns.stale_default");
			return;
		}
		let resolved = self.cache_key();
		self.unresolved_defaults.remove(&resolved);
		let Some(document) = self.document_or_report(key, result) else {
			return;
		};
		match ColumnSetDocument::decode(key, document) {
			Ok(set) => {
				debug!(key, columns = set.columns.len(), "view.columns.default_loaded");
				self.replace_columns(ColumnsModel::user(set.into_schema()));
			}
			Err(err) => self.report_malformed(&err),
		}
	}

	fn priority_hints_loaded(&mut self, token: ContextToken, key: &str, result: Result<Option<Value>>) {
		if !self.source_loads.clock().is_current(token) {
			trace!(key, token = token.generation(), "view.hints.stale");
			return;
		}
		match self.document_or_report(key, result).map(|doc| HintDocument::decode(key, doc)) {
			Some(Ok(hints)) => {
				self.schema.set_global_hints(&hints, key);
			}
			Some(Err(err)) => {
				self.report_malformed(&err);
				self.schema.clear_global_hints();
			}
			None => self.schema.clear_global_hints(),
		}
		self.reevaluate();
	}

	/// Absent documents and store failures both mean "no override".
	fn document_or_report(&self, key: &str, result: Result<Option<Value>>) -> Option<Value> {
		match result {
			Ok(document) => document,
			Err(err) => {
				warn!(key, error = %err, "view.store.load_failed");
				None
			}
		}
	}

	fn report_malformed(&self, err: &ViewError) {
		warn!(error = %err, "view.document.malformed");
		self.notifications.notify(Notification::error(err.to_string()));
	}

	fn observe_source_changes(&mut self) {
		if !self.lifecycle.is_active() {
			return;
		}
		self.subscriptions.unbind_current();
		let (Some(factory), Some(source)) = (&self.feed_factory, &self.data_source) else {
			return;
		};
		let Some(feed) = factory(source) else {
			return;
		};
		let tx = self.commands.clone();
		self.subscriptions.bind(feed.as_ref(), move |refresh| {
			let _ = tx.send(ViewCommand::SourceChanged(refresh));
		});
	}

	fn source_changed(&mut self, refresh: FeedRefresh) {
		if !self.subscriptions.is_current(refresh.handle) {
			trace!(handle = refresh.handle.generation(), "view.feed.stale_refresh");
			return;
		}
		self.window.refresh(refresh.mode);
	}

	fn range_realized(&mut self, range: RealizedRange) {
		if let Some(first) = self.window.item(range.start).and_then(|it| it.payload()) {
			self.documents_have_id = first.id().is_some_and(|id| !id.is_empty());
		}
		let window = &self.window;
		let items: Vec<_> = range
			.indices()
			.filter_map(|index| window.item(index))
			.filter(RealizedItem::is_realized)
			.collect();
		let added = items.len();
		let evicted = self.recent.add(items);
		trace!(start = range.start, count = range.count, added, evicted, "view.window.realized");

		if self.lifecycle == Lifecycle::AwaitingFirstWindow {
			self.lifecycle = Lifecycle::Stable;
		}
		if added == 0 {
			return;
		}
		self.reevaluate();
		self.recent_revision += 1;
	}

	fn count_changed(&mut self, total: usize) {
		if total == 0 && !self.recent.is_empty() {
			debug!(dropped = self.recent.len(), "view.window.reset");
			self.recent.clear();
			self.recent_revision += 1;
		}
	}

	/// Re-runs inference when the active columns are automatic.
	fn reevaluate(&mut self) {
		if self.columns.source != ColumnsSource::Automatic {
			return;
		}
		let sample = self.recent.sample();
		if sample.is_empty() {
			return;
		}
		let proposed = self.schema.suggest(&sample, &self.context);
		if SchemaCoordinator::<T>::should_replace(&self.columns.schema, &proposed) {
			debug!(context = %self.context, columns = proposed.len(), "view.columns.inferred");
			self.replace_columns(ColumnsModel {
				schema: proposed,
				source: ColumnsSource::Automatic,
			});
		}
	}

	fn answer(&self, query: ViewQuery<T>) {
		match query {
			ViewQuery::Sample(reply) => {
				let _ = reply.send(self.recent.sample());
			}
			ViewQuery::AllSuggestions(reply) => {
				let _ = reply.send(self.schema.all_suggestions(&self.recent.sample()));
			}
			ViewQuery::CurrentSuggestion(reply) => {
				let _ = reply.send(self.schema.suggest(&self.recent.sample(), &self.context));
			}
		}
	}

	fn publish(&self) {
		let next = ViewSnapshot {
			lifecycle: self.lifecycle,
			context: self.context.clone(),
			data_source: self.data_source.as_ref().map(|s| s.name().to_string()),
			columns: self.columns.clone(),
			documents_have_id: self.documents_have_id,
			density: self.density,
			export_enabled: self.density.export_enabled(),
			header: self.header.clone(),
			total_count: self.window.total_count(),
			recent_revision: self.recent_revision,
		};
		self.snapshot.send_if_modified(|current| {
			if *current == next {
				return false;
			}
			*current = next;
			true
		});
	}
}

#[cfg(test)]
mod tests;
