use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc;

use super::*;
use crate::feed::{ChangeFeed, ChangeNotice, MemoryFeed};
use crate::item::Document;
use crate::memory::MemoryWindow;
use crate::notify::{Level, NotificationCenter};
use crate::schema::FrequencySuggester;
use crate::source::DetailLevel;
use crate::store::MemoryStore;

fn orders(n: usize) -> Vec<Document> {
	(0..n)
		.map(|i| Document::new(format!("orders/{i}"), json!({ "Total": i, "Status": "open", "Notes": "" })))
		.collect()
}

fn customers(n: usize) -> Vec<Document> {
	(0..n)
		.map(|i| Document::new(format!("customers/{i}"), json!({ "Name": "Ann", "City": "Oslo" })))
		.collect()
}

struct Harness {
	controller: WindowedViewController<Document>,
	rx: mpsc::UnboundedReceiver<ViewCommand<Document>>,
	window: Arc<MemoryWindow<Document>>,
	notes: Arc<NotificationCenter>,
	snapshot: watch::Receiver<ViewSnapshot>,
}

impl Harness {
	fn new(rows: Vec<Document>) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		let window = Arc::new(MemoryWindow::new(rows));
		let notes = Arc::new(NotificationCenter::new());
		let (controller, snapshot) = WindowedViewController::<Document>::new(
			ViewConfig::default(),
			window.clone(),
			Arc::new(FrequencySuggester::new(6)),
			notes.clone(),
			tx,
		);
		Self {
			controller,
			rx,
			window,
			notes,
			snapshot,
		}
	}

	fn with_store(rows: Vec<Document>, store: Arc<MemoryStore>) -> Self {
		let mut harness = Self::new(rows);
		harness.send(ViewCommand::SetDataSource(Some(DataSource::new("Northwind", store))));
		harness
	}

	fn send(&mut self, command: ViewCommand<Document>) {
		let _ = self.controller.handle(command);
	}

	/// Applies everything marshalled so far.
	fn pump(&mut self) {
		while let Ok(command) = self.rx.try_recv() {
			let _ = self.controller.handle(command);
		}
	}

	/// Lets debounce windows and loads elapse, then pumps.
	async fn settle(&mut self) {
		tokio::time::sleep(Duration::from_millis(1100)).await;
		self.pump();
	}

	async fn realize(&mut self, start: usize, count: usize) {
		self.send(ViewCommand::FetchRange { start, count });
		self.settle().await;
	}

	fn bindings(&self) -> Vec<String> {
		self.controller.columns().schema.bindings().map(str::to_string).collect()
	}
}

fn column_set(bindings: &[&str]) -> Value {
	let columns: Vec<_> = bindings.iter().map(|b| json!({ "binding": b, "header": b })).collect();
	json!({ "columns": columns })
}

#[tokio::test(start_paused = true)]
async fn first_batch_infers_columns_and_stabilizes() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	assert_eq!(h.controller.lifecycle(), Lifecycle::AwaitingFirstWindow);
	assert_eq!(h.window.refreshes(), vec![RefreshMode::BlockUntilFresh]);

	h.realize(0, 5).await;

	assert_eq!(h.controller.lifecycle(), Lifecycle::Stable);
	assert_eq!(h.bindings(), vec!["Total", "Status", "Notes"]);
	assert!(h.controller.columns().is_automatic());
	assert_eq!(h.controller.recent().len(), 5);
	let snapshot = h.snapshot.borrow().clone();
	assert!(snapshot.documents_have_id);
	assert_eq!(snapshot.recent_revision, 1);
	assert_eq!(snapshot.total_count, 10);
}

#[tokio::test(start_paused = true)]
async fn reset_to_zero_rebuilds_schema_from_new_items() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.realize(0, 5).await;
	assert_eq!(h.bindings(), vec!["Total", "Status", "Notes"]);

	h.window.set_rows(customers(10));
	h.window.refresh(RefreshMode::BlockUntilFresh);
	h.pump();
	assert!(h.controller.recent().is_empty());

	h.realize(0, 5).await;
	assert_eq!(h.bindings(), vec!["Name", "City"]);
}

#[tokio::test(start_paused = true)]
async fn realization_bursts_are_coalesced() {
	let mut h = Harness::new(orders(30));
	h.send(ViewCommand::Activate);
	h.send(ViewCommand::FetchRange { start: 0, count: 10 });
	tokio::time::sleep(Duration::from_millis(300)).await;
	h.send(ViewCommand::FetchRange { start: 10, count: 10 });
	h.settle().await;

	assert_eq!(h.snapshot.borrow().recent_revision, 1);
	let indices: Vec<_> = h.controller.recent().arrivals().map(|it| it.index()).collect();
	assert_eq!(indices, (10..20).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn priority_document_orders_columns() {
	let store = Arc::new(MemoryStore::new());
	store.insert("Studio/PriorityColumns", json!([{ "propertyPattern": "^Notes$" }]));
	let mut h = Harness::with_store(orders(10), store);
	h.send(ViewCommand::Activate);

	h.realize(0, 5).await;

	assert_eq!(h.bindings(), vec!["Notes", "Total", "Status"]);
	assert!(h.notes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_priority_pattern_is_reported_and_skipped() {
	let store = Arc::new(MemoryStore::new());
	store.insert(
		"Studio/PriorityColumns",
		json!({ "Items": [{ "PropertyNamePattern": "(" }, { "PropertyNamePattern": "^Status$" }] }),
	);
	let mut h = Harness::with_store(orders(10), store);
	h.send(ViewCommand::Activate);

	h.realize(0, 5).await;

	assert_eq!(h.bindings()[0], "Status");
	let notes = h.notes.take_pending();
	assert_eq!(notes.len(), 1);
	assert_eq!(notes[0].level, Level::Warning);
	assert!(notes[0].message.contains("'('"));
	assert!(notes[0].message.contains("Studio/PriorityColumns"));
}

#[tokio::test(start_paused = true)]
async fn absent_documents_raise_no_notification() {
	let mut h = Harness::with_store(orders(10), Arc::new(MemoryStore::new()));
	h.send(ViewCommand::Activate);

	h.realize(0, 5).await;

	assert!(h.notes.is_empty());
	assert_eq!(h.bindings(), vec!["Total", "Status", "Notes"]);
}

#[tokio::test(start_paused = true)]
async fn default_column_set_is_user_owned() {
	let store = Arc::new(MemoryStore::new());
	store.insert("Studio/Columns/Orders", column_set(&["Total"]));
	let mut h = Harness::with_store(orders(10), store);
	h.send(ViewCommand::SetContext(Some("Orders".into())));
	h.send(ViewCommand::Activate);
	h.settle().await;

	assert_eq!(h.controller.columns().source, ColumnsSource::User);
	assert_eq!(h.bindings(), vec!["Total"]);

	h.realize(0, 5).await;
	assert_eq!(h.bindings(), vec!["Total"]);
}

#[tokio::test(start_paused = true)]
async fn malformed_column_set_degrades_to_inference() {
	let store = Arc::new(MemoryStore::new());
	store.insert("Studio/Columns/Default", json!({ "columns": "Total" }));
	let mut h = Harness::with_store(orders(10), store);
	h.send(ViewCommand::Activate);

	h.realize(0, 5).await;

	assert!(h.controller.columns().is_automatic());
	assert_eq!(h.bindings(), vec!["Total", "Status", "Notes"]);
	let notes = h.notes.take_pending();
	assert_eq!(notes.len(), 1);
	assert_eq!(notes[0].level, Level::Error);
	assert!(notes[0].message.contains("Studio/Columns/Default"));
}

#[tokio::test(start_paused = true)]
async fn column_set_for_abandoned_context_is_discarded() {
	let store = Arc::new(MemoryStore::new());
	store.insert("Studio/Columns/Orders", column_set(&["Total"]));
	store.set_latency(Some(Duration::from_millis(500)));
	let mut h = Harness::with_store(orders(10), store);
	h.send(ViewCommand::SetContext(Some("Orders".into())));
	h.send(ViewCommand::Activate);

	h.send(ViewCommand::SetContext(Some("Customers".into())));
	h.settle().await;

	assert_eq!(h.controller.context(), "Customers");
	assert!(h.controller.columns().is_automatic());
	assert!(h.controller.columns().schema.is_empty());
	assert!(h.notes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn quick_return_reloads_abandoned_column_set() {
	let store = Arc::new(MemoryStore::new());
	store.insert("Studio/Columns/Orders", column_set(&["Total"]));
	store.set_latency(Some(Duration::from_millis(500)));
	let mut h = Harness::with_store(orders(10), store);
	h.send(ViewCommand::SetContext(Some("Orders".into())));
	h.send(ViewCommand::Activate);
	h.send(ViewCommand::SetContext(Some("Customers".into())));
	h.send(ViewCommand::SetContext(Some("Orders".into())));
	h.settle().await;
	h.settle().await;

	assert_eq!(h.controller.context(), "Orders");
	assert_eq!(h.controller.columns().source, ColumnsSource::User);
	assert_eq!(h.bindings(), vec!["Total"]);
}

#[tokio::test(start_paused = true)]
async fn returning_to_a_context_restores_its_columns() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.realize(0, 5).await;
	let orders_columns = h.controller.columns().clone();

	h.send(ViewCommand::SetContext(Some("Archive".into())));
	assert!(h.controller.columns().schema.is_empty());

	h.send(ViewCommand::SetContext(None));
	assert_eq!(h.controller.context(), "Default");
	assert_eq!(h.controller.columns(), &orders_columns);
}

#[tokio::test(start_paused = true)]
async fn user_columns_survive_realization() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.send(ViewCommand::SetColumns(ColumnSchema::new(vec![ColumnDefinition::for_property("Notes")])));

	h.realize(0, 5).await;

	assert_eq!(h.bindings(), vec!["Notes"]);
	assert_eq!(h.controller.columns().source, ColumnsSource::User);
}

#[tokio::test(start_paused = true)]
async fn context_properties_lead_inference() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.realize(0, 5).await;

	h.send(ViewCommand::SetContextPriorityProperties(vec!["Notes".into()]));

	assert_eq!(h.bindings(), vec!["Notes", "Total", "Status"]);
}

#[tokio::test(start_paused = true)]
async fn change_feed_refreshes_permit_stale_data() {
	let feed = Arc::new(MemoryFeed::default());
	let factory_feed = Arc::clone(&feed);
	let mut h = Harness::with_store(orders(10), Arc::new(MemoryStore::new()));
	h.send(ViewCommand::SetChangeFeedFactory(Some(Arc::new(move |_source: &DataSource| {
		Some(Arc::clone(&factory_feed) as Arc<dyn ChangeFeed>)
	}))));
	assert!(!h.controller.is_feed_bound());

	h.send(ViewCommand::Activate);
	assert!(h.controller.is_feed_bound());
	tokio::task::yield_now().await;
	feed.publish(ChangeNotice::for_key("orders/3"));
	feed.publish(ChangeNotice::for_key("orders/4"));
	h.settle().await;

	assert_eq!(
		h.window.refreshes(),
		vec![RefreshMode::BlockUntilFresh, RefreshMode::PermitStaleWhileRefreshing]
	);
}

#[tokio::test(start_paused = true)]
async fn refresh_from_replaced_binding_is_ignored() {
	let feed = Arc::new(MemoryFeed::default());
	let factory_feed = Arc::clone(&feed);
	let mut h = Harness::with_store(orders(10), Arc::new(MemoryStore::new()));
	h.send(ViewCommand::SetChangeFeedFactory(Some(Arc::new(move |_source: &DataSource| {
		Some(Arc::clone(&factory_feed) as Arc<dyn ChangeFeed>)
	}))));
	h.send(ViewCommand::Activate);
	tokio::task::yield_now().await;
	feed.publish(ChangeNotice::default());
	tokio::time::sleep(Duration::from_millis(1100)).await;

	// Delivered but not yet applied when the context switch rebinds.
	h.send(ViewCommand::SetContext(Some("Orders".into())));
	h.pump();

	assert_eq!(
		h.window.refreshes(),
		vec![RefreshMode::BlockUntilFresh, RefreshMode::BlockUntilFresh]
	);
	assert!(h.controller.is_feed_bound());
}

#[tokio::test(start_paused = true)]
async fn deactivation_unbinds_the_feed() {
	let feed = Arc::new(MemoryFeed::default());
	let factory_feed = Arc::clone(&feed);
	let mut h = Harness::with_store(orders(10), Arc::new(MemoryStore::new()));
	h.send(ViewCommand::SetChangeFeedFactory(Some(Arc::new(move |_source: &DataSource| {
		Some(Arc::clone(&factory_feed) as Arc<dyn ChangeFeed>)
	}))));
	h.send(ViewCommand::Activate);
	h.send(ViewCommand::Deactivate);

	assert_eq!(h.controller.lifecycle(), Lifecycle::Inactive);
	assert!(!h.controller.is_feed_bound());
	tokio::time::sleep(Duration::from_millis(10)).await;
	assert_eq!(feed.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn density_reaches_the_window_and_export_affordance() {
	let mut h = Harness::new(orders(3));
	h.send(ViewCommand::Activate);
	assert_eq!(h.window.detail_level(), DetailLevel::Full);
	assert!(h.snapshot.borrow().export_enabled);

	h.send(ViewCommand::SetDisplayDensity(DisplayDensity::IdOnly));

	assert_eq!(h.window.detail_level(), DetailLevel::IdOnly);
	let snapshot = h.snapshot.borrow().clone();
	assert_eq!(snapshot.density, DisplayDensity::IdOnly);
	assert!(!snapshot.export_enabled);
}

#[tokio::test(start_paused = true)]
async fn anonymous_items_clear_the_identifier_flag() {
	let rows = (0..4).map(|i| Document::anonymous(json!({ "Count": i }))).collect();
	let mut h = Harness::new(rows);
	h.send(ViewCommand::Activate);

	h.realize(0, 4).await;

	assert!(!h.snapshot.borrow().documents_have_id);
	assert_eq!(h.bindings(), vec!["Count"]);
}

#[tokio::test(start_paused = true)]
async fn queries_answer_from_the_recent_sample() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.send(ViewCommand::FetchRange { start: 6, count: 2 });
	h.settle().await;

	let (tx, rx) = oneshot::channel();
	h.send(ViewCommand::Query(ViewQuery::Sample(tx)));
	let sample = rx.await.unwrap();
	let ids: Vec<_> = sample.iter().filter_map(|d| d.id.clone()).collect();
	assert_eq!(ids, vec!["orders/6", "orders/7"]);

	let (tx, rx) = oneshot::channel();
	h.send(ViewCommand::Query(ViewQuery::AllSuggestions(tx)));
	assert_eq!(rx.await.unwrap().len(), 3);

	let (tx, rx) = oneshot::channel();
	h.send(ViewCommand::Query(ViewQuery::CurrentSuggestion(tx)));
	assert!(rx.await.unwrap().same_bindings(&h.controller.columns().schema));
}

#[tokio::test(start_paused = true)]
async fn shutdown_breaks_the_loop() {
	let mut h = Harness::new(Vec::new());
	assert!(h.controller.handle(ViewCommand::Shutdown).is_break());
	assert!(h.controller.handle(ViewCommand::Activate).is_continue());
}

#[tokio::test(start_paused = true)]
async fn report_for_unpopulated_slots_is_skipped() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.pump();

	h.send(ViewCommand::RangeRealized(RealizedRange::new(2, 10)));
	h.send(ViewCommand::RangeRealized(RealizedRange::new(usize::MAX, 5)));

	assert!(h.controller.recent().is_empty());
	assert!(h.controller.columns().schema.is_empty());
	let snapshot = h.snapshot.borrow().clone();
	assert!(!snapshot.documents_have_id);
	assert_eq!(snapshot.recent_revision, 0);
}

#[tokio::test(start_paused = true)]
async fn report_racing_a_reset_keeps_identifier_flag() {
	let mut h = Harness::new(orders(10));
	h.send(ViewCommand::Activate);
	h.realize(0, 5).await;
	assert!(h.snapshot.borrow().documents_have_id);

	h.window.refresh(RefreshMode::BlockUntilFresh);
	h.send(ViewCommand::RangeRealized(RealizedRange::new(0, 5)));
	h.pump();

	assert!(h.controller.recent().is_empty());
	assert!(h.snapshot.borrow().documents_have_id);
	assert_eq!(h.bindings(), vec!["Total", "Status", "Notes"]);
}
