//! Windowed view synchronization.
//!
//! Presents a server-backed, virtualized list without materializing it, and
//! keeps a stable column schema inferred from whatever is currently realized.
//!
//! * [`RecencyBuffer`]: bounded memory of recently realized items, read back
//!   in window order so out-of-order page arrivals do not reshuffle columns.
//! * [`SchemaCoordinator`]: merges priority hints and decides when the
//!   inferred schema actually changed.
//! * [`StaleGuardedLoader`]: async document loads dropped when their context
//!   has moved on.
//! * [`ChangeFeedSubscriptions`]: one change-feed binding at a time, debounced
//!   into stale-tolerant refreshes.
//! * [`WindowedView`]: the presentation task and its handle.

pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod item;
pub mod loader;
pub mod memory;
pub mod notify;
pub mod recency;
pub mod schema;
pub mod source;
pub mod store;
pub mod token;
mod view;

pub use config::ViewConfig;
pub use controller::{Lifecycle, ViewCommand, ViewQuery, ViewSnapshot, WindowedViewController};
pub use error::{Result, ViewError};
pub use feed::{ChangeFeed, ChangeFeedFactory, ChangeFeedSubscriptions, ChangeNotice, FeedRefresh, MemoryFeed, SubscriptionHandle};
pub use item::{Document, RealizedItem, ViewItem};
pub use loader::StaleGuardedLoader;
pub use memory::MemoryWindow;
pub use notify::{DiscardNotifications, Level, Notification, NotificationCenter, NotificationSink};
pub use recency::RecencyBuffer;
pub use schema::{
	ColumnDefinition, ColumnSchema, ColumnSetDocument, ColumnSuggester, ColumnsModel, ColumnsSource, CompiledHint, FrequencySuggester,
	HintDocument, PriorityHint, SchemaCoordinator,
};
pub use source::{DetailLevel, DisplayDensity, RealizedRange, RefreshMode, WindowEvents, WindowSource};
pub use store::{DataSource, DocumentStore, MemoryStore};
pub use token::{ContextClock, ContextToken};
pub use view::{WindowedView, WindowedViewBuilder};
