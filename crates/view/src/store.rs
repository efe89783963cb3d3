//! Configuration document store seam.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::Result;

/// Key-value store holding optional configuration documents.
///
/// A missing key is `Ok(None)`, never an error. Errors are reserved for
/// transport failures and are reported as [`crate::ViewError::Store`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
	async fn get(&self, key: &str) -> Result<Option<Value>>;
}

/// One backing data-source instance (a database, in the document case).
///
/// Column sets are cached per source name, so two sources with the same name
/// share cached columns.
#[derive(Clone)]
pub struct DataSource {
	name: String,
	store: Arc<dyn DocumentStore>,
}

impl fmt::Debug for DataSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DataSource").field("name", &self.name).finish_non_exhaustive()
	}
}

impl DataSource {
	pub fn new(name: impl Into<String>, store: Arc<dyn DocumentStore>) -> Self {
		Self { name: name.into(), store }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn store(&self) -> &Arc<dyn DocumentStore> {
		&self.store
	}
}

/// In-memory [`DocumentStore`] with optional simulated latency.
#[derive(Debug, Default)]
pub struct MemoryStore {
	docs: RwLock<HashMap<String, Value>>,
	latency: RwLock<Option<Duration>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&self, key: impl Into<String>, document: Value) {
		self.docs.write().insert(key.into(), document);
	}

	pub fn remove(&self, key: &str) -> Option<Value> {
		self.docs.write().remove(key)
	}

	/// Delays every subsequent lookup by `latency`.
	pub fn set_latency(&self, latency: Option<Duration>) {
		*self.latency.write() = latency;
	}
}

#[async_trait]
impl DocumentStore for MemoryStore {
	async fn get(&self, key: &str) -> Result<Option<Value>> {
		let latency = *self.latency.read();
		if let Some(latency) = latency {
			tokio::time::sleep(latency).await;
		}
		Ok(self.docs.read().get(key).cloned())
	}
}
