//! Items shown in the view and the shared slots the backing window keeps them in.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// An item the view can display and infer columns from.
pub trait ViewItem: Clone + Send + Sync + 'static {
	/// Identifier of the item, if it has one.
	fn id(&self) -> Option<&str>;

	/// Property paths exposed by this item, in the item's own order.
	///
	/// Nested properties are addressed with `.`-separated paths.
	fn property_paths(&self) -> Vec<String>;
}

/// A JSON document as returned by a document database.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
	pub id: Option<String>,
	pub data: Value,
}

impl Document {
	pub fn new(id: impl Into<String>, data: Value) -> Self {
		Self { id: Some(id.into()), data }
	}

	/// A projection or query result without a document identifier.
	pub fn anonymous(data: Value) -> Self {
		Self { id: None, data }
	}
}

impl ViewItem for Document {
	fn id(&self) -> Option<&str> {
		self.id.as_deref()
	}

	fn property_paths(&self) -> Vec<String> {
		let mut paths = Vec::new();
		collect_paths(&self.data, "", &mut paths);
		paths
	}
}

fn collect_paths(value: &Value, prefix: &str, out: &mut Vec<String>) {
	let Value::Object(map) = value else {
		return;
	};
	for (key, child) in map {
		let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
		match child {
			Value::Object(inner) if !inner.is_empty() => collect_paths(child, &path, out),
			_ => out.push(path),
		}
	}
}

/// Handle to one slot of the backing window.
///
/// Clones share the slot: when the window invalidates it (reset, or the
/// index leaves the window) every holder observes `is_realized() == false`.
pub struct RealizedItem<T> {
	index: usize,
	slot: Arc<RwLock<Option<T>>>,
}

impl<T> Clone for RealizedItem<T> {
	fn clone(&self) -> Self {
		Self {
			index: self.index,
			slot: Arc::clone(&self.slot),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for RealizedItem<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RealizedItem")
			.field("index", &self.index)
			.field("payload", &*self.slot.read())
			.finish()
	}
}

impl<T> RealizedItem<T> {
	/// A slot whose page has not arrived yet.
	pub fn pending(index: usize) -> Self {
		Self {
			index,
			slot: Arc::new(RwLock::new(None)),
		}
	}

	/// A slot holding `payload`.
	pub fn realized(index: usize, payload: T) -> Self {
		Self {
			index,
			slot: Arc::new(RwLock::new(Some(payload))),
		}
	}

	pub fn index(&self) -> usize {
		self.index
	}

	pub fn is_realized(&self) -> bool {
		self.slot.read().is_some()
	}

	/// Fills the slot when its page arrives.
	pub fn realize(&self, payload: T) {
		*self.slot.write() = Some(payload);
	}

	/// Clears the payload.
	pub fn invalidate(&self) {
		let _old = self.slot.write().take();
	}

	/// Returns true when both handles refer to the same window slot.
	pub fn same_slot(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.slot, &other.slot)
	}
}

impl<T: Clone> RealizedItem<T> {
	/// Snapshot of the payload, if realized.
	pub fn payload(&self) -> Option<T> {
		self.slot.read().clone()
	}
}
