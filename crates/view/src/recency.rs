//! Bounded, arrival-ordered memory of recently realized items.
//!
//! Pages from a remote source can come back in any order, so the buffer
//! stores entries by arrival (which makes eviction fair) and sorts by window
//! index only when read (which makes the sample handed to schema inference
//! deterministic).

use std::collections::VecDeque;

use crate::item::RealizedItem;

/// Fixed-capacity FIFO of realized window slots.
#[derive(Debug)]
pub struct RecencyBuffer<T> {
	capacity: usize,
	entries: VecDeque<RealizedItem<T>>,
}

impl<T> RecencyBuffer<T> {
	/// Creates an empty buffer holding at most `capacity` entries.
	pub fn new(capacity: usize) -> Self {
		assert!(capacity > 0, "recency buffer capacity must be > 0");
		Self {
			capacity,
			entries: VecDeque::with_capacity(capacity),
		}
	}

	/// Appends `items` in input order, evicting the oldest arrivals beyond
	/// capacity. A slot that is already present moves to the newest position
	/// instead of being stored twice.
	///
	/// Returns the number of evicted entries.
	pub fn add(&mut self, items: impl IntoIterator<Item = RealizedItem<T>>) -> usize {
		let mut evicted = 0;
		for item in items {
			if let Some(pos) = self.entries.iter().position(|it| it.same_slot(&item)) {
				self.entries.remove(pos);
			}
			if self.entries.len() == self.capacity {
				self.entries.pop_front();
				evicted += 1;
			}
			self.entries.push_back(item);
		}
		evicted
	}

	/// Forgets every entry.
	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Entries from oldest to newest arrival.
	pub fn arrivals(&self) -> impl Iterator<Item = &RealizedItem<T>> {
		self.entries.iter()
	}

	/// Realized entries sorted ascending by window index.
	///
	/// The sort is stable, so entries sharing an index keep arrival order.
	pub fn snapshot(&self) -> Vec<RealizedItem<T>> {
		let mut realized: Vec<_> = self.entries.iter().filter(|it| it.is_realized()).cloned().collect();
		realized.sort_by_key(RealizedItem::index);
		realized
	}
}

impl<T: Clone> RecencyBuffer<T> {
	/// Payloads of [`Self::snapshot`], in index order.
	pub fn sample(&self) -> Vec<T> {
		let mut realized: Vec<(usize, T)> = self.entries.iter().filter_map(|it| it.payload().map(|p| (it.index(), p))).collect();
		realized.sort_by_key(|(index, _)| *index);
		realized.into_iter().map(|(_, payload)| payload).collect()
	}
}
