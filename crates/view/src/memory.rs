//! In-memory [`WindowSource`].
//!
//! Holds every row up front and realizes slots on request. Useful for
//! embedding the view over data that is already local, and as the backing
//! window in tests.

use parking_lot::Mutex;
use tracing::trace;

use crate::item::RealizedItem;
use crate::source::{DetailLevel, RefreshMode, WindowEvents, WindowSource};

#[derive(Debug)]
struct WindowState<T> {
	rows: Vec<T>,
	slots: Vec<RealizedItem<T>>,
	detail: DetailLevel,
	events: Option<WindowEvents>,
	refreshes: Vec<RefreshMode>,
	fetches: Vec<(usize, usize)>,
}

/// Window over a `Vec` of rows.
#[derive(Debug)]
pub struct MemoryWindow<T> {
	state: Mutex<WindowState<T>>,
}

impl<T: Clone + Send + Sync + 'static> MemoryWindow<T> {
	pub fn new(rows: Vec<T>) -> Self {
		let slots = (0..rows.len()).map(RealizedItem::pending).collect();
		Self {
			state: Mutex::new(WindowState {
				rows,
				slots,
				detail: DetailLevel::default(),
				events: None,
				refreshes: Vec::new(),
				fetches: Vec::new(),
			}),
		}
	}

	/// Replaces the rows. The window picks them up on the next refresh.
	pub fn set_rows(&self, rows: Vec<T>) {
		self.state.lock().rows = rows;
	}

	/// Refresh modes received so far, oldest first.
	pub fn refreshes(&self) -> Vec<RefreshMode> {
		self.state.lock().refreshes.clone()
	}

	/// `(start, count)` of every fetch request, oldest first.
	pub fn fetches(&self) -> Vec<(usize, usize)> {
		self.state.lock().fetches.clone()
	}

	pub fn detail_level(&self) -> DetailLevel {
		self.state.lock().detail
	}
}

impl<T: Clone + Send + Sync + 'static> WindowSource<T> for MemoryWindow<T> {
	fn attach(&self, events: WindowEvents) {
		self.state.lock().events = Some(events);
	}

	fn total_count(&self) -> usize {
		self.state.lock().slots.len()
	}

	fn item(&self, index: usize) -> Option<RealizedItem<T>> {
		self.state.lock().slots.get(index).cloned()
	}

	fn fetch_range(&self, start: usize, count: usize) {
		let (events, realized) = {
			let mut state = self.state.lock();
			state.fetches.push((start, count));
			let end = start.saturating_add(count).min(state.slots.len());
			let start = start.min(end);
			for index in start..end {
				let row = state.rows.get(index).cloned();
				if let Some(row) = row {
					state.slots[index].realize(row);
				}
			}
			(state.events.clone(), start..end)
		};
		trace!(start = realized.start, end = realized.end, "view.memory.fetch");
		match events {
			Some(events) if !realized.is_empty() => events.range_realized(realized.start, realized.len()),
			_ => {}
		}
	}

	fn refresh(&self, mode: RefreshMode) {
		let (events, before, after) = {
			let mut state = self.state.lock();
			state.refreshes.push(mode);
			let before = state.slots.len();
			match mode {
				RefreshMode::BlockUntilFresh => {
					for slot in &state.slots {
						slot.invalidate();
					}
					state.slots = (0..state.rows.len()).map(RealizedItem::pending).collect();
				}
				RefreshMode::PermitStaleWhileRefreshing => {
					let len = state.rows.len();
					for slot in state.slots.iter().skip(len) {
						slot.invalidate();
					}
					state.slots.truncate(len);
					for index in 0..state.slots.len() {
						if state.slots[index].is_realized() {
							let row = state.rows[index].clone();
							state.slots[index].realize(row);
						}
					}
					let have = state.slots.len();
					state.slots.extend((have..len).map(RealizedItem::pending));
				}
			}
			(state.events.clone(), before, state.slots.len())
		};
		let Some(events) = events else {
			return;
		};
		match mode {
			RefreshMode::BlockUntilFresh => {
				events.count_changed(0);
				if after > 0 {
					events.count_changed(after);
				}
			}
			RefreshMode::PermitStaleWhileRefreshing if before != after => events.count_changed(after),
			RefreshMode::PermitStaleWhileRefreshing => {}
		}
	}

	fn set_detail_level(&self, level: DetailLevel) {
		self.state.lock().detail = level;
	}
}
