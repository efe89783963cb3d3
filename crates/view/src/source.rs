//! Backing windowed source seam.
//!
//! The source owns pages and slots; the view only reads slot handles and
//! tells the source when to refresh and how much detail to fetch. The source
//! reports progress back through the [`WindowEvents`] handed to it by
//! [`WindowSource::attach`].

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use casement_worker::DebounceEmitter;

use crate::item::RealizedItem;

/// Whether a refresh may keep showing previously fetched data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshMode {
	/// Clear the window and wait for fresh pages.
	BlockUntilFresh,
	/// Keep showing current data while fresh pages load.
	PermitStaleWhileRefreshing,
}

/// How much of each item the source fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DetailLevel {
	/// Whole items.
	#[default]
	Full,
	/// Identifiers and metadata only.
	IdOnly,
}

/// Display density chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayDensity {
	/// Compact list of identifiers.
	IdOnly,
	/// Full rows with inferred columns.
	#[default]
	Details,
}

impl DisplayDensity {
	pub const fn detail_level(self) -> DetailLevel {
		match self {
			Self::IdOnly => DetailLevel::IdOnly,
			Self::Details => DetailLevel::Full,
		}
	}

	/// Exporting rows only makes sense when full items are fetched.
	pub const fn export_enabled(self) -> bool {
		matches!(self, Self::Details)
	}
}

/// A contiguous run of slots that became realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RealizedRange {
	pub start: usize,
	pub count: usize,
}

impl RealizedRange {
	pub const fn new(start: usize, count: usize) -> Self {
		Self { start, count }
	}

	pub fn indices(self) -> Range<usize> {
		self.start..self.start.saturating_add(self.count)
	}
}

/// Progress reports from a [`WindowSource`] to the view.
///
/// Cheap to clone and safe to call from any thread.
#[derive(Clone)]
pub struct WindowEvents {
	realized: DebounceEmitter<RealizedRange>,
	count_changed: Arc<dyn Fn(usize) + Send + Sync>,
}

impl fmt::Debug for WindowEvents {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WindowEvents").finish_non_exhaustive()
	}
}

impl WindowEvents {
	pub(crate) fn new(realized: DebounceEmitter<RealizedRange>, count_changed: Arc<dyn Fn(usize) + Send + Sync>) -> Self {
		Self { realized, count_changed }
	}

	/// Slots `start..start + count` now hold payloads.
	pub fn range_realized(&self, start: usize, count: usize) {
		self.realized.emit(RealizedRange::new(start, count));
	}

	/// The window's total item count changed. Zero means a full reset.
	pub fn count_changed(&self, total: usize) {
		(self.count_changed)(total);
	}
}

/// Paged, virtualized source of items.
pub trait WindowSource<T>: Send + Sync {
	/// Hands the source the event handle it must report through.
	fn attach(&self, events: WindowEvents);

	fn total_count(&self) -> usize;

	/// Slot at `index`, if the window currently covers it.
	fn item(&self, index: usize) -> Option<RealizedItem<T>>;

	/// Requests the page(s) covering `start..start + count`. Completion is
	/// reported via [`WindowEvents::range_realized`].
	fn fetch_range(&self, start: usize, count: usize);

	fn refresh(&self, mode: RefreshMode);

	/// Detail level honoured by the next fetch.
	fn set_detail_level(&self, level: DetailLevel);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn density_maps_to_detail_level() {
		assert_eq!(DisplayDensity::IdOnly.detail_level(), DetailLevel::IdOnly);
		assert_eq!(DisplayDensity::Details.detail_level(), DetailLevel::Full);
		assert!(!DisplayDensity::IdOnly.export_enabled());
		assert!(DisplayDensity::Details.export_enabled());
	}

	#[test]
	fn range_indices_saturate() {
		assert_eq!(RealizedRange::new(5, 3).indices(), 5..8);
		assert_eq!(RealizedRange::new(usize::MAX, 2).indices().count(), 0);
	}
}
