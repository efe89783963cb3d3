use std::sync::Arc;

use tracing::debug;

use super::{ColumnDefinition, ColumnSchema, ColumnSuggester, CompiledHint, PriorityHint, compile_hints};
use crate::notify::NotificationSink;

/// Origin reported for invalid context-scoped patterns.
const CONTEXT_ORIGIN: &str = "context priority properties";

/// Merges priority hints and drives the suggestion strategy.
pub struct SchemaCoordinator<T> {
	suggester: Arc<dyn ColumnSuggester<T>>,
	notifications: Arc<dyn NotificationSink>,
	global: Vec<CompiledHint>,
	context_scoped: Vec<CompiledHint>,
}

impl<T> SchemaCoordinator<T> {
	pub fn new(suggester: Arc<dyn ColumnSuggester<T>>, notifications: Arc<dyn NotificationSink>) -> Self {
		Self {
			suggester,
			notifications,
			global: Vec::new(),
			context_scoped: Vec::new(),
		}
	}

	/// Replaces the global hints. Invalid patterns are reported as coming
	/// from `origin` and skipped. Returns how many hints were accepted.
	pub fn set_global_hints(&mut self, hints: &[PriorityHint], origin: &str) -> usize {
		self.global = compile_hints(hints, origin, self.notifications.as_ref());
		debug!(origin, accepted = self.global.len(), offered = hints.len(), "view.schema.global_hints");
		self.global.len()
	}

	pub fn clear_global_hints(&mut self) {
		self.global.clear();
	}

	/// Replaces the context-scoped hints with one exact-match hint per
	/// property path.
	pub fn set_context_properties(&mut self, properties: &[String]) {
		let hints: Vec<_> = properties.iter().map(|p| PriorityHint::for_property(p)).collect();
		self.context_scoped = compile_hints(&hints, CONTEXT_ORIGIN, self.notifications.as_ref());
	}

	/// Context-scoped hints followed by global hints.
	pub fn merged_hints(&self) -> Vec<CompiledHint> {
		self.context_scoped.iter().chain(&self.global).cloned().collect()
	}

	pub fn suggest(&self, sample: &[T], context: &str) -> ColumnSchema {
		self.suggester.auto_suggest(sample, context, &self.merged_hints())
	}

	/// Like [`Self::suggest`], but `hints` are compiled and placed ahead of
	/// the merged hints. Invalid entries are reported and skipped.
	pub fn suggest_with_hints(&self, sample: &[T], context: &str, hints: &[PriorityHint], origin: &str) -> ColumnSchema {
		let mut compiled = compile_hints(hints, origin, self.notifications.as_ref());
		compiled.extend(self.merged_hints());
		self.suggester.auto_suggest(sample, context, &compiled)
	}

	pub fn all_suggestions(&self, sample: &[T]) -> Vec<ColumnDefinition> {
		self.suggester.all_suggestions(sample)
	}

	/// True iff the ordered binding sequences differ.
	pub fn should_replace(current: &ColumnSchema, proposed: &ColumnSchema) -> bool {
		!current.same_bindings(proposed)
	}
}
