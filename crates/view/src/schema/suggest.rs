use std::collections::HashMap;

use super::{ColumnDefinition, ColumnSchema, CompiledHint};
use crate::item::ViewItem;

/// Column-suggestion strategy.
///
/// Implementations must be deterministic for a given input: the sample is
/// already ordered by window index, so equal inputs must yield equal schemas
/// or the active schema would flap.
pub trait ColumnSuggester<T>: Send + Sync {
	/// Proposes columns for `sample` shown in `context`. `hints` are in
	/// priority order, context-scoped hints first.
	fn auto_suggest(&self, sample: &[T], context: &str, hints: &[CompiledHint]) -> ColumnSchema;

	/// Every column the sample could be shown with.
	fn all_suggestions(&self, sample: &[T]) -> Vec<ColumnDefinition>;
}

/// Suggests the most common properties, hinted ones first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencySuggester {
	max_columns: usize,
}

impl FrequencySuggester {
	pub fn new(max_columns: usize) -> Self {
		Self { max_columns }
	}

	pub fn max_columns(&self) -> usize {
		self.max_columns
	}
}

/// Observed properties in first-appearance order with their item counts.
fn tally<T: ViewItem>(sample: &[T]) -> Vec<(String, usize)> {
	let mut order: Vec<(String, usize)> = Vec::new();
	let mut seen: HashMap<String, usize> = HashMap::new();
	for item in sample {
		for path in item.property_paths() {
			match seen.get(&path) {
				Some(&slot) => order[slot].1 += 1,
				None => {
					seen.insert(path.clone(), order.len());
					order.push((path, 1));
				}
			}
		}
	}
	order
}

impl<T: ViewItem> ColumnSuggester<T> for FrequencySuggester {
	fn auto_suggest(&self, sample: &[T], _context: &str, hints: &[CompiledHint]) -> ColumnSchema {
		let mut remaining = tally(sample);
		let mut picked: Vec<String> = Vec::new();

		for hint in hints {
			let mut i = 0;
			while i < remaining.len() {
				if hint.is_match(&remaining[i].0) {
					picked.push(remaining.remove(i).0);
				} else {
					i += 1;
				}
			}
		}

		// Stable: ties keep first appearance.
		remaining.sort_by(|a, b| b.1.cmp(&a.1));
		picked.extend(remaining.into_iter().map(|(path, _)| path));

		picked
			.iter()
			.take(self.max_columns)
			.map(|path| ColumnDefinition::for_property(path))
			.collect()
	}

	fn all_suggestions(&self, sample: &[T]) -> Vec<ColumnDefinition> {
		tally(sample)
			.into_iter()
			.map(|(path, _)| ColumnDefinition::for_property(&path))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::item::Document;
	use crate::schema::PriorityHint;

	fn order(id: u32, extra: serde_json::Value) -> Document {
		let mut data = json!({ "Id": id, "Total": 10, "Status": "open", "Notes": "" });
		if let (Some(map), serde_json::Value::Object(extra)) = (data.as_object_mut(), extra) {
			map.extend(extra);
		}
		Document::new(format!("orders/{id}"), data)
	}

	fn bindings(schema: &ColumnSchema) -> Vec<&str> {
		schema.bindings().collect()
	}

	#[test]
	fn hinted_properties_lead_in_hint_order() {
		let sample = vec![order(1, json!({})), order(2, json!({}))];
		let hints: Vec<_> = ["Total", "Status"]
			.into_iter()
			.map(|p| PriorityHint::new(p).compile().unwrap())
			.collect();

		let schema = FrequencySuggester::new(6).auto_suggest(&sample, "Orders", &hints);

		assert_eq!(bindings(&schema), vec!["Total", "Status", "Id", "Notes"]);
	}

	#[test]
	fn unhinted_properties_rank_by_frequency() {
		let sample = vec![
			Document::anonymous(json!({ "Rare": 1, "Common": 1 })),
			Document::anonymous(json!({ "Common": 2, "Mid": 1 })),
			Document::anonymous(json!({ "Common": 3, "Mid": 2 })),
		];

		let schema = FrequencySuggester::new(2).auto_suggest(&sample, "Default", &[]);

		assert_eq!(bindings(&schema), vec!["Common", "Mid"]);
	}

	#[test]
	fn all_suggestions_lists_every_property() {
		let sample = vec![order(1, json!({ "Address": { "City": "Oslo" } }))];

		let all = <FrequencySuggester as ColumnSuggester<Document>>::all_suggestions(&FrequencySuggester::new(1), &sample);

		let names: Vec<_> = all.iter().map(|c| c.binding.as_str()).collect();
		assert_eq!(names, vec!["Id", "Total", "Status", "Notes", "Address.City"]);
		assert_eq!(all[4].header, "City");
	}

	#[test]
	fn empty_sample_suggests_nothing() {
		let schema = FrequencySuggester::new(6).auto_suggest(&Vec::<Document>::new(), "Orders", &[]);
		assert!(schema.is_empty());
	}
}
