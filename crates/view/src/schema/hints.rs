use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, ViewError};
use crate::notify::{Notification, NotificationSink};

/// A property-name pattern that should be shown before other columns.
///
/// Weight is implicit: earlier hints win.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityHint {
	#[serde(alias = "PropertyNamePattern", alias = "propertyNamePattern")]
	pub property_pattern: String,
}

impl PriorityHint {
	pub fn new(pattern: impl Into<String>) -> Self {
		Self {
			property_pattern: pattern.into(),
		}
	}

	/// Hint matching exactly the property at `path`.
	pub fn for_property(path: &str) -> Self {
		Self::new(format!("^{}$", regex::escape(path)))
	}

	pub fn compile(&self) -> std::result::Result<CompiledHint, regex::Error> {
		Ok(CompiledHint {
			regex: Regex::new(&self.property_pattern)?,
			hint: self.clone(),
		})
	}
}

/// A hint whose pattern is known to be valid.
#[derive(Debug, Clone)]
pub struct CompiledHint {
	hint: PriorityHint,
	regex: Regex,
}

impl CompiledHint {
	pub fn pattern(&self) -> &str {
		&self.hint.property_pattern
	}

	pub fn hint(&self) -> &PriorityHint {
		&self.hint
	}

	pub fn is_match(&self, property: &str) -> bool {
		self.regex.is_match(property)
	}
}

/// Priority-columns document: either a bare list of hints or an object with
/// an `items` list. A null list counts as empty.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HintDocument {
	List(Vec<PriorityHint>),
	Container {
		#[serde(default, alias = "Items")]
		items: Option<Vec<PriorityHint>>,
	},
}

impl HintDocument {
	pub fn decode(key: &str, document: Value) -> Result<Vec<PriorityHint>> {
		let doc: Self = serde_json::from_value(document).map_err(|source| ViewError::Document { key: key.to_string(), source })?;
		Ok(doc.into_hints())
	}

	pub fn into_hints(self) -> Vec<PriorityHint> {
		match self {
			Self::List(hints) => hints,
			Self::Container { items } => items.unwrap_or_default(),
		}
	}
}

/// Compiles `hints` in order. Each invalid pattern is reported to `sink`,
/// naming the pattern and `origin`, and left out; the rest still compile.
pub fn compile_hints(hints: &[PriorityHint], origin: &str, sink: &dyn NotificationSink) -> Vec<CompiledHint> {
	hints
		.iter()
		.filter_map(|hint| match hint.compile() {
			Ok(compiled) => Some(compiled),
			Err(err) => {
				warn!(pattern = %hint.property_pattern, origin, error = %err, "view.hints.invalid_pattern");
				sink.notify(Notification::warning(format!(
					"Pattern '{}' in '{}' is not a valid regular expression",
					hint.property_pattern, origin
				)));
				None
			}
		})
		.collect()
}
