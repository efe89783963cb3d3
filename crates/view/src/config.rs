//! View configuration.
//!
//! Every field has a default, so an empty TOML document yields the reference
//! behaviour:
//!
//! ```toml
//! recent-capacity = 60
//! realize-debounce-ms = 1000
//! change-debounce-ms = 1000
//! priority-columns-key = "Studio/PriorityColumns"
//! column-set-prefix = "Studio/Columns"
//! default-context = "Default"
//! max-suggested-columns = 6
//! header = "Documents"
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ViewError};

/// Number of recently realized items kept for schema inference.
pub const DEFAULT_RECENT_CAPACITY: usize = 60;

/// Quiet window applied to realization and change-feed bursts.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// Tunables for one windowed view.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ViewConfig {
	/// Capacity of the recency buffer.
	pub recent_capacity: usize,
	/// Debounce window for realized-range notifications, in milliseconds.
	pub realize_debounce_ms: u64,
	/// Debounce window for change-feed notifications, in milliseconds.
	pub change_debounce_ms: u64,
	/// Key of the global priority-columns document.
	pub priority_columns_key: String,
	/// Prefix of the per-context default column-set documents.
	pub column_set_prefix: String,
	/// Context label used when none is given.
	pub default_context: String,
	/// Upper bound on automatically suggested columns.
	pub max_suggested_columns: usize,
	/// Header shown above the view.
	pub header: String,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			recent_capacity: DEFAULT_RECENT_CAPACITY,
			realize_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
			change_debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
			priority_columns_key: "Studio/PriorityColumns".to_string(),
			column_set_prefix: "Studio/Columns".to_string(),
			default_context: "Default".to_string(),
			max_suggested_columns: 6,
			header: "Documents".to_string(),
		}
	}
}

impl ViewConfig {
	/// Parses and validates a TOML configuration.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Rejects values the view cannot operate with.
	pub fn validate(&self) -> Result<()> {
		if self.recent_capacity == 0 {
			return Err(ViewError::Config("recent-capacity must be > 0".into()));
		}
		if self.max_suggested_columns == 0 {
			return Err(ViewError::Config("max-suggested-columns must be > 0".into()));
		}
		if self.default_context.is_empty() {
			return Err(ViewError::Config("default-context must not be empty".into()));
		}
		Ok(())
	}

	pub fn realize_debounce(&self) -> Duration {
		Duration::from_millis(self.realize_debounce_ms)
	}

	pub fn change_debounce(&self) -> Duration {
		Duration::from_millis(self.change_debounce_ms)
	}

	/// Key of the default column-set document for `context`.
	pub fn column_set_key(&self, context: &str) -> String {
		format!("{}/{}", self.column_set_prefix, context)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = ViewConfig::from_toml_str("").unwrap();
		assert_eq!(config, ViewConfig::default());
		assert_eq!(config.recent_capacity, 60);
		assert_eq!(config.realize_debounce(), Duration::from_secs(1));
	}

	#[test]
	fn overrides_are_applied() {
		let config = ViewConfig::from_toml_str(
			r#"
			recent-capacity = 10
			change-debounce-ms = 250
			column-set-prefix = "Raven/Studio/Columns"
			"#,
		)
		.unwrap();
		assert_eq!(config.recent_capacity, 10);
		assert_eq!(config.change_debounce(), Duration::from_millis(250));
		assert_eq!(config.column_set_key("Orders"), "Raven/Studio/Columns/Orders");
		assert_eq!(config.default_context, "Default");
	}

	#[test]
	fn zero_capacity_is_rejected() {
		let err = ViewConfig::from_toml_str("recent-capacity = 0").unwrap_err();
		assert!(matches!(err, ViewError::Config(_)), "{err}");
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = ViewConfig::from_toml_str("recnt-capacity = 5").unwrap_err();
		assert!(matches!(err, ViewError::ConfigParse(_)), "{err}");
	}
}
