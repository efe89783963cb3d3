//! Column schemas and their inference.

mod coordinator;
mod hints;
mod suggest;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use coordinator::SchemaCoordinator;
pub use hints::{CompiledHint, HintDocument, PriorityHint, compile_hints};
pub use suggest::{ColumnSuggester, FrequencySuggester};

use crate::error::{Result, ViewError};

/// One displayed column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
	/// Property path the column is bound to. Identifies the column.
	#[serde(alias = "Binding")]
	pub binding: String,
	#[serde(default, alias = "Header")]
	pub header: String,
	/// Display width hint. Not part of column identity.
	#[serde(default, alias = "DefaultWidth", skip_serializing_if = "Option::is_none")]
	pub default_width: Option<String>,
}

impl ColumnDefinition {
	pub fn new(binding: impl Into<String>, header: impl Into<String>) -> Self {
		Self {
			binding: binding.into(),
			header: header.into(),
			default_width: None,
		}
	}

	/// Column bound to `path`, headed by its last segment.
	pub fn for_property(path: &str) -> Self {
		let header = path.rsplit('.').next().unwrap_or(path);
		Self::new(path, header)
	}

	pub fn with_width(mut self, width: impl Into<String>) -> Self {
		self.default_width = Some(width.into());
		self
	}
}

/// Ordered column definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSchema {
	columns: Vec<ColumnDefinition>,
}

impl ColumnSchema {
	pub fn new(columns: Vec<ColumnDefinition>) -> Self {
		Self { columns }
	}

	pub fn columns(&self) -> &[ColumnDefinition] {
		&self.columns
	}

	pub fn bindings(&self) -> impl Iterator<Item = &str> {
		self.columns.iter().map(|c| c.binding.as_str())
	}

	/// Equality for replacement purposes: same bindings in the same order.
	pub fn same_bindings(&self, other: &Self) -> bool {
		self.bindings().eq(other.bindings())
	}

	pub fn len(&self) -> usize {
		self.columns.len()
	}

	pub fn is_empty(&self) -> bool {
		self.columns.is_empty()
	}
}

impl FromIterator<ColumnDefinition> for ColumnSchema {
	fn from_iter<I: IntoIterator<Item = ColumnDefinition>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

/// Who decided the active columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnsSource {
	/// Inferred from realized items; kept up to date automatically.
	#[default]
	Automatic,
	/// Configured or edited by a user; never overridden by inference.
	User,
}

/// The active schema of one context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnsModel {
	pub schema: ColumnSchema,
	pub source: ColumnsSource,
}

impl ColumnsModel {
	pub fn user(schema: ColumnSchema) -> Self {
		Self {
			schema,
			source: ColumnsSource::User,
		}
	}

	pub fn is_automatic(&self) -> bool {
		self.source == ColumnsSource::Automatic
	}
}

/// Stored default column set for one context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnSetDocument {
	#[serde(alias = "Columns")]
	pub columns: Vec<ColumnDefinition>,
}

impl ColumnSetDocument {
	pub fn decode(key: &str, document: Value) -> Result<Self> {
		serde_json::from_value(document).map_err(|source| ViewError::Document { key: key.to_string(), source })
	}

	pub fn into_schema(self) -> ColumnSchema {
		ColumnSchema::new(self.columns)
	}
}
