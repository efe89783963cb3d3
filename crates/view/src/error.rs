//! Error types for the windowed view.

use thiserror::Error;

/// Errors surfaced by the windowed view.
///
/// None of these are fatal to the view itself: document and store failures
/// degrade to the default or previous schema, and are only returned from the
/// decoding helpers so callers can report them.
#[derive(Debug, Error)]
pub enum ViewError {
	/// A configuration document could not be decoded.
	#[error("document '{key}' is malformed: {source}")]
	Document {
		/// Key of the offending document.
		key: String,
		/// The underlying decode error.
		#[source]
		source: serde_json::Error,
	},

	/// The document store failed to answer a lookup.
	#[error("document store failed to load '{key}': {message}")]
	Store {
		/// Key that was being loaded.
		key: String,
		/// Transport-level description.
		message: String,
	},

	/// View configuration could not be parsed.
	#[error("invalid view configuration: {0}")]
	ConfigParse(#[from] toml::de::Error),

	/// View configuration parsed but holds an unusable value.
	#[error("invalid view configuration: {0}")]
	Config(String),

	/// The presentation loop has shut down.
	#[error("presentation context is closed")]
	Closed,
}

/// Result type for view operations.
pub type Result<T> = std::result::Result<T, ViewError>;
