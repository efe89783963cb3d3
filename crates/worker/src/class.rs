/// Shared execution classes used for worker scheduling and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Latency-sensitive work that directly affects what the user sees, such as
	/// the presentation loop and debounced refresh delivery.
	Interactive,
	/// Background async work whose results may be discarded, such as
	/// configuration document lookups and change-feed forwarding.
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}
}
